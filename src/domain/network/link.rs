use crate::domain::utils::id::NodeId;

/// Physical backhaul link. Stored once with its declared orientation, but
/// looked up in either direction for admission.
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub src: NodeId,
    pub dst: NodeId,
    /// Capacity in bit/s.
    pub rate: f64,
    pub delay: f64,
    /// Loss fraction in `[0, 1]`.
    pub loss: f64,
    pub buffer_size: u32,
}

impl Link {
    pub fn new(src: NodeId, dst: NodeId, rate: f64, delay: f64, loss: f64, buffer_size: u32) -> Self {
        Link { src, dst, rate, delay, loss, buffer_size }
    }

    pub fn connects(&self, u: NodeId, v: NodeId) -> bool {
        (self.src == u && self.dst == v) || (self.src == v && self.dst == u)
    }

    pub fn capacity_mbps(&self) -> f64 {
        self.rate / 1e6
    }
}
