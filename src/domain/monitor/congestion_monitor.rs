use std::collections::BTreeMap;

use crate::domain::config::MonitorSettings;
use crate::domain::network::addressing::AddressPlan;
use crate::domain::network::topology::TopologyGraph;
use crate::domain::placement::controller::{CongestionResponse, PlacementController};
use crate::domain::utils::id::NodeId;

#[derive(Debug, Clone)]
struct MonitoredLink {
    src: NodeId,
    dst: NodeId,
    capacity_mbps: f64,
    bytes: u64,
}

/// A link whose measured throughput went over its limit in the last
/// interval.
#[derive(Debug, Clone, PartialEq)]
pub struct CongestionSignal {
    pub link_address: String,
    pub src: NodeId,
    pub dst: NodeId,
    pub throughput_mbps: f64,
}

/// Accumulates received bytes per link and samples them once per interval.
#[derive(Debug, Clone)]
pub struct CongestionMonitor {
    interval_s: f64,
    threshold_mbps: Option<f64>,
    redirect: bool,
    /// Keyed by link broadcast address; ordered so signals are stable.
    links: BTreeMap<String, MonitoredLink>,
}

impl CongestionMonitor {
    pub fn new(settings: &MonitorSettings) -> Self {
        CongestionMonitor { interval_s: settings.interval_s, threshold_mbps: settings.threshold_mbps, redirect: settings.redirect, links: BTreeMap::new() }
    }

    pub fn interval_s(&self) -> f64 {
        self.interval_s
    }

    pub fn register_link(&mut self, address: impl Into<String>, src: NodeId, dst: NodeId, capacity_mbps: f64) {
        self.links.insert(address.into(), MonitoredLink { src, dst, capacity_mbps, bytes: 0 });
    }

    /// Registers every link of `graph` under its broadcast address.
    pub fn register_topology(&mut self, graph: &TopologyGraph, addresses: &AddressPlan) {
        for (address, (src, dst)) in addresses.link_broadcasts() {
            let capacity_mbps = graph.find_link(src, dst).map(|link| link.capacity_mbps()).unwrap_or(0.0);
            self.register_link(address, src, dst, capacity_mbps);
        }
        log::debug!("Monitoring {} links every {}s.", self.links.len(), self.interval_s);
    }

    /// Receive callback for traffic seen on the link at `address`.
    pub fn record_bytes(&mut self, address: &str, bytes: u64) -> bool {
        match self.links.get_mut(address) {
            Some(link) => {
                link.bytes = link.bytes.saturating_add(bytes);
                true
            }
            None => {
                log::debug!("Traffic for unmonitored address {} ignored.", address);
                false
            }
        }
    }

    pub fn record_link_bytes(&mut self, addresses: &AddressPlan, src: NodeId, dst: NodeId, bytes: u64) -> bool {
        let address = addresses.link_broadcast(src, dst).or_else(|| addresses.link_broadcast(dst, src));
        match address {
            Some(address) => self.record_bytes(address, bytes),
            None => {
                log::debug!("Traffic for unknown link ({}, {}) ignored.", src, dst);
                false
            }
        }
    }

    /// Closes the current interval: converts every counter to Mbit/s,
    /// resets it, and reports the links over their limit.
    pub fn sample(&mut self) -> Vec<CongestionSignal> {
        let mut signals = Vec::new();

        for (address, link) in self.links.iter_mut() {
            let throughput_mbps = (link.bytes as f64 * 8.0) / (1e6 * self.interval_s);
            link.bytes = 0;

            let limit = self.threshold_mbps.unwrap_or(link.capacity_mbps);
            if throughput_mbps > limit {
                log::info!("Link {} ({}, {}) at {:.2} Mbit/s over limit {:.2} Mbit/s.", address, link.src, link.dst, throughput_mbps, limit);
                signals.push(CongestionSignal { link_address: address.clone(), src: link.src, dst: link.dst, throughput_mbps });
            }
        }

        if !self.redirect {
            signals.clear();
        }
        signals
    }

    /// Samples and forwards every signal to the controller. A signal the
    /// controller fails on is logged; the others are still handled.
    pub fn tick(&mut self, controller: &mut PlacementController) -> Vec<CongestionResponse> {
        let mut responses = Vec::new();

        for signal in self.sample() {
            match controller.handle_congestion(signal.src, signal.dst) {
                Ok(response) => responses.push(response),
                Err(e) => log::error!(
                    "CongestionHandlingFailed: Link {} ({}, {}) at {:.2} Mbit/s: {}",
                    signal.link_address,
                    signal.src,
                    signal.dst,
                    signal.throughput_mbps,
                    e
                ),
            }
        }

        responses
    }
}
