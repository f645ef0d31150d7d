use serde::{Deserialize, Serialize};

/// Replay input: viewer arrivals and measured link traffic.
#[derive(Debug, Deserialize, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SessionTraceDto {
    pub events: Vec<TraceEventDto>,
}

#[derive(Debug, Deserialize, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TraceEventDto {
    #[serde(rename_all = "camelCase")]
    ViewerArrival {
        at_s: f64,
        user: usize,
        content: usize,
        #[serde(default)]
        server: Option<usize>,
    },
    #[serde(rename_all = "camelCase")]
    LinkTraffic { at_s: f64, src: usize, dst: usize, bytes: u64 },
    /// Switches warmed servers on at a set time instead of right after a
    /// reallocation.
    #[serde(rename_all = "camelCase")]
    ActivateServers { at_s: f64 },
}
