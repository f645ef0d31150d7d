use serde::{Deserialize, Serialize};

use crate::domain::group::group::GroupKeyMode;
use crate::domain::network::topology::DEFAULT_PER_STREAM_UNIT;

fn default_per_stream_unit() -> f64 {
    DEFAULT_PER_STREAM_UNIT
}

fn default_true() -> bool {
    true
}

fn default_clients_per_ap() -> usize {
    1
}

fn default_server_capacity() -> usize {
    10
}

fn default_stop_time_s() -> f64 {
    30.0
}

fn default_interval_s() -> f64 {
    2.0
}

fn default_interpreter() -> String {
    "python3".to_string()
}

#[derive(Debug, Deserialize, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlPlaneConfigDto {
    pub topology: TopologyFilesDto,
    #[serde(default = "default_per_stream_unit")]
    pub per_stream_unit: f64,
    #[serde(default)]
    pub group_key: GroupKeyMode,
    #[serde(default)]
    pub resolution: ResolutionDto,
    pub origin_server: usize,
    #[serde(default = "default_clients_per_ap")]
    pub clients_per_ap: usize,
    #[serde(default = "default_server_capacity")]
    pub default_server_capacity: usize,
    #[serde(default)]
    pub servers: Vec<CacheServerDto>,
    #[serde(default)]
    pub monitor: MonitorDto,
    #[serde(default = "default_true")]
    pub provision_on_admission_failure: bool,
    #[serde(default = "default_stop_time_s")]
    pub stop_time_s: f64,
    #[serde(default)]
    pub trace: Option<String>,
    #[serde(default)]
    pub scenario: Option<ScenarioDto>,
}

#[derive(Debug, Deserialize, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopologyFilesDto {
    pub nodes_file: String,
    pub links_file: String,
}

#[derive(Debug, Deserialize, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionDto {
    pub strategy: String,
    #[serde(default = "default_interpreter")]
    pub interpreter: String,
    #[serde(default)]
    pub script: Option<String>,
    #[serde(default = "default_true")]
    pub blocking: bool,
    #[serde(default)]
    pub timeout_s: Option<f64>,
}

impl Default for ResolutionDto {
    fn default() -> Self {
        ResolutionDto { strategy: "greedy".to_string(), interpreter: default_interpreter(), script: None, blocking: true, timeout_s: None }
    }
}

#[derive(Debug, Deserialize, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheServerDto {
    pub node: usize,
    pub capacity: Option<usize>,
    #[serde(default)]
    pub contents: Vec<usize>,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum TrafficModelDto {
    #[default]
    Estimated,
    Trace,
}

#[derive(Debug, Deserialize, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorDto {
    #[serde(default = "default_interval_s")]
    pub interval_s: f64,
    #[serde(default)]
    pub threshold_mbps: Option<f64>,
    #[serde(default = "default_true")]
    pub redirect: bool,
    #[serde(default)]
    pub traffic: TrafficModelDto,
}

impl Default for MonitorDto {
    fn default() -> Self {
        MonitorDto { interval_s: default_interval_s(), threshold_mbps: None, redirect: true, traffic: TrafficModelDto::default() }
    }
}

#[derive(Debug, Deserialize, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioDto {
    #[serde(default)]
    pub seed: u64,
    #[serde(default = "default_start_window_s")]
    pub start_window_s: f64,
    #[serde(default = "default_contents")]
    pub contents: usize,
    #[serde(default = "default_zipf_exponent")]
    pub zipf_exponent: f64,
}

fn default_start_window_s() -> f64 {
    10.0
}

fn default_contents() -> usize {
    1
}

fn default_zipf_exponent() -> f64 {
    0.7
}
