use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::api::control_plane_dto::config_dto::{ControlPlaneConfigDto, TrafficModelDto};
use crate::domain::group::group::GroupKeyMode;
use crate::domain::placement::strategy::StrategyKind;
use crate::domain::utils::id::{ContentId, NodeId};
use crate::error::{Error, Result};
use crate::loader::parser::parse_json_file;

#[derive(Debug, Clone, PartialEq)]
pub enum ResolutionSettings {
    Greedy,
    Optimizer {
        interpreter: String,
        script: String,
        /// Wait for each answer before the next event is processed.
        blocking: bool,
        timeout: Option<Duration>,
    },
}

impl ResolutionSettings {
    pub fn kind(&self) -> StrategyKind {
        match self {
            ResolutionSettings::Greedy => StrategyKind::Greedy,
            ResolutionSettings::Optimizer { .. } => StrategyKind::Optimizer,
        }
    }
}

/// Where the monitor's per-link byte counts come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrafficModel {
    /// Derived from group demand before every sample.
    #[default]
    Estimated,
    /// Only `linkTraffic` events of the trace.
    Trace,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonitorSettings {
    pub interval_s: f64,
    /// Fixed Mbit/s limit for every link; the link capacity when unset.
    pub threshold_mbps: Option<f64>,
    pub redirect: bool,
    pub traffic: TrafficModel,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        MonitorSettings { interval_s: 2.0, threshold_mbps: None, redirect: true, traffic: TrafficModel::Estimated }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerSettings {
    pub node: NodeId,
    pub capacity: Option<usize>,
    pub contents: Vec<ContentId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioSettings {
    pub seed: u64,
    pub start_window_s: f64,
    pub contents: usize,
    pub zipf_exponent: f64,
}

/// Fully resolved control plane configuration. File paths are absolute or
/// relative to the working directory.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlPlaneConfig {
    pub nodes_file: PathBuf,
    pub links_file: PathBuf,
    pub per_stream_unit: f64,
    pub key_mode: GroupKeyMode,
    pub resolution: ResolutionSettings,
    pub origin_server: NodeId,
    pub clients_per_ap: usize,
    pub default_server_capacity: usize,
    pub servers: Vec<ServerSettings>,
    pub monitor: MonitorSettings,
    pub provision_on_admission_failure: bool,
    pub stop_time_s: f64,
    pub trace_file: Option<PathBuf>,
    pub scenario: Option<ScenarioSettings>,
}

impl ControlPlaneConfig {
    /// Reads a JSON configuration. Relative paths inside it are resolved
    /// against the configuration file's directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let dto: ControlPlaneConfigDto = parse_json_file(path)?;
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();

        let config = ControlPlaneConfig::try_from((dto, base_dir))?;
        log::info!("Configuration loaded from '{}'.", path.display());
        Ok(config)
    }

    /// Replaces the resolution strategy by name, keeping any optimizer
    /// settings already configured.
    pub fn override_strategy(&mut self, strategy: &str) -> Result<()> {
        match StrategyKind::from_str(strategy)? {
            StrategyKind::Greedy => self.resolution = ResolutionSettings::Greedy,
            StrategyKind::Optimizer if self.resolution.kind() == StrategyKind::Optimizer => {}
            StrategyKind::Optimizer => {
                return Err(Error::ConfigError("the optimizer strategy needs 'resolution.script' in the configuration".to_string()));
            }
        }
        Ok(())
    }
}

fn resolve(base_dir: &Path, file: &str) -> PathBuf {
    let file = Path::new(file);
    if file.is_absolute() { file.to_path_buf() } else { base_dir.join(file) }
}

impl TryFrom<(ControlPlaneConfigDto, PathBuf)> for ControlPlaneConfig {
    type Error = Error;

    fn try_from((dto, base_dir): (ControlPlaneConfigDto, PathBuf)) -> Result<Self> {
        if dto.per_stream_unit.is_nan() || dto.per_stream_unit <= 0.0 {
            return Err(Error::ConfigError(format!("perStreamUnit must be positive, got {}", dto.per_stream_unit)));
        }
        if dto.monitor.interval_s.is_nan() || dto.monitor.interval_s <= 0.0 {
            return Err(Error::ConfigError(format!("monitor.intervalS must be positive, got {}", dto.monitor.interval_s)));
        }
        if dto.stop_time_s < 0.0 {
            return Err(Error::ConfigError(format!("stopTimeS must not be negative, got {}", dto.stop_time_s)));
        }

        let resolution = match StrategyKind::from_str(&dto.resolution.strategy)? {
            StrategyKind::Greedy => ResolutionSettings::Greedy,
            StrategyKind::Optimizer => {
                let script = dto
                    .resolution
                    .script
                    .ok_or_else(|| Error::ConfigError("the optimizer strategy needs 'resolution.script'".to_string()))?;
                let timeout = match dto.resolution.timeout_s {
                    Some(seconds) if seconds > 0.0 => Some(Duration::from_secs_f64(seconds)),
                    Some(seconds) => return Err(Error::ConfigError(format!("resolution.timeoutS must be positive, got {}", seconds))),
                    None => None,
                };
                ResolutionSettings::Optimizer {
                    interpreter: dto.resolution.interpreter,
                    script: resolve(&base_dir, &script).to_string_lossy().into_owned(),
                    blocking: dto.resolution.blocking,
                    timeout,
                }
            }
        };

        let servers = dto
            .servers
            .into_iter()
            .map(|server| ServerSettings {
                node: NodeId::new(server.node),
                capacity: server.capacity,
                contents: server.contents.into_iter().map(ContentId::new).collect(),
            })
            .collect();

        let monitor = MonitorSettings {
            interval_s: dto.monitor.interval_s,
            threshold_mbps: dto.monitor.threshold_mbps,
            redirect: dto.monitor.redirect,
            traffic: match dto.monitor.traffic {
                TrafficModelDto::Estimated => TrafficModel::Estimated,
                TrafficModelDto::Trace => TrafficModel::Trace,
            },
        };

        let scenario = dto.scenario.map(|scenario| ScenarioSettings {
            seed: scenario.seed,
            start_window_s: scenario.start_window_s.max(0.0),
            contents: scenario.contents.max(1),
            zipf_exponent: scenario.zipf_exponent,
        });

        Ok(ControlPlaneConfig {
            nodes_file: resolve(&base_dir, &dto.topology.nodes_file),
            links_file: resolve(&base_dir, &dto.topology.links_file),
            per_stream_unit: dto.per_stream_unit,
            key_mode: dto.group_key,
            resolution,
            origin_server: NodeId::new(dto.origin_server),
            clients_per_ap: dto.clients_per_ap,
            default_server_capacity: dto.default_server_capacity,
            servers,
            monitor,
            provision_on_admission_failure: dto.provision_on_admission_failure,
            stop_time_s: dto.stop_time_s,
            trace_file: dto.trace.as_deref().map(|trace| resolve(&base_dir, trace)),
            scenario,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::network::topology::DEFAULT_PER_STREAM_UNIT;

    fn create_config_dto(json: &str) -> ControlPlaneConfigDto {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_defaults_and_relative_paths() {
        let dto = create_config_dto(r#"{ "topology": { "nodesFile": "nodes.txt", "linksFile": "/abs/links.txt" }, "originServer": 0 }"#);
        let config = ControlPlaneConfig::try_from((dto, PathBuf::from("/etc/placement"))).unwrap();

        assert_eq!(config.nodes_file, PathBuf::from("/etc/placement/nodes.txt"));
        assert_eq!(config.links_file, PathBuf::from("/abs/links.txt"));
        assert_eq!(config.per_stream_unit, DEFAULT_PER_STREAM_UNIT);
        assert_eq!(config.key_mode, GroupKeyMode::ContentAware);
        assert_eq!(config.resolution, ResolutionSettings::Greedy);
        assert_eq!(config.monitor, MonitorSettings::default());
        assert!(config.provision_on_admission_failure);
    }

    #[test]
    fn test_optimizer_requires_script() {
        let dto = create_config_dto(
            r#"{ "topology": { "nodesFile": "n", "linksFile": "l" }, "originServer": 0, "resolution": { "strategy": "ILPSolution" } }"#,
        );
        assert!(matches!(ControlPlaneConfig::try_from((dto, PathBuf::new())), Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_broadcast_only_key_mode() {
        let dto = create_config_dto(r#"{ "topology": { "nodesFile": "n", "linksFile": "l" }, "originServer": 0, "groupKey": "broadcastOnly" }"#);
        let config = ControlPlaneConfig::try_from((dto, PathBuf::new())).unwrap();
        assert_eq!(config.key_mode, GroupKeyMode::BroadcastOnly);
    }
}
