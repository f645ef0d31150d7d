use std::path::Path;

use crate::domain::config::ControlPlaneConfig;
use crate::domain::simulator::control_plane::ControlPlane;
use crate::error::Result;

pub mod api;
pub mod domain;
pub mod error;
pub mod loader;
pub mod logger;

/// Loads a configuration file and builds the control plane it describes.
///
/// The logger is not initialised here; binaries call `logger::init` first.
pub fn build_control_plane(config_path: impl AsRef<Path>) -> Result<ControlPlane> {
    let config = ControlPlaneConfig::load(config_path)?;
    log::info!("Configuration parsed successfully.");

    let plane = ControlPlane::from_config(&config)?;
    log::info!("Control plane constructed successfully.");

    Ok(plane)
}
