pub mod config;
pub mod group;
pub mod monitor;
pub mod network;
pub mod optimizer;
pub mod placement;
pub mod simulator;
pub mod utils;
