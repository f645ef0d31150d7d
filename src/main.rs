use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use log::LevelFilter;

use backhaul_placement::domain::config::ControlPlaneConfig;
use backhaul_placement::domain::simulator::control_plane::ControlPlane;
use backhaul_placement::domain::utils::id::NodeId;
use backhaul_placement::loader::topology_reader::read_topology;
use backhaul_placement::logger;

#[derive(Debug, Parser)]
#[command(name = "backhaul-placement", version, about = "Group-aware placement and congestion control for video delivery over a backhaul")]
struct Cli {
    /// Overrides RUST_LOG (error, warn, info, debug, trace).
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Replays a workload against the control plane.
    Run {
        #[arg(short, long)]
        config: PathBuf,
        /// Replay this trace instead of the configured workload.
        #[arg(long)]
        trace: Option<PathBuf>,
        /// `greedy` or `optimizer`.
        #[arg(long)]
        strategy: Option<String>,
        /// Seed of the generated scenario.
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Prints the route between two nodes.
    Route {
        #[arg(long)]
        nodes: PathBuf,
        #[arg(long)]
        links: PathBuf,
        from: usize,
        to: usize,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.log_level.as_deref() {
        Some(level) => Some(level.parse::<LevelFilter>().with_context(|| format!("invalid log level '{}'", level))?),
        None => None,
    };
    logger::init(level);

    match cli.command {
        Command::Run { config, trace, strategy, seed } => {
            let mut config = ControlPlaneConfig::load(&config).with_context(|| format!("loading configuration '{}'", config.display()))?;
            if let Some(trace) = trace {
                config.trace_file = Some(trace);
            }
            if let Some(strategy) = strategy {
                config.override_strategy(&strategy)?;
            }
            if let (Some(seed), Some(scenario)) = (seed, config.scenario.as_mut()) {
                scenario.seed = seed;
            }

            let mut plane = ControlPlane::from_config(&config).context("building the control plane")?;
            let summary = plane.run().await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::Route { nodes, links, from, to } => {
            let graph = read_topology(&nodes, &links, backhaul_placement::domain::network::topology::DEFAULT_PER_STREAM_UNIT)?;
            let route = graph.find_route(NodeId::new(from), NodeId::new(to))?;
            println!("{}", route);
        }
    }

    Ok(())
}
