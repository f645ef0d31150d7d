use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;

use crate::domain::optimizer::protocol::{Assignment, SolverRequest, parse_assignments};
use crate::error::{Error, Result};

/// Something that can turn a roster into group placements.
#[async_trait]
pub trait SolverBackend: Send + Sync + std::fmt::Debug {
    async fn solve(&self, request: &SolverRequest) -> Result<Vec<Assignment>>;
}

/// Runs an external solver script and reads its answer from stdout.
#[derive(Debug, Clone)]
pub struct ProcessSolver {
    interpreter: String,
    script: String,
}

impl ProcessSolver {
    pub fn new(interpreter: impl Into<String>, script: impl Into<String>) -> Self {
        ProcessSolver { interpreter: interpreter.into(), script: script.into() }
    }
}

#[async_trait]
impl SolverBackend for ProcessSolver {
    async fn solve(&self, request: &SolverRequest) -> Result<Vec<Assignment>> {
        let args = request.command_args();
        log::info!("Starting solver '{} {}' for request {} with {} groups.", self.interpreter, self.script, request.id, request.roster.len());
        log::debug!("Solver arguments: {}", args.join(" "));

        let output = Command::new(&self.interpreter)
            .arg(&self.script)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| Error::OptimizerProcessError(format!("could not start '{}': {}", self.interpreter, e)))?;

        if !output.status.success() {
            log::warn!(
                "SolverExitStatus: Solver for request {} exited with {}: {}",
                request.id,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        Ok(parse_assignments(&String::from_utf8_lossy(&output.stdout)))
    }
}
