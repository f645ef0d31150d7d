use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One group as seen by the solver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    pub ap: usize,
    /// `index + node_count`, the id the solver uses for the group's own
    /// virtual node.
    pub synthetic_id: usize,
    pub index: usize,
    pub user_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolverRequest {
    pub id: Uuid,
    pub congested: (usize, usize),
    pub roster: Vec<RosterEntry>,
}

impl SolverRequest {
    pub fn new(congested: (usize, usize), roster: Vec<RosterEntry>) -> Self {
        SolverRequest { id: Uuid::new_v4(), congested, roster }
    }

    /// Positional arguments of the solver command line:
    /// `<numGroups> <a> <b>` followed by `<ap> <synthetic> <index> <users>`
    /// for every roster entry.
    pub fn command_args(&self) -> Vec<String> {
        let mut args = Vec::with_capacity(3 + 4 * self.roster.len());
        args.push(self.roster.len().to_string());
        args.push(self.congested.0.to_string());
        args.push(self.congested.1.to_string());
        for entry in &self.roster {
            args.push(entry.ap.to_string());
            args.push(entry.synthetic_id.to_string());
            args.push(entry.index.to_string());
            args.push(entry.user_count.to_string());
        }
        args
    }
}

/// `(groupIndex, serverId)` line of a solver answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub group_index: usize,
    pub server_id: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolverResponse {
    pub request_id: Uuid,
    pub assignments: Vec<Assignment>,
    pub error: Option<String>,
}

impl SolverResponse {
    pub fn completed(request_id: Uuid, assignments: Vec<Assignment>) -> Self {
        SolverResponse { request_id, assignments, error: None }
    }

    pub fn failed(request_id: Uuid, error: impl Into<String>) -> Self {
        SolverResponse { request_id, assignments: Vec::new(), error: Some(error.into()) }
    }
}

/// Parses `<groupIndex> <serverId>` lines. Blank lines are ignored;
/// malformed lines are logged and skipped.
pub fn parse_assignments(output: &str) -> Vec<Assignment> {
    let mut assignments = Vec::new();

    for (number, line) in output.lines().enumerate() {
        let mut fields = line.split_whitespace();
        let Some(first) = fields.next() else {
            continue;
        };

        match (first.parse::<usize>(), fields.next().map(str::parse::<usize>)) {
            (Ok(group_index), Some(Ok(server_id))) => assignments.push(Assignment { group_index, server_id }),
            _ => log::warn!("MalformedSolverLine: Skipping line {} of solver output: '{}'", number + 1, line.trim()),
        }
    }

    assignments
}
