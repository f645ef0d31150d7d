use thiserror::Error;

use crate::domain::utils::id::{GroupId, NodeId, UserId};

#[derive(Debug, Error)]
pub enum Error {
    #[error("File not found or could not be read: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse JSON document: {0}")]
    DeserializationError(#[from] serde_json::Error),

    #[error("Failed to parse topology file '{file}' at line {line}: {reason}")]
    TopologyParseError { file: String, line: usize, reason: String },

    #[error("Unknown node type tag: '{0}'")]
    UnknownNodeKind(String),

    #[error("Invalid topology: {0}")]
    InvalidTopology(String),

    /// The topology is disconnected. Treated as a fatal configuration error.
    #[error("No route exists between {from} and {to}; the topology is disconnected")]
    UnreachableRoute { from: NodeId, to: NodeId },

    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),

    #[error("Unknown client: {0}")]
    UnknownClient(UserId),

    #[error("Unknown group: {0}")]
    UnknownGroup(GroupId),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Optimizer process failed: {0}")]
    OptimizerProcessError(String),

    #[error("Optimizer did not answer within {0:.1}s")]
    OptimizerTimeout(f64),

    #[error("Optimizer worker channel is closed")]
    OptimizerChannelClosed,
}

pub type Result<T> = std::result::Result<T, Error>;
