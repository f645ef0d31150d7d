use std::fmt;
use std::str::FromStr;

use crate::domain::utils::id::NodeId;
use crate::error::Error;

/// Role of a node in the backhaul.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Client,
    AccessPoint,
    Router,
    CacheServer,
}

impl FromStr for NodeKind {
    type Err = Error;

    fn from_str(tag: &str) -> Result<NodeKind, Self::Err> {
        match tag.to_ascii_lowercase().as_str() {
            "client" | "station" | "user" => Ok(NodeKind::Client),
            "ap" | "accesspoint" | "access-point" => Ok(NodeKind::AccessPoint),
            "router" | "switch" | "sw" => Ok(NodeKind::Router),
            "server" | "cache" | "cache-server" | "cdn" | "edge" => Ok(NodeKind::CacheServer),
            _ => Err(Error::UnknownNodeKind(tag.to_string())),
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            NodeKind::Client => "client",
            NodeKind::AccessPoint => "ap",
            NodeKind::Router => "router",
            NodeKind::CacheServer => "server",
        };
        write!(f, "{}", tag)
    }
}

/// Player parameters carried by client rows of the node file. They are
/// handed to the external player and never interpreted by the controller.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerProfile {
    pub adaptation_logic: String,
    pub start_up_delay_s: f64,
    pub allow_downscale: bool,
    pub allow_upscale: bool,
    pub max_buffered_seconds: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub player: Option<PlayerProfile>,
}

impl Node {
    pub fn new(id: NodeId, kind: NodeKind) -> Self {
        Node { id, kind, player: None }
    }

    pub fn with_player(mut self, player: PlayerProfile) -> Self {
        self.player = Some(player);
        self
    }

    pub fn is_access_point(&self) -> bool {
        self.kind == NodeKind::AccessPoint
    }
}
