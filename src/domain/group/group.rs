use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::group::end_user::EndUser;
use crate::domain::network::path::Path;
use crate::domain::utils::id::{ContentId, GroupId, NodeId};

/// Identity of a group: the viewers' broadcast domain, optionally narrowed
/// to one content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupKey {
    pub client_key: String,
    pub content: Option<ContentId>,
}

impl GroupKey {
    pub fn new(client_key: impl Into<String>, content: Option<ContentId>) -> Self {
        GroupKey { client_key: client_key.into(), content }
    }

    /// Same client part, with the content replaced when the key carries one.
    pub fn with_content(&self, content: ContentId) -> Self {
        GroupKey { client_key: self.client_key.clone(), content: self.content.map(|_| content) }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.content {
            Some(content) => write!(f, "{}#{}", self.client_key, content),
            None => write!(f, "{}", self.client_key),
        }
    }
}

/// How viewers are folded into groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GroupKeyMode {
    /// One group per broadcast domain and content.
    #[default]
    ContentAware,
    /// One group per broadcast domain, whatever is watched.
    BroadcastOnly,
}

impl GroupKeyMode {
    pub fn key_for(&self, client_key: &str, content: ContentId) -> GroupKey {
        match self {
            GroupKeyMode::ContentAware => GroupKey::new(client_key, Some(content)),
            GroupKeyMode::BroadcastOnly => GroupKey::new(client_key, None),
        }
    }
}

/// Streams a group holds in the allocation matrix on one directed edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamBooking {
    pub edge: (NodeId, NodeId),
    pub streams: usize,
}

/// Viewers behind one AP that are routed and placed as a unit.
#[derive(Debug, Clone)]
pub struct Group {
    /// Registration index; also the group's position in the registry.
    pub id: GroupId,
    pub key: GroupKey,
    pub server_ip: String,
    /// Node currently serving the group.
    pub serving_node: NodeId,
    /// Origin AP the viewers sit behind.
    pub from: NodeId,
    /// Serving node requested at admission.
    pub to: NodeId,
    /// Route from the serving side down to `from`.
    pub route: Path,
    /// Content of the first viewer. Drives optimizer placement.
    pub content: ContentId,
    pub ap: NodeId,
    /// What the group currently holds on its first hop, if anything.
    pub booking: Option<StreamBooking>,

    users: Vec<EndUser>,
}

impl Group {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: GroupId,
        key: GroupKey,
        server_ip: String,
        serving_node: NodeId,
        from: NodeId,
        to: NodeId,
        route: Path,
        first_user: EndUser,
    ) -> Self {
        let content = first_user.content;
        Group { id, key, server_ip, serving_node, from, to, route, content, ap: from, booking: None, users: vec![first_user] }
    }

    pub fn add_user(&mut self, user: EndUser) {
        self.users.push(user);
    }

    pub fn users(&self) -> &[EndUser] {
        &self.users
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    /// Records one more stream booked on `edge`. A booking on another edge
    /// is replaced; callers release it first.
    pub fn book_stream(&mut self, edge: (NodeId, NodeId)) {
        match &mut self.booking {
            Some(booking) if booking.edge == edge => booking.streams += 1,
            _ => self.booking = Some(StreamBooking { edge, streams: 1 }),
        }
    }

    /// Aggregate demand in bit/s for the given per-stream cost.
    pub fn demand(&self, per_stream_unit: f64) -> f64 {
        self.users.len() as f64 * per_stream_unit
    }
}
