use crate::domain::utils::id::{ContentId, UserId};

/// A single viewing session. Belongs to exactly one group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndUser {
    pub id: UserId,
    pub ip: String,
    pub content: ContentId,
}

impl EndUser {
    pub fn new(id: UserId, ip: impl Into<String>, content: ContentId) -> Self {
        EndUser { id, ip: ip.into(), content }
    }
}
