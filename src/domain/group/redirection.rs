use std::collections::HashMap;

use crate::domain::group::group::GroupKey;

/// Serving address per group key. Viewers read it before every content
/// request; only the placement layer writes it.
#[derive(Debug, Clone, Default)]
pub struct ServerRedirectionTable {
    entries: HashMap<GroupKey, String>,
}

impl ServerRedirectionTable {
    pub fn new() -> Self {
        ServerRedirectionTable { entries: HashMap::new() }
    }

    pub fn get(&self, key: &GroupKey) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Points `key` at `server_ip` and returns the previous address, if any.
    pub fn assign(&mut self, key: GroupKey, server_ip: impl Into<String>) -> Option<String> {
        self.entries.insert(key, server_ip.into())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&GroupKey, &str)> {
        self.entries.iter().map(|(key, ip)| (key, ip.as_str()))
    }
}
