use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::domain::utils::id::{ContentId, NodeId};

/// Lifecycle of an edge cache server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ServerState {
    On,
    /// Chosen as a placement target but not yet activated.
    Off,
    Waiting,
    StandBy,
}

#[derive(Debug, Clone)]
pub struct CacheServer {
    pub node: NodeId,
    pub address: String,
    pub state: ServerState,
    /// Number of distinct contents this server may host. `None` means
    /// unbounded, which is how the origin is modelled.
    capacity: Option<usize>,
    hosts_everything: bool,
    contents: BTreeSet<ContentId>,
}

impl CacheServer {
    pub fn has_content(&self, content: ContentId) -> bool {
        self.hosts_everything || self.contents.contains(&content)
    }

    pub fn hosted_contents(&self) -> impl Iterator<Item = ContentId> + '_ {
        self.contents.iter().copied()
    }

    pub fn spare_capacity(&self) -> Option<usize> {
        self.capacity.map(|capacity| capacity.saturating_sub(self.contents.len()))
    }

    /// Binds `content` to this server. Already hosted content is accepted
    /// without consuming capacity.
    fn assign_content(&mut self, content: ContentId) -> bool {
        if self.has_content(content) {
            return true;
        }
        if self.spare_capacity().is_some_and(|spare| spare == 0) {
            return false;
        }
        self.contents.insert(content);
        true
    }
}

/// All known cache servers, keyed by node.
#[derive(Debug, Clone)]
pub struct ServerPool {
    servers: BTreeMap<NodeId, CacheServer>,
    default_capacity: usize,
}

impl ServerPool {
    pub fn new(default_capacity: usize) -> Self {
        ServerPool { servers: BTreeMap::new(), default_capacity }
    }

    pub fn register(&mut self, node: NodeId, address: impl Into<String>, capacity: usize, contents: impl IntoIterator<Item = ContentId>) {
        let contents: BTreeSet<ContentId> = contents.into_iter().collect();
        if contents.len() > capacity {
            log::warn!("ServerOverCommitted: Server {} preloaded with {} contents over capacity {}.", node, contents.len(), capacity);
        }
        self.servers.insert(
            node,
            CacheServer { node, address: address.into(), state: ServerState::On, capacity: Some(capacity), hosts_everything: false, contents },
        );
    }

    /// The origin hosts every content and is never full.
    pub fn register_origin(&mut self, node: NodeId, address: impl Into<String>) {
        self.servers.insert(
            node,
            CacheServer { node, address: address.into(), state: ServerState::On, capacity: None, hosts_everything: true, contents: BTreeSet::new() },
        );
    }

    /// Registers `node` with the default capacity unless it is known.
    pub fn ensure(&mut self, node: NodeId, address: impl Into<String>) -> &mut CacheServer {
        let default_capacity = self.default_capacity;
        self.servers.entry(node).or_insert_with(|| CacheServer {
            node,
            address: address.into(),
            state: ServerState::On,
            capacity: Some(default_capacity),
            hosts_everything: false,
            contents: BTreeSet::new(),
        })
    }

    /// Marks `node` as a freshly chosen server (`Off`). An already known
    /// server keeps its state. Returns whether the node was new.
    pub fn warm(&mut self, node: NodeId, address: impl Into<String>) -> bool {
        if self.servers.contains_key(&node) {
            return false;
        }

        self.ensure(node, address).state = ServerState::Off;
        log::debug!("Server {} warmed.", node);
        true
    }

    /// Switches every server that is not `On` to `On`.
    pub fn activate_warmed(&mut self) -> Vec<NodeId> {
        let mut activated = Vec::new();
        for server in self.servers.values_mut().filter(|server| server.state != ServerState::On) {
            server.state = ServerState::On;
            activated.push(server.node);
        }
        activated
    }

    pub fn get(&self, node: NodeId) -> Option<&CacheServer> {
        self.servers.get(&node)
    }

    pub fn state(&self, node: NodeId) -> Option<ServerState> {
        self.servers.get(&node).map(|server| server.state)
    }

    pub fn has_content(&self, node: NodeId, content: ContentId) -> bool {
        self.servers.get(&node).is_some_and(|server| server.has_content(content))
    }

    pub fn assign_content(&mut self, node: NodeId, content: ContentId) -> bool {
        match self.servers.get_mut(&node) {
            Some(server) => server.assign_content(content),
            None => false,
        }
    }

    pub fn servers(&self) -> impl Iterator<Item = &CacheServer> {
        self.servers.values()
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }
}
