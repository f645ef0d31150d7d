use crate::domain::group::group::Group;
use crate::domain::network::link::Link;
use crate::domain::network::node::{Node, NodeKind};
use crate::domain::network::path::Path;
use crate::domain::utils::id::{GroupId, NodeId};
use crate::error::{Error, Result};

/// Per-stream demand of the original deployment, in bit/s. It is a fixed
/// admission cost and is not derived from the measured bitrate.
pub const DEFAULT_PER_STREAM_UNIT: f64 = 4_300_000.0;

/// Backhaul topology with per-edge allocation counters.
///
/// Nodes and links are added through the builder calls and become
/// immutable once `build_adjacency` has run. The allocation matrix is
/// indexed by ordered node pairs, so `(u, v)` and `(v, u)` are tracked
/// independently even though links are undirected for lookup.
#[derive(Debug, Clone)]
pub struct TopologyGraph {
    nodes: Vec<Node>,
    links: Vec<Link>,
    adjacency: Vec<Vec<NodeId>>,
    /// Row-major `size x size` accumulator of allocated demand.
    allocation: Vec<f64>,
    size: usize,
    per_stream_unit: f64,
}

impl TopologyGraph {
    pub fn new(per_stream_unit: f64) -> Self {
        TopologyGraph { nodes: Vec::new(), links: Vec::new(), adjacency: Vec::new(), allocation: Vec::new(), size: 0, per_stream_unit }
    }

    pub fn add_node(&mut self, id: NodeId, kind: NodeKind) {
        self.nodes.push(Node::new(id, kind));
    }

    pub fn add_node_entry(&mut self, node: Node) {
        self.nodes.push(node);
    }

    pub fn add_link(&mut self, src: NodeId, dst: NodeId, rate: f64, delay: f64, loss: f64, buffer_size: u32) {
        self.links.push(Link::new(src, dst, rate, delay, loss, buffer_size));
    }

    /// Builds the undirected adjacency list over `n` nodes and zeroes the
    /// allocation matrix.
    pub fn build_adjacency(&mut self, n: usize) -> Result<()> {
        if let Some(node) = self.nodes.iter().find(|node| node.id.index() >= n) {
            return Err(Error::InvalidTopology(format!("node {} is outside of the {} declared nodes", node.id, n)));
        }

        let mut adjacency: Vec<Vec<NodeId>> = vec![Vec::new(); n];
        for link in &self.links {
            if link.src.index() >= n || link.dst.index() >= n {
                return Err(Error::InvalidTopology(format!(
                    "link {} -> {} references a node outside of the {} declared nodes",
                    link.src, link.dst, n
                )));
            }
            adjacency[link.src.index()].push(link.dst);
            adjacency[link.dst.index()].push(link.src);
        }

        self.nodes.sort_by_key(|node| node.id);
        self.adjacency = adjacency;
        self.allocation = vec![0.0; n * n];
        self.size = n;

        log::debug!("Adjacency built for {} nodes and {} links.", n, self.links.len());
        Ok(())
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_built(&self) -> bool {
        self.allocation.len() == self.size * self.size && self.size > 0
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn neighbors(&self, id: NodeId) -> &[NodeId] {
        self.adjacency.get(id.index()).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.index() < self.size
    }

    pub fn per_stream_unit(&self) -> f64 {
        self.per_stream_unit
    }

    /// Finds the link between `u` and `v` in either direction.
    pub fn find_link(&self, u: NodeId, v: NodeId) -> Option<&Link> {
        self.links.iter().find(|link| link.connects(u, v))
    }

    /// Shortest route from `source` to `dest` with unit edge weights.
    ///
    /// The search is rooted at `dest`. Among undiscovered nodes at equal
    /// distance the lowest index is settled first, which makes the route
    /// deterministic. The path is reconstructed from `source` to `dest`.
    pub fn find_route(&self, source: NodeId, dest: NodeId) -> Result<Path> {
        if !self.is_built() {
            return Err(Error::InvalidTopology("adjacency has not been built".to_string()));
        }
        for id in [source, dest] {
            if !self.contains(id) {
                return Err(Error::UnknownNode(id));
            }
        }
        if source == dest {
            return Ok(Path::trivial(source));
        }

        let n = self.size;
        let (s, t) = (source.index(), dest.index());
        let mut dist = vec![usize::MAX; n];
        let mut prev = vec![usize::MAX; n];
        let mut discovered = vec![false; n];

        dist[t] = 0;
        prev[t] = t;
        discovered[t] = true;

        let mut current = t;
        while current != s {
            for neighbor in &self.adjacency[current] {
                let j = neighbor.index();
                if !discovered[j] && dist[current] + 1 < dist[j] {
                    dist[j] = dist[current] + 1;
                    prev[j] = current;
                }
            }

            let next = (0..n).filter(|&i| !discovered[i] && dist[i] != usize::MAX).min_by_key(|&i| (dist[i], i));
            match next {
                Some(i) => {
                    discovered[i] = true;
                    current = i;
                }
                None => {
                    log::error!("UnreachableRoute: No route from {} to {}. The topology is disconnected.", source, dest);
                    return Err(Error::UnreachableRoute { from: source, to: dest });
                }
            }
        }

        let mut path = Path::with_capacity(dist[s] + 1);
        let mut hop = s;
        while hop != t {
            path.push_hop(NodeId::new(hop));
            hop = prev[hop];
        }
        path.push_hop(dest);

        log::debug!("Route {} -> {}: {}", source, dest, path);
        Ok(path)
    }

    fn slot(&self, u: NodeId, v: NodeId) -> Option<usize> {
        if u.index() < self.size && v.index() < self.size { Some(u.index() * self.size + v.index()) } else { None }
    }

    /// Checks whether `increment` bit/s more fit on the directed edge
    /// `(u, v)`. Pairs without a link are always admissible.
    pub fn can_admit(&self, u: NodeId, v: NodeId, increment: f64) -> bool {
        let Some(link) = self.find_link(u, v) else {
            return true;
        };

        self.allocation(u, v) + increment <= link.rate
    }

    pub fn can_admit_stream(&self, u: NodeId, v: NodeId) -> bool {
        self.can_admit(u, v, self.per_stream_unit)
    }

    /// Adds one per-stream unit to the directed edge `(u, v)`.
    pub fn allocate(&mut self, u: NodeId, v: NodeId) {
        match self.slot(u, v) {
            Some(slot) => self.allocation[slot] += self.per_stream_unit,
            None => log::warn!("AllocationOutOfRange: Edge ({}, {}) is outside of the allocation matrix.", u, v),
        }
    }

    /// Takes `streams` per-stream units off the directed edge `(u, v)`,
    /// never going below zero.
    pub fn release(&mut self, u: NodeId, v: NodeId, streams: usize) {
        if let Some(slot) = self.slot(u, v) {
            self.allocation[slot] = (self.allocation[slot] - streams as f64 * self.per_stream_unit).max(0.0);
        }
    }

    pub fn reset_allocation(&mut self, u: NodeId, v: NodeId) {
        if let Some(slot) = self.slot(u, v) {
            self.allocation[slot] = 0.0;
        }
    }

    pub fn allocation(&self, u: NodeId, v: NodeId) -> f64 {
        self.slot(u, v).map(|slot| self.allocation[slot]).unwrap_or(0.0)
    }

    /// Checks whether the aggregate demand of the given groups fits the raw
    /// rate of the link between `u` and `v`. Current allocation is ignored.
    pub fn can_admit_groups(&self, groups: &[Group], indices: &[GroupId], u: NodeId, v: NodeId) -> bool {
        let Some(link) = self.find_link(u, v) else {
            return false;
        };

        let users: usize = indices.iter().filter_map(|id| groups.get(id.index())).map(Group::user_count).sum();
        users as f64 * self.per_stream_unit <= link.rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: usize) -> NodeId {
        NodeId::new(id)
    }

    /// Square 0-1-2-3-0 with a tail 3-4.
    fn create_ring_graph() -> TopologyGraph {
        let mut graph = TopologyGraph::new(1.0);
        for id in 0..5 {
            graph.add_node(node(id), NodeKind::Router);
        }
        graph.add_link(node(0), node(1), 10.0, 0.0, 0.0, 0);
        graph.add_link(node(1), node(2), 10.0, 0.0, 0.0, 0);
        graph.add_link(node(2), node(3), 10.0, 0.0, 0.0, 0);
        graph.add_link(node(3), node(0), 10.0, 0.0, 0.0, 0);
        graph.add_link(node(3), node(4), 10.0, 0.0, 0.0, 0);
        graph.build_adjacency(5).unwrap();
        graph
    }

    #[test]
    fn test_tie_break_prefers_lowest_index() {
        let graph = create_ring_graph();

        // 0 and 2 are both one hop from 1 and from 3; search rooted at 2
        // settles 1 before 3, so the route from 0 runs through 1.
        let route = graph.find_route(node(0), node(2)).unwrap();
        assert_eq!(route.hops(), &[node(0), node(1), node(2)]);
    }

    #[test]
    fn test_allocation_is_directional() {
        let mut graph = create_ring_graph();

        graph.allocate(node(0), node(1));
        assert_eq!(graph.allocation(node(0), node(1)), 1.0);
        assert_eq!(graph.allocation(node(1), node(0)), 0.0);

        graph.reset_allocation(node(0), node(1));
        assert_eq!(graph.allocation(node(0), node(1)), 0.0);
    }

    #[test]
    fn test_release_saturates_at_zero() {
        let mut graph = create_ring_graph();
        graph.allocate(node(1), node(2));
        graph.allocate(node(1), node(2));

        graph.release(node(1), node(2), 1);
        assert_eq!(graph.allocation(node(1), node(2)), 1.0);

        graph.release(node(1), node(2), 5);
        assert_eq!(graph.allocation(node(1), node(2)), 0.0);
    }

    #[test]
    fn test_can_admit_without_link_is_vacuous() {
        let graph = create_ring_graph();
        assert!(graph.can_admit(node(0), node(4), 1e12));
        assert!(!graph.can_admit_groups(&[], &[], node(0), node(4)));
    }

    #[test]
    fn test_build_rejects_dangling_link() {
        let mut graph = TopologyGraph::new(1.0);
        graph.add_node(node(0), NodeKind::Router);
        graph.add_link(node(0), node(3), 10.0, 0.0, 0.0, 0);
        assert!(matches!(graph.build_adjacency(1), Err(Error::InvalidTopology(_))));
    }
}
