use std::fmt;

use crate::domain::utils::id::NodeId;

/// Ordered hop sequence with a traversal cursor.
///
/// The cursor always points at a valid hop (`0..len`), or at `0` when the
/// path is empty. Routes are rebuilt from scratch on every route
/// computation; afterwards only the cursor moves.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Path {
    hops: Vec<NodeId>,
    cursor: usize,
}

impl Path {
    pub fn new() -> Self {
        Path { hops: Vec::new(), cursor: 0 }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Path { hops: Vec::with_capacity(capacity), cursor: 0 }
    }

    /// One-node path, used when source and destination coincide.
    pub fn trivial(node: NodeId) -> Self {
        Path { hops: vec![node], cursor: 0 }
    }

    pub fn push_hop(&mut self, hop: NodeId) {
        self.hops.push(hop);
    }

    pub fn from(&self) -> Option<NodeId> {
        self.hops.first().copied()
    }

    pub fn to(&self) -> Option<NodeId> {
        self.hops.last().copied()
    }

    pub fn len(&self) -> usize {
        self.hops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hops.is_empty()
    }

    pub fn hops(&self) -> &[NodeId] {
        &self.hops
    }

    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn go_start(&mut self) {
        self.cursor = 0;
    }

    pub fn actual_step(&self) -> Option<NodeId> {
        self.hops.get(self.cursor).copied()
    }

    /// Hop after the cursor. `None` once the cursor sits on the last hop.
    pub fn next_step(&self) -> Option<NodeId> {
        self.hops.get(self.cursor + 1).copied()
    }

    /// Directed edge `(actual, next)` under the cursor.
    pub fn current_edge(&self) -> Option<(NodeId, NodeId)> {
        Some((self.actual_step()?, self.next_step()?))
    }

    pub fn go_ahead(&mut self) {
        if self.cursor + 1 < self.hops.len() {
            self.cursor += 1;
        }
    }

    pub fn go_back(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    /// Places the cursor on the tail of the last link (`len - 2`).
    pub fn go_last_link(&mut self) {
        self.cursor = self.hops.len().saturating_sub(2);
    }

    pub fn is_end_path(&self) -> bool {
        self.cursor + 1 >= self.hops.len()
    }

    pub fn clear(&mut self) {
        self.hops.clear();
        self.cursor = 0;
    }

    pub fn edges(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.hops.windows(2).map(|pair| (pair[0], pair[1]))
    }

    /// True if the directed edge `(u, v)` appears anywhere on the path.
    pub fn traverses(&self, u: NodeId, v: NodeId) -> bool {
        self.edges().any(|edge| edge == (u, v))
    }

    /// True if the directed edge `(u, v)` appears at or after the cursor.
    pub fn traverses_ahead(&self, u: NodeId, v: NodeId) -> bool {
        self.hops.get(self.cursor..).is_some_and(|rest| rest.windows(2).any(|pair| pair[0] == u && pair[1] == v))
    }

    /// True if the link between `u` and `v` is used in either direction.
    pub fn traverses_link(&self, u: NodeId, v: NodeId) -> bool {
        self.edges().any(|edge| edge == (u, v) || edge == (v, u))
    }

    /// Moves the cursor onto the directed edge `(u, v)`.
    ///
    /// Scans from the start. When the edge is missing the cursor is left at
    /// the end of the path and `false` is returned.
    pub fn seek_edge(&mut self, u: NodeId, v: NodeId) -> bool {
        self.go_start();
        while !self.is_end_path() {
            if self.current_edge() == Some((u, v)) {
                return true;
            }
            self.go_ahead();
        }
        false
    }
}

impl FromIterator<NodeId> for Path {
    fn from_iter<I: IntoIterator<Item = NodeId>>(iter: I) -> Self {
        Path { hops: iter.into_iter().collect(), cursor: 0 }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hops.is_empty() {
            return write!(f, "Path: empty");
        }

        let hops: Vec<String> = self.hops.iter().map(|hop| hop.to_string()).collect();
        write!(f, "Path: {}", hops.join(" -> "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_path() -> Path {
        (0..4).map(NodeId::new).collect()
    }

    #[test]
    fn test_cursor_walk() {
        let mut path = line_path();

        assert_eq!(path.actual_step(), Some(NodeId::new(0)));
        assert_eq!(path.next_step(), Some(NodeId::new(1)));

        path.go_ahead();
        path.go_ahead();
        path.go_ahead();
        assert!(path.is_end_path());
        assert_eq!(path.next_step(), None);

        // Saturates at the last hop.
        path.go_ahead();
        assert_eq!(path.position(), 3);

        path.go_last_link();
        assert_eq!(path.current_edge(), Some((NodeId::new(2), NodeId::new(3))));

        path.go_start();
        path.go_back();
        assert_eq!(path.position(), 0);
    }

    #[test]
    fn test_push_sets_endpoints() {
        let mut path = Path::new();
        assert!(path.is_end_path());
        assert_eq!(path.from(), None);

        path.push_hop(NodeId::new(5));
        path.push_hop(NodeId::new(2));

        assert_eq!(path.from(), Some(NodeId::new(5)));
        assert_eq!(path.to(), Some(NodeId::new(2)));
        assert_eq!(path.len(), 2);
    }

    #[test]
    fn test_seek_and_traversal() {
        let mut path = line_path();

        assert!(path.traverses(NodeId::new(1), NodeId::new(2)));
        assert!(!path.traverses(NodeId::new(2), NodeId::new(1)));
        assert!(path.traverses_link(NodeId::new(2), NodeId::new(1)));

        assert!(path.seek_edge(NodeId::new(1), NodeId::new(2)));
        assert_eq!(path.position(), 1);
        assert!(!path.traverses_ahead(NodeId::new(0), NodeId::new(1)), "Edge behind the cursor must not count");
        assert!(path.traverses_ahead(NodeId::new(2), NodeId::new(3)));

        assert!(!path.seek_edge(NodeId::new(3), NodeId::new(0)));
        assert!(path.is_end_path());
    }

    #[test]
    fn test_display() {
        assert_eq!(line_path().to_string(), "Path: 0 -> 1 -> 2 -> 3");

        let mut path = line_path();
        path.clear();
        assert_eq!(path.to_string(), "Path: empty");
        assert_eq!(path.position(), 0);
    }
}
