use std::collections::BTreeMap;

use bimap::BiMap;

use crate::domain::network::node::NodeKind;
use crate::domain::network::topology::TopologyGraph;
use crate::domain::utils::id::{NodeId, UserId};
use crate::error::{Error, Result};

/// Hosts available on an AP subnet (`.2` to `.254`; `.1` is the AP).
const MAX_HOSTS_PER_SUBNET: u16 = 253;

/// Where a viewer is attached and how it is addressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientAttachment {
    pub user: UserId,
    pub ap: NodeId,
    pub ip: String,
    /// Broadcast address of the AP subnet. Viewers on the same AP share it,
    /// and it is the client part of every group key.
    pub broadcast: String,
}

#[derive(Debug, Clone)]
struct ApSubnet {
    prefix: String,
    next_host: u16,
}

/// Deterministic address assignment for the backhaul.
///
/// Every link gets its own `/24` in link order (`10.a.b.0`); the source end
/// takes `.1`, the destination `.2`, and `.255` identifies the link for the
/// monitor. A node is reachable at the first interface it was given. Each
/// AP owns a wireless subnet `192.168.j.0/24` from which viewers are
/// numbered.
#[derive(Debug, Clone)]
pub struct AddressPlan {
    node_addresses: BiMap<NodeId, String>,
    link_broadcasts: BiMap<String, (NodeId, NodeId)>,
    ap_subnets: BTreeMap<NodeId, ApSubnet>,
    clients: Vec<ClientAttachment>,
}

impl AddressPlan {
    pub fn from_topology(graph: &TopologyGraph) -> Result<Self> {
        let mut plan =
            AddressPlan { node_addresses: BiMap::new(), link_broadcasts: BiMap::new(), ap_subnets: BTreeMap::new(), clients: Vec::new() };

        for (k, link) in graph.links().iter().enumerate() {
            let network = format!("10.{}.{}", k / 256, k % 256);
            let _ = plan.node_addresses.insert_no_overwrite(link.src, format!("{}.1", network));
            let _ = plan.node_addresses.insert_no_overwrite(link.dst, format!("{}.2", network));
            let _ = plan.link_broadcasts.insert_no_overwrite(format!("{}.255", network), (link.src, link.dst));
        }

        for node in graph.nodes() {
            if !plan.node_addresses.contains_left(&node.id) {
                let i = node.id.index();
                log::warn!("IsolatedNode: Node {} has no links, assigning a fallback address.", node.id);
                let _ = plan.node_addresses.insert_no_overwrite(node.id, format!("172.16.{}.{}", i / 256, i % 256));
            }
        }

        for (j, node) in graph.nodes().iter().filter(|node| node.is_access_point()).enumerate() {
            let prefix = format!("192.{}.{}", 168 + j / 256, j % 256);
            plan.ap_subnets.insert(node.id, ApSubnet { prefix, next_host: 2 });
        }

        // Client rows of the node file join the first AP they are wired to.
        for node in graph.nodes().iter().filter(|node| node.kind == NodeKind::Client) {
            let ap = graph.neighbors(node.id).iter().copied().find(|neighbor| plan.ap_subnets.contains_key(neighbor));
            match ap {
                Some(ap) => {
                    plan.attach_client(ap)?;
                }
                None => log::debug!("Client node {} is not attached to any AP, skipping.", node.id),
            }
        }

        Ok(plan)
    }

    /// Attaches a new viewer to `ap` and returns its user id.
    pub fn attach_client(&mut self, ap: NodeId) -> Result<UserId> {
        let subnet = self
            .ap_subnets
            .get_mut(&ap)
            .ok_or_else(|| Error::InvalidTopology(format!("node {} is not an access point", ap)))?;

        if subnet.next_host > MAX_HOSTS_PER_SUBNET + 1 {
            return Err(Error::InvalidTopology(format!("address space of AP {} is exhausted", ap)));
        }

        let user = UserId::new(self.clients.len());
        let attachment =
            ClientAttachment { user, ap, ip: format!("{}.{}", subnet.prefix, subnet.next_host), broadcast: format!("{}.255", subnet.prefix) };
        subnet.next_host += 1;

        log::debug!("Client {} attached to AP {} as {}.", user, ap, attachment.ip);
        self.clients.push(attachment);
        Ok(user)
    }

    /// Attaches `count` viewers to every AP, APs in id order.
    pub fn attach_clients_per_ap(&mut self, count: usize) -> Result<Vec<UserId>> {
        let aps: Vec<NodeId> = self.ap_subnets.keys().copied().collect();
        let mut users = Vec::with_capacity(aps.len() * count);
        for ap in aps {
            for _ in 0..count {
                users.push(self.attach_client(ap)?);
            }
        }
        Ok(users)
    }

    pub fn client(&self, user: UserId) -> Option<&ClientAttachment> {
        self.clients.get(user.index())
    }

    pub fn clients(&self) -> &[ClientAttachment] {
        &self.clients
    }

    pub fn access_points(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.ap_subnets.keys().copied()
    }

    pub fn node_address(&self, node: NodeId) -> Result<String> {
        self.node_addresses.get_by_left(&node).cloned().ok_or(Error::UnknownNode(node))
    }

    pub fn node_for_address(&self, address: &str) -> Option<NodeId> {
        self.node_addresses.get_by_right(address).copied()
    }

    /// Broadcast address of the link `(src, dst)` in its declared orientation.
    pub fn link_broadcast(&self, src: NodeId, dst: NodeId) -> Option<&str> {
        self.link_broadcasts.get_by_right(&(src, dst)).map(String::as_str)
    }

    pub fn link_for_broadcast(&self, address: &str) -> Option<(NodeId, NodeId)> {
        self.link_broadcasts.get_by_left(address).copied()
    }

    pub fn link_broadcasts(&self) -> impl Iterator<Item = (&str, (NodeId, NodeId))> {
        self.link_broadcasts.iter().map(|(address, link)| (address.as_str(), *link))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_star_graph() -> TopologyGraph {
        let mut graph = TopologyGraph::new(1.0);
        graph.add_node(NodeId::new(0), NodeKind::CacheServer);
        graph.add_node(NodeId::new(1), NodeKind::AccessPoint);
        graph.add_node(NodeId::new(2), NodeKind::AccessPoint);
        graph.add_link(NodeId::new(0), NodeId::new(1), 10.0, 0.0, 0.0, 0);
        graph.add_link(NodeId::new(0), NodeId::new(2), 10.0, 0.0, 0.0, 0);
        graph.build_adjacency(3).unwrap();
        graph
    }

    #[test]
    fn test_node_addresses_follow_link_order() {
        let plan = AddressPlan::from_topology(&create_star_graph()).unwrap();

        assert_eq!(plan.node_address(NodeId::new(0)).unwrap(), "10.0.0.1");
        assert_eq!(plan.node_address(NodeId::new(1)).unwrap(), "10.0.0.2");
        assert_eq!(plan.node_address(NodeId::new(2)).unwrap(), "10.0.1.2");
        assert_eq!(plan.node_for_address("10.0.1.2"), Some(NodeId::new(2)));
        assert_eq!(plan.link_for_broadcast("10.0.1.255"), Some((NodeId::new(0), NodeId::new(2))));
    }

    #[test]
    fn test_clients_share_ap_broadcast() {
        let mut plan = AddressPlan::from_topology(&create_star_graph()).unwrap();
        let users = plan.attach_clients_per_ap(2).unwrap();

        assert_eq!(users.len(), 4);
        let first = plan.client(users[0]).unwrap();
        let second = plan.client(users[1]).unwrap();
        let other_ap = plan.client(users[2]).unwrap();

        assert_eq!(first.broadcast, second.broadcast, "Clients of one AP share a broadcast domain");
        assert_ne!(first.ip, second.ip);
        assert_ne!(first.broadcast, other_ap.broadcast);
        assert_eq!(first.ip, "192.168.0.2");
    }

    #[test]
    fn test_attach_to_non_ap_fails() {
        let mut plan = AddressPlan::from_topology(&create_star_graph()).unwrap();
        assert!(plan.attach_client(NodeId::new(0)).is_err());
    }
}
