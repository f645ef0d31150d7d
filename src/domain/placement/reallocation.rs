use std::collections::HashSet;

use crate::domain::group::group::Group;
use crate::domain::network::topology::TopologyGraph;
use crate::domain::utils::id::{GroupId, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementReason {
    /// The groups share `edge` and their aggregate demand fits it, so they
    /// are served from the edge's near end.
    CoLocated { edge: (NodeId, NodeId) },
    /// The walk reached the group's AP without finding room upstream.
    PathExhausted,
}

/// Re-home `groups` at `node`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementDecision {
    pub node: NodeId,
    pub groups: Vec<GroupId>,
    pub reason: PlacementReason,
}

/// Unprocessed candidates whose route still has the directed `edge` at or
/// after their own cursor, in candidate order.
pub fn find_common_groups(groups: &[Group], candidates: &[GroupId], processed: &HashSet<GroupId>, edge: (NodeId, NodeId)) -> Vec<GroupId> {
    candidates
        .iter()
        .copied()
        .filter(|id| !processed.contains(id))
        .filter(|id| groups.get(id.index()).is_some_and(|group| group.route.traverses_ahead(edge.0, edge.1)))
        .collect()
}

/// Plans where every candidate group is served after a congestion event.
///
/// Candidates are visited in registration order. For each unprocessed
/// group the planner walks a copy of its route cursor toward the AP; at
/// every hop it collects the groups sharing that hop and places all of
/// them at the hop's near end as soon as their joint demand fits the hop.
/// A group that reaches its AP is placed there alone. Every step either
/// places groups or advances a finite cursor, so the walk terminates and
/// each candidate appears in exactly one decision.
pub fn plan_reallocation(graph: &TopologyGraph, groups: &[Group], candidates: &[GroupId]) -> Vec<PlacementDecision> {
    let mut order = candidates.to_vec();
    order.sort();
    order.dedup();

    let mut processed: HashSet<GroupId> = HashSet::with_capacity(order.len());
    let mut decisions = Vec::new();

    for &group_id in &order {
        if processed.contains(&group_id) {
            continue;
        }
        let Some(group) = groups.get(group_id.index()) else {
            log::warn!("UnknownGroup: Candidate {} is not registered, skipping.", group_id);
            processed.insert(group_id);
            continue;
        };

        let mut cursor = group.route.clone();
        loop {
            let Some(actual) = cursor.actual_step() else {
                log::warn!("EmptyRoute: Group {} has no route to walk.", group_id);
                break;
            };

            let Some(next) = cursor.next_step() else {
                decisions.push(PlacementDecision { node: actual, groups: vec![group_id], reason: PlacementReason::PathExhausted });
                break;
            };

            let common = find_common_groups(groups, &order, &processed, (actual, next));
            if !common.is_empty() && graph.can_admit_groups(groups, &common, actual, next) {
                processed.extend(common.iter().copied());
                decisions.push(PlacementDecision { node: actual, groups: common, reason: PlacementReason::CoLocated { edge: (actual, next) } });
                break;
            }

            cursor.go_ahead();
        }

        processed.insert(group_id);
    }

    decisions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::group::end_user::EndUser;
    use crate::domain::group::group::GroupKey;
    use crate::domain::network::node::NodeKind;
    use crate::domain::network::path::Path;
    use crate::domain::utils::id::{ContentId, UserId};

    fn node(id: usize) -> NodeId {
        NodeId::new(id)
    }

    /// Line 0-1-2-3 with every link carrying `rates[i]` between i and i+1.
    fn create_line_graph(rates: [f64; 3]) -> TopologyGraph {
        let mut graph = TopologyGraph::new(1.0);
        for id in 0..4 {
            graph.add_node(node(id), NodeKind::Router);
        }
        for (i, rate) in rates.iter().enumerate() {
            graph.add_link(node(i), node(i + 1), *rate, 0.0, 0.0, 0);
        }
        graph.build_adjacency(4).unwrap();
        graph
    }

    fn create_group(id: usize, hops: &[usize], users: usize) -> Group {
        let route: Path = hops.iter().copied().map(NodeId::new).collect();
        let ap = *route.hops().last().unwrap();
        let mut group = Group::new(
            GroupId::new(id),
            GroupKey::new(format!("192.168.{}.255", id), None),
            "10.0.0.1".to_string(),
            route.hops()[0],
            ap,
            route.hops()[0],
            route,
            EndUser::new(UserId::new(id * 10), "192.168.0.2", ContentId::new(1)),
        );
        for u in 1..users {
            group.add_user(EndUser::new(UserId::new(id * 10 + u), "192.168.0.3", ContentId::new(1)));
        }
        group
    }

    #[test]
    fn test_groups_walk_until_demand_fits() {
        let graph = create_line_graph([1.0, 5.0, 5.0]);
        let groups = vec![create_group(0, &[0, 1, 2, 3], 2), create_group(1, &[0, 1, 2], 1)];

        let decisions = plan_reallocation(&graph, &groups, &[GroupId::new(0), GroupId::new(1)]);

        assert_eq!(decisions.len(), 1);
        assert_eq!(decisions[0].node, node(1), "Edge 0-1 is too thin, group 0 must move down to node 1");
        assert_eq!(decisions[0].groups, vec![GroupId::new(0), GroupId::new(1)], "Group 1 shares edge 1-2 and moves with group 0");
        assert_eq!(decisions[0].reason, PlacementReason::CoLocated { edge: (node(1), node(2)) });
    }

    #[test]
    fn test_exhausted_path_places_at_ap() {
        let graph = create_line_graph([1.0, 1.0, 1.0]);
        let groups = vec![create_group(0, &[0, 1, 2, 3], 3)];

        let decisions = plan_reallocation(&graph, &groups, &[GroupId::new(0)]);

        assert_eq!(decisions, vec![PlacementDecision { node: node(3), groups: vec![GroupId::new(0)], reason: PlacementReason::PathExhausted }]);
    }

    #[test]
    fn test_single_node_route_terminates() {
        let graph = create_line_graph([1.0, 1.0, 1.0]);
        let groups = vec![create_group(0, &[2], 1)];

        let decisions = plan_reallocation(&graph, &groups, &[GroupId::new(0), GroupId::new(0)]);
        assert_eq!(decisions.len(), 1, "Duplicated candidates are placed once");
        assert_eq!(decisions[0].node, node(2));
    }
}
