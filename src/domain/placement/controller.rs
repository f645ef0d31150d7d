use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

use crate::domain::group::group::{GroupKeyMode, StreamBooking};
use crate::domain::group::redirection::ServerRedirectionTable;
use crate::domain::group::registry::GroupRegistry;
use crate::domain::network::addressing::AddressPlan;
use crate::domain::network::topology::TopologyGraph;
use crate::domain::optimizer::protocol::{RosterEntry, SolverRequest, SolverResponse};
use crate::domain::placement::reallocation::{PlacementDecision, PlacementReason, plan_reallocation};
use crate::domain::placement::servers::ServerPool;
use crate::domain::placement::strategy::ResolutionStrategy;
use crate::domain::utils::id::{ContentId, GroupId, NodeId, UserId};
use crate::error::{Error, Result};

/// Result of a viewer arrival. A full first hop is reported to the caller,
/// who decides whether to provision capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionOutcome {
    Accepted { group: GroupId, edge: Option<(NodeId, NodeId)> },
    CapacityExceeded { group: GroupId, edge: (NodeId, NodeId) },
}

impl AdmissionOutcome {
    pub fn group(&self) -> GroupId {
        match self {
            AdmissionOutcome::Accepted { group, .. } | AdmissionOutcome::CapacityExceeded { group, .. } => *group,
        }
    }
}

/// A group pointed at a (possibly unchanged) serving node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Relocation {
    pub group: GroupId,
    pub from: NodeId,
    pub to: NodeId,
    pub server_ip: String,
    /// False when the group was confirmed on the node already serving it.
    pub moved: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CongestionOutcome {
    pub edge: (NodeId, NodeId),
    pub candidates: Vec<GroupId>,
    pub relocations: Vec<Relocation>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CongestionResponse {
    Reallocated(CongestionOutcome),
    /// Handed to the optimizer; the placement arrives later.
    Escalated(Uuid),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscalationOutcome {
    pub request_id: Uuid,
    pub applied: Vec<Relocation>,
    pub skipped: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerStats {
    pub admissions_accepted: usize,
    pub admissions_rejected: usize,
    pub congestion_events: usize,
    pub relocations: usize,
    pub escalations_submitted: usize,
    pub escalations_completed: usize,
    pub assignments_applied: usize,
    pub assignments_skipped: usize,
    pub servers_activated: usize,
}

#[derive(Debug, Clone)]
struct PendingEscalation {
    edge: (NodeId, NodeId),
    group_count: usize,
}

/// Owns all placement state of the control plane and applies every
/// decision to it.
///
/// Each public operation runs to completion and leaves the topology
/// allocation, the groups and the redirection table consistent with one
/// another. Solver answers are applied through `complete_escalation`.
#[derive(Debug)]
pub struct PlacementController {
    graph: TopologyGraph,
    addresses: AddressPlan,
    registry: GroupRegistry,
    redirections: ServerRedirectionTable,
    servers: ServerPool,
    strategy: ResolutionStrategy,
    stats: ControllerStats,
    pending: HashMap<Uuid, PendingEscalation>,
}

impl PlacementController {
    pub fn new(graph: TopologyGraph, addresses: AddressPlan, servers: ServerPool, key_mode: GroupKeyMode, strategy: ResolutionStrategy) -> Self {
        PlacementController {
            graph,
            addresses,
            registry: GroupRegistry::new(key_mode),
            redirections: ServerRedirectionTable::new(),
            servers,
            strategy,
            stats: ControllerStats::default(),
            pending: HashMap::new(),
        }
    }

    /// Admits a viewer session and checks the group's first hop.
    ///
    /// The viewer always ends up in its group; only the allocation for the
    /// first hop depends on the admission check.
    pub fn on_new_request(&mut self, from: NodeId, to: NodeId, content: ContentId, user: UserId) -> Result<AdmissionOutcome> {
        let group = self.registry.admit_user(&self.graph, &self.addresses, &mut self.redirections, from, to, content, user)?;
        let edge = self.registry.get(group).ok_or(Error::UnknownGroup(group))?.route.current_edge();

        let Some((u, v)) = edge else {
            self.stats.admissions_accepted += 1;
            return Ok(AdmissionOutcome::Accepted { group, edge: None });
        };

        if self.graph.can_admit_stream(u, v) {
            self.graph.allocate(u, v);
            self.registry.get_mut(group).ok_or(Error::UnknownGroup(group))?.book_stream((u, v));
            self.stats.admissions_accepted += 1;
            Ok(AdmissionOutcome::Accepted { group, edge: Some((u, v)) })
        } else {
            self.stats.admissions_rejected += 1;
            log::info!(
                "CapacityExceeded: User {} in group {} does not fit on edge ({}, {}) with {:.0} bit/s allocated.",
                user,
                group,
                u,
                v,
                self.graph.allocation(u, v)
            );
            Ok(AdmissionOutcome::CapacityExceeded { group, edge: (u, v) })
        }
    }

    /// Reacts to a congested link according to the configured strategy.
    pub fn handle_congestion(&mut self, u: NodeId, v: NodeId) -> Result<CongestionResponse> {
        match self.strategy {
            ResolutionStrategy::Greedy => self.on_link_congested(u, v).map(CongestionResponse::Reallocated),
            ResolutionStrategy::Optimizer(_) => self.optimizer_escalation(u, v).map(CongestionResponse::Escalated),
        }
    }

    /// Greedy reaction: releases the edge and re-homes every group using it.
    pub fn on_link_congested(&mut self, u: NodeId, v: NodeId) -> Result<CongestionOutcome> {
        self.stats.congestion_events += 1;
        self.graph.reset_allocation(u, v);
        self.registry.clear_bookings_on(u, v);

        let candidates = self.registry.groups_traversing(u, v);
        log::info!("Congestion on ({}, {}): {} groups affected.", u, v, candidates.len());

        let relocations = self.reallocate(&candidates)?;
        Ok(CongestionOutcome { edge: (u, v), candidates, relocations })
    }

    /// Plans and applies new serving nodes for `candidates`.
    pub fn reallocate(&mut self, candidates: &[GroupId]) -> Result<Vec<Relocation>> {
        let decisions = plan_reallocation(&self.graph, self.registry.groups(), candidates);

        let mut relocations = Vec::with_capacity(candidates.len());
        for decision in &decisions {
            relocations.extend(self.apply_placement(decision)?);
        }
        Ok(relocations)
    }

    fn apply_placement(&mut self, decision: &PlacementDecision) -> Result<Vec<Relocation>> {
        let mut relocations = Vec::with_capacity(decision.groups.len());

        for &group_id in &decision.groups {
            let group = self.registry.get(group_id).ok_or(Error::UnknownGroup(group_id))?;
            let content = group.content;

            self.release_booking(group_id)?;
            relocations.push(self.apply_redirection(group_id, decision.node, content)?);

            let edge = match decision.reason {
                PlacementReason::CoLocated { edge } => Some(edge),
                PlacementReason::PathExhausted => None,
            };
            self.book_group(group_id, edge)?;
        }

        let address = self.addresses.node_address(decision.node)?;
        self.servers.warm(decision.node, address);
        Ok(relocations)
    }

    /// Serves `group` from `node`: reroutes it from `node` to its AP and
    /// publishes `node`'s address for the group's key.
    pub fn apply_redirection(&mut self, group_id: GroupId, node: NodeId, content: ContentId) -> Result<Relocation> {
        let server_ip = self.addresses.node_address(node)?;
        let origin = self.registry.get(group_id).ok_or(Error::UnknownGroup(group_id))?.from;
        let route = self.graph.find_route(node, origin)?;

        let group = self.registry.get_mut(group_id).ok_or(Error::UnknownGroup(group_id))?;
        let previous = group.serving_node;
        group.route = route;
        group.serving_node = node;
        group.server_ip = server_ip.clone();
        let key = group.key.with_content(content);

        self.redirections.assign(key, server_ip.clone());

        let moved = previous != node;
        if moved {
            self.stats.relocations += 1;
            log::info!("Group {} redirected from {} to {} ({}).", group_id, previous, node, server_ip);
        } else {
            log::debug!("Group {} confirmed on {} ({}).", group_id, node, server_ip);
        }

        Ok(Relocation { group: group_id, from: previous, to: node, server_ip, moved })
    }

    /// Submits the full group roster to the optimizer and returns the
    /// request id. The answer is applied by `complete_escalation`.
    pub fn optimizer_escalation(&mut self, u: NodeId, v: NodeId) -> Result<Uuid> {
        let ResolutionStrategy::Optimizer(client) = &self.strategy else {
            return Err(Error::ConfigError("optimizer escalation requires the optimizer strategy".to_string()));
        };

        let node_count = self.graph.size();
        let roster: Vec<RosterEntry> = self
            .registry
            .groups()
            .iter()
            .enumerate()
            .map(|(index, group)| RosterEntry { ap: group.ap.index(), synthetic_id: index + node_count, index, user_count: group.user_count() })
            .collect();

        let request = SolverRequest::new((u.index(), v.index()), roster);
        let request_id = request.id;
        let group_count = request.roster.len();
        client.submit(request)?;

        self.pending.insert(request_id, PendingEscalation { edge: (u, v), group_count });
        self.stats.congestion_events += 1;
        self.stats.escalations_submitted += 1;
        log::info!("Congestion on ({}, {}) escalated to the optimizer as request {} ({} groups).", u, v, request_id, group_count);

        Ok(request_id)
    }

    /// Applies a solver answer.
    ///
    /// Each assignment redirects its group when the chosen server already
    /// hosts the group's content, or can take it on. Everything else is
    /// skipped; nothing in a solver answer is treated as fatal.
    pub fn complete_escalation(&mut self, response: SolverResponse) -> EscalationOutcome {
        let mut outcome = EscalationOutcome { request_id: response.request_id, applied: Vec::new(), skipped: 0 };

        let Some(pending) = self.pending.remove(&response.request_id) else {
            log::warn!("UnknownSolverResponse: Ignoring answer for request {} that is not pending.", response.request_id);
            return outcome;
        };
        self.stats.escalations_completed += 1;

        if let Some(error) = &response.error {
            log::warn!("Solver request {} for ({}, {}) failed: {}", response.request_id, pending.edge.0, pending.edge.1, error);
        }

        for assignment in &response.assignments {
            match self.apply_assignment(assignment.group_index, assignment.server_id) {
                Ok(Some(relocation)) => outcome.applied.push(relocation),
                Ok(None) => outcome.skipped += 1,
                Err(e) => {
                    log::warn!("AssignmentFailed: Group {} to server {}: {}", assignment.group_index, assignment.server_id, e);
                    outcome.skipped += 1;
                }
            }
        }

        if pending.group_count != self.registry.len() {
            log::debug!("Roster of request {} had {} groups, {} are registered now.", response.request_id, pending.group_count, self.registry.len());
        }

        self.stats.assignments_applied += outcome.applied.len();
        self.stats.assignments_skipped += outcome.skipped;
        log::info!("Solver request {} applied: {} redirected, {} skipped.", response.request_id, outcome.applied.len(), outcome.skipped);
        outcome
    }

    fn apply_assignment(&mut self, group_index: usize, server_id: usize) -> Result<Option<Relocation>> {
        let group_id = GroupId::new(group_index);
        let node = NodeId::new(server_id);

        let Some(group) = self.registry.get(group_id) else {
            log::debug!("Assignment references unknown group {}, skipping.", group_index);
            return Ok(None);
        };
        if !self.graph.contains(node) {
            log::debug!("Assignment references unknown server {}, skipping.", server_id);
            return Ok(None);
        }
        let content = group.content;

        let address = self.addresses.node_address(node)?;
        self.servers.ensure(node, address);

        if !self.servers.has_content(node, content) && !self.servers.assign_content(node, content) {
            log::debug!("Server {} cannot host content {} for group {}, skipping.", node, content, group_id);
            return Ok(None);
        }

        self.release_booking(group_id)?;
        let relocation = self.apply_redirection(group_id, node, content)?;
        let edge = self.registry.get(group_id).ok_or(Error::UnknownGroup(group_id))?.route.current_edge();
        self.book_group(group_id, edge)?;
        Ok(Some(relocation))
    }

    /// Gives back whatever the group holds on its old first hop.
    fn release_booking(&mut self, group_id: GroupId) -> Result<()> {
        let group = self.registry.get_mut(group_id).ok_or(Error::UnknownGroup(group_id))?;
        if let Some(booking) = group.booking.take() {
            self.graph.release(booking.edge.0, booking.edge.1, booking.streams);
        }
        Ok(())
    }

    /// Books one stream per viewer of the group on `edge`.
    fn book_group(&mut self, group_id: GroupId, edge: Option<(NodeId, NodeId)>) -> Result<()> {
        let group = self.registry.get_mut(group_id).ok_or(Error::UnknownGroup(group_id))?;
        let Some((u, v)) = edge else {
            group.booking = None;
            return Ok(());
        };

        let streams = group.user_count();
        for _ in 0..streams {
            self.graph.allocate(u, v);
        }
        group.booking = Some(StreamBooking { edge: (u, v), streams });
        Ok(())
    }

    /// Turns every warmed server on.
    pub fn activate_warmed_servers(&mut self) -> Vec<NodeId> {
        let activated = self.servers.activate_warmed();
        if !activated.is_empty() {
            self.stats.servers_activated += activated.len();
            log::info!("Activated {} servers: {:?}", activated.len(), activated);
        }
        activated
    }

    /// Server a viewer should fetch `content` from.
    pub fn lookup_server(&self, user: UserId, content: ContentId) -> Option<&str> {
        let attachment = self.addresses.client(user)?;
        let key = self.registry.key_mode().key_for(&attachment.broadcast, content);
        self.redirections.get(&key)
    }

    /// Fluid estimate of the demand crossing the link `u`-`v`, in bit/s.
    pub fn estimated_link_load(&self, u: NodeId, v: NodeId) -> f64 {
        let unit = self.graph.per_stream_unit();
        self.registry.groups().iter().filter(|group| group.route.traverses_link(u, v)).map(|group| group.demand(unit)).sum()
    }

    pub fn graph(&self) -> &TopologyGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut TopologyGraph {
        &mut self.graph
    }

    pub fn addresses(&self) -> &AddressPlan {
        &self.addresses
    }

    pub fn registry(&self) -> &GroupRegistry {
        &self.registry
    }

    pub fn redirections(&self) -> &ServerRedirectionTable {
        &self.redirections
    }

    pub fn servers(&self) -> &ServerPool {
        &self.servers
    }

    pub fn strategy(&self) -> &ResolutionStrategy {
        &self.strategy
    }

    pub fn stats(&self) -> &ControllerStats {
        &self.stats
    }

    pub fn pending_escalations(&self) -> usize {
        self.pending.len()
    }
}
