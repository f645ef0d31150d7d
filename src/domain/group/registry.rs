use std::collections::HashMap;

use crate::domain::group::end_user::EndUser;
use crate::domain::group::group::{Group, GroupKey, GroupKeyMode};
use crate::domain::group::redirection::ServerRedirectionTable;
use crate::domain::network::addressing::AddressPlan;
use crate::domain::network::topology::TopologyGraph;
use crate::domain::utils::id::{ContentId, GroupId, NodeId, UserId};
use crate::error::{Error, Result};

/// Deduplicates viewers into groups. At most one group lives per key, and
/// groups are never removed, so a `GroupId` is a stable index.
#[derive(Debug, Clone)]
pub struct GroupRegistry {
    groups: Vec<Group>,
    index: HashMap<GroupKey, GroupId>,
    key_mode: GroupKeyMode,
}

impl GroupRegistry {
    pub fn new(key_mode: GroupKeyMode) -> Self {
        GroupRegistry { groups: Vec::new(), index: HashMap::new(), key_mode }
    }

    pub fn key_mode(&self) -> GroupKeyMode {
        self.key_mode
    }

    /// Places `user` into the group for its broadcast domain and content,
    /// creating the group on first sight.
    ///
    /// A new group is routed from `to` down to `from` and served from
    /// whatever the redirection table already holds for its key, or from
    /// `to` when the key is new.
    #[allow(clippy::too_many_arguments)]
    pub fn admit_user(
        &mut self,
        graph: &TopologyGraph,
        addresses: &AddressPlan,
        redirections: &mut ServerRedirectionTable,
        from: NodeId,
        to: NodeId,
        content: ContentId,
        user: UserId,
    ) -> Result<GroupId> {
        let attachment = addresses.client(user).ok_or(Error::UnknownClient(user))?;
        let key = self.key_mode.key_for(&attachment.broadcast, content);
        let end_user = EndUser::new(user, attachment.ip.clone(), content);

        if let Some(&group_id) = self.index.get(&key) {
            let group = &mut self.groups[group_id.index()];
            group.add_user(end_user);
            log::debug!("User {} joined group {} ({}), now {} users.", user, group_id, key, group.user_count());
            return Ok(group_id);
        }

        let route = graph.find_route(to, from)?;
        let server_ip = match redirections.get(&key) {
            Some(ip) => ip.to_string(),
            None => {
                let ip = addresses.node_address(to)?;
                redirections.assign(key.clone(), ip.clone());
                ip
            }
        };
        let serving_node = addresses.node_for_address(&server_ip).unwrap_or(to);

        let group_id = GroupId::new(self.groups.len());
        log::info!("New group {} ({}) for user {}, served by {} over {}.", group_id, key, user, server_ip, route);

        self.index.insert(key.clone(), group_id);
        self.groups.push(Group::new(group_id, key, server_ip, serving_node, from, to, route, end_user));

        Ok(group_id)
    }

    pub fn get(&self, id: GroupId) -> Option<&Group> {
        self.groups.get(id.index())
    }

    pub fn get_mut(&mut self, id: GroupId) -> Option<&mut Group> {
        self.groups.get_mut(id.index())
    }

    pub fn find(&self, key: &GroupKey) -> Option<GroupId> {
        self.index.get(key).copied()
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn total_users(&self) -> usize {
        self.groups.iter().map(Group::user_count).sum()
    }

    /// Groups whose route uses the link `u`-`v` in either direction, in
    /// registration order.
    pub fn groups_traversing(&self, u: NodeId, v: NodeId) -> Vec<GroupId> {
        self.groups.iter().filter(|group| group.route.traverses_link(u, v)).map(|group| group.id).collect()
    }

    /// Forgets every booking on the directed edge `(u, v)` after its
    /// counter was reset.
    pub fn clear_bookings_on(&mut self, u: NodeId, v: NodeId) {
        for group in &mut self.groups {
            if group.booking.is_some_and(|booking| booking.edge == (u, v)) {
                group.booking = None;
            }
        }
    }
}
