use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;

/// Dense integer identifier tagged with the entity it refers to.
///
/// Nodes, users and groups are all addressed by ordinal indices, so the tag
/// keeps a `UserId` from ever being passed where a `NodeId` is expected.
#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id<T> {
    pub id: usize,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T> Id<T> {
    pub const fn new(id: usize) -> Self {
        Id { id, _marker: PhantomData }
    }

    pub fn index(&self) -> usize {
        self.id
    }
}

impl<T> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl<T> From<usize> for Id<T> {
    fn from(id: usize) -> Self {
        Id::new(id)
    }
}

impl<T> From<Id<T>> for usize {
    fn from(id_wrapper: Id<T>) -> Self {
        id_wrapper.id
    }
}

impl<T> fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let full_name = std::any::type_name::<T>();
        let clean_name = full_name.split("::").last().unwrap_or(full_name);
        let display_name = clean_name.replace("Tag", "Id");

        write!(f, "{}: {}", display_name, self.id)
    }
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Hash, Copy)]
pub struct NodeTag;
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Hash, Copy)]
pub struct UserTag;
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Hash, Copy)]
pub struct GroupTag;
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Hash, Copy)]
pub struct ContentTag;

pub type NodeId = Id<NodeTag>;
pub type UserId = Id<UserTag>;
pub type GroupId = Id<GroupTag>;
pub type ContentId = Id<ContentTag>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_uses_tag_name() {
        let node = NodeId::new(7);
        assert_eq!(format!("{:?}", node), "NodeId: 7");
        assert_eq!(format!("{}", node), "7");
    }

    #[test]
    fn test_serde_is_transparent() {
        let content = ContentId::new(3);
        assert_eq!(serde_json::to_string(&content).unwrap(), "3");

        let parsed: ContentId = serde_json::from_str("3").unwrap();
        assert_eq!(parsed, content);
    }
}
