//! Working set of relationships seen as present during a pass, and the set of
//! relationships found deleted.
//!
//! A descriptor normally lives in one of the two sets. It sits in both when a
//! new relationship entity replaces a loaded one between the same pair. Group
//! deregistration moves every active descriptor of one shape at one node into
//! the deleted set and reports, through its `bool` result, whether the request
//! was a repeat of an earlier one.

use ahash::AHashSet;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::{
    mappable::MappedRelationship,
    types::{EntityType, NodeSide},
};

/// Which endpoint's declared type a group request is compared against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EndpointType {
    Start,
    End,
}

impl EndpointType {
    fn side(self) -> NodeSide {
        match self {
            EndpointType::Start => NodeSide::Start,
            EndpointType::End => NodeSide::End,
        }
    }
}

/// All relationships of one type at one node on one side, narrowed by the
/// declared type of one endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelationshipGroup {
    pub node_id: i64,
    pub side: NodeSide,
    pub relationship_type: String,
    pub declared_type: EntityType,
    pub compare: EndpointType,
}

impl RelationshipGroup {
    /// `(node)-[:T]->(other)` where `other` has `end_type`.
    pub fn outgoing(
        node_id: i64,
        relationship_type: impl Into<String>,
        end_type: impl Into<EntityType>,
    ) -> Self {
        Self {
            node_id,
            side: NodeSide::Start,
            relationship_type: relationship_type.into(),
            declared_type: end_type.into(),
            compare: EndpointType::End,
        }
    }

    /// `(other)-[:T]->(node)` where `other` has `start_type`.
    pub fn incoming(
        node_id: i64,
        relationship_type: impl Into<String>,
        start_type: impl Into<EntityType>,
    ) -> Self {
        Self {
            node_id,
            side: NodeSide::End,
            relationship_type: relationship_type.into(),
            declared_type: start_type.into(),
            compare: EndpointType::Start,
        }
    }

    pub fn comparing(mut self, compare: EndpointType) -> Self {
        self.compare = compare;
        self
    }

    pub fn matches(&self, relationship: &MappedRelationship) -> bool {
        relationship.node_id(self.side) == self.node_id
            && relationship.relationship_type() == self.relationship_type
            && *relationship.node_type(self.compare.side()) == self.declared_type
    }
}

#[derive(Debug, Default)]
pub struct RelationshipRegistry {
    active: AHashSet<MappedRelationship>,
    deleted: AHashSet<MappedRelationship>,
}

impl RelationshipRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            active: AHashSet::with_capacity(capacity),
            deleted: AHashSet::new(),
        }
    }

    /// Returns `true` when the descriptor was not registered yet.
    pub fn register(&mut self, relationship: MappedRelationship) -> bool {
        self.active.insert(relationship)
    }

    pub fn unregister(&mut self, relationship: &MappedRelationship) -> bool {
        self.active.remove(relationship)
    }

    pub fn is_registered(&self, relationship: &MappedRelationship) -> bool {
        self.active.contains(relationship)
    }

    pub fn is_deleted(&self, relationship: &MappedRelationship) -> bool {
        self.deleted.contains(relationship)
    }

    /// Moves a deleted descriptor back into the active set.
    pub fn restore(&mut self, relationship: &MappedRelationship) -> bool {
        match self.deleted.take(relationship) {
            Some(restored) => {
                trace!(relationship = %restored, "restored deleted relationship");
                self.active.insert(restored);
                true
            }
            None => false,
        }
    }

    /// Marks every active descriptor in `group` as deleted.
    ///
    /// Returns `true` when nothing matched (the group was never persisted) or
    /// when at least one descriptor moved to the deleted set. Returns `false`
    /// when every match was already deleted, including matches that only
    /// remain in the deleted set from an earlier request.
    pub fn deregister_group(&mut self, group: &RelationshipGroup) -> bool {
        let matched: Vec<MappedRelationship> = self
            .active
            .iter()
            .filter(|relationship| group.matches(relationship))
            .cloned()
            .collect();
        if matched.is_empty() {
            if self.deleted.iter().any(|relationship| group.matches(relationship)) {
                debug!(
                    node = group.node_id,
                    relationship_type = %group.relationship_type,
                    "relationship group already deleted"
                );
                return false;
            }
            trace!(
                node = group.node_id,
                relationship_type = %group.relationship_type,
                "nothing to deregister"
            );
            return true;
        }

        let mut moved = 0usize;
        for relationship in matched {
            if self.deleted.contains(&relationship) {
                continue;
            }
            self.active.remove(&relationship);
            self.deleted.insert(relationship);
            moved += 1;
        }
        debug!(
            node = group.node_id,
            side = ?group.side,
            relationship_type = %group.relationship_type,
            declared_type = %group.declared_type,
            moved,
            "deregistered relationship group"
        );
        moved > 0
    }

    pub fn active(&self) -> impl Iterator<Item = &MappedRelationship> {
        self.active.iter()
    }

    pub fn deleted(&self) -> impl Iterator<Item = &MappedRelationship> {
        self.deleted.iter()
    }

    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    pub fn deleted_len(&self) -> usize {
        self.deleted.len()
    }
}
