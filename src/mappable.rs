use std::{
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
};

use serde::{Deserialize, Serialize};

use crate::types::{EntityType, NodeSide};

/// One relationship instance between two node identities.
///
/// Identity is `(start_node_id, end_node_id, relationship_type)`; the declared
/// end types only take part in group lookups.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MappedRelationship {
    start_node_id: i64,
    end_node_id: i64,
    relationship_type: String,
    start_node_type: EntityType,
    end_node_type: EntityType,
}

impl MappedRelationship {
    pub fn new(
        start_node_id: i64,
        relationship_type: impl Into<String>,
        end_node_id: i64,
        start_node_type: impl Into<EntityType>,
        end_node_type: impl Into<EntityType>,
    ) -> Self {
        Self {
            start_node_id,
            end_node_id,
            relationship_type: relationship_type.into(),
            start_node_type: start_node_type.into(),
            end_node_type: end_node_type.into(),
        }
    }

    pub fn start_node_id(&self) -> i64 {
        self.start_node_id
    }

    pub fn end_node_id(&self) -> i64 {
        self.end_node_id
    }

    pub fn relationship_type(&self) -> &str {
        &self.relationship_type
    }

    pub fn start_node_type(&self) -> &EntityType {
        &self.start_node_type
    }

    pub fn end_node_type(&self) -> &EntityType {
        &self.end_node_type
    }

    pub fn node_id(&self, side: NodeSide) -> i64 {
        match side {
            NodeSide::Start => self.start_node_id,
            NodeSide::End => self.end_node_id,
        }
    }

    pub fn node_type(&self, side: NodeSide) -> &EntityType {
        match side {
            NodeSide::Start => &self.start_node_type,
            NodeSide::End => &self.end_node_type,
        }
    }

    /// Same relationship instance, ignoring declared types.
    pub fn describes_same(&self, other: &MappedRelationship) -> bool {
        self.start_node_id == other.start_node_id
            && self.end_node_id == other.end_node_id
            && self.relationship_type == other.relationship_type
    }

    fn key(&self) -> (i64, i64, &str) {
        (
            self.start_node_id,
            self.end_node_id,
            self.relationship_type.as_str(),
        )
    }
}

impl PartialEq for MappedRelationship {
    fn eq(&self, other: &Self) -> bool {
        self.describes_same(other)
    }
}

impl Eq for MappedRelationship {}

impl Hash for MappedRelationship {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl PartialOrd for MappedRelationship {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MappedRelationship {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl fmt::Display for MappedRelationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({})-[:{}]->({})",
            self.start_node_id, self.relationship_type, self.end_node_id
        )
    }
}
