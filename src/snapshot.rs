use ahash::{AHashMap, AHashSet};
use serde_json::Value;

use crate::mappable::MappedRelationship;

#[derive(Clone, Debug, PartialEq)]
pub struct NodeState {
    pub labels: Vec<String>,
    pub properties: Value,
}

/// What the database held for the objects being saved, as last loaded.
#[derive(Clone, Debug, Default)]
pub struct MappingSnapshot {
    nodes: AHashMap<i64, NodeState>,
    relationships: AHashSet<MappedRelationship>,
    relationship_entities: AHashMap<i64, Value>,
}

impl MappingSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_node(&mut self, id: i64, labels: Vec<String>, properties: Value) {
        self.nodes.insert(id, NodeState { labels, properties });
    }

    pub fn record_relationship(&mut self, relationship: MappedRelationship) {
        self.relationships.insert(relationship);
    }

    pub fn record_relationship_entity(
        &mut self,
        id: i64,
        relationship: MappedRelationship,
        properties: Value,
    ) {
        self.relationships.insert(relationship);
        self.relationship_entities.insert(id, properties);
    }

    pub fn node(&self, id: i64) -> Option<&NodeState> {
        self.nodes.get(&id)
    }

    pub fn node_unchanged(&self, id: i64, labels: &[String], properties: &Value) -> bool {
        self.nodes
            .get(&id)
            .is_some_and(|state| state.labels == labels && state.properties == *properties)
    }

    pub fn relationship_entity(&self, id: i64) -> Option<&Value> {
        self.relationship_entities.get(&id)
    }

    pub fn contains_relationship(&self, relationship: &MappedRelationship) -> bool {
        self.relationships.contains(relationship)
    }

    pub fn relationships(&self) -> impl Iterator<Item = &MappedRelationship> {
        self.relationships.iter()
    }
}
