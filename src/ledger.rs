use ahash::{AHashMap, AHashSet};

use crate::identity::ObjectRef;

#[derive(Clone, Debug)]
struct VisitRecord<B> {
    builder: B,
    horizon: i32,
}

/// Which entities were visited during the pass, at what horizon, and which
/// statement builder stands for each of them.
#[derive(Debug)]
pub struct VisitLedger<B> {
    visited: AHashMap<ObjectRef, VisitRecord<B>>,
    relationship_entities: AHashSet<i64>,
}

impl<B> Default for VisitLedger<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B> VisitLedger<B> {
    pub fn new() -> Self {
        Self {
            visited: AHashMap::new(),
            relationship_entities: AHashSet::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            visited: AHashMap::with_capacity(capacity),
            relationship_entities: AHashSet::new(),
        }
    }

    /// An entity is settled only when it was expanded strictly deeper than
    /// `horizon`; an equal or shallower record must be redone.
    pub fn has_been_visited(&self, entity: &ObjectRef, horizon: i32) -> bool {
        self.visited
            .get(entity)
            .is_some_and(|record| record.horizon > horizon)
    }

    pub fn record_visit(&mut self, entity: ObjectRef, builder: B, horizon: i32) {
        self.visited.insert(entity, VisitRecord { builder, horizon });
    }

    pub fn builder_for(&self, entity: &ObjectRef) -> Option<&B> {
        self.visited.get(entity).map(|record| &record.builder)
    }

    pub fn horizon_for(&self, entity: &ObjectRef) -> Option<i32> {
        self.visited.get(entity).map(|record| record.horizon)
    }

    pub fn record_relationship_entity(&mut self, id: i64) -> bool {
        self.relationship_entities.insert(id)
    }

    pub fn has_relationship_entity(&self, id: i64) -> bool {
        self.relationship_entities.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.visited.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visited.is_empty()
    }
}
