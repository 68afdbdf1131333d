//! Temporary references for entities that will become new nodes, and their
//! reconciliation with the ids the database assigns.

use ahash::AHashMap;
use tracing::trace;

use crate::{identity::ObjectRef, object_log::ObjectLog};

/// Maps a temporary reference to the identifier that should be written in its
/// place. Unknown references resolve to themselves.
pub trait IdResolver {
    fn resolve(&self, reference: i64) -> i64;

    fn is_resolved(&self, reference: i64) -> bool {
        self.resolve(reference) != reference
    }
}

#[derive(Debug, Default)]
pub struct ReferenceTable {
    new_objects: AHashMap<i64, ObjectRef>,
    real_ids: AHashMap<i64, i64>,
}

impl ReferenceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_new(&mut self, log: &mut ObjectLog, reference: i64, entity: ObjectRef) {
        self.new_objects.insert(reference, entity.clone());
        log.insert(entity);
    }

    pub fn lookup_by_ref(&self, reference: i64) -> Option<&ObjectRef> {
        self.new_objects.get(&reference)
    }

    pub fn record_real_id(&mut self, reference: i64, id: i64) {
        trace!(reference, id, "recorded real id");
        self.real_ids.insert(reference, id);
    }

    pub fn real_ids(&self) -> impl Iterator<Item = (i64, i64)> + '_ {
        self.real_ids.iter().map(|(&reference, &id)| (reference, id))
    }

    pub fn new_object_count(&self) -> usize {
        self.new_objects.len()
    }
}

impl IdResolver for ReferenceTable {
    fn resolve(&self, reference: i64) -> i64 {
        self.real_ids.get(&reference).copied().unwrap_or(reference)
    }

    fn is_resolved(&self, reference: i64) -> bool {
        self.real_ids.contains_key(&reference)
    }
}

impl IdResolver for AHashMap<i64, i64> {
    fn resolve(&self, reference: i64) -> i64 {
        self.get(&reference).copied().unwrap_or(reference)
    }

    fn is_resolved(&self, reference: i64) -> bool {
        self.contains_key(&reference)
    }
}
