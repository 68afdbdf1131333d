use ahash::AHashMap;
use tracing::trace;

use crate::{
    identity::{ObjectRef, SrcTargetKey},
    object_log::ObjectLog,
};

/// Relationship entities without a persisted id, indexed by the node pair
/// they connect.
#[derive(Debug, Default)]
pub struct TransientIndex {
    by_pair: AHashMap<SrcTargetKey, Vec<ObjectRef>>,
}

impl TransientIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Logs `object` under `key` unless the pass has already logged it.
    pub fn log_if_new(&mut self, log: &mut ObjectLog, key: SrcTargetKey, object: ObjectRef) -> bool {
        if !log.insert(object.clone()) {
            return false;
        }
        trace!(key = %key, "indexed transient relationship");
        self.by_pair.entry(key).or_default().push(object);
        true
    }

    pub fn transient_relationships_for(&self, key: &SrcTargetKey) -> &[ObjectRef] {
        self.by_pair.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.by_pair.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_pair.is_empty()
    }
}
