use ahash::AHashSet;

use crate::identity::ObjectRef;

/// Every object touched during a pass, in first-logged order.
#[derive(Debug, Default)]
pub struct ObjectLog {
    seen: AHashSet<ObjectRef>,
    order: Vec<ObjectRef>,
}

impl ObjectLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            seen: AHashSet::with_capacity(capacity),
            order: Vec::with_capacity(capacity),
        }
    }

    /// Returns `true` when the object was not logged yet.
    pub fn insert(&mut self, object: ObjectRef) -> bool {
        if !self.seen.insert(object.clone()) {
            return false;
        }
        self.order.push(object);
        true
    }

    pub fn contains(&self, object: &ObjectRef) -> bool {
        self.seen.contains(object)
    }

    pub fn as_slice(&self) -> &[ObjectRef] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
