//! Reference-identity handles for objects taking part in a compile pass.
//!
//! Two structurally equal entities sitting at different positions of the object
//! graph are different nodes, so every per-pass map is keyed by allocation
//! address rather than by value.

use std::{
    any::Any,
    fmt,
    hash::{Hash, Hasher},
    rc::Rc,
};

use serde::{Deserialize, Serialize};

#[derive(Clone)]
pub struct ObjectRef(Rc<dyn Any>);

impl ObjectRef {
    pub fn new<T: Any>(object: Rc<T>) -> Self {
        ObjectRef(object)
    }

    fn addr(&self) -> *const () {
        Rc::as_ptr(&self.0) as *const ()
    }

    /// True when `other` is the very allocation this handle points at.
    pub fn is<T: ?Sized>(&self, other: &Rc<T>) -> bool {
        std::ptr::eq(self.addr(), Rc::as_ptr(other) as *const ())
    }

    pub fn downcast<T: Any>(&self) -> Option<Rc<T>> {
        Rc::clone(&self.0).downcast::<T>().ok()
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.addr(), other.addr())
    }
}

impl Eq for ObjectRef {}

impl Hash for ObjectRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(self.addr(), state);
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectRef({:p})", self.addr())
    }
}

/// Converts a shared object, including a trait object whose concrete type is
/// `Any`, into an [`ObjectRef`].
pub trait AsObject {
    fn as_object(self: Rc<Self>) -> ObjectRef;
}

impl<T: Any> AsObject for T {
    fn as_object(self: Rc<Self>) -> ObjectRef {
        ObjectRef::new(self)
    }
}

/// Ordered (start, end) pair of node identities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SrcTargetKey {
    pub src: i64,
    pub tgt: i64,
}

impl SrcTargetKey {
    pub fn new(src: i64, tgt: i64) -> Self {
        Self { src, tgt }
    }
}

impl fmt::Display for SrcTargetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})->({})", self.src, self.tgt)
    }
}
