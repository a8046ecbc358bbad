//! Keys identifying pools in a registry

use std::any::{TypeId, type_name};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Token identifying what kind of resource a pool holds.
///
/// Equality and hashing use the [`TypeId`] only; the type name is kept for
/// diagnostics.
#[derive(Debug, Clone, Copy)]
pub struct ResourceKind {
    id: TypeId,
    name: &'static str,
}

impl ResourceKind {
    /// Kind of resource `T`.
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    /// Rust type name of the resource.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for ResourceKind {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ResourceKind {}

impl Hash for ResourceKind {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// (resource kind, pool name) pair. A registry holds at most one pool per key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CategoryKey {
    pub kind: ResourceKind,
    pub name: String,
}

impl CategoryKey {
    pub fn new<T: 'static>(name: impl Into<String>) -> Self {
        Self {
            kind: ResourceKind::of::<T>(),
            name: name.into(),
        }
    }
}

impl fmt::Display for CategoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}.{}", self.kind, self.name)
        }
    }
}
