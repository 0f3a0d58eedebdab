//! Clone policies: which types are immutable leaves, and which fields the
//! host lets the engine touch.

use rustc_hash::FxHashSet;

use crate::registry::{ClassId, TypeRegistry};
use crate::shape::{ClassKind, Slot, Visibility};
use crate::value::TypeRef;

/// Decides which runtime types are shared instead of copied
pub trait ImmutablePolicy: Send + Sync {
    /// Is every value of `ty` an immutable leaf?
    fn is_immutable_leaf(&self, ty: &TypeRef, registry: &TypeRegistry) -> bool;
}

/// The standard leaf set plus any extra types the embedder marks immutable
///
/// Standard leaves: every primitive and boxed primitive, strings, and every
/// record class.
#[derive(Debug, Clone, Default)]
pub struct KnownImmutables {
    extra: FxHashSet<TypeRef>,
}

impl KnownImmutables {
    /// Standard leaf set
    pub fn new() -> Self {
        Self::default()
    }

    /// Also treat `ty` as a leaf
    pub fn with_type(mut self, ty: TypeRef) -> Self {
        self.extra.insert(ty);
        self
    }

    /// Also treat instances of `class` as leaves
    pub fn with_class(self, class: ClassId) -> Self {
        self.with_type(TypeRef::Class(class))
    }
}

impl ImmutablePolicy for KnownImmutables {
    fn is_immutable_leaf(&self, ty: &TypeRef, registry: &TypeRegistry) -> bool {
        if self.extra.contains(ty) {
            return true;
        }
        match ty {
            TypeRef::Primitive(_) | TypeRef::Boxed(_) | TypeRef::Str => true,
            TypeRef::Class(id) => registry
                .shape(*id)
                .is_ok_and(|shape| shape.kind() == ClassKind::Record),
            TypeRef::Array(_) | TypeRef::Any => false,
        }
    }
}

/// Host access guard consulted for every reflective slot access
pub trait FieldAccess: Send + Sync {
    /// May the engine read `slot` from an original?
    fn can_read(&self, slot: &Slot) -> bool;

    /// May the engine write `slot` into a clone?
    fn can_write(&self, slot: &Slot) -> bool {
        self.can_read(slot)
    }
}

/// Every field is accessible regardless of visibility
#[derive(Debug, Clone, Copy, Default)]
pub struct Unrestricted;

impl FieldAccess for Unrestricted {
    fn can_read(&self, _slot: &Slot) -> bool {
        true
    }
}

/// Only public fields are accessible
///
/// Models a host whose security manager refuses to open non-public fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct PublicOnly;

impl FieldAccess for PublicOnly {
    fn can_read(&self, slot: &Slot) -> bool {
        slot.field().access() == Visibility::Public
    }
}
