//! Deep Clone Engine
//!
//! Produces a fully independent copy of an object graph.
//!
//! Key features:
//! - Preserves object identity within a clone operation (shared references
//!   stay shared, cycles are reproduced rather than unrolled)
//! - Shares immutable leaves instead of copying them
//! - Fabricates composites without running their constructors
//! - Copies every instance slot of the whole class hierarchy, whatever its
//!   visibility or readonly flag; class-level fields are never touched
//!
//! Each top-level call owns a fresh identity map. The map and any partly
//! built clone are dropped with the call, including when it fails.

use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{AccessOp, CloneError, CloneResult, ObjectError};
use crate::fabricate::{Fabricator, RawFabricator};
use crate::object::{ObjRef, ObjectView};
use crate::policy::{FieldAccess, ImmutablePolicy, KnownImmutables, Unrestricted};
use crate::registry::TypeRegistry;
use crate::shape::{Shape, Slot};
use crate::stack::ensure_sufficient_stack;
use crate::value::{GraphValue, TypeRef, Value};

const TARGET: &str = "facsimile::clone";

/// Engine configuration
#[derive(Debug, Clone)]
pub struct CloneConfig {
    /// Grow the stack on demand during recursion (default: true)
    ///
    /// Without it, graph depth is bounded by the calling thread's stack.
    pub grow_stack: bool,
    /// Remaining stack below which it is grown (default: 100KB)
    pub stack_red_zone: usize,
    /// Size of each stack extension (default: 1MB)
    pub stack_growth: usize,
    /// Initial capacity of the identity map (default: 64)
    pub identity_capacity: usize,
}

impl Default for CloneConfig {
    fn default() -> Self {
        Self {
            grow_stack: true,
            stack_red_zone: 100 * 1024, // 100KB
            stack_growth: 1024 * 1024,  // 1MB
            identity_capacity: 64,
        }
    }
}

/// What one top-level clone did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CloneStats {
    /// Composite instances fabricated
    pub composites: usize,
    /// Records copied (only when the policy does not treat them as leaves)
    pub records: usize,
    /// Arrays copied
    pub arrays: usize,
    /// Sequences copied
    pub sequences: usize,
    /// Boxed primitives copied (policy-dependent)
    pub boxes: usize,
    /// Strings copied (policy-dependent)
    pub strings: usize,
    /// Leaf values returned as-is
    pub shared_leaves: usize,
    /// Visits answered from the identity map
    pub identity_hits: usize,
}

impl CloneStats {
    /// Total number of new allocations
    pub fn copied(&self) -> usize {
        self.composites + self.records + self.arrays + self.sequences + self.boxes + self.strings
    }
}

/// Deep clone entry point
///
/// Holds configuration only; every call to [`Cloner::deep_clone`] runs in its
/// own session, so one `Cloner` can serve many threads at once.
pub struct Cloner {
    registry: Arc<TypeRegistry>,
    policy: Arc<dyn ImmutablePolicy>,
    fabricator: Arc<dyn Fabricator>,
    access: Arc<dyn FieldAccess>,
    config: CloneConfig,
}

impl Cloner {
    /// Cloner with the standard policy, raw fabrication, and no access
    /// restrictions
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self::builder(registry).build()
    }

    /// Start configuring a cloner
    pub fn builder(registry: Arc<TypeRegistry>) -> ClonerBuilder {
        ClonerBuilder {
            registry,
            policy: Arc::new(KnownImmutables::new()),
            fabricator: Arc::new(RawFabricator),
            access: Arc::new(Unrestricted),
            config: CloneConfig::default(),
        }
    }

    /// Registry the cloner resolves classes in
    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    /// Engine configuration
    pub fn config(&self) -> &CloneConfig {
        &self.config
    }

    /// Deep clone `original`
    pub fn deep_clone<T: GraphValue>(&self, original: &T) -> CloneResult<T> {
        self.deep_clone_with_stats(original).map(|(clone, _)| clone)
    }

    /// Deep clone `original` and report what was copied
    pub fn deep_clone_with_stats<T: GraphValue>(&self, original: &T) -> CloneResult<(T, CloneStats)> {
        let mut session = CloneSession::new(self);

        let clone = match session.clone_value(&original.to_value()) {
            Ok(clone) => clone,
            Err(err) => {
                tracing::debug!(target: TARGET, error = %err, "deep clone failed");
                return Err(err);
            }
        };

        let stats = session.stats;
        tracing::debug!(
            target: TARGET,
            copied = stats.copied(),
            composites = stats.composites,
            records = stats.records,
            arrays = stats.arrays,
            sequences = stats.sequences,
            boxes = stats.boxes,
            strings = stats.strings,
            shared_leaves = stats.shared_leaves,
            identity_hits = stats.identity_hits,
            "deep clone complete"
        );

        let clone = T::from_value(clone)
            .ok_or_else(|| CloneError::internal("clone does not match the original's type"))?;
        Ok((clone, stats))
    }
}

impl fmt::Debug for Cloner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cloner")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Builder for a [`Cloner`] with non-default collaborators
pub struct ClonerBuilder {
    registry: Arc<TypeRegistry>,
    policy: Arc<dyn ImmutablePolicy>,
    fabricator: Arc<dyn Fabricator>,
    access: Arc<dyn FieldAccess>,
    config: CloneConfig,
}

impl ClonerBuilder {
    /// Leaf classification policy
    pub fn policy(mut self, policy: impl ImmutablePolicy + 'static) -> Self {
        self.policy = Arc::new(policy);
        self
    }

    /// Object fabrication facility
    pub fn fabricator(mut self, fabricator: impl Fabricator + 'static) -> Self {
        self.fabricator = Arc::new(fabricator);
        self
    }

    /// Host field access guard
    pub fn access(mut self, access: impl FieldAccess + 'static) -> Self {
        self.access = Arc::new(access);
        self
    }

    /// Engine configuration
    pub fn config(mut self, config: CloneConfig) -> Self {
        self.config = config;
        self
    }

    /// Finish
    pub fn build(self) -> Cloner {
        Cloner {
            registry: self.registry,
            policy: self.policy,
            fabricator: self.fabricator,
            access: self.access,
            config: self.config,
        }
    }
}

/// Deep clone with a default [`Cloner`]
pub fn deep_clone<T: GraphValue>(registry: &Arc<TypeRegistry>, original: &T) -> CloneResult<T> {
    Cloner::new(registry.clone()).deep_clone(original)
}

/// State of one top-level clone
struct CloneSession<'a> {
    cloner: &'a Cloner,
    /// Original allocation address -> its clone
    clones: FxHashMap<usize, Value>,
    stats: CloneStats,
}

impl<'a> CloneSession<'a> {
    fn new(cloner: &'a Cloner) -> Self {
        let mut clones = FxHashMap::default();
        clones.reserve(cloner.config.identity_capacity);
        Self {
            cloner,
            clones,
            stats: CloneStats::default(),
        }
    }

    fn clone_value(&mut self, value: &Value) -> CloneResult<Value> {
        let cloner = self.cloner;
        let config = &cloner.config;
        if config.grow_stack {
            ensure_sufficient_stack(config.stack_red_zone, config.stack_growth, || {
                self.clone_inner(value)
            })
        } else {
            self.clone_inner(value)
        }
    }

    fn clone_inner(&mut self, value: &Value) -> CloneResult<Value> {
        match value {
            Value::Null => Ok(Value::Null),
            Value::Prim(p) => {
                self.stats.shared_leaves += 1;
                Ok(Value::Prim(*p))
            }
            Value::Str(s) => {
                if self.is_leaf(&TypeRef::Str) {
                    self.stats.shared_leaves += 1;
                    return Ok(value.clone());
                }
                let addr = Arc::as_ptr(s) as *const u8 as usize;
                if let Some(clone) = self.lookup(addr) {
                    return Ok(clone);
                }
                let clone = Value::Str(Arc::from(&**s));
                self.clones.insert(addr, clone.clone());
                self.stats.strings += 1;
                Ok(clone)
            }
            Value::Ref(obj) => self.clone_object(obj),
        }
    }

    fn clone_object(&mut self, original: &ObjRef) -> CloneResult<Value> {
        if let Some(shape) = original.shape() {
            self.check_registered(&shape)?;
        }
        if self.is_leaf(&original.type_ref()) {
            self.stats.shared_leaves += 1;
            return Ok(Value::Ref(original.clone()));
        }

        if let Some(clone) = self.lookup(original.addr()) {
            return Ok(clone);
        }

        match original.view() {
            ObjectView::Instance(shape) => self.clone_instance(original, shape),
            ObjectView::Record(shape) => self.clone_record(original, shape),
            ObjectView::Array(element) => self.clone_array(original, element),
            ObjectView::Sequence(kind) => self.clone_sequence(original, kind),
            ObjectView::Boxed(p) => {
                let clone = ObjRef::boxed(p);
                self.remember(original, &clone);
                self.stats.boxes += 1;
                Ok(Value::Ref(clone))
            }
        }
    }

    fn clone_instance(&mut self, original: &ObjRef, shape: Arc<Shape>) -> CloneResult<Value> {
        let cloner = self.cloner;
        let shell = cloner
            .fabricator
            .fabricate_object(&cloner.registry, shape.class())?;
        verify_shell(original, &shell, &shape)?;

        tracing::trace!(
            target: TARGET,
            class = shape.name(),
            slots = shape.slot_count(),
            "fabricated shell"
        );

        // Registered before any field is copied so that edges back to
        // `original` resolve to this shell.
        self.remember(original, &shell);
        self.stats.composites += 1;
        self.copy_slots(original, &shell, &shape)?;
        Ok(Value::Ref(shell))
    }

    fn clone_record(&mut self, original: &ObjRef, shape: Arc<Shape>) -> CloneResult<Value> {
        let shell = ObjRef::record_shell(shape.clone());
        self.remember(original, &shell);
        self.stats.records += 1;
        self.copy_slots(original, &shell, &shape)?;
        Ok(Value::Ref(shell))
    }

    fn copy_slots(&mut self, original: &ObjRef, clone: &ObjRef, shape: &Shape) -> CloneResult<()> {
        let cloner = self.cloner;
        let access = &cloner.access;
        for (index, slot) in shape.slots().iter().enumerate() {
            if !access.can_read(slot) {
                return Err(access_error(slot, AccessOp::Read));
            }
            let value = original.field_at(index).map_err(internal)?;
            let value = self.clone_value(&value)?;
            if !access.can_write(slot) {
                return Err(access_error(slot, AccessOp::Write));
            }
            clone.write_slot(index, value).map_err(internal)?;
        }
        Ok(())
    }

    fn clone_array(&mut self, original: &ObjRef, element: TypeRef) -> CloneResult<Value> {
        let items = original.items().map_err(internal)?;
        let clone = ObjRef::new_array(element, items.len());

        tracing::trace!(target: TARGET, len = items.len(), "allocated array");

        self.remember(original, &clone);
        self.stats.arrays += 1;
        for (index, item) in items.iter().enumerate() {
            let item = self.clone_value(item)?;
            clone.set(index, item).map_err(internal)?;
        }
        Ok(Value::Ref(clone))
    }

    fn clone_sequence(&mut self, original: &ObjRef, kind: Arc<Shape>) -> CloneResult<Value> {
        let cloner = self.cloner;
        let clone = cloner
            .fabricator
            .fabricate_sequence(&cloner.registry, kind.class())?;
        let same_kind = clone.shape().is_some_and(|actual| Arc::ptr_eq(&actual, &kind));
        if !same_kind || clone.ptr_eq(original) {
            return Err(CloneError::construction(
                kind.name(),
                format!("fabricator returned `{}`", clone.type_name()),
            ));
        }

        let items = original.items().map_err(internal)?;
        tracing::trace!(target: TARGET, kind = kind.name(), len = items.len(), "allocated sequence");

        self.remember(original, &clone);
        self.stats.sequences += 1;
        for item in &items {
            let item = self.clone_value(item)?;
            clone.push(item).map_err(internal)?;
        }
        Ok(Value::Ref(clone))
    }

    /// Class ids are only meaningful within the registry that issued them.
    fn check_registered(&self, shape: &Arc<Shape>) -> CloneResult<()> {
        let registered = self.cloner.registry.shape(shape.class());
        if registered.is_ok_and(|registered| Arc::ptr_eq(&registered, shape)) {
            return Ok(());
        }
        Err(CloneError::construction(
            shape.name(),
            "class belongs to a different registry",
        ))
    }

    fn is_leaf(&self, ty: &TypeRef) -> bool {
        self.cloner
            .policy
            .is_immutable_leaf(ty, &self.cloner.registry)
    }

    fn lookup(&mut self, addr: usize) -> Option<Value> {
        let clone = self.clones.get(&addr).cloned()?;
        self.stats.identity_hits += 1;
        Some(clone)
    }

    fn remember(&mut self, original: &ObjRef, clone: &ObjRef) {
        self.clones.insert(original.addr(), Value::Ref(clone.clone()));
    }
}

/// A fabricated shell must be a new instance laid out by the original's shape.
fn verify_shell(original: &ObjRef, shell: &ObjRef, shape: &Arc<Shape>) -> CloneResult<()> {
    let matches = match shell.view() {
        ObjectView::Instance(actual) => Arc::ptr_eq(&actual, shape),
        _ => false,
    };
    if !matches || shell.ptr_eq(original) {
        return Err(CloneError::construction(
            shape.name(),
            format!("fabricator returned `{}`", shell.type_name()),
        ));
    }
    Ok(())
}

fn access_error(slot: &Slot, op: AccessOp) -> CloneError {
    CloneError::Access {
        class: slot.owner_name().to_string(),
        field: slot.name().to_string(),
        op,
    }
}

fn internal(err: ObjectError) -> CloneError {
    CloneError::internal(err.to_string())
}
