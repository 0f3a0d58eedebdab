//! Class declarations and flattened instance layouts (shapes).
//!
//! A [`Shape`] is the layout of one class: which slots an instance has and
//! which class declared each one. Shapes chain to their parent's shape, and
//! the slot list is flattened once at registration (ancestor slots first,
//! own slots last) so that field enumeration never walks the hierarchy again.

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::error::ObjectResult;
use crate::object::ObjRef;
use crate::registry::ClassId;
use crate::value::{TypeRef, Value};

/// Declared access level of a field
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Visibility {
    /// Declaring class only
    Private,
    /// Declaring class and subclasses
    Protected,
    /// Same package
    Package,
    /// Everyone
    #[default]
    Public,
}

/// A declared field
#[derive(Clone, Debug)]
pub struct FieldDef {
    name: Arc<str>,
    ty: TypeRef,
    visibility: Visibility,
    readonly: bool,
    is_static: bool,
    initial: Option<Value>,
}

impl FieldDef {
    /// Public, mutable instance field
    pub fn new(name: &str, ty: TypeRef) -> Self {
        Self {
            name: Arc::from(name),
            ty,
            visibility: Visibility::Public,
            readonly: false,
            is_static: false,
            initial: None,
        }
    }

    /// Class-level field, stored once in the registry
    pub fn static_field(name: &str, ty: TypeRef) -> Self {
        Self {
            is_static: true,
            ..Self::new(name, ty)
        }
    }

    /// Set the access level
    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// Private access
    pub fn private(self) -> Self {
        self.visibility(Visibility::Private)
    }

    /// Protected access
    pub fn protected(self) -> Self {
        self.visibility(Visibility::Protected)
    }

    /// Package access
    pub fn package(self) -> Self {
        self.visibility(Visibility::Package)
    }

    /// Assignable only during construction
    pub fn readonly(mut self) -> Self {
        self.readonly = true;
        self
    }

    /// Declaration-time initial value, applied by constructors
    pub fn initial(mut self, value: impl Into<Value>) -> Self {
        self.initial = Some(value.into());
        self
    }

    /// Field name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type
    pub fn ty(&self) -> &TypeRef {
        &self.ty
    }

    /// Declared access level
    pub fn access(&self) -> Visibility {
        self.visibility
    }

    /// Readonly after construction?
    pub fn is_readonly(&self) -> bool {
        self.readonly
    }

    /// Class-level field?
    pub fn is_static(&self) -> bool {
        self.is_static
    }

    /// Declaration-time initial value
    pub fn initial_value(&self) -> Option<&Value> {
        self.initial.as_ref()
    }

    /// Value a constructed object starts with in this slot
    fn constructed_value(&self) -> Value {
        self.initial.clone().unwrap_or_else(|| self.ty.zero())
    }
}

/// Construction strategy of a sequence kind
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SequenceShape {
    /// Parameterless construction, unbounded growth
    Growable,
    /// Capacity must be supplied at construction
    Bounded,
}

/// What instances of a class are
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClassKind {
    /// Mutable composite object
    Object,
    /// Composite that cannot be instantiated directly
    Abstract,
    /// Immutable fixed-field record
    Record,
    /// Ordered collection
    Sequence(SequenceShape),
}

/// Constructor body, run after initial values and constructor arguments
pub type Initializer = Arc<dyn Fn(&ObjRef) -> ObjectResult<()> + Send + Sync>;

/// Declares a class for [`TypeRegistry::register`](crate::TypeRegistry::register)
pub struct ClassBuilder {
    pub(crate) name: Arc<str>,
    pub(crate) kind: ClassKind,
    pub(crate) parent: Option<ClassId>,
    pub(crate) fields: Vec<FieldDef>,
    pub(crate) initializer: Option<Initializer>,
    pub(crate) default_constructor: bool,
}

impl ClassBuilder {
    /// Concrete composite class
    pub fn new(name: &str) -> Self {
        Self::with_kind(name, ClassKind::Object)
    }

    /// Abstract composite class
    pub fn abstract_class(name: &str) -> Self {
        Self::with_kind(name, ClassKind::Abstract)
    }

    /// Record class
    pub fn record(name: &str) -> Self {
        Self::with_kind(name, ClassKind::Record)
    }

    /// Sequence kind
    pub fn sequence(name: &str, shape: SequenceShape) -> Self {
        Self::with_kind(name, ClassKind::Sequence(shape))
    }

    fn with_kind(name: &str, kind: ClassKind) -> Self {
        Self {
            name: Arc::from(name),
            kind,
            parent: None,
            fields: Vec::new(),
            initializer: None,
            default_constructor: true,
        }
    }

    /// Inherit from `parent`
    pub fn extends(mut self, parent: ClassId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Declare a field
    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Constructor body
    pub fn initializer(
        mut self,
        f: impl Fn(&ObjRef) -> ObjectResult<()> + Send + Sync + 'static,
    ) -> Self {
        self.initializer = Some(Arc::new(f));
        self
    }

    /// The class can only be constructed with arguments
    pub fn without_default_constructor(mut self) -> Self {
        self.default_constructor = false;
        self
    }
}

/// One instance slot of a flattened layout
#[derive(Clone, Debug)]
pub struct Slot {
    owner: ClassId,
    owner_name: Arc<str>,
    field: FieldDef,
}

impl Slot {
    /// Class that declared the field
    pub fn owner(&self) -> ClassId {
        self.owner
    }

    /// Name of the declaring class
    pub fn owner_name(&self) -> &str {
        &self.owner_name
    }

    /// Field declaration
    pub fn field(&self) -> &FieldDef {
        &self.field
    }

    /// Field name
    pub fn name(&self) -> &str {
        self.field.name()
    }
}

/// A Shape defines the layout of fields in an instance of one class.
pub struct Shape {
    class: ClassId,
    name: Arc<str>,
    kind: ClassKind,

    /// Shape of the superclass, `None` for roots.
    parent: Option<Arc<Shape>>,

    /// Fields declared by this class itself, static ones included.
    declared: Vec<FieldDef>,

    /// All instance slots: inherited + own, statics excluded.
    slots: Vec<Slot>,

    /// Slot index by field name. A redeclared name resolves to the most
    /// derived declaration.
    slot_map: FxHashMap<Arc<str>, usize>,

    initializer: Option<Initializer>,
    default_constructor: bool,
}

impl Shape {
    pub(crate) fn build(class: ClassId, builder: ClassBuilder, parent: Option<Arc<Shape>>) -> Self {
        let mut slots = parent
            .as_ref()
            .map(|p| p.slots.clone())
            .unwrap_or_default();

        for field in builder.fields.iter().filter(|f| !f.is_static()) {
            slots.push(Slot {
                owner: class,
                owner_name: builder.name.clone(),
                field: field.clone(),
            });
        }

        let mut slot_map = FxHashMap::default();
        for (index, slot) in slots.iter().enumerate() {
            slot_map.insert(slot.field.name.clone(), index);
        }

        Self {
            class,
            name: builder.name,
            kind: builder.kind,
            parent,
            declared: builder.fields,
            slots,
            slot_map,
            initializer: builder.initializer,
            default_constructor: builder.default_constructor,
        }
    }

    /// Class id
    pub fn class(&self) -> ClassId {
        self.class
    }

    /// Class name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Class kind
    pub fn kind(&self) -> ClassKind {
        self.kind
    }

    /// Superclass shape
    pub fn parent(&self) -> Option<&Arc<Shape>> {
        self.parent.as_ref()
    }

    /// Fields declared by this class itself
    pub fn declared_fields(&self) -> &[FieldDef] {
        &self.declared
    }

    /// Flattened instance slots
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Number of instance slots
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Slot index of a field name
    pub fn slot_index(&self, name: &str) -> Option<usize> {
        self.slot_map.get(name).copied()
    }

    /// This shape followed by every ancestor, most derived first
    pub fn ancestors(&self) -> impl Iterator<Item = &Shape> {
        std::iter::successors(Some(self), |shape| shape.parent.as_deref())
    }

    /// Is `ancestor` this class or one of its superclasses?
    pub fn is_subclass_of(&self, ancestor: ClassId) -> bool {
        self.ancestors().any(|shape| shape.class == ancestor)
    }

    /// Has a parameterless constructor?
    pub fn has_default_constructor(&self) -> bool {
        self.default_constructor
    }

    pub(crate) fn initializer(&self) -> Option<&Initializer> {
        self.initializer.as_ref()
    }

    /// Slots as a fabricated shell holds them: zero per declared type.
    pub(crate) fn zeroed_slots(&self) -> Vec<Value> {
        self.slots.iter().map(|slot| slot.field.ty.zero()).collect()
    }

    /// Slots as a constructor starts them: initial value, else zero.
    pub(crate) fn constructed_slots(&self) -> Vec<Value> {
        self.slots
            .iter()
            .map(|slot| slot.field.constructed_value())
            .collect()
    }
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shape")
            .field("class", &self.class)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("parent", &self.parent.as_ref().map(|p| p.class))
            .field("slots", &self.slots.iter().map(Slot::name).collect::<Vec<_>>())
            .finish()
    }
}
