//! Type registry
//!
//! Holds every class shape, the class-level (static) field storage, and the
//! construction paths for instances, records, and sequences.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{ObjectError, ObjectResult};
use crate::object::{Body, ObjRef};
use crate::shape::{ClassBuilder, ClassKind, SequenceShape, Shape};
use crate::value::{TypeRef, Value};

/// Registered class handle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(u32);

impl ClassId {
    /// Built-in growable sequence backed by contiguous storage
    pub const ARRAY_LIST: ClassId = ClassId(0);
    /// Built-in growable sequence with list semantics
    pub const LINKED_LIST: ClassId = ClassId(1);

    /// Id from its raw index
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw index
    pub const fn raw(self) -> u32 {
        self.0
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Default)]
struct ClassTable {
    shapes: Vec<Arc<Shape>>,
    names: FxHashMap<Arc<str>, ClassId>,
}

impl ClassTable {
    fn insert(&mut self, shape: Shape) -> Arc<Shape> {
        let shape = Arc::new(shape);
        self.names.insert(Arc::from(shape.name()), shape.class());
        self.shapes.push(shape.clone());
        shape
    }
}

/// Thread-safe registry of classes
pub struct TypeRegistry {
    table: RwLock<ClassTable>,
    statics: RwLock<FxHashMap<(ClassId, Arc<str>), Value>>,
}

impl TypeRegistry {
    /// Registry with the built-in sequence kinds
    pub fn new() -> Self {
        let mut table = ClassTable::default();
        for (id, name) in [
            (ClassId::ARRAY_LIST, "ArrayList"),
            (ClassId::LINKED_LIST, "LinkedList"),
        ] {
            let builder = ClassBuilder::sequence(name, SequenceShape::Growable);
            table.insert(Shape::build(id, builder, None));
        }

        Self {
            table: RwLock::new(table),
            statics: RwLock::new(FxHashMap::default()),
        }
    }

    /// Register a class
    pub fn register(&self, builder: ClassBuilder) -> ObjectResult<ClassId> {
        let mut table = self.table.write();

        if table.names.contains_key(&*builder.name) {
            return Err(ObjectError::DuplicateClass(builder.name.to_string()));
        }

        let parent = match builder.parent {
            Some(parent_id) => {
                let parent = table
                    .shapes
                    .get(parent_id.index())
                    .cloned()
                    .ok_or(ObjectError::UnknownClass(parent_id))?;
                Some(parent)
            }
            None => None,
        };

        validate(&builder, parent.as_deref())?;

        let id = ClassId(table.shapes.len() as u32);
        let shape = table.insert(Shape::build(id, builder, parent));

        let mut statics = self.statics.write();
        for field in shape.declared_fields().iter().filter(|f| f.is_static()) {
            let value = field
                .initial_value()
                .cloned()
                .unwrap_or_else(|| field.ty().zero());
            statics.insert((id, Arc::from(field.name())), value);
        }

        tracing::debug!(
            target: "facsimile::registry",
            class = shape.name(),
            id = id.0,
            slots = shape.slot_count(),
            "registered class"
        );

        Ok(id)
    }

    /// Shape of a registered class
    pub fn shape(&self, id: ClassId) -> ObjectResult<Arc<Shape>> {
        self.table
            .read()
            .shapes
            .get(id.index())
            .cloned()
            .ok_or(ObjectError::UnknownClass(id))
    }

    /// Class registered under `name`
    pub fn lookup(&self, name: &str) -> Option<ClassId> {
        self.table.read().names.get(name).copied()
    }

    /// Number of registered classes, built-ins included
    pub fn len(&self) -> usize {
        self.table.read().shapes.len()
    }

    /// Always false; the built-in sequence kinds are registered up front
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Human-readable name of a type, resolving class names
    pub fn type_name(&self, ty: &TypeRef) -> String {
        match ty {
            TypeRef::Class(id) => self
                .shape(*id)
                .map(|shape| shape.name().to_string())
                .unwrap_or_else(|_| ty.to_string()),
            TypeRef::Array(element) => format!("{}[]", self.type_name(element)),
            _ => ty.to_string(),
        }
    }

    /// Construct through the parameterless constructor
    ///
    /// Slots start at their declared initial values, then every initializer
    /// in the hierarchy runs, root class first.
    pub fn instantiate(&self, id: ClassId) -> ObjectResult<ObjRef> {
        let shape = self.constructible(id)?;
        if !shape.has_default_constructor() {
            return Err(ObjectError::NoDefaultConstructor(shape.name().to_string()));
        }
        construct(shape, &[])
    }

    /// Construct with named constructor arguments
    ///
    /// Arguments are assigned (readonly fields included) before the
    /// initializers run.
    pub fn instantiate_with(&self, id: ClassId, args: &[(&str, Value)]) -> ObjectResult<ObjRef> {
        let shape = self.constructible(id)?;
        construct(shape, args)
    }

    /// Zero-filled instance; no initial values, no initializers
    pub fn allocate_shell(&self, id: ClassId) -> ObjectResult<ObjRef> {
        let shape = self.constructible(id)?;
        let slots = shape.zeroed_slots();
        Ok(ObjRef::from_body(Body::Instance { shape, slots }))
    }

    fn constructible(&self, id: ClassId) -> ObjectResult<Arc<Shape>> {
        let shape = self.shape(id)?;
        let reason = match shape.kind() {
            ClassKind::Object => return Ok(shape),
            ClassKind::Abstract => "abstract class",
            ClassKind::Record => "records are built with `new_record`",
            ClassKind::Sequence(_) => "sequences are built with `new_sequence`",
        };
        Err(ObjectError::NotInstantiable {
            class: shape.name().to_string(),
            reason,
        })
    }

    /// New record from its components in slot order
    pub fn new_record(&self, id: ClassId, components: Vec<Value>) -> ObjectResult<ObjRef> {
        let shape = self.shape(id)?;
        if shape.kind() != ClassKind::Record {
            return Err(ObjectError::WrongKind {
                expected: "a record class",
                found: shape.name().to_string(),
            });
        }
        if components.len() != shape.slot_count() {
            return Err(ObjectError::Arity {
                class: shape.name().to_string(),
                expected: shape.slot_count(),
                found: components.len(),
            });
        }
        Ok(ObjRef::from_body(Body::Record {
            shape,
            slots: components,
        }))
    }

    /// New empty sequence of a growable kind
    pub fn new_sequence(&self, kind: ClassId) -> ObjectResult<ObjRef> {
        let shape = self.shape(kind)?;
        match shape.kind() {
            ClassKind::Sequence(SequenceShape::Growable) => Ok(ObjRef::from_body(Body::Sequence {
                kind: shape,
                capacity: None,
                items: Vec::new(),
            })),
            ClassKind::Sequence(SequenceShape::Bounded) => {
                Err(ObjectError::CapacityRequired(shape.name().to_string()))
            }
            _ => Err(ObjectError::WrongKind {
                expected: "a sequence kind",
                found: shape.name().to_string(),
            }),
        }
    }

    /// New empty sequence of a bounded kind
    pub fn new_bounded_sequence(&self, kind: ClassId, capacity: usize) -> ObjectResult<ObjRef> {
        let shape = self.shape(kind)?;
        if shape.kind() != ClassKind::Sequence(SequenceShape::Bounded) {
            return Err(ObjectError::WrongKind {
                expected: "a bounded sequence kind",
                found: shape.name().to_string(),
            });
        }
        Ok(ObjRef::from_body(Body::Sequence {
            kind: shape,
            capacity: Some(capacity),
            items: Vec::with_capacity(capacity),
        }))
    }

    /// New growable sequence holding `items`
    pub fn sequence_from(
        &self,
        kind: ClassId,
        items: impl IntoIterator<Item = Value>,
    ) -> ObjectResult<ObjRef> {
        let seq = self.new_sequence(kind)?;
        for item in items {
            seq.push(item)?;
        }
        Ok(seq)
    }

    /// Read a class-level field, searching the class and then its ancestors
    pub fn static_field(&self, class: ClassId, name: &str) -> ObjectResult<Value> {
        let shape = self.shape(class)?;
        let statics = self.statics.read();
        shape
            .ancestors()
            .find_map(|owner| statics.get(&(owner.class(), Arc::from(name))).cloned())
            .ok_or_else(|| ObjectError::UnknownField {
                class: shape.name().to_string(),
                field: name.to_string(),
            })
    }

    /// Assign a class-level field
    pub fn set_static(&self, class: ClassId, name: &str, value: impl Into<Value>) -> ObjectResult<()> {
        let shape = self.shape(class)?;
        let (owner, field) = shape
            .ancestors()
            .find_map(|owner| {
                owner
                    .declared_fields()
                    .iter()
                    .find(|f| f.is_static() && f.name() == name)
                    .map(|f| (owner, f))
            })
            .ok_or_else(|| ObjectError::UnknownField {
                class: shape.name().to_string(),
                field: name.to_string(),
            })?;

        if field.is_readonly() {
            return Err(ObjectError::ReadonlyField {
                class: owner.name().to_string(),
                field: name.to_string(),
            });
        }

        self.statics
            .write()
            .insert((owner.class(), Arc::from(name)), value.into());
        Ok(())
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("classes", &self.len())
            .finish()
    }
}

fn validate(builder: &ClassBuilder, parent: Option<&Shape>) -> ObjectResult<()> {
    let invalid = |reason| ObjectError::InvalidDeclaration {
        class: builder.name.to_string(),
        reason,
    };

    if let Some(parent) = parent {
        match builder.kind {
            ClassKind::Record | ClassKind::Sequence(_) => {
                return Err(invalid("records and sequences cannot extend a class"));
            }
            ClassKind::Object | ClassKind::Abstract => {}
        }
        if !matches!(parent.kind(), ClassKind::Object | ClassKind::Abstract) {
            return Err(ObjectError::InvalidParent {
                class: builder.name.to_string(),
                parent: parent.name().to_string(),
            });
        }
    }

    if matches!(builder.kind, ClassKind::Sequence(_)) && !builder.fields.is_empty() {
        return Err(invalid("sequences cannot declare fields"));
    }

    for (i, field) in builder.fields.iter().enumerate() {
        if builder.fields[..i].iter().any(|f| f.name() == field.name()) {
            return Err(invalid("field declared twice"));
        }
    }

    Ok(())
}

fn construct(shape: Arc<Shape>, args: &[(&str, Value)]) -> ObjectResult<ObjRef> {
    let slots = shape.constructed_slots();
    let obj = ObjRef::from_body(Body::Instance {
        shape: shape.clone(),
        slots,
    });

    for (name, value) in args {
        obj.init_field(name, value.clone())?;
    }

    let mut chain: Vec<&Shape> = shape.ancestors().collect();
    chain.reverse();
    for class in chain {
        if let Some(init) = class.initializer() {
            init(&obj)?;
        }
    }

    Ok(obj)
}
