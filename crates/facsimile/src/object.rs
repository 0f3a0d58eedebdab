//! Heap objects and shared handles to them
//!
//! Every heap object sits behind an `Arc`; its body behind a
//! `parking_lot::RwLock`. The allocation address is the object's identity.

use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

use crate::error::{ObjectError, ObjectResult};
use crate::registry::ClassId;
use crate::shape::Shape;
use crate::value::{Primitive, TypeRef, Value};

pub(crate) enum Body {
    Instance {
        shape: Arc<Shape>,
        slots: Vec<Value>,
    },
    Record {
        shape: Arc<Shape>,
        slots: Vec<Value>,
    },
    Array {
        element: TypeRef,
        slots: Vec<Value>,
    },
    Sequence {
        kind: Arc<Shape>,
        capacity: Option<usize>,
        items: Vec<Value>,
    },
    Boxed(Primitive),
}

impl Body {
    fn type_ref(&self) -> TypeRef {
        match self {
            Self::Instance { shape, .. } | Self::Record { shape, .. } => {
                TypeRef::Class(shape.class())
            }
            Self::Sequence { kind, .. } => TypeRef::Class(kind.class()),
            Self::Array { element, .. } => TypeRef::array_of(element.clone()),
            Self::Boxed(p) => TypeRef::Boxed(p.ty()),
        }
    }

    fn type_name(&self) -> String {
        match self {
            Self::Instance { shape, .. } | Self::Record { shape, .. } => shape.name().to_string(),
            Self::Sequence { kind, .. } => kind.name().to_string(),
            _ => self.type_ref().to_string(),
        }
    }
}

/// Snapshot of what an object is, taken without holding its lock
pub(crate) enum ObjectView {
    Instance(Arc<Shape>),
    Record(Arc<Shape>),
    Array(TypeRef),
    Sequence(Arc<Shape>),
    Boxed(Primitive),
}

struct HeapObject {
    body: RwLock<Body>,
}

/// Shared handle to a heap object
///
/// Cloning the handle shares the object; use [`Cloner`](crate::Cloner) for a
/// deep copy.
///
/// Dropping the last handle to a long linked chain drops it recursively, one
/// stack frame per link.
#[derive(Clone)]
pub struct ObjRef(Arc<HeapObject>);

impl ObjRef {
    pub(crate) fn from_body(body: Body) -> Self {
        Self(Arc::new(HeapObject {
            body: RwLock::new(body),
        }))
    }

    /// New array of `len` zero-initialized elements
    pub fn new_array(element: TypeRef, len: usize) -> Self {
        let slots = vec![element.zero(); len];
        Self::from_body(Body::Array { element, slots })
    }

    /// New array holding `items`
    pub fn array_from(element: TypeRef, items: impl IntoIterator<Item = Value>) -> Self {
        Self::from_body(Body::Array {
            element,
            slots: items.into_iter().collect(),
        })
    }

    /// New boxed primitive
    pub fn boxed(p: Primitive) -> Self {
        Self::from_body(Body::Boxed(p))
    }

    pub(crate) fn record_shell(shape: Arc<Shape>) -> Self {
        let slots = shape.zeroed_slots();
        Self::from_body(Body::Record { shape, slots })
    }

    /// Allocation address, the identity key of this object
    pub fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }

    /// Same object?
    pub fn ptr_eq(&self, other: &ObjRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Runtime type
    pub fn type_ref(&self) -> TypeRef {
        self.0.body.read().type_ref()
    }

    /// Class of an instance, record, or sequence
    pub fn class_id(&self) -> Option<ClassId> {
        self.shape().map(|shape| shape.class())
    }

    /// Class shape of an instance, record, or sequence
    pub fn shape(&self) -> Option<Arc<Shape>> {
        match &*self.0.body.read() {
            Body::Instance { shape, .. } | Body::Record { shape, .. } => Some(shape.clone()),
            Body::Sequence { kind, .. } => Some(kind.clone()),
            _ => None,
        }
    }

    /// Runtime type name
    pub fn type_name(&self) -> String {
        self.0.body.read().type_name()
    }

    /// Is this an array or sequence?
    pub fn is_container(&self) -> bool {
        matches!(
            &*self.0.body.read(),
            Body::Array { .. } | Body::Sequence { .. }
        )
    }

    pub(crate) fn view(&self) -> ObjectView {
        match &*self.0.body.read() {
            Body::Instance { shape, .. } => ObjectView::Instance(shape.clone()),
            Body::Record { shape, .. } => ObjectView::Record(shape.clone()),
            Body::Array { element, .. } => ObjectView::Array(element.clone()),
            Body::Sequence { kind, .. } => ObjectView::Sequence(kind.clone()),
            Body::Boxed(p) => ObjectView::Boxed(*p),
        }
    }

    /// Read a field by name
    pub fn get_field(&self, name: &str) -> ObjectResult<Value> {
        match &*self.0.body.read() {
            Body::Instance { shape, slots } | Body::Record { shape, slots } => shape
                .slot_index(name)
                .map(|index| slots[index].clone())
                .ok_or_else(|| unknown_field(shape, name)),
            body => Err(wrong_kind("an instance or record", body)),
        }
    }

    /// Assign a field by name
    ///
    /// Readonly fields can only be assigned through [`ObjRef::init_field`].
    pub fn set_field(&self, name: &str, value: impl Into<Value>) -> ObjectResult<()> {
        self.assign(name, value.into(), false)
    }

    /// Construction-time assignment; may set readonly fields
    pub fn init_field(&self, name: &str, value: impl Into<Value>) -> ObjectResult<()> {
        self.assign(name, value.into(), true)
    }

    fn assign(&self, name: &str, value: Value, constructing: bool) -> ObjectResult<()> {
        match &mut *self.0.body.write() {
            Body::Instance { shape, slots } => {
                let index = shape
                    .slot_index(name)
                    .ok_or_else(|| unknown_field(shape, name))?;
                let slot = &shape.slots()[index];
                if slot.field().is_readonly() && !constructing {
                    return Err(ObjectError::ReadonlyField {
                        class: slot.owner_name().to_string(),
                        field: name.to_string(),
                    });
                }
                slots[index] = value;
                Ok(())
            }
            body @ (Body::Record { .. } | Body::Boxed(_)) => {
                Err(ObjectError::ImmutableValue(body.type_name()))
            }
            body => Err(wrong_kind("an instance", body)),
        }
    }

    /// Read a slot by flattened index
    pub fn field_at(&self, index: usize) -> ObjectResult<Value> {
        match &*self.0.body.read() {
            Body::Instance { slots, .. } | Body::Record { slots, .. } => {
                slots.get(index).cloned().ok_or(ObjectError::IndexOutOfBounds {
                    index,
                    len: slots.len(),
                })
            }
            body => Err(wrong_kind("an instance or record", body)),
        }
    }

    /// All slots in flattened order
    pub fn fields(&self) -> ObjectResult<Vec<Value>> {
        match &*self.0.body.read() {
            Body::Instance { slots, .. } | Body::Record { slots, .. } => Ok(slots.clone()),
            body => Err(wrong_kind("an instance or record", body)),
        }
    }

    /// Slot write that ignores `readonly` and record immutability.
    pub(crate) fn write_slot(&self, index: usize, value: Value) -> ObjectResult<()> {
        match &mut *self.0.body.write() {
            Body::Instance { slots, .. } | Body::Record { slots, .. } => {
                let len = slots.len();
                let slot = slots
                    .get_mut(index)
                    .ok_or(ObjectError::IndexOutOfBounds { index, len })?;
                *slot = value;
                Ok(())
            }
            body => Err(wrong_kind("an instance or record", body)),
        }
    }

    /// Element count of an array or sequence
    pub fn len(&self) -> ObjectResult<usize> {
        match &*self.0.body.read() {
            Body::Array { slots, .. } => Ok(slots.len()),
            Body::Sequence { items, .. } => Ok(items.len()),
            body => Err(wrong_kind("a container", body)),
        }
    }

    /// Is this container empty?
    pub fn is_empty(&self) -> ObjectResult<bool> {
        self.len().map(|len| len == 0)
    }

    /// Element at `index`
    pub fn get(&self, index: usize) -> ObjectResult<Value> {
        match &*self.0.body.read() {
            Body::Array { slots: items, .. } | Body::Sequence { items, .. } => items
                .get(index)
                .cloned()
                .ok_or(ObjectError::IndexOutOfBounds {
                    index,
                    len: items.len(),
                }),
            body => Err(wrong_kind("a container", body)),
        }
    }

    /// Replace the element at `index`
    pub fn set(&self, index: usize, value: impl Into<Value>) -> ObjectResult<()> {
        match &mut *self.0.body.write() {
            Body::Array { slots: items, .. } | Body::Sequence { items, .. } => {
                let len = items.len();
                let item = items
                    .get_mut(index)
                    .ok_or(ObjectError::IndexOutOfBounds { index, len })?;
                *item = value.into();
                Ok(())
            }
            body => Err(wrong_kind("a container", body)),
        }
    }

    /// Append to a sequence
    pub fn push(&self, value: impl Into<Value>) -> ObjectResult<()> {
        match &mut *self.0.body.write() {
            Body::Sequence {
                capacity, items, ..
            } => {
                if let Some(capacity) = *capacity
                    && items.len() >= capacity
                {
                    return Err(ObjectError::CapacityExceeded { capacity });
                }
                items.push(value.into());
                Ok(())
            }
            body => Err(wrong_kind("a sequence", body)),
        }
    }

    /// Snapshot of the elements of an array or sequence
    pub fn items(&self) -> ObjectResult<Vec<Value>> {
        match &*self.0.body.read() {
            Body::Array { slots: items, .. } | Body::Sequence { items, .. } => Ok(items.clone()),
            body => Err(wrong_kind("a container", body)),
        }
    }

    /// Fixed capacity of a bounded sequence
    pub fn capacity(&self) -> Option<usize> {
        match &*self.0.body.read() {
            Body::Sequence { capacity, .. } => *capacity,
            _ => None,
        }
    }

    /// Primitive inside a boxed value
    pub fn unboxed(&self) -> Option<Primitive> {
        match &*self.0.body.read() {
            Body::Boxed(p) => Some(*p),
            _ => None,
        }
    }
}

fn unknown_field(shape: &Shape, name: &str) -> ObjectError {
    ObjectError::UnknownField {
        class: shape.name().to_string(),
        field: name.to_string(),
    }
}

fn wrong_kind(expected: &'static str, body: &Body) -> ObjectError {
    ObjectError::WrongKind {
        expected,
        found: body.type_name(),
    }
}

/// Prints the type and address only; fields may lead back to this object.
impl fmt::Debug for ObjRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.body.try_read() {
            Some(body) => write!(f, "ObjRef({} @ {:#x})", body.type_name(), self.addr()),
            None => write!(f, "ObjRef(<locked> @ {:#x})", self.addr()),
        }
    }
}

impl PartialEq for ObjRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for ObjRef {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::PrimType;

    #[test]
    fn test_array_zero_fill_and_bounds() {
        let arr = ObjRef::new_array(TypeRef::Primitive(PrimType::I32), 3);
        assert_eq!(arr.len().unwrap(), 3);
        assert_eq!(arr.get(2).unwrap(), Value::from(0));

        arr.set(1, 7).unwrap();
        assert_eq!(arr.get(1).unwrap(), Value::from(7));

        assert!(matches!(
            arr.get(3),
            Err(ObjectError::IndexOutOfBounds { index: 3, len: 3 })
        ));
        assert!(matches!(arr.push(1), Err(ObjectError::WrongKind { .. })));
    }

    #[test]
    fn test_identity_is_allocation() {
        let a = ObjRef::boxed(Primitive::I32(1));
        let b = ObjRef::boxed(Primitive::I32(1));
        assert!(a.ptr_eq(&a.clone()));
        assert!(!a.ptr_eq(&b));
        assert_ne!(a.addr(), b.addr());
    }

    #[test]
    fn test_boxed_is_immutable() {
        let b = ObjRef::boxed(Primitive::Char('u'));
        assert_eq!(b.unboxed(), Some(Primitive::Char('u')));
        assert_eq!(b.type_ref(), TypeRef::Boxed(PrimType::Char));
        assert!(matches!(
            b.set_field("value", 'x'),
            Err(ObjectError::ImmutableValue(_))
        ));
    }

    #[test]
    fn test_debug_does_not_recurse() {
        let arr = ObjRef::new_array(TypeRef::Any, 1);
        arr.set(0, arr.clone()).unwrap();
        let printed = format!("{arr:?}");
        assert!(printed.starts_with("ObjRef(any[] @ 0x"));
    }
}
