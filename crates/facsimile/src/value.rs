//! Values reachable from an object graph
//!
//! A [`Value`] is either an inline datum (null, primitive, string) or a
//! reference to a heap object. Strings are `Arc<str>` so that sharing one is
//! observable through pointer identity, the same way heap references are.

use std::fmt;
use std::sync::Arc;

use crate::object::ObjRef;
use crate::registry::ClassId;

/// Primitive type tag
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PrimType {
    /// `void`
    Unit,
    /// Boolean
    Bool,
    /// Unicode scalar
    Char,
    /// 8-bit signed integer
    I8,
    /// 16-bit signed integer
    I16,
    /// 32-bit signed integer
    I32,
    /// 64-bit signed integer
    I64,
    /// 32-bit float
    F32,
    /// 64-bit float
    F64,
}

impl PrimType {
    /// The zero value a fresh slot of this type holds
    pub fn zero(self) -> Primitive {
        match self {
            Self::Unit => Primitive::Unit,
            Self::Bool => Primitive::Bool(false),
            Self::Char => Primitive::Char('\0'),
            Self::I8 => Primitive::I8(0),
            Self::I16 => Primitive::I16(0),
            Self::I32 => Primitive::I32(0),
            Self::I64 => Primitive::I64(0),
            Self::F32 => Primitive::F32(0.0),
            Self::F64 => Primitive::F64(0.0),
        }
    }

    /// Type name
    pub fn name(self) -> &'static str {
        match self {
            Self::Unit => "unit",
            Self::Bool => "bool",
            Self::Char => "char",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::F32 => "f32",
            Self::F64 => "f64",
        }
    }
}

/// Inline primitive datum
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Primitive {
    /// `void`
    Unit,
    /// Boolean
    Bool(bool),
    /// Unicode scalar
    Char(char),
    /// 8-bit signed integer
    I8(i8),
    /// 16-bit signed integer
    I16(i16),
    /// 32-bit signed integer
    I32(i32),
    /// 64-bit signed integer
    I64(i64),
    /// 32-bit float
    F32(f32),
    /// 64-bit float
    F64(f64),
}

impl Primitive {
    /// Type tag of this primitive
    pub fn ty(&self) -> PrimType {
        match self {
            Self::Unit => PrimType::Unit,
            Self::Bool(_) => PrimType::Bool,
            Self::Char(_) => PrimType::Char,
            Self::I8(_) => PrimType::I8,
            Self::I16(_) => PrimType::I16,
            Self::I32(_) => PrimType::I32,
            Self::I64(_) => PrimType::I64,
            Self::F32(_) => PrimType::F32,
            Self::F64(_) => PrimType::F64,
        }
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unit => f.write_str("()"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Char(v) => write!(f, "{v:?}"),
            Self::I8(v) => write!(f, "{v}"),
            Self::I16(v) => write!(f, "{v}"),
            Self::I32(v) => write!(f, "{v}"),
            Self::I64(v) => write!(f, "{v}"),
            Self::F32(v) => write!(f, "{v}"),
            Self::F64(v) => write!(f, "{v}"),
        }
    }
}

/// A declared or runtime type
///
/// Runtime types are never [`TypeRef::Any`]; that variant only appears as the
/// declared type of a field or array element that accepts anything.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeRef {
    /// Inline primitive
    Primitive(PrimType),
    /// Heap-allocated primitive
    Boxed(PrimType),
    /// Text string
    Str,
    /// Instance, record, or sequence of a registered class
    Class(ClassId),
    /// Array with the given element type
    Array(Box<TypeRef>),
    /// Any value
    Any,
}

impl TypeRef {
    /// Array type with the given element type
    pub fn array_of(element: TypeRef) -> Self {
        Self::Array(Box::new(element))
    }

    /// Element type, if this is an array type
    pub fn element(&self) -> Option<&TypeRef> {
        match self {
            Self::Array(element) => Some(element.as_ref()),
            _ => None,
        }
    }

    /// Zero-initialized value of a slot declared with this type
    pub fn zero(&self) -> Value {
        match self {
            Self::Primitive(p) => Value::Prim(p.zero()),
            _ => Value::Null,
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive(p) => f.write_str(p.name()),
            Self::Boxed(p) => write!(f, "Box<{}>", p.name()),
            Self::Str => f.write_str("str"),
            Self::Class(id) => write!(f, "class{id}"),
            Self::Array(element) => write!(f, "{element}[]"),
            Self::Any => f.write_str("any"),
        }
    }
}

/// Any datum reachable during cloning
#[derive(Clone, Debug, Default)]
pub enum Value {
    /// Absent reference
    #[default]
    Null,
    /// Inline primitive
    Prim(Primitive),
    /// Immutable text string
    Str(Arc<str>),
    /// Reference to a heap object
    Ref(ObjRef),
}

impl Value {
    /// Null value
    pub fn null() -> Self {
        Self::Null
    }

    /// String value backed by a fresh allocation
    pub fn string(s: &str) -> Self {
        Self::Str(Arc::from(s))
    }

    /// Heap-allocated (boxed) primitive
    pub fn boxed(p: impl Into<Primitive>) -> Self {
        Self::Ref(ObjRef::boxed(p.into()))
    }

    /// Is this null?
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Referenced heap object, if any
    pub fn as_object(&self) -> Option<&ObjRef> {
        match self {
            Self::Ref(obj) => Some(obj),
            _ => None,
        }
    }

    /// String contents, if this is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(&**s),
            _ => None,
        }
    }

    /// Primitive, if this is an inline primitive
    pub fn as_prim(&self) -> Option<Primitive> {
        match self {
            Self::Prim(p) => Some(*p),
            _ => None,
        }
    }

    /// Inline `i32`, if this is one
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Self::Prim(Primitive::I32(v)) => Some(*v),
            _ => None,
        }
    }

    /// Inline `f64`, if this is one
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Prim(Primitive::F64(v)) => Some(*v),
            _ => None,
        }
    }

    /// Inline `bool`, if this is one
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Prim(Primitive::Bool(v)) => Some(*v),
            _ => None,
        }
    }

    /// Runtime type; `None` for null
    pub fn type_ref(&self) -> Option<TypeRef> {
        match self {
            Self::Null => None,
            Self::Prim(p) => Some(TypeRef::Primitive(p.ty())),
            Self::Str(_) => Some(TypeRef::Str),
            Self::Ref(obj) => Some(obj.type_ref()),
        }
    }

    /// Strict identity
    ///
    /// Strings and references compare by allocation, primitives by value.
    pub fn is_same(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Prim(a), Self::Prim(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => Arc::ptr_eq(a, b),
            (Self::Ref(a), Self::Ref(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

/// Primitives and strings compare by value, references by identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Prim(a), Self::Prim(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Ref(a), Self::Ref(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl From<Primitive> for Value {
    fn from(p: Primitive) -> Self {
        Self::Prim(p)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::string(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(Arc::from(s))
    }
}

impl From<Arc<str>> for Value {
    fn from(s: Arc<str>) -> Self {
        Self::Str(s)
    }
}

impl From<ObjRef> for Value {
    fn from(obj: ObjRef) -> Self {
        Self::Ref(obj)
    }
}

impl From<Option<ObjRef>> for Value {
    fn from(obj: Option<ObjRef>) -> Self {
        obj.map_or(Self::Null, Self::Ref)
    }
}

impl From<()> for Primitive {
    fn from(_: ()) -> Self {
        Self::Unit
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Self::Prim(Primitive::Unit)
    }
}

/// A Rust type that can enter and leave the object graph
///
/// Lets `deep_clone` hand back the caller's static type instead of a bare
/// [`Value`].
pub trait GraphValue: Sized {
    /// Graph representation of `self`
    fn to_value(&self) -> Value;

    /// Convert back; `None` if `value` has a different shape
    fn from_value(value: Value) -> Option<Self>;
}

impl GraphValue for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }

    fn from_value(value: Value) -> Option<Self> {
        Some(value)
    }
}

impl GraphValue for ObjRef {
    fn to_value(&self) -> Value {
        Value::Ref(self.clone())
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Ref(obj) => Some(obj),
            _ => None,
        }
    }
}

impl GraphValue for Option<ObjRef> {
    fn to_value(&self) -> Value {
        Value::from(self.clone())
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Null => Some(None),
            Value::Ref(obj) => Some(Some(obj)),
            _ => None,
        }
    }
}

impl GraphValue for Arc<str> {
    fn to_value(&self) -> Value {
        Value::Str(self.clone())
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl GraphValue for () {
    fn to_value(&self) -> Value {
        Value::Prim(Primitive::Unit)
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Prim(Primitive::Unit) => Some(()),
            _ => None,
        }
    }
}

macro_rules! primitive_conversions {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Primitive {
                fn from(v: $ty) -> Self {
                    Self::$variant(v)
                }
            }

            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Self::Prim(Primitive::$variant(v))
                }
            }

            impl GraphValue for $ty {
                fn to_value(&self) -> Value {
                    Value::from(*self)
                }

                fn from_value(value: Value) -> Option<Self> {
                    match value {
                        Value::Prim(Primitive::$variant(v)) => Some(v),
                        _ => None,
                    }
                }
            }
        )*
    };
}

primitive_conversions!(
    bool => Bool,
    char => Char,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    f32 => F32,
    f64 => F64,
);
