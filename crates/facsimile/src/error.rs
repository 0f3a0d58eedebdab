//! Error types for the object model and the clone engine

use std::fmt;

use thiserror::Error;

use crate::registry::ClassId;

/// Result alias for object-model operations
pub type ObjectResult<T> = Result<T, ObjectError>;

/// Result alias for clone operations
pub type CloneResult<T> = Result<T, CloneError>;

/// Misuse of the reflective object model
#[derive(Debug, Error)]
pub enum ObjectError {
    /// No class registered under this id
    #[error("unknown class {0}")]
    UnknownClass(ClassId),

    /// A class with this name is already registered
    #[error("class `{0}` is already registered")]
    DuplicateClass(String),

    /// The declared parent cannot be inherited from
    #[error("class `{class}` cannot extend `{parent}`")]
    InvalidParent {
        /// Class being declared
        class: String,
        /// Rejected parent
        parent: String,
    },

    /// A class declaration is malformed
    #[error("invalid declaration of `{class}`: {reason}")]
    InvalidDeclaration {
        /// Class being declared
        class: String,
        /// What is wrong with it
        reason: &'static str,
    },

    /// Field lookup by name failed
    #[error("`{class}` has no field `{field}`")]
    UnknownField {
        /// Class searched
        class: String,
        /// Missing field name
        field: String,
    },

    /// Assignment to a readonly field outside of construction
    #[error("field `{class}.{field}` is readonly")]
    ReadonlyField {
        /// Declaring class
        class: String,
        /// Field name
        field: String,
    },

    /// Mutation of a record or boxed value
    #[error("`{0}` is immutable")]
    ImmutableValue(String),

    /// The operation does not apply to this kind of object
    #[error("expected {expected}, found `{found}`")]
    WrongKind {
        /// Expected kind of object
        expected: &'static str,
        /// Actual type name
        found: String,
    },

    /// Array or sequence index past the end
    #[error("index {index} out of bounds for length {len}")]
    IndexOutOfBounds {
        /// Requested index
        index: usize,
        /// Current length
        len: usize,
    },

    /// Push into a full bounded sequence
    #[error("sequence capacity {capacity} exceeded")]
    CapacityExceeded {
        /// Fixed capacity of the sequence
        capacity: usize,
    },

    /// A bounded sequence kind was constructed without a capacity
    #[error("sequence kind `{0}` requires a capacity")]
    CapacityRequired(String),

    /// Record construction with the wrong number of components
    #[error("record `{class}` expects {expected} components, got {found}")]
    Arity {
        /// Record class
        class: String,
        /// Declared component count
        expected: usize,
        /// Supplied component count
        found: usize,
    },

    /// The class kind cannot be instantiated this way
    #[error("`{class}` cannot be instantiated: {reason}")]
    NotInstantiable {
        /// Class name
        class: String,
        /// Why not
        reason: &'static str,
    },

    /// `instantiate` on a class declared without a parameterless constructor
    #[error("`{0}` has no parameterless constructor")]
    NoDefaultConstructor(String),
}

/// Direction of a reflective field access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessOp {
    /// Reading a slot of the original
    Read,
    /// Writing a slot of the clone
    Write,
}

impl fmt::Display for AccessOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => f.write_str("read"),
            Self::Write => f.write_str("write"),
        }
    }
}

/// Failure of a top-level deep clone
#[derive(Debug, Error)]
pub enum CloneError {
    /// The fabrication facility cannot produce an instance of a runtime type
    #[error("ConstructionError: cannot fabricate `{type_name}`: {reason}")]
    Construction {
        /// Runtime type that could not be fabricated
        type_name: String,
        /// Underlying cause
        reason: String,
    },

    /// The host access guard forbids a field access
    #[error("AccessError: cannot {op} field `{class}.{field}`")]
    Access {
        /// Declaring class of the field
        class: String,
        /// Field name
        field: String,
        /// Attempted operation
        op: AccessOp,
    },

    /// Engine invariant violated
    #[error("InternalError: {0}")]
    Internal(String),
}

impl CloneError {
    /// Create a construction error
    pub fn construction(type_name: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::Construction {
            type_name: type_name.into(),
            reason: reason.to_string(),
        }
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this is a `ConstructionError`
    pub fn is_construction(&self) -> bool {
        matches!(self, Self::Construction { .. })
    }

    /// Whether this is an `AccessError`
    pub fn is_access(&self) -> bool {
        matches!(self, Self::Access { .. })
    }
}
