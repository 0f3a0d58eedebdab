//! # Facsimile
//!
//! Identity-preserving deep copy of reflective object graphs.
//!
//! ## Design Principles
//!
//! - **Reflective object model**: classes are declared at runtime in a
//!   [`TypeRegistry`]; instances are slot vectors laid out by a flattened
//!   [`Shape`] covering the whole inheritance chain
//! - **Identity, not equality**: objects are keyed by allocation address, so
//!   shared references and cycles survive cloning
//! - **Leaves are shared**: primitives, boxed primitives, strings, and records
//!   are never copied (see [`ImmutablePolicy`])
//! - **No constructors**: clones start as zero-filled shells from a
//!   [`Fabricator`]
//! - **Thread-safe**: values are `Send + Sync`; each clone call owns its
//!   identity map
//!
//! ```
//! use std::sync::Arc;
//! use facsimile::{ClassBuilder, Cloner, FieldDef, TypeRef, TypeRegistry, Value};
//!
//! let registry = Arc::new(TypeRegistry::new());
//! let node = registry
//!     .register(ClassBuilder::new("Node").field(FieldDef::new("next", TypeRef::Any)))
//!     .unwrap();
//!
//! let original = registry.instantiate(node).unwrap();
//! original.set_field("next", original.clone()).unwrap();
//!
//! let clone = Cloner::new(registry).deep_clone(&original).unwrap();
//! assert!(!clone.ptr_eq(&original));
//! assert_eq!(clone.get_field("next").unwrap(), Value::Ref(clone.clone()));
//! ```

#![warn(clippy::all)]
#![warn(missing_docs)]

pub mod cloner;
pub mod error;
pub mod fabricate;
pub mod object;
pub mod policy;
pub mod registry;
pub mod shape;
mod stack;
pub mod value;

pub use cloner::{CloneConfig, CloneStats, Cloner, ClonerBuilder, deep_clone};
pub use error::{AccessOp, CloneError, CloneResult, ObjectError, ObjectResult};
pub use fabricate::{ConstructorFabricator, Fabricator, RawFabricator};
pub use object::ObjRef;
pub use policy::{FieldAccess, ImmutablePolicy, KnownImmutables, PublicOnly, Unrestricted};
pub use registry::{ClassId, TypeRegistry};
pub use shape::{ClassBuilder, ClassKind, FieldDef, Initializer, SequenceShape, Shape, Slot, Visibility};
pub use value::{GraphValue, PrimType, Primitive, TypeRef, Value};
