//! Object fabrication facility
//!
//! The clone engine never builds objects itself; it asks a [`Fabricator`] for
//! an empty instance of the original's runtime class and fills it in.

use crate::error::{CloneError, CloneResult, ObjectError};
use crate::object::ObjRef;
use crate::registry::{ClassId, TypeRegistry};

/// Produces empty objects of a given runtime class
pub trait Fabricator: Send + Sync {
    /// Field-addressable instance of `class`, not yet populated
    fn fabricate_object(&self, registry: &TypeRegistry, class: ClassId) -> CloneResult<ObjRef>;

    /// Empty sequence of the concrete kind `kind`
    fn fabricate_sequence(&self, registry: &TypeRegistry, kind: ClassId) -> CloneResult<ObjRef> {
        registry
            .new_sequence(kind)
            .map_err(|err| construction_error(registry, kind, err))
    }
}

/// Zero-filled shells that bypass every constructor
///
/// Initializers and declared initial values never run, so fabrication has no
/// user-visible side effects.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawFabricator;

impl Fabricator for RawFabricator {
    fn fabricate_object(&self, registry: &TypeRegistry, class: ClassId) -> CloneResult<ObjRef> {
        registry
            .allocate_shell(class)
            .map_err(|err| construction_error(registry, class, err))
    }
}

/// Fabrication through the parameterless constructor
///
/// For hosts without a raw allocation path. Deviates from the clone contract:
/// initializers run again for every cloned object, and classes without a
/// parameterless constructor cannot be cloned at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstructorFabricator;

impl Fabricator for ConstructorFabricator {
    fn fabricate_object(&self, registry: &TypeRegistry, class: ClassId) -> CloneResult<ObjRef> {
        registry
            .instantiate(class)
            .map_err(|err| construction_error(registry, class, err))
    }
}

fn construction_error(registry: &TypeRegistry, class: ClassId, err: ObjectError) -> CloneError {
    let type_name = registry
        .shape(class)
        .map(|shape| shape.name().to_string())
        .unwrap_or_else(|_| class.to_string());
    CloneError::construction(type_name, err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::{ClassBuilder, FieldDef, SequenceShape};
    use crate::value::{PrimType, TypeRef, Value};

    #[test]
    fn test_raw_fabricator_zero_fills() {
        let registry = TypeRegistry::new();
        let id = registry
            .register(
                ClassBuilder::new("A")
                    .field(FieldDef::new("n", TypeRef::Primitive(PrimType::I32)).initial(10)),
            )
            .unwrap();

        let shell = RawFabricator.fabricate_object(&registry, id).unwrap();
        assert_eq!(shell.get_field("n").unwrap(), Value::from(0));
    }

    #[test]
    fn test_constructor_fabricator_runs_defaults() {
        let registry = TypeRegistry::new();
        let id = registry
            .register(
                ClassBuilder::new("A")
                    .field(FieldDef::new("n", TypeRef::Primitive(PrimType::I32)).initial(10)),
            )
            .unwrap();

        let obj = ConstructorFabricator.fabricate_object(&registry, id).unwrap();
        assert_eq!(obj.get_field("n").unwrap(), Value::from(10));
    }

    #[test]
    fn test_failures_become_construction_errors() {
        let registry = TypeRegistry::new();
        let abs = registry.register(ClassBuilder::abstract_class("Base")).unwrap();
        let bounded = registry
            .register(ClassBuilder::sequence("Ring", SequenceShape::Bounded))
            .unwrap();
        let no_ctor = registry
            .register(ClassBuilder::new("Handle").without_default_constructor())
            .unwrap();

        let err = RawFabricator.fabricate_object(&registry, abs).unwrap_err();
        assert!(err.is_construction());
        assert!(err.to_string().contains("`Base`"));

        let err = RawFabricator.fabricate_sequence(&registry, bounded).unwrap_err();
        assert!(err.is_construction());

        assert!(RawFabricator.fabricate_object(&registry, no_ctor).is_ok());
        assert!(
            ConstructorFabricator
                .fabricate_object(&registry, no_ctor)
                .unwrap_err()
                .is_construction()
        );
    }
}
