//! Shared assertions for the integration tests

#![allow(dead_code)]

use facsimile::{ObjRef, PrimType, TypeRef, Value};
use rustc_hash::FxHashSet;

/// Route `tracing` output through the test harness (`RUST_LOG=facsimile=trace`).
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn int() -> TypeRef {
    TypeRef::Primitive(PrimType::I32)
}

pub fn boolean() -> TypeRef {
    TypeRef::Primitive(PrimType::Bool)
}

pub fn double() -> TypeRef {
    TypeRef::Primitive(PrimType::F64)
}

/// Structural equality of two graphs.
///
/// Objects are compared field by field (containers element by element); a
/// pair of objects already under comparison is assumed equal, so cyclic
/// graphs terminate.
pub fn graph_eq(a: &Value, b: &Value) -> bool {
    let mut visiting = FxHashSet::default();
    values_eq(a, b, &mut visiting)
}

fn values_eq(a: &Value, b: &Value, visiting: &mut FxHashSet<(usize, usize)>) -> bool {
    match (a, b) {
        (Value::Ref(x), Value::Ref(y)) => objects_eq(x, y, visiting),
        _ => a == b,
    }
}

fn objects_eq(x: &ObjRef, y: &ObjRef, visiting: &mut FxHashSet<(usize, usize)>) -> bool {
    if !visiting.insert((x.addr(), y.addr())) {
        return true;
    }
    if x.type_ref() != y.type_ref() {
        return false;
    }
    if let (Some(p), Some(q)) = (x.unboxed(), y.unboxed()) {
        return p == q;
    }

    let (xs, ys) = match (x.fields(), y.fields()) {
        (Ok(xs), Ok(ys)) => (xs, ys),
        _ => match (x.items(), y.items()) {
            (Ok(xs), Ok(ys)) => (xs, ys),
            _ => return false,
        },
    };

    xs.len() == ys.len() && xs.iter().zip(&ys).all(|(a, b)| values_eq(a, b, visiting))
}

pub fn assert_equal_but_not_same(original: &ObjRef, clone: &ObjRef) {
    assert!(!original.ptr_eq(clone), "clone is the original object");
    assert!(
        graph_eq(&Value::Ref(original.clone()), &Value::Ref(clone.clone())),
        "clone differs from original"
    );
}

/// Walk `depth` levels of nested containers; every sub-container and every
/// innermost element must be equal to, but not the same object as, its
/// counterpart.
pub fn assert_elements_equal_but_not_same(original: &ObjRef, clone: &ObjRef, depth: usize) {
    assert!(!original.ptr_eq(clone));
    assert_eq!(original.type_ref(), clone.type_ref());

    let xs = original.items().unwrap();
    let ys = clone.items().unwrap();
    assert_eq!(xs.len(), ys.len());

    for (x, y) in xs.iter().zip(&ys) {
        let (x, y) = (x.as_object().unwrap(), y.as_object().unwrap());
        if depth > 1 {
            assert_elements_equal_but_not_same(x, y, depth - 1);
        } else {
            assert_equal_but_not_same(x, y);
        }
    }
}

/// Every object reachable from `root`, keyed by address.
pub fn reachable(root: &Value) -> FxHashSet<usize> {
    let mut seen = FxHashSet::default();
    let mut stack: Vec<Value> = vec![root.clone()];
    while let Some(value) = stack.pop() {
        let Value::Ref(obj) = value else { continue };
        if !seen.insert(obj.addr()) {
            continue;
        }
        if let Ok(fields) = obj.fields() {
            stack.extend(fields);
        } else if let Ok(items) = obj.items() {
            stack.extend(items);
        }
    }
    seen
}
