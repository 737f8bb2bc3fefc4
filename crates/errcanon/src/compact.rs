//! Compact stack representation.
//!
//! A host runtime records a captured call stack as a small tree of arrays:
//! numeric arrays for method and position data, object arrays for class
//! references and nested chunks. The shape is runtime-defined. This crate
//! only relies on it being built from the variants below, and on the first
//! object array holding one class per frame.

use crate::class::ClassId;
use std::sync::Arc;

/// One node of a compact stack representation.
#[derive(Debug, Clone)]
pub enum CompactValue {
    /// Absent reference.
    Null,
    /// 32-bit numeric array.
    Ints(Arc<[i32]>),
    /// 16-bit numeric array.
    Shorts(Arc<[i16]>),
    /// 64-bit numeric array, e.g. instruction pointers.
    Words(Arc<[u64]>),
    /// Reference to a class.
    Class(ClassId),
    /// Reference to an interned name.
    Text(Arc<str>),
    /// Array of nested values.
    Objects(Arc<[CompactValue]>),
}

impl CompactValue {
    /// Builds an object array.
    #[must_use]
    pub fn objects(values: impl IntoIterator<Item = CompactValue>) -> Self {
        CompactValue::Objects(values.into_iter().collect())
    }

    /// Builds a 32-bit numeric array.
    #[must_use]
    pub fn ints(values: &[i32]) -> Self {
        CompactValue::Ints(values.into())
    }

    /// Builds a 16-bit numeric array.
    #[must_use]
    pub fn shorts(values: &[i16]) -> Self {
        CompactValue::Shorts(values.into())
    }

    /// Builds a 64-bit numeric array.
    #[must_use]
    pub fn words(values: &[u64]) -> Self {
        CompactValue::Words(values.into())
    }

    /// Builds a name reference.
    #[must_use]
    pub fn text(value: &str) -> Self {
        CompactValue::Text(value.into())
    }

    /// Returns the elements if this is an object array.
    #[must_use]
    pub fn as_objects(&self) -> Option<&[CompactValue]> {
        match self {
            CompactValue::Objects(values) => Some(values),
            _ => None,
        }
    }

    /// Returns the class if this is a class reference.
    #[must_use]
    pub fn as_class(&self) -> Option<ClassId> {
        match self {
            CompactValue::Class(class) => Some(*class),
            _ => None,
        }
    }
}

/// Returns the first element of `values` that is itself an object array.
///
/// Scanning instead of indexing keeps the lookup working when a runtime
/// shifts the per-frame class array to another position.
#[must_use]
pub fn first_object_array(values: &[CompactValue]) -> Option<&[CompactValue]> {
    values.iter().find_map(CompactValue::as_objects)
}

/// Deep structural comparison of two compact values.
///
/// Values sharing an allocation are equal without being walked. Numeric
/// arrays compare element-wise, but only against the same numeric variant.
/// Object arrays must have the same length and pairwise equal elements.
/// Every other mix of variants is unequal.
///
/// # Example
///
/// ```
/// use errcanon::{ClassId, CompactValue, compare_arrays};
///
/// let build = |last: i32| {
///     CompactValue::objects([
///         CompactValue::objects([CompactValue::text("A")]),
///         CompactValue::ints(&[1, 2, last]),
///         CompactValue::Class(ClassId::named("C1")),
///     ])
/// };
///
/// assert!(compare_arrays(&build(3), &build(3)));
/// assert!(!compare_arrays(&build(3), &build(4)));
/// ```
#[must_use]
pub fn compare_arrays(a: &CompactValue, b: &CompactValue) -> bool {
    use CompactValue::{Class, Ints, Null, Objects, Shorts, Text, Words};

    match (a, b) {
        (Null, Null) => true,
        (Class(x), Class(y)) => x == y,
        (Text(x), Text(y)) => Arc::ptr_eq(x, y) || x == y,
        (Ints(x), Ints(y)) => Arc::ptr_eq(x, y) || x == y,
        (Shorts(x), Shorts(y)) => Arc::ptr_eq(x, y) || x == y,
        (Words(x), Words(y)) => Arc::ptr_eq(x, y) || x == y,
        (Objects(x), Objects(y)) => {
            if Arc::ptr_eq(x, y) {
                return true;
            }
            x.len() == y.len() && x.iter().zip(y.iter()).all(|(l, r)| compare_arrays(l, r))
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(tail: &[i32]) -> CompactValue {
        CompactValue::objects([
            CompactValue::objects([CompactValue::text("A")]),
            CompactValue::ints(tail),
            CompactValue::shorts(&[7, 8]),
            CompactValue::Null,
            CompactValue::objects([
                CompactValue::Class(ClassId::named("test.C1")),
                CompactValue::Class(ClassId::named("test.C2")),
            ]),
        ])
    }

    #[test]
    fn test_distinct_instances_equal() {
        let a = sample(&[1, 2, 3]);
        let b = sample(&[1, 2, 3]);
        assert!(compare_arrays(&a, &b));
        assert!(compare_arrays(&a, &a));
    }

    #[test]
    fn test_single_nested_change() {
        assert!(!compare_arrays(&sample(&[1, 2, 3]), &sample(&[1, 2, 4])));
        assert!(!compare_arrays(&sample(&[1, 2, 3]), &sample(&[1, 2])));
    }

    #[test]
    fn test_class_change() {
        let a = CompactValue::objects([CompactValue::Class(ClassId::named("test.C1"))]);
        let b = CompactValue::objects([CompactValue::Class(ClassId::named("test.C3"))]);
        assert!(!compare_arrays(&a, &b));
    }

    #[test]
    fn test_mixed_variants_unequal() {
        assert!(!compare_arrays(&CompactValue::ints(&[1]), &CompactValue::shorts(&[1])));
        assert!(!compare_arrays(&CompactValue::words(&[1]), &CompactValue::ints(&[1])));
        assert!(!compare_arrays(&CompactValue::Null, &CompactValue::objects([])));
        assert!(!compare_arrays(&CompactValue::text("x"), &CompactValue::Null));
    }

    #[test]
    fn test_length_mismatch() {
        let a = CompactValue::objects([CompactValue::Null]);
        let b = CompactValue::objects([CompactValue::Null, CompactValue::Null]);
        assert!(!compare_arrays(&a, &b));
    }

    #[test]
    fn test_shared_allocation_short_circuit() {
        let shared = sample(&[9]);
        let copy = shared.clone();
        assert!(compare_arrays(&shared, &copy));
    }

    #[test]
    fn test_first_object_array_skips_numeric() {
        let values = [
            CompactValue::ints(&[1]),
            CompactValue::Null,
            CompactValue::objects([CompactValue::text("frame")]),
            CompactValue::objects([]),
        ];
        let found = first_object_array(&values).unwrap();
        assert_eq!(found.len(), 1);

        assert!(first_object_array(&[CompactValue::Null]).is_none());
    }
}
