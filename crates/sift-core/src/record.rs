//! Records that predicates are evaluated against
//!
//! The evaluator needs nothing from a record beyond named-property lookup that
//! tells an absent property apart from a present one.

use serde_json::Value;

use crate::value::FilterValue;

/// An in-memory structure addressable by property name
pub trait Record {
    /// Own-property lookup. `None` means the property is absent.
    fn field(&self, name: &str) -> Option<&Self>;

    /// Scalar view of this node. `None` for null and for nested structures.
    fn scalar(&self) -> Option<FilterValue>;
}

impl Record for Value {
    fn field(&self, name: &str) -> Option<&Self> {
        self.as_object()?.get(name)
    }

    fn scalar(&self) -> Option<FilterValue> {
        FilterValue::from_json(self)
    }
}

/// Walk a dot-separated property path.
///
/// Returns `None` as soon as a segment is absent, including when an
/// intermediate node is not an object.
pub fn resolve_path<'a, R>(record: &'a R, path: &str) -> Option<&'a R>
where
    R: Record + ?Sized,
{
    if path.is_empty() {
        return None;
    }
    let mut current = record;
    for segment in path.split('.') {
        current = current.field(segment)?;
    }
    Some(current)
}
