//! In-memory predicate evaluation
//!
//! Used by backends that already hold their records (caches, offline stores)
//! and need the same truth value a remote peer would compute for the filter.

use std::cmp::Ordering;

use sift_core::config::EvaluationConfig;
use sift_core::{compare_values, resolve_path, Record};
use tracing::trace;

use crate::predicate::{Condition, Group, GroupOperator, Operator, Predicate};

impl Predicate {
    /// Evaluate against a record; unresolvable property paths do not match
    pub fn test<R>(&self, record: &R) -> bool
    where
        R: Record + ?Sized,
    {
        self.test_with(record, true)
    }

    /// Evaluate against a record.
    ///
    /// A leaf whose property path cannot be resolved evaluates to
    /// `!fail_on_missing_association`.
    pub fn test_with<R>(&self, record: &R, fail_on_missing_association: bool) -> bool
    where
        R: Record + ?Sized,
    {
        match self {
            Self::Leaf(condition) => test_condition(condition, record, fail_on_missing_association),
            Self::Group(group) => test_group(group, record, fail_on_missing_association),
        }
    }

    pub fn test_with_config<R>(&self, record: &R, config: &EvaluationConfig) -> bool
    where
        R: Record + ?Sized,
    {
        self.test_with(record, config.fail_on_missing_association)
    }

    /// Records that satisfy this predicate, in their original order
    pub fn filter<'a, R: Record>(&self, records: &'a [R]) -> Vec<&'a R> {
        records.iter().filter(|record| self.test(*record)).collect()
    }
}

fn test_group<R>(group: &Group, record: &R, fail_on_missing: bool) -> bool
where
    R: Record + ?Sized,
{
    let operator = group.effective_operator();
    for child in &group.children {
        let result = child.test_with(record, fail_on_missing);
        match operator {
            GroupOperator::And if !result => return false,
            GroupOperator::Or if result => return true,
            _ => {}
        }
    }
    operator == GroupOperator::And
}

fn test_condition<R>(condition: &Condition, record: &R, fail_on_missing: bool) -> bool
where
    R: Record + ?Sized,
{
    let Some(node) = resolve_path(record, &condition.property) else {
        trace!(property = %condition.property, "Property path not resolved");
        return !fail_on_missing;
    };
    let actual = node.scalar();

    if condition.operator.is_function() {
        let Some(actual) = actual else {
            return false;
        };
        let haystack = actual.as_text().to_lowercase();
        let needle = condition.value.as_text().to_lowercase();
        return match condition.operator {
            Operator::Contains => haystack.contains(&needle),
            Operator::StartsWith => haystack.starts_with(&needle),
            _ => haystack.ends_with(&needle),
        };
    }

    let ordering = actual
        .as_ref()
        .and_then(|value| compare_values(value, &condition.value));

    match condition.operator {
        Operator::Eq => ordering == Some(Ordering::Equal),
        Operator::Ne => ordering != Some(Ordering::Equal),
        Operator::Gt => ordering == Some(Ordering::Greater),
        Operator::Ge => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
        Operator::Lt => ordering == Some(Ordering::Less),
        Operator::Le => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
        Operator::Contains | Operator::StartsWith | Operator::EndsWith => false,
    }
}
