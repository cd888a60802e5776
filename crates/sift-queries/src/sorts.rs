//! Sort Orders
//!
//! Structured view of the `$orderby` option: a comma-separated list of
//! `<field> [asc|desc]` criteria.

use std::cmp::Ordering;

use sift_core::{compare_values, resolve_path, Record};

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    /// Ascending order (A-Z, 1-9, oldest first)
    #[default]
    Asc,
    /// Descending order (Z-A, 9-1, newest first)
    Desc,
}

impl SortDirection {
    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }

    /// Convert to string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// A single sort criterion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortCriterion {
    /// Property path to sort by
    pub property: String,
    /// The sort direction
    pub direction: SortDirection,
}

impl SortCriterion {
    /// Create a new sort criterion
    pub fn new(property: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            property: property.into(),
            direction,
        }
    }

    /// Create ascending sort
    pub fn asc(property: impl Into<String>) -> Self {
        Self::new(property, SortDirection::Asc)
    }

    /// Create descending sort
    pub fn desc(property: impl Into<String>) -> Self {
        Self::new(property, SortDirection::Desc)
    }

    /// Parse `<field> [asc|desc]`. Unknown direction words reject the criterion.
    pub fn parse(text: &str) -> Option<Self> {
        let mut parts = text.split_whitespace();
        let property = parts.next()?;
        let direction = match parts.next() {
            Some(word) => SortDirection::from_str(word)?,
            None => SortDirection::Asc,
        };
        if parts.next().is_some() {
            return None;
        }
        Some(Self::new(property, direction))
    }

    /// `$orderby` form
    pub fn render(&self) -> String {
        format!("{} {}", self.property, self.direction.as_str())
    }

    /// Compare two records on this criterion.
    ///
    /// Records without a comparable value sort before those with one.
    pub fn compare<R: Record + ?Sized>(&self, a: &R, b: &R) -> Ordering {
        let left = resolve_path(a, &self.property).and_then(Record::scalar);
        let right = resolve_path(b, &self.property).and_then(Record::scalar);
        let ordering = match (&left, &right) {
            (Some(l), Some(r)) => compare_values(l, r).unwrap_or(Ordering::Equal),
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        match self.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

/// Collection of sort criteria
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortOrder {
    criteria: Vec<SortCriterion>,
}

impl SortOrder {
    /// Create a new empty sort order
    pub fn new() -> Self {
        Self { criteria: vec![] }
    }

    /// Create with a single criterion
    pub fn by(property: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            criteria: vec![SortCriterion::new(property, direction)],
        }
    }

    /// Create with ascending sort on single property
    pub fn by_asc(property: impl Into<String>) -> Self {
        Self::by(property, SortDirection::Asc)
    }

    /// Create with descending sort on single property
    pub fn by_desc(property: impl Into<String>) -> Self {
        Self::by(property, SortDirection::Desc)
    }

    /// Parse `$orderby` text; malformed criteria are skipped
    pub fn parse(text: &str) -> Self {
        Self {
            criteria: text
                .split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .filter_map(SortCriterion::parse)
                .collect(),
        }
    }

    /// Add a sort criterion (builder pattern)
    pub fn then(mut self, criterion: SortCriterion) -> Self {
        self.criteria.push(criterion);
        self
    }

    /// Add ascending sort
    pub fn then_asc(self, property: impl Into<String>) -> Self {
        self.then(SortCriterion::asc(property))
    }

    /// Add descending sort
    pub fn then_desc(self, property: impl Into<String>) -> Self {
        self.then(SortCriterion::desc(property))
    }

    /// Get all sort criteria
    pub fn criteria(&self) -> &[SortCriterion] {
        &self.criteria
    }

    /// Check if any sort is defined
    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    /// Get number of sort criteria
    pub fn len(&self) -> usize {
        self.criteria.len()
    }

    /// `$orderby` form
    pub fn render(&self) -> String {
        self.criteria
            .iter()
            .map(SortCriterion::render)
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Compare two records, falling through criteria until one differs
    pub fn compare<R: Record + ?Sized>(&self, a: &R, b: &R) -> Ordering {
        self.criteria
            .iter()
            .map(|criterion| criterion.compare(a, b))
            .find(|ordering| *ordering != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sort_direction() {
        assert_eq!(SortDirection::from_str("asc"), Some(SortDirection::Asc));
        assert_eq!(SortDirection::from_str("DESC"), Some(SortDirection::Desc));
        assert_eq!(SortDirection::from_str("up"), None);
    }

    #[test]
    fn test_parse_criterion() {
        assert_eq!(SortCriterion::parse("name desc"), Some(SortCriterion::desc("name")));
        assert_eq!(SortCriterion::parse("name"), Some(SortCriterion::asc("name")));
        assert_eq!(SortCriterion::parse("name sideways"), None);
        assert_eq!(SortCriterion::parse("name asc extra"), None);
        assert_eq!(SortCriterion::parse("   "), None);
    }

    #[test]
    fn test_parse_order() {
        let order = SortOrder::parse("name desc, age,, owner.name asc");
        assert_eq!(order.len(), 3);
        assert_eq!(order.criteria()[0], SortCriterion::desc("name"));
        assert_eq!(order.criteria()[1], SortCriterion::asc("age"));
        assert_eq!(order.render(), "name desc,age asc,owner.name asc");
    }

    #[test]
    fn test_builder() {
        let order = SortOrder::by_desc("updated_at").then_asc("id");
        assert_eq!(order.render(), "updated_at desc,id asc");
        assert!(!order.is_empty());
        assert!(SortOrder::new().is_empty());
    }

    #[test]
    fn test_compare_records() {
        let a = json!({ "name": "Ann", "age": 30 });
        let b = json!({ "name": "Bob", "age": 30 });
        let c = json!({ "age": 20 });

        let order = SortOrder::by_desc("age").then_asc("name");
        assert_eq!(order.compare(&a, &b), Ordering::Less);
        assert_eq!(order.compare(&c, &a), Ordering::Greater);

        // Missing values sort first ascending
        assert_eq!(SortCriterion::asc("name").compare(&c, &a), Ordering::Less);
        assert_eq!(SortCriterion::desc("name").compare(&c, &a), Ordering::Greater);
    }
}
