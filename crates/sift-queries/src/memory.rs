//! In-memory query execution
//!
//! Applies a `QueryOptions` bag to records already held by the caller:
//! filter, stable sort, count, then page.

use serde::Serialize;
use sift_core::config::EvaluationConfig;
use sift_core::Record;
use tracing::debug;

use crate::options::QueryOptions;

/// One page of in-memory results
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InMemoryPage<T> {
    /// Records on this page
    pub records: Vec<T>,
    /// Matches before paging; present only when `$inlinecount` is set
    pub total: Option<usize>,
}

impl<T> InMemoryPage<T> {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl QueryOptions {
    /// Run these options over `records` with default evaluation settings
    pub fn apply<'a, R: Record>(&self, records: &'a [R]) -> InMemoryPage<&'a R> {
        self.apply_with(records, &EvaluationConfig::default())
    }

    /// Run these options over `records`.
    ///
    /// `$expand` and `$select` do not reshape records.
    pub fn apply_with<'a, R: Record>(
        &self,
        records: &'a [R],
        config: &EvaluationConfig,
    ) -> InMemoryPage<&'a R> {
        let mut matched: Vec<&'a R> = match self.filter() {
            Some(predicate) => records
                .iter()
                .filter(|record| predicate.test_with_config(*record, config))
                .collect(),
            None => records.iter().collect(),
        };

        let order = self.sort_order();
        if !order.is_empty() {
            // sort_by is stable
            matched.sort_by(|a, b| order.compare(*a, *b));
        }

        let matched_count = matched.len();
        let total = self.inline_count().map(|_| matched_count);
        let skip = self.skip().map_or(0, |n| usize::try_from(n).unwrap_or(usize::MAX));
        let top = self.top().map_or(usize::MAX, |n| usize::try_from(n).unwrap_or(usize::MAX));

        let page: Vec<&'a R> = matched.into_iter().skip(skip).take(top).collect();

        debug!(
            matched = matched_count,
            returned = page.len(),
            "Applied query options in memory"
        );

        InMemoryPage {
            records: page,
            total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn people() -> Vec<Value> {
        vec![
            json!({ "name": "Carol", "age": 41, "team": "b" }),
            json!({ "name": "alice", "age": 29, "team": "a" }),
            json!({ "name": "Bob", "age": 35, "team": "a" }),
            json!({ "name": "Dave", "age": 17, "team": "b" }),
            json!({ "name": "Erin", "age": 35, "team": "c" }),
        ]
    }

    fn names(page: &InMemoryPage<&Value>) -> Vec<String> {
        page.records
            .iter()
            .map(|r| r["name"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    #[test]
    fn test_no_options_returns_everything() {
        let records = people();
        let page = QueryOptions::new().apply(&records);
        assert_eq!(page.len(), 5);
        assert_eq!(page.total, None);
    }

    #[test]
    fn test_filter_sort_page() {
        let records = people();
        let options = QueryOptions::new()
            .with_filter("age ge 18")
            .with_order_by("age desc, name")
            .with_skip(1)
            .with_top(2)
            .with_inline_count(true);

        let page = options.apply(&records);
        assert_eq!(names(&page), vec!["Bob", "Erin"]);
        assert_eq!(page.total, Some(4));
    }

    #[test]
    fn test_stable_sort() {
        let records = people();
        let page = QueryOptions::new().with_order_by("team").apply(&records);
        assert_eq!(names(&page), vec!["alice", "Bob", "Carol", "Dave", "Erin"]);
    }

    #[test]
    fn test_skip_past_end() {
        let records = people();
        let page = QueryOptions::new()
            .with_skip(10)
            .with_inline_count(true)
            .apply(&records);
        assert!(page.is_empty());
        assert_eq!(page.total, Some(5));
    }

    #[test]
    fn test_missing_association_config() {
        let records = vec![
            json!({ "name": "a", "owner": { "name": "x" } }),
            json!({ "name": "b" }),
        ];
        let options = QueryOptions::new().with_filter("owner.name eq 'x'");

        assert_eq!(options.apply(&records).len(), 1);

        let lenient = EvaluationConfig {
            fail_on_missing_association: false,
        };
        assert_eq!(options.apply_with(&records, &lenient).len(), 2);
    }
}
