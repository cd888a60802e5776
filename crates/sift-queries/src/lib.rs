//! # sift-queries
//!
//! Filter predicates and query options for Sift.
//!
//! This crate implements the shared query vocabulary that storage backends
//! translate into their own retrieval, and that in-memory stores can evaluate
//! directly.
//!
//! ## Structure
//!
//! - `predicate` - Immutable filter trees and the fluent field builder
//! - `lexer` / `parser` - Filter expression text into predicate trees
//! - `evaluator` - Predicate truth against in-memory records
//! - `sorts` - `$orderby` criteria
//! - `options` - The query options bag and its query-string form
//! - `memory` - Applying a full options bag to in-memory records
//!
//! ## Example
//!
//! ```
//! use sift_queries::{Predicate, QueryOptions};
//! use serde_json::json;
//!
//! let adults = Predicate::field("age").greater_than_or_equal_to(18);
//! let named = Predicate::field("name").starts_with("jo");
//! let filter = adults.and(named);
//! assert_eq!(filter.to_string(), "age ge 18 and startswith(name, 'jo')");
//!
//! let options = QueryOptions::new()
//!     .with_filter(&filter)
//!     .with_order_by("name desc")
//!     .with_top(10);
//!
//! let records = vec![json!({ "name": "John", "age": 30 })];
//! assert_eq!(options.apply(&records).records.len(), 1);
//!
//! // Text parses back into the same tree
//! assert_eq!(Predicate::parse(&filter.to_string()), Some(filter));
//! ```

pub mod predicate;
pub mod lexer;
pub mod parser;
pub mod evaluator;
pub mod sorts;
pub mod options;
pub mod memory;

// Re-exports for convenience
pub use predicate::{Condition, Field, Group, GroupOperator, Operator, Predicate};
pub use parser::is_property_path;
pub use sorts::{SortCriterion, SortDirection, SortOrder};
pub use options::{FilterInput, OptionKey, OptionText, OptionValue, QueryOptions};
pub use memory::InMemoryPage;
pub use sift_core::FilterValue;
