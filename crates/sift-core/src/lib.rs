//! # sift-core
//!
//! Core types, errors, and configuration for Sift.
//!
//! This crate provides the foundational building blocks used by the query crates:
//! - Common error types
//! - Result type aliases
//! - Scalar filter values and date coercion
//! - The `Record` abstraction used to evaluate predicates in memory
//! - Configuration types

pub mod error;
pub mod result;
pub mod value;
pub mod record;
pub mod config;

pub use error::*;
pub use result::*;
pub use value::*;
pub use record::*;
