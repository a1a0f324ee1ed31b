//! # Value Objects
//!
//! Immutable value types shared by every entity:
//!
//! - **query**: pagination windows, sort orders and pattern searches

pub mod query;

pub use query::{parse_sort, Page, SearchQuery, SortKey, SortOrder, DEFAULT_LIMIT};
