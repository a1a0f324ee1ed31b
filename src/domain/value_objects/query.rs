//! Pagination and sorting for search operations.

use serde::{Deserialize, Serialize};

use crate::shared::error::DomainError;

/// Limit applied when a caller does not supply one.
pub const DEFAULT_LIMIT: i64 = 25;

/// Sort direction. Nullable sort columns always place NULLs last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "dsc" | "desc" | "descending" => Self::Descending,
            _ => Self::Ascending,
        }
    }
}

/// Enumerated sort columns of one entity type.
pub trait SortKey: Copy + Send + Sync + 'static {
    /// The key used when none is given (creation time, newest first).
    const DEFAULT: Self;

    /// Primary key column; breaks ties so pages stay stable across offsets.
    const KEY_COLUMN: &'static str;

    /// Parse a query-string key such as `username`.
    fn from_key(key: &str) -> Option<Self>;

    /// Whitelisted SQL column for `ORDER BY`.
    fn column(&self) -> &'static str;
}

/// Parse `key` or `key_dir` (e.g. `firstname_dsc`).
///
/// An unknown or absent key sorts by the default key, descending.
/// A known key sorts ascending unless the direction says otherwise.
pub fn parse_sort<S: SortKey>(raw: &str) -> (S, SortOrder) {
    let mut parts = raw.splitn(2, '_');
    let key = parts.next().unwrap_or_default();
    let direction = parts.next();

    match S::from_key(key) {
        Some(sort_by) => (
            sort_by,
            direction.map(SortOrder::from_str).unwrap_or(SortOrder::Ascending),
        ),
        None => (
            S::DEFAULT,
            direction.map(SortOrder::from_str).unwrap_or(SortOrder::Descending),
        ),
    }
}

/// Offset pagination window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Page {
    limit: i64,
    offset: i64,
}

impl Page {
    /// Build a page, rejecting negative values.
    pub fn new(limit: i64, offset: i64) -> Result<Self, DomainError> {
        if limit < 0 {
            return Err(DomainError::invalid("limit can't be negative"));
        }
        if offset < 0 {
            return Err(DomainError::invalid("offset can't be negative"));
        }
        Ok(Self { limit, offset })
    }

    /// Build a page from optional query values.
    pub fn from_query(limit: Option<i64>, offset: Option<i64>) -> Result<Self, DomainError> {
        Self::new(limit.unwrap_or(DEFAULT_LIMIT), offset.unwrap_or(0))
    }

    /// Clamp the limit to an upper bound.
    pub fn capped(self, max_limit: i64) -> Self {
        Self {
            limit: self.limit.min(max_limit),
            offset: self.offset,
        }
    }

    pub fn limit(&self) -> i64 {
        self.limit
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

/// Pattern search over one entity type.
#[derive(Debug, Clone)]
pub struct SearchQuery<S: SortKey> {
    /// Empty means "everything".
    pub pattern: String,
    pub sort_by: S,
    pub sort_order: SortOrder,
    pub page: Page,
}

impl<S: SortKey> SearchQuery<S> {
    pub fn new(pattern: impl Into<String>, sort_by: S, sort_order: SortOrder, page: Page) -> Self {
        Self {
            pattern: pattern.into(),
            sort_by,
            sort_order,
            page,
        }
    }

    /// Everything, default sort, default page.
    pub fn all() -> Self {
        Self::new("", S::DEFAULT, SortOrder::Descending, Page::default())
    }

    /// `ORDER BY` clause built only from whitelisted columns, ending on
    /// the primary key.
    pub fn order_clause(&self) -> String {
        let dir = self.sort_order.as_sql();
        format!(
            "{} {dir} NULLS LAST, {} {dir}",
            self.sort_by.column(),
            S::KEY_COLUMN
        )
    }
}
