//! The list-view state carried in the URL.

use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::filters::FilterMap;

/// Default page when the URL and the caller's defaults have none.
pub const DEFAULT_PAGE: u32 = 1;

/// Default page size when the URL and the caller's defaults have none.
pub const DEFAULT_PAGE_SIZE: u32 = 8;

/// Error returned when a sort direction is not `asc` or `desc`.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown sort order: {0}")]
pub struct SortOrderError(pub String);

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    /// Returns the wire form (`asc`/`desc`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    /// Returns the opposite direction.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = SortOrderError;

    /// Parses `asc`/`desc`, ignoring case and surrounding whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("asc") {
            Ok(Self::Asc)
        } else if s.eq_ignore_ascii_case("desc") {
            Ok(Self::Desc)
        } else {
            Err(SortOrderError(s.to_string()))
        }
    }
}

/// Fully populated list-view state.
///
/// Produced by [`QueryCodec::decode`](super::QueryCodec::decode); every field
/// holds either the URL's value or a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryState {
    /// 1-based page index.
    pub page: u32,
    /// Items per page (`limit` on the wire).
    pub page_size: u32,
    /// Sort field name.
    pub order_by: String,
    /// Sort direction.
    pub order: SortOrder,
    /// Free-text search.
    pub keyword: String,
    /// Active tab identifier.
    pub tab: String,
    /// Structured filters (`filter_*`).
    pub filters: FilterMap,
    /// Quick filters (`quick_*`).
    pub quick_filters: FilterMap,
}

impl Default for QueryState {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
            order_by: String::new(),
            order: SortOrder::Asc,
            keyword: String::new(),
            tab: String::new(),
            filters: FilterMap::new(),
            quick_filters: FilterMap::new(),
        }
    }
}
