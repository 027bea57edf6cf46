//! Filter values and the flatten/unflatten conversions.
//!
//! Filters travel as one query parameter per field (`filter_category=shoes`).
//! Values are stringified on the way out and come back as raw text; callers
//! interpret them with [`FilterValue::as_bool`] and [`FilterValue::as_f64`].

use core::fmt;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single scalar filter value.
///
/// Equality compares the wire form, so `Number(1.0)` equals `Text("1")`:
/// both put `1` on the URL and a parsed URL cannot tell them apart.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

/// Filter fields keyed by name.
pub type FilterMap = BTreeMap<String, FilterValue>;

/// Key-wise filter update: `Some` sets a key, `None` removes it.
pub type FilterPatch = BTreeMap<String, Option<FilterValue>>;

impl FilterValue {
    /// Stringify for the query string.
    ///
    /// Numbers use their shortest decimal form (`1`, `2.5`), booleans
    /// `true`/`false`, text is passed through.
    #[must_use]
    pub fn to_wire(&self) -> String {
        match self {
            Self::Bool(b) => b.to_string(),
            Self::Number(n) => format_number(*n),
            Self::Text(s) => s.clone(),
        }
    }

    /// Whether this value is omitted from the query string.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Text(s) if s.is_empty())
    }

    /// Returns the value as text, if it is text.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Interpret the value as a boolean (`true`/`false` text is accepted).
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Text(s) => s.trim().parse().ok(),
            Self::Number(_) => None,
        }
    }

    /// Interpret the value as a number (decimal text is accepted).
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
            Self::Bool(_) => None,
        }
    }
}

fn format_number(n: f64) -> String {
    if n == 0.0 {
        // -0 prints as "-0"
        "0".to_string()
    } else if n.is_infinite() {
        let sign = if n > 0.0 { "" } else { "-" };
        format!("{sign}Infinity")
    } else {
        n.to_string()
    }
}

impl PartialEq for FilterValue {
    fn eq(&self, other: &Self) -> bool {
        self.to_wire() == other.to_wire()
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wire())
    }
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<bool> for FilterValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for FilterValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i32> for FilterValue {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<u32> for FilterValue {
    fn from(n: u32) -> Self {
        Self::Number(f64::from(n))
    }
}

/// Convert filters into prefixed `(key, value)` pairs.
///
/// Empty text values are dropped. Pairs come out in key order.
#[must_use]
pub fn flatten(filters: &FilterMap, prefix: &str) -> Vec<(String, String)> {
    filters
        .iter()
        .filter(|(_, v)| !v.is_empty())
        .map(|(k, v)| (format!("{prefix}{k}"), v.to_wire()))
        .collect()
}

/// Select the pairs whose key starts with `prefix` and strip it.
///
/// Values stay raw strings. The first occurrence of a repeated key wins, and
/// a key that is exactly the prefix (no field name) is skipped.
pub fn unflatten<'a, I>(pairs: I, prefix: &str) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut out = BTreeMap::new();
    for (key, value) in pairs {
        if let Some(name) = key.strip_prefix(prefix)
            && !name.is_empty()
        {
            out.entry(name.to_string())
                .or_insert_with(|| value.to_string());
        }
    }
    out
}
