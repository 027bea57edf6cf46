//! Parse query parameters into a [`QueryState`] and serialize it back.
//!
//! Parsing never fails. Anything missing, blank or malformed on the URL
//! resolves to the caller's default for that field, then to the built-in
//! default, so a hand-edited URL renders the default view instead of an error.

use core::fmt;

use url::{Url, form_urlencoded};

use super::fields::{FIELDS, Field, FieldKind, QueryKeys};
use super::filters::{self, FilterMap, FilterValue};
use super::patch::{QueryPatch, merge_filters};
use super::state::{DEFAULT_PAGE, DEFAULT_PAGE_SIZE, QueryState};

/// Base used to resolve relative request URLs such as `/app/products?page=2`.
const DUMMY_BASE: &str = "http://dummy.local";

/// Ordered query-string key/value pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryPairs(Vec<(String, String)>);

impl QueryPairs {
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Decode an `application/x-www-form-urlencoded` query string.
    ///
    /// A leading `?` is ignored.
    #[must_use]
    pub fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect()
    }

    /// Extract the query pairs of an absolute or path-relative URL.
    #[must_use]
    pub fn from_url(url: &str) -> Self {
        let base = Url::parse(DUMMY_BASE).ok();
        match Url::options().base_url(base.as_ref()).parse(url) {
            Ok(parsed) => parsed.query_pairs().into_owned().collect(),
            Err(_) => url
                .split_once('?')
                .map_or_else(Self::new, |(_, query)| Self::parse(query)),
        }
    }

    /// First value recorded for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Whether any pair has `key`.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.iter().any(|(k, _)| k == key)
    }

    /// Append a pair.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.push((key.into(), value.into()));
    }

    /// Iterate over pairs as string slices.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Keep only pairs for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(&str, &str) -> bool) {
        self.0.retain(|(k, v)| keep(k, v));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Encode as a query string without the leading `?`.
    #[must_use]
    pub fn to_query_string(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.iter())
            .finish()
    }
}

impl fmt::Display for QueryPairs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_query_string())
    }
}

impl FromIterator<(String, String)> for QueryPairs {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<(String, String)> for QueryPairs {
    fn extend<T: IntoIterator<Item = (String, String)>>(&mut self, iter: T) {
        self.0.extend(iter);
    }
}

impl IntoIterator for QueryPairs {
    type Item = (String, String);
    type IntoIter = std::vec::IntoIter<(String, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Options for one state instance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOptions {
    /// Prepended to every key so several instances can share a URL.
    pub prefix: String,
}

impl QueryOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Options with the given key prefix (surrounding whitespace is trimmed).
    #[must_use]
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into().trim().to_string(),
        }
    }
}

/// Codec bound to one instance's resolved keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryCodec {
    keys: QueryKeys,
}

impl QueryCodec {
    #[must_use]
    pub fn new(options: &QueryOptions) -> Self {
        Self {
            keys: QueryKeys::new(&options.prefix),
        }
    }

    /// The resolved keys of this instance.
    #[must_use]
    pub const fn keys(&self) -> &QueryKeys {
        &self.keys
    }

    /// Build a fully populated state from `source`.
    ///
    /// Precedence per field: URL value, then `defaults`, then the built-in
    /// default. Filter maps merge key-wise: a default filter survives unless
    /// the URL carries the same key.
    #[must_use]
    pub fn decode(&self, source: &QueryPairs, defaults: &QueryPatch) -> QueryState {
        let raw = |field: Field| source.get(self.keys.key(field));
        let text = |field: Field, fallback: Option<&str>| -> String {
            raw(field)
                .filter(|v| !v.trim().is_empty())
                .or(fallback)
                .unwrap_or_default()
                .to_string()
        };

        let mut filters = FilterMap::new();
        merge_filters(&mut filters, &defaults.filters);
        overlay(&mut filters, source, self.keys.filter_prefix());

        let mut quick_filters = FilterMap::new();
        merge_filters(&mut quick_filters, &defaults.quick_filters);
        overlay(&mut quick_filters, source, self.keys.quick_prefix());

        QueryState {
            page: positive(raw(Field::Page))
                .or_else(|| defaults.page.filter(|p| *p > 0))
                .unwrap_or(DEFAULT_PAGE),
            page_size: positive(raw(Field::PageSize))
                .or_else(|| defaults.page_size.filter(|p| *p > 0))
                .unwrap_or(DEFAULT_PAGE_SIZE),
            order_by: text(Field::OrderBy, defaults.order_by.as_deref()),
            order: raw(Field::Order)
                .and_then(|v| v.parse().ok())
                .or(defaults.order)
                .unwrap_or_default(),
            keyword: text(Field::Keyword, defaults.keyword.as_deref()),
            tab: text(Field::Tab, defaults.tab.as_deref()),
            filters,
            quick_filters,
        }
    }

    /// Serialize `state` into query pairs.
    ///
    /// Output order: `page`, `limit`, `orderBy`, `order`, `keyword`, `tab`,
    /// then filters and quick filters, each in key order. Blank strings and
    /// empty filter values are omitted.
    #[must_use]
    pub fn encode(&self, state: &QueryState) -> QueryPairs {
        let mut pairs = QueryPairs::new();

        for descriptor in FIELDS {
            let value = match descriptor.field {
                Field::Page => state.page.to_string(),
                Field::PageSize => state.page_size.to_string(),
                Field::OrderBy => state.order_by.clone(),
                Field::Order => state.order.to_string(),
                Field::Keyword => state.keyword.clone(),
                Field::Tab => state.tab.clone(),
            };
            if descriptor.kind == FieldKind::Text && value.trim().is_empty() {
                continue;
            }
            pairs.push(self.keys.key(descriptor.field), value);
        }

        pairs.extend(filters::flatten(&state.filters, self.keys.filter_prefix()));
        pairs.extend(filters::flatten(
            &state.quick_filters,
            self.keys.quick_prefix(),
        ));
        pairs
    }
}

fn positive(raw: Option<&str>) -> Option<u32> {
    raw.and_then(|v| v.trim().parse::<u32>().ok())
        .filter(|n| *n > 0)
}

fn overlay(target: &mut FilterMap, source: &QueryPairs, prefix: &str) {
    for (name, value) in filters::unflatten(source.iter(), prefix) {
        target.insert(name, FilterValue::Text(value));
    }
}

/// Parse `source` into a fully populated state.
///
/// See [`QueryCodec::decode`].
#[must_use]
pub fn parse(source: &QueryPairs, options: &QueryOptions, defaults: &QueryPatch) -> QueryState {
    QueryCodec::new(options).decode(source, defaults)
}

/// Serialize `state` into query pairs.
///
/// See [`QueryCodec::encode`].
#[must_use]
pub fn serialize(state: &QueryState, options: &QueryOptions) -> QueryPairs {
    QueryCodec::new(options).encode(state)
}
