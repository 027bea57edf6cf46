//! Binding of the codec to a host's current URL and navigation primitive.
//!
//! The hook reads the host's query string, re-parses it only when it changed
//! since the last read, and turns every mutator call into one
//! history-replacing navigation. It does not batch: two mutator calls are two
//! navigations, and each reads the URL the previous one left behind. Use
//! [`QueryStateHook::set_multiple`] to change several fields at once.

use core::fmt;
use std::cell::{Ref, RefCell};
use std::convert::Infallible;

use super::codec::{QueryCodec, QueryOptions, QueryPairs};
use super::filters::{FilterMap, FilterPatch};
use super::patch::QueryPatch;
use super::state::{DEFAULT_PAGE_SIZE, QueryState, SortOrder};

/// Host primitives for reading and replacing the current URL.
pub trait Navigator {
    /// Error raised by the host when navigation fails.
    type Error;

    /// Path of the current location, without the query string.
    fn path(&self) -> String;

    /// Query string of the current location, without the leading `?`.
    fn query(&self) -> String;

    /// Navigate to `path?query`, replacing the current history entry.
    ///
    /// # Errors
    ///
    /// Returns the host's navigation error.
    fn replace(&mut self, path: &str, query: &str) -> Result<(), Self::Error>;
}

/// A path plus query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    pub path: String,
    pub query: String,
}

impl Location {
    /// Split `path?query` (a fragment, if any, is dropped).
    #[must_use]
    pub fn parse(url: &str) -> Self {
        let url = url.split_once('#').map_or(url, |(before, _)| before);
        match url.split_once('?') {
            Some((path, query)) => Self {
                path: path.to_string(),
                query: query.to_string(),
            },
            None => Self {
                path: url.to_string(),
                query: String::new(),
            },
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.query.is_empty() {
            f.write_str(&self.path)
        } else {
            write!(f, "{}?{}", self.path, self.query)
        }
    }
}

/// In-memory history stack.
///
/// Used server-side to replay mutations against a request URL, and in tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryNavigator {
    entries: Vec<Location>,
}

impl MemoryNavigator {
    /// A history with a single entry at `url`.
    #[must_use]
    pub fn new(url: &str) -> Self {
        Self {
            entries: vec![Location::parse(url)],
        }
    }

    /// Push a new entry, as a link click or back/forward move would.
    pub fn push(&mut self, url: &str) {
        self.entries.push(Location::parse(url));
    }

    /// The current entry.
    #[must_use]
    pub fn location(&self) -> Location {
        self.entries.last().cloned().unwrap_or_default()
    }

    /// Number of history entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Navigator for MemoryNavigator {
    type Error = Infallible;

    fn path(&self) -> String {
        self.entries
            .last()
            .map(|l| l.path.clone())
            .unwrap_or_default()
    }

    fn query(&self) -> String {
        self.entries
            .last()
            .map(|l| l.query.clone())
            .unwrap_or_default()
    }

    fn replace(&mut self, path: &str, query: &str) -> Result<(), Self::Error> {
        let next = Location {
            path: path.to_string(),
            query: query.to_string(),
        };
        match self.entries.last_mut() {
            Some(current) => *current = next,
            None => self.entries.push(next),
        }
        Ok(())
    }
}

/// Last parsed query string and the state derived from it.
#[derive(Debug)]
struct Snapshot {
    query: String,
    state: QueryState,
}

/// URL-backed list-view state for one instance.
#[derive(Debug)]
pub struct QueryStateHook<N: Navigator> {
    navigator: N,
    codec: QueryCodec,
    defaults: QueryPatch,
    snapshot: RefCell<Snapshot>,
}

impl<N: Navigator> QueryStateHook<N> {
    /// Bind to `navigator`. `defaults` and `options` are fixed for the
    /// hook's lifetime.
    pub fn new(navigator: N, defaults: QueryPatch, options: &QueryOptions) -> Self {
        let codec = QueryCodec::new(options);
        let query = navigator.query();
        let state = codec.decode(&QueryPairs::parse(&query), &defaults);
        Self {
            navigator,
            codec,
            defaults,
            snapshot: RefCell::new(Snapshot { query, state }),
        }
    }

    /// Bind with the list-view defaults (`order = asc`, `page_size = 8`) and
    /// no prefix.
    pub fn with_navigator(navigator: N) -> Self {
        let defaults = QueryPatch::new()
            .order(SortOrder::Asc)
            .page_size(DEFAULT_PAGE_SIZE);
        Self::new(navigator, defaults, &QueryOptions::new())
    }

    /// The current state, re-parsed if the host's URL changed.
    pub fn state(&self) -> Ref<'_, QueryState> {
        let query = self.navigator.query();
        if self.snapshot.borrow().query != query {
            let state = self
                .codec
                .decode(&QueryPairs::parse(&query), &self.defaults);
            *self.snapshot.borrow_mut() = Snapshot { query, state };
        }
        Ref::map(self.snapshot.borrow(), |s| &s.state)
    }

    pub fn page(&self) -> u32 {
        self.state().page
    }

    pub fn page_size(&self) -> u32 {
        self.state().page_size
    }

    pub fn order_by(&self) -> String {
        self.state().order_by.clone()
    }

    pub fn order(&self) -> SortOrder {
        self.state().order
    }

    pub fn keyword(&self) -> String {
        self.state().keyword.clone()
    }

    pub fn tab(&self) -> String {
        self.state().tab.clone()
    }

    pub fn filters(&self) -> FilterMap {
        self.state().filters.clone()
    }

    pub fn quick_filters(&self) -> FilterMap {
        self.state().quick_filters.clone()
    }

    /// Go to `page`. The only mutator that keeps the page position.
    ///
    /// # Errors
    ///
    /// Returns the host's navigation error.
    pub fn set_page(&mut self, page: u32) -> Result<(), N::Error> {
        self.apply(&QueryPatch::new().page(page))
    }

    /// Change the page size and go back to page 1.
    ///
    /// # Errors
    ///
    /// Returns the host's navigation error.
    pub fn set_page_size(&mut self, page_size: u32) -> Result<(), N::Error> {
        self.apply(&QueryPatch::new().page_size(page_size).page(1))
    }

    /// Change the sort direction and go back to page 1.
    ///
    /// # Errors
    ///
    /// Returns the host's navigation error.
    pub fn set_order(&mut self, order: SortOrder) -> Result<(), N::Error> {
        self.apply(&QueryPatch::new().order(order).page(1))
    }

    /// Change the sort field and go back to page 1.
    ///
    /// # Errors
    ///
    /// Returns the host's navigation error.
    pub fn set_order_by(&mut self, order_by: impl Into<String>) -> Result<(), N::Error> {
        self.apply(&QueryPatch::new().order_by(order_by).page(1))
    }

    /// Merge `filters` key-wise and go back to page 1.
    ///
    /// # Errors
    ///
    /// Returns the host's navigation error.
    pub fn set_filters(&mut self, filters: FilterPatch) -> Result<(), N::Error> {
        let patch = QueryPatch {
            filters,
            ..QueryPatch::new().page(1)
        };
        self.apply(&patch)
    }

    /// Merge `quick_filters` key-wise and go back to page 1.
    ///
    /// # Errors
    ///
    /// Returns the host's navigation error.
    pub fn set_quick_filters(&mut self, quick_filters: FilterPatch) -> Result<(), N::Error> {
        let patch = QueryPatch {
            quick_filters,
            ..QueryPatch::new().page(1)
        };
        self.apply(&patch)
    }

    /// Change the search keyword and go back to page 1.
    ///
    /// # Errors
    ///
    /// Returns the host's navigation error.
    pub fn set_keyword(&mut self, keyword: impl Into<String>) -> Result<(), N::Error> {
        self.apply(&QueryPatch::new().keyword(keyword).page(1))
    }

    /// Switch tab and go back to page 1.
    ///
    /// # Errors
    ///
    /// Returns the host's navigation error.
    pub fn set_tab(&mut self, tab: impl Into<String>) -> Result<(), N::Error> {
        self.apply(&QueryPatch::new().tab(tab).page(1))
    }

    /// Apply several changes in one navigation.
    ///
    /// The page goes back to 1 unless `patch` names a positive page itself.
    ///
    /// # Errors
    ///
    /// Returns the host's navigation error.
    pub fn set_multiple(&mut self, mut patch: QueryPatch) -> Result<(), N::Error> {
        patch.page = Some(patch.page.filter(|p| *p > 0).unwrap_or(1));
        self.apply(&patch)
    }

    /// Replace every key of this instance with the encoded defaults
    /// (`page=1&limit=8&order=asc` plus the hook's own defaults, default
    /// filters included). Other parameters are left in place.
    ///
    /// # Errors
    ///
    /// Returns the host's navigation error.
    pub fn reset(&mut self) -> Result<(), N::Error> {
        let state = self.codec.decode(&QueryPairs::new(), &self.defaults);
        self.navigate(&state)
    }

    /// The bound navigator.
    pub const fn navigator(&self) -> &N {
        &self.navigator
    }

    /// Mutable access to the bound navigator, for host-driven navigation.
    pub const fn navigator_mut(&mut self) -> &mut N {
        &mut self.navigator
    }

    /// Unbind and return the navigator.
    pub fn into_navigator(self) -> N {
        self.navigator
    }

    fn apply(&mut self, patch: &QueryPatch) -> Result<(), N::Error> {
        let merged = self.state().merged(patch);
        self.navigate(&merged)
    }

    /// Replace this instance's keys in the current URL with `state`.
    ///
    /// Parameters owned by other instances or by the host are kept in place.
    fn navigate(&mut self, state: &QueryState) -> Result<(), N::Error> {
        let keys = self.codec.keys();
        let mut pairs = QueryPairs::parse(&self.navigator.query());
        pairs.retain(|key, _| !keys.owns(key));
        pairs.extend(self.codec.encode(state));

        let path = self.navigator.path();
        self.navigator.replace(&path, &pairs.to_query_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::query_state::FilterValue;

    fn hook(url: &str) -> QueryStateHook<MemoryNavigator> {
        QueryStateHook::with_navigator(MemoryNavigator::new(url))
    }

    fn current_query(hook: &QueryStateHook<MemoryNavigator>) -> QueryPairs {
        QueryPairs::parse(&hook.navigator().query())
    }

    #[test]
    fn test_reads_current_url() {
        let hook = hook("/app/products?page=3&limit=20&keyword=boots&filter_category=shoes");
        assert_eq!(hook.page(), 3);
        assert_eq!(hook.page_size(), 20);
        assert_eq!(hook.keyword(), "boots");
        assert_eq!(hook.order(), SortOrder::Asc);
        assert_eq!(
            hook.filters().get("category"),
            Some(&FilterValue::from("shoes"))
        );
    }

    #[test]
    fn test_reparses_after_external_navigation() {
        let mut hook = hook("/app?page=2");
        assert_eq!(hook.page(), 2);

        hook.navigator_mut().push("/app?page=4&keyword=hats");
        assert_eq!(hook.page(), 4);
        assert_eq!(hook.keyword(), "hats");
        assert_eq!(hook.navigator().len(), 2);
    }

    #[test]
    fn test_set_page_keeps_page() {
        let mut hook = hook("/app?page=5");
        hook.set_page(6).unwrap();
        assert_eq!(hook.page(), 6);
    }

    #[test]
    fn test_every_other_mutator_resets_page() {
        type Mutator = fn(&mut QueryStateHook<MemoryNavigator>);
        let mutators: [Mutator; 8] = [
            |h| h.set_page_size(20).unwrap(),
            |h| h.set_order(SortOrder::Desc).unwrap(),
            |h| h.set_order_by("title").unwrap(),
            |h| {
                let mut f = FilterPatch::new();
                f.insert("category".into(), Some("shoes".into()));
                h.set_filters(f).unwrap();
            },
            |h| {
                let mut f = FilterPatch::new();
                f.insert("inStock".into(), Some(true.into()));
                h.set_quick_filters(f).unwrap();
            },
            |h| h.set_keyword("boots").unwrap(),
            |h| h.set_tab("archived").unwrap(),
            |h| h.set_multiple(QueryPatch::new().keyword("x")).unwrap(),
        ];

        for mutate in mutators {
            let mut hook = hook("/app?page=5");
            assert_eq!(hook.page(), 5);
            mutate(&mut hook);
            assert_eq!(hook.page(), 1);
        }
    }

    #[test]
    fn test_set_multiple_honours_explicit_page() {
        let mut hook = hook("/app?page=5");
        hook.set_multiple(QueryPatch::new().page(3).tab("all")).unwrap();
        assert_eq!(hook.page(), 3);
        assert_eq!(hook.tab(), "all");
    }

    #[test]
    fn test_set_multiple_with_zero_page_resets_page() {
        let mut hook = hook("/app?page=5");
        hook.set_multiple(QueryPatch::new().page(0).keyword("boots")).unwrap();
        assert_eq!(hook.page(), 1);
        assert_eq!(hook.keyword(), "boots");
        assert_eq!(current_query(&hook).get("page"), Some("1"));
    }

    #[test]
    fn test_navigation_replaces_history_entry() {
        let mut hook = hook("/app/products?page=2");
        hook.set_keyword("boots").unwrap();
        hook.set_tab("archived").unwrap();

        let nav = hook.navigator();
        assert_eq!(nav.len(), 1);
        assert_eq!(nav.location().path, "/app/products");
    }

    #[test]
    fn test_mutations_merge_with_current_state() {
        let mut hook = hook("/app?orderBy=title&order=desc&filter_category=shoes");
        let mut f = FilterPatch::new();
        f.insert("brand".into(), Some("acme".into()));
        hook.set_filters(f).unwrap();

        assert_eq!(hook.order_by(), "title");
        assert_eq!(hook.order(), SortOrder::Desc);
        let filters = hook.filters();
        assert_eq!(filters.get("category"), Some(&"shoes".into()));
        assert_eq!(filters.get("brand"), Some(&"acme".into()));
    }

    #[test]
    fn test_clearing_filter_removes_key_from_url() {
        let mut hook = hook("/app?filter_category=shoes&filter_brand=acme");
        let mut f = FilterPatch::new();
        f.insert("brand".into(), None);
        hook.set_filters(f).unwrap();

        let query = current_query(&hook);
        assert!(!query.contains_key("filter_brand"));
        assert_eq!(query.get("filter_category"), Some("shoes"));
    }

    #[test]
    fn test_default_filter_survives_clearing() {
        let nav = MemoryNavigator::new("/app?filter_status=archived");
        let defaults = QueryPatch::new().filter("status", "active");
        let mut hook = QueryStateHook::new(nav, defaults, &QueryOptions::new());
        assert_eq!(hook.filters().get("status"), Some(&"archived".into()));

        let mut f = FilterPatch::new();
        f.insert("status".into(), None);
        hook.set_filters(f).unwrap();

        // The URL override is gone, so the default shows again.
        assert!(!current_query(&hook).contains_key("filter_status"));
        assert_eq!(hook.filters().get("status"), Some(&"active".into()));
    }

    #[test]
    fn test_empty_keyword_is_dropped_from_url() {
        let mut hook = hook("/app?keyword=boots");
        hook.set_keyword("   ").unwrap();
        assert!(!current_query(&hook).contains_key("keyword"));
        assert_eq!(hook.keyword(), "");
    }

    #[test]
    fn test_foreign_parameters_survive() {
        let nav = MemoryNavigator::new("/app?host=abc&shop=demo.myshopify.com&b_page=9");
        let mut hook = QueryStateHook::new(
            nav,
            QueryPatch::new(),
            &QueryOptions::with_prefix("a_"),
        );
        hook.set_keyword("boots").unwrap();

        let query = current_query(&hook);
        assert_eq!(query.get("host"), Some("abc"));
        assert_eq!(query.get("shop"), Some("demo.myshopify.com"));
        assert_eq!(query.get("b_page"), Some("9"));
        assert_eq!(query.get("a_keyword"), Some("boots"));
        assert_eq!(query.get("a_page"), Some("1"));
        assert!(!query.contains_key("keyword"));
    }

    #[test]
    fn test_reset_restores_defaults() {
        let nav = MemoryNavigator::new("/app?tab=brands&keyword=x&filter_a=1&host=abc");
        let defaults = QueryPatch::new().tab("products").order_by("name");
        let mut hook = QueryStateHook::new(nav, defaults, &QueryOptions::new());
        hook.reset().unwrap();

        assert_eq!(hook.tab(), "products");
        assert_eq!(hook.order_by(), "name");
        assert_eq!(hook.keyword(), "");
        assert!(hook.filters().is_empty());
        let query = current_query(&hook);
        assert_eq!(query.get("host"), Some("abc"));
        assert_eq!(
            query.to_query_string(),
            "host=abc&page=1&limit=8&orderBy=name&order=asc&tab=products"
        );
    }

    #[test]
    fn test_location_parse_and_display() {
        let loc = Location::parse("/app/products?page=2#top");
        assert_eq!(loc.path, "/app/products");
        assert_eq!(loc.query, "page=2");
        assert_eq!(loc.to_string(), "/app/products?page=2");
        assert_eq!(Location::parse("/app").to_string(), "/app");
    }
}
