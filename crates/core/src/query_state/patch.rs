//! Partial state updates and the merge rules applied to them.
//!
//! A [`QueryPatch`] serves two roles: the caller's initial defaults handed to
//! the codec, and the update passed to a hook mutator.
//!
//! Merge rules:
//! - scalars: a value present in the patch replaces the current one; a zero
//!   `page`/`page_size` is ignored so both stay positive
//! - `filters`/`quick_filters`: key-wise; `Some` overrides that key, `None`
//!   removes it, keys the patch does not mention are kept

use serde::{Deserialize, Serialize};

use super::filters::{FilterMap, FilterPatch, FilterValue};
use super::state::{QueryState, SortOrder};

/// A partial [`QueryState`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<SortOrder>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tab: Option<String>,
    #[serde(skip_serializing_if = "FilterPatch::is_empty")]
    pub filters: FilterPatch,
    #[serde(skip_serializing_if = "FilterPatch::is_empty")]
    pub quick_filters: FilterPatch,
}

impl QueryPatch {
    /// An empty patch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    #[must_use]
    pub const fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    #[must_use]
    pub fn order_by(mut self, order_by: impl Into<String>) -> Self {
        self.order_by = Some(order_by.into());
        self
    }

    #[must_use]
    pub const fn order(mut self, order: SortOrder) -> Self {
        self.order = Some(order);
        self
    }

    #[must_use]
    pub fn keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = Some(keyword.into());
        self
    }

    #[must_use]
    pub fn tab(mut self, tab: impl Into<String>) -> Self {
        self.tab = Some(tab.into());
        self
    }

    /// Set one structured filter.
    #[must_use]
    pub fn filter(mut self, key: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.filters.insert(key.into(), Some(value.into()));
        self
    }

    /// Remove one structured filter.
    #[must_use]
    pub fn clear_filter(mut self, key: impl Into<String>) -> Self {
        self.filters.insert(key.into(), None);
        self
    }

    /// Set one quick filter.
    #[must_use]
    pub fn quick_filter(mut self, key: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.quick_filters.insert(key.into(), Some(value.into()));
        self
    }

    /// Remove one quick filter.
    #[must_use]
    pub fn clear_quick_filter(mut self, key: impl Into<String>) -> Self {
        self.quick_filters.insert(key.into(), None);
        self
    }

    /// Whether applying this patch would change nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Builds the patch that would reproduce `state` exactly when merged over
    /// an empty state.
    #[must_use]
    pub fn from_state(state: &QueryState) -> Self {
        let lift = |map: &FilterMap| -> FilterPatch {
            map.iter()
                .map(|(k, v)| (k.clone(), Some(v.clone())))
                .collect()
        };
        Self {
            page: Some(state.page),
            page_size: Some(state.page_size),
            order_by: Some(state.order_by.clone()),
            order: Some(state.order),
            keyword: Some(state.keyword.clone()),
            tab: Some(state.tab.clone()),
            filters: lift(&state.filters),
            quick_filters: lift(&state.quick_filters),
        }
    }
}

/// Apply `patch` over `base`, key-wise.
///
/// `None` removes the key. A removed key that has a caller default comes
/// back on the next decode; defaults can be overridden, not cleared.
pub fn merge_filters(base: &mut FilterMap, patch: &FilterPatch) {
    for (key, value) in patch {
        match value {
            Some(v) => {
                base.insert(key.clone(), v.clone());
            }
            None => {
                base.remove(key);
            }
        }
    }
}

impl QueryState {
    /// Returns a new state with `patch` merged over `self`.
    #[must_use]
    pub fn merged(&self, patch: &QueryPatch) -> Self {
        let mut next = self.clone();
        if let Some(page) = patch.page.filter(|p| *p > 0) {
            next.page = page;
        }
        if let Some(page_size) = patch.page_size.filter(|p| *p > 0) {
            next.page_size = page_size;
        }
        if let Some(order_by) = &patch.order_by {
            next.order_by.clone_from(order_by);
        }
        if let Some(order) = patch.order {
            next.order = order;
        }
        if let Some(keyword) = &patch.keyword {
            next.keyword.clone_from(keyword);
        }
        if let Some(tab) = &patch.tab {
            next.tab.clone_from(tab);
        }
        merge_filters(&mut next.filters, &patch.filters);
        merge_filters(&mut next.quick_filters, &patch.quick_filters);
        next
    }
}
