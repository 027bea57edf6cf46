//! URL query-string state for list views.
//!
//! Maps pagination, sorting, search, tab and filter state to query
//! parameters and back:
//!
//! ```text
//! page=2&limit=8&orderBy=title&order=desc&keyword=boots&tab=all
//!     &filter_category=shoes&quick_inStock=true
//! ```
//!
//! An optional per-instance prefix (`a_page`, `a_filter_category`, ...) lets
//! several independent lists share one URL.
//!
//! # Example
//!
//! ```
//! use embedded_admin_core::query_state::{
//!     MemoryNavigator, QueryOptions, QueryPatch, QueryStateHook, SortOrder,
//! };
//!
//! let nav = MemoryNavigator::new("/app/products?page=3&filter_category=shoes");
//! let defaults = QueryPatch::new().tab("products").order_by("name");
//! let mut hook = QueryStateHook::new(nav, defaults, &QueryOptions::new());
//!
//! assert_eq!(hook.page(), 3);
//! assert_eq!(hook.tab(), "products");
//!
//! hook.set_order(SortOrder::Desc).unwrap();
//! assert_eq!(hook.page(), 1);
//! assert_eq!(
//!     hook.navigator().location().to_string(),
//!     "/app/products?page=1&limit=8&orderBy=name&order=desc&tab=products&filter_category=shoes"
//! );
//! ```

pub mod codec;
pub mod fields;
pub mod filters;
pub mod hook;
pub mod patch;
pub mod state;

pub use codec::{QueryCodec, QueryOptions, QueryPairs, parse, serialize};
pub use fields::{FIELDS, Field, FieldDescriptor, FieldKind, QueryKeys};
pub use filters::{FilterMap, FilterPatch, FilterValue, flatten, unflatten};
pub use hook::{Location, MemoryNavigator, Navigator, QueryStateHook};
pub use patch::QueryPatch;
pub use state::{DEFAULT_PAGE, DEFAULT_PAGE_SIZE, QueryState, SortOrder, SortOrderError};
