//! Embedded Admin Core - query-state codec and shared types.
//!
//! This crate provides the pieces of the embedded admin that need no I/O:
//! - [`query_state`] - bidirectional mapping between list-view state
//!   (pagination, sorting, search, tabs, filters) and URL query parameters
//! - [`types`] - validated newtypes for webhook ingestion (shop domains, topics)
//!
//! # Architecture
//!
//! Nothing in here touches the network, a clock or a database. The admin
//! server binds these types to HTTP; a browser host binds the query-state
//! hook to its location and history primitives through [`query_state::Navigator`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod query_state;
pub mod types;

pub use query_state::{
    FilterMap, FilterPatch, FilterValue, MemoryNavigator, Navigator, QueryCodec, QueryOptions,
    QueryPairs, QueryPatch, QueryState, QueryStateHook, SortOrder,
};
pub use types::*;
