//! Shoal Core - Data model and configuration for the Shoal sharded pool.
//!
//! This crate holds the value types shared by the sentinel and pool crates:
//! group names, endpoints, the routing table, and pool configuration. It
//! performs no I/O.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod config;
mod table;
mod types;

pub use config::{
    ConfigError, PoolConfig, PoolSettings, BACKEND_TIMEOUT_DEFAULT, DISCOVERY_BACKOFF_DEFAULT,
    DISCOVERY_PASSES_DEFAULT, POOL_MAX_SIZE_DEFAULT, SUBSCRIBE_RETRY_WAIT_DEFAULT,
};
pub use table::RoutingTable;
pub use types::{Endpoint, EndpointParseError, GroupName};
