//! Shoal Sentinel - primary discovery and switch-event listeners.
//!
//! This crate owns the notification-source side of the pool: the
//! connector boundary for talking to sentinels, bootstrap discovery of
//! the initial routing table, and the long-lived listener task that
//! feeds primary-switch events into the pool manager.
//!
//! # Design
//!
//! - **Connector boundary**: wire I/O lives behind [`SentinelConnector`];
//!   this crate never opens sockets itself.
//! - **Distinguishable failures**: "source unreachable" and "source
//!   reachable but group unmonitored" stay separate from bootstrap
//!   through to the final error.
//! - **Cooperative shutdown**: each listener owns its subscription and
//!   exits on cancellation; nothing touches the connection from another
//!   task.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod client;
mod discover;
mod event;
mod listener;

pub use client::{SentinelConnector, SentinelError, SentinelResult, SwitchSubscription, SWITCH_CHANNEL};
pub use discover::{discover_routing_table, DiscoveryError, DiscoveryPolicy, DiscoveryResult};
pub use event::{EventParseError, SwitchEvent};
pub use listener::{RouteUpdateSink, SwitchListener, UpdateError, UpdateOutcome};
