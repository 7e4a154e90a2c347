//! Shoal Pool - failover-aware sharded connection pool.
//!
//! The pool fronts a set of named primary/replica groups. Keys route
//! deterministically to groups via a pluggable shard ring anchored on
//! group names, so a primary failover moves where a group's connections
//! point without reshuffling key placement. Sentinel announcements feed
//! the pool manager, which atomically rebuilds the pool whenever the
//! routing table genuinely changes.
//!
//! # Design
//!
//! - **One exclusion point**: the active (table, pool) generation lives
//!   behind a single async mutex; rebuilds are serialized and no-op
//!   proposals exit cheaply.
//! - **Generations**: borrowed handles stay bound to the generation that
//!   lent them and drain back into it even after it is superseded.
//! - **Collaborator boundaries**: backend connections, generic pool
//!   mechanics and ring arithmetic are traits; this crate supplies the
//!   factory and the glue.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod backend;
mod factory;
mod handle;
mod manager;
mod shard;

pub use backend::{BackendError, BackendResult, ShardConnection, ShardConnector};
pub use factory::{
    HandlePool, PoolDriver, PoolError, PoolResult, PooledFactory, ShardedHandleFactory,
};
pub use handle::ShardedHandle;
pub use manager::{PooledHandle, ShardedSentinelPool};
pub use shard::{shard_specs, RendezvousSelector, ShardRing, ShardSelector, ShardSpec};
