//! Pool-collaborator boundaries and the sharded handle factory.
//!
//! The generic pool (borrow/return/evict mechanics) is an external
//! collaborator; this crate supplies only the factory it drives. The
//! factory connects every shard of the routing table, validates handles
//! with a per-shard liveness probe, and tears handles down best-effort.

use std::sync::Arc;

use async_trait::async_trait;
use shoal_core::PoolSettings;
use thiserror::Error;
use tracing::debug;

use crate::backend::{BackendError, ShardConnection, ShardConnector};
use crate::handle::ShardedHandle;
use crate::shard::{ShardRing, ShardSpec};

/// Result type for pool operations.
pub type PoolResult<T> = Result<T, PoolError>;

/// Errors surfaced by the pool and its collaborators.
#[derive(Debug, Error)]
pub enum PoolError {
    /// Bootstrap discovery failed; the pool never started.
    #[error("bootstrap discovery failed: {0}")]
    Bootstrap(#[from] shoal_sentinel::DiscoveryError),

    /// The configuration was rejected.
    #[error("invalid configuration: {0}")]
    Config(#[from] shoal_core::ConfigError),

    /// A shard connection could not be constructed.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// A routing update named a group outside the configured set.
    #[error("group {group} is not part of this pool")]
    UnknownGroup {
        /// The unconfigured group.
        group: shoal_core::GroupName,
    },

    /// The pool has been closed.
    #[error("pool is closed")]
    Closed,

    /// Every handle is in use.
    #[error("pool exhausted: all {max_size} handles in use")]
    Exhausted {
        /// Configured pool size.
        max_size: u32,
    },

    /// Failure reported by the external pool collaborator.
    #[error("pool collaborator failure: {message}")]
    Collaborator {
        /// What the collaborator reported.
        message: String,
    },
}

/// Factory contract the external pool drives.
#[async_trait]
pub trait PooledFactory<H: Send>: Send + Sync {
    /// Builds a fresh handle.
    ///
    /// # Errors
    /// Construction failures are fatal to the borrow that triggered them
    /// and propagate unswallowed.
    async fn construct(&self) -> PoolResult<H>;

    /// Tears a handle down. Best-effort; never fails.
    async fn destroy(&self, handle: H);

    /// Probes a handle before reuse; false evicts it.
    async fn validate(&self, handle: &mut H) -> bool;
}

/// Borrow/return boundary of the external pool collaborator.
#[async_trait]
pub trait HandlePool<H: Send>: Send + Sync {
    /// Borrows a handle; the caller owns it exclusively until returned.
    async fn borrow(&self) -> PoolResult<H>;

    /// Returns a handle for reuse.
    async fn give_back(&self, handle: H);

    /// Returns a handle known to be broken, for eviction.
    async fn give_back_broken(&self, handle: H);

    /// Closes the pool: destroys idle handles and destroys returned ones
    /// from now on instead of re-pooling them.
    async fn close(&self);
}

/// Builds pools from a factory plus sizing settings.
#[async_trait]
pub trait PoolDriver<H: Send>: Send + Sync {
    /// Builds one pool generation.
    ///
    /// # Errors
    /// A build failure aborts the rebuild that requested it; the caller
    /// keeps its previous generation.
    async fn build(
        &self,
        factory: Arc<dyn PooledFactory<H>>,
        settings: &PoolSettings,
    ) -> PoolResult<Arc<dyn HandlePool<H>>>;
}

/// Factory producing [`ShardedHandle`]s for one routing-table snapshot.
pub struct ShardedHandleFactory<C: ShardConnection> {
    specs: Vec<ShardSpec>,
    connector: Arc<dyn ShardConnector<Conn = C>>,
    ring: Arc<dyn ShardRing>,
}

impl<C: ShardConnection> ShardedHandleFactory<C> {
    /// Creates a factory over the given shard specs.
    #[must_use]
    pub fn new(
        specs: Vec<ShardSpec>,
        connector: Arc<dyn ShardConnector<Conn = C>>,
        ring: Arc<dyn ShardRing>,
    ) -> Self {
        Self {
            specs,
            connector,
            ring,
        }
    }

    /// The shard specs this factory connects.
    #[must_use]
    pub fn specs(&self) -> &[ShardSpec] {
        &self.specs
    }
}

#[async_trait]
impl<C: ShardConnection> PooledFactory<ShardedHandle<C>> for ShardedHandleFactory<C> {
    async fn construct(&self) -> PoolResult<ShardedHandle<C>> {
        let mut shards = Vec::with_capacity(self.specs.len());

        for spec in &self.specs {
            match self.connector.connect(spec).await {
                Ok(conn) => shards.push((spec.group.clone(), conn)),
                Err(err) => {
                    // Connections opened so far belong to nobody; close
                    // them before propagating.
                    for (_, mut conn) in shards.drain(..) {
                        let _ = conn.quit().await;
                        let _ = conn.close().await;
                    }
                    return Err(err.into());
                }
            }
        }

        Ok(ShardedHandle::new(shards, Arc::clone(&self.ring)))
    }

    async fn destroy(&self, handle: ShardedHandle<C>) {
        for (group, mut conn) in handle.into_shards() {
            // Teardown of a doomed connection is best-effort.
            if let Err(err) = conn.quit().await {
                debug!(group = %group, error = %err, "quit failed during teardown");
            }
            if let Err(err) = conn.close().await {
                debug!(group = %group, error = %err, "close failed during teardown");
            }
        }
    }

    async fn validate(&self, handle: &mut ShardedHandle<C>) -> bool {
        // The handle is shard-aggregate: one unreachable shard poisons
        // the whole handle.
        for (group, conn) in handle.shards_mut() {
            if let Err(err) = conn.ping().await {
                debug!(group = %group, error = %err, "shard failed liveness probe");
                return false;
            }
        }
        true
    }
}
