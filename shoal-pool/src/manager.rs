//! Pool manager: bootstrap, serialized rebuilds and generation lifecycle.
//!
//! The manager owns the active (routing table, pool) generation behind a
//! single async mutex. Listeners propose single-entry updates; the
//! manager merges each into a copy of the active table, compares, and
//! only rebuilds when the endpoint sequence genuinely changed. Borrowers
//! are bound to the generation current at borrow time and drain back
//! into it even after it is superseded.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use async_trait::async_trait;
use shoal_core::{Endpoint, GroupName, PoolConfig, RoutingTable};
use shoal_sentinel::{
    discover_routing_table, DiscoveryPolicy, RouteUpdateSink, SentinelConnector, SwitchListener,
    UpdateError, UpdateOutcome,
};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::backend::{ShardConnection, ShardConnector};
use crate::factory::{HandlePool, PoolDriver, PoolError, PoolResult, PooledFactory, ShardedHandleFactory};
use crate::handle::ShardedHandle;
use crate::shard::{shard_specs, ShardRing, ShardSelector};

/// One immutable (routing table, pool) snapshot.
struct Generation<C: ShardConnection> {
    table: RoutingTable,
    pool: Arc<dyn HandlePool<ShardedHandle<C>>>,
    version: u64,
}

/// Shared state behind the manager and its listeners.
struct PoolCore<C: ShardConnection> {
    config: PoolConfig,
    backend: Arc<dyn ShardConnector<Conn = C>>,
    driver: Arc<dyn PoolDriver<ShardedHandle<C>>>,
    ring: Arc<dyn ShardRing>,
    active: Mutex<Generation<C>>,
}

/// A borrowed sharded handle, bound to the generation that lent it.
pub struct PooledHandle<C: ShardConnection> {
    handle: ShardedHandle<C>,
    source: Arc<dyn HandlePool<ShardedHandle<C>>>,
    generation: u64,
}

impl<C: ShardConnection> PooledHandle<C> {
    /// The generation this handle was borrowed from.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }
}

impl<C: ShardConnection> Deref for PooledHandle<C> {
    type Target = ShardedHandle<C>;

    fn deref(&self) -> &Self::Target {
        &self.handle
    }
}

impl<C: ShardConnection> DerefMut for PooledHandle<C> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.handle
    }
}

/// Sharded connection pool that follows sentinel failover announcements.
///
/// Construction bootstraps the routing table from the sentinels, builds
/// generation 1, and starts one switch listener per sentinel. From then
/// on the pool survives primary failovers without any caller-side
/// reconnection logic.
pub struct ShardedSentinelPool<C: ShardConnection> {
    core: Arc<PoolCore<C>>,
    listeners: Mutex<Vec<SwitchListener>>,
}

impl<C: ShardConnection> ShardedSentinelPool<C> {
    /// Bootstraps the pool and starts its listeners.
    ///
    /// # Errors
    /// Fails if the configuration is invalid, if discovery exhausts its
    /// retry ceiling for any group, or if the first pool generation
    /// cannot be built. No partially-started pool is ever returned.
    pub async fn connect(
        config: PoolConfig,
        sentinels: Arc<dyn SentinelConnector>,
        backend: Arc<dyn ShardConnector<Conn = C>>,
        driver: Arc<dyn PoolDriver<ShardedHandle<C>>>,
        selector: &dyn ShardSelector,
    ) -> PoolResult<Self> {
        config.validate()?;

        let policy = DiscoveryPolicy::new(config.discovery_passes, config.discovery_backoff);
        let table = discover_routing_table(
            sentinels.as_ref(),
            &config.sentinels,
            &config.groups,
            policy,
        )
        .await?;

        let ring = selector.build_ring(&config.groups);
        let pool = build_pool(&config, &backend, &driver, &ring, &table).await?;

        let core = Arc::new(PoolCore {
            config,
            backend,
            driver,
            ring,
            active: Mutex::new(Generation {
                table,
                pool,
                version: 1,
            }),
        });

        let listeners = core
            .config
            .sentinels
            .iter()
            .map(|sentinel| {
                SwitchListener::spawn(
                    Arc::clone(&sentinels),
                    sentinel.clone(),
                    core.config.groups.clone(),
                    Arc::clone(&core) as Arc<dyn RouteUpdateSink>,
                    core.config.subscribe_retry_wait,
                )
            })
            .collect();

        info!(
            sentinels = core.config.sentinels.len(),
            groups = core.config.groups.len(),
            "sharded sentinel pool started"
        );

        Ok(Self {
            core,
            listeners: Mutex::new(listeners),
        })
    }

    /// Borrows a handle from the current generation.
    ///
    /// A handle borrowed while a rebuild is in flight reflects whichever
    /// generation was current when the borrow was granted.
    ///
    /// # Errors
    /// Propagates borrow failures from the pool collaborator, including
    /// handle-construction failures.
    pub async fn acquire(&self) -> PoolResult<PooledHandle<C>> {
        let (source, generation) = {
            let active = self.core.active.lock().await;
            (Arc::clone(&active.pool), active.version)
        };

        let handle = source.borrow().await?;
        Ok(PooledHandle {
            handle,
            source,
            generation,
        })
    }

    /// Returns a handle to the generation it was borrowed from.
    ///
    /// If that generation has been superseded in the meantime, the pool
    /// it drains into is closed and destroys the handle instead of
    /// re-pooling it.
    pub async fn release(&self, handle: PooledHandle<C>) {
        handle.source.give_back(handle.handle).await;
    }

    /// Returns a known-broken handle for eviction rather than reuse.
    pub async fn release_broken(&self, handle: PooledHandle<C>) {
        handle.source.give_back_broken(handle.handle).await;
    }

    /// Proposes replacing one group's primary.
    ///
    /// Merges the pair into a copy of the active table and rebuilds only
    /// if the endpoint sequence changed. Rebuilds are serialized; a
    /// losing no-op proposal exits cheaply.
    ///
    /// # Errors
    /// Fails if the group is not configured or the replacement pool
    /// cannot be built; the active generation is unchanged either way.
    pub async fn propose_update(
        &self,
        group: &GroupName,
        primary: Endpoint,
    ) -> PoolResult<UpdateOutcome> {
        self.core.apply_update(group, primary).await
    }

    /// Snapshot of the active routing table.
    pub async fn routing_table(&self) -> RoutingTable {
        self.core.active.lock().await.table.clone()
    }

    /// Snapshot of the active primaries, in table order.
    pub async fn current_primaries(&self) -> Vec<Endpoint> {
        self.core.active.lock().await.table.primaries()
    }

    /// The active generation counter; bootstrap is generation 1.
    pub async fn generation(&self) -> u64 {
        self.core.active.lock().await.version
    }

    /// Stops every listener, then tears down the active generation.
    pub async fn destroy(&self) {
        let listeners: Vec<SwitchListener> = {
            let mut guard = self.listeners.lock().await;
            guard.drain(..).collect()
        };
        for listener in listeners {
            listener.shutdown().await;
        }

        let pool = Arc::clone(&self.core.active.lock().await.pool);
        pool.close().await;
        info!("sharded sentinel pool destroyed");
    }
}

impl<C: ShardConnection> PoolCore<C> {
    /// Merge, compare and (maybe) rebuild under the single exclusion
    /// point. The superseded generation is closed after the swap.
    async fn apply_update(
        &self,
        group: &GroupName,
        primary: Endpoint,
    ) -> PoolResult<UpdateOutcome> {
        let mut active = self.active.lock().await;

        if !active.table.contains(group) {
            return Err(PoolError::UnknownGroup {
                group: group.clone(),
            });
        }

        let candidate = active.table.with_primary(group, primary);
        if candidate.same_primaries(&active.table) {
            debug!(group = %group, "routing unchanged, rebuild skipped");
            return Ok(UpdateOutcome::Unchanged);
        }

        // A build failure leaves the previous generation in place.
        let pool = build_pool(&self.config, &self.backend, &self.driver, &self.ring, &candidate)
            .await?;

        let version = active.version + 1;
        let superseded = std::mem::replace(
            &mut *active,
            Generation {
                table: candidate,
                pool,
                version,
            },
        );
        drop(active);

        info!(
            version,
            superseded = superseded.version,
            "pool generation swapped"
        );
        superseded.pool.close().await;

        Ok(UpdateOutcome::Rebuilt)
    }
}

#[async_trait]
impl<C: ShardConnection> RouteUpdateSink for PoolCore<C> {
    async fn propose_update(
        &self,
        group: &GroupName,
        primary: Endpoint,
    ) -> Result<UpdateOutcome, UpdateError> {
        self.apply_update(group, primary).await.map_err(UpdateError::new)
    }
}

/// Builds one pool generation for a routing-table snapshot.
async fn build_pool<C: ShardConnection>(
    config: &PoolConfig,
    backend: &Arc<dyn ShardConnector<Conn = C>>,
    driver: &Arc<dyn PoolDriver<ShardedHandle<C>>>,
    ring: &Arc<dyn ShardRing>,
    table: &RoutingTable,
) -> PoolResult<Arc<dyn HandlePool<ShardedHandle<C>>>> {
    info!(primaries = %table, "building sharded pool");

    let factory: Arc<dyn PooledFactory<ShardedHandle<C>>> = Arc::new(ShardedHandleFactory::new(
        shard_specs(config, table),
        Arc::clone(backend),
        Arc::clone(ring),
    ));
    driver.build(factory, &config.pool).await
}
