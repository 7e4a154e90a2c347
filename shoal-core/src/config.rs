//! Pool and discovery configuration.
//!
//! Defaults mirror the conventional sentinel-client settings: five
//! bootstrap passes with a 1000 ms backoff, a 5000 ms subscription
//! reconnect wait, 2000 ms connect/socket timeouts, database 0 and a pool
//! of at most 8 handles.

use std::time::Duration;

use crate::types::{Endpoint, GroupName};

/// Default bootstrap retry ceiling (full passes over the sentinels).
pub const DISCOVERY_PASSES_DEFAULT: u32 = 5;

/// Default backoff between bootstrap passes.
pub const DISCOVERY_BACKOFF_DEFAULT: Duration = Duration::from_millis(1000);

/// Default wait before re-establishing a dropped subscription.
pub const SUBSCRIBE_RETRY_WAIT_DEFAULT: Duration = Duration::from_millis(5000);

/// Default connect and socket timeout for backend connections.
pub const BACKEND_TIMEOUT_DEFAULT: Duration = Duration::from_millis(2000);

/// Default maximum number of pooled handles.
pub const POOL_MAX_SIZE_DEFAULT: u32 = 8;

/// Sizing and eviction settings handed to the pool collaborator.
#[derive(Debug, Clone)]
pub struct PoolSettings {
    /// Maximum number of handles the pool may hold.
    pub max_size: u32,
    /// How long an idle handle may sit in the pool before eviction.
    pub idle_timeout: Duration,
    /// Whether the pool should validate a handle before lending it out.
    pub test_on_borrow: bool,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_size: POOL_MAX_SIZE_DEFAULT,
            idle_timeout: Duration::from_secs(60),
            test_on_borrow: true,
        }
    }
}

/// Configuration for a sharded sentinel pool.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Ordered list of group names; the order fixes shard positions.
    pub groups: Vec<GroupName>,
    /// Sentinel addresses to query and subscribe to.
    pub sentinels: Vec<Endpoint>,
    /// Password for backend authentication, if any.
    pub password: Option<String>,
    /// Backend database index to select after connecting.
    pub database: u32,
    /// Timeout for establishing a backend connection.
    pub connect_timeout: Duration,
    /// Read/write timeout on an established backend connection.
    pub socket_timeout: Duration,
    /// Bootstrap retry ceiling (full passes over the sentinels).
    pub discovery_passes: u32,
    /// Backoff between bootstrap passes.
    pub discovery_backoff: Duration,
    /// Wait before re-establishing a dropped subscription.
    pub subscribe_retry_wait: Duration,
    /// Settings handed to the pool collaborator.
    pub pool: PoolSettings,
}

impl PoolConfig {
    /// Creates a configuration for the given groups and sentinels with
    /// default timeouts and sizing.
    #[must_use]
    pub fn new(groups: Vec<GroupName>, sentinels: Vec<Endpoint>) -> Self {
        Self {
            groups,
            sentinels,
            password: None,
            database: 0,
            connect_timeout: BACKEND_TIMEOUT_DEFAULT,
            socket_timeout: BACKEND_TIMEOUT_DEFAULT,
            discovery_passes: DISCOVERY_PASSES_DEFAULT,
            discovery_backoff: DISCOVERY_BACKOFF_DEFAULT,
            subscribe_retry_wait: SUBSCRIBE_RETRY_WAIT_DEFAULT,
            pool: PoolSettings::default(),
        }
    }

    /// Sets the backend password.
    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Sets the backend database index.
    #[must_use]
    pub const fn with_database(mut self, database: u32) -> Self {
        self.database = database;
        self
    }

    /// Sets the bootstrap retry ceiling.
    #[must_use]
    pub const fn with_discovery_passes(mut self, passes: u32) -> Self {
        self.discovery_passes = passes;
        self
    }

    /// Sets the backoff between bootstrap passes.
    #[must_use]
    pub const fn with_discovery_backoff(mut self, backoff: Duration) -> Self {
        self.discovery_backoff = backoff;
        self
    }

    /// Sets the wait before re-establishing a dropped subscription.
    #[must_use]
    pub const fn with_subscribe_retry_wait(mut self, wait: Duration) -> Self {
        self.subscribe_retry_wait = wait;
        self
    }

    /// Sets the pool sizing settings.
    #[must_use]
    pub fn with_pool_settings(mut self, pool: PoolSettings) -> Self {
        self.pool = pool;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns an error if no groups or sentinels are configured, a group
    /// name is duplicated, or the retry ceiling is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.groups.is_empty() {
            return Err(ConfigError::NoGroups);
        }
        if self.sentinels.is_empty() {
            return Err(ConfigError::NoSentinels);
        }
        if self.discovery_passes == 0 {
            return Err(ConfigError::ZeroDiscoveryPasses);
        }
        for (i, group) in self.groups.iter().enumerate() {
            if self.groups[..i].contains(group) {
                return Err(ConfigError::DuplicateGroup {
                    group: group.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// No groups configured.
    #[error("at least one group must be configured")]
    NoGroups,

    /// No sentinel addresses configured.
    #[error("at least one sentinel address must be configured")]
    NoSentinels,

    /// The discovery retry ceiling is zero.
    #[error("discovery retry ceiling must be at least 1")]
    ZeroDiscoveryPasses,

    /// A group name appears twice.
    #[error("group {group} is configured more than once")]
    DuplicateGroup {
        /// The duplicated group name.
        group: GroupName,
    },
}
