//! Connector boundary for notification sources.
//!
//! Implementors speak the sentinel wire protocol; this crate only needs
//! two operations from it: resolve the current primary for a named group,
//! and subscribe to the primary-switch channel.

use async_trait::async_trait;
use shoal_core::{Endpoint, GroupName};
use thiserror::Error;

/// Channel on which sentinels announce primary switches.
pub const SWITCH_CHANNEL: &str = "+switch-master";

/// Result type for sentinel operations.
pub type SentinelResult<T> = Result<T, SentinelError>;

/// Errors from talking to a notification source.
///
/// All of these are transient at this layer: bootstrap skips to the next
/// source and listeners retry after a fixed wait.
#[derive(Debug, Error)]
pub enum SentinelError {
    /// The source could not be reached.
    #[error("sentinel {sentinel} unreachable: {message}")]
    Unreachable {
        /// The source address.
        sentinel: Endpoint,
        /// What went wrong.
        message: String,
    },

    /// An established subscription dropped.
    #[error("subscription to sentinel {sentinel} lost: {message}")]
    SubscriptionLost {
        /// The source address.
        sentinel: Endpoint,
        /// What went wrong.
        message: String,
    },

    /// The source answered with something the connector could not read.
    #[error("protocol error from sentinel {sentinel}: {message}")]
    Protocol {
        /// The source address.
        sentinel: Endpoint,
        /// What went wrong.
        message: String,
    },
}

impl SentinelError {
    /// Creates a [`SentinelError::Unreachable`].
    pub fn unreachable(sentinel: &Endpoint, err: impl std::fmt::Display) -> Self {
        Self::Unreachable {
            sentinel: sentinel.clone(),
            message: err.to_string(),
        }
    }

    /// Creates a [`SentinelError::SubscriptionLost`].
    pub fn subscription_lost(sentinel: &Endpoint, err: impl std::fmt::Display) -> Self {
        Self::SubscriptionLost {
            sentinel: sentinel.clone(),
            message: err.to_string(),
        }
    }
}

/// Client boundary to the notification-source protocol.
///
/// A connector is shared by the bootstrap discoverer and every listener;
/// implementations open a transient connection per call.
#[async_trait]
pub trait SentinelConnector: Send + Sync {
    /// Asks one source for the current primary of a group.
    ///
    /// Returns `Ok(Some(endpoint))` when the source knows the group,
    /// `Ok(None)` when the source is reachable but does not monitor the
    /// group, and an error when the source cannot be reached.
    async fn resolve_primary(
        &self,
        sentinel: &Endpoint,
        group: &GroupName,
    ) -> SentinelResult<Option<Endpoint>>;

    /// Opens a subscription to the source's [`SWITCH_CHANNEL`].
    ///
    /// The returned subscription owns its connection; dropping it closes
    /// the connection.
    async fn subscribe_switches(
        &self,
        sentinel: &Endpoint,
    ) -> SentinelResult<Box<dyn SwitchSubscription>>;
}

/// A live subscription to the primary-switch channel.
#[async_trait]
pub trait SwitchSubscription: Send {
    /// Waits for the next raw switch message.
    ///
    /// Blocks until a message arrives or the connection drops; a dropped
    /// connection surfaces as [`SentinelError::SubscriptionLost`].
    async fn next_message(&mut self) -> SentinelResult<String>;
}
