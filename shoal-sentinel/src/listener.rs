//! Long-lived switch listeners, one per notification source.
//!
//! Each listener holds a subscription to its sentinel's switch channel
//! and proposes routing updates for configured groups. Loss of a
//! subscription is never fatal: the current routing table stays valid
//! until a genuine change is observed, so the listener just waits out
//! the retry interval and re-subscribes.
//!
//! The subscription is owned exclusively by the listener task. Shutdown
//! cancels the task's token; the select loop observes it, returns, and
//! drops the subscription, which closes the underlying connection.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use shoal_core::{Endpoint, GroupName};
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::client::{SentinelConnector, SwitchSubscription};
use crate::event::SwitchEvent;

/// What a proposed routing update did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The proposal matched the active table; nothing was rebuilt.
    Unchanged,
    /// The pool was rebuilt around the updated table.
    Rebuilt,
}

/// A rejected routing update.
///
/// Carries only the rendered cause; the listener logs it and carries on,
/// so no structure is needed at this boundary.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct UpdateError {
    /// Rendered cause of the rejection.
    pub message: String,
}

impl UpdateError {
    /// Wraps any error into an update rejection.
    pub fn new(err: impl std::fmt::Display) -> Self {
        Self {
            message: err.to_string(),
        }
    }
}

/// Consumer of routing updates proposed by listeners.
///
/// Implemented by the pool manager. A failed rebuild is returned to the
/// proposing listener only; it must not disturb other listeners.
#[async_trait]
pub trait RouteUpdateSink: Send + Sync {
    /// Proposes replacing one group's primary.
    async fn propose_update(
        &self,
        group: &GroupName,
        primary: Endpoint,
    ) -> Result<UpdateOutcome, UpdateError>;
}

/// Handle to one spawned switch listener.
pub struct SwitchListener {
    sentinel: Endpoint,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Everything the listener loop needs, bundled for the spawned task.
struct ListenerContext {
    connector: Arc<dyn SentinelConnector>,
    sentinel: Endpoint,
    groups: Vec<GroupName>,
    sink: Arc<dyn RouteUpdateSink>,
    retry_wait: Duration,
}

enum ReadExit {
    Cancelled,
    ConnectionLost,
}

impl SwitchListener {
    /// Spawns a listener subscribed to one sentinel.
    ///
    /// `groups` filters which announcements are relevant; sentinels are
    /// commonly shared and announce groups this process does not track.
    #[must_use]
    pub fn spawn(
        connector: Arc<dyn SentinelConnector>,
        sentinel: Endpoint,
        groups: Vec<GroupName>,
        sink: Arc<dyn RouteUpdateSink>,
        retry_wait: Duration,
    ) -> Self {
        let cancel = CancellationToken::new();
        let ctx = ListenerContext {
            connector,
            sentinel: sentinel.clone(),
            groups,
            sink,
            retry_wait,
        };

        let task_cancel = cancel.clone();
        let task = tokio::spawn(async move {
            run(ctx, task_cancel).await;
        });

        Self {
            sentinel,
            cancel,
            task,
        }
    }

    /// The sentinel this listener is subscribed to.
    #[must_use]
    pub const fn sentinel(&self) -> &Endpoint {
        &self.sentinel
    }

    /// Requests shutdown without waiting for the task to finish.
    pub fn request_stop(&self) {
        self.cancel.cancel();
    }

    /// Cancels the listener and waits for its task to exit.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        // The task only ends by returning; a join error means it panicked
        // and there is nothing further to unwind here.
        let _ = self.task.await;
    }
}

/// Subscribe/read/retry loop for one sentinel.
async fn run(ctx: ListenerContext, cancel: CancellationToken) {
    info!(sentinel = %ctx.sentinel, "switch listener started");

    while !cancel.is_cancelled() {
        match ctx.connector.subscribe_switches(&ctx.sentinel).await {
            Ok(mut subscription) => {
                if let ReadExit::Cancelled = read_loop(&ctx, subscription.as_mut(), &cancel).await {
                    break;
                }
            }
            Err(err) => {
                error!(
                    sentinel = %ctx.sentinel,
                    error = %err,
                    retry_wait_ms = ctx.retry_wait.as_millis(),
                    "cannot subscribe to sentinel, retrying"
                );
            }
        }

        tokio::select! {
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(ctx.retry_wait) => {}
        }
    }

    debug!(sentinel = %ctx.sentinel, "unsubscribed from sentinel");
}

/// Drains one subscription until cancellation or connection loss.
async fn read_loop(
    ctx: &ListenerContext,
    subscription: &mut dyn SwitchSubscription,
    cancel: &CancellationToken,
) -> ReadExit {
    loop {
        tokio::select! {
            () = cancel.cancelled() => return ReadExit::Cancelled,
            message = subscription.next_message() => match message {
                Ok(raw) => handle_message(ctx, &raw).await,
                Err(err) => {
                    error!(
                        sentinel = %ctx.sentinel,
                        error = %err,
                        retry_wait_ms = ctx.retry_wait.as_millis(),
                        "lost connection to sentinel, retrying"
                    );
                    return ReadExit::ConnectionLost;
                }
            }
        }
    }
}

/// Parses, filters and forwards one raw switch message.
async fn handle_message(ctx: &ListenerContext, raw: &str) {
    debug!(sentinel = %ctx.sentinel, message = raw, "switch message received");

    let event = match SwitchEvent::parse(raw) {
        Ok(event) => event,
        Err(err) => {
            warn!(
                sentinel = %ctx.sentinel,
                message = raw,
                error = %err,
                "dropping malformed switch message"
            );
            return;
        }
    };

    if !ctx.groups.contains(&event.group) {
        debug!(
            sentinel = %ctx.sentinel,
            group = %event.group,
            "ignoring switch for group not tracked by this pool"
        );
        return;
    }

    match ctx
        .sink
        .propose_update(&event.group, event.new_primary.clone())
        .await
    {
        Ok(UpdateOutcome::Rebuilt) => {
            info!(
                group = %event.group,
                old = %event.old_primary,
                new = %event.new_primary,
                "primary switched, pool rebuilt"
            );
        }
        Ok(UpdateOutcome::Unchanged) => {
            debug!(
                group = %event.group,
                new = %event.new_primary,
                "switch produced no routing change"
            );
        }
        Err(err) => {
            // Rebuild failures stay local to this proposal; the previous
            // generation remains active.
            error!(
                group = %event.group,
                error = %err,
                "pool rebuild failed, keeping current generation"
            );
        }
    }
}
