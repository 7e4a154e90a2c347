//! Bootstrap discovery of the initial routing table.
//!
//! For every configured group the discoverer queries the sentinels in
//! order until one reports the group's current primary, retrying whole
//! passes with a fixed backoff. A process must not start with a partial
//! table, so exhausting the retry ceiling for any group is fatal.

use std::time::Duration;

use shoal_core::{Endpoint, GroupName, RoutingTable};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::client::SentinelConnector;

/// Result type for discovery.
pub type DiscoveryResult<T> = Result<T, DiscoveryError>;

/// Retry schedule for bootstrap discovery.
#[derive(Debug, Clone, Copy)]
pub struct DiscoveryPolicy {
    /// Maximum number of full passes over the sentinels per group.
    pub passes: u32,
    /// Sleep between failed passes.
    pub backoff: Duration,
}

impl DiscoveryPolicy {
    /// Creates a policy.
    #[must_use]
    pub const fn new(passes: u32, backoff: Duration) -> Self {
        Self { passes, backoff }
    }
}

impl Default for DiscoveryPolicy {
    fn default() -> Self {
        Self {
            passes: shoal_core::DISCOVERY_PASSES_DEFAULT,
            backoff: shoal_core::DISCOVERY_BACKOFF_DEFAULT,
        }
    }
}

/// Fatal bootstrap failures.
///
/// Both variants abort startup; they differ only in diagnosis. A group
/// that some sentinel could see but not resolve points at configuration,
/// while sentinels that never answered point at the network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiscoveryError {
    /// A reachable sentinel had no record of the group.
    #[error(
        "sentinels reachable but group {group} is not monitored (gave up after {passes} passes)"
    )]
    GroupNotMonitored {
        /// The unresolvable group.
        group: GroupName,
        /// How many passes were attempted.
        passes: u32,
    },

    /// No sentinel could be reached for the group.
    #[error("all sentinels unreachable resolving group {group} (gave up after {passes} passes)")]
    SentinelsUnreachable {
        /// The unresolvable group.
        group: GroupName,
        /// How many passes were attempted.
        passes: u32,
    },
}

/// Resolves every configured group to its current primary.
///
/// Sentinels are tried in the given order. A sentinel that is reachable
/// but does not monitor the group ends the pass early; an unreachable
/// sentinel is skipped in favor of the next one. Failed passes are
/// retried after `policy.backoff`, up to `policy.passes` passes.
///
/// # Errors
/// Returns [`DiscoveryError`] once the retry ceiling is exhausted for any
/// group. No partial table is ever returned.
pub async fn discover_routing_table(
    connector: &dyn SentinelConnector,
    sentinels: &[Endpoint],
    groups: &[GroupName],
    policy: DiscoveryPolicy,
) -> DiscoveryResult<RoutingTable> {
    info!(
        groups = groups.len(),
        sentinels = sentinels.len(),
        "resolving primaries from available sentinels"
    );

    let mut table = RoutingTable::new();

    for group in groups {
        if table.contains(group) {
            continue;
        }

        let primary = resolve_group(connector, sentinels, group, policy).await?;
        debug!(group = %group, primary = %primary, "found primary");
        table.insert(group.clone(), primary);
    }

    info!(table = %table, "routing table resolved");
    Ok(table)
}

/// Runs retry passes for a single group.
async fn resolve_group(
    connector: &dyn SentinelConnector,
    sentinels: &[Endpoint],
    group: &GroupName,
    policy: DiscoveryPolicy,
) -> DiscoveryResult<Endpoint> {
    // Sticky across passes: one reachable-but-unmonitored answer changes
    // the final diagnosis from "all down" to "not monitored".
    let mut saw_unmonitored = false;

    for pass in 1..=policy.passes {
        match run_pass(connector, sentinels, group).await {
            PassOutcome::Resolved(primary) => return Ok(primary),
            PassOutcome::Unmonitored => {
                saw_unmonitored = true;
                warn!(
                    group = %group,
                    pass,
                    "sentinel reachable but group not monitored"
                );
            }
            PassOutcome::AllUnreachable => {
                warn!(
                    group = %group,
                    pass,
                    backoff_ms = policy.backoff.as_millis(),
                    "all sentinels down, cannot determine primary; will retry"
                );
            }
        }

        if pass < policy.passes {
            tokio::time::sleep(policy.backoff).await;
        }
    }

    Err(if saw_unmonitored {
        DiscoveryError::GroupNotMonitored {
            group: group.clone(),
            passes: policy.passes,
        }
    } else {
        DiscoveryError::SentinelsUnreachable {
            group: group.clone(),
            passes: policy.passes,
        }
    })
}

enum PassOutcome {
    Resolved(Endpoint),
    Unmonitored,
    AllUnreachable,
}

/// One pass over the sentinels for one group.
///
/// A reachable sentinel without a record for the group is a configuration
/// inconsistency, not a connectivity problem, so the pass stops there
/// instead of asking the remaining sentinels.
async fn run_pass(
    connector: &dyn SentinelConnector,
    sentinels: &[Endpoint],
    group: &GroupName,
) -> PassOutcome {
    for sentinel in sentinels {
        debug!(sentinel = %sentinel, group = %group, "querying sentinel");

        match connector.resolve_primary(sentinel, group).await {
            Ok(Some(primary)) => return PassOutcome::Resolved(primary),
            Ok(None) => {
                warn!(
                    sentinel = %sentinel,
                    group = %group,
                    "sentinel has no primary recorded for group"
                );
                return PassOutcome::Unmonitored;
            }
            Err(err) => {
                warn!(
                    sentinel = %sentinel,
                    error = %err,
                    "cannot connect to sentinel, trying next one"
                );
            }
        }
    }

    PassOutcome::AllUnreachable
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::client::{SentinelResult, SentinelError, SwitchSubscription};

    /// Scripted answer from one sentinel for one group.
    #[derive(Clone)]
    enum Answer {
        Primary(Endpoint),
        Unmonitored,
        Down,
    }

    /// Fake connector replaying per-sentinel scripts and logging calls.
    struct FakeConnector {
        answers: Vec<(Endpoint, Answer)>,
        calls: Mutex<Vec<Endpoint>>,
    }

    impl FakeConnector {
        fn new(answers: Vec<(Endpoint, Answer)>) -> Self {
            Self {
                answers,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<Endpoint> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SentinelConnector for FakeConnector {
        async fn resolve_primary(
            &self,
            sentinel: &Endpoint,
            _group: &GroupName,
        ) -> SentinelResult<Option<Endpoint>> {
            self.calls.lock().unwrap().push(sentinel.clone());
            let answer = self
                .answers
                .iter()
                .find(|(s, _)| s == sentinel)
                .map(|(_, a)| a.clone())
                .unwrap_or(Answer::Down);
            match answer {
                Answer::Primary(ep) => Ok(Some(ep)),
                Answer::Unmonitored => Ok(None),
                Answer::Down => Err(SentinelError::unreachable(sentinel, "refused")),
            }
        }

        async fn subscribe_switches(
            &self,
            sentinel: &Endpoint,
        ) -> SentinelResult<Box<dyn SwitchSubscription>> {
            Err(SentinelError::unreachable(sentinel, "not subscribable"))
        }
    }

    fn sentinel(n: u16) -> Endpoint {
        Endpoint::new("sentinel", n)
    }

    fn fast_policy(passes: u32) -> DiscoveryPolicy {
        DiscoveryPolicy::new(passes, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_first_pass_resolves_all_groups() {
        let connector = FakeConnector::new(vec![(
            sentinel(1),
            Answer::Primary(Endpoint::new("10.0.0.1", 6379)),
        )]);
        let groups = vec![GroupName::new("m1"), GroupName::new("m2")];

        let table = discover_routing_table(&connector, &[sentinel(1)], &groups, fast_policy(5))
            .await
            .unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(
            table.primary(&GroupName::new("m1")),
            Some(&Endpoint::new("10.0.0.1", 6379))
        );
    }

    #[tokio::test]
    async fn test_unreachable_sentinel_skipped_for_next() {
        let connector = FakeConnector::new(vec![
            (sentinel(1), Answer::Down),
            (sentinel(2), Answer::Primary(Endpoint::new("10.0.0.2", 6379))),
        ]);
        let groups = vec![GroupName::new("m1")];

        let table = discover_routing_table(
            &connector,
            &[sentinel(1), sentinel(2)],
            &groups,
            fast_policy(5),
        )
        .await
        .unwrap();

        assert_eq!(
            table.primary(&GroupName::new("m1")),
            Some(&Endpoint::new("10.0.0.2", 6379))
        );
        assert_eq!(connector.calls(), vec![sentinel(1), sentinel(2)]);
    }

    #[tokio::test]
    async fn test_all_down_exhausts_ceiling() {
        let connector = FakeConnector::new(vec![
            (sentinel(1), Answer::Down),
            (sentinel(2), Answer::Down),
        ]);
        let groups = vec![GroupName::new("m1")];

        let err = discover_routing_table(
            &connector,
            &[sentinel(1), sentinel(2)],
            &groups,
            fast_policy(2),
        )
        .await
        .unwrap_err();

        assert_eq!(
            err,
            DiscoveryError::SentinelsUnreachable {
                group: GroupName::new("m1"),
                passes: 2,
            }
        );
        // Two sentinels, two passes.
        assert_eq!(connector.calls().len(), 4);
    }

    #[tokio::test]
    async fn test_unmonitored_is_distinguished_and_ends_pass() {
        let connector = FakeConnector::new(vec![
            (sentinel(1), Answer::Unmonitored),
            (sentinel(2), Answer::Primary(Endpoint::new("10.0.0.2", 6379))),
        ]);
        let groups = vec![GroupName::new("m1")];

        let err = discover_routing_table(
            &connector,
            &[sentinel(1), sentinel(2)],
            &groups,
            fast_policy(2),
        )
        .await
        .unwrap_err();

        assert_eq!(
            err,
            DiscoveryError::GroupNotMonitored {
                group: GroupName::new("m1"),
                passes: 2,
            }
        );
        // The unmonitored answer ends each pass before sentinel 2 is asked.
        assert_eq!(connector.calls(), vec![sentinel(1), sentinel(1)]);
    }

    #[tokio::test]
    async fn test_unmonitored_diagnosis_sticks_across_passes() {
        // Sentinel 1 down, sentinel 2 reachable but unmonitored: the
        // failure must read as a configuration problem, not an outage.
        let connector = FakeConnector::new(vec![
            (sentinel(1), Answer::Down),
            (sentinel(2), Answer::Unmonitored),
        ]);
        let groups = vec![GroupName::new("m1")];

        let err = discover_routing_table(
            &connector,
            &[sentinel(1), sentinel(2)],
            &groups,
            fast_policy(2),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, DiscoveryError::GroupNotMonitored { .. }));
    }

    #[tokio::test]
    async fn test_failure_never_returns_partial_table() {
        // m1 resolves, m2 does not; the whole bootstrap must fail.
        struct SplitConnector;

        #[async_trait]
        impl SentinelConnector for SplitConnector {
            async fn resolve_primary(
                &self,
                sentinel: &Endpoint,
                group: &GroupName,
            ) -> SentinelResult<Option<Endpoint>> {
                if group.as_str() == "m1" {
                    Ok(Some(Endpoint::new("10.0.0.1", 6379)))
                } else {
                    Err(SentinelError::unreachable(sentinel, "refused"))
                }
            }

            async fn subscribe_switches(
                &self,
                sentinel: &Endpoint,
            ) -> SentinelResult<Box<dyn SwitchSubscription>> {
                Err(SentinelError::unreachable(sentinel, "not subscribable"))
            }
        }

        let groups = vec![GroupName::new("m1"), GroupName::new("m2")];
        let result =
            discover_routing_table(&SplitConnector, &[sentinel(1)], &groups, fast_policy(2)).await;

        assert!(matches!(
            result,
            Err(DiscoveryError::SentinelsUnreachable { .. })
        ));
    }
}
