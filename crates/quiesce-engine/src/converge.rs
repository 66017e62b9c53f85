//! Convergence waiting — blocking until mutated resources are stable.
//!
//! Each watched resource runs the state machine `pending → available`
//! (terminal success) or `pending → failed`/timeout (terminal failure).
//! A resource observed as available is never re-polled. Multiple
//! resources are watched strictly sequentially in issuance order: the
//! first failure aborts the wait and later resources stay unwatched.

use std::time::Duration;

use tracing::{debug, info};

use quiesce_control::{ClusterControl, ConvergeScope, EngineCaps, WatchTarget};
use quiesce_state::MemberStatus;

use crate::classify::MutationPlan;
use crate::error::{OrchestrateError, OrchestrateResult};

/// Manual polling policy: fixed interval, bounded attempts.
///
/// The default matches the provider waiters' budget: 60 attempts at
/// 30-second intervals ≈ 30 minutes per watched resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            max_attempts: 60,
        }
    }
}

impl PollPolicy {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// Overall budget for one watched resource.
    pub fn budget(&self) -> Duration {
        self.interval * self.max_attempts
    }
}

/// Derive what to watch after issuing a plan.
///
/// Fan-outs converge on each mutated member (in issuance order) when the
/// engine watches per member; everything else converges on the cluster.
pub fn watch_targets(caps: &EngineCaps, cluster_id: &str, plan: &MutationPlan) -> Vec<WatchTarget> {
    match plan {
        MutationPlan::FanOut { targets, .. }
            if caps.converge_scope == ConvergeScope::PerMember =>
        {
            targets
                .iter()
                .map(|t| WatchTarget::Member(t.clone()))
                .collect()
        }
        _ => vec![WatchTarget::Cluster(cluster_id.to_string())],
    }
}

/// Wait for every target to report available, one at a time.
pub async fn await_converged<C: ClusterControl>(
    control: &C,
    targets: &[WatchTarget],
    policy: &PollPolicy,
) -> OrchestrateResult<()> {
    for target in targets {
        wait_one(control, target, policy).await?;
    }
    Ok(())
}

/// Wait for a single target, using the native primitive where the engine
/// has one and the manual poll loop otherwise.
async fn wait_one<C: ClusterControl>(
    control: &C,
    target: &WatchTarget,
    policy: &PollPolicy,
) -> OrchestrateResult<()> {
    let caps = control.caps();
    let native = match target {
        WatchTarget::Cluster(_) => caps.cluster_native_wait,
        WatchTarget::Member(_) => caps.member_native_wait,
    };

    if native {
        info!(%target, budget_secs = policy.budget().as_secs(), "waiting for availability (native)");
        control
            .wait_available(target, policy.budget())
            .await
            .map_err(|e| OrchestrateError::ConvergenceTimeout {
                target: target.to_string(),
                budget_secs: policy.budget().as_secs(),
                detail: e.to_string(),
            })?;
        info!(%target, "available");
        Ok(())
    } else {
        poll_until_available(control, target, policy).await
    }
}

/// Manual poll loop: describe every `interval`, up to `max_attempts`.
///
/// A describe error or an observed terminal `failed` status aborts
/// immediately; both surface as `DescribeFailed`. The loop never sleeps
/// after its final attempt.
async fn poll_until_available<C: ClusterControl>(
    control: &C,
    target: &WatchTarget,
    policy: &PollPolicy,
) -> OrchestrateResult<()> {
    let caps = control.caps();
    info!(
        %target,
        interval_secs = policy.interval.as_secs(),
        max_attempts = policy.max_attempts,
        "waiting for availability (polling)"
    );

    for attempt in 1..=policy.max_attempts {
        let raw = match target {
            WatchTarget::Cluster(id) => control.describe_cluster(id).await.map(|d| d.status),
            WatchTarget::Member(id) => control.describe_member(id).await,
        }
        .map_err(|e| OrchestrateError::DescribeFailed {
            target: target.to_string(),
            detail: e.to_string(),
        })?;

        match caps.normalize(&raw) {
            MemberStatus::Available => {
                info!(%target, attempt, "available");
                return Ok(());
            }
            MemberStatus::Failed => {
                return Err(OrchestrateError::DescribeFailed {
                    target: target.to_string(),
                    detail: format!("reported terminal status {raw:?}"),
                });
            }
            MemberStatus::Pending | MemberStatus::Unknown => {
                debug!(%target, attempt, status = %raw, "not yet available");
            }
        }

        if attempt < policy.max_attempts {
            tokio::time::sleep(policy.interval).await;
        }
    }

    Err(OrchestrateError::ConvergenceTimeout {
        target: target.to_string(),
        budget_secs: policy.budget().as_secs(),
        detail: format!(
            "status never reached available in {} attempts",
            policy.max_attempts
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiesce_control::sim::{IssuedCall, SimControl, SimMember};
    use quiesce_state::EngineKind;

    fn fast_policy(max_attempts: u32) -> PollPolicy {
        PollPolicy::new(Duration::from_millis(1), max_attempts)
    }

    #[test]
    fn default_policy_budget_is_thirty_minutes() {
        let policy = PollPolicy::default();
        assert_eq!(policy.interval, Duration::from_secs(30));
        assert_eq!(policy.max_attempts, 60);
        assert_eq!(policy.budget(), Duration::from_secs(1800));
    }

    #[test]
    fn fan_out_watches_members_when_engine_converges_per_member() {
        let caps = EngineCaps::for_kind(EngineKind::GraphCluster);
        let plan = MutationPlan::FanOut {
            targets: vec!["db-1-a".to_string(), "db-1-b".to_string()],
            failover_hint: None,
        };
        assert_eq!(
            watch_targets(&caps, "db-1", &plan),
            vec![
                WatchTarget::Member("db-1-a".to_string()),
                WatchTarget::Member("db-1-b".to_string()),
            ]
        );
    }

    #[test]
    fn fan_out_watches_cluster_when_engine_converges_on_cluster() {
        let caps = EngineCaps::for_kind(EngineKind::RelationalCluster);
        let plan = MutationPlan::FanOut {
            targets: vec!["db-1-a".to_string(), "db-1-b".to_string()],
            failover_hint: None,
        };
        assert_eq!(
            watch_targets(&caps, "db-1", &plan),
            vec![WatchTarget::Cluster("db-1".to_string())]
        );
    }

    #[test]
    fn single_call_watches_the_cluster() {
        let caps = EngineCaps::for_kind(EngineKind::GraphCluster);
        assert_eq!(
            watch_targets(&caps, "db-1", &MutationPlan::SingleCall),
            vec![WatchTarget::Cluster("db-1".to_string())]
        );
    }

    #[tokio::test]
    async fn polling_succeeds_on_the_attempt_that_observes_available() {
        // Document engine: no native waits, cluster polling.
        let sim = SimControl::new(EngineKind::DocumentCluster);
        sim.add_cluster("db-1", vec![SimMember::writer("db-1-a")]);
        sim.script_statuses("db-1", &["modifying", "modifying", "available"]);

        let target = WatchTarget::Cluster("db-1".to_string());
        await_converged(&sim, &[target], &fast_policy(60))
            .await
            .unwrap();
        assert_eq!(sim.describe_count("db-1"), 3);
    }

    #[tokio::test]
    async fn polling_times_out_only_after_all_attempts() {
        let sim = SimControl::new(EngineKind::DocumentCluster);
        sim.add_cluster("db-1", vec![SimMember::writer("db-1-a")]);
        sim.script_statuses("db-1", &["modifying"]);

        let target = WatchTarget::Cluster("db-1".to_string());
        let err = await_converged(&sim, &[target], &fast_policy(5))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            OrchestrateError::ConvergenceTimeout { .. }
        ));
        // All five attempts were made, none skipped.
        assert_eq!(sim.describe_count("db-1"), 5);
    }

    #[tokio::test]
    async fn polling_fails_immediately_on_terminal_failed_status() {
        let sim = SimControl::new(EngineKind::DocumentCluster);
        sim.add_cluster("db-1", vec![SimMember::writer("db-1-a")]);
        sim.script_statuses("db-1", &["modifying", "failed"]);

        let target = WatchTarget::Cluster("db-1".to_string());
        let err = await_converged(&sim, &[target], &fast_policy(60))
            .await
            .unwrap_err();

        match err {
            OrchestrateError::DescribeFailed { detail, .. } => {
                assert!(detail.contains("terminal status"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(sim.describe_count("db-1"), 2);
    }

    #[tokio::test]
    async fn polling_fails_immediately_on_describe_error() {
        let sim = SimControl::new(EngineKind::DocumentCluster);
        sim.add_cluster("db-1", vec![SimMember::writer("db-1-a")]);
        sim.inject_describe_error("db-1", "connection reset");

        let target = WatchTarget::Cluster("db-1".to_string());
        let err = await_converged(&sim, &[target], &fast_policy(60))
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestrateError::DescribeFailed { .. }));
        assert_eq!(sim.describe_count("db-1"), 1);
    }

    #[tokio::test]
    async fn unknown_status_is_not_terminal() {
        let sim = SimControl::new(EngineKind::DocumentCluster);
        sim.add_cluster("db-1", vec![SimMember::writer("db-1-a")]);
        sim.script_statuses("db-1", &["some-new-status", "available"]);

        let target = WatchTarget::Cluster("db-1".to_string());
        await_converged(&sim, &[target], &fast_policy(60))
            .await
            .unwrap();
        assert_eq!(sim.describe_count("db-1"), 2);
    }

    #[tokio::test]
    async fn native_wait_is_used_where_the_engine_has_one() {
        let sim = SimControl::new(EngineKind::RelationalCluster);
        sim.add_cluster("db-1", vec![SimMember::writer("db-1-a")]);
        sim.script_statuses("db-1", &["rebooting", "available"]);

        let target = WatchTarget::Cluster("db-1".to_string());
        await_converged(&sim, std::slice::from_ref(&target), &fast_policy(60))
            .await
            .unwrap();

        assert!(sim
            .calls()
            .contains(&IssuedCall::WaitAvailable { target }));
    }

    #[tokio::test]
    async fn native_wait_error_maps_to_convergence_timeout() {
        let sim = SimControl::new(EngineKind::RelationalCluster);
        sim.add_cluster("db-1", vec![SimMember::writer("db-1-a")]);
        sim.script_statuses("db-1", &["rebooting"]); // Stuck: budget exhausts.

        let target = WatchTarget::Cluster("db-1".to_string());
        let err = await_converged(&sim, &[target], &fast_policy(60))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OrchestrateError::ConvergenceTimeout { .. }
        ));
    }

    #[tokio::test]
    async fn sequential_wait_aborts_before_later_targets() {
        let sim = SimControl::new(EngineKind::DocumentCluster);
        sim.add_cluster(
            "db-1",
            vec![SimMember::writer("db-1-a"), SimMember::reader("db-1-b")],
        );
        sim.script_statuses("db-1-a", &["rebooting"]); // Never available.
        sim.script_statuses("db-1-b", &["rebooting", "available"]);

        let targets = vec![
            WatchTarget::Member("db-1-a".to_string()),
            WatchTarget::Member("db-1-b".to_string()),
        ];
        let err = await_converged(&sim, &targets, &fast_policy(3))
            .await
            .unwrap_err();

        match err {
            OrchestrateError::ConvergenceTimeout { target, .. } => {
                assert_eq!(target, "instance db-1-a");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // The second target was never watched; its script is untouched.
        assert_eq!(sim.describe_count("db-1-b"), 0);
        assert_eq!(sim.remaining_script_len("db-1-b"), 2);
    }

    #[tokio::test]
    async fn available_targets_are_not_repolled() {
        let sim = SimControl::new(EngineKind::DocumentCluster);
        sim.add_cluster(
            "db-1",
            vec![SimMember::writer("db-1-a"), SimMember::reader("db-1-b")],
        );
        sim.script_statuses("db-1-a", &["available"]);
        sim.script_statuses("db-1-b", &["rebooting", "available"]);

        let targets = vec![
            WatchTarget::Member("db-1-a".to_string()),
            WatchTarget::Member("db-1-b".to_string()),
        ];
        await_converged(&sim, &targets, &fast_policy(60))
            .await
            .unwrap();

        // First target observed available once and left alone afterwards.
        assert_eq!(sim.describe_count("db-1-a"), 1);
        assert_eq!(sim.describe_count("db-1-b"), 2);
    }
}
