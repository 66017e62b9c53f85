//! Orchestrator — entry points and outcome aggregation.
//!
//! One operation runs classify → issue → converge as strictly
//! sequential awaits, then folds the result into a single
//! `MutationOutcome` that is handed to the outcome sink before being
//! returned. There is no internal parallelism and no automatic retry;
//! a failed operation is re-driven by invoking it again.

use chrono::{SecondsFormat, Utc};
use tracing::{info, warn};

use quiesce_control::{ClusterControl, ControlError};
use quiesce_state::{
    epoch_secs, ClusterRef, ModifyParams, MutationKind, MutationOutcome, MutationRequest,
    OperationRecord, OutcomeStore, StoreResult,
};

use crate::classify::classify;
use crate::converge::{await_converged, watch_targets, PollPolicy};
use crate::error::{OrchestrateError, OrchestrateResult};
use crate::issue::issue;

/// Where finished operations record their outcome.
///
/// The sink also serves the last-recorded outcome for idempotent
/// re-reads. `OutcomeStore` is the production implementation.
pub trait OutcomeSink: Send + Sync {
    fn record(&self, record: &OperationRecord) -> StoreResult<()>;
    fn last_outcome(&self, cluster_id: &str) -> StoreResult<Option<OperationRecord>>;
}

impl OutcomeSink for OutcomeStore {
    fn record(&self, record: &OperationRecord) -> StoreResult<()> {
        OutcomeStore::record(self, record)
    }

    fn last_outcome(&self, cluster_id: &str) -> StoreResult<Option<OperationRecord>> {
        OutcomeStore::last_outcome(self, cluster_id)
    }
}

impl<T: OutcomeSink + ?Sized> OutcomeSink for &T {
    fn record(&self, record: &OperationRecord) -> StoreResult<()> {
        (**self).record(record)
    }

    fn last_outcome(&self, cluster_id: &str) -> StoreResult<Option<OperationRecord>> {
        (**self).last_outcome(cluster_id)
    }
}

/// Drives mutations against one control plane and records outcomes.
pub struct Orchestrator<C, S> {
    control: C,
    sink: S,
    policy: PollPolicy,
}

impl<C: ClusterControl, S: OutcomeSink> Orchestrator<C, S> {
    /// Create an orchestrator with the default 30-minute / 30-second policy.
    pub fn new(control: C, sink: S) -> Self {
        Self {
            control,
            sink,
            policy: PollPolicy::default(),
        }
    }

    /// Override the convergence policy (tests use millisecond intervals).
    pub fn with_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Apply a config modification and wait for the cluster to stabilize.
    pub async fn apply_modify(
        &self,
        cluster: &ClusterRef,
        params: ModifyParams,
    ) -> OrchestrateResult<MutationOutcome> {
        self.apply(&MutationRequest {
            cluster: cluster.clone(),
            kind: MutationKind::ModifyConfig,
            params: Some(params),
            force_failover: None,
        })
        .await
    }

    /// Reboot a cluster (failover or per-member fan-out, per topology)
    /// and wait for every affected resource to stabilize.
    pub async fn apply_reboot(
        &self,
        cluster: &ClusterRef,
        force_failover: Option<bool>,
    ) -> OrchestrateResult<MutationOutcome> {
        self.apply(&MutationRequest {
            cluster: cluster.clone(),
            kind: MutationKind::Reboot,
            params: None,
            force_failover,
        })
        .await
    }

    /// Apply an arbitrary mutation request.
    ///
    /// Always produces exactly one outcome and records it. `Err` is
    /// returned only when a *successful* operation could not be
    /// persisted; a failed operation's own error wins over a failed
    /// record write.
    pub async fn apply(&self, request: &MutationRequest) -> OrchestrateResult<MutationOutcome> {
        info!(
            cluster_id = %request.cluster.id,
            kind = ?request.kind,
            "applying mutation"
        );

        let outcome = match self.drive(request).await {
            Ok(()) => {
                MutationOutcome::succeeded(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true))
            }
            Err(e) => {
                warn!(cluster_id = %request.cluster.id, error = %e, "mutation failed");
                MutationOutcome::failed(e.to_string())
            }
        };

        let record = OperationRecord {
            cluster_id: request.cluster.id.clone(),
            kind: request.kind,
            outcome: outcome.clone(),
            recorded_at: epoch_secs(),
        };
        if let Err(store_err) = self.sink.record(&record) {
            if outcome.success() {
                return Err(store_err.into());
            }
            warn!(
                cluster_id = %request.cluster.id,
                error = %store_err,
                "failed to record failure outcome"
            );
        }

        Ok(outcome)
    }

    /// The mutation pipeline: classify → issue → converge.
    async fn drive(&self, request: &MutationRequest) -> OrchestrateResult<()> {
        let (topology, plan) = classify(
            &self.control,
            &request.cluster,
            request.kind,
            request.force_failover,
        )
        .await?;

        let targets = watch_targets(self.control.caps(), &topology.cluster_id, &plan);

        let default_params = ModifyParams::default();
        let params = request.params.as_ref().unwrap_or(&default_params);
        issue(&self.control, &topology.cluster_id, &plan, params).await?;

        await_converged(&self.control, &targets, &self.policy).await?;
        info!(cluster_id = %topology.cluster_id, "cluster converged");
        Ok(())
    }

    /// Lightweight existence check: exactly one describe, no wait logic.
    pub async fn verify_exists(&self, cluster: &ClusterRef) -> OrchestrateResult<()> {
        self.control
            .describe_cluster(&cluster.id)
            .await
            .map(|_| ())
            .map_err(|e| match e {
                ControlError::NotFound(_) => OrchestrateError::NotFound {
                    cluster: cluster.id.clone(),
                },
                other => OrchestrateError::DescribeFailed {
                    target: cluster.id.clone(),
                    detail: other.to_string(),
                },
            })
    }

    /// Last-recorded outcome for a cluster, from the sink.
    pub fn last_recorded(&self, cluster_id: &str) -> OrchestrateResult<Option<OperationRecord>> {
        Ok(self.sink.last_outcome(cluster_id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use quiesce_control::sim::{SimControl, SimMember};
    use quiesce_state::{EngineKind, StoreError};

    struct FailingSink;

    impl OutcomeSink for FailingSink {
        fn record(&self, _record: &OperationRecord) -> StoreResult<()> {
            Err(StoreError::Write("disk full".to_string()))
        }

        fn last_outcome(&self, _cluster_id: &str) -> StoreResult<Option<OperationRecord>> {
            Ok(None)
        }
    }

    fn fast_policy() -> PollPolicy {
        PollPolicy::new(Duration::from_millis(1), 5)
    }

    #[tokio::test]
    async fn sink_failure_surfaces_only_for_successful_operations() {
        let sim = SimControl::new(EngineKind::DocumentCluster);
        sim.add_cluster("db-1", vec![SimMember::writer("db-1-a")]);
        sim.script_statuses("db-1-a", &["available"]);

        let orchestrator = Orchestrator::new(&sim, FailingSink).with_policy(fast_policy());
        let cluster = ClusterRef::new("db-1", EngineKind::DocumentCluster);

        let err = orchestrator.apply_reboot(&cluster, None).await.unwrap_err();
        assert!(matches!(err, OrchestrateError::Sink(_)));
    }

    #[tokio::test]
    async fn failed_operation_error_wins_over_sink_failure() {
        let sim = SimControl::new(EngineKind::DocumentCluster);
        sim.add_cluster("db-1", vec![SimMember::writer("db-1-a")]);
        sim.fail_mutations_on("db-1-a");

        let orchestrator = Orchestrator::new(&sim, FailingSink).with_policy(fast_policy());
        let cluster = ClusterRef::new("db-1", EngineKind::DocumentCluster);

        // The outcome is returned despite the sink failing too.
        let outcome = orchestrator.apply_reboot(&cluster, None).await.unwrap();
        assert!(!outcome.success());
        assert!(outcome.error_detail().unwrap().contains("db-1-a"));
    }

    #[tokio::test]
    async fn outcome_for_missing_cluster_names_it() {
        let sim = SimControl::new(EngineKind::RelationalCluster);
        let store = OutcomeStore::open_in_memory().unwrap();
        let orchestrator = Orchestrator::new(&sim, &store).with_policy(fast_policy());
        let cluster = ClusterRef::new("db-absent", EngineKind::RelationalCluster);

        let outcome = orchestrator.apply_reboot(&cluster, None).await.unwrap();
        assert!(!outcome.success());
        assert!(outcome.error_detail().unwrap().contains("db-absent"));

        // The failure was recorded in the sink.
        let record = store.last_outcome("db-absent").unwrap().unwrap();
        assert!(!record.outcome.success());
    }
}
