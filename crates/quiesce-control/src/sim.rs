//! Deterministic in-memory control plane (for testing).
//!
//! `SimControl` plays back scripted status sequences and records every
//! mutation call in issuance order, so tests can assert both the exact
//! call sequence and how many describes a convergence loop consumed.
//! Nothing here sleeps; time-dependent behavior is exercised through
//! the scripted sequences alone.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use quiesce_state::{EngineKind, MemberStatus, ModifyParams};

use crate::api::{
    ClusterControl, ClusterDescription, ControlError, ControlResult, MemberDescription,
    WatchTarget,
};
use crate::caps::EngineCaps;

/// A member of a simulated cluster.
#[derive(Debug, Clone)]
pub struct SimMember {
    pub id: String,
    pub is_writer: bool,
    pub status: String,
}

impl SimMember {
    /// A writer member reporting `available`.
    pub fn writer(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            is_writer: true,
            status: "available".to_string(),
        }
    }

    /// A reader member reporting `available`.
    pub fn reader(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            is_writer: false,
            status: "available".to_string(),
        }
    }

    /// Override the member's raw status string.
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }
}

/// One call the simulated control plane received.
#[derive(Debug, Clone, PartialEq)]
pub enum IssuedCall {
    Modify {
        cluster: String,
    },
    Reboot {
        instance: String,
        force_failover: Option<bool>,
    },
    Failover {
        cluster: String,
        target: String,
    },
    WaitAvailable {
        target: WatchTarget,
    },
}

#[derive(Default)]
struct SimState {
    clusters: HashMap<String, Vec<SimMember>>,
    /// Scripted describe results per resource id. The final entry
    /// repeats once the queue is drained down to it.
    statuses: HashMap<String, VecDeque<Result<String, String>>>,
    describe_counts: HashMap<String, usize>,
    calls: Vec<IssuedCall>,
    failing_mutations: HashSet<String>,
}

/// In-memory `ClusterControl` with scripted behavior.
pub struct SimControl {
    caps: EngineCaps,
    state: Mutex<SimState>,
}

impl SimControl {
    pub fn new(kind: EngineKind) -> Self {
        Self {
            caps: EngineCaps::for_kind(kind),
            state: Mutex::new(SimState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().expect("sim state lock poisoned")
    }

    /// Register a cluster with the given members (API list order).
    pub fn add_cluster(&self, id: impl Into<String>, members: Vec<SimMember>) {
        self.state().clusters.insert(id.into(), members);
    }

    /// Script the describe results for a resource (cluster or member).
    /// Each describe consumes one entry; the last entry repeats.
    pub fn script_statuses(&self, resource_id: impl Into<String>, statuses: &[&str]) {
        let queue = statuses
            .iter()
            .map(|s| Ok(s.to_string()))
            .collect::<VecDeque<_>>();
        self.state().statuses.insert(resource_id.into(), queue);
    }

    /// Append a describe error to a resource's scripted sequence.
    pub fn inject_describe_error(&self, resource_id: impl Into<String>, detail: &str) {
        self.state()
            .statuses
            .entry(resource_id.into())
            .or_default()
            .push_back(Err(detail.to_string()));
    }

    /// Make every mutation call against the given target fail.
    pub fn fail_mutations_on(&self, target_id: impl Into<String>) {
        self.state().failing_mutations.insert(target_id.into());
    }

    /// All mutation/wait calls received so far, in issuance order.
    pub fn calls(&self) -> Vec<IssuedCall> {
        self.state().calls.clone()
    }

    /// How many describes a resource has served.
    pub fn describe_count(&self, resource_id: &str) -> usize {
        self.state()
            .describe_counts
            .get(resource_id)
            .copied()
            .unwrap_or(0)
    }

    /// Unconsumed scripted entries for a resource. A convergence chain
    /// that aborted early leaves later resources' scripts untouched.
    pub fn remaining_script_len(&self, resource_id: &str) -> usize {
        self.state()
            .statuses
            .get(resource_id)
            .map(VecDeque::len)
            .unwrap_or(0)
    }

    /// Pop the next scripted status for a resource, repeating the final
    /// entry once the queue is down to one. `None` when nothing is scripted.
    fn next_status(state: &mut SimState, resource_id: &str) -> Option<Result<String, String>> {
        *state
            .describe_counts
            .entry(resource_id.to_string())
            .or_insert(0) += 1;
        let queue = state.statuses.get_mut(resource_id)?;
        match queue.len() {
            0 => None,
            1 => queue.front().cloned(),
            _ => queue.pop_front(),
        }
    }

    fn check_mutation(state: &SimState, target_id: &str) -> ControlResult<()> {
        if state.failing_mutations.contains(target_id) {
            return Err(ControlError::Transport(format!(
                "injected mutation failure for {target_id}"
            )));
        }
        Ok(())
    }
}

impl ClusterControl for SimControl {
    fn caps(&self) -> &EngineCaps {
        &self.caps
    }

    async fn describe_cluster(&self, id: &str) -> ControlResult<ClusterDescription> {
        let mut state = self.state();
        let members = state
            .clusters
            .get(id)
            .cloned()
            .ok_or_else(|| ControlError::NotFound(format!("cluster {id}")))?;

        let status = match Self::next_status(&mut state, id) {
            Some(Ok(status)) => status,
            Some(Err(detail)) => return Err(ControlError::Transport(detail)),
            None => "available".to_string(),
        };

        Ok(ClusterDescription {
            id: id.to_string(),
            status,
            members: members
                .into_iter()
                .map(|m| MemberDescription {
                    id: m.id,
                    is_writer: m.is_writer,
                    status: m.status,
                })
                .collect(),
        })
    }

    async fn describe_member(&self, id: &str) -> ControlResult<String> {
        let mut state = self.state();
        if let Some(scripted) = Self::next_status(&mut state, id) {
            return scripted.map_err(ControlError::Transport);
        }
        // Fall back to the registered member's static status.
        state
            .clusters
            .values()
            .flatten()
            .find(|m| m.id == id)
            .map(|m| m.status.clone())
            .ok_or_else(|| ControlError::NotFound(format!("instance {id}")))
    }

    async fn modify_cluster(&self, id: &str, _params: &ModifyParams) -> ControlResult<()> {
        let mut state = self.state();
        if !state.clusters.contains_key(id) {
            return Err(ControlError::NotFound(format!("cluster {id}")));
        }
        Self::check_mutation(&state, id)?;
        state.calls.push(IssuedCall::Modify {
            cluster: id.to_string(),
        });
        Ok(())
    }

    async fn reboot_member(&self, id: &str, force_failover: Option<bool>) -> ControlResult<()> {
        let mut state = self.state();
        Self::check_mutation(&state, id)?;
        state.calls.push(IssuedCall::Reboot {
            instance: id.to_string(),
            force_failover,
        });
        Ok(())
    }

    async fn failover_cluster(&self, id: &str, target: &str) -> ControlResult<()> {
        if !self.caps.supports_failover {
            return Err(ControlError::Unsupported("failover"));
        }
        let mut state = self.state();
        if !state.clusters.contains_key(id) {
            return Err(ControlError::NotFound(format!("cluster {id}")));
        }
        Self::check_mutation(&state, id)?;
        state.calls.push(IssuedCall::Failover {
            cluster: id.to_string(),
            target: target.to_string(),
        });
        Ok(())
    }

    async fn wait_available(&self, target: &WatchTarget, budget: Duration) -> ControlResult<()> {
        let mut state = self.state();
        state.calls.push(IssuedCall::WaitAvailable {
            target: target.clone(),
        });

        // Consume the scripted sequence the way the provider primitive
        // would: stop at available or a terminal failure; a sequence
        // stuck on a non-available final entry exhausts the budget.
        loop {
            let remaining = state
                .statuses
                .get(target.id())
                .map(VecDeque::len)
                .unwrap_or(0);
            match Self::next_status(&mut state, target.id()) {
                None => return Ok(()), // Unscripted resources are already stable.
                Some(Err(detail)) => return Err(ControlError::Transport(detail)),
                Some(Ok(raw)) => match self.caps.normalize(&raw) {
                    MemberStatus::Available => return Ok(()),
                    MemberStatus::Failed => {
                        return Err(ControlError::Transport(format!(
                            "{target} reached terminal status {raw:?}"
                        )));
                    }
                    MemberStatus::Pending | MemberStatus::Unknown => {
                        if remaining <= 1 {
                            return Err(ControlError::Transport(format!(
                                "{target} not available within {}s",
                                budget.as_secs()
                            )));
                        }
                    }
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn describe_missing_cluster_is_not_found() {
        let sim = SimControl::new(EngineKind::RelationalCluster);
        let err = sim.describe_cluster("db-absent").await.unwrap_err();
        assert!(matches!(err, ControlError::NotFound(_)));
    }

    #[tokio::test]
    async fn scripted_statuses_pop_and_final_repeats() {
        let sim = SimControl::new(EngineKind::RelationalCluster);
        sim.add_cluster("db-1", vec![SimMember::writer("db-1-a")]);
        sim.script_statuses("db-1", &["modifying", "available"]);

        assert_eq!(sim.describe_cluster("db-1").await.unwrap().status, "modifying");
        assert_eq!(sim.describe_cluster("db-1").await.unwrap().status, "available");
        // Final entry repeats.
        assert_eq!(sim.describe_cluster("db-1").await.unwrap().status, "available");
        assert_eq!(sim.describe_count("db-1"), 3);
    }

    #[tokio::test]
    async fn injected_describe_error_surfaces_as_transport() {
        let sim = SimControl::new(EngineKind::GraphCluster);
        sim.add_cluster("db-1", vec![SimMember::writer("db-1-a")]);
        sim.inject_describe_error("db-1", "connection reset");

        let err = sim.describe_cluster("db-1").await.unwrap_err();
        assert!(matches!(err, ControlError::Transport(_)));
    }

    #[tokio::test]
    async fn mutation_calls_are_recorded_in_order() {
        let sim = SimControl::new(EngineKind::RelationalCluster);
        sim.add_cluster("db-1", vec![SimMember::writer("db-1-a")]);

        sim.reboot_member("db-1-a", Some(false)).await.unwrap();
        sim.modify_cluster("db-1", &ModifyParams::default()).await.unwrap();

        assert_eq!(
            sim.calls(),
            vec![
                IssuedCall::Reboot {
                    instance: "db-1-a".to_string(),
                    force_failover: Some(false),
                },
                IssuedCall::Modify {
                    cluster: "db-1".to_string(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn failover_unsupported_on_graph_engine() {
        let sim = SimControl::new(EngineKind::GraphCluster);
        sim.add_cluster("db-1", vec![SimMember::writer("db-1-a")]);
        let err = sim.failover_cluster("db-1", "db-1-b").await.unwrap_err();
        assert!(matches!(err, ControlError::Unsupported("failover")));
    }

    #[tokio::test]
    async fn injected_mutation_failure() {
        let sim = SimControl::new(EngineKind::GraphCluster);
        sim.add_cluster("db-1", vec![SimMember::writer("db-1-a")]);
        sim.fail_mutations_on("db-1-a");
        let err = sim.reboot_member("db-1-a", None).await.unwrap_err();
        assert!(matches!(err, ControlError::Transport(_)));
    }

    #[tokio::test]
    async fn native_wait_consumes_script_until_available() {
        let sim = SimControl::new(EngineKind::RelationalCluster);
        sim.add_cluster("db-1", vec![SimMember::writer("db-1-a")]);
        sim.script_statuses("db-1", &["rebooting", "rebooting", "available"]);

        let target = WatchTarget::Cluster("db-1".to_string());
        sim.wait_available(&target, Duration::from_secs(60)).await.unwrap();
        assert_eq!(sim.describe_count("db-1"), 3);
    }

    #[tokio::test]
    async fn native_wait_fails_on_terminal_status() {
        let sim = SimControl::new(EngineKind::RelationalCluster);
        sim.add_cluster("db-1", vec![SimMember::writer("db-1-a")]);
        sim.script_statuses("db-1", &["rebooting", "failed"]);

        let target = WatchTarget::Cluster("db-1".to_string());
        let err = sim
            .wait_available(&target, Duration::from_secs(60))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("terminal status"));
    }

    #[tokio::test]
    async fn native_wait_exhausts_budget_on_stuck_status() {
        let sim = SimControl::new(EngineKind::RelationalCluster);
        sim.add_cluster("db-1", vec![SimMember::writer("db-1-a")]);
        sim.script_statuses("db-1", &["rebooting"]);

        let target = WatchTarget::Cluster("db-1".to_string());
        let err = sim
            .wait_available(&target, Duration::from_secs(60))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not available within"));
    }

    #[tokio::test]
    async fn describe_member_falls_back_to_registered_status() {
        let sim = SimControl::new(EngineKind::GraphCluster);
        sim.add_cluster(
            "db-1",
            vec![SimMember::writer("db-1-a").with_status("rebooting")],
        );
        assert_eq!(sim.describe_member("db-1-a").await.unwrap(), "rebooting");

        let err = sim.describe_member("db-9-z").await.unwrap_err();
        assert!(matches!(err, ControlError::NotFound(_)));
    }
}
