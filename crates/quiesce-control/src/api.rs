//! The `ClusterControl` trait — describe, mutate, and wait calls.
//!
//! Implementations wrap one engine's control API. The orchestration
//! core is generic over this trait, so tests run against the in-memory
//! `sim::SimControl` and production code against a real client.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use quiesce_state::ModifyParams;

use crate::caps::EngineCaps;

/// Result type alias for control plane calls.
pub type ControlResult<T> = Result<T, ControlError>;

/// Transport-level errors from the control plane.
#[derive(Debug, Error)]
pub enum ControlError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("operation not supported by this engine: {0}")]
    Unsupported(&'static str),
}

/// One member instance as reported by a describe call. Statuses are the
/// engine's raw strings; normalization happens in the core via `EngineCaps`.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberDescription {
    pub id: String,
    pub is_writer: bool,
    pub status: String,
}

/// A cluster as reported by a describe call.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterDescription {
    pub id: String,
    /// Raw cluster-level status string.
    pub status: String,
    /// Members in the order the control API returns them. This order is
    /// load-bearing: failover target selection and fan-out issuance both
    /// follow it.
    pub members: Vec<MemberDescription>,
}

/// A resource the convergence waiter watches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchTarget {
    Cluster(String),
    Member(String),
}

impl WatchTarget {
    /// The watched resource's identifier.
    pub fn id(&self) -> &str {
        match self {
            WatchTarget::Cluster(id) | WatchTarget::Member(id) => id,
        }
    }
}

impl fmt::Display for WatchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WatchTarget::Cluster(id) => write!(f, "cluster {id}"),
            WatchTarget::Member(id) => write!(f, "instance {id}"),
        }
    }
}

/// Control plane operations for one engine kind.
///
/// Mutation calls are thin acks; convergence is observed separately via
/// `describe_*` polling or the native `wait_available` primitive where
/// `EngineCaps` says one exists.
#[allow(async_fn_in_trait)]
pub trait ClusterControl: Send + Sync {
    /// Capability descriptor for the engine behind this client.
    fn caps(&self) -> &EngineCaps;

    /// Describe a cluster and its member list.
    async fn describe_cluster(&self, id: &str) -> ControlResult<ClusterDescription>;

    /// Raw status of a single member instance.
    async fn describe_member(&self, id: &str) -> ControlResult<String>;

    /// Apply a config modification to the cluster as a whole.
    async fn modify_cluster(&self, id: &str, params: &ModifyParams) -> ControlResult<()>;

    /// Reboot one member instance, optionally hinting reboot-with-failover.
    async fn reboot_member(
        &self,
        id: &str,
        force_failover: Option<bool>,
    ) -> ControlResult<()>;

    /// Fail the cluster over to the given target instance.
    async fn failover_cluster(&self, id: &str, target: &str) -> ControlResult<()>;

    /// Provider-native blocking wait until the target is available.
    ///
    /// Only meaningful where `EngineCaps` advertises a native primitive
    /// for the target's scope; any error (deadline included) is a failure.
    async fn wait_available(&self, target: &WatchTarget, budget: Duration) -> ControlResult<()>;
}

// Shared references delegate, so callers can keep a handle on the client
// (e.g. a test double) while the orchestrator owns one too.
impl<T: ClusterControl + ?Sized> ClusterControl for &T {
    fn caps(&self) -> &EngineCaps {
        (**self).caps()
    }

    async fn describe_cluster(&self, id: &str) -> ControlResult<ClusterDescription> {
        (**self).describe_cluster(id).await
    }

    async fn describe_member(&self, id: &str) -> ControlResult<String> {
        (**self).describe_member(id).await
    }

    async fn modify_cluster(&self, id: &str, params: &ModifyParams) -> ControlResult<()> {
        (**self).modify_cluster(id, params).await
    }

    async fn reboot_member(&self, id: &str, force_failover: Option<bool>) -> ControlResult<()> {
        (**self).reboot_member(id, force_failover).await
    }

    async fn failover_cluster(&self, id: &str, target: &str) -> ControlResult<()> {
        (**self).failover_cluster(id, target).await
    }

    async fn wait_available(&self, target: &WatchTarget, budget: Duration) -> ControlResult<()> {
        (**self).wait_available(target, budget).await
    }
}
