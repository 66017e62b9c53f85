//! Domain types for cluster mutation orchestration.
//!
//! These types describe managed database clusters, their member
//! instances, the mutations issued against them, and the outcomes that
//! get persisted. Topology types (`ClusterRef`, `MemberInstance`) are
//! read fresh from the control plane at the start of every operation and
//! never cached across operations.

use serde::{Deserialize, Serialize};

/// Control-plane identifier of a cluster.
pub type ClusterId = String;

/// Identifier of an individually addressable member instance.
pub type InstanceId = String;

// ── Cluster topology ──────────────────────────────────────────────

/// Which managed database engine a cluster runs.
///
/// The engine kind selects the control API variant, the stability
/// predicate, and the convergence mode (native wait vs manual polling).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    RelationalCluster,
    GraphCluster,
    DocumentCluster,
}

/// Reference to a managed cluster, fixed for the lifetime of one operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterRef {
    /// Control-plane identifier (required, immutable per operation).
    pub id: ClusterId,
    /// Optional region override for this operation.
    pub region: Option<String>,
    /// Engine kind of the cluster.
    pub engine: EngineKind,
}

impl ClusterRef {
    /// Create a reference with no region override.
    pub fn new(id: impl Into<String>, engine: EngineKind) -> Self {
        Self {
            id: id.into(),
            region: None,
            engine,
        }
    }
}

/// Role of a member instance within its cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberRole {
    Writer,
    Reader,
}

/// Normalized member/cluster status.
///
/// Engine-reported status strings are mapped into this enum by the
/// engine capability descriptor. `Unknown` covers unrecognized strings
/// and is treated as non-terminal (polling continues).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberStatus {
    Pending,
    Available,
    Failed,
    Unknown,
}

impl MemberStatus {
    /// Whether this status is terminal (no further polling).
    pub fn is_terminal(self) -> bool {
        matches!(self, MemberStatus::Available | MemberStatus::Failed)
    }
}

/// A member instance as observed in a fresh topology snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberInstance {
    pub id: InstanceId,
    pub role: MemberRole,
    pub status: MemberStatus,
}

impl MemberInstance {
    /// Whether this member is the cluster writer.
    pub fn is_writer(&self) -> bool {
        self.role == MemberRole::Writer
    }
}

// ── Mutations ─────────────────────────────────────────────────────

/// Kind of mutating operation issued against a cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    ModifyConfig,
    Reboot,
    Failover,
}

/// Optional parameters for a config modification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModifyParams {
    /// Cluster/instance parameter group to attach.
    pub parameter_group: Option<String>,
    /// Option group to attach (relational instances only).
    pub option_group: Option<String>,
    /// Log export types to enable.
    pub log_exports: Option<Vec<String>>,
    /// Apply the change immediately instead of in the next window.
    pub apply_immediately: Option<bool>,
}

/// A requested mutation against one cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationRequest {
    pub cluster: ClusterRef,
    pub kind: MutationKind,
    /// Config parameters (modify-config only).
    pub params: Option<ModifyParams>,
    /// Reboot-through-failover preference. `None` means unset.
    pub force_failover: Option<bool>,
}

// ── Outcomes ──────────────────────────────────────────────────────

/// Result of one mutation operation, immutable once produced.
///
/// Invariant, enforced by the constructors: a successful outcome always
/// carries a non-empty timestamp and no error detail; a failed outcome
/// carries a non-empty error detail and no timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationOutcome {
    success: bool,
    /// RFC 3339 timestamp, set only on success.
    completed_at: Option<String>,
    /// Error detail, set only on failure.
    error: Option<String>,
}

impl MutationOutcome {
    /// Build a successful outcome carrying the completion timestamp.
    pub fn succeeded(completed_at: impl Into<String>) -> Self {
        Self {
            success: true,
            completed_at: Some(completed_at.into()),
            error: None,
        }
    }

    /// Build a failed outcome carrying the error detail.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            completed_at: None,
            error: Some(error.into()),
        }
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn completed_at(&self) -> Option<&str> {
        self.completed_at.as_deref()
    }

    pub fn error_detail(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// Persisted envelope for one recorded operation outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationRecord {
    pub cluster_id: ClusterId,
    pub kind: MutationKind,
    pub outcome: MutationOutcome,
    /// Unix timestamp (seconds) when the record was written.
    pub recorded_at: u64,
}

/// Current Unix time in seconds.
pub fn epoch_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
