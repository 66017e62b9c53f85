//! Engine capability descriptors.
//!
//! One orchestration core serves every engine kind; what differs per
//! engine — which control calls exist, whether a native wait primitive
//! is available, how raw status strings normalize — is captured here
//! instead of in duplicated control flow.

use quiesce_state::{EngineKind, MemberStatus};

/// What the convergence waiter watches after a per-member fan-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvergeScope {
    /// Watch the cluster as a whole (one resource).
    Cluster,
    /// Watch each mutated member sequentially, in issuance order.
    PerMember,
}

/// Capabilities of one engine's control API.
#[derive(Debug, Clone)]
pub struct EngineCaps {
    pub kind: EngineKind,
    /// A native long-poll primitive exists for cluster-scoped waits.
    pub cluster_native_wait: bool,
    /// A native long-poll primitive exists for member-scoped waits.
    pub member_native_wait: bool,
    /// The engine exposes a cluster failover call.
    pub supports_failover: bool,
    /// What fan-out mutations converge on.
    pub converge_scope: ConvergeScope,
    /// Raw status strings that normalize to `Available`.
    available: &'static [&'static str],
    /// Raw status strings that normalize to `Failed` (terminal).
    failed: &'static [&'static str],
    /// Raw transitional status strings that normalize to `Pending`.
    transitional: &'static [&'static str],
}

const RELATIONAL_TRANSITIONAL: &[&str] = &[
    "creating",
    "modifying",
    "rebooting",
    "backing-up",
    "maintenance",
    "renaming",
    "resetting-master-credentials",
    "upgrading",
    "failing-over",
    "configuring-enhanced-monitoring",
    "storage-optimization",
];

const RELATIONAL_FAILED: &[&str] = &[
    "failed",
    "inaccessible-encryption-credentials",
    "incompatible-parameters",
    "incompatible-restore",
];

const GRAPH_TRANSITIONAL: &[&str] = &[
    "creating",
    "modifying",
    "rebooting",
    "backing-up",
    "maintenance",
    "renaming",
    "upgrading",
];

const GRAPH_FAILED: &[&str] = &["failed", "inaccessible-encryption-credentials"];

const DOCUMENT_TRANSITIONAL: &[&str] = &[
    "creating",
    "modifying",
    "rebooting",
    "backing-up",
    "maintenance",
    "upgrading",
];

const DOCUMENT_FAILED: &[&str] = &["failed"];

impl EngineCaps {
    /// Capability descriptor for an engine kind.
    pub fn for_kind(kind: EngineKind) -> Self {
        match kind {
            EngineKind::RelationalCluster => Self {
                kind,
                cluster_native_wait: true,
                member_native_wait: true,
                supports_failover: true,
                // The relational API waits on the cluster even after a
                // per-member reboot fan-out.
                converge_scope: ConvergeScope::Cluster,
                available: &["available"],
                failed: RELATIONAL_FAILED,
                transitional: RELATIONAL_TRANSITIONAL,
            },
            EngineKind::GraphCluster => Self {
                kind,
                cluster_native_wait: false,
                member_native_wait: true,
                supports_failover: false,
                converge_scope: ConvergeScope::PerMember,
                available: &["available"],
                failed: GRAPH_FAILED,
                transitional: GRAPH_TRANSITIONAL,
            },
            EngineKind::DocumentCluster => Self {
                kind,
                cluster_native_wait: false,
                member_native_wait: false,
                supports_failover: false,
                converge_scope: ConvergeScope::PerMember,
                available: &["available"],
                failed: DOCUMENT_FAILED,
                transitional: DOCUMENT_TRANSITIONAL,
            },
        }
    }

    /// Normalize an engine-reported status string.
    ///
    /// Unrecognized strings map to `Unknown`, which is non-terminal:
    /// the waiter keeps polling rather than failing on a status it has
    /// never seen.
    pub fn normalize(&self, raw: &str) -> MemberStatus {
        let raw = raw.trim().to_ascii_lowercase();
        if self.available.contains(&raw.as_str()) {
            MemberStatus::Available
        } else if self.failed.contains(&raw.as_str()) {
            MemberStatus::Failed
        } else if self.transitional.contains(&raw.as_str()) {
            MemberStatus::Pending
        } else {
            MemberStatus::Unknown
        }
    }
}
