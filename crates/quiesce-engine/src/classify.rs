//! Topology classification — picking the mutation strategy.
//!
//! Given a fresh topology snapshot, decide whether a mutation is applied
//! as one cluster-level call, a single failover to a reader, or a
//! per-member fan-out. The decision is pure apart from the one describe
//! call that produces the snapshot.

use tracing::debug;

use quiesce_control::{ClusterControl, ControlError, EngineCaps};
use quiesce_state::{
    ClusterRef, InstanceId, MemberInstance, MemberRole, MemberStatus, MutationKind,
};

use crate::error::{OrchestrateError, OrchestrateResult};

/// Snapshot of a cluster's topology, normalized for one operation.
#[derive(Debug, Clone)]
pub struct Topology {
    pub cluster_id: String,
    /// Normalized cluster-level status.
    pub status: MemberStatus,
    /// Members in control-API list order.
    pub members: Vec<MemberInstance>,
}

/// How the requested mutation will be applied.
#[derive(Debug, Clone, PartialEq)]
pub enum MutationPlan {
    /// One cluster-level call (config modify).
    SingleCall,
    /// One failover call naming the chosen reader.
    Failover { target: InstanceId },
    /// One call per member, in list order.
    FanOut {
        targets: Vec<InstanceId>,
        /// Force-failover hint forwarded per instance, when set and the
        /// cluster actually has a failover target.
        failover_hint: Option<bool>,
    },
}

impl MutationPlan {
    /// Strategy tag for logging.
    pub fn strategy(&self) -> &'static str {
        match self {
            MutationPlan::SingleCall => "single-call",
            MutationPlan::Failover { .. } => "failover",
            MutationPlan::FanOut { .. } => "per-member-fan-out",
        }
    }
}

/// Fetch a fresh topology snapshot and decide how to apply the mutation.
pub async fn classify<C: ClusterControl>(
    control: &C,
    cluster: &ClusterRef,
    kind: MutationKind,
    force_failover: Option<bool>,
) -> OrchestrateResult<(Topology, MutationPlan)> {
    let description = control
        .describe_cluster(&cluster.id)
        .await
        .map_err(|e| match e {
            ControlError::NotFound(_) => OrchestrateError::NotFound {
                cluster: cluster.id.clone(),
            },
            other => OrchestrateError::DescribeFailed {
                target: cluster.id.clone(),
                detail: other.to_string(),
            },
        })?;

    let caps = control.caps();
    let members: Vec<MemberInstance> = description
        .members
        .iter()
        .map(|m| MemberInstance {
            id: m.id.clone(),
            role: if m.is_writer {
                MemberRole::Writer
            } else {
                MemberRole::Reader
            },
            status: caps.normalize(&m.status),
        })
        .collect();

    let topology = Topology {
        cluster_id: description.id,
        status: caps.normalize(&description.status),
        members,
    };

    let plan = match kind {
        MutationKind::ModifyConfig => MutationPlan::SingleCall,
        MutationKind::Reboot => plan_reboot(cluster, &topology, force_failover, caps)?,
        MutationKind::Failover => plan_failover(cluster, &topology)?,
    };

    debug!(
        cluster_id = %cluster.id,
        strategy = plan.strategy(),
        members = topology.members.len(),
        "mutation strategy selected"
    );

    Ok((topology, plan))
}

/// Reboot strategy: failover through a reader only when the cluster has
/// at least two members, a reader exists, the caller explicitly asked
/// for it, and the engine exposes a failover call. Everything else fans
/// out over all members in list order.
fn plan_reboot(
    cluster: &ClusterRef,
    topology: &Topology,
    force_failover: Option<bool>,
    caps: &EngineCaps,
) -> OrchestrateResult<MutationPlan> {
    if topology.members.is_empty() {
        return Err(OrchestrateError::EmptyTopology {
            cluster: cluster.id.clone(),
        });
    }

    let multi_member = topology.members.len() >= 2;
    let first_reader = topology.members.iter().find(|m| !m.is_writer());

    if multi_member && caps.supports_failover && force_failover == Some(true) {
        if let Some(reader) = first_reader {
            return Ok(MutationPlan::Failover {
                target: reader.id.clone(),
            });
        }
    }

    // A single-instance cluster has no failover target, and an engine
    // without a failover call cannot honor the hint either way.
    let failover_hint = if multi_member && caps.supports_failover {
        force_failover
    } else {
        None
    };

    Ok(MutationPlan::FanOut {
        targets: topology.members.iter().map(|m| m.id.clone()).collect(),
        failover_hint,
    })
}

/// Direct failover: target the first reader in list order. A cluster
/// with no reader has no eligible target.
fn plan_failover(cluster: &ClusterRef, topology: &Topology) -> OrchestrateResult<MutationPlan> {
    match topology.members.iter().find(|m| !m.is_writer()) {
        Some(reader) => Ok(MutationPlan::Failover {
            target: reader.id.clone(),
        }),
        None => Err(OrchestrateError::EmptyTopology {
            cluster: cluster.id.clone(),
        }),
    }
}
