//! Mutation issuance — applying a plan against the control API.
//!
//! Issuance order equals plan order, so repeated runs against an
//! unchanged topology produce identical call sequences. A fan-out aborts
//! on the first failed call; members already mutated stay mutated (no
//! compensation) and the error is surfaced without waiting on
//! convergence.

use tracing::debug;

use quiesce_control::ClusterControl;
use quiesce_state::ModifyParams;

use crate::classify::MutationPlan;
use crate::error::{OrchestrateError, OrchestrateResult};

/// Issue the planned mutation call(s).
pub async fn issue<C: ClusterControl>(
    control: &C,
    cluster_id: &str,
    plan: &MutationPlan,
    params: &ModifyParams,
) -> OrchestrateResult<()> {
    match plan {
        MutationPlan::SingleCall => {
            debug!(%cluster_id, "issuing cluster-level modify");
            control
                .modify_cluster(cluster_id, params)
                .await
                .map_err(|e| OrchestrateError::MutationFailed {
                    target: cluster_id.to_string(),
                    source: e,
                })
        }
        MutationPlan::Failover { target } => {
            debug!(%cluster_id, %target, "issuing failover");
            control
                .failover_cluster(cluster_id, target)
                .await
                .map_err(|e| OrchestrateError::MutationFailed {
                    target: cluster_id.to_string(),
                    source: e,
                })
        }
        MutationPlan::FanOut {
            targets,
            failover_hint,
        } => {
            for target in targets {
                debug!(%cluster_id, instance = %target, "issuing member reboot");
                control
                    .reboot_member(target, *failover_hint)
                    .await
                    .map_err(|e| OrchestrateError::MutationFailed {
                        target: target.clone(),
                        source: e,
                    })?;
            }
            Ok(())
        }
    }
}
