//! Mutation orchestration engine for managed database clusters.
//!
//! Drives mutating operations (config modify, reboot, failover) against
//! a cluster and blocks until the cluster has converged back to a stable
//! state, then records the outcome.
//!
//! ```text
//!   MutationRequest
//!        │
//!        ▼
//!   ┌──────────┐   fresh topology    ┌─────────┐
//!   │ classify │ ──────────────────▶ │  issue  │
//!   └──────────┘   MutationPlan      └─────────┘
//!                                         │ calls, in plan order
//!                                         ▼
//!                                    ┌──────────┐
//!                                    │ converge │ native wait / polling
//!                                    └──────────┘
//!                                         │
//!                                         ▼
//!                                   OutcomeSink (redb)
//! ```
//!
//! The pipeline is strictly sequential with no internal retry; callers
//! re-drive a failed operation by applying it again. Engine differences
//! (which waits are native, whether failover exists, what to watch
//! during a fan-out) live in [`quiesce_control::EngineCaps`], not here.

pub mod classify;
pub mod converge;
pub mod error;
pub mod issue;
pub mod orchestrator;

pub use classify::{classify, MutationPlan, Topology};
pub use converge::{await_converged, watch_targets, PollPolicy};
pub use error::{OrchestrateError, OrchestrateResult};
pub use issue::issue;
pub use orchestrator::{Orchestrator, OutcomeSink};
