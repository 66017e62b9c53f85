//! quiesce-control — the cluster control plane seam.
//!
//! Defines the `ClusterControl` trait through which the orchestration
//! core issues describe/mutate/wait calls, the per-engine capability
//! descriptor that replaces per-engine copy-pasted control flow, the
//! client configuration (region/credential resolution), and a
//! deterministic in-memory control plane (`sim`) for tests.

pub mod api;
pub mod caps;
pub mod config;
pub mod sim;

pub use api::{
    ClusterControl, ClusterDescription, ControlError, ControlResult, MemberDescription,
    WatchTarget,
};
pub use caps::{ConvergeScope, EngineCaps};
pub use config::{ConfigError, ControlConfig};
