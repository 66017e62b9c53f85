//! quiesce-state — domain types and the mutation outcome store.
//!
//! Holds the shared vocabulary of the orchestration core (cluster
//! references, member instances, mutation requests and outcomes) and an
//! embedded [redb](https://docs.rs/redb)-backed store that persists the
//! last-known outcome per cluster plus an append-only operation history.
//!
//! # Architecture
//!
//! All persisted types are JSON-serialized into redb's `&[u8]` value
//! columns. The latest outcome is keyed by `{cluster_id}`; history entries
//! use composite `{cluster_id}:{seq}` keys so a prefix scan returns them
//! in recording order.
//!
//! The `OutcomeStore` is `Clone` + `Send` + `Sync` (backed by
//! `Arc<Database>`) and can be shared across async tasks.

pub mod error;
pub mod store;
pub mod tables;
pub mod types;

pub use error::{StoreError, StoreResult};
pub use store::OutcomeStore;
pub use types::*;
