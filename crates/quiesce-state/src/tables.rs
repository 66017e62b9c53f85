//! redb table definitions for the outcome store.
//!
//! Each table uses `&str` keys and `&[u8]` values (JSON-serialized domain
//! types). History keys are composite `{cluster_id}:{seq}` with a
//! zero-padded sequence so a prefix scan yields recording order.

use redb::TableDefinition;

/// Latest operation record keyed by `{cluster_id}`.
pub const OUTCOMES: TableDefinition<&str, &[u8]> = TableDefinition::new("outcomes");

/// Append-only operation history keyed by `{cluster_id}:{seq}`.
pub const HISTORY: TableDefinition<&str, &[u8]> = TableDefinition::new("history");
