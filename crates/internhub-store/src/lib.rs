//! InternHub Store
//!
//! In-memory persistence for the platform:
//! - One [`Table`] per entity with soft delete
//! - A writer guard that serializes multi-step mutations
//! - A hash-chained audit log of creates, deletes and status transitions
//! - Versioned JSON snapshots for durability across restarts

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod audit;
pub mod snapshot;
pub mod store;
pub mod table;

pub use audit::{AuditEvent, AuditFilter, AuditRecord, EventLog, IntegrityReport};
pub use snapshot::{Snapshot, SNAPSHOT_VERSION};
pub use store::{Store, StoreStats};
pub use table::Table;
