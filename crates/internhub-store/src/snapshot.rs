//! JSON snapshots of the whole store
//!
//! Written to a sibling temp file and renamed into place so a crash never
//! leaves a half-written snapshot behind.

use crate::store::Store;
use chrono::{DateTime, Utc};
use internhub_core::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::audit::{verify_chain, AuditEvent, IntegrityReport};

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub version: u32,
    pub taken_at: DateTime<Utc>,
    pub users: Vec<User>,
    pub universities: Vec<University>,
    pub departments: Vec<Department>,
    pub applications: Vec<Application>,
    pub students: Vec<Student>,
    pub interns: Vec<Intern>,
    pub submissions: Vec<Submission>,
    pub documents: Vec<Document>,
    pub events: Vec<AuditEvent>,
}

impl Snapshot {
    /// Parse a snapshot file without rebuilding the store
    pub fn read(path: &Path) -> DomainResult<Self> {
        let bytes = fs::read(path)
            .map_err(|e| DomainError::Storage(format!("read {}: {e}", path.display())))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| DomainError::Storage(format!("parse {}: {e}", path.display())))
    }

    /// Walk the stored audit chain
    #[must_use]
    pub fn verify_audit(&self) -> IntegrityReport {
        verify_chain(&self.events)
    }
}

impl Store {
    pub fn save_snapshot(&self, path: &Path) -> DomainResult<()> {
        let snapshot = self.snapshot();
        let json = serde_json::to_vec_pretty(&snapshot)
            .map_err(|e| DomainError::Internal(format!("serialize snapshot: {e}")))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, &json)?;
        fs::rename(&tmp, path)?;

        debug!(
            path = %path.display(),
            bytes = json.len(),
            events = snapshot.events.len(),
            "snapshot written"
        );
        Ok(())
    }

    /// Load a snapshot, or start empty when the file does not exist
    pub fn load_snapshot(path: &Path) -> DomainResult<Self> {
        if !path.exists() {
            info!(path = %path.display(), "no snapshot found, starting empty");
            return Ok(Self::new());
        }
        let snapshot = Snapshot::read(path)?;
        let store = Self::from_snapshot(snapshot)?;
        info!(path = %path.display(), stats = ?store.stats(), "snapshot loaded");
        Ok(store)
    }
}
