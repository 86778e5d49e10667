use crate::audit::{AuditRecord, EventLog};
use crate::snapshot::{Snapshot, SNAPSHOT_VERSION};
use crate::table::Table;
use chrono::Utc;
use internhub_core::*;
use parking_lot::{Mutex, MutexGuard};
use serde::{Deserialize, Serialize};

/// All tables plus the audit log
#[derive(Debug, Default)]
pub struct Store {
    pub users: Table<User>,
    pub universities: Table<University>,
    pub departments: Table<Department>,
    pub applications: Table<Application>,
    pub students: Table<Student>,
    pub interns: Table<Intern>,
    pub submissions: Table<Submission>,
    pub documents: Table<Document>,
    audit: EventLog,
    writer: Mutex<()>,
}

/// Live row counts, for start-up logging
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub users: usize,
    pub universities: usize,
    pub departments: usize,
    pub applications: usize,
    pub students: usize,
    pub interns: usize,
    pub submissions: usize,
    pub documents: usize,
    pub audit_events: usize,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exclusive writer guard.
    ///
    /// Held for the whole of a multi-step mutation so guard checks and the
    /// writes they protect see the same state. Not reentrant.
    pub fn writer(&self) -> MutexGuard<'_, ()> {
        self.writer.lock()
    }

    pub fn audit(&self) -> &EventLog {
        &self.audit
    }

    /// Append an audit record
    pub fn record(&self, record: AuditRecord) -> EventId {
        self.audit.append(record)
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            users: self.users.len(),
            universities: self.universities.len(),
            departments: self.departments.len(),
            applications: self.applications.len(),
            students: self.students.len(),
            interns: self.interns.len(),
            submissions: self.submissions.len(),
            documents: self.documents.len(),
            audit_events: self.audit.len(),
        }
    }

    /// Consistent copy of every table
    pub fn snapshot(&self) -> Snapshot {
        let _guard = self.writer();
        Snapshot {
            version: SNAPSHOT_VERSION,
            taken_at: Utc::now(),
            users: self.users.rows(),
            universities: self.universities.rows(),
            departments: self.departments.rows(),
            applications: self.applications.rows(),
            students: self.students.rows(),
            interns: self.interns.rows(),
            submissions: self.submissions.rows(),
            documents: self.documents.rows(),
            events: self.audit.events(),
        }
    }

    /// Rebuild a store; fails on unknown versions, duplicate ids or a broken audit chain
    pub fn from_snapshot(snapshot: Snapshot) -> DomainResult<Self> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(DomainError::Storage(format!(
                "unsupported snapshot version {} (expected {SNAPSHOT_VERSION})",
                snapshot.version
            )));
        }
        Ok(Self {
            users: Table::from_rows(snapshot.users)?,
            universities: Table::from_rows(snapshot.universities)?,
            departments: Table::from_rows(snapshot.departments)?,
            applications: Table::from_rows(snapshot.applications)?,
            students: Table::from_rows(snapshot.students)?,
            interns: Table::from_rows(snapshot.interns)?,
            submissions: Table::from_rows(snapshot.submissions)?,
            documents: Table::from_rows(snapshot.documents)?,
            audit: EventLog::from_events(snapshot.events)?,
            writer: Mutex::new(()),
        })
    }
}
