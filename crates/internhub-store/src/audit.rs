//! Hash-chained audit log
//!
//! Every create, delete and status transition is appended here. Each event
//! commits to its predecessor through `prev_hash`, so rewriting history
//! anywhere in the chain is detected by [`EventLog::verify_integrity`].

use chrono::{DateTime, Utc};
use internhub_core::{DomainError, DomainResult, EntityKind, EventId, UserId, Workflow};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Stored audit event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    pub event_id: EventId,
    pub timestamp: DateTime<Utc>,
    pub actor: Option<UserId>,
    pub entity: EntityKind,
    pub entity_id: Uuid,
    pub action: String,
    pub from: Option<String>,
    pub to: Option<String>,
    pub detail: Option<String>,
    #[serde(with = "hex::serde")]
    pub prev_hash: [u8; 32],
    #[serde(with = "hex::serde")]
    pub hash: [u8; 32],
}

/// Event content before it is chained
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditRecord {
    pub actor: Option<UserId>,
    pub entity: EntityKind,
    pub entity_id: Uuid,
    pub action: String,
    pub from: Option<String>,
    pub to: Option<String>,
    pub detail: Option<String>,
}

impl AuditRecord {
    pub fn new(entity: EntityKind, entity_id: impl Into<Uuid>, action: impl Into<String>) -> Self {
        Self {
            actor: None,
            entity,
            entity_id: entity_id.into(),
            action: action.into(),
            from: None,
            to: None,
            detail: None,
        }
    }

    /// Status change record for any workflow
    pub fn transition<S: Workflow>(entity_id: impl Into<Uuid>, from: S, to: S) -> Self {
        let mut record = Self::new(S::ENTITY, entity_id, "transition");
        record.from = Some(from.to_string());
        record.to = Some(to.to_string());
        record
    }

    #[must_use]
    pub fn by(mut self, actor: UserId) -> Self {
        self.actor = Some(actor);
        self
    }

    #[must_use]
    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Audit query
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub entity: Option<EntityKind>,
    pub entity_id: Option<Uuid>,
    pub actor: Option<UserId>,
    pub limit: Option<usize>,
}

/// Result of walking the chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrityReport {
    pub valid: bool,
    pub events: usize,
    /// Index of the first broken event
    pub first_invalid: Option<usize>,
}

#[derive(Debug, Default)]
pub struct EventLog {
    inner: Mutex<Vec<AuditEvent>>,
}

impl EventLog {
    /// Restore a log from stored events; the chain must verify
    pub fn from_events(events: Vec<AuditEvent>) -> DomainResult<Self> {
        let report = verify_chain(&events);
        if !report.valid {
            return Err(DomainError::Storage(format!(
                "audit chain broken at event {}",
                report.first_invalid.unwrap_or_default()
            )));
        }
        Ok(Self {
            inner: Mutex::new(events),
        })
    }

    pub fn append(&self, record: AuditRecord) -> EventId {
        let mut guard = self.inner.lock();
        let prev_hash = guard.last().map(|e| e.hash).unwrap_or([0u8; 32]);
        let mut event = AuditEvent {
            event_id: EventId::new(),
            timestamp: Utc::now(),
            actor: record.actor,
            entity: record.entity,
            entity_id: record.entity_id,
            action: record.action,
            from: record.from,
            to: record.to,
            detail: record.detail,
            prev_hash,
            hash: [0u8; 32],
        };
        event.hash = compute_hash(&event);
        let id = event.event_id;
        guard.push(event);
        id
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.inner.lock().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Matching events, newest first
    pub fn query(&self, filter: &AuditFilter) -> Vec<AuditEvent> {
        let guard = self.inner.lock();
        guard
            .iter()
            .rev()
            .filter(|e| filter.entity.map_or(true, |k| e.entity == k))
            .filter(|e| filter.entity_id.map_or(true, |id| e.entity_id == id))
            .filter(|e| filter.actor.map_or(true, |a| e.actor == Some(a)))
            .take(filter.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }

    pub fn verify_integrity(&self) -> IntegrityReport {
        verify_chain(&self.inner.lock())
    }
}

pub(crate) fn verify_chain(events: &[AuditEvent]) -> IntegrityReport {
    let mut prev = [0u8; 32];
    for (i, e) in events.iter().enumerate() {
        if e.prev_hash != prev || e.hash != compute_hash(e) {
            return IntegrityReport {
                valid: false,
                events: events.len(),
                first_invalid: Some(i),
            };
        }
        prev = e.hash;
    }
    IntegrityReport {
        valid: true,
        events: events.len(),
        first_invalid: None,
    }
}

fn compute_hash(event: &AuditEvent) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(event.event_id.0.as_bytes());
    hasher.update(event.timestamp.timestamp_micros().to_le_bytes());
    hasher.update(event.actor.map(|a| *a.0.as_bytes()).unwrap_or([0u8; 16]));
    hasher.update(event.entity.as_str().as_bytes());
    hasher.update([0]);
    hasher.update(event.entity_id.as_bytes());
    for field in [
        Some(event.action.as_str()),
        event.from.as_deref(),
        event.to.as_deref(),
        event.detail.as_deref(),
    ] {
        hasher.update(field.unwrap_or_default().as_bytes());
        hasher.update([0]);
    }
    hasher.update(event.prev_hash);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use internhub_core::ApplicationStatus;

    fn sample_log() -> EventLog {
        let log = EventLog::default();
        let id = Uuid::new_v4();
        log.append(AuditRecord::new(EntityKind::Application, id, "create"));
        log.append(
            AuditRecord::transition(id, ApplicationStatus::Pending, ApplicationStatus::UnderReview)
                .by(UserId::new()),
        );
        log
    }

    #[test]
    fn chain_links_events() {
        let log = sample_log();
        let events = log.events();
        assert_eq!(events[0].prev_hash, [0u8; 32]);
        assert_eq!(events[1].prev_hash, events[0].hash);
        assert!(log.verify_integrity().valid);
    }

    #[test]
    fn tampering_is_detected() {
        let mut events = sample_log().events();
        events[0].action = "delete".into();
        let report = verify_chain(&events);
        assert!(!report.valid);
        assert_eq!(report.first_invalid, Some(0));
        assert!(EventLog::from_events(events).is_err());
    }

    #[test]
    fn query_is_newest_first_and_filtered() {
        let log = sample_log();
        let all = log.query(&AuditFilter::default());
        assert_eq!(all[0].action, "transition");
        assert_eq!(all[0].from.as_deref(), Some("PENDING"));

        let limited = log.query(&AuditFilter {
            limit: Some(1),
            ..Default::default()
        });
        assert_eq!(limited.len(), 1);

        let none = log.query(&AuditFilter {
            entity: Some(EntityKind::Intern),
            ..Default::default()
        });
        assert!(none.is_empty());
    }

    #[test]
    fn events_survive_json() {
        let log = sample_log();
        let json = serde_json::to_string(&log.events()).unwrap();
        let back: Vec<AuditEvent> = serde_json::from_str(&json).unwrap();
        assert!(EventLog::from_events(back).unwrap().verify_integrity().valid);
    }
}
