use chrono::Utc;
use internhub_core::*;
use internhub_store::{AuditFilter, AuditRecord, Store};
use std::sync::Arc;
use std::thread;

fn department(name: &str) -> Department {
    Department {
        id: DepartmentId::new(),
        name: name.to_string(),
        description: None,
        supervisor_id: None,
        timestamps: Timestamps::new(Utc::now()),
    }
}

#[test]
fn test_writer_guard_serializes_check_then_insert() {
    let store = Arc::new(Store::new());
    let mut handles = Vec::new();

    for _ in 0..16 {
        let store = Arc::clone(&store);
        handles.push(thread::spawn(move || {
            let _guard = store.writer();
            if !store.departments.any(|d| d.name == "Finance") {
                store.departments.insert(department("Finance")).unwrap();
            }
        }));
    }
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(store.departments.count(|d| d.name == "Finance"), 1);
}

#[test]
fn test_concurrent_audit_appends_keep_chain_valid() {
    let store = Arc::new(Store::new());
    let mut handles = Vec::new();

    for t in 0..8 {
        let store = Arc::clone(&store);
        handles.push(thread::spawn(move || {
            for i in 0..50 {
                store.record(
                    AuditRecord::new(EntityKind::Department, DepartmentId::new(), "create")
                        .detail(format!("{t}-{i}")),
                );
            }
        }));
    }
    for h in handles {
        h.join().unwrap();
    }

    let report = store.audit().verify_integrity();
    assert!(report.valid);
    assert_eq!(report.events, 400);
}

#[test]
fn test_snapshot_preserves_deleted_rows() {
    let store = Store::new();
    let d = department("Legal");
    let id = store.departments.insert(d).unwrap();
    store.departments.soft_delete(id, Utc::now()).unwrap();
    store.record(AuditRecord::new(EntityKind::Department, id, "delete"));

    let restored = Store::from_snapshot(store.snapshot()).unwrap();
    assert!(restored.departments.get(id).is_err());
    assert!(restored.departments.get_including_deleted(id).is_some());

    let events = restored.audit().query(&AuditFilter {
        entity_id: Some(id.into()),
        ..Default::default()
    });
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].action, "delete");
}

mod props {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_any_history_verifies(actions in proptest::collection::vec("[a-z_]{1,12}", 0..40)) {
            let store = Store::new();
            for action in &actions {
                store.record(AuditRecord::new(
                    EntityKind::Department,
                    DepartmentId::new(),
                    action.clone(),
                ));
            }
            let report = store.audit().verify_integrity();
            prop_assert!(report.valid);
            prop_assert_eq!(report.events, actions.len());
            prop_assert_eq!(report.first_invalid, None);
        }

        #[test]
        fn prop_query_limit_is_respected(n in 0usize..30, limit in 1usize..10) {
            let store = Store::new();
            for _ in 0..n {
                store.record(AuditRecord::new(EntityKind::User, UserId::new(), "create"));
            }
            let events = store.audit().query(&AuditFilter {
                limit: Some(limit),
                ..Default::default()
            });
            prop_assert_eq!(events.len(), n.min(limit));
        }
    }
}
