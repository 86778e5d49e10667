//! Ownership-based access policy
//!
//! Role guards decide *which operations* a principal may call; the checks
//! here decide *which rows*.

use internhub_core::*;
use internhub_store::Store;

/// May `p` see this intern (and its submissions)?
#[must_use]
pub fn can_view_intern(p: &Principal, intern: &Intern) -> bool {
    match p.role {
        Role::Admin => true,
        Role::University => p.university_id == Some(intern.university_id),
        Role::Supervisor => intern.supervisor_id == Some(p.user_id),
        Role::Intern => intern.user_id == p.user_id,
    }
}

/// May `p` review this intern's work or change its suspension?
#[must_use]
pub fn can_supervise_intern(p: &Principal, intern: &Intern) -> bool {
    match p.role {
        Role::Admin => true,
        Role::Supervisor => intern.supervisor_id == Some(p.user_id),
        Role::University | Role::Intern => false,
    }
}

pub fn require_view_intern(p: &Principal, intern: &Intern) -> DomainResult<()> {
    if can_view_intern(p, intern) {
        Ok(())
    } else {
        Err(DomainError::forbidden("no access to this intern"))
    }
}

pub fn require_supervise_intern(p: &Principal, intern: &Intern) -> DomainResult<()> {
    if can_supervise_intern(p, intern) {
        Ok(())
    } else {
        Err(DomainError::forbidden("not the supervisor of this intern"))
    }
}

/// The intern record of an INTERN principal
pub fn own_intern(store: &Store, p: &Principal) -> DomainResult<Intern> {
    if p.role != Role::Intern {
        return Err(DomainError::forbidden("only interns have an intern record"));
    }
    store
        .interns
        .list(|i| i.user_id == p.user_id)
        .into_iter()
        .next()
        .ok_or_else(|| DomainError::forbidden("account has no intern record"))
}

/// May `p` read or download this document?
#[must_use]
pub fn can_view_document(store: &Store, p: &Principal, doc: &Document) -> bool {
    if p.is_admin() || doc.uploaded_by == p.user_id {
        return true;
    }
    let linked_intern = doc.links.intern_id.and_then(|id| store.interns.find(id));
    match p.role {
        Role::Admin => true,
        Role::University => {
            doc.links.university_id.is_some() && doc.links.university_id == p.university_id
        }
        Role::Supervisor => linked_intern.is_some_and(|i| i.supervisor_id == Some(p.user_id)),
        Role::Intern => linked_intern.is_some_and(|i| i.user_id == p.user_id),
    }
}

/// Only the uploader or an admin may delete
#[must_use]
pub fn can_delete_document(p: &Principal, doc: &Document) -> bool {
    p.is_admin() || doc.uploaded_by == p.user_id
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn intern(university_id: UniversityId, supervisor: Option<UserId>, user: UserId) -> Intern {
        let d = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        Intern {
            id: InternId::new(),
            student_id: StudentId::new(),
            user_id: user,
            university_id,
            department_id: None,
            supervisor_id: supervisor,
            full_name: "Ada".into(),
            start_date: d,
            end_date: d,
            status: InternStatus::Active,
            suspended: false,
            suspension_reason: None,
            termination_reason: None,
            completed_at: None,
            timestamps: Timestamps::new(Utc::now()),
        }
    }

    #[test]
    fn intern_visibility_by_role() {
        let uni = UniversityId::new();
        let sup = UserId::new();
        let me = UserId::new();
        let i = intern(uni, Some(sup), me);

        assert!(can_view_intern(&Principal::new(UserId::new(), Role::Admin), &i));
        assert!(can_view_intern(
            &Principal::new(UserId::new(), Role::University).with_university(uni),
            &i
        ));
        assert!(!can_view_intern(
            &Principal::new(UserId::new(), Role::University).with_university(UniversityId::new()),
            &i
        ));
        assert!(can_view_intern(&Principal::new(sup, Role::Supervisor), &i));
        assert!(!can_view_intern(&Principal::new(UserId::new(), Role::Supervisor), &i));
        assert!(can_view_intern(&Principal::new(me, Role::Intern), &i));
        assert!(!can_view_intern(&Principal::new(UserId::new(), Role::Intern), &i));
    }

    #[test]
    fn universities_cannot_supervise() {
        let uni = UniversityId::new();
        let i = intern(uni, None, UserId::new());
        let p = Principal::new(UserId::new(), Role::University).with_university(uni);
        assert!(!can_supervise_intern(&p, &i));
        assert!(require_supervise_intern(&p, &i).is_err());
    }

    #[test]
    fn document_visibility_follows_links() {
        let store = Store::new();
        let uni = UniversityId::new();
        let sup = UserId::new();
        let me = UserId::new();
        let i = intern(uni, Some(sup), me);
        store.interns.insert(i.clone()).unwrap();

        let doc = Document {
            id: DocumentId::new(),
            uploaded_by: UserId::new(),
            original_name: "r.pdf".into(),
            stored_name: "x-r.pdf".into(),
            content_type: "application/pdf".into(),
            size_bytes: 1,
            checksum: String::new(),
            storage_key: "k".into(),
            category: DocumentCategory::Report,
            links: DocumentLinks {
                university_id: Some(uni),
                intern_id: Some(i.id),
                ..Default::default()
            },
            notes: None,
            timestamps: Timestamps::new(Utc::now()),
        };

        assert!(can_view_document(&store, &Principal::new(sup, Role::Supervisor), &doc));
        assert!(can_view_document(&store, &Principal::new(me, Role::Intern), &doc));
        assert!(can_view_document(
            &store,
            &Principal::new(UserId::new(), Role::University).with_university(uni),
            &doc
        ));
        assert!(!can_view_document(&store, &Principal::new(UserId::new(), Role::Intern), &doc));
        assert!(!can_delete_document(&Principal::new(me, Role::Intern), &doc));
        assert!(can_delete_document(&Principal::new(doc.uploaded_by, Role::University), &doc));
    }
}
