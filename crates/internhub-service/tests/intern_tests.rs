use internhub_core::*;
use internhub_service::interns::{InternFilter, InternUpdate};
use internhub_service::submissions::NewSubmission;
use internhub_service::users::NewUser;
use internhub_test_utils::Fixture;
use pretty_assertions::assert_eq;

fn report(title: &str) -> NewSubmission {
    NewSubmission {
        title: title.into(),
        description: None,
        kind: SubmissionKind::WeeklyReport,
        document_id: None,
    }
}

#[test]
fn test_visibility_by_role() {
    let fx = Fixture::new();
    let (intern, me) = fx.active_intern("ada@uot.test");
    let (_, other_uni) = fx.other_university();

    for p in [&fx.admin, &fx.university_user, &fx.supervisor, &me] {
        assert_eq!(fx.hub.interns().get(p, intern.id).unwrap().id, intern.id);
    }
    let err = fx.hub.interns().get(&other_uni, intern.id).unwrap_err();
    assert_eq!(err.code(), ErrorCode::Forbidden);

    let page = fx
        .hub
        .interns()
        .list(&other_uni, &InternFilter::default(), PageRequest::default());
    assert_eq!(page.total, 0);
}

#[test]
fn test_suspend_and_reinstate() {
    let fx = Fixture::new();
    let (intern, me) = fx.active_intern("ada@uot.test");

    let i = fx
        .hub
        .interns()
        .suspend(&fx.supervisor, intern.id, "missed two weeks")
        .unwrap();
    assert!(i.suspended);
    assert_eq!(i.suspension_reason.as_deref(), Some("missed two weeks"));

    let err = fx.hub.interns().suspend(&fx.admin, intern.id, "again").unwrap_err();
    assert_eq!(err.code(), ErrorCode::PreconditionFailed);

    // suspended interns cannot submit
    let err = fx.hub.submissions().create(&me, report("week 1")).unwrap_err();
    assert_eq!(err.code(), ErrorCode::PreconditionFailed);

    let i = fx.hub.interns().reinstate(&fx.supervisor, intern.id).unwrap();
    assert!(!i.suspended);
    assert_eq!(i.suspension_reason, None);

    let err = fx.hub.interns().reinstate(&fx.admin, intern.id).unwrap_err();
    assert_eq!(err.code(), ErrorCode::PreconditionFailed);
}

#[test]
fn test_unassigned_supervisor_cannot_suspend() {
    let fx = Fixture::new();
    let (intern, _) = fx.active_intern("ada@uot.test");
    let view = fx
        .hub
        .users()
        .create(
            &fx.admin,
            NewUser {
                email: "other.sup@internhub.test".into(),
                password: "sup-pass-2".into(),
                full_name: "Other".into(),
                role: Role::Supervisor,
                university_id: None,
            },
        )
        .unwrap();
    let other = Principal::new(view.id, Role::Supervisor);
    let err = fx.hub.interns().suspend(&other, intern.id, "no").unwrap_err();
    assert_eq!(err.code(), ErrorCode::Forbidden);
    let err = fx.hub.interns().suspend(&fx.university_user, intern.id, "no").unwrap_err();
    assert_eq!(err.code(), ErrorCode::Forbidden);
}

#[test]
fn test_complete_requires_reviewed_submissions() {
    let fx = Fixture::new();
    let (intern, me) = fx.active_intern("ada@uot.test");
    let submission = fx.hub.submissions().create(&me, report("final")).unwrap();

    let err = fx.hub.interns().complete(&fx.admin, intern.id).unwrap_err();
    assert_eq!(err.code(), ErrorCode::PreconditionFailed);

    fx.hub.submissions().start_review(&fx.supervisor, submission.id).unwrap();
    fx.hub.submissions().approve(&fx.supervisor, submission.id, None).unwrap();

    let done = fx.hub.interns().complete(&fx.admin, intern.id).unwrap();
    assert_eq!(done.status, InternStatus::Completed);
    assert!(done.completed_at.is_some());

    // the account is closed with the placement
    let user = fx.store().users.get(me.user_id).unwrap();
    assert!(!user.is_active);
}

#[test]
fn test_complete_refused_while_suspended() {
    let fx = Fixture::new();
    let (intern, _) = fx.active_intern("ada@uot.test");
    fx.hub.interns().suspend(&fx.admin, intern.id, "pause").unwrap();
    let err = fx.hub.interns().complete(&fx.admin, intern.id).unwrap_err();
    assert_eq!(err.code(), ErrorCode::PreconditionFailed);
    let i = fx.hub.interns().get(&fx.admin, intern.id).unwrap();
    assert_eq!(i.status, InternStatus::Active);
}

#[test]
fn test_terminate_is_final() {
    let fx = Fixture::new();
    let (intern, me) = fx.active_intern("ada@uot.test");
    let i = fx.hub.interns().terminate(&fx.admin, intern.id, "misconduct").unwrap();
    assert_eq!(i.status, InternStatus::Terminated);
    assert_eq!(i.termination_reason.as_deref(), Some("misconduct"));

    let err = fx.hub.interns().complete(&fx.admin, intern.id).unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidStatusTransition);
    let err = fx
        .hub
        .interns()
        .update(&fx.admin, intern.id, InternUpdate::default())
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::PreconditionFailed);

    // deactivated accounts no longer authenticate
    assert!(!fx.store().users.get(me.user_id).unwrap().is_active);
}

#[test]
fn test_update_validates_end_date() {
    let fx = Fixture::new();
    let (intern, _) = fx.active_intern("ada@uot.test");
    let err = fx
        .hub
        .interns()
        .update(
            &fx.admin,
            intern.id,
            InternUpdate {
                end_date: Some(intern.start_date.pred_opt().unwrap()),
                ..Default::default()
            },
        )
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::ValidationError);

    let later = internhub_test_utils::date(2026, 12, 31);
    let i = fx
        .hub
        .interns()
        .update(
            &fx.admin,
            intern.id,
            InternUpdate {
                end_date: Some(later),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(i.end_date, later);
}

#[test]
fn test_user_with_active_intern_cannot_be_deleted() {
    let fx = Fixture::new();
    let (_, me) = fx.active_intern("ada@uot.test");
    let err = fx.hub.users().delete(&fx.admin, me.user_id).unwrap_err();
    assert_eq!(err.code(), ErrorCode::PreconditionFailed);
}
