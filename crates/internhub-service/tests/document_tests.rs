use async_trait::async_trait;
use chrono::{Duration, Utc};
use internhub_core::*;
use internhub_service::documents::{DocumentFilter, Upload};
use internhub_service::submissions::{NewSubmission, SubmissionUpdate};
use internhub_service::universities::NewUniversity;
use internhub_service::{BlobStore, InternHub, Settings, TokenSigner};
use internhub_store::Store;
use internhub_test_utils::Fixture;
use mockall::mock;
use mockall::predicate::*;
use pretty_assertions::assert_eq;
use std::sync::Arc;

mock! {
    pub Blobs {}

    #[async_trait]
    impl BlobStore for Blobs {
        async fn put(&self, key: &str, bytes: &[u8]) -> DomainResult<()>;
        async fn get(&self, key: &str) -> DomainResult<Vec<u8>>;
        async fn delete(&self, key: &str) -> DomainResult<()>;
    }
}

fn pdf(name: &str, links: DocumentLinks) -> Upload {
    Upload {
        original_name: name.into(),
        content_type: "application/pdf".into(),
        bytes: b"%PDF-1.7 test".to_vec(),
        category: DocumentCategory::Cv,
        links,
        notes: None,
    }
}

/// Removes every university while the content is being written
struct UniversityVanishesDuringPut {
    store: Arc<Store>,
}

#[async_trait]
impl BlobStore for UniversityVanishesDuringPut {
    async fn put(&self, _key: &str, _bytes: &[u8]) -> DomainResult<()> {
        for university in self.store.universities.list(|_| true) {
            self.store.universities.soft_delete(university.id, Utc::now())?;
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> DomainResult<Vec<u8>> {
        Err(DomainError::Storage(format!("no content for {key}")))
    }

    async fn delete(&self, _key: &str) -> DomainResult<()> {
        Ok(())
    }
}

fn hub_with(blobs: MockBlobs) -> (InternHub, Principal) {
    let hub = InternHub::new(
        Arc::new(Store::new()),
        Arc::new(blobs),
        TokenSigner::generate(Duration::hours(1)),
        Settings::default().with_password_rounds(1),
    );
    let admin = hub
        .auth()
        .bootstrap_admin("admin@internhub.test", "admin-pass-1")
        .unwrap()
        .unwrap();
    let principal = Principal::new(admin.id, Role::Admin);
    (hub, principal)
}

#[tokio::test]
async fn test_upload_fills_links_and_scopes_access() {
    let fx = Fixture::new();
    let app = fx.pending_application();
    let student = fx.add_student(app.id, "a@uot.test");

    let doc = fx
        .hub
        .documents()
        .upload(
            &fx.university_user,
            pdf("../../My CV.pdf", DocumentLinks {
                student_id: Some(student.id),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
    assert_eq!(doc.links.application_id, Some(app.id));
    assert_eq!(doc.links.university_id, Some(fx.university.id));
    assert_eq!(doc.original_name, "../../My CV.pdf");
    assert_eq!(doc.stored_name, format!("{}-My_CV.pdf", doc.id));
    assert!(doc.storage_key.starts_with("documents/"));
    assert!(doc.storage_key.ends_with(&doc.stored_name));
    assert_eq!(doc.size_bytes, 13);

    let download = fx.hub.documents().download(&fx.admin, doc.id).await.unwrap();
    assert_eq!(download.bytes, b"%PDF-1.7 test");

    let (_, other) = fx.other_university();
    let err = fx.hub.documents().get(&other, doc.id).unwrap_err();
    assert_eq!(err.code(), ErrorCode::Forbidden);
    let page = fx
        .hub
        .documents()
        .list(&other, &DocumentFilter::default(), PageRequest::default());
    assert_eq!(page.total, 0);
}

#[tokio::test]
async fn test_upload_validation() {
    let fx = Fixture::new();
    let docs = fx.hub.documents();

    let mut empty = pdf("a.pdf", DocumentLinks::default());
    empty.bytes.clear();
    assert_eq!(
        docs.upload(&fx.admin, empty).await.unwrap_err().code(),
        ErrorCode::ValidationError
    );

    let mut huge = pdf("a.pdf", DocumentLinks::default());
    huge.bytes = vec![0; (fx.hub.settings().max_upload_bytes + 1) as usize];
    assert_eq!(
        docs.upload(&fx.admin, huge).await.unwrap_err(),
        DomainError::PayloadTooLarge {
            limit: fx.hub.settings().max_upload_bytes
        }
    );

    let mut html = pdf("a.html", DocumentLinks::default());
    html.content_type = "text/html".into();
    assert_eq!(
        docs.upload(&fx.admin, html).await.unwrap_err().code(),
        ErrorCode::UnsupportedMediaType
    );
}

#[tokio::test]
async fn test_inconsistent_links_are_rejected() {
    let fx = Fixture::new();
    let app = fx.pending_application();
    let student = fx.add_student(app.id, "a@uot.test");
    let (other, _) = fx.other_university();

    let err = fx
        .hub
        .documents()
        .upload(
            &fx.admin,
            pdf("cv.pdf", DocumentLinks {
                student_id: Some(student.id),
                university_id: Some(other.id),
                ..Default::default()
            }),
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::ValidationError);

    let err = fx
        .hub
        .documents()
        .upload(
            &fx.admin,
            pdf("cv.pdf", DocumentLinks {
                student_id: Some(StudentId::new()),
                ..Default::default()
            }),
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotFound);
}

#[tokio::test]
async fn test_tampered_content_fails_download() {
    let fx = Fixture::new();
    let doc = fx
        .hub
        .documents()
        .upload(&fx.admin, pdf("a.pdf", DocumentLinks::default()))
        .await
        .unwrap();
    std::fs::write(fx.blob_dir().join(&doc.storage_key), b"tampered").unwrap();

    let err = fx.hub.documents().download(&fx.admin, doc.id).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::StorageError);
}

#[tokio::test]
async fn test_intern_report_attached_to_submission() {
    let fx = Fixture::new();
    let (intern, me) = fx.active_intern("ada@uot.test");
    let (_, bob) = fx.active_intern("bob@uot.test");

    let mut upload = pdf("week1.pdf", DocumentLinks::default());
    upload.category = DocumentCategory::Report;
    let doc = fx.hub.documents().upload(&me, upload).await.unwrap();
    assert_eq!(doc.links.intern_id, Some(intern.id));
    assert_eq!(doc.links.university_id, Some(fx.university.id));

    // the assigned supervisor reads it, another intern does not
    fx.hub.documents().download(&fx.supervisor, doc.id).await.unwrap();
    assert_eq!(
        fx.hub.documents().get(&bob, doc.id).unwrap_err().code(),
        ErrorCode::Forbidden
    );

    // bob may not attach ada's document
    let stolen = NewSubmission {
        title: "mine".into(),
        description: None,
        kind: SubmissionKind::WeeklyReport,
        document_id: Some(doc.id),
    };
    assert_eq!(
        fx.hub.submissions().create(&bob, stolen.clone()).unwrap_err().code(),
        ErrorCode::Forbidden
    );

    let submission = fx.hub.submissions().create(&me, stolen).unwrap();
    let doc = fx.hub.documents().get(&me, doc.id).unwrap();
    assert_eq!(doc.links.submission_id, Some(submission.id));

    let err = fx.hub.documents().delete(&me, doc.id).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::PreconditionFailed);
}

#[tokio::test]
async fn test_swapping_the_attachment_moves_the_submission_link() {
    let fx = Fixture::new();
    let (_, me) = fx.active_intern("ada@uot.test");
    let docs = fx.hub.documents();
    let first = docs.upload(&me, pdf("draft.pdf", DocumentLinks::default())).await.unwrap();
    let second = docs.upload(&me, pdf("final.pdf", DocumentLinks::default())).await.unwrap();

    let submission = fx
        .hub
        .submissions()
        .create(
            &me,
            NewSubmission {
                title: "week 1".into(),
                description: None,
                kind: SubmissionKind::WeeklyReport,
                document_id: Some(first.id),
            },
        )
        .unwrap();
    fx.hub
        .submissions()
        .update(
            &me,
            submission.id,
            SubmissionUpdate {
                document_id: Some(second.id),
                ..Default::default()
            },
        )
        .unwrap();

    let filter = DocumentFilter {
        submission_id: Some(submission.id),
        ..Default::default()
    };
    let linked = docs.list(&me, &filter, PageRequest::default());
    assert_eq!(linked.total, 1);
    assert_eq!(linked.items[0].id, second.id);
    assert_eq!(docs.get(&me, first.id).unwrap().links.submission_id, None);

    // the detached draft is no longer held by the submission
    docs.delete(&me, first.id).await.unwrap();
}

#[tokio::test]
async fn test_link_removed_during_upload_is_refused() {
    let store = Arc::new(Store::new());
    let hub = InternHub::new(
        Arc::clone(&store),
        Arc::new(UniversityVanishesDuringPut {
            store: Arc::clone(&store),
        }),
        TokenSigner::generate(Duration::hours(1)),
        Settings::default().with_password_rounds(1),
    );
    let admin = hub
        .auth()
        .bootstrap_admin("admin@internhub.test", "admin-pass-1")
        .unwrap()
        .unwrap();
    let admin = Principal::new(admin.id, Role::Admin);
    let university = hub
        .universities()
        .create(
            &admin,
            NewUniversity {
                name: "Short Lived".into(),
                code: "slu".into(),
                country: "Kenya".into(),
                contact_email: "office@slu.test".into(),
                contact_phone: None,
                address: None,
            },
        )
        .unwrap();

    let links = DocumentLinks {
        university_id: Some(university.id),
        ..Default::default()
    };
    let err = hub.documents().upload(&admin, pdf("mou.pdf", links)).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotFound);
    assert_eq!(store.documents.len(), 0);
}

#[tokio::test]
async fn test_failed_blob_write_leaves_no_row() {
    let mut blobs = MockBlobs::new();
    blobs
        .expect_put()
        .times(1)
        .returning(|_, _| Err(DomainError::Storage("disk full".into())));
    let (hub, admin) = hub_with(blobs);

    let err = hub
        .documents()
        .upload(&admin, pdf("a.pdf", DocumentLinks::default()))
        .await
        .unwrap_err();
    assert_eq!(err, DomainError::Storage("disk full".into()));
    assert!(hub.store().documents.is_empty());
}

#[tokio::test]
async fn test_delete_removes_content() {
    let mut blobs = MockBlobs::new();
    blobs.expect_put().times(1).returning(|_, _| Ok(()));
    blobs
        .expect_delete()
        .withf(|key| key.starts_with("documents/") && key.ends_with("-a.pdf"))
        .times(1)
        .returning(|_| Ok(()));
    let (hub, admin) = hub_with(blobs);

    let doc = hub
        .documents()
        .upload(&admin, pdf("a.pdf", DocumentLinks::default()))
        .await
        .unwrap();
    hub.documents().delete(&admin, doc.id).await.unwrap();
    assert_eq!(
        hub.documents().get(&admin, doc.id).unwrap_err().code(),
        ErrorCode::NotFound
    );
}

#[tokio::test]
async fn test_download_detects_checksum_mismatch() {
    let mut blobs = MockBlobs::new();
    blobs.expect_put().returning(|_, _| Ok(()));
    blobs
        .expect_get()
        .with(always())
        .returning(|_| Ok(b"something else".to_vec()));
    let (hub, admin) = hub_with(blobs);

    let doc = hub
        .documents()
        .upload(&admin, pdf("a.pdf", DocumentLinks::default()))
        .await
        .unwrap();
    let err = hub.documents().download(&admin, doc.id).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::StorageError);
}
