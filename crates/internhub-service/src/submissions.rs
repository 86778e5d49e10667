//! Intern submissions
//!
//! `SUBMITTED → UNDER_REVIEW → APPROVED | REJECTED`, and `REJECTED → SUBMITTED`
//! on resubmission.

use crate::access::{can_view_intern, own_intern, require_supervise_intern, require_view_intern};
use crate::context::Context;
use chrono::Utc;
use internhub_core::validation;
use internhub_core::*;
use internhub_store::{AuditRecord, Store};
use serde::Deserialize;
use tracing::{debug, info};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSubmission {
    pub title: String,
    pub description: Option<String>,
    pub kind: SubmissionKind,
    pub document_id: Option<DocumentId>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub kind: Option<SubmissionKind>,
    pub document_id: Option<DocumentId>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resubmission {
    pub description: Option<String>,
    pub document_id: Option<DocumentId>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionFilter {
    pub intern_id: Option<InternId>,
    pub status: Option<SubmissionStatus>,
    pub kind: Option<SubmissionKind>,
}

pub struct SubmissionService<'a> {
    ctx: &'a Context,
}

impl<'a> SubmissionService<'a> {
    pub(crate) fn new(ctx: &'a Context) -> Self {
        Self { ctx }
    }

    fn store(&self) -> &Store {
        &self.ctx.store
    }

    pub fn create(&self, p: &Principal, req: NewSubmission) -> DomainResult<Submission> {
        let title = validation::required("title", &req.title, 200)?;
        let description = validation::optional("description", req.description.as_deref(), 5000)?;

        let store = self.store();
        let _guard = store.writer();
        let intern = own_intern(store, p)?;
        require_can_submit(&intern)?;
        if let Some(doc) = req.document_id {
            require_intern_document(store, p, &intern, doc)?;
        }

        let submission = Submission {
            id: SubmissionId::new(),
            intern_id: intern.id,
            title,
            description,
            kind: req.kind,
            document_id: req.document_id,
            status: SubmissionStatus::Submitted,
            feedback: None,
            reviewed_by: None,
            reviewed_at: None,
            resubmission_count: 0,
            timestamps: Timestamps::new(Utc::now()),
        };
        store.submissions.insert(submission.clone())?;
        if let Some(doc) = submission.document_id {
            link_document(store, doc, &intern, submission.id)?;
        }
        store.record(
            AuditRecord::new(EntityKind::Submission, submission.id, "create").by(p.user_id),
        );
        info!(submission_id = %submission.id, intern_id = %intern.id, "submission created");
        Ok(submission)
    }

    pub fn get(&self, p: &Principal, id: SubmissionId) -> DomainResult<Submission> {
        let store = self.store();
        let submission = store.submissions.get(id)?;
        require_view_intern(p, &store.interns.get(submission.intern_id)?)?;
        Ok(submission)
    }

    pub fn list(
        &self,
        p: &Principal,
        filter: &SubmissionFilter,
        page: PageRequest,
    ) -> Page<Submission> {
        let store = self.store();
        let visible: Vec<InternId> = store
            .interns
            .list(|i| can_view_intern(p, i))
            .into_iter()
            .map(|i| i.id)
            .collect();
        let rows = store.submissions.list(|s| {
            visible.contains(&s.intern_id)
                && filter.intern_id.map_or(true, |id| s.intern_id == id)
                && filter.status.map_or(true, |st| s.status == st)
                && filter.kind.map_or(true, |k| s.kind == k)
        });
        page.apply(rows)
    }

    /// Owner only, while SUBMITTED
    pub fn update(
        &self,
        p: &Principal,
        id: SubmissionId,
        req: SubmissionUpdate,
    ) -> DomainResult<Submission> {
        let title = req
            .title
            .as_deref()
            .map(|v| validation::required("title", v, 200))
            .transpose()?;
        let description = validation::optional("description", req.description.as_deref(), 5000)?;

        let store = self.store();
        let _guard = store.writer();
        let intern = self.owned(p, id)?;
        if let Some(doc) = req.document_id {
            require_intern_document(store, p, &intern, doc)?;
        }
        let (submission, previous) = store.submissions.update(id, Utc::now(), |s| {
            require_editable(s)?;
            let previous = s.document_id;
            if let Some(v) = title {
                s.title = v;
            }
            if description.is_some() {
                s.description = description;
            }
            if let Some(k) = req.kind {
                s.kind = k;
            }
            if req.document_id.is_some() {
                s.document_id = req.document_id;
            }
            Ok(previous)
        })?;
        if let Some(doc) = req.document_id {
            replace_document(store, previous, doc, &intern, id)?;
        }
        store.record(AuditRecord::new(EntityKind::Submission, id, "update").by(p.user_id));
        Ok(submission)
    }

    /// Owner only, while SUBMITTED
    pub fn delete(&self, p: &Principal, id: SubmissionId) -> DomainResult<()> {
        let store = self.store();
        let _guard = store.writer();
        self.owned(p, id)?;
        require_editable(&store.submissions.get(id)?)?;
        let submission = store.submissions.soft_delete(id, Utc::now())?;
        if let Some(doc) = submission.document_id {
            unlink_document(store, doc, id)?;
        }
        store.record(AuditRecord::new(EntityKind::Submission, id, "delete").by(p.user_id));
        info!(submission_id = %id, "submission deleted");
        Ok(())
    }

    /// SUBMITTED → UNDER_REVIEW
    pub fn start_review(&self, p: &Principal, id: SubmissionId) -> DomainResult<Submission> {
        let store = self.store();
        let _guard = store.writer();
        self.reviewable(p, id)?;
        self.transition(p, id, SubmissionStatus::UnderReview, |_| {})
    }

    /// UNDER_REVIEW → APPROVED
    pub fn approve(
        &self,
        p: &Principal,
        id: SubmissionId,
        feedback: Option<String>,
    ) -> DomainResult<Submission> {
        let feedback = validation::optional("feedback", feedback.as_deref(), 5000)?;
        let store = self.store();
        let _guard = store.writer();
        self.reviewable(p, id)?;
        let now = Utc::now();
        self.transition(p, id, SubmissionStatus::Approved, |s| {
            s.feedback = feedback;
            s.reviewed_by = Some(p.user_id);
            s.reviewed_at = Some(now);
        })
    }

    /// UNDER_REVIEW → REJECTED; feedback is mandatory
    pub fn reject(
        &self,
        p: &Principal,
        id: SubmissionId,
        feedback: &str,
    ) -> DomainResult<Submission> {
        let feedback = validation::required("feedback", feedback, 5000)?;
        let store = self.store();
        let _guard = store.writer();
        self.reviewable(p, id)?;
        let now = Utc::now();
        self.transition(p, id, SubmissionStatus::Rejected, |s| {
            s.feedback = Some(feedback);
            s.reviewed_by = Some(p.user_id);
            s.reviewed_at = Some(now);
        })
    }

    /// REJECTED → SUBMITTED by the owner
    pub fn resubmit(
        &self,
        p: &Principal,
        id: SubmissionId,
        req: Resubmission,
    ) -> DomainResult<Submission> {
        let description = validation::optional("description", req.description.as_deref(), 5000)?;
        let store = self.store();
        let _guard = store.writer();
        let intern = self.owned(p, id)?;
        require_can_submit(&intern)?;
        if let Some(doc) = req.document_id {
            require_intern_document(store, p, &intern, doc)?;
        }
        let previous = store.submissions.get(id)?.document_id;
        let submission = self.transition(p, id, SubmissionStatus::Submitted, |s| {
            if description.is_some() {
                s.description = description;
            }
            if req.document_id.is_some() {
                s.document_id = req.document_id;
            }
            s.resubmission_count += 1;
            s.reviewed_by = None;
            s.reviewed_at = None;
        })?;
        if let Some(doc) = req.document_id {
            replace_document(store, previous, doc, &intern, id)?;
        }
        Ok(submission)
    }

    /// The caller's own intern record, if it owns the submission
    fn owned(&self, p: &Principal, id: SubmissionId) -> DomainResult<Intern> {
        let store = self.store();
        let submission = store.submissions.get(id)?;
        let intern = own_intern(store, p)?;
        if submission.intern_id != intern.id {
            return Err(DomainError::forbidden("not your submission"));
        }
        Ok(intern)
    }

    fn reviewable(&self, p: &Principal, id: SubmissionId) -> DomainResult<()> {
        let store = self.store();
        let submission = store.submissions.get(id)?;
        require_supervise_intern(p, &store.interns.get(submission.intern_id)?)
    }

    /// Caller holds the writer guard
    fn transition(
        &self,
        p: &Principal,
        id: SubmissionId,
        to: SubmissionStatus,
        apply: impl FnOnce(&mut Submission),
    ) -> DomainResult<Submission> {
        let store = self.store();
        let (submission, from) = store
            .submissions
            .update(id, Utc::now(), |s| {
                let from = s.status;
                validate_transition(from, to)?;
                s.status = to;
                apply(s);
                Ok(from)
            })
            .inspect_err(|e| {
                debug!(submission_id = %id, %to, error = %e, "submission transition refused");
            })?;
        store.record(AuditRecord::transition(id, from, to).by(p.user_id));
        info!(submission_id = %id, %from, %to, "submission status changed");
        Ok(submission)
    }
}

fn require_can_submit(intern: &Intern) -> DomainResult<()> {
    if intern.status != InternStatus::Active {
        return Err(DomainError::precondition(format!("intern is {}", intern.status)));
    }
    if intern.suspended {
        return Err(DomainError::precondition("suspended interns cannot submit"));
    }
    Ok(())
}

fn require_editable(submission: &Submission) -> DomainResult<()> {
    if submission.status != SubmissionStatus::Submitted {
        return Err(DomainError::precondition(format!(
            "submission is {} and can no longer be changed",
            submission.status
        )));
    }
    Ok(())
}

/// Documents attached to a submission must belong to the submitting intern
fn require_intern_document(
    store: &Store,
    p: &Principal,
    intern: &Intern,
    id: DocumentId,
) -> DomainResult<()> {
    let doc = store.documents.get(id)?;
    let owned = doc.uploaded_by == p.user_id || doc.links.intern_id == Some(intern.id);
    if !owned {
        return Err(DomainError::forbidden("document does not belong to this intern"));
    }
    Ok(())
}

fn link_document(
    store: &Store,
    id: DocumentId,
    intern: &Intern,
    submission: SubmissionId,
) -> DomainResult<()> {
    store.documents.update(id, Utc::now(), |d| {
        d.links.intern_id = Some(intern.id);
        d.links.university_id = Some(intern.university_id);
        d.links.submission_id = Some(submission);
        Ok(())
    })?;
    Ok(())
}

/// Attach `doc`, detaching whatever the submission pointed at before
fn replace_document(
    store: &Store,
    previous: Option<DocumentId>,
    doc: DocumentId,
    intern: &Intern,
    submission: SubmissionId,
) -> DomainResult<()> {
    if let Some(old) = previous.filter(|old| *old != doc) {
        unlink_document(store, old, submission)?;
    }
    link_document(store, doc, intern, submission)
}

/// Clear the submission link of a document still pointing at `submission`
fn unlink_document(store: &Store, id: DocumentId, submission: SubmissionId) -> DomainResult<()> {
    let linked = store
        .documents
        .find(id)
        .is_some_and(|d| d.links.submission_id == Some(submission));
    if linked {
        store.documents.update(id, Utc::now(), |d| {
            d.links.submission_id = None;
            Ok(())
        })?;
    }
    Ok(())
}
