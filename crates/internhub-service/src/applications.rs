//! Application workflow
//!
//! `PENDING → UNDER_REVIEW → APPROVED | REJECTED`, any of them `→ ARCHIVED`.
//! Rejection cascades to the application's undecided and accepted students.

use crate::context::Context;
use chrono::{NaiveDate, Utc};
use internhub_core::validation;
use internhub_core::*;
use internhub_store::{AuditRecord, Store};
use serde::Deserialize;
use tracing::{info, warn};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewApplication {
    /// Required for admins; university accounts default to their own
    pub university_id: Option<UniversityId>,
    pub title: String,
    pub academic_year: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationUpdate {
    pub title: Option<String>,
    pub academic_year: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationFilter {
    pub status: Option<ApplicationStatus>,
    pub university_id: Option<UniversityId>,
    pub search: Option<String>,
}

pub struct ApplicationService<'a> {
    ctx: &'a Context,
}

impl<'a> ApplicationService<'a> {
    pub(crate) fn new(ctx: &'a Context) -> Self {
        Self { ctx }
    }

    fn store(&self) -> &Store {
        &self.ctx.store
    }

    pub fn create(&self, p: &Principal, req: NewApplication) -> DomainResult<Application> {
        p.require_any(&[Role::Admin, Role::University])?;
        let university_id = match (p.role, req.university_id) {
            (Role::Admin, Some(id)) => id,
            (Role::Admin, None) => {
                return Err(DomainError::validation("universityId is required"));
            }
            (_, requested) => {
                let own = p.scoped_university()?;
                if requested.is_some_and(|id| id != own) {
                    return Err(DomainError::forbidden(
                        "cannot file applications for another university",
                    ));
                }
                own
            }
        };
        let title = validation::required("title", &req.title, 200)?;
        let academic_year = validation::required("academicYear", &req.academic_year, 20)?;
        validation::date_range(req.start_date, req.end_date)?;

        let store = self.store();
        let _guard = store.writer();
        let university = store.universities.get(university_id)?;
        if !university.is_active {
            return Err(DomainError::precondition("university is not active"));
        }

        let application = Application {
            id: ApplicationId::new(),
            university_id,
            title,
            academic_year,
            start_date: req.start_date,
            end_date: req.end_date,
            status: ApplicationStatus::Pending,
            review_notes: None,
            reviewed_by: None,
            reviewed_at: None,
            created_by: p.user_id,
            timestamps: Timestamps::new(Utc::now()),
        };
        store.applications.insert(application.clone())?;
        store.record(
            AuditRecord::new(EntityKind::Application, application.id, "create").by(p.user_id),
        );
        info!(application_id = %application.id, %university_id, "application created");
        Ok(application)
    }

    pub fn get(&self, p: &Principal, id: ApplicationId) -> DomainResult<Application> {
        p.require_any(&[Role::Admin, Role::University])?;
        let application = self.store().applications.get(id)?;
        p.require_university_access(application.university_id)?;
        Ok(application)
    }

    pub fn list(
        &self,
        p: &Principal,
        filter: &ApplicationFilter,
        page: PageRequest,
    ) -> DomainResult<Page<Application>> {
        p.require_any(&[Role::Admin, Role::University])?;
        let scope = if p.is_admin() {
            filter.university_id
        } else {
            Some(p.scoped_university()?)
        };
        let search = filter.search.as_deref().map(str::to_lowercase);
        let rows = self.store().applications.list(|a| {
            scope.map_or(true, |id| a.university_id == id)
                && filter.status.map_or(true, |s| a.status == s)
                && search.as_deref().map_or(true, |s| {
                    a.title.to_lowercase().contains(s) || a.academic_year.contains(s)
                })
        });
        Ok(page.apply(rows))
    }

    /// Editable only while PENDING
    pub fn update(
        &self,
        p: &Principal,
        id: ApplicationId,
        req: ApplicationUpdate,
    ) -> DomainResult<Application> {
        let title = req
            .title
            .as_deref()
            .map(|v| validation::required("title", v, 200))
            .transpose()?;
        let academic_year = req
            .academic_year
            .as_deref()
            .map(|v| validation::required("academicYear", v, 20))
            .transpose()?;

        let store = self.store();
        let _guard = store.writer();
        self.get(p, id)?;
        let (application, ()) = store.applications.update(id, Utc::now(), |a| {
            if a.status != ApplicationStatus::Pending {
                return Err(DomainError::precondition(format!(
                    "application is {} and can no longer be edited",
                    a.status
                )));
            }
            let start = req.start_date.unwrap_or(a.start_date);
            let end = req.end_date.unwrap_or(a.end_date);
            validation::date_range(start, end)?;
            a.start_date = start;
            a.end_date = end;
            if let Some(v) = title {
                a.title = v;
            }
            if let Some(v) = academic_year {
                a.academic_year = v;
            }
            Ok(())
        })?;
        store.record(AuditRecord::new(EntityKind::Application, id, "update").by(p.user_id));
        Ok(application)
    }

    /// PENDING → UNDER_REVIEW; needs at least one student
    pub fn start_review(&self, p: &Principal, id: ApplicationId) -> DomainResult<Application> {
        p.require_admin()?;
        let store = self.store();
        let _guard = store.writer();
        store.applications.get(id)?;
        if store.students.count(|s| s.application_id == id) == 0 {
            return Err(DomainError::precondition(
                "application has no students to review",
            ));
        }
        self.transition(p, id, ApplicationStatus::UnderReview, None)
    }

    /// UNDER_REVIEW → APPROVED; every student decided, at least one accepted
    pub fn approve(
        &self,
        p: &Principal,
        id: ApplicationId,
        notes: Option<String>,
    ) -> DomainResult<Application> {
        p.require_admin()?;
        let notes = validation::optional("notes", notes.as_deref(), 2000)?;
        let store = self.store();
        let _guard = store.writer();
        store.applications.get(id)?;
        let students = store.students.list(|s| s.application_id == id);
        let undecided = students
            .iter()
            .filter(|s| s.status == StudentStatus::PendingReview)
            .count();
        if undecided > 0 {
            return Err(DomainError::precondition(format!(
                "{undecided} student(s) still pending review"
            )));
        }
        if !students.iter().any(|s| s.status == StudentStatus::Accepted) {
            return Err(DomainError::precondition(
                "an approved application needs at least one accepted student",
            ));
        }
        self.transition(p, id, ApplicationStatus::Approved, notes)
    }

    /// UNDER_REVIEW → REJECTED; undecided and accepted students are rejected too
    pub fn reject(
        &self,
        p: &Principal,
        id: ApplicationId,
        reason: &str,
    ) -> DomainResult<Application> {
        p.require_admin()?;
        let reason = validation::required("reason", reason, 2000)?;
        let store = self.store();
        let _guard = store.writer();
        let application =
            self.transition(p, id, ApplicationStatus::Rejected, Some(reason.clone()))?;

        let now = Utc::now();
        let cascaded = store.students.list(|s| {
            s.application_id == id
                && matches!(s.status, StudentStatus::PendingReview | StudentStatus::Accepted)
        });
        for student in &cascaded {
            let (_, from) = store.students.update(student.id, now, |s| {
                let from = s.status;
                validate_transition(from, StudentStatus::Rejected)?;
                s.status = StudentStatus::Rejected;
                s.rejection_reason = Some(format!("application rejected: {reason}"));
                Ok(from)
            })?;
            store.record(
                AuditRecord::transition(student.id, from, StudentStatus::Rejected)
                    .by(p.user_id)
                    .detail("cascade from application rejection"),
            );
        }
        info!(application_id = %id, students = cascaded.len(), "application rejected");
        Ok(application)
    }

    /// Owners may archive their own PENDING applications; otherwise admin only
    pub fn archive(&self, p: &Principal, id: ApplicationId) -> DomainResult<Application> {
        let store = self.store();
        let _guard = store.writer();
        let application = self.get(p, id)?;
        if !p.is_admin() && application.status != ApplicationStatus::Pending {
            return Err(DomainError::forbidden(
                "only pending applications can be withdrawn by the university",
            ));
        }
        if store.students.any(|s| {
            s.application_id == id
                && matches!(s.status, StudentStatus::AwaitingArrival | StudentStatus::Arrived)
        }) {
            return Err(DomainError::precondition(
                "students of this application are awaiting arrival or have arrived",
            ));
        }
        self.transition(p, id, ApplicationStatus::Archived, None)
    }

    /// Soft delete; only PENDING or ARCHIVED. Students without an intern go too.
    pub fn delete(&self, p: &Principal, id: ApplicationId) -> DomainResult<()> {
        let store = self.store();
        let _guard = store.writer();
        let application = self.get(p, id)?;
        if !matches!(
            application.status,
            ApplicationStatus::Pending | ApplicationStatus::Archived
        ) {
            return Err(DomainError::precondition(format!(
                "a {} application cannot be deleted; archive it first",
                application.status
            )));
        }
        let now = Utc::now();
        for student in store
            .students
            .list(|s| s.application_id == id && s.intern_id.is_none())
        {
            store.students.soft_delete(student.id, now)?;
            store.record(
                AuditRecord::new(EntityKind::Student, student.id, "delete")
                    .by(p.user_id)
                    .detail("cascade from application delete"),
            );
        }
        store.applications.soft_delete(id, now)?;
        store.record(AuditRecord::new(EntityKind::Application, id, "delete").by(p.user_id));
        info!(application_id = %id, "application deleted");
        Ok(())
    }

    /// Caller holds the writer guard
    fn transition(
        &self,
        p: &Principal,
        id: ApplicationId,
        to: ApplicationStatus,
        notes: Option<String>,
    ) -> DomainResult<Application> {
        let store = self.store();
        let now = Utc::now();
        let (application, from) = store
            .applications
            .update(id, now, |a| {
                let from = a.status;
                validate_transition(from, to)?;
                a.status = to;
                if matches!(to, ApplicationStatus::Approved | ApplicationStatus::Rejected) {
                    a.reviewed_by = Some(p.user_id);
                    a.reviewed_at = Some(now);
                }
                if notes.is_some() {
                    a.review_notes = notes;
                }
                Ok(from)
            })
            .inspect_err(|e| {
                warn!(application_id = %id, %to, error = %e, "application transition refused");
            })?;
        store.record(AuditRecord::transition(id, from, to).by(p.user_id));
        info!(application_id = %id, %from, %to, "application status changed");
        Ok(application)
    }
}
