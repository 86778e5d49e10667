//! Intern placements
//!
//! `ACTIVE → COMPLETED | TERMINATED`. Suspension is a flag on an active
//! placement, not a state of its own.

use crate::access::{can_view_intern, require_supervise_intern, require_view_intern};
use crate::context::Context;
use crate::departments::require_supervisor;
use chrono::{NaiveDate, Utc};
use internhub_core::validation;
use internhub_core::*;
use internhub_store::{AuditRecord, Store};
use serde::Deserialize;
use tracing::{debug, info};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InternUpdate {
    pub supervisor_id: Option<UserId>,
    pub department_id: Option<DepartmentId>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InternFilter {
    pub status: Option<InternStatus>,
    pub university_id: Option<UniversityId>,
    pub department_id: Option<DepartmentId>,
    pub supervisor_id: Option<UserId>,
    pub suspended: Option<bool>,
    pub search: Option<String>,
}

pub struct InternService<'a> {
    ctx: &'a Context,
}

impl<'a> InternService<'a> {
    pub(crate) fn new(ctx: &'a Context) -> Self {
        Self { ctx }
    }

    fn store(&self) -> &Store {
        &self.ctx.store
    }

    pub fn get(&self, p: &Principal, id: InternId) -> DomainResult<Intern> {
        let intern = self.store().interns.get(id)?;
        require_view_intern(p, &intern)?;
        Ok(intern)
    }

    pub fn list(&self, p: &Principal, filter: &InternFilter, page: PageRequest) -> Page<Intern> {
        let search = filter.search.as_deref().map(str::to_lowercase);
        let rows = self.store().interns.list(|i| {
            can_view_intern(p, i)
                && filter.status.map_or(true, |s| i.status == s)
                && filter.university_id.map_or(true, |id| i.university_id == id)
                && filter.department_id.map_or(true, |id| i.department_id == Some(id))
                && filter.supervisor_id.map_or(true, |id| i.supervisor_id == Some(id))
                && filter.suspended.map_or(true, |s| i.suspended == s)
                && search
                    .as_deref()
                    .map_or(true, |q| i.full_name.to_lowercase().contains(q))
        });
        page.apply(rows)
    }

    pub fn update(&self, p: &Principal, id: InternId, req: InternUpdate) -> DomainResult<Intern> {
        p.require_admin()?;
        let store = self.store();
        let _guard = store.writer();
        if let Some(sup) = req.supervisor_id {
            require_supervisor(store, sup)?;
        }
        if let Some(dep) = req.department_id {
            store.departments.get(dep)?;
        }
        let (intern, ()) = store.interns.update(id, Utc::now(), |i| {
            if i.status.is_terminal() {
                return Err(DomainError::precondition(format!(
                    "intern is {} and can no longer be changed",
                    i.status
                )));
            }
            if let Some(end) = req.end_date {
                validation::date_range(i.start_date, end)?;
                i.end_date = end;
            }
            if req.supervisor_id.is_some() {
                i.supervisor_id = req.supervisor_id;
            }
            if req.department_id.is_some() {
                i.department_id = req.department_id;
            }
            Ok(())
        })?;
        store.record(AuditRecord::new(EntityKind::Intern, id, "update").by(p.user_id));
        Ok(intern)
    }

    pub fn suspend(&self, p: &Principal, id: InternId, reason: &str) -> DomainResult<Intern> {
        let reason = validation::required("reason", reason, 2000)?;
        let store = self.store();
        let _guard = store.writer();
        require_supervise_intern(p, &store.interns.get(id)?)?;
        let (intern, ()) = store.interns.update(id, Utc::now(), |i| {
            if i.status != InternStatus::Active {
                return Err(DomainError::precondition(format!("intern is {}", i.status)));
            }
            if i.suspended {
                return Err(DomainError::precondition("intern is already suspended"));
            }
            i.suspended = true;
            i.suspension_reason = Some(reason.clone());
            Ok(())
        })?;
        store.record(
            AuditRecord::new(EntityKind::Intern, id, "suspend")
                .by(p.user_id)
                .detail(reason),
        );
        info!(intern_id = %id, "intern suspended");
        Ok(intern)
    }

    pub fn reinstate(&self, p: &Principal, id: InternId) -> DomainResult<Intern> {
        let store = self.store();
        let _guard = store.writer();
        require_supervise_intern(p, &store.interns.get(id)?)?;
        let (intern, ()) = store.interns.update(id, Utc::now(), |i| {
            if i.status != InternStatus::Active {
                return Err(DomainError::precondition(format!("intern is {}", i.status)));
            }
            if !i.suspended {
                return Err(DomainError::precondition("intern is not suspended"));
            }
            i.suspended = false;
            i.suspension_reason = None;
            Ok(())
        })?;
        store.record(AuditRecord::new(EntityKind::Intern, id, "reinstate").by(p.user_id));
        info!(intern_id = %id, "intern reinstated");
        Ok(intern)
    }

    /// ACTIVE → COMPLETED once every submission has been reviewed
    pub fn complete(&self, p: &Principal, id: InternId) -> DomainResult<Intern> {
        p.require_admin()?;
        let store = self.store();
        let _guard = store.writer();
        let open = store.submissions.count(|s| {
            s.intern_id == id
                && matches!(s.status, SubmissionStatus::Submitted | SubmissionStatus::UnderReview)
        });
        if open > 0 {
            store.interns.get(id)?;
            return Err(DomainError::precondition(format!(
                "{open} submission(s) still awaiting review"
            )));
        }
        let now = Utc::now();
        self.finish(p, id, InternStatus::Completed, None, |i| {
            if i.suspended {
                return Err(DomainError::precondition("a suspended intern cannot complete"));
            }
            i.completed_at = Some(now);
            Ok(())
        })
    }

    /// ACTIVE → TERMINATED
    pub fn terminate(&self, p: &Principal, id: InternId, reason: &str) -> DomainResult<Intern> {
        p.require_admin()?;
        let reason = validation::required("reason", reason, 2000)?;
        let store = self.store();
        let _guard = store.writer();
        self.finish(p, id, InternStatus::Terminated, Some(&reason), |i| {
            i.termination_reason = Some(reason.clone());
            Ok(())
        })
    }

    /// Terminal transition; the intern's account is deactivated with it.
    /// Caller holds the writer guard.
    fn finish(
        &self,
        p: &Principal,
        id: InternId,
        to: InternStatus,
        detail: Option<&str>,
        apply: impl FnOnce(&mut Intern) -> DomainResult<()>,
    ) -> DomainResult<Intern> {
        let store = self.store();
        let now = Utc::now();
        let (intern, from) = store
            .interns
            .update(id, now, |i| {
                let from = i.status;
                validate_transition(from, to)?;
                apply(i)?;
                i.status = to;
                Ok(from)
            })
            .inspect_err(|e| {
                debug!(intern_id = %id, %to, error = %e, "intern transition refused");
            })?;
        store.users.update(intern.user_id, now, |u| {
            u.is_active = false;
            Ok(())
        })?;

        let mut record = AuditRecord::transition(id, from, to).by(p.user_id);
        if let Some(d) = detail {
            record = record.detail(d);
        }
        store.record(record);
        info!(intern_id = %id, %from, %to, "intern placement ended");
        Ok(intern)
    }
}
