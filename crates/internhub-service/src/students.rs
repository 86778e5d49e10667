//! Student workflow
//!
//! `PENDING_REVIEW → ACCEPTED → AWAITING_ARRIVAL → ARRIVED → ACCOUNT_CREATED`,
//! with `REJECTED` reachable from the first two. The last step provisions the
//! intern's user account and placement.

use crate::auth::{hash_password, temporary_password};
use crate::context::Context;
use crate::departments::require_supervisor;
use crate::users::ensure_email_free;
use chrono::{Duration, NaiveDate, Utc};
use internhub_core::validation;
use internhub_core::*;
use internhub_store::{AuditRecord, Store};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// How early an arrival may be scheduled before the application period starts
pub const EARLY_ARRIVAL_DAYS: i64 = 30;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStudent {
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub field_of_study: String,
    pub preferred_department_id: Option<DepartmentId>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentUpdate {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub field_of_study: Option<String>,
    pub preferred_department_id: Option<DepartmentId>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentFilter {
    pub application_id: Option<ApplicationId>,
    pub status: Option<StudentStatus>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRequest {
    pub supervisor_id: Option<UserId>,
    /// Defaults to the student's preferred department
    pub department_id: Option<DepartmentId>,
    /// Defaults to the arrival date, then the application start
    pub start_date: Option<NaiveDate>,
    /// Defaults to the application end
    pub end_date: Option<NaiveDate>,
    /// Generated when absent
    pub password: Option<String>,
}

/// Result of [`StudentService::create_account`]
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedAccount {
    pub student: Student,
    pub intern: Intern,
    pub user: UserView,
    /// Only present when the password was generated; shown once
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temporary_password: Option<String>,
}

pub struct StudentService<'a> {
    ctx: &'a Context,
}

impl<'a> StudentService<'a> {
    pub(crate) fn new(ctx: &'a Context) -> Self {
        Self { ctx }
    }

    fn store(&self) -> &Store {
        &self.ctx.store
    }

    /// Nominate a student on a PENDING application
    pub fn add(
        &self,
        p: &Principal,
        application_id: ApplicationId,
        req: NewStudent,
    ) -> DomainResult<Student> {
        p.require_any(&[Role::Admin, Role::University])?;
        let full_name = validation::required("fullName", &req.full_name, 120)?;
        let email = validation::email(&req.email)?;
        let phone = validation::optional("phone", req.phone.as_deref(), 40)?;
        let field_of_study = validation::required("fieldOfStudy", &req.field_of_study, 120)?;

        let store = self.store();
        let _guard = store.writer();
        let application = store.applications.get(application_id)?;
        p.require_university_access(application.university_id)?;
        require_pending_application(&application)?;
        ensure_unique_in_application(store, application_id, None, &email)?;
        if let Some(dep) = req.preferred_department_id {
            store.departments.get(dep)?;
        }

        let student = Student {
            id: StudentId::new(),
            application_id,
            university_id: application.university_id,
            full_name,
            email,
            phone,
            field_of_study,
            preferred_department_id: req.preferred_department_id,
            status: StudentStatus::PendingReview,
            rejection_reason: None,
            arrival_date: None,
            user_id: None,
            intern_id: None,
            timestamps: Timestamps::new(Utc::now()),
        };
        store.students.insert(student.clone())?;
        store.record(AuditRecord::new(EntityKind::Student, student.id, "create").by(p.user_id));
        info!(student_id = %student.id, %application_id, "student added");
        Ok(student)
    }

    pub fn get(&self, p: &Principal, id: StudentId) -> DomainResult<Student> {
        p.require_any(&[Role::Admin, Role::University])?;
        let student = self.store().students.get(id)?;
        p.require_university_access(student.university_id)?;
        Ok(student)
    }

    pub fn list(
        &self,
        p: &Principal,
        filter: &StudentFilter,
        page: PageRequest,
    ) -> DomainResult<Page<Student>> {
        p.require_any(&[Role::Admin, Role::University])?;
        let scope = if p.is_admin() {
            None
        } else {
            Some(p.scoped_university()?)
        };
        let search = filter.search.as_deref().map(str::to_lowercase);
        let rows = self.store().students.list(|s| {
            scope.map_or(true, |id| s.university_id == id)
                && filter.application_id.map_or(true, |id| s.application_id == id)
                && filter.status.map_or(true, |st| s.status == st)
                && search.as_deref().map_or(true, |q| {
                    s.full_name.to_lowercase().contains(q) || s.email.contains(q)
                })
        });
        Ok(page.apply(rows))
    }

    pub fn update(
        &self,
        p: &Principal,
        id: StudentId,
        req: StudentUpdate,
    ) -> DomainResult<Student> {
        let full_name = req
            .full_name
            .as_deref()
            .map(|v| validation::required("fullName", v, 120))
            .transpose()?;
        let email = req.email.as_deref().map(validation::email).transpose()?;
        let phone = validation::optional("phone", req.phone.as_deref(), 40)?;
        let field_of_study = req
            .field_of_study
            .as_deref()
            .map(|v| validation::required("fieldOfStudy", v, 120))
            .transpose()?;

        let store = self.store();
        let _guard = store.writer();
        let student = self.get(p, id)?;
        require_pending_application(&store.applications.get(student.application_id)?)?;
        if let Some(e) = &email {
            ensure_unique_in_application(store, student.application_id, Some(id), e)?;
        }
        if let Some(dep) = req.preferred_department_id {
            store.departments.get(dep)?;
        }

        let (student, ()) = store.students.update(id, Utc::now(), |s| {
            if s.status != StudentStatus::PendingReview {
                return Err(DomainError::precondition(format!(
                    "student is {} and can no longer be edited",
                    s.status
                )));
            }
            if let Some(v) = full_name {
                s.full_name = v;
            }
            if let Some(v) = email {
                s.email = v;
            }
            if phone.is_some() {
                s.phone = phone;
            }
            if let Some(v) = field_of_study {
                s.field_of_study = v;
            }
            if req.preferred_department_id.is_some() {
                s.preferred_department_id = req.preferred_department_id;
            }
            Ok(())
        })?;
        store.record(AuditRecord::new(EntityKind::Student, id, "update").by(p.user_id));
        Ok(student)
    }

    /// PENDING_REVIEW → ACCEPTED while the application is under review
    pub fn accept(
        &self,
        p: &Principal,
        id: StudentId,
        department_id: Option<DepartmentId>,
    ) -> DomainResult<Student> {
        p.require_admin()?;
        let store = self.store();
        let _guard = store.writer();
        let student = store.students.get(id)?;
        let application = store.applications.get(student.application_id)?;
        if application.status != ApplicationStatus::UnderReview {
            return Err(DomainError::precondition(format!(
                "students are decided while the application is UNDER_REVIEW, not {}",
                application.status
            )));
        }
        if let Some(dep) = department_id {
            store.departments.get(dep)?;
        }
        self.transition(p, id, StudentStatus::Accepted, None, |s| {
            if department_id.is_some() {
                s.preferred_department_id = department_id;
            }
            s.rejection_reason = None;
        })
    }

    /// Reject a nominee under review, or withdraw an accepted student of an
    /// approved application
    pub fn reject(&self, p: &Principal, id: StudentId, reason: &str) -> DomainResult<Student> {
        p.require_admin()?;
        let reason = validation::required("reason", reason, 2000)?;
        let store = self.store();
        let _guard = store.writer();
        let student = store.students.get(id)?;
        let application = store.applications.get(student.application_id)?;
        let decidable = application.status == ApplicationStatus::UnderReview
            || (application.status == ApplicationStatus::Approved
                && student.status == StudentStatus::Accepted);
        if !decidable {
            return Err(DomainError::precondition(format!(
                "cannot reject a {} student of a {} application",
                student.status, application.status
            )));
        }
        self.transition(p, id, StudentStatus::Rejected, Some(&reason), |s| {
            s.rejection_reason = Some(reason.clone());
        })
    }

    /// ACCEPTED → AWAITING_ARRIVAL
    pub fn schedule_arrival(
        &self,
        p: &Principal,
        id: StudentId,
        date: NaiveDate,
    ) -> DomainResult<Student> {
        p.require_admin()?;
        let store = self.store();
        let _guard = store.writer();
        let student = store.students.get(id)?;
        let application = store.applications.get(student.application_id)?;
        if application.status != ApplicationStatus::Approved {
            return Err(DomainError::precondition(format!(
                "arrivals are scheduled for APPROVED applications, not {}",
                application.status
            )));
        }
        let earliest = application.start_date - Duration::days(EARLY_ARRIVAL_DAYS);
        if date < earliest {
            return Err(DomainError::validation(format!(
                "arrival date {date} is before {earliest}"
            )));
        }
        self.transition(p, id, StudentStatus::AwaitingArrival, None, |s| {
            s.arrival_date = Some(date);
        })
    }

    /// AWAITING_ARRIVAL → ARRIVED
    pub fn mark_arrived(&self, p: &Principal, id: StudentId) -> DomainResult<Student> {
        p.require_admin()?;
        let store = self.store();
        let _guard = store.writer();
        self.transition(p, id, StudentStatus::Arrived, None, |_| {})
    }

    /// ARRIVED → ACCOUNT_CREATED; creates the INTERN user and the placement
    pub fn create_account(
        &self,
        p: &Principal,
        id: StudentId,
        req: AccountRequest,
    ) -> DomainResult<CreatedAccount> {
        p.require_admin()?;
        if let Some(pw) = &req.password {
            validation::password(pw)?;
        }

        let store = self.store();
        let _guard = store.writer();
        let student = store.students.get(id)?;
        validate_transition(student.status, StudentStatus::AccountCreated)?;
        let application = store.applications.get(student.application_id)?;
        ensure_email_free(store, &student.email)?;
        if let Some(sup) = req.supervisor_id {
            require_supervisor(store, sup)?;
        }
        let department_id = req.department_id.or(student.preferred_department_id);
        if let Some(dep) = department_id {
            store.departments.get(dep)?;
        }
        let start_date = req
            .start_date
            .or(student.arrival_date)
            .unwrap_or(application.start_date);
        let end_date = req.end_date.unwrap_or(application.end_date);
        validation::date_range(start_date, end_date)?;

        let (password, temporary) = match req.password {
            Some(pw) => (pw, None),
            None => {
                let pw = temporary_password();
                (pw.clone(), Some(pw))
            }
        };
        let now = Utc::now();
        let user = User {
            id: UserId::new(),
            email: student.email.clone(),
            password_hash: hash_password(&password, self.ctx.settings.password_rounds),
            full_name: student.full_name.clone(),
            role: Role::Intern,
            university_id: None,
            is_active: true,
            last_login_at: None,
            timestamps: Timestamps::new(now),
        };
        let intern = Intern {
            id: InternId::new(),
            student_id: id,
            user_id: user.id,
            university_id: student.university_id,
            department_id,
            supervisor_id: req.supervisor_id,
            full_name: student.full_name.clone(),
            start_date,
            end_date,
            status: InternStatus::Active,
            suspended: false,
            suspension_reason: None,
            termination_reason: None,
            completed_at: None,
            timestamps: Timestamps::new(now),
        };
        store.users.insert(user.clone())?;
        store.interns.insert(intern.clone())?;
        let (student, ()) = store.students.update(id, now, |s| {
            s.status = StudentStatus::AccountCreated;
            s.user_id = Some(user.id);
            s.intern_id = Some(intern.id);
            Ok(())
        })?;

        store.record(AuditRecord::new(EntityKind::User, user.id, "create").by(p.user_id));
        store.record(AuditRecord::new(EntityKind::Intern, intern.id, "create").by(p.user_id));
        store.record(
            AuditRecord::transition(id, StudentStatus::Arrived, StudentStatus::AccountCreated)
                .by(p.user_id),
        );
        info!(
            student_id = %id,
            intern_id = %intern.id,
            user_id = %user.id,
            "intern account created"
        );
        Ok(CreatedAccount {
            student,
            intern,
            user: user.view(),
            temporary_password: temporary,
        })
    }

    /// Only undecided nominees of a PENDING application
    pub fn delete(&self, p: &Principal, id: StudentId) -> DomainResult<()> {
        let store = self.store();
        let _guard = store.writer();
        let student = self.get(p, id)?;
        if student.status != StudentStatus::PendingReview {
            return Err(DomainError::precondition(format!(
                "a {} student cannot be deleted",
                student.status
            )));
        }
        require_pending_application(&store.applications.get(student.application_id)?)?;
        store.students.soft_delete(id, Utc::now())?;
        store.record(AuditRecord::new(EntityKind::Student, id, "delete").by(p.user_id));
        info!(student_id = %id, "student deleted");
        Ok(())
    }

    /// Caller holds the writer guard
    fn transition(
        &self,
        p: &Principal,
        id: StudentId,
        to: StudentStatus,
        detail: Option<&str>,
        apply: impl FnOnce(&mut Student),
    ) -> DomainResult<Student> {
        let store = self.store();
        let (student, from) = store
            .students
            .update(id, Utc::now(), |s| {
                let from = s.status;
                validate_transition(from, to)?;
                s.status = to;
                apply(s);
                Ok(from)
            })
            .inspect_err(|e| {
                debug!(student_id = %id, %to, error = %e, "student transition refused");
            })?;
        let mut record = AuditRecord::transition(id, from, to).by(p.user_id);
        if let Some(d) = detail {
            record = record.detail(d);
        }
        store.record(record);
        info!(student_id = %id, %from, %to, "student status changed");
        Ok(student)
    }
}

fn require_pending_application(application: &Application) -> DomainResult<()> {
    if application.status != ApplicationStatus::Pending {
        return Err(DomainError::precondition(format!(
            "application is {}; students can only change while it is PENDING",
            application.status
        )));
    }
    Ok(())
}

fn ensure_unique_in_application(
    store: &Store,
    application_id: ApplicationId,
    except: Option<StudentId>,
    email: &str,
) -> DomainResult<()> {
    if store.students.any(|s| {
        s.application_id == application_id && Some(s.id) != except && s.email == email
    }) {
        return Err(DomainError::conflict(format!(
            "{email} is already nominated on this application"
        )));
    }
    Ok(())
}
