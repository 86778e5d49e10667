//! Testing utilities for the InternHub workspace
//!
//! A [`Fixture`] is a fresh platform with an admin, one university (plus its
//! account), one supervisor and one department, and helpers that walk
//! records through their workflows.

#![allow(missing_docs)]

use chrono::{Duration, NaiveDate};
use internhub_core::*;
use internhub_service::applications::NewApplication;
use internhub_service::departments::NewDepartment;
use internhub_service::students::{AccountRequest, NewStudent};
use internhub_service::universities::NewUniversity;
use internhub_service::users::NewUser;
use internhub_service::{InternHub, LocalDiskStore, Settings, TokenSigner};
use internhub_store::Store;
use std::sync::Arc;
use tempfile::TempDir;

pub const ADMIN_EMAIL: &str = "admin@internhub.test";
pub const ADMIN_PASSWORD: &str = "admin-pass-1";
pub const UNIVERSITY_PASSWORD: &str = "uni-pass-1";
pub const SUPERVISOR_PASSWORD: &str = "sup-pass-1";
pub const INTERN_PASSWORD: &str = "intern-pass-1";

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Application period used by every helper
pub fn period() -> (NaiveDate, NaiveDate) {
    (date(2026, 7, 1), date(2026, 9, 30))
}

/// Hub over an empty store with blobs in a temporary directory
pub fn empty_hub() -> (InternHub, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let hub = InternHub::new(
        Arc::new(Store::new()),
        Arc::new(LocalDiskStore::new(dir.path())),
        TokenSigner::generate(Duration::hours(1)),
        Settings::default().with_password_rounds(2),
    );
    (hub, dir)
}

pub struct Fixture {
    pub hub: InternHub,
    pub admin: Principal,
    pub university: University,
    pub university_user: Principal,
    pub supervisor: Principal,
    pub department: Department,
    dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        let (hub, dir) = empty_hub();
        let admin_view = hub
            .auth()
            .bootstrap_admin(ADMIN_EMAIL, ADMIN_PASSWORD)
            .unwrap()
            .unwrap();
        let admin = Principal::new(admin_view.id, Role::Admin);

        let university = hub
            .universities()
            .create(
                &admin,
                NewUniversity {
                    name: "University of Testing".into(),
                    code: "uot".into(),
                    country: "Kenya".into(),
                    contact_email: "office@uot.test".into(),
                    contact_phone: None,
                    address: None,
                },
            )
            .unwrap();
        let uni_view = hub
            .users()
            .create(
                &admin,
                NewUser {
                    email: "registrar@uot.test".into(),
                    password: UNIVERSITY_PASSWORD.into(),
                    full_name: "Registrar".into(),
                    role: Role::University,
                    university_id: Some(university.id),
                },
            )
            .unwrap();
        let university_user =
            Principal::new(uni_view.id, Role::University).with_university(university.id);

        let sup_view = hub
            .users()
            .create(
                &admin,
                NewUser {
                    email: "supervisor@internhub.test".into(),
                    password: SUPERVISOR_PASSWORD.into(),
                    full_name: "Sam Supervisor".into(),
                    role: Role::Supervisor,
                    university_id: None,
                },
            )
            .unwrap();
        let supervisor = Principal::new(sup_view.id, Role::Supervisor);

        let department = hub
            .departments()
            .create(
                &admin,
                NewDepartment {
                    name: "Engineering".into(),
                    description: None,
                    supervisor_id: Some(supervisor.user_id),
                },
            )
            .unwrap();

        Self {
            hub,
            admin,
            university,
            university_user,
            supervisor,
            department,
            dir,
        }
    }

    /// Where the blob store writes
    pub fn blob_dir(&self) -> &std::path::Path {
        self.dir.path()
    }

    pub fn store(&self) -> &Arc<Store> {
        self.hub.store()
    }

    /// PENDING application of the fixture university
    pub fn pending_application(&self) -> Application {
        let (start_date, end_date) = period();
        self.hub
            .applications()
            .create(
                &self.university_user,
                NewApplication {
                    university_id: None,
                    title: "Summer cohort".into(),
                    academic_year: "2025/2026".into(),
                    start_date,
                    end_date,
                },
            )
            .unwrap()
    }

    pub fn add_student(&self, application: ApplicationId, email: &str) -> Student {
        self.hub
            .students()
            .add(
                &self.university_user,
                application,
                NewStudent {
                    full_name: format!("Student {email}"),
                    email: email.into(),
                    phone: None,
                    field_of_study: "Computer Science".into(),
                    preferred_department_id: Some(self.department.id),
                },
            )
            .unwrap()
    }

    /// UNDER_REVIEW application with one PENDING_REVIEW student per email
    pub fn application_under_review(&self, emails: &[&str]) -> (Application, Vec<Student>) {
        let application = self.pending_application();
        let students = emails
            .iter()
            .map(|e| self.add_student(application.id, e))
            .collect();
        let application = self
            .hub
            .applications()
            .start_review(&self.admin, application.id)
            .unwrap();
        (application, students)
    }

    /// APPROVED application whose students are all ACCEPTED
    pub fn approved_application(&self, emails: &[&str]) -> (Application, Vec<Student>) {
        let (application, students) = self.application_under_review(emails);
        let students = students
            .into_iter()
            .map(|s| self.hub.students().accept(&self.admin, s.id, None).unwrap())
            .collect();
        let application = self
            .hub
            .applications()
            .approve(&self.admin, application.id, None)
            .unwrap();
        (application, students)
    }

    /// ARRIVED student of an approved application
    pub fn arrived_student(&self, email: &str) -> Student {
        let (application, students) = self.approved_application(&[email]);
        let student = &students[0];
        self.hub
            .students()
            .schedule_arrival(&self.admin, student.id, application.start_date)
            .unwrap();
        self.hub.students().mark_arrived(&self.admin, student.id).unwrap()
    }

    /// ACTIVE intern supervised by the fixture supervisor, and its principal
    pub fn active_intern(&self, email: &str) -> (Intern, Principal) {
        let student = self.arrived_student(email);
        let created = self
            .hub
            .students()
            .create_account(
                &self.admin,
                student.id,
                AccountRequest {
                    supervisor_id: Some(self.supervisor.user_id),
                    password: Some(INTERN_PASSWORD.into()),
                    ..Default::default()
                },
            )
            .unwrap();
        let principal = Principal::new(created.user.id, Role::Intern);
        (created.intern, principal)
    }

    /// A second university with its own account
    pub fn other_university(&self) -> (University, Principal) {
        let university = self
            .hub
            .universities()
            .create(
                &self.admin,
                NewUniversity {
                    name: "Another University".into(),
                    code: "AU".into(),
                    country: "Ghana".into(),
                    contact_email: "office@au.test".into(),
                    contact_phone: None,
                    address: None,
                },
            )
            .unwrap();
        let view = self
            .hub
            .users()
            .create(
                &self.admin,
                NewUser {
                    email: "registrar@au.test".into(),
                    password: UNIVERSITY_PASSWORD.into(),
                    full_name: "Other Registrar".into(),
                    role: Role::University,
                    university_id: Some(university.id),
                },
            )
            .unwrap();
        let principal = Principal::new(view.id, Role::University).with_university(university.id);
        (university, principal)
    }
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}
