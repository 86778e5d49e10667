//! Entity records
//!
//! Plain data rows. Invariants that span several rows (uniqueness, status
//! cascades, ownership) are enforced by the service layer.

use crate::ids::*;
use crate::role::Role;
use crate::workflow::{ApplicationStatus, InternStatus, StudentStatus, SubmissionStatus};
use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;

/// Entity kinds, used in errors and the audit log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    User,
    University,
    Department,
    Application,
    Student,
    Intern,
    Submission,
    Document,
}

impl EntityKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::User => "user",
            EntityKind::University => "university",
            EntityKind::Department => "department",
            EntityKind::Application => "application",
            EntityKind::Student => "student",
            EntityKind::Intern => "intern",
            EntityKind::Submission => "submission",
            EntityKind::Document => "document",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EntityKind {
    type Err = crate::error::DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "user" => EntityKind::User,
            "university" => EntityKind::University,
            "department" => EntityKind::Department,
            "application" => EntityKind::Application,
            "student" => EntityKind::Student,
            "intern" => EntityKind::Intern,
            "submission" => EntityKind::Submission,
            "document" => EntityKind::Document,
            other => {
                return Err(crate::error::DomainError::validation(format!(
                    "unknown entity kind '{other}'"
                )))
            }
        })
    }
}

/// Row bookkeeping shared by every entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timestamps {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Timestamps {
    /// Fresh row created at `now`
    #[must_use]
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }
}

/// Common behaviour the store needs from every row type
pub trait Entity: Clone + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Primary key
    type Id: Copy
        + Eq
        + Hash
        + fmt::Debug
        + fmt::Display
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static;

    /// Table kind
    const KIND: EntityKind;

    fn id(&self) -> Self::Id;
    fn timestamps(&self) -> &Timestamps;
    fn timestamps_mut(&mut self) -> &mut Timestamps;

    #[inline]
    fn is_deleted(&self) -> bool {
        self.timestamps().deleted_at.is_some()
    }
}

macro_rules! impl_entity {
    ($ty:ident, $id:ident, $kind:expr) => {
        impl Entity for $ty {
            type Id = $id;
            const KIND: EntityKind = $kind;

            #[inline]
            fn id(&self) -> $id {
                self.id
            }

            #[inline]
            fn timestamps(&self) -> &Timestamps {
                &self.timestamps
            }

            #[inline]
            fn timestamps_mut(&mut self) -> &mut Timestamps {
                &mut self.timestamps
            }
        }
    };
}

/// Platform account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    /// Stored lower-cased
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub role: Role,
    pub university_id: Option<UniversityId>,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub timestamps: Timestamps,
}

impl_entity!(User, UserId, EntityKind::User);

impl User {
    /// Public projection without the password hash
    #[must_use]
    pub fn view(&self) -> UserView {
        UserView {
            id: self.id,
            email: self.email.clone(),
            full_name: self.full_name.clone(),
            role: self.role,
            university_id: self.university_id,
            is_active: self.is_active,
            last_login_at: self.last_login_at,
            created_at: self.timestamps.created_at,
            updated_at: self.timestamps.updated_at,
        }
    }
}

/// User as returned by the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: UserId,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub university_id: Option<UniversityId>,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partner university
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct University {
    pub id: UniversityId,
    pub name: String,
    pub code: String,
    pub country: String,
    pub contact_email: String,
    pub contact_phone: Option<String>,
    pub address: Option<String>,
    pub is_active: bool,
    #[serde(flatten)]
    pub timestamps: Timestamps,
}

impl_entity!(University, UniversityId, EntityKind::University);

/// Host department
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Department {
    pub id: DepartmentId,
    pub name: String,
    pub description: Option<String>,
    pub supervisor_id: Option<UserId>,
    #[serde(flatten)]
    pub timestamps: Timestamps,
}

impl_entity!(Department, DepartmentId, EntityKind::Department);

/// A university's nomination of a cohort for one period
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: ApplicationId,
    pub university_id: UniversityId,
    pub title: String,
    pub academic_year: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: ApplicationStatus,
    pub review_notes: Option<String>,
    pub reviewed_by: Option<UserId>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_by: UserId,
    #[serde(flatten)]
    pub timestamps: Timestamps,
}

impl_entity!(Application, ApplicationId, EntityKind::Application);

/// Student nominated on an application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: StudentId,
    pub application_id: ApplicationId,
    /// Copied from the application on creation
    pub university_id: UniversityId,
    pub full_name: String,
    /// Stored lower-cased
    pub email: String,
    pub phone: Option<String>,
    pub field_of_study: String,
    pub preferred_department_id: Option<DepartmentId>,
    pub status: StudentStatus,
    pub rejection_reason: Option<String>,
    pub arrival_date: Option<NaiveDate>,
    pub user_id: Option<UserId>,
    pub intern_id: Option<InternId>,
    #[serde(flatten)]
    pub timestamps: Timestamps,
}

impl_entity!(Student, StudentId, EntityKind::Student);

/// Active or finished placement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Intern {
    pub id: InternId,
    pub student_id: StudentId,
    pub user_id: UserId,
    pub university_id: UniversityId,
    pub department_id: Option<DepartmentId>,
    pub supervisor_id: Option<UserId>,
    pub full_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: InternStatus,
    pub suspended: bool,
    pub suspension_reason: Option<String>,
    pub termination_reason: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub timestamps: Timestamps,
}

impl_entity!(Intern, InternId, EntityKind::Intern);

impl Intern {
    /// Active and not suspended
    #[inline]
    #[must_use]
    pub fn can_submit(&self) -> bool {
        self.status == InternStatus::Active && !self.suspended
    }
}

/// Kind of report an intern submits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmissionKind {
    WeeklyReport,
    MonthlyReport,
    FinalReport,
    Other,
}

/// Intern report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: SubmissionId,
    pub intern_id: InternId,
    pub title: String,
    pub description: Option<String>,
    pub kind: SubmissionKind,
    pub document_id: Option<DocumentId>,
    pub status: SubmissionStatus,
    pub feedback: Option<String>,
    pub reviewed_by: Option<UserId>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub resubmission_count: u32,
    #[serde(flatten)]
    pub timestamps: Timestamps,
}

impl_entity!(Submission, SubmissionId, EntityKind::Submission);

/// Document category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentCategory {
    ApplicationLetter,
    Cv,
    Transcript,
    Passport,
    Report,
    Certificate,
    Other,
}

impl std::str::FromStr for DocumentCategory {
    type Err = crate::error::DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "APPLICATION_LETTER" => DocumentCategory::ApplicationLetter,
            "CV" => DocumentCategory::Cv,
            "TRANSCRIPT" => DocumentCategory::Transcript,
            "PASSPORT" => DocumentCategory::Passport,
            "REPORT" => DocumentCategory::Report,
            "CERTIFICATE" => DocumentCategory::Certificate,
            "OTHER" => DocumentCategory::Other,
            other => {
                return Err(crate::error::DomainError::validation(format!(
                    "unknown document category '{other}'"
                )))
            }
        })
    }
}

/// Entities a document belongs to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentLinks {
    pub university_id: Option<UniversityId>,
    pub application_id: Option<ApplicationId>,
    pub student_id: Option<StudentId>,
    pub intern_id: Option<InternId>,
    pub submission_id: Option<SubmissionId>,
}

impl DocumentLinks {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Stored file and its metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: DocumentId,
    pub uploaded_by: UserId,
    pub original_name: String,
    pub stored_name: String,
    pub content_type: String,
    pub size_bytes: u64,
    /// Hex SHA-256 of the content
    pub checksum: String,
    pub storage_key: String,
    pub category: DocumentCategory,
    pub links: DocumentLinks,
    pub notes: Option<String>,
    #[serde(flatten)]
    pub timestamps: Timestamps,
}

impl_entity!(Document, DocumentId, EntityKind::Document);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_view_hides_password_hash() {
        let user = User {
            id: UserId::new(),
            email: "a@b.org".into(),
            password_hash: "secret".into(),
            full_name: "A B".into(),
            role: Role::Admin,
            university_id: None,
            is_active: true,
            last_login_at: None,
            timestamps: Timestamps::new(Utc::now()),
        };
        let json = serde_json::to_string(&user.view()).unwrap();
        assert!(!json.contains("secret"));
        assert!(json.contains("fullName"));
    }

    #[test]
    fn timestamps_are_flattened() {
        let dept = Department {
            id: DepartmentId::new(),
            name: "Engineering".into(),
            description: None,
            supervisor_id: None,
            timestamps: Timestamps::new(Utc::now()),
        };
        let value = serde_json::to_value(&dept).unwrap();
        assert!(value.get("createdAt").is_some());
        assert!(value.get("timestamps").is_none());
        let back: Department = serde_json::from_value(value).unwrap();
        assert_eq!(back, dept);
    }

    #[test]
    fn empty_links() {
        assert!(DocumentLinks::default().is_empty());
        let links = DocumentLinks {
            intern_id: Some(InternId::new()),
            ..Default::default()
        };
        assert!(!links.is_empty());
    }

    #[test]
    fn entity_kind_parses_display_form() {
        for kind in [EntityKind::User, EntityKind::Submission, EntityKind::Document] {
            assert_eq!(kind.to_string().parse::<EntityKind>().unwrap(), kind);
        }
    }
}
