//! Status workflows
//!
//! Each status enum owns one transition table. Services never assign a new
//! status without calling [`validate_transition`] first.

use crate::error::{DomainError, DomainResult};
use crate::model::EntityKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A status enum with a fixed transition table
pub trait Workflow: Copy + Eq + fmt::Debug + fmt::Display + 'static {
    /// Entity whose status this is
    const ENTITY: EntityKind;

    /// Every status of the workflow
    fn all() -> &'static [Self];

    /// Statuses reachable in one step
    fn allowed_transitions(self) -> &'static [Self];

    /// No outgoing transitions
    #[inline]
    fn is_terminal(self) -> bool {
        self.allowed_transitions().is_empty()
    }

    /// Check a single step
    #[inline]
    fn can_transition_to(self, to: Self) -> bool {
        self.allowed_transitions().contains(&to)
    }
}

/// Validates a status transition.
pub fn validate_transition<S: Workflow>(from: S, to: S) -> DomainResult<()> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(DomainError::IllegalTransition {
            entity: S::ENTITY,
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}

macro_rules! status_display {
    ($ty:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            /// Wire representation
            #[must_use]
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $ty {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($ty::$variant),)+
                    other => Err(DomainError::validation(format!(
                        "unknown {} status '{other}'",
                        <$ty as Workflow>::ENTITY
                    ))),
                }
            }
        }
    };
}

/// Application lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    Pending,
    UnderReview,
    Approved,
    Rejected,
    Archived,
}

status_display!(ApplicationStatus {
    Pending => "PENDING",
    UnderReview => "UNDER_REVIEW",
    Approved => "APPROVED",
    Rejected => "REJECTED",
    Archived => "ARCHIVED",
});

impl Workflow for ApplicationStatus {
    const ENTITY: EntityKind = EntityKind::Application;

    fn all() -> &'static [Self] {
        use ApplicationStatus::*;
        &[Pending, UnderReview, Approved, Rejected, Archived]
    }

    fn allowed_transitions(self) -> &'static [Self] {
        use ApplicationStatus::*;
        match self {
            Pending => &[UnderReview, Archived],
            UnderReview => &[Approved, Rejected, Archived],
            Approved => &[Archived],
            Rejected => &[Archived],
            Archived => &[],
        }
    }
}

/// Student lifecycle, from nomination to intern account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StudentStatus {
    PendingReview,
    Accepted,
    Rejected,
    AwaitingArrival,
    Arrived,
    AccountCreated,
}

status_display!(StudentStatus {
    PendingReview => "PENDING_REVIEW",
    Accepted => "ACCEPTED",
    Rejected => "REJECTED",
    AwaitingArrival => "AWAITING_ARRIVAL",
    Arrived => "ARRIVED",
    AccountCreated => "ACCOUNT_CREATED",
});

impl Workflow for StudentStatus {
    const ENTITY: EntityKind = EntityKind::Student;

    fn all() -> &'static [Self] {
        use StudentStatus::*;
        &[PendingReview, Accepted, Rejected, AwaitingArrival, Arrived, AccountCreated]
    }

    fn allowed_transitions(self) -> &'static [Self] {
        use StudentStatus::*;
        match self {
            PendingReview => &[Accepted, Rejected],
            // withdrawal after acceptance
            Accepted => &[AwaitingArrival, Rejected],
            AwaitingArrival => &[Arrived],
            Arrived => &[AccountCreated],
            Rejected => &[],
            AccountCreated => &[],
        }
    }
}

/// Intern placement lifecycle. Suspension is a flag, not a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InternStatus {
    Active,
    Completed,
    Terminated,
}

status_display!(InternStatus {
    Active => "ACTIVE",
    Completed => "COMPLETED",
    Terminated => "TERMINATED",
});

impl Workflow for InternStatus {
    const ENTITY: EntityKind = EntityKind::Intern;

    fn all() -> &'static [Self] {
        use InternStatus::*;
        &[Active, Completed, Terminated]
    }

    fn allowed_transitions(self) -> &'static [Self] {
        use InternStatus::*;
        match self {
            Active => &[Completed, Terminated],
            Completed => &[],
            Terminated => &[],
        }
    }
}

/// Submission review lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmissionStatus {
    Submitted,
    UnderReview,
    Approved,
    Rejected,
}

status_display!(SubmissionStatus {
    Submitted => "SUBMITTED",
    UnderReview => "UNDER_REVIEW",
    Approved => "APPROVED",
    Rejected => "REJECTED",
});

impl Workflow for SubmissionStatus {
    const ENTITY: EntityKind = EntityKind::Submission;

    fn all() -> &'static [Self] {
        use SubmissionStatus::*;
        &[Submitted, UnderReview, Approved, Rejected]
    }

    fn allowed_transitions(self) -> &'static [Self] {
        use SubmissionStatus::*;
        match self {
            Submitted => &[UnderReview],
            UnderReview => &[Approved, Rejected],
            Rejected => &[Submitted],
            Approved => &[],
        }
    }
}
