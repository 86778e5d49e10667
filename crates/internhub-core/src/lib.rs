//! InternHub Core - domain model
//!
//! Shared vocabulary of the platform:
//! - Typed ids for every entity
//! - Entity records with soft-delete timestamps
//! - Roles and the authenticated [`Principal`]
//! - Status workflows with a single transition table each
//! - [`DomainError`] with stable error codes
//! - Validation, filename sanitization and pagination helpers
//!
//! # Example
//!
//! ```rust
//! use internhub_core::workflow::{validate_transition, ApplicationStatus};
//!
//! let next = ApplicationStatus::UnderReview;
//! assert!(validate_transition(ApplicationStatus::Pending, next).is_ok());
//! assert!(validate_transition(ApplicationStatus::Pending, ApplicationStatus::Approved).is_err());
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod error;
pub mod filename;
pub mod ids;
pub mod model;
pub mod pagination;
pub mod role;
pub mod validation;
pub mod workflow;

pub use error::{DomainError, DomainResult, ErrorCode};
pub use ids::*;
pub use model::*;
pub use pagination::{Page, PageRequest};
pub use role::{Principal, Role};
pub use workflow::{
    validate_transition, ApplicationStatus, InternStatus, StudentStatus, SubmissionStatus,
    Workflow,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with InternHub Core
    pub use crate::{
        DomainError, DomainResult, Entity, EntityKind, Page, PageRequest, Principal, Role,
        Workflow,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
