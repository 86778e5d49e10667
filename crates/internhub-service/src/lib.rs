//! InternHub Services
//!
//! Business rules of the platform on top of [`internhub_store::Store`]:
//! - Authentication (password hashes, signed session tokens)
//! - Role and ownership checks for every operation
//! - Application, student, intern and submission workflows with cascades
//! - Document storage behind the [`BlobStore`] seam
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use internhub_service::prelude::*;
//!
//! let hub = InternHub::new(store, blobs, TokenSigner::generate(ttl), Settings::default());
//! let login = hub.auth().login(&LoginRequest { email, password })?;
//! let principal = hub.auth().authenticate(&login.token)?;
//! let apps = hub.applications().list(&principal, &Default::default(), PageRequest::default())?;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Infrastructure
pub mod access;
pub mod auth;
pub mod blob;
pub mod context;

// Services
pub mod applications;
pub mod audit;
pub mod dashboard;
pub mod departments;
pub mod documents;
pub mod interns;
pub mod students;
pub mod submissions;
pub mod universities;
pub mod users;

pub use auth::{Claims, LoginRequest, LoginResponse, TokenSigner};
pub use blob::{BlobStore, LocalDiskStore};
pub use context::{InternHub, Settings, DEFAULT_MAX_UPLOAD_BYTES};

/// Common imports for callers of the services
pub mod prelude {
    pub use crate::auth::{LoginRequest, TokenSigner};
    pub use crate::blob::{BlobStore, LocalDiskStore};
    pub use crate::context::{InternHub, Settings};
    pub use internhub_core::prelude::*;
}
