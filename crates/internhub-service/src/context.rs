//! Shared service context and the [`InternHub`] facade

use crate::applications::ApplicationService;
use crate::audit::AuditService;
use crate::auth::{AuthService, TokenSigner};
use crate::blob::BlobStore;
use crate::dashboard::DashboardService;
use crate::departments::DepartmentService;
use crate::documents::DocumentService;
use crate::interns::InternService;
use crate::students::StudentService;
use crate::submissions::SubmissionService;
use crate::universities::UniversityService;
use crate::users::UserService;
use internhub_store::Store;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Default upload limit (10 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Tunables the services read at call time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// SHA-256 rounds for new password hashes
    pub password_rounds: u32,
    /// Largest accepted upload
    pub max_upload_bytes: u64,
    /// Accepted upload content types
    pub allowed_content_types: Vec<String>,
}

impl Settings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_password_rounds(mut self, rounds: u32) -> Self {
        self.password_rounds = rounds.max(1);
        self
    }

    #[must_use]
    pub fn with_max_upload_bytes(mut self, bytes: u64) -> Self {
        self.max_upload_bytes = bytes;
        self
    }

    /// Case-insensitive, parameters (`; charset=…`) ignored
    #[must_use]
    pub fn accepts_content_type(&self, content_type: &str) -> bool {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        self.allowed_content_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(&essence))
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            password_rounds: 10_000,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            allowed_content_types: default_content_types(),
        }
    }
}

#[must_use]
pub fn default_content_types() -> Vec<String> {
    [
        "application/pdf",
        "image/png",
        "image/jpeg",
        "application/msword",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// Everything a service needs
pub struct Context {
    pub store: Arc<Store>,
    pub blobs: Arc<dyn BlobStore>,
    pub tokens: TokenSigner,
    pub settings: Settings,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("store", &self.store.stats())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

/// Entry point to every service.
///
/// Cheap to clone; all clones share the same store.
#[derive(Debug, Clone)]
pub struct InternHub {
    ctx: Arc<Context>,
}

impl InternHub {
    pub fn new(
        store: Arc<Store>,
        blobs: Arc<dyn BlobStore>,
        tokens: TokenSigner,
        settings: Settings,
    ) -> Self {
        Self {
            ctx: Arc::new(Context {
                store,
                blobs,
                tokens,
                settings,
            }),
        }
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.ctx.store
    }

    pub fn settings(&self) -> &Settings {
        &self.ctx.settings
    }

    pub fn auth(&self) -> AuthService<'_> {
        AuthService::new(&self.ctx)
    }

    pub fn users(&self) -> UserService<'_> {
        UserService::new(&self.ctx)
    }

    pub fn universities(&self) -> UniversityService<'_> {
        UniversityService::new(&self.ctx)
    }

    pub fn departments(&self) -> DepartmentService<'_> {
        DepartmentService::new(&self.ctx)
    }

    pub fn applications(&self) -> ApplicationService<'_> {
        ApplicationService::new(&self.ctx)
    }

    pub fn students(&self) -> StudentService<'_> {
        StudentService::new(&self.ctx)
    }

    pub fn interns(&self) -> InternService<'_> {
        InternService::new(&self.ctx)
    }

    pub fn submissions(&self) -> SubmissionService<'_> {
        SubmissionService::new(&self.ctx)
    }

    pub fn documents(&self) -> DocumentService<'_> {
        DocumentService::new(&self.ctx)
    }

    pub fn dashboard(&self) -> DashboardService<'_> {
        DashboardService::new(&self.ctx)
    }

    pub fn audit(&self) -> AuditService<'_> {
        AuditService::new(&self.ctx)
    }
}
