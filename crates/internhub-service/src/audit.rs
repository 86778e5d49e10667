use crate::context::Context;
use internhub_core::*;
use internhub_store::{AuditEvent, AuditFilter, IntegrityReport};
use tracing::warn;

/// Default and maximum number of events returned by one query
pub const AUDIT_QUERY_LIMIT: usize = 500;

pub struct AuditService<'a> {
    ctx: &'a Context,
}

impl<'a> AuditService<'a> {
    pub(crate) fn new(ctx: &'a Context) -> Self {
        Self { ctx }
    }

    /// Newest first
    pub fn query(&self, p: &Principal, mut filter: AuditFilter) -> DomainResult<Vec<AuditEvent>> {
        p.require_admin()?;
        filter.limit = Some(filter.limit.unwrap_or(AUDIT_QUERY_LIMIT).clamp(1, AUDIT_QUERY_LIMIT));
        Ok(self.ctx.store.audit().query(&filter))
    }

    pub fn verify(&self, p: &Principal) -> DomainResult<IntegrityReport> {
        p.require_admin()?;
        let report = self.ctx.store.audit().verify_integrity();
        if !report.valid {
            warn!(first_invalid = ?report.first_invalid, "audit chain failed verification");
        }
        Ok(report)
    }
}
