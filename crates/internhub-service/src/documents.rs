//! Document upload, download and deletion
//!
//! Metadata lives in the store, bytes in a [`BlobStore`](crate::blob::BlobStore).
//! The writer guard is never held across an await: validation and link
//! resolution happen first, then the blob is written, then the row.

use crate::access::{can_delete_document, can_view_document, can_supervise_intern, own_intern};
use crate::context::Context;
use chrono::{Datelike, Utc};
use internhub_core::filename::stored_filename;
use internhub_core::validation;
use internhub_core::*;
use internhub_store::{AuditRecord, Store};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, error, info, warn};

/// An upload as received from the transport
#[derive(Debug, Clone)]
pub struct Upload {
    pub original_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
    pub category: DocumentCategory,
    pub links: DocumentLinks,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentFilter {
    pub category: Option<DocumentCategory>,
    pub university_id: Option<UniversityId>,
    pub application_id: Option<ApplicationId>,
    pub student_id: Option<StudentId>,
    pub intern_id: Option<InternId>,
    pub submission_id: Option<SubmissionId>,
}

/// Verified document content
#[derive(Debug, Clone)]
pub struct Download {
    pub document: Document,
    pub bytes: Vec<u8>,
}

/// Lower-case hex SHA-256
#[must_use]
pub fn checksum(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

pub struct DocumentService<'a> {
    ctx: &'a Context,
}

impl<'a> DocumentService<'a> {
    pub(crate) fn new(ctx: &'a Context) -> Self {
        Self { ctx }
    }

    fn store(&self) -> &Store {
        &self.ctx.store
    }

    pub async fn upload(&self, p: &Principal, upload: Upload) -> DomainResult<Document> {
        let settings = &self.ctx.settings;
        if upload.bytes.is_empty() {
            return Err(DomainError::validation("file is empty"));
        }
        let size = upload.bytes.len() as u64;
        if size > settings.max_upload_bytes {
            return Err(DomainError::PayloadTooLarge {
                limit: settings.max_upload_bytes,
            });
        }
        if !settings.accepts_content_type(&upload.content_type) {
            return Err(DomainError::UnsupportedMediaType(upload.content_type));
        }
        let original_name = validation::required("fileName", &upload.original_name, 255)?;
        let notes = validation::optional("notes", upload.notes.as_deref(), 1000)?;
        let links = resolve_links(self.store(), p, upload.links)?;

        let id = DocumentId::new();
        let now = Utc::now();
        let stored_name = stored_filename(id, &original_name);
        let storage_key = format!(
            "documents/{:04}/{:02}/{stored_name}",
            now.year(),
            now.month()
        );
        let document = Document {
            id,
            uploaded_by: p.user_id,
            original_name,
            stored_name,
            content_type: upload.content_type,
            size_bytes: size,
            checksum: checksum(&upload.bytes),
            storage_key,
            category: upload.category,
            links,
            notes,
            timestamps: Timestamps::new(now),
        };

        self.ctx.blobs.put(&document.storage_key, &upload.bytes).await?;
        let inserted = {
            let store = self.store();
            let _guard = store.writer();
            // linked rows may have gone while the content was written
            require_links_live(store, &document.links)
                .and_then(|()| store.documents.insert(document.clone()))
                .map(|_| {
                    let record = AuditRecord::new(EntityKind::Document, id, "upload");
                    store.record(record.by(p.user_id));
                })
        };
        if let Err(e) = inserted {
            if let Err(cleanup) = self.ctx.blobs.delete(&document.storage_key).await {
                warn!(
                    key = %document.storage_key,
                    error = %cleanup,
                    "orphaned blob after failed insert"
                );
            }
            return Err(e);
        }
        info!(
            document_id = %id,
            size_bytes = size,
            content_type = %document.content_type,
            "document uploaded"
        );
        Ok(document)
    }

    pub fn get(&self, p: &Principal, id: DocumentId) -> DomainResult<Document> {
        let store = self.store();
        let document = store.documents.get(id)?;
        if !can_view_document(store, p, &document) {
            return Err(DomainError::forbidden("no access to this document"));
        }
        Ok(document)
    }

    pub fn list(
        &self,
        p: &Principal,
        filter: &DocumentFilter,
        page: PageRequest,
    ) -> Page<Document> {
        let store = self.store();
        let rows = store.documents.list(|d| {
            filter.category.map_or(true, |c| d.category == c)
                && filter.university_id.map_or(true, |id| d.links.university_id == Some(id))
                && filter.application_id.map_or(true, |id| d.links.application_id == Some(id))
                && filter.student_id.map_or(true, |id| d.links.student_id == Some(id))
                && filter.intern_id.map_or(true, |id| d.links.intern_id == Some(id))
                && filter.submission_id.map_or(true, |id| d.links.submission_id == Some(id))
                && can_view_document(store, p, d)
        });
        page.apply(rows)
    }

    /// Content with its checksum re-verified
    pub async fn download(&self, p: &Principal, id: DocumentId) -> DomainResult<Download> {
        let document = self.get(p, id)?;
        let bytes = self.ctx.blobs.get(&document.storage_key).await?;
        let actual = checksum(&bytes);
        if actual != document.checksum {
            error!(
                document_id = %id,
                expected = %document.checksum,
                %actual,
                "document checksum mismatch"
            );
            return Err(DomainError::Storage(format!(
                "document {id} failed its integrity check"
            )));
        }
        debug!(document_id = %id, bytes = bytes.len(), "document downloaded");
        Ok(Download { document, bytes })
    }

    /// Soft-deletes the row and removes the content
    pub async fn delete(&self, p: &Principal, id: DocumentId) -> DomainResult<()> {
        let document = {
            let store = self.store();
            let _guard = store.writer();
            let document = store.documents.get(id)?;
            if !can_delete_document(p, &document) {
                return Err(DomainError::forbidden("only the uploader or an admin may delete"));
            }
            if store.submissions.any(|s| s.document_id == Some(id)) {
                return Err(DomainError::precondition(
                    "document is attached to a submission",
                ));
            }
            store.documents.soft_delete(id, Utc::now())?;
            store.record(AuditRecord::new(EntityKind::Document, id, "delete").by(p.user_id));
            document
        };
        if let Err(e) = self.ctx.blobs.delete(&document.storage_key).await {
            warn!(document_id = %id, error = %e, "document row deleted but content removal failed");
        }
        info!(document_id = %id, "document deleted");
        Ok(())
    }
}

/// Check that linked entities exist and the uploader may attach to them,
/// then fill in the links implied by the most specific one.
fn resolve_links(
    store: &Store,
    p: &Principal,
    requested: DocumentLinks,
) -> DomainResult<DocumentLinks> {
    let mut links = requested;
    if p.role == Role::Intern && links.intern_id.is_none() {
        links.intern_id = Some(own_intern(store, p)?.id);
    }

    if let Some(id) = links.submission_id {
        let submission = store.submissions.get(id)?;
        merge(&mut links.intern_id, submission.intern_id, "internId")?;
    }
    if let Some(id) = links.intern_id {
        let intern = store.interns.get(id)?;
        let allowed = match p.role {
            Role::Intern => intern.user_id == p.user_id,
            Role::University => p.university_id == Some(intern.university_id),
            Role::Admin | Role::Supervisor => can_supervise_intern(p, &intern),
        };
        if !allowed {
            return Err(DomainError::forbidden("cannot attach documents to this intern"));
        }
        merge(&mut links.student_id, intern.student_id, "studentId")?;
        merge(&mut links.university_id, intern.university_id, "universityId")?;
    }
    if let Some(id) = links.student_id {
        let student = store.students.get(id)?;
        merge(&mut links.application_id, student.application_id, "applicationId")?;
        merge(&mut links.university_id, student.university_id, "universityId")?;
    }
    if let Some(id) = links.application_id {
        let application = store.applications.get(id)?;
        merge(&mut links.university_id, application.university_id, "universityId")?;
    }
    if let Some(id) = links.university_id {
        store.universities.get(id)?;
        match p.role {
            Role::Admin => {}
            Role::University => p.require_university_access(id)?,
            // supervisors and interns only reach a university through an intern
            Role::Supervisor | Role::Intern if links.intern_id.is_some() => {}
            Role::Supervisor | Role::Intern => {
                return Err(DomainError::forbidden(
                    "cannot attach documents to a university directly",
                ));
            }
        }
    }
    Ok(links)
}

/// Every linked row still exists; caller holds the writer guard
fn require_links_live(store: &Store, links: &DocumentLinks) -> DomainResult<()> {
    if let Some(id) = links.submission_id {
        store.submissions.get(id)?;
    }
    if let Some(id) = links.intern_id {
        store.interns.get(id)?;
    }
    if let Some(id) = links.student_id {
        store.students.get(id)?;
    }
    if let Some(id) = links.application_id {
        store.applications.get(id)?;
    }
    if let Some(id) = links.university_id {
        store.universities.get(id)?;
    }
    Ok(())
}

fn merge<T: PartialEq + Copy + std::fmt::Display>(
    slot: &mut Option<T>,
    implied: T,
    field: &str,
) -> DomainResult<()> {
    match *slot {
        Some(given) if given != implied => Err(DomainError::validation(format!(
            "{field} {given} does not match the linked record ({implied})"
        ))),
        _ => {
            *slot = Some(implied);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_is_hex_sha256() {
        assert_eq!(
            checksum(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn merge_fills_and_checks() {
        let a = UniversityId::new();
        let mut slot = None;
        merge(&mut slot, a, "universityId").unwrap();
        assert_eq!(slot, Some(a));
        merge(&mut slot, a, "universityId").unwrap();
        assert!(merge(&mut slot, UniversityId::new(), "universityId").is_err());
    }
}
