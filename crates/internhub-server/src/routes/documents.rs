use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiPath, ApiQuery, Auth, PageQuery};
use crate::state::AppState;
use axum::extract::{Multipart, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use internhub_core::filename::sanitize_filename;
use internhub_core::{Document, DocumentCategory, DocumentId, DocumentLinks, Page};
use internhub_service::documents::{DocumentFilter, Upload};
use std::str::FromStr;

pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route("/documents", get(list).post(upload))
        .route("/documents/{id}", get(show).delete(remove))
        .route("/documents/{id}/download", get(download))
}

fn parse_field<T: FromStr>(name: &str, value: &str) -> ApiResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid value for '{name}'")))
}

/// Multipart fields: `file` plus optional `category`, `notes` and link ids
async fn read_upload(mut multipart: Multipart) -> ApiResult<Upload> {
    let mut file: Option<(String, String, Vec<u8>)> = None;
    let mut category = DocumentCategory::Other;
    let mut notes = None;
    let mut links = DocumentLinks::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            let original_name = field.file_name().unwrap_or("upload").to_string();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = field.bytes().await?;
            file = Some((original_name, content_type, bytes.to_vec()));
            continue;
        }
        let value = field.text().await?;
        if value.trim().is_empty() {
            continue;
        }
        match name.as_str() {
            "category" => {
                category = value.trim().to_ascii_uppercase().parse::<DocumentCategory>()?;
            }
            "notes" => notes = Some(value),
            "universityId" => links.university_id = Some(parse_field(&name, &value)?),
            "applicationId" => links.application_id = Some(parse_field(&name, &value)?),
            "studentId" => links.student_id = Some(parse_field(&name, &value)?),
            "internId" => links.intern_id = Some(parse_field(&name, &value)?),
            "submissionId" => links.submission_id = Some(parse_field(&name, &value)?),
            other => return Err(ApiError::BadRequest(format!("unexpected field '{other}'"))),
        }
    }

    let (original_name, content_type, bytes) =
        file.ok_or_else(|| ApiError::BadRequest("missing 'file' field".into()))?;
    Ok(Upload {
        original_name,
        content_type,
        bytes,
        category,
        links,
        notes,
    })
}

async fn upload(
    State(state): State<AppState>,
    Auth(p): Auth,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<Document>)> {
    let upload = read_upload(multipart).await?;
    let document = state.hub.documents().upload(&p, upload).await?;
    Ok((StatusCode::CREATED, Json(document)))
}

async fn list(
    State(state): State<AppState>,
    Auth(p): Auth,
    ApiQuery(filter): ApiQuery<DocumentFilter>,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> Json<Page<Document>> {
    Json(state.hub.documents().list(&p, &filter, page.into()))
}

async fn show(
    State(state): State<AppState>,
    Auth(p): Auth,
    ApiPath(id): ApiPath<DocumentId>,
) -> ApiResult<Json<Document>> {
    Ok(Json(state.hub.documents().get(&p, id)?))
}

async fn download(
    State(state): State<AppState>,
    Auth(p): Auth,
    ApiPath(id): ApiPath<DocumentId>,
) -> ApiResult<Response> {
    let download = state.hub.documents().download(&p, id).await?;
    let doc = &download.document;
    let content_type = HeaderValue::from_str(&doc.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename=\"{}\"",
        sanitize_filename(&doc.original_name)
    ))
    .unwrap_or_else(|_| HeaderValue::from_static("attachment"));
    let headers = [
        (CONTENT_TYPE, content_type),
        (CONTENT_DISPOSITION, disposition),
    ];
    Ok((headers, download.bytes).into_response())
}

async fn remove(
    State(state): State<AppState>,
    Auth(p): Auth,
    ApiPath(id): ApiPath<DocumentId>,
) -> ApiResult<StatusCode> {
    state.hub.documents().delete(&p, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
