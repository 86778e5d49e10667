use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath, ApiQuery, Auth, MaybeJson, PageQuery};
use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use internhub_core::{Page, Submission, SubmissionId};
use internhub_service::submissions::{
    NewSubmission, Resubmission, SubmissionFilter, SubmissionUpdate,
};
use serde::Deserialize;

pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route("/submissions", get(list).post(create))
        .route("/submissions/{id}", get(show).patch(update).delete(remove))
        .route("/submissions/{id}/review", post(review))
        .route("/submissions/{id}/approve", post(approve))
        .route("/submissions/{id}/reject", post(reject))
        .route("/submissions/{id}/resubmit", post(resubmit))
}

#[derive(Debug, Default, Deserialize)]
struct FeedbackBody {
    feedback: Option<String>,
}

async fn list(
    State(state): State<AppState>,
    Auth(p): Auth,
    ApiQuery(filter): ApiQuery<SubmissionFilter>,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> Json<Page<Submission>> {
    Json(state.hub.submissions().list(&p, &filter, page.into()))
}

async fn create(
    State(state): State<AppState>,
    Auth(p): Auth,
    ApiJson(req): ApiJson<NewSubmission>,
) -> ApiResult<(StatusCode, Json<Submission>)> {
    let submission = state.hub.submissions().create(&p, req)?;
    Ok((StatusCode::CREATED, Json(submission)))
}

async fn show(
    State(state): State<AppState>,
    Auth(p): Auth,
    ApiPath(id): ApiPath<SubmissionId>,
) -> ApiResult<Json<Submission>> {
    Ok(Json(state.hub.submissions().get(&p, id)?))
}

async fn update(
    State(state): State<AppState>,
    Auth(p): Auth,
    ApiPath(id): ApiPath<SubmissionId>,
    ApiJson(req): ApiJson<SubmissionUpdate>,
) -> ApiResult<Json<Submission>> {
    Ok(Json(state.hub.submissions().update(&p, id, req)?))
}

async fn remove(
    State(state): State<AppState>,
    Auth(p): Auth,
    ApiPath(id): ApiPath<SubmissionId>,
) -> ApiResult<StatusCode> {
    state.hub.submissions().delete(&p, id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn review(
    State(state): State<AppState>,
    Auth(p): Auth,
    ApiPath(id): ApiPath<SubmissionId>,
) -> ApiResult<Json<Submission>> {
    Ok(Json(state.hub.submissions().start_review(&p, id)?))
}

async fn approve(
    State(state): State<AppState>,
    Auth(p): Auth,
    ApiPath(id): ApiPath<SubmissionId>,
    MaybeJson(body): MaybeJson<FeedbackBody>,
) -> ApiResult<Json<Submission>> {
    Ok(Json(state.hub.submissions().approve(&p, id, body.feedback)?))
}

async fn reject(
    State(state): State<AppState>,
    Auth(p): Auth,
    ApiPath(id): ApiPath<SubmissionId>,
    MaybeJson(body): MaybeJson<FeedbackBody>,
) -> ApiResult<Json<Submission>> {
    let feedback = body.feedback.unwrap_or_default();
    Ok(Json(state.hub.submissions().reject(&p, id, &feedback)?))
}

async fn resubmit(
    State(state): State<AppState>,
    Auth(p): Auth,
    ApiPath(id): ApiPath<SubmissionId>,
    MaybeJson(req): MaybeJson<Resubmission>,
) -> ApiResult<Json<Submission>> {
    Ok(Json(state.hub.submissions().resubmit(&p, id, req)?))
}
