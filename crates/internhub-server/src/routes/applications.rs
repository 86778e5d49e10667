use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath, ApiQuery, Auth, MaybeJson, PageQuery};
use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use internhub_core::{Application, ApplicationId, Page};
use internhub_service::applications::{ApplicationFilter, ApplicationUpdate, NewApplication};
use serde::Deserialize;

pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route("/applications", get(list).post(create))
        .route("/applications/{id}", get(show).patch(update).delete(remove))
        .route("/applications/{id}/review", post(review))
        .route("/applications/{id}/approve", post(approve))
        .route("/applications/{id}/reject", post(reject))
        .route("/applications/{id}/archive", post(archive))
}

#[derive(Debug, Default, Deserialize)]
struct ApproveBody {
    notes: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RejectBody {
    reason: String,
}

async fn list(
    State(state): State<AppState>,
    Auth(p): Auth,
    ApiQuery(filter): ApiQuery<ApplicationFilter>,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> ApiResult<Json<Page<Application>>> {
    Ok(Json(state.hub.applications().list(&p, &filter, page.into())?))
}

async fn create(
    State(state): State<AppState>,
    Auth(p): Auth,
    ApiJson(req): ApiJson<NewApplication>,
) -> ApiResult<(StatusCode, Json<Application>)> {
    let application = state.hub.applications().create(&p, req)?;
    Ok((StatusCode::CREATED, Json(application)))
}

async fn show(
    State(state): State<AppState>,
    Auth(p): Auth,
    ApiPath(id): ApiPath<ApplicationId>,
) -> ApiResult<Json<Application>> {
    Ok(Json(state.hub.applications().get(&p, id)?))
}

async fn update(
    State(state): State<AppState>,
    Auth(p): Auth,
    ApiPath(id): ApiPath<ApplicationId>,
    ApiJson(req): ApiJson<ApplicationUpdate>,
) -> ApiResult<Json<Application>> {
    Ok(Json(state.hub.applications().update(&p, id, req)?))
}

async fn remove(
    State(state): State<AppState>,
    Auth(p): Auth,
    ApiPath(id): ApiPath<ApplicationId>,
) -> ApiResult<StatusCode> {
    state.hub.applications().delete(&p, id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn review(
    State(state): State<AppState>,
    Auth(p): Auth,
    ApiPath(id): ApiPath<ApplicationId>,
) -> ApiResult<Json<Application>> {
    Ok(Json(state.hub.applications().start_review(&p, id)?))
}

async fn approve(
    State(state): State<AppState>,
    Auth(p): Auth,
    ApiPath(id): ApiPath<ApplicationId>,
    MaybeJson(body): MaybeJson<ApproveBody>,
) -> ApiResult<Json<Application>> {
    Ok(Json(state.hub.applications().approve(&p, id, body.notes)?))
}

async fn reject(
    State(state): State<AppState>,
    Auth(p): Auth,
    ApiPath(id): ApiPath<ApplicationId>,
    ApiJson(body): ApiJson<RejectBody>,
) -> ApiResult<Json<Application>> {
    Ok(Json(state.hub.applications().reject(&p, id, &body.reason)?))
}

async fn archive(
    State(state): State<AppState>,
    Auth(p): Auth,
    ApiPath(id): ApiPath<ApplicationId>,
) -> ApiResult<Json<Application>> {
    Ok(Json(state.hub.applications().archive(&p, id)?))
}
