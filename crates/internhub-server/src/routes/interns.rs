use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath, ApiQuery, Auth, PageQuery};
use crate::state::AppState;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use internhub_core::{Intern, InternId, Page};
use internhub_service::interns::{InternFilter, InternUpdate};
use serde::Deserialize;

pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route("/interns", get(list))
        .route("/interns/{id}", get(show).patch(update))
        .route("/interns/{id}/suspend", post(suspend))
        .route("/interns/{id}/reinstate", post(reinstate))
        .route("/interns/{id}/complete", post(complete))
        .route("/interns/{id}/terminate", post(terminate))
}

#[derive(Debug, Deserialize)]
struct ReasonBody {
    reason: String,
}

async fn list(
    State(state): State<AppState>,
    Auth(p): Auth,
    ApiQuery(filter): ApiQuery<InternFilter>,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> Json<Page<Intern>> {
    Json(state.hub.interns().list(&p, &filter, page.into()))
}

async fn show(
    State(state): State<AppState>,
    Auth(p): Auth,
    ApiPath(id): ApiPath<InternId>,
) -> ApiResult<Json<Intern>> {
    Ok(Json(state.hub.interns().get(&p, id)?))
}

async fn update(
    State(state): State<AppState>,
    Auth(p): Auth,
    ApiPath(id): ApiPath<InternId>,
    ApiJson(req): ApiJson<InternUpdate>,
) -> ApiResult<Json<Intern>> {
    Ok(Json(state.hub.interns().update(&p, id, req)?))
}

async fn suspend(
    State(state): State<AppState>,
    Auth(p): Auth,
    ApiPath(id): ApiPath<InternId>,
    ApiJson(body): ApiJson<ReasonBody>,
) -> ApiResult<Json<Intern>> {
    Ok(Json(state.hub.interns().suspend(&p, id, &body.reason)?))
}

async fn reinstate(
    State(state): State<AppState>,
    Auth(p): Auth,
    ApiPath(id): ApiPath<InternId>,
) -> ApiResult<Json<Intern>> {
    Ok(Json(state.hub.interns().reinstate(&p, id)?))
}

async fn complete(
    State(state): State<AppState>,
    Auth(p): Auth,
    ApiPath(id): ApiPath<InternId>,
) -> ApiResult<Json<Intern>> {
    Ok(Json(state.hub.interns().complete(&p, id)?))
}

async fn terminate(
    State(state): State<AppState>,
    Auth(p): Auth,
    ApiPath(id): ApiPath<InternId>,
    ApiJson(body): ApiJson<ReasonBody>,
) -> ApiResult<Json<Intern>> {
    Ok(Json(state.hub.interns().terminate(&p, id, &body.reason)?))
}
