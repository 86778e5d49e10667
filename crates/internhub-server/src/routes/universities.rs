use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath, ApiQuery, Auth, PageQuery};
use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use internhub_core::{Page, University, UniversityId};
use internhub_service::universities::{NewUniversity, UniversityFilter, UniversityUpdate};

pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route("/universities", get(list).post(create))
        .route("/universities/{id}", get(show).patch(update).delete(remove))
}

async fn list(
    State(state): State<AppState>,
    Auth(p): Auth,
    ApiQuery(filter): ApiQuery<UniversityFilter>,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> ApiResult<Json<Page<University>>> {
    Ok(Json(state.hub.universities().list(&p, &filter, page.into())?))
}

async fn create(
    State(state): State<AppState>,
    Auth(p): Auth,
    ApiJson(req): ApiJson<NewUniversity>,
) -> ApiResult<(StatusCode, Json<University>)> {
    let university = state.hub.universities().create(&p, req)?;
    Ok((StatusCode::CREATED, Json(university)))
}

async fn show(
    State(state): State<AppState>,
    Auth(p): Auth,
    ApiPath(id): ApiPath<UniversityId>,
) -> ApiResult<Json<University>> {
    Ok(Json(state.hub.universities().get(&p, id)?))
}

async fn update(
    State(state): State<AppState>,
    Auth(p): Auth,
    ApiPath(id): ApiPath<UniversityId>,
    ApiJson(req): ApiJson<UniversityUpdate>,
) -> ApiResult<Json<University>> {
    Ok(Json(state.hub.universities().update(&p, id, req)?))
}

async fn remove(
    State(state): State<AppState>,
    Auth(p): Auth,
    ApiPath(id): ApiPath<UniversityId>,
) -> ApiResult<StatusCode> {
    state.hub.universities().delete(&p, id)?;
    Ok(StatusCode::NO_CONTENT)
}
