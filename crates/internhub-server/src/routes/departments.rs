use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath, ApiQuery, Auth, PageQuery};
use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use internhub_core::{Department, DepartmentId, Page};
use internhub_service::departments::{DepartmentUpdate, NewDepartment};
use serde::Deserialize;

pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route("/departments", get(list).post(create))
        .route("/departments/{id}", get(show).patch(update).delete(remove))
}

#[derive(Debug, Default, Deserialize)]
struct DepartmentQuery {
    search: Option<String>,
}

async fn list(
    State(state): State<AppState>,
    Auth(p): Auth,
    ApiQuery(query): ApiQuery<DepartmentQuery>,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> Json<Page<Department>> {
    Json(
        state
            .hub
            .departments()
            .list(&p, query.search.as_deref(), page.into()),
    )
}

async fn create(
    State(state): State<AppState>,
    Auth(p): Auth,
    ApiJson(req): ApiJson<NewDepartment>,
) -> ApiResult<(StatusCode, Json<Department>)> {
    let department = state.hub.departments().create(&p, req)?;
    Ok((StatusCode::CREATED, Json(department)))
}

async fn show(
    State(state): State<AppState>,
    Auth(p): Auth,
    ApiPath(id): ApiPath<DepartmentId>,
) -> ApiResult<Json<Department>> {
    Ok(Json(state.hub.departments().get(&p, id)?))
}

async fn update(
    State(state): State<AppState>,
    Auth(p): Auth,
    ApiPath(id): ApiPath<DepartmentId>,
    ApiJson(req): ApiJson<DepartmentUpdate>,
) -> ApiResult<Json<Department>> {
    Ok(Json(state.hub.departments().update(&p, id, req)?))
}

async fn remove(
    State(state): State<AppState>,
    Auth(p): Auth,
    ApiPath(id): ApiPath<DepartmentId>,
) -> ApiResult<StatusCode> {
    state.hub.departments().delete(&p, id)?;
    Ok(StatusCode::NO_CONTENT)
}
