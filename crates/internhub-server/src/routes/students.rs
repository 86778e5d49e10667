use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath, ApiQuery, Auth, MaybeJson, PageQuery};
use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use internhub_core::{ApplicationId, DepartmentId, Page, Student, StudentId};
use internhub_service::students::{
    AccountRequest, CreatedAccount, NewStudent, StudentFilter, StudentUpdate,
};
use serde::Deserialize;

pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/applications/{id}/students",
            get(list_for_application).post(add),
        )
        .route("/students", get(list))
        .route("/students/{id}", get(show).patch(update).delete(remove))
        .route("/students/{id}/accept", post(accept))
        .route("/students/{id}/reject", post(reject))
        .route("/students/{id}/schedule-arrival", post(schedule_arrival))
        .route("/students/{id}/mark-arrived", post(mark_arrived))
        .route("/students/{id}/create-account", post(create_account))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AcceptBody {
    department_id: Option<DepartmentId>,
}

#[derive(Debug, Deserialize)]
struct RejectBody {
    reason: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArrivalBody {
    arrival_date: NaiveDate,
}

async fn list_for_application(
    State(state): State<AppState>,
    Auth(p): Auth,
    ApiPath(application_id): ApiPath<ApplicationId>,
    ApiQuery(mut filter): ApiQuery<StudentFilter>,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> ApiResult<Json<Page<Student>>> {
    // scoping by application also checks the caller may see it
    state.hub.applications().get(&p, application_id)?;
    filter.application_id = Some(application_id);
    Ok(Json(state.hub.students().list(&p, &filter, page.into())?))
}

async fn add(
    State(state): State<AppState>,
    Auth(p): Auth,
    ApiPath(application_id): ApiPath<ApplicationId>,
    ApiJson(req): ApiJson<NewStudent>,
) -> ApiResult<(StatusCode, Json<Student>)> {
    let student = state.hub.students().add(&p, application_id, req)?;
    Ok((StatusCode::CREATED, Json(student)))
}

async fn list(
    State(state): State<AppState>,
    Auth(p): Auth,
    ApiQuery(filter): ApiQuery<StudentFilter>,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> ApiResult<Json<Page<Student>>> {
    Ok(Json(state.hub.students().list(&p, &filter, page.into())?))
}

async fn show(
    State(state): State<AppState>,
    Auth(p): Auth,
    ApiPath(id): ApiPath<StudentId>,
) -> ApiResult<Json<Student>> {
    Ok(Json(state.hub.students().get(&p, id)?))
}

async fn update(
    State(state): State<AppState>,
    Auth(p): Auth,
    ApiPath(id): ApiPath<StudentId>,
    ApiJson(req): ApiJson<StudentUpdate>,
) -> ApiResult<Json<Student>> {
    Ok(Json(state.hub.students().update(&p, id, req)?))
}

async fn remove(
    State(state): State<AppState>,
    Auth(p): Auth,
    ApiPath(id): ApiPath<StudentId>,
) -> ApiResult<StatusCode> {
    state.hub.students().delete(&p, id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn accept(
    State(state): State<AppState>,
    Auth(p): Auth,
    ApiPath(id): ApiPath<StudentId>,
    MaybeJson(body): MaybeJson<AcceptBody>,
) -> ApiResult<Json<Student>> {
    Ok(Json(state.hub.students().accept(&p, id, body.department_id)?))
}

async fn reject(
    State(state): State<AppState>,
    Auth(p): Auth,
    ApiPath(id): ApiPath<StudentId>,
    ApiJson(body): ApiJson<RejectBody>,
) -> ApiResult<Json<Student>> {
    Ok(Json(state.hub.students().reject(&p, id, &body.reason)?))
}

async fn schedule_arrival(
    State(state): State<AppState>,
    Auth(p): Auth,
    ApiPath(id): ApiPath<StudentId>,
    ApiJson(body): ApiJson<ArrivalBody>,
) -> ApiResult<Json<Student>> {
    Ok(Json(
        state
            .hub
            .students()
            .schedule_arrival(&p, id, body.arrival_date)?,
    ))
}

async fn mark_arrived(
    State(state): State<AppState>,
    Auth(p): Auth,
    ApiPath(id): ApiPath<StudentId>,
) -> ApiResult<Json<Student>> {
    Ok(Json(state.hub.students().mark_arrived(&p, id)?))
}

async fn create_account(
    State(state): State<AppState>,
    Auth(p): Auth,
    ApiPath(id): ApiPath<StudentId>,
    MaybeJson(req): MaybeJson<AccountRequest>,
) -> ApiResult<(StatusCode, Json<CreatedAccount>)> {
    let account = state.hub.students().create_account(&p, id, req)?;
    Ok((StatusCode::CREATED, Json(account)))
}
