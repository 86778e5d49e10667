use crate::error::ApiResult;
use crate::extract::{ApiJson, Auth};
use crate::state::AppState;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use internhub_core::UserView;
use internhub_service::{LoginRequest, LoginResponse};

pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/me", get(me))
}

async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    Ok(Json(state.hub.auth().login(&req)?))
}

async fn me(State(state): State<AppState>, Auth(p): Auth) -> ApiResult<Json<UserView>> {
    Ok(Json(state.hub.auth().me(&p)?))
}
