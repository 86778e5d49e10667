use crate::error::ApiResult;
use crate::extract::Auth;
use crate::state::AppState;
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use internhub_service::dashboard::DashboardSummary;

pub(super) fn router() -> Router<AppState> {
    Router::new().route("/dashboard/summary", get(summary))
}

async fn summary(
    State(state): State<AppState>,
    Auth(p): Auth,
) -> ApiResult<Json<DashboardSummary>> {
    Ok(Json(state.hub.dashboard().summary(&p)?))
}
