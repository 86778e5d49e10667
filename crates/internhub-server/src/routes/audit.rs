use crate::error::ApiResult;
use crate::extract::{ApiQuery, Auth};
use crate::state::AppState;
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use internhub_core::{EntityKind, UserId};
use internhub_store::{AuditEvent, AuditFilter, IntegrityReport};
use serde::Deserialize;
use uuid::Uuid;

pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route("/audit", get(query))
        .route("/audit/verify", get(verify))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuditQuery {
    entity: Option<EntityKind>,
    entity_id: Option<Uuid>,
    actor: Option<UserId>,
    limit: Option<usize>,
}

impl From<AuditQuery> for AuditFilter {
    fn from(q: AuditQuery) -> Self {
        AuditFilter {
            entity: q.entity,
            entity_id: q.entity_id,
            actor: q.actor,
            limit: q.limit,
        }
    }
}

async fn query(
    State(state): State<AppState>,
    Auth(p): Auth,
    ApiQuery(query): ApiQuery<AuditQuery>,
) -> ApiResult<Json<Vec<AuditEvent>>> {
    Ok(Json(state.hub.audit().query(&p, query.into())?))
}

async fn verify(State(state): State<AppState>, Auth(p): Auth) -> ApiResult<Json<IntegrityReport>> {
    Ok(Json(state.hub.audit().verify(&p)?))
}
