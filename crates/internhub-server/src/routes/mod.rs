//! Route table
//!
//! Every resource module exposes a `router()` mounted under `/api`.

use crate::state::AppState;
use axum::Router;

mod applications;
mod audit;
mod auth;
mod dashboard;
mod departments;
mod documents;
mod health;
mod interns;
mod students;
mod submissions;
mod universities;
mod users;

/// All `/api` routes
pub fn api() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .merge(users::router())
        .merge(universities::router())
        .merge(departments::router())
        .merge(applications::router())
        .merge(students::router())
        .merge(interns::router())
        .merge(submissions::router())
        .merge(documents::router())
        .merge(dashboard::router())
        .merge(audit::router())
}

pub fn health() -> Router<AppState> {
    health::router()
}
