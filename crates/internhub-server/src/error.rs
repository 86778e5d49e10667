//! HTTP error mapping

use axum::extract::multipart::MultipartError;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use internhub_core::{DomainError, ErrorCode};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error};

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    /// Malformed request the domain never saw
    #[error("{0}")]
    BadRequest(String),
    /// Body cut off by the request size limit
    #[error("request body too large: {0}")]
    BodyTooLarge(String),
    #[error("no route for {0}")]
    RouteNotFound(String),
}

/// Error response body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub status_code: u16,
    pub code: ErrorCode,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

pub fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::InvalidStatusTransition | ErrorCode::Conflict => StatusCode::CONFLICT,
        ErrorCode::PreconditionFailed => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
        ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorCode::Forbidden => StatusCode::FORBIDDEN,
        ErrorCode::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        ErrorCode::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        ErrorCode::StorageError | ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl ApiError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ApiError::Domain(err) => err.code(),
            ApiError::BadRequest(_) => ErrorCode::ValidationError,
            ApiError::BodyTooLarge(_) => ErrorCode::PayloadTooLarge,
            ApiError::RouteNotFound(_) => ErrorCode::NotFound,
        }
    }

    pub fn status(&self) -> StatusCode {
        status_for(self.code())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();
        if status.is_server_error() {
            error!(code = self.code().as_str(), "{message}");
        } else {
            debug!(code = self.code().as_str(), status = status.as_u16(), "{message}");
        }
        let body = ErrorBody {
            status_code: status.as_u16(),
            code: self.code(),
            message,
            timestamp: Utc::now(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection.status() {
            StatusCode::UNSUPPORTED_MEDIA_TYPE => {
                DomainError::UnsupportedMediaType(rejection.body_text()).into()
            }
            StatusCode::PAYLOAD_TOO_LARGE => ApiError::BodyTooLarge(rejection.body_text()),
            _ => ApiError::BadRequest(rejection.body_text()),
        }
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return ApiError::BodyTooLarge(err.body_text());
        }
        ApiError::BadRequest(err.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (DomainError::not_found(internhub_core::EntityKind::User, "x"), 404),
            (
                DomainError::IllegalTransition {
                    entity: internhub_core::EntityKind::Intern,
                    from: "ACTIVE".into(),
                    to: "ACTIVE".into(),
                },
                409,
            ),
            (DomainError::precondition("open submissions"), 422),
            (DomainError::validation("bad email"), 400),
            (DomainError::conflict("email taken"), 409),
            (DomainError::Unauthorized("token expired".into()), 401),
            (DomainError::forbidden("admin only"), 403),
            (DomainError::PayloadTooLarge { limit: 10 }, 413),
            (DomainError::UnsupportedMediaType("text/html".into()), 415),
            (DomainError::Storage("disk".into()), 500),
            (DomainError::Internal("bug".into()), 500),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status().as_u16(), status);
        }
    }

    #[test]
    fn test_bad_request_is_a_validation_error() {
        let err = ApiError::BadRequest("missing field `title`".into());
        assert_eq!(err.code(), ErrorCode::ValidationError);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
