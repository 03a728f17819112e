use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

use maintops_core::DomainError;
use maintops_infra::ServiceError;

/// Handler error: a service failure rendered as `{"error": code, "message": text}`.
#[derive(Debug)]
pub struct ApiError(pub ServiceError);

impl From<ServiceError> for ApiError {
    fn from(value: ServiceError) -> Self {
        Self(value)
    }
}

impl From<DomainError> for ApiError {
    fn from(value: DomainError) -> Self {
        Self(value.into())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(value: JsonRejection) -> Self {
        Self(ServiceError::Validation(value.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(value: QueryRejection) -> Self {
        Self(ServiceError::Validation(value.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        service_error_to_response(self.0)
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

pub fn service_error_to_response(err: ServiceError) -> Response {
    match err {
        ServiceError::Unauthorized => {
            json_error(StatusCode::UNAUTHORIZED, "unauthorized", "not authenticated")
        }
        ServiceError::Forbidden(msg) => json_error(StatusCode::FORBIDDEN, "forbidden", msg),
        ServiceError::NotFound(entity) => {
            json_error(StatusCode::NOT_FOUND, "not_found", format!("{entity} not found"))
        }
        ServiceError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        ServiceError::Validation(msg) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", msg)
        }
        ServiceError::Store(msg) => {
            error!(error = %msg, "store failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", msg)
        }
    }
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_the_error_taxonomy() {
        let cases = [
            (ServiceError::Unauthorized, StatusCode::UNAUTHORIZED),
            (ServiceError::Forbidden("admin".into()), StatusCode::FORBIDDEN),
            (ServiceError::NotFound("work order"), StatusCode::NOT_FOUND),
            (ServiceError::Conflict("login".into()), StatusCode::CONFLICT),
            (ServiceError::Validation("empty".into()), StatusCode::BAD_REQUEST),
            (ServiceError::Store("disk".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError(err).into_response().status(), status);
        }
    }

    #[test]
    fn bad_ids_are_validation_errors() {
        let err: ApiError = DomainError::invalid_id("WorkOrderId: bad").into();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
