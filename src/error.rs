use actix_web::{error::JsonPayloadError, http::StatusCode, HttpRequest, HttpResponse, ResponseError};
use log::error;
use serde_json::json;

use crate::store::StoreError;

/// Every failure a request can end in. Converted to `{"error": message}`
/// at the HTTP boundary.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    /// Missing credentials (401).
    #[error("{0}")]
    Unauthorized(String),

    /// Bad credentials or insufficient role (403).
    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    /// The detail is logged, never sent to the client.
    #[error("internal error: {0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn message(&self) -> String {
        match self {
            ApiError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let ApiError::Internal(detail) = self {
            error!("Internal error: {}", detail);
        }
        HttpResponse::build(self.status_code()).json(json!({ "error": self.message() }))
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(_) => ApiError::Conflict("Email already exists".to_string()),
            StoreError::Backend(detail) => ApiError::Internal(detail),
        }
    }
}

impl From<bcrypt::BcryptError> for ApiError {
    fn from(err: bcrypt::BcryptError) -> Self {
        ApiError::Internal(format!("password hashing failed: {}", err))
    }
}

impl From<jsonwebtoken::errors::Error> for ApiError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        ApiError::Internal(format!("token signing failed: {}", err))
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Internal(format!("blocking task failed: {}", err))
    }
}

/// Error handler for `web::Json` so malformed bodies get the same JSON shape.
pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::Validation(format!("Invalid request body: {}", err)).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    async fn render(err: ApiError) -> (StatusCode, serde_json::Value) {
        let resp = err.error_response();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body()).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[actix_web::test]
    async fn taxonomy_maps_to_status_codes() {
        let cases = vec![
            (ApiError::Validation("Title is required".into()), 400, "Title is required"),
            (ApiError::Conflict("Email already exists".into()), 409, "Email already exists"),
            (ApiError::Unauthorized("No token provided".into()), 401, "No token provided"),
            (ApiError::Forbidden("Invalid token".into()), 403, "Invalid token"),
            (ApiError::NotFound("Todo not found".into()), 404, "Todo not found"),
        ];
        for (err, code, message) in cases {
            let (status, body) = render(err).await;
            assert_eq!(status.as_u16(), code);
            assert_eq!(body["error"], message);
        }
    }

    #[actix_web::test]
    async fn internal_errors_hide_their_detail() {
        let (status, body) = render(ApiError::Internal("connection reset by 10.0.0.7".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal server error");
    }

    #[test]
    fn duplicate_store_errors_become_conflicts() {
        let err: ApiError = StoreError::Duplicate("users.email".into()).into();
        assert!(matches!(err, ApiError::Conflict(ref m) if m == "Email already exists"));

        let err: ApiError = StoreError::Backend("timeout".into()).into();
        assert!(matches!(err, ApiError::Internal(_)));
    }
}
