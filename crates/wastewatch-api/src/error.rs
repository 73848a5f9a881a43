use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

use wastewatch_classify::ClassifyError;
use wastewatch_db::StoreError;

/// API-level failure type. Every handler error passes through here so the
/// HTTP mapping of the domain taxonomy lives in exactly one place.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Classify(#[from] ClassifyError),

    #[error("authentication required")]
    Unauthorized,

    #[error("{0}")]
    Validation(String),

    #[error("internal error")]
    Internal,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Store(StoreError::NotFound(what)) => {
                (StatusCode::NOT_FOUND, format!("{what} not found"))
            }
            ApiError::Store(StoreError::Conflict(_)) => {
                (StatusCode::CONFLICT, self.to_string())
            }
            ApiError::Store(StoreError::InvalidTransition { .. })
            | ApiError::Store(StoreError::InsufficientPoints { .. })
            | ApiError::Store(StoreError::InvalidAmount(_)) => {
                (StatusCode::UNPROCESSABLE_ENTITY, self.to_string())
            }
            ApiError::Store(e @ StoreError::Persistence(_))
            | ApiError::Store(e @ StoreError::LockPoisoned) => {
                error!("store failure: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "something went wrong, please retry".to_string(),
                )
            }
            ApiError::Classify(e) => {
                error!("classification failure: {}", e);
                (StatusCode::BAD_GATEWAY, self.to_string())
            }
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            ApiError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, self.to_string()),
            ApiError::Internal => {
                error!("internal handler failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "something went wrong, please retry".to_string(),
                )
            }
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_map_to_expected_status_codes() {
        let cases = [
            (
                ApiError::Store(StoreError::NotFound("report")),
                StatusCode::NOT_FOUND,
            ),
            (
                ApiError::Store(StoreError::Conflict("claimed")),
                StatusCode::CONFLICT,
            ),
            (
                ApiError::Store(StoreError::InsufficientPoints { have: 1, need: 5 }),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                ApiError::Classify(ClassifyError::Parse("bad".into())),
                StatusCode::BAD_GATEWAY,
            ),
            (ApiError::Unauthorized, StatusCode::UNAUTHORIZED),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }
}
