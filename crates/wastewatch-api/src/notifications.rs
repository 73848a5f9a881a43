use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use tracing::error;
use uuid::Uuid;

use wastewatch_types::api::{Claims, NotificationResponse};

use crate::auth::AppState;
use crate::error::ApiError;

pub async fn list_unread(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let user_id = claims.sub.to_string();
    let rows = tokio::task::spawn_blocking(move || db.db.unread_notifications(&user_id))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal
        })??;

    let notifications: Vec<NotificationResponse> = rows
        .into_iter()
        .map(|row| NotificationResponse {
            id: crate::parse_uuid(&row.id, "notification id"),
            message: row.message,
            kind: row.kind,
            created_at: crate::parse_timestamp(&row.created_at, "created_at"),
        })
        .collect();

    Ok(Json(notifications))
}

/// Idempotent: re-marking a read notification answers 200 again.
pub async fn mark_read(
    State(state): State<AppState>,
    Path(notification_id): Path<Uuid>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let nid = notification_id.to_string();
    tokio::task::spawn_blocking(move || db.db.mark_notification_read(&nid))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal
        })??;

    Ok(Json(serde_json::json!({ "read": true })))
}
