use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use serde::Deserialize;
use tracing::{error, warn};
use uuid::Uuid;

use wastewatch_db::models::ReportRow;
use wastewatch_types::api::{
    Claims, ClassifyRequest, ReportResponse, SubmitReportRequest, UpdateStatusRequest,
};
use wastewatch_types::models::{MIN_VERIFICATION_CONFIDENCE, ReportStatus};

use crate::auth::AppState;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    #[serde(default = "default_feed_limit")]
    pub limit: u32,
}

fn default_feed_limit() -> u32 {
    20
}

/// Submit a waste report. An attached classification must clear the
/// confidence gate before it is stored as the report's verification.
pub async fn submit_report(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SubmitReportRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.location.trim().is_empty() || req.waste_type.trim().is_empty() {
        return Err(ApiError::Validation(
            "location and waste type are required".into(),
        ));
    }

    let verification_json = match &req.verification {
        Some(v) => {
            if !(0.0..=1.0).contains(&v.confidence) {
                return Err(ApiError::Validation("confidence outside [0, 1]".into()));
            }
            if v.confidence < MIN_VERIFICATION_CONFIDENCE {
                return Err(ApiError::Validation(format!(
                    "classification confidence {} below the {} acceptance threshold",
                    v.confidence, MIN_VERIFICATION_CONFIDENCE
                )));
            }
            Some(serde_json::to_string(v).map_err(|e| {
                error!("verification serialization failed: {}", e);
                ApiError::Internal
            })?)
        }
        None => None,
    };

    // Run blocking DB work off the async runtime
    let db = state.clone();
    let user_id = claims.sub.to_string();
    let row = tokio::task::spawn_blocking(move || {
        db.db.submit_report(
            &user_id,
            req.location.trim(),
            req.waste_type.trim(),
            req.amount.trim(),
            req.image_url.as_deref(),
            verification_json.as_deref(),
        )
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal
    })??;

    Ok((StatusCode::CREATED, Json(report_response(row))))
}

/// Classify a waste photo without touching any report state.
pub async fn classify(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
    Json(req): Json<ClassifyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let image = decode_image(&req.image)?;
    let result = state.classifier.classify(&image, &req.mime_type).await?;
    Ok(Json(result))
}

/// Move a task along its lifecycle, recording the caller as collector.
pub async fn update_status(
    State(state): State<AppState>,
    Path(report_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let rid = report_id.to_string();
    let collector_id = claims.sub.to_string();
    let row = tokio::task::spawn_blocking(move || {
        db.db.update_task_status(&rid, &collector_id, req.status)
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal
    })??;

    Ok(Json(report_response(row)))
}

/// Verify a completed collection against the report with a second
/// classification pass; a convincing match performs the `verified`
/// transition and pays the collector.
pub async fn verify_collection(
    State(state): State<AppState>,
    Path(report_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ClassifyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let rid = report_id.to_string();
    let report = tokio::task::spawn_blocking(move || db.db.get_report(&rid))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal
        })??
        .ok_or(wastewatch_db::StoreError::NotFound("report"))?;

    let image = decode_image(&req.image)?;
    let check = state
        .classifier
        .verify_collection(&image, &req.mime_type, &report.waste_type, &report.amount)
        .await?;

    let matches = check.waste_type_match
        && check.quantity_match
        && check.confidence >= MIN_VERIFICATION_CONFIDENCE;
    if !matches {
        return Ok(Json(serde_json::json!({
            "verified": false,
            "check": check,
        })));
    }

    let db = state.clone();
    let rid = report_id.to_string();
    let collector_id = claims.sub.to_string();
    let row = tokio::task::spawn_blocking(move || {
        db.db
            .update_task_status(&rid, &collector_id, ReportStatus::Verified)
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal
    })??;

    Ok(Json(serde_json::json!({
        "verified": true,
        "check": check,
        "report": report_response(row),
    })))
}

/// Collector task browser: reports in every status, newest first.
pub async fn list_tasks(
    State(state): State<AppState>,
    Query(query): Query<FeedQuery>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let limit = query.limit.min(100);
    let rows = tokio::task::spawn_blocking(move || db.db.list_tasks(limit))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal
        })??;

    let tasks: Vec<ReportResponse> = rows.into_iter().map(report_response).collect();
    Ok(Json(tasks))
}

/// Public activity feed of the most recent reports.
pub async fn list_recent(
    State(state): State<AppState>,
    Query(query): Query<FeedQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let limit = query.limit.min(100);
    let rows = tokio::task::spawn_blocking(move || db.db.list_recent_reports(limit))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal
        })??;

    let reports: Vec<ReportResponse> = rows.into_iter().map(report_response).collect();
    Ok(Json(reports))
}

fn decode_image(b64: &str) -> Result<Vec<u8>, ApiError> {
    B64.decode(b64)
        .map_err(|_| ApiError::Validation("image is not valid base64".into()))
}

pub(crate) fn report_response(row: ReportRow) -> ReportResponse {
    let verification = row.verification.as_deref().and_then(|raw| {
        serde_json::from_str(raw)
            .map_err(|e| warn!("Corrupt verification on report '{}': {}", row.id, e))
            .ok()
    });

    let status = ReportStatus::parse(&row.status).unwrap_or_else(|| {
        warn!("Corrupt status '{}' on report '{}'", row.status, row.id);
        ReportStatus::Pending
    });

    ReportResponse {
        id: crate::parse_uuid(&row.id, "report id"),
        user_id: crate::parse_uuid(&row.user_id, "user id"),
        location: row.location,
        waste_type: row.waste_type,
        amount: row.amount,
        image_url: row.image_url,
        verification,
        status,
        collector_id: row
            .collector_id
            .as_deref()
            .map(|id| crate::parse_uuid(id, "collector id")),
        created_at: crate::parse_timestamp(&row.created_at, "created_at"),
    }
}
