use axum::{
    Extension, Json,
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::{error, warn};

use wastewatch_types::api::{
    BalanceResponse, Claims, LeaderboardEntry, RedeemRequest, RedeemResponse,
    RewardOfferResponse, TransactionResponse,
};
use wastewatch_types::models::TransactionKind;

use crate::auth::AppState;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page_limit")]
    pub limit: u32,
}

fn default_page_limit() -> u32 {
    10
}

/// Balance derived from the full transaction history, not the cached
/// account counter.
pub async fn balance(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let user_id = claims.sub.to_string();
    let balance = tokio::task::spawn_blocking(move || db.db.balance(&user_id))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal
        })??;

    Ok(Json(BalanceResponse { balance }))
}

pub async fn list_transactions(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let user_id = claims.sub.to_string();
    let limit = query.limit.min(100);
    let rows = tokio::task::spawn_blocking(move || db.db.list_transactions(&user_id, limit))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal
        })??;

    let transactions: Vec<TransactionResponse> = rows
        .into_iter()
        .map(|row| TransactionResponse {
            id: crate::parse_uuid(&row.id, "transaction id"),
            kind: TransactionKind::parse(&row.kind).unwrap_or_else(|| {
                warn!("Corrupt kind '{}' on transaction '{}'", row.kind, row.id);
                TransactionKind::EarnedReport
            }),
            amount: row.amount,
            description: row.description,
            created_at: crate::parse_timestamp(&row.created_at, "created_at"),
        })
        .collect();

    Ok(Json(transactions))
}

/// Catalog of available offers, led by the synthetic "your points" entry.
pub async fn list_offers(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let user_id = claims.sub.to_string();
    let rows = tokio::task::spawn_blocking(move || db.db.list_available_offers(&user_id))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal
        })??;

    let offers: Vec<RewardOfferResponse> = rows
        .into_iter()
        .map(|row| RewardOfferResponse {
            id: crate::parse_uuid(&row.id, "offer id"),
            name: row.name,
            cost: row.cost,
            description: row.description,
            collection_info: row.collection_info,
        })
        .collect();

    Ok(Json(offers))
}

pub async fn redeem(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<RedeemRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let user_id = claims.sub.to_string();
    let offer_id = req.offer_id.map(|id| id.to_string());
    let (redeemed, balance) = tokio::task::spawn_blocking(move || {
        db.db.redeem(&user_id, offer_id.as_deref())
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal
    })??;

    Ok(Json(RedeemResponse { redeemed, balance }))
}

/// Public leaderboard: reward accounts joined with user names.
pub async fn leaderboard(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let limit = query.limit.min(100);
    let rows = tokio::task::spawn_blocking(move || db.db.leaderboard(limit))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal
        })??;

    let entries: Vec<LeaderboardEntry> = rows
        .into_iter()
        .map(|row| LeaderboardEntry {
            user_id: crate::parse_uuid(&row.user_id, "user id"),
            user_name: row.user_name,
            points: row.points,
            level: row.level,
        })
        .collect();

    Ok(Json(entries))
}
