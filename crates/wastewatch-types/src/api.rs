use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Classification, ReportStatus, TransactionKind};

// -- JWT Claims --

/// JWT claims shared between wastewatch-api (login issuance) and the REST
/// middleware. Canonical definition lives here in wastewatch-types.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub exp: usize,
}

// -- Auth --

/// Identity payload handed over by the external wallet-login provider.
/// The provider has already authenticated the user; we only anchor an
/// account row to the email.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub email: String,
    pub name: String,
    pub token: String,
}

// -- Reports & tasks --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubmitReportRequest {
    pub location: String,
    pub waste_type: String,
    pub amount: String,
    pub image_url: Option<String>,
    pub verification: Option<Classification>,
}

#[derive(Debug, Serialize)]
pub struct ReportResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub location: String,
    pub waste_type: String,
    pub amount: String,
    pub image_url: Option<String>,
    pub verification: Option<Classification>,
    pub status: ReportStatus,
    pub collector_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateStatusRequest {
    pub status: ReportStatus,
}

// -- Classification --

/// Image bytes are carried base64-encoded, the same shape the external
/// classification service expects for inline data.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClassifyRequest {
    pub image: String,
    pub mime_type: String,
}

// -- Rewards --

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub balance: i64,
}

#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    pub id: Uuid,
    pub kind: TransactionKind,
    pub amount: i64,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct RewardOfferResponse {
    pub id: Uuid,
    pub name: String,
    pub cost: i64,
    pub description: Option<String>,
    pub collection_info: String,
}

/// `offer_id` absent means "redeem all points" (the synthetic catalog entry).
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RedeemRequest {
    pub offer_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct RedeemResponse {
    pub redeemed: i64,
    pub balance: i64,
}

#[derive(Debug, Serialize)]
pub struct LeaderboardEntry {
    pub user_id: Uuid,
    pub user_name: String,
    pub points: i64,
    pub level: i64,
}

// -- Notifications --

#[derive(Debug, Serialize)]
pub struct NotificationResponse {
    pub id: Uuid,
    pub message: String,
    pub kind: String,
    pub created_at: DateTime<Utc>,
}
