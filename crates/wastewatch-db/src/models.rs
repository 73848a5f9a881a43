/// Database row types — these map directly to SQLite rows.
/// Distinct from wastewatch-types API models to keep the DB layer independent.

pub struct UserRow {
    pub id: String,
    pub email: String,
    pub name: String,
    pub created_at: String,
}

#[derive(Debug)]
pub struct ReportRow {
    pub id: String,
    pub user_id: String,
    pub location: String,
    pub waste_type: String,
    pub amount: String,
    pub image_url: Option<String>,
    pub verification: Option<String>,
    pub status: String,
    pub collector_id: Option<String>,
    pub created_at: String,
}

pub struct RewardAccountRow {
    pub id: String,
    pub user_id: String,
    pub points: i64,
    pub level: i64,
    pub is_available: bool,
    pub created_at: String,
    pub updated_at: String,
}

pub struct TransactionRow {
    pub id: String,
    pub user_id: String,
    pub kind: String,
    pub amount: i64,
    pub description: String,
    pub created_at: String,
}

pub struct NotificationRow {
    pub id: String,
    pub user_id: String,
    pub message: String,
    pub kind: String,
    pub is_read: bool,
    pub created_at: String,
}

pub struct RewardOfferRow {
    pub id: String,
    pub name: String,
    pub cost: i64,
    pub description: Option<String>,
    pub collection_info: String,
    pub is_available: bool,
}

/// Leaderboard projection: reward accounts joined with user names.
pub struct LeaderboardRow {
    pub user_id: String,
    pub user_name: String,
    pub points: i64,
    pub level: i64,
}

pub struct CollectedWasteRow {
    pub id: String,
    pub report_id: String,
    pub collector_id: String,
    pub collected_at: String,
    pub status: String,
}
