pub mod auth;
pub mod error;
pub mod middleware;
pub mod notifications;
pub mod reports;
pub mod rewards;

use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

/// Parse a stored uuid, falling back to the nil uuid on corrupt data so a
/// single bad row cannot take a whole listing down.
pub(crate) fn parse_uuid(raw: &str, field: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}': {}", field, raw, e);
        Uuid::default()
    })
}

pub(crate) fn parse_timestamp(raw: &str, field: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // SQLite default timestamps are "YYYY-MM-DD HH:MM:SS" without
            // timezone. Parse as naive UTC and convert.
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt {} '{}': {}", field, raw, e);
            DateTime::default()
        })
}
