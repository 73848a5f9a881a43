use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Points credited to the reporter when a report is accepted.
pub const REPORT_REWARD_POINTS: i64 = 10;

/// Points credited to the collector when a collection is verified.
pub const COLLECT_REWARD_POINTS: i64 = 20;

/// Minimum classifier confidence for a result to be attached to a report.
pub const MIN_VERIFICATION_CONFIDENCE: f64 = 0.5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Lifecycle of a waste report. Transitions are forward-only:
/// pending -> in_progress -> completed -> verified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Pending,
    InProgress,
    Completed,
    Verified,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Pending => "pending",
            ReportStatus::InProgress => "in_progress",
            ReportStatus::Completed => "completed",
            ReportStatus::Verified => "verified",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ReportStatus::Pending),
            "in_progress" => Some(ReportStatus::InProgress),
            "completed" => Some(ReportStatus::Completed),
            "verified" => Some(ReportStatus::Verified),
            _ => None,
        }
    }

    /// The only legal successor of each state, if any.
    pub fn next(&self) -> Option<Self> {
        match self {
            ReportStatus::Pending => Some(ReportStatus::InProgress),
            ReportStatus::InProgress => Some(ReportStatus::Completed),
            ReportStatus::Completed => Some(ReportStatus::Verified),
            ReportStatus::Verified => None,
        }
    }

    pub fn can_transition_to(&self, next: ReportStatus) -> bool {
        self.next() == Some(next)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
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

/// Ledger entry kinds. Amounts are always positive; whether an entry
/// credits or debits the balance is implied by the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    EarnedReport,
    EarnedCollect,
    Redeemed,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::EarnedReport => "earned_report",
            TransactionKind::EarnedCollect => "earned_collect",
            TransactionKind::Redeemed => "redeemed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "earned_report" => Some(TransactionKind::EarnedReport),
            "earned_collect" => Some(TransactionKind::EarnedCollect),
            "redeemed" => Some(TransactionKind::Redeemed),
            _ => None,
        }
    }

    pub fn is_credit(&self) -> bool {
        matches!(
            self,
            TransactionKind::EarnedReport | TransactionKind::EarnedCollect
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: TransactionKind,
    pub amount: i64,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardAccount {
    pub id: Uuid,
    pub user_id: Uuid,
    pub points: i64,
    pub level: i64,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub message: String,
    pub kind: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// A redeemable offer from the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardOffer {
    pub id: Uuid,
    pub name: String,
    pub cost: i64,
    pub description: Option<String>,
    pub collection_info: String,
    pub is_available: bool,
}

/// Structured result of the external waste classification call.
/// Field names follow the external service's JSON contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub waste_type: String,
    pub quantity: String,
    pub confidence: f64,
}

/// Result of the second verification pass at collection time: does the
/// collected pile match what the report described?
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionCheck {
    pub waste_type_match: bool,
    pub quantity_match: bool,
    pub confidence: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_transitions_are_forward_only() {
        use ReportStatus::*;

        assert!(Pending.can_transition_to(InProgress));
        assert!(InProgress.can_transition_to(Completed));
        assert!(Completed.can_transition_to(Verified));

        // No backwards or skipping moves.
        assert!(!InProgress.can_transition_to(Pending));
        assert!(!Verified.can_transition_to(Pending));
        assert!(!Pending.can_transition_to(Completed));
        assert!(!Pending.can_transition_to(Verified));
        assert!(Verified.next().is_none());
    }

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            ReportStatus::Pending,
            ReportStatus::InProgress,
            ReportStatus::Completed,
            ReportStatus::Verified,
        ] {
            assert_eq!(ReportStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ReportStatus::parse("collected"), None);
    }

    #[test]
    fn kind_credit_semantics() {
        assert!(TransactionKind::EarnedReport.is_credit());
        assert!(TransactionKind::EarnedCollect.is_credit());
        assert!(!TransactionKind::Redeemed.is_credit());
    }
}
