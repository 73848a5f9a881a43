use chrono::Utc;
use rusqlite::Connection;
use uuid::Uuid;

use wastewatch_types::models::{
    COLLECT_REWARD_POINTS, REPORT_REWARD_POINTS, ReportStatus, TransactionKind,
};

use super::users::user_exists;
use super::{apply_point_delta, ensure_account, map_report_row, notify, query_report,
            record_transaction, REPORT_COLUMNS};
use crate::Database;
use crate::StoreError;
use crate::models::ReportRow;

impl Database {
    /// Submit a waste report. The report insert, reporter reward (account
    /// upsert + counter update + ledger append) and notification commit as
    /// one SQLite transaction: a failing step leaves no partial rows behind.
    pub fn submit_report(
        &self,
        user_id: &str,
        location: &str,
        waste_type: &str,
        amount: &str,
        image_url: Option<&str>,
        verification: Option<&str>,
    ) -> Result<ReportRow, StoreError> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let now = Utc::now().to_rfc3339();

            // Checked before anything is written.
            if !user_exists(&tx, user_id)? {
                return Err(StoreError::NotFound("user"));
            }

            let report_id = Uuid::new_v4().to_string();
            tx.execute(
                "INSERT INTO reports
                     (id, user_id, location, waste_type, amount, image_url, verification, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 'pending', ?8)",
                rusqlite::params![
                    report_id, user_id, location, waste_type, amount, image_url, verification, now
                ],
            )?;

            ensure_account(&tx, user_id, &now)?;
            apply_point_delta(&tx, user_id, REPORT_REWARD_POINTS, &now)?;
            record_transaction(
                &tx,
                user_id,
                TransactionKind::EarnedReport,
                REPORT_REWARD_POINTS,
                "Points earned for reporting waste",
                &now,
            )?;
            notify(
                &tx,
                user_id,
                &format!("You earned {REPORT_REWARD_POINTS} points for reporting waste"),
                "reward_earned",
                &now,
            )?;

            let row = query_report(&tx, &report_id)?.ok_or(StoreError::NotFound("report"))?;
            tx.commit()?;
            Ok(row)
        })
    }

    /// Move a report one step along its lifecycle, recording the acting
    /// collector. The update is conditional on the status the report had
    /// when this call read it; losing that race is a `Conflict`, as is
    /// asking for a status the report already holds. The final `verified`
    /// step credits the collector and logs the collection, all in the same
    /// transaction.
    pub fn update_task_status(
        &self,
        report_id: &str,
        collector_id: &str,
        new_status: ReportStatus,
    ) -> Result<ReportRow, StoreError> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let now = Utc::now().to_rfc3339();

            if !user_exists(&tx, collector_id)? {
                return Err(StoreError::NotFound("user"));
            }

            let current = query_report(&tx, report_id)?.ok_or(StoreError::NotFound("report"))?;
            let from = ReportStatus::parse(&current.status).ok_or_else(|| {
                StoreError::InvalidTransition {
                    from: current.status.clone(),
                    to: new_status.as_str().to_string(),
                }
            })?;

            if from == new_status {
                return Err(StoreError::Conflict("report is already in that status"));
            }
            if !from.can_transition_to(new_status) {
                return Err(StoreError::InvalidTransition {
                    from: from.as_str().to_string(),
                    to: new_status.as_str().to_string(),
                });
            }

            let changed = tx.execute(
                "UPDATE reports SET status = ?1, collector_id = ?2
                 WHERE id = ?3 AND status = ?4",
                rusqlite::params![new_status.as_str(), collector_id, report_id, from.as_str()],
            )?;
            if changed == 0 {
                return Err(StoreError::Conflict("report was claimed by another collector"));
            }

            if new_status == ReportStatus::Verified {
                ensure_account(&tx, collector_id, &now)?;
                apply_point_delta(&tx, collector_id, COLLECT_REWARD_POINTS, &now)?;
                record_transaction(
                    &tx,
                    collector_id,
                    TransactionKind::EarnedCollect,
                    COLLECT_REWARD_POINTS,
                    "Points earned for collecting waste",
                    &now,
                )?;
                notify(
                    &tx,
                    collector_id,
                    &format!("You earned {COLLECT_REWARD_POINTS} points for collecting waste"),
                    "reward_earned",
                    &now,
                )?;
                tx.execute(
                    "INSERT INTO collected_wastes (id, report_id, collector_id, collected_at)
                     VALUES (?1, ?2, ?3, ?4)",
                    rusqlite::params![Uuid::new_v4().to_string(), report_id, collector_id, now],
                )?;
            }

            let row = query_report(&tx, report_id)?.ok_or(StoreError::NotFound("report"))?;
            tx.commit()?;
            Ok(row)
        })
    }

    pub fn get_report(&self, id: &str) -> Result<Option<ReportRow>, StoreError> {
        self.with_conn(|conn| query_report(conn, id))
    }

    /// Collector task view: reports in every status, newest first. Callers
    /// filter by status on their side.
    pub fn list_tasks(&self, limit: u32) -> Result<Vec<ReportRow>, StoreError> {
        self.with_conn(|conn| query_reports_newest_first(conn, limit))
    }

    /// Public activity feed.
    pub fn list_recent_reports(&self, limit: u32) -> Result<Vec<ReportRow>, StoreError> {
        self.with_conn(|conn| query_reports_newest_first(conn, limit))
    }

    pub fn count_collected(&self, report_id: &str) -> Result<i64, StoreError> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM collected_wastes WHERE report_id = ?1",
                [report_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }
}

fn query_reports_newest_first(conn: &Connection, limit: u32) -> Result<Vec<ReportRow>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {REPORT_COLUMNS} FROM reports
         ORDER BY created_at DESC, id DESC
         LIMIT ?1"
    ))?;

    let rows = stmt
        .query_map([limit], map_report_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}
