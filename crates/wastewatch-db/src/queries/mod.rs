mod ledger;
mod notifications;
mod reports;
mod users;

pub(crate) use ledger::{apply_point_delta, ensure_account, record_transaction};
pub(crate) use notifications::notify;

use rusqlite::Connection;

use crate::StoreError;
use crate::models::ReportRow;

pub(crate) const REPORT_COLUMNS: &str =
    "id, user_id, location, waste_type, amount, image_url, verification, status, collector_id, created_at";

pub(crate) fn map_report_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ReportRow> {
    Ok(ReportRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        location: row.get(2)?,
        waste_type: row.get(3)?,
        amount: row.get(4)?,
        image_url: row.get(5)?,
        verification: row.get(6)?,
        status: row.get(7)?,
        collector_id: row.get(8)?,
        created_at: row.get(9)?,
    })
}

pub(crate) fn query_report(conn: &Connection, id: &str) -> Result<Option<ReportRow>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {REPORT_COLUMNS} FROM reports WHERE id = ?1"
    ))?;

    let row = stmt.query_row([id], map_report_row).optional()?;
    Ok(row)
}

/// Extension trait for optional query results
pub(crate) trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>, StoreError>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>, StoreError> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
