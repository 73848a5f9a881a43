use rusqlite::Connection;
use tracing::info;

use crate::StoreError;

pub fn run(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            email       TEXT NOT NULL UNIQUE,
            name        TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS reports (
            id              TEXT PRIMARY KEY,
            user_id         TEXT NOT NULL REFERENCES users(id),
            location        TEXT NOT NULL,
            waste_type      TEXT NOT NULL,
            amount          TEXT NOT NULL,
            image_url       TEXT,
            verification    TEXT,
            status          TEXT NOT NULL DEFAULT 'pending',
            collector_id    TEXT REFERENCES users(id),
            created_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_reports_created
            ON reports(created_at);
        CREATE INDEX IF NOT EXISTS idx_reports_status
            ON reports(status);

        CREATE TABLE IF NOT EXISTS reward_accounts (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL UNIQUE REFERENCES users(id),
            points      INTEGER NOT NULL DEFAULT 0,
            level       INTEGER NOT NULL DEFAULT 1,
            is_available INTEGER NOT NULL DEFAULT 1,
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS transactions (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL REFERENCES users(id),
            kind        TEXT NOT NULL,
            amount      INTEGER NOT NULL CHECK (amount > 0),
            description TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_transactions_user
            ON transactions(user_id, created_at);

        CREATE TABLE IF NOT EXISTS notifications (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL REFERENCES users(id),
            message     TEXT NOT NULL,
            kind        TEXT NOT NULL,
            is_read     INTEGER NOT NULL DEFAULT 0,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_notifications_user_unread
            ON notifications(user_id, is_read);

        CREATE TABLE IF NOT EXISTS reward_offers (
            id              TEXT PRIMARY KEY,
            name            TEXT NOT NULL,
            cost            INTEGER NOT NULL,
            description     TEXT,
            collection_info TEXT NOT NULL,
            is_available    INTEGER NOT NULL DEFAULT 1
        );

        CREATE TABLE IF NOT EXISTS collected_wastes (
            id            TEXT PRIMARY KEY,
            report_id     TEXT NOT NULL REFERENCES reports(id),
            collector_id  TEXT NOT NULL REFERENCES users(id),
            collected_at  TEXT NOT NULL DEFAULT (datetime('now')),
            status        TEXT NOT NULL DEFAULT 'collected'
        );

        -- Seed the starter reward catalog
        INSERT OR IGNORE INTO reward_offers (id, name, cost, description, collection_info)
            VALUES ('00000000-0000-0000-0000-000000000101',
                    'Reusable tote bag', 50,
                    'Sturdy canvas tote for plastic-free shopping',
                    'Pick up at any partner collection point');
        INSERT OR IGNORE INTO reward_offers (id, name, cost, description, collection_info)
            VALUES ('00000000-0000-0000-0000-000000000102',
                    'Compost starter kit', 120,
                    'Counter-top bin plus a starter culture',
                    'Shipped to the address on your profile');
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
