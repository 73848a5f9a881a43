use chrono::Utc;
use rusqlite::Connection;
use uuid::Uuid;

use wastewatch_types::models::TransactionKind;

use super::{OptionalExt, notifications::notify};
use crate::Database;
use crate::StoreError;
use crate::models::{LeaderboardRow, RewardAccountRow, RewardOfferRow, TransactionRow};

/// Synthetic catalog entry representing the user's own spendable balance.
pub const OWN_POINTS_OFFER_ID: &str = "00000000-0000-0000-0000-000000000000";

impl Database {
    /// Derived point balance: fold of the user's entire transaction history,
    /// clamped at zero. The ledger is ground truth; the cached account
    /// counter is never read here.
    pub fn balance(&self, user_id: &str) -> Result<i64, StoreError> {
        self.with_conn(|conn| query_balance(conn, user_id))
    }

    pub fn list_transactions(
        &self,
        user_id: &str,
        limit: u32,
    ) -> Result<Vec<TransactionRow>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, kind, amount, description, created_at
                 FROM transactions
                 WHERE user_id = ?1
                 ORDER BY created_at DESC, id DESC
                 LIMIT ?2",
            )?;

            let rows = stmt
                .query_map(rusqlite::params![user_id, limit], |row| {
                    Ok(TransactionRow {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        kind: row.get(2)?,
                        amount: row.get(3)?,
                        description: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    pub fn get_reward_account(
        &self,
        user_id: &str,
    ) -> Result<Option<RewardAccountRow>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, points, level, is_available, created_at, updated_at
                 FROM reward_accounts WHERE user_id = ?1",
            )?;

            let row = stmt
                .query_row([user_id], |row| {
                    Ok(RewardAccountRow {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        points: row.get(2)?,
                        level: row.get(3)?,
                        is_available: row.get(4)?,
                        created_at: row.get(5)?,
                        updated_at: row.get(6)?,
                    })
                })
                .optional()?;

            Ok(row)
        })
    }

    /// Catalog of redeemable offers, prefixed with a synthetic "use your
    /// points" entry whose cost is the caller's current balance.
    pub fn list_available_offers(
        &self,
        user_id: &str,
    ) -> Result<Vec<RewardOfferRow>, StoreError> {
        self.with_conn(|conn| {
            let balance = query_balance(conn, user_id)?;

            let mut offers = vec![RewardOfferRow {
                id: OWN_POINTS_OFFER_ID.to_string(),
                name: "Your points".to_string(),
                cost: balance,
                description: Some("Redeem the points you have earned".to_string()),
                collection_info: "Points redeemable at partner collection sites".to_string(),
                is_available: true,
            }];

            let mut stmt = conn.prepare(
                "SELECT id, name, cost, description, collection_info, is_available
                 FROM reward_offers
                 WHERE is_available = 1
                 ORDER BY cost ASC",
            )?;

            let catalog = stmt
                .query_map([], |row| {
                    Ok(RewardOfferRow {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        cost: row.get(2)?,
                        description: row.get(3)?,
                        collection_info: row.get(4)?,
                        is_available: row.get(5)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            offers.extend(catalog);
            Ok(offers)
        })
    }

    /// Redeem an offer, or the full balance when `offer_id` is `None`.
    /// Balance check, ledger append, counter update and notification all
    /// commit together or not at all. Returns (points spent, new balance).
    pub fn redeem(
        &self,
        user_id: &str,
        offer_id: Option<&str>,
    ) -> Result<(i64, i64), StoreError> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let now = Utc::now().to_rfc3339();

            let have = query_balance(&tx, user_id)?;
            let (amount, description) = match offer_id {
                None => (have, "Redeemed all points".to_string()),
                Some(OWN_POINTS_OFFER_ID) => (have, "Redeemed all points".to_string()),
                Some(oid) => {
                    let offer =
                        query_offer(&tx, oid)?.ok_or(StoreError::NotFound("reward offer"))?;
                    if !offer.is_available {
                        return Err(StoreError::Conflict("reward offer is not available"));
                    }
                    (offer.cost, format!("Redeemed: {}", offer.name))
                }
            };

            if amount <= 0 || amount > have {
                return Err(StoreError::InsufficientPoints {
                    have,
                    need: amount.max(1),
                });
            }

            apply_point_delta(&tx, user_id, -amount, &now)?;
            record_transaction(
                &tx,
                user_id,
                TransactionKind::Redeemed,
                amount,
                &description,
                &now,
            )?;
            notify(
                &tx,
                user_id,
                &format!("You redeemed {amount} points"),
                "reward_redeemed",
                &now,
            )?;

            tx.commit()?;
            Ok((amount, (have - amount).max(0)))
        })
    }

    /// Reward accounts joined with user names, highest points first.
    pub fn leaderboard(&self, limit: u32) -> Result<Vec<LeaderboardRow>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT a.user_id, u.name, a.points, a.level
                 FROM reward_accounts a
                 LEFT JOIN users u ON a.user_id = u.id
                 WHERE a.is_available = 1
                 ORDER BY a.points DESC
                 LIMIT ?1",
            )?;

            let rows = stmt
                .query_map([limit], |row| {
                    Ok(LeaderboardRow {
                        user_id: row.get(0)?,
                        user_name: row
                            .get::<_, Option<String>>(1)?
                            .unwrap_or_else(|| "unknown".to_string()),
                        points: row.get(2)?,
                        level: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }
}

pub(crate) fn query_balance(conn: &Connection, user_id: &str) -> Result<i64, StoreError> {
    let sum: i64 = conn.query_row(
        "SELECT COALESCE(SUM(CASE WHEN kind LIKE 'earned%' THEN amount ELSE -amount END), 0)
         FROM transactions WHERE user_id = ?1",
        [user_id],
        |row| row.get(0),
    )?;
    Ok(sum.max(0))
}

fn query_offer(conn: &Connection, id: &str) -> Result<Option<RewardOfferRow>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, name, cost, description, collection_info, is_available
         FROM reward_offers WHERE id = ?1",
    )?;

    let row = stmt
        .query_row([id], |row| {
            Ok(RewardOfferRow {
                id: row.get(0)?,
                name: row.get(1)?,
                cost: row.get(2)?,
                description: row.get(3)?,
                collection_info: row.get(4)?,
                is_available: row.get(5)?,
            })
        })
        .optional()?;

    Ok(row)
}

/// Create the user's reward account if it does not exist yet. Accounts are
/// lazy: the row appears with the first earning event.
pub(crate) fn ensure_account(
    conn: &Connection,
    user_id: &str,
    now: &str,
) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO reward_accounts (id, user_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?3)
         ON CONFLICT(user_id) DO NOTHING",
        rusqlite::params![Uuid::new_v4().to_string(), user_id, now],
    )?;
    Ok(())
}

/// Adjust the cached account counter. Must run in the same transaction as
/// the matching ledger append so counter and log cannot drift.
pub(crate) fn apply_point_delta(
    conn: &Connection,
    user_id: &str,
    delta: i64,
    now: &str,
) -> Result<(), StoreError> {
    let changed = conn.execute(
        "UPDATE reward_accounts
         SET points = MAX(0, points + ?1),
             level = MAX(0, points + ?1) / 100 + 1,
             updated_at = ?2
         WHERE user_id = ?3",
        rusqlite::params![delta, now, user_id],
    )?;

    if changed == 0 {
        return Err(StoreError::NotFound("reward account"));
    }
    Ok(())
}

/// Append an immutable ledger entry. Amounts are always positive; the kind
/// carries the credit/debit semantics.
pub(crate) fn record_transaction(
    conn: &Connection,
    user_id: &str,
    kind: TransactionKind,
    amount: i64,
    description: &str,
    now: &str,
) -> Result<String, StoreError> {
    if amount <= 0 {
        return Err(StoreError::InvalidAmount(amount));
    }

    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO transactions (id, user_id, kind, amount, description, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![id, user_id, kind.as_str(), amount, description, now],
    )?;
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    fn test_db_with_user(email: &str) -> (Database, String) {
        let db = Database::open_in_memory().unwrap();
        let id = Uuid::new_v4().to_string();
        db.create_user(&id, email, "Test User").unwrap();
        (db, id)
    }

    fn seed_transactions(db: &Database, user_id: &str, entries: &[(TransactionKind, i64)]) {
        db.with_conn_mut(|conn| {
            let now = Utc::now().to_rfc3339();
            ensure_account(conn, user_id, &now)?;
            for (kind, amount) in entries {
                let delta = if kind.is_credit() { *amount } else { -amount };
                apply_point_delta(conn, user_id, delta, &now)?;
                record_transaction(conn, user_id, *kind, *amount, "seed", &now)?;
            }
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn balance_folds_entire_history() {
        let (db, user) = test_db_with_user("fold@example.com");

        // 15 transactions: 10 credits of 5, then 5 debits of 3. A listing
        // page size must never truncate balance math.
        let mut entries = vec![(TransactionKind::EarnedReport, 5); 10];
        entries.extend(vec![(TransactionKind::Redeemed, 3); 5]);
        seed_transactions(&db, &user, &entries);

        assert_eq!(db.balance(&user).unwrap(), 35);
        assert_eq!(db.list_transactions(&user, 10).unwrap().len(), 10);
    }

    #[test]
    fn balance_clamps_at_zero() {
        let (db, user) = test_db_with_user("clamp@example.com");
        seed_transactions(
            &db,
            &user,
            &[
                (TransactionKind::EarnedReport, 5),
                (TransactionKind::Redeemed, 9),
            ],
        );

        assert_eq!(db.balance(&user).unwrap(), 0);
    }

    #[test]
    fn balance_is_zero_for_empty_history() {
        let (db, user) = test_db_with_user("empty@example.com");
        assert_eq!(db.balance(&user).unwrap(), 0);
    }

    #[test]
    fn record_transaction_rejects_non_positive_amounts() {
        let (db, user) = test_db_with_user("amounts@example.com");
        let err = db
            .with_conn_mut(|conn| {
                let now = Utc::now().to_rfc3339();
                record_transaction(
                    conn,
                    &user,
                    TransactionKind::EarnedReport,
                    0,
                    "bad",
                    &now,
                )?;
                Ok(())
            })
            .unwrap_err();

        assert!(matches!(err, StoreError::InvalidAmount(0)));
    }

    #[test]
    fn apply_delta_without_account_is_not_found() {
        let (db, user) = test_db_with_user("noaccount@example.com");
        let err = db
            .with_conn_mut(|conn| {
                apply_point_delta(conn, &user, 10, &Utc::now().to_rfc3339())
            })
            .unwrap_err();

        assert!(matches!(err, StoreError::NotFound("reward account")));
    }

    #[test]
    fn redeem_more_than_balance_fails_without_side_effects() {
        let (db, user) = test_db_with_user("poor@example.com");
        seed_transactions(&db, &user, &[(TransactionKind::EarnedReport, 10)]);

        // The seeded catalog's cheapest offer costs 50.
        let offers = db.list_available_offers(&user).unwrap();
        let offer = &offers[1];
        assert!(offer.cost > 10);

        let err = db.redeem(&user, Some(&offer.id)).unwrap_err();
        assert!(matches!(err, StoreError::InsufficientPoints { have: 10, .. }));

        // Nothing was written.
        assert_eq!(db.balance(&user).unwrap(), 10);
        assert_eq!(db.list_transactions(&user, 50).unwrap().len(), 1);
        assert!(db.unread_notifications(&user).unwrap().is_empty());
    }

    #[test]
    fn redeem_moves_counter_and_ledger_together() {
        let (db, user) = test_db_with_user("redeem@example.com");
        seed_transactions(&db, &user, &[(TransactionKind::EarnedReport, 60)]);

        let offers = db.list_available_offers(&user).unwrap();
        let offer = offers.iter().find(|o| o.cost == 50).expect("seeded offer");

        let (spent, balance) = db.redeem(&user, Some(&offer.id)).unwrap();
        assert_eq!(spent, 50);
        assert_eq!(balance, 10);

        // Derived balance and cached counter agree after the transaction.
        assert_eq!(db.balance(&user).unwrap(), 10);
        let account = db.get_reward_account(&user).unwrap().unwrap();
        assert_eq!(account.points, 10);

        let txns = db.list_transactions(&user, 10).unwrap();
        assert_eq!(txns.len(), 2);
        assert_eq!(txns[0].kind, "redeemed");
        assert_eq!(txns[0].amount, 50);
    }

    #[test]
    fn redeem_all_empties_the_balance() {
        let (db, user) = test_db_with_user("all@example.com");
        seed_transactions(&db, &user, &[(TransactionKind::EarnedCollect, 45)]);

        let (spent, balance) = db.redeem(&user, None).unwrap();
        assert_eq!(spent, 45);
        assert_eq!(balance, 0);
        assert_eq!(db.balance(&user).unwrap(), 0);
    }

    #[test]
    fn redeem_all_with_zero_balance_fails() {
        let (db, user) = test_db_with_user("zero@example.com");
        let err = db.redeem(&user, None).unwrap_err();
        assert!(matches!(err, StoreError::InsufficientPoints { have: 0, .. }));
    }

    #[test]
    fn offers_are_prefixed_with_own_points_entry() {
        let (db, user) = test_db_with_user("offers@example.com");
        seed_transactions(&db, &user, &[(TransactionKind::EarnedReport, 25)]);

        let offers = db.list_available_offers(&user).unwrap();
        assert!(offers.len() >= 3);
        assert_eq!(offers[0].id, OWN_POINTS_OFFER_ID);
        assert_eq!(offers[0].cost, 25);
    }

    #[test]
    fn leaderboard_orders_by_points() {
        let db = Database::open_in_memory().unwrap();
        let alice = Uuid::new_v4().to_string();
        let bob = Uuid::new_v4().to_string();
        db.create_user(&alice, "alice@example.com", "Alice").unwrap();
        db.create_user(&bob, "bob@example.com", "Bob").unwrap();

        seed_transactions(&db, &alice, &[(TransactionKind::EarnedReport, 30)]);
        seed_transactions(&db, &bob, &[(TransactionKind::EarnedCollect, 120)]);

        let board = db.leaderboard(10).unwrap();
        assert_eq!(board.len(), 2);
        assert_eq!(board[0].user_name, "Bob");
        assert_eq!(board[0].points, 120);
        assert_eq!(board[0].level, 2);
        assert_eq!(board[1].user_name, "Alice");
        assert_eq!(board[1].level, 1);
    }
}
