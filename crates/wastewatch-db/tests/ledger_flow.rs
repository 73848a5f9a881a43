use uuid::Uuid;

use wastewatch_db::Database;
use wastewatch_types::models::{
    COLLECT_REWARD_POINTS, REPORT_REWARD_POINTS, ReportStatus,
};

#[test]
fn report_collect_redeem_flow() {
    let db = Database::open_in_memory().expect("open db");

    // Two wallet logins land as two user rows.
    let reporter = Uuid::new_v4().to_string();
    let collector = Uuid::new_v4().to_string();
    db.create_user(&reporter, "reporter@flow.test", "Reporter")
        .expect("create reporter");
    db.create_user(&collector, "collector@flow.test", "Collector")
        .expect("create collector");

    // Reporter submits a sighting with an attached classification.
    let report = db
        .submit_report(
            &reporter,
            "Harbor front, pier 3",
            "plastic",
            "2 kg",
            Some("https://img.flow.test/pier3.jpg"),
            Some(r#"{"wasteType":"plastic","quantity":"2 kg","confidence":0.91}"#),
        )
        .expect("submit report");
    assert_eq!(report.status, "pending");
    assert_eq!(db.balance(&reporter).expect("balance"), REPORT_REWARD_POINTS);
    assert_eq!(db.unread_notifications(&reporter).expect("notes").len(), 1);

    // Collector walks the task through its lifecycle.
    for status in [
        ReportStatus::InProgress,
        ReportStatus::Completed,
        ReportStatus::Verified,
    ] {
        db.update_task_status(&report.id, &collector, status)
            .expect("status transition");
    }

    let finished = db.get_report(&report.id).expect("get").expect("exists");
    assert_eq!(finished.status, "verified");
    assert_eq!(finished.collector_id.as_deref(), Some(collector.as_str()));
    assert_eq!(
        db.balance(&collector).expect("balance"),
        COLLECT_REWARD_POINTS
    );
    assert_eq!(db.count_collected(&report.id).expect("collected"), 1);

    // Collector spends everything; ledger, counter and alert move together.
    let (spent, remaining) = db.redeem(&collector, None).expect("redeem");
    assert_eq!(spent, COLLECT_REWARD_POINTS);
    assert_eq!(remaining, 0);
    assert_eq!(db.balance(&collector).expect("balance"), 0);

    let account = db
        .get_reward_account(&collector)
        .expect("account")
        .expect("exists");
    assert_eq!(account.points, 0);

    let txns = db.list_transactions(&collector, 10).expect("txns");
    assert_eq!(txns.len(), 2);
    assert_eq!(txns[0].kind, "redeemed");

    // Collector saw both the earn and the redeem alert.
    let notes = db.unread_notifications(&collector).expect("notes");
    assert_eq!(notes.len(), 2);
    for note in notes {
        db.mark_notification_read(&note.id).expect("mark read");
    }
    assert!(db.unread_notifications(&collector).expect("notes").is_empty());
}
