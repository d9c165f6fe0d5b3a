use chrono::{NaiveDate, TimeZone, Utc};
use lead_tracker::{
    init_logging, ContactChannel, Document, FieldUpdate, FileBlobStore, LeadCommand,
    LeadRecord, LeadStatus, LeadTracker, MemoryBlobStore, MonthKey, Resolution, RowRef,
    SqliteBlobStore, TrackerSettings,
};

fn march() -> MonthKey {
    MonthKey::new(2024, 3).unwrap()
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
}

fn jane() -> LeadRecord {
    let mut lead = LeadRecord::placeholder(day(1));
    lead.customer_name = "Jane Doe".into();
    lead.phone = "555-1111".into();
    lead.call_attempts = 2;
    lead.status = LeadStatus::ClosedWon;
    lead.contact_made_on = Some(Utc.with_ymd_and_hms(2024, 3, 3, 0, 0, 0).unwrap());
    lead
}

#[tokio::test]
async fn single_closed_lead_month() {
    init_logging();
    let settings = TrackerSettings::default();
    let mut document = Document::new();
    document.bucket_mut(march()).push(jane());
    let blobs = MemoryBlobStore::with_blob(&settings.storage_key, &document.to_json().unwrap());

    let tracker = LeadTracker::spawn(blobs, settings).unwrap();
    let now = Utc.with_ymd_and_hms(2024, 3, 20, 9, 0, 0).unwrap();
    let view = tracker.month_view_at(march(), now).await.unwrap();

    let lead_day = view.day(day(1)).unwrap();
    assert_eq!(lead_day.rows.len(), 1);
    assert!(!lead_day.rows[0].row.placeholder);
    assert_eq!(view.day(day(4)).unwrap().rows.len(), 3);

    assert_eq!(view.display.avg_calls_to_close, "2.0");
    assert_eq!(view.display.closing_pct, "100.0");
    assert_eq!(view.display.avg_lifecycle_days, "2.0");
    assert_eq!(view.metrics.stale_leads, 1);
}

#[tokio::test]
async fn editing_a_placeholder_row_then_reloading() {
    let dir = tempfile::tempdir().unwrap();
    let settings = TrackerSettings::default();
    let now = Utc.with_ymd_and_hms(2024, 3, 4, 10, 0, 0).unwrap();

    {
        let tracker =
            LeadTracker::spawn(FileBlobStore::new(dir.path().to_path_buf()).unwrap(), settings.clone())
                .unwrap();
        let view = tracker.month_view_at(march(), now).await.unwrap();
        let placeholder = &view.day(day(4)).unwrap().rows[1];
        let row = RowRef::from(&placeholder.row);

        let outcome = tracker
            .apply_at(
                LeadCommand::UpdateField {
                    row: row.clone(),
                    update: FieldUpdate::CustomerName("Sam".into()),
                },
                now,
            )
            .await
            .unwrap();
        assert_eq!(outcome.resolution, Some(Resolution::Created));

        // The row now shows the new name; its id keeps pointing at the record.
        let row = RowRef {
            customer_name: "Sam".into(),
            ..row
        };
        let outcome = tracker
            .apply_at(
                LeadCommand::ToggleContactMade { row: row.clone(), channel: ContactChannel::Call },
                now,
            )
            .await
            .unwrap();
        assert_eq!(outcome.resolution, Some(Resolution::ById));
        tracker
            .apply_at(LeadCommand::IncrementAttempt { row, channel: ContactChannel::Call }, now)
            .await
            .unwrap();
    }

    let tracker =
        LeadTracker::spawn(FileBlobStore::new(dir.path().to_path_buf()).unwrap(), settings).unwrap();
    let view = tracker.month_view_at(march(), now).await.unwrap();
    let rows = &view.day(day(4)).unwrap().rows;
    assert_eq!(rows.len(), 1);
    let lead = &rows[0].row.record;
    assert_eq!(lead.customer_name, "Sam");
    assert!(lead.contact_made_call);
    assert_eq!(lead.call_attempts, 1);
    assert_eq!(lead.contact_made_on, Some(now));
    assert_eq!(lead.last_contact_attempt, Some(now));
}

#[tokio::test]
async fn export_import_round_trip_through_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("leads.sqlite3");
    let now = Utc.with_ymd_and_hms(2024, 3, 4, 10, 0, 0).unwrap();

    let source = LeadTracker::spawn(MemoryBlobStore::new(), TrackerSettings::default()).unwrap();
    for (d, name) in [(4, "Ann"), (5, "Bob"), (5, "Cy")] {
        source
            .apply_at(
                LeadCommand::UpdateField {
                    row: RowRef::new(day(d), "", "", 0),
                    update: FieldUpdate::CustomerName(name.into()),
                },
                now,
            )
            .await
            .unwrap();
        if name == "Bob" {
            source
                .apply_at(LeadCommand::AddRow { date: day(5) }, now)
                .await
                .unwrap();
        }
    }
    let csv = source.export_csv().await.unwrap();

    let target =
        LeadTracker::spawn(SqliteBlobStore::open(db_path.clone()).unwrap(), TrackerSettings::default())
            .unwrap();
    let first = target.import_csv(csv.clone()).await.unwrap();
    assert_eq!(first.added, 3);
    let second = target.import_csv(csv).await.unwrap();
    assert_eq!(second.added, 0);
    assert_eq!(second.duplicates, 3);

    assert_eq!(target.document().await.unwrap(), source.document().await.unwrap());
    drop(target);

    let reopened =
        LeadTracker::spawn(SqliteBlobStore::open(db_path).unwrap(), TrackerSettings::default()).unwrap();
    assert_eq!(reopened.document().await.unwrap(), source.document().await.unwrap());
}

#[tokio::test]
async fn browser_saved_document_loads_into_the_grid() {
    let settings = TrackerSettings::default();
    // Text-valued counters and flags, blank timestamps, and a lead filed
    // under the wrong month.
    let legacy = r#"{
        "2024-03": [
            {"date":"2024-03-04","customerName":"Jane","phone":"555-1111","source":"AS Call",
             "callAttempts":"2","textAttempts":"0","emailAttempts":"0","contactMadeCall":"true",
             "contactMadeText":"false","contactMadeEmail":"false","hot":"false",
             "status":"Closed Won","lastContactAttempt":"","contactMadeOn":""}
        ],
        "2024-02": [
            {"date":"2024-03-05","customerName":"Ann","phone":"","source":"","callAttempts":0,
             "textAttempts":0,"emailAttempts":0,"contactMadeCall":false,"contactMadeText":false,
             "contactMadeEmail":false,"hot":true,"status":"Open","lastContactAttempt":"",
             "contactMadeOn":""}
        ]
    }"#;
    let blobs = MemoryBlobStore::with_blob(&settings.storage_key, legacy);
    let tracker = LeadTracker::spawn(blobs, settings).unwrap();

    let now = Utc.with_ymd_and_hms(2024, 3, 20, 9, 0, 0).unwrap();
    let view = tracker.month_view_at(march(), now).await.unwrap();
    let jane = &view.day(day(4)).unwrap().rows[0].row;
    assert!(!jane.placeholder);
    assert_eq!(jane.record.call_attempts, 2);
    assert!(jane.record.contact_made_call);
    let ann = &view.day(day(5)).unwrap().rows[0].row;
    assert_eq!(ann.record.customer_name, "Ann");
    assert_eq!(view.metrics.total_leads, 2);

    let document = tracker.document().await.unwrap();
    assert_eq!(document.months().copied().collect::<Vec<_>>(), vec![march()]);
}
