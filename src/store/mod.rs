pub mod commands;
pub mod resolver;

pub use commands::{
    apply_command, ChangeNotice, ChangeReason, CommandOutcome, FieldUpdate, LeadCommand,
};
pub use resolver::{Resolution, RowRef};

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::{
    log_debug, log_error, log_info, log_warn,
    models::{Document, LeadRecord, MonthKey},
    storage::BlobStore,
    tabular::{self, ImportReport},
};

const ENABLE_LOGS: bool = true;

/// Sole owner of the lead document. Every change runs resolve, mutate and
/// persist in one call and reports what changed.
pub struct LeadStore {
    document: Document,
    blobs: Box<dyn BlobStore>,
    key: String,
}

impl LeadStore {
    /// Loads the document stored under `key`. A missing or unreadable blob
    /// starts an empty document. When any part of the stored text could not be
    /// read, the text is copied to `<key>-unreadable` first so later saves do
    /// not destroy it.
    pub fn open<B>(blobs: B, key: &str) -> Self
    where
        B: BlobStore + 'static,
    {
        let mut blobs = blobs;
        let document = match blobs.load(key) {
            Ok(Some(raw)) => match Document::load_json(&raw) {
                Ok((document, summary)) => {
                    if summary.skipped > 0 {
                        log_warn!("Left out {} unreadable leads while loading", summary.skipped);
                        keep_unreadable(&mut blobs, key, &raw);
                    }
                    document
                }
                Err(err) => {
                    log_warn!("Stored lead document is malformed, starting empty: {err:#}");
                    keep_unreadable(&mut blobs, key, &raw);
                    Document::new()
                }
            },
            Ok(None) => Document::new(),
            Err(err) => {
                log_warn!("Failed to load lead document, starting empty: {err:#}");
                Document::new()
            }
        };

        log_info!("Lead store opened with {} records", document.len());

        Self {
            document,
            blobs: Box::new(blobs),
            key: key.to_string(),
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn month(&self, key: &MonthKey) -> &[LeadRecord] {
        self.document.month(key)
    }

    pub fn apply(&mut self, command: LeadCommand, now: DateTime<Utc>) -> CommandOutcome {
        let outcome = apply_command(&mut self.document, command, now);
        log_debug!(
            "{:?} in {:?} resolved by {:?}",
            outcome.notice.reason,
            outcome.notice.months,
            outcome.resolution
        );
        self.persist();
        outcome
    }

    /// Adds the non-duplicate rows of `text` as one batch, then persists once.
    pub fn import_csv(&mut self, text: &str) -> (ImportReport, ChangeNotice) {
        let report = tabular::import_csv(&mut self.document, text);
        self.persist();
        let notice = ChangeNotice {
            months: report.months.clone(),
            reason: ChangeReason::Imported {
                added: report.added,
            },
        };
        (report, notice)
    }

    pub fn export_csv(&self) -> Result<String> {
        tabular::export_csv(&self.document)
    }

    /// Drops every record and the stored blob.
    pub fn clear(&mut self) -> ChangeNotice {
        let months: Vec<MonthKey> = self.document.months().copied().collect();
        self.document.clear();
        if let Err(err) = self.blobs.remove(&self.key) {
            log_error!("Failed to remove stored lead document: {err:#}");
        }
        ChangeNotice {
            months,
            reason: ChangeReason::Cleared,
        }
    }

    /// Writes the document now, reporting failure to the caller.
    pub fn save(&mut self) -> Result<()> {
        let raw = self.document.to_json()?;
        self.blobs.save(&self.key, &raw)
    }

    // Saves after a change are fire-and-forget: a failure is logged and the
    // in-memory change stands.
    fn persist(&mut self) {
        if let Err(err) = self.save() {
            log_error!("Failed to persist lead document: {err:#}");
        }
    }
}

/// Key the raw text of a partly unreadable document is kept under.
pub fn unreadable_key(key: &str) -> String {
    format!("{key}-unreadable")
}

fn keep_unreadable(blobs: &mut dyn BlobStore, key: &str, raw: &str) {
    let backup = unreadable_key(key);
    match blobs.save(&backup, raw) {
        Ok(()) => log_warn!("Kept the original lead document under '{backup}'"),
        Err(err) => log_error!("Failed to keep the original lead document: {err:#}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::ContactChannel,
        storage::MemoryBlobStore,
    };
    use anyhow::anyhow;
    use chrono::{NaiveDate, TimeZone};

    const KEY: &str = "leadTrackerProData";

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 12, 0, 0).unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    /// Shares its blobs with the test so saves can be inspected.
    #[derive(Clone, Default)]
    struct SharedBlobs(std::sync::Arc<std::sync::Mutex<MemoryBlobStore>>);

    impl BlobStore for SharedBlobs {
        fn load(&self, key: &str) -> Result<Option<String>> {
            self.0.lock().unwrap().load(key)
        }
        fn save(&mut self, key: &str, value: &str) -> Result<()> {
            self.0.lock().unwrap().save(key, value)
        }
        fn remove(&mut self, key: &str) -> Result<()> {
            self.0.lock().unwrap().remove(key)
        }
    }

    struct FailingBlobs;

    impl BlobStore for FailingBlobs {
        fn load(&self, _key: &str) -> Result<Option<String>> {
            Err(anyhow!("disk on fire"))
        }
        fn save(&mut self, _key: &str, _value: &str) -> Result<()> {
            Err(anyhow!("disk on fire"))
        }
        fn remove(&mut self, _key: &str) -> Result<()> {
            Err(anyhow!("disk on fire"))
        }
    }

    #[test]
    fn malformed_blob_opens_empty_and_is_kept() {
        let blobs = SharedBlobs(std::sync::Arc::new(std::sync::Mutex::new(
            MemoryBlobStore::with_blob(KEY, "{broken"),
        )));
        let mut store = LeadStore::open(blobs.clone(), KEY);
        assert!(store.document().is_empty());

        store.apply(LeadCommand::AddRow { date: day(5) }, now());
        assert_eq!(
            blobs.load(&unreadable_key(KEY)).unwrap().as_deref(),
            Some("{broken")
        );
    }

    #[test]
    fn browser_written_document_survives_the_first_edit() {
        let legacy = r#"{"2024-03":[
            {"date":"2024-03-04","customerName":"","phone":"","source":"","callAttempts":0,
             "textAttempts":0,"emailAttempts":0,"contactMadeCall":false,"contactMadeText":false,
             "contactMadeEmail":false,"hot":false,"status":"Open","lastContactAttempt":"",
             "contactMadeOn":""},
            {"date":"2024-03-04","customerName":"Jane","phone":"555-1111","source":"AS Call",
             "callAttempts":"2","textAttempts":"0","emailAttempts":"0","contactMadeCall":"true",
             "contactMadeText":"false","contactMadeEmail":"false","hot":"false",
             "status":"Closed Won","lastContactAttempt":"","contactMadeOn":""}
        ]}"#;
        let blobs = SharedBlobs(std::sync::Arc::new(std::sync::Mutex::new(
            MemoryBlobStore::with_blob(KEY, legacy),
        )));
        let mut store = LeadStore::open(blobs.clone(), KEY);
        assert_eq!(store.document().len(), 2);

        store.apply(LeadCommand::AddRow { date: day(5) }, now());
        let reopened = LeadStore::open(blobs.clone(), KEY);
        assert_eq!(reopened.document().len(), 3);
        let jane = reopened
            .document()
            .records()
            .find(|lead| lead.customer_name == "Jane")
            .unwrap();
        assert_eq!(jane.call_attempts, 2);
        assert_eq!(blobs.load(&unreadable_key(KEY)).unwrap(), None);
    }

    #[test]
    fn partly_unreadable_document_keeps_its_original_text() {
        let raw = r#"{"2024-03":[{"date":"2024-03-04","customerName":"Ok"},{"customerName":"?"}]}"#;
        let blobs = SharedBlobs(std::sync::Arc::new(std::sync::Mutex::new(
            MemoryBlobStore::with_blob(KEY, raw),
        )));
        let store = LeadStore::open(blobs.clone(), KEY);
        assert_eq!(store.document().len(), 1);
        assert_eq!(blobs.load(&unreadable_key(KEY)).unwrap().as_deref(), Some(raw));
    }

    #[test]
    fn load_failure_opens_empty_and_mutations_still_apply() {
        let mut store = LeadStore::open(FailingBlobs, KEY);
        assert!(store.document().is_empty());
        store.apply(LeadCommand::AddRow { date: day(4) }, now());
        assert_eq!(store.document().len(), 1);
        assert!(store.save().is_err());
    }

    #[test]
    fn every_mutation_persists_the_whole_document() {
        let blobs = SharedBlobs::default();
        let mut store = LeadStore::open(blobs.clone(), KEY);
        store.apply(
            LeadCommand::IncrementAttempt {
                row: RowRef::new(day(4), "", "", 0),
                channel: ContactChannel::Call,
            },
            now(),
        );

        let saved = blobs.load(KEY).unwrap().unwrap();
        let reopened = LeadStore::open(blobs.clone(), KEY);
        assert_eq!(reopened.document(), store.document());
        assert!(saved.contains("\"callAttempts\":1"));
    }

    #[test]
    fn import_persists_once_and_reports_months() {
        let blobs = SharedBlobs::default();
        let mut store = LeadStore::open(blobs.clone(), KEY);
        let (report, notice) =
            store.import_csv("date,customerName\n2024-03-04,Ann\n2024-04-01,Bob\n2024-04-02,Cy");
        assert_eq!(report.added, 3);
        assert_eq!(
            notice.months,
            vec![MonthKey::new(2024, 3).unwrap(), MonthKey::new(2024, 4).unwrap()]
        );
        assert_eq!(notice.reason, ChangeReason::Imported { added: 3 });
        assert_eq!(LeadStore::open(blobs, KEY).document().len(), 3);
    }

    #[test]
    fn clear_removes_the_blob() {
        let blobs = SharedBlobs::default();
        let mut store = LeadStore::open(blobs.clone(), KEY);
        store.apply(LeadCommand::AddRow { date: day(4) }, now());
        let notice = store.clear();
        assert_eq!(notice.reason, ChangeReason::Cleared);
        assert_eq!(notice.months, vec![MonthKey::new(2024, 3).unwrap()]);
        assert!(store.document().is_empty());
        assert_eq!(blobs.load(KEY).unwrap(), None);
    }
}
