//! Single-writer front end for the lead store.
//!
//! The `LeadStore` lives on a dedicated thread and every read or write is a
//! task queued to it, so resolve-mutate-persist never interleaves with another
//! caller. Change notices go out on a broadcast channel from that same thread.

use std::{
    sync::{mpsc, Arc, Mutex},
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, oneshot};

use crate::{
    filters::{FilterState, FilterUpdate},
    log_error, log_info,
    metrics::{compute_metrics, MetricsSnapshot},
    models::{Document, MonthKey},
    settings::TrackerSettings,
    storage::BlobStore,
    store::{ChangeNotice, CommandOutcome, LeadCommand, LeadStore},
    tabular::ImportReport,
    view::{build_month_view, MonthView},
};

const ENABLE_LOGS: bool = true;
const NOTICE_CAPACITY: usize = 64;

/// State owned by the writer thread.
pub struct TrackerState {
    pub store: LeadStore,
    pub filters: FilterState,
    pub settings: TrackerSettings,
    events: broadcast::Sender<ChangeNotice>,
}

impl TrackerState {
    fn notify(&self, notice: ChangeNotice) {
        // No subscribers is fine.
        let _ = self.events.send(notice);
    }
}

type TrackerTask = Box<dyn FnOnce(&mut TrackerState) + Send + 'static>;

enum TrackerCommand {
    Execute(TrackerTask),
    Shutdown,
}

struct TrackerInner {
    sender: mpsc::Sender<TrackerCommand>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for TrackerInner {
    fn drop(&mut self) {
        let mut guard = match self.worker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(handle) = guard.take() {
            if let Err(err) = self.sender.send(TrackerCommand::Shutdown) {
                log_error!("Failed to send shutdown to tracker thread: {err}");
            }
            if let Err(join_err) = handle.join() {
                log_error!("Failed to join tracker thread: {join_err:?}");
            }
        }
    }
}

#[derive(Clone)]
pub struct LeadTracker {
    inner: Arc<TrackerInner>,
    events: broadcast::Sender<ChangeNotice>,
}

impl LeadTracker {
    /// Starts the writer thread and loads the document from `blobs` under the
    /// configured storage key before returning.
    pub fn spawn<B>(blobs: B, settings: TrackerSettings) -> Result<Self>
    where
        B: BlobStore + 'static,
    {
        let (command_tx, command_rx) = mpsc::channel::<TrackerCommand>();
        let (ready_tx, ready_rx) = mpsc::channel::<()>();
        let (events, _) = broadcast::channel(NOTICE_CAPACITY);
        let events_for_thread = events.clone();

        let worker = thread::Builder::new()
            .name("lead-tracker".into())
            .spawn(move || {
                let store = LeadStore::open(blobs, &settings.storage_key);
                let mut state = TrackerState {
                    store,
                    filters: FilterState::default(),
                    settings,
                    events: events_for_thread,
                };

                if ready_tx.send(()).is_err() {
                    log_error!("Tracker initialization receiver dropped before ready signal");
                    return;
                }

                while let Ok(command) = command_rx.recv() {
                    match command {
                        TrackerCommand::Execute(task) => task(&mut state),
                        TrackerCommand::Shutdown => break,
                    }
                }

                log_info!("Tracker thread shutting down");
            })
            .context("failed to spawn tracker worker thread")?;

        ready_rx
            .recv()
            .context("tracker worker exited before signaling readiness")?;

        Ok(Self {
            inner: Arc::new(TrackerInner {
                sender: command_tx,
                worker: Mutex::new(Some(worker)),
            }),
            events,
        })
    }

    /// Runs `task` on the writer thread and waits for its result.
    pub async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut TrackerState) -> T + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();

        let command = TrackerCommand::Execute(Box::new(move |state| {
            let result = task(state);
            if reply_tx.send(result).is_err() {
                log_error!("Tracker caller dropped before receiving result");
            }
        }));

        self.inner
            .sender
            .send(command)
            .map_err(|err| anyhow!("failed to send command to tracker thread: {err}"))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("tracker thread terminated unexpectedly"))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeNotice> {
        self.events.subscribe()
    }

    pub async fn apply(&self, command: LeadCommand) -> Result<CommandOutcome> {
        self.apply_at(command, Utc::now()).await
    }

    pub async fn apply_at(&self, command: LeadCommand, now: DateTime<Utc>) -> Result<CommandOutcome> {
        self.execute(move |state| {
            let outcome = state.store.apply(command, now);
            state.notify(outcome.notice.clone());
            outcome
        })
        .await
    }

    pub async fn import_csv(&self, text: String) -> Result<ImportReport> {
        self.execute(move |state| {
            let (report, notice) = state.store.import_csv(&text);
            state.notify(notice);
            report
        })
        .await
    }

    pub async fn export_csv(&self) -> Result<String> {
        self.execute(|state| state.store.export_csv()).await?
    }

    pub async fn save(&self) -> Result<()> {
        self.execute(|state| state.store.save()).await?
    }

    pub async fn clear(&self) -> Result<()> {
        self.execute(|state| {
            let notice = state.store.clear();
            state.notify(notice);
        })
        .await
    }

    pub async fn document(&self) -> Result<Document> {
        self.execute(|state| state.store.document().clone()).await
    }

    pub async fn filters(&self) -> Result<FilterState> {
        self.execute(|state| state.filters.clone()).await
    }

    pub async fn update_filters(&self, update: FilterUpdate) -> Result<FilterState> {
        self.execute(move |state| {
            state.filters.apply(update);
            state.filters.clone()
        })
        .await
    }

    pub async fn metrics(&self, month: MonthKey) -> Result<MetricsSnapshot> {
        self.execute(move |state| {
            compute_metrics(
                state.store.month(&month),
                Utc::now(),
                state.settings.stale_after(),
            )
        })
        .await
    }

    pub async fn month_view(&self, month: MonthKey) -> Result<MonthView> {
        self.month_view_at(month, Utc::now()).await
    }

    pub async fn month_view_at(&self, month: MonthKey, now: DateTime<Utc>) -> Result<MonthView> {
        self.execute(move |state| {
            build_month_view(
                state.store.month(&month),
                month,
                &state.filters,
                &state.settings,
                now,
            )
        })
        .await
    }
}
