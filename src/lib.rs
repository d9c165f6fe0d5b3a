//! Calendar-organized sales lead tracking.
//!
//! Leads are bucketed per month and shown one day-bucket per selling day.
//! Records are edited through [`store::LeadCommand`]s, which resolve the
//! on-screen row to a stored record, apply the change and persist the whole
//! document through a [`storage::BlobStore`]. [`tracker::LeadTracker`] runs all
//! of that on a single writer thread for callers that share it.

pub mod calendar;
pub mod filters;
pub mod metrics;
pub mod models;
pub mod settings;
pub mod storage;
pub mod store;
pub mod tabular;
pub mod tracker;
pub mod utils;
pub mod view;

pub use calendar::{days_in_month, month_grid, selling_days, DayRows, LeadRow};
pub use filters::{is_stale, lead_badge, ContactFilter, FilterState, FilterUpdate, LeadBadge};
pub use metrics::{compute_metrics, MetricsDisplay, MetricsSnapshot};
pub use models::{
    ContactChannel, Document, LeadRecord, LeadSource, LeadStatus, LoadSummary, MonthKey,
};
pub use settings::{SettingsStore, TrackerSettings};
pub use storage::{BlobStore, FileBlobStore, MemoryBlobStore, SqliteBlobStore};
pub use store::{
    ChangeNotice, ChangeReason, CommandOutcome, FieldUpdate, LeadCommand, LeadStore, Resolution,
    RowRef,
};
pub use tabular::{export_csv, import_csv, ImportReport, EXPORT_FILE_NAME};
pub use tracker::LeadTracker;
pub use utils::logging::init_logging;
pub use view::{build_month_view, DayView, MonthView, RowView};
