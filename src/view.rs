use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::{
    calendar::{month_grid, LeadRow},
    filters::{lead_badge, FilterState, LeadBadge},
    metrics::{compute_metrics, MetricsDisplay, MetricsSnapshot},
    models::{LeadRecord, MonthKey},
    settings::TrackerSettings,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowView {
    #[serde(flatten)]
    pub row: LeadRow,
    /// Whether the active filters let this row through.
    pub visible: bool,
    pub badge: Option<LeadBadge>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayView {
    pub date: NaiveDate,
    pub rows: Vec<RowView>,
}

/// Everything a presentation layer needs to draw one month.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthView {
    pub month: MonthKey,
    pub days: Vec<DayView>,
    pub metrics: MetricsSnapshot,
    pub display: MetricsDisplay,
    pub filters: FilterState,
}

impl MonthView {
    pub fn day(&self, date: NaiveDate) -> Option<&DayView> {
        self.days.iter().find(|day| day.date == date)
    }

    pub fn visible_rows(&self) -> impl Iterator<Item = &RowView> {
        self.days.iter().flat_map(|day| day.rows.iter()).filter(|row| row.visible)
    }
}

pub fn build_month_view(
    records: &[LeadRecord],
    month: MonthKey,
    filters: &FilterState,
    settings: &TrackerSettings,
    now: DateTime<Utc>,
) -> MonthView {
    let stale_after = settings.stale_after();
    let days = month_grid(records, month, settings)
        .into_iter()
        .map(|day| DayView {
            date: day.date,
            rows: day
                .rows
                .into_iter()
                .map(|row| RowView {
                    visible: filters.matches(&row.record, now, stale_after),
                    badge: lead_badge(&row.record, now, stale_after),
                    row,
                })
                .collect(),
        })
        .collect();
    let metrics = compute_metrics(records, now, stale_after);

    MonthView {
        month,
        days,
        display: metrics.display(),
        metrics,
        filters: filters.clone(),
    }
}
