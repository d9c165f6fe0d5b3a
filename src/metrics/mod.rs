mod types;

pub use types::{one_decimal, MetricsDisplay, MetricsSnapshot};

use chrono::{DateTime, Duration, Utc};

use crate::{
    filters::is_stale,
    models::{ContactChannel, LeadRecord, LeadStatus},
};

/// Aggregates over the named leads in `records`. Unnamed rows are never
/// counted. Every average is 0 when there is nothing to divide by.
pub fn compute_metrics(
    records: &[LeadRecord],
    now: DateTime<Utc>,
    stale_after: Duration,
) -> MetricsSnapshot {
    let leads: Vec<&LeadRecord> = records.iter().filter(|lead| lead.is_named()).collect();
    let won: Vec<&LeadRecord> = leads
        .iter()
        .copied()
        .filter(|lead| lead.status == LeadStatus::ClosedWon)
        .collect();

    let total = leads.len();
    let closed_won = won.len();

    let sum_attempts = |set: &[&LeadRecord], channel: ContactChannel| -> u64 {
        set.iter().map(|lead| u64::from(lead.attempts(channel))).sum()
    };
    let per_close = |sum: f64| -> f64 {
        if closed_won == 0 {
            0.0
        } else {
            sum / closed_won as f64
        }
    };

    let lifecycle_total: f64 = won.iter().map(|lead| lead.lifecycle_days()).sum();

    MetricsSnapshot {
        total_leads: total,
        closed_won,
        closed_lost: leads
            .iter()
            .filter(|lead| lead.status == LeadStatus::ClosedLost)
            .count(),
        call_attempts: sum_attempts(&leads, ContactChannel::Call),
        text_attempts: sum_attempts(&leads, ContactChannel::Text),
        email_attempts: sum_attempts(&leads, ContactChannel::Email),
        avg_calls_to_close: per_close(sum_attempts(&won, ContactChannel::Call) as f64),
        avg_texts_to_close: per_close(sum_attempts(&won, ContactChannel::Text) as f64),
        avg_emails_to_close: per_close(sum_attempts(&won, ContactChannel::Email) as f64),
        avg_lifecycle_days: per_close(lifecycle_total),
        closing_pct: if total == 0 {
            0.0
        } else {
            closed_won as f64 / total as f64 * 100.0
        },
        hot_leads: leads.iter().filter(|lead| lead.hot).count(),
        stale_leads: leads
            .iter()
            .filter(|lead| is_stale(lead, now, stale_after))
            .count(),
    }
}
