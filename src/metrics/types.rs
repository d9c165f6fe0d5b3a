use serde::{Deserialize, Serialize};

/// Month performance figures at full precision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub total_leads: usize,
    pub closed_won: usize,
    pub closed_lost: usize,
    pub call_attempts: u64,
    pub text_attempts: u64,
    pub email_attempts: u64,
    pub avg_calls_to_close: f64,
    pub avg_texts_to_close: f64,
    pub avg_emails_to_close: f64,
    pub avg_lifecycle_days: f64,
    pub closing_pct: f64,
    pub hot_leads: usize,
    pub stale_leads: usize,
}

/// The same figures formatted for display: ratios to one decimal place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsDisplay {
    pub total_leads: String,
    pub closed_won: String,
    pub closed_lost: String,
    pub avg_calls_to_close: String,
    pub avg_texts_to_close: String,
    pub avg_emails_to_close: String,
    pub avg_lifecycle_days: String,
    pub closing_pct: String,
    pub hot_leads: String,
    pub stale_leads: String,
}

pub fn one_decimal(value: f64) -> String {
    format!("{value:.1}")
}

impl MetricsSnapshot {
    pub fn display(&self) -> MetricsDisplay {
        MetricsDisplay {
            total_leads: self.total_leads.to_string(),
            closed_won: self.closed_won.to_string(),
            closed_lost: self.closed_lost.to_string(),
            avg_calls_to_close: one_decimal(self.avg_calls_to_close),
            avg_texts_to_close: one_decimal(self.avg_texts_to_close),
            avg_emails_to_close: one_decimal(self.avg_emails_to_close),
            avg_lifecycle_days: one_decimal(self.avg_lifecycle_days),
            closing_pct: one_decimal(self.closing_pct),
            hot_leads: self.hot_leads.to_string(),
            stale_leads: self.stale_leads.to_string(),
        }
    }
}
