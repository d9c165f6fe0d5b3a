use std::collections::BTreeMap;

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;

use super::{LeadRecord, MonthKey};
use crate::log_warn;

const ENABLE_LOGS: bool = true;

/// Every stored lead, bucketed by month. Buckets keep insertion order; months
/// iterate chronologically.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Document {
    months: BTreeMap<MonthKey, Vec<LeadRecord>>,
}

/// What a lenient load had to work around.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    /// Records that could not be read and were left out.
    pub skipped: usize,
    /// Records stored under a month other than their date's.
    pub rebucketed: usize,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Strict about the outer shape only: the text must be a JSON object.
    /// Unreadable records are skipped and every record lands in the bucket
    /// of its own date.
    pub fn from_json(raw: &str) -> Result<Self> {
        Self::load_json(raw).map(|(document, _)| document)
    }

    pub fn load_json(raw: &str) -> Result<(Self, LoadSummary)> {
        let value: Value = serde_json::from_str(raw).context("failed to parse lead document")?;
        let Value::Object(buckets) = value else {
            return Err(anyhow!("lead document is not a JSON object"));
        };

        let mut document = Self::new();
        let mut summary = LoadSummary::default();
        for (key, bucket) in buckets {
            let Value::Array(entries) = bucket else {
                log_warn!("Skipping month '{key}': not a list of leads");
                summary.skipped += 1;
                continue;
            };
            for entry in entries {
                let lead: LeadRecord = match serde_json::from_value(entry) {
                    Ok(lead) => lead,
                    Err(err) => {
                        log_warn!("Skipping unreadable lead in '{key}': {err}");
                        summary.skipped += 1;
                        continue;
                    }
                };
                let month = lead.month_key();
                if key.parse::<MonthKey>().ok() != Some(month) {
                    log_warn!("Lead dated {} was stored under '{key}', moving it to {month}", lead.date);
                    summary.rebucketed += 1;
                }
                document.bucket_mut(month).push(lead);
            }
        }
        Ok((document, summary))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).context("failed to serialize lead document")
    }

    pub fn month(&self, key: &MonthKey) -> &[LeadRecord] {
        self.months.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The month's bucket, created empty if it is not stored yet.
    pub fn bucket_mut(&mut self, key: MonthKey) -> &mut Vec<LeadRecord> {
        self.months.entry(key).or_default()
    }

    /// The month's bucket only if it is already stored.
    pub fn month_mut(&mut self, key: &MonthKey) -> Option<&mut Vec<LeadRecord>> {
        self.months.get_mut(key)
    }

    /// Drops the month's bucket when it holds no records.
    pub fn prune_month(&mut self, key: &MonthKey) {
        if self.months.get(key).is_some_and(Vec::is_empty) {
            self.months.remove(key);
        }
    }

    pub fn months(&self) -> impl Iterator<Item = &MonthKey> {
        self.months.keys()
    }

    /// All records, month by month, in store order.
    pub fn records(&self) -> impl Iterator<Item = &LeadRecord> {
        self.months.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.months.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains_identity(&self, date: NaiveDate, customer_name: &str, phone: &str) -> bool {
        self.month(&MonthKey::from_date(date))
            .iter()
            .any(|lead| lead.same_identity(date, customer_name, phone))
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.records().any(|lead| lead.id == id)
    }

    pub fn find(&self, id: &str) -> Option<&LeadRecord> {
        self.records().find(|lead| lead.id == id)
    }

    pub fn clear(&mut self) {
        self.months.clear();
    }
}
