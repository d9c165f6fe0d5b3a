//! Maps an on-screen row back to the stored record it edits.
//!
//! Rows carry the record id when the caller has one; otherwise identity falls
//! back to the day's records by displayed name and phone, then by position.
//! That fallback is best effort: if a row's name or phone is edited while the
//! day holds another record with the old values, the edit can land on the
//! wrong record.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{calendar::LeadRow, models::LeadRecord};

/// What the caller knows about a displayed row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowRef {
    pub date: NaiveDate,
    pub customer_name: String,
    pub phone: String,
    /// Zero-based position among the rows shown for `date`.
    pub position: usize,
    #[serde(default)]
    pub id: Option<String>,
}

impl RowRef {
    pub fn new(date: NaiveDate, customer_name: &str, phone: &str, position: usize) -> Self {
        Self {
            date,
            customer_name: customer_name.to_string(),
            phone: phone.to_string(),
            position,
            id: None,
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }
}

impl From<&LeadRow> for RowRef {
    fn from(row: &LeadRow) -> Self {
        RowRef::new(
            row.record.date,
            &row.record.customer_name,
            &row.record.phone,
            row.position,
        )
        .with_id(&row.record.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Resolution {
    /// The row's id matched a stored record.
    ById,
    /// Exactly one record on the day had the row's name and phone.
    ExactMatch,
    /// The record at the row's position among the day's records.
    Positional,
    /// The position was out of range; the day's first record.
    FirstOfDay,
    /// The day had no stored records; a new one was inserted.
    Created,
}

/// Returns the index in `bucket` of the record `row` refers to, inserting a
/// new record for the row's date when the day has none.
pub fn resolve_row(bucket: &mut Vec<LeadRecord>, row: &RowRef) -> (usize, Resolution) {
    if let Some(id) = row.id.as_deref() {
        if let Some(index) = bucket.iter().position(|lead| lead.id == id) {
            return (index, Resolution::ById);
        }
    }

    let day: Vec<usize> = bucket
        .iter()
        .enumerate()
        .filter(|(_, lead)| lead.date == row.date)
        .map(|(index, _)| index)
        .collect();

    let exact: Vec<usize> = day
        .iter()
        .copied()
        .filter(|&index| {
            bucket[index].customer_name == row.customer_name && bucket[index].phone == row.phone
        })
        .collect();
    if let [only] = exact.as_slice() {
        return (*only, Resolution::ExactMatch);
    }

    if let Some(&index) = day.get(row.position) {
        return (index, Resolution::Positional);
    }
    if let Some(&index) = day.first() {
        return (index, Resolution::FirstOfDay);
    }

    let mut created = LeadRecord::placeholder(row.date);
    if let Some(id) = row.id.as_deref() {
        created.id = id.to_string();
    }
    bucket.push(created);
    (bucket.len() - 1, Resolution::Created)
}

/// Index of the record a delete of `row` removes: the id match when the row
/// has one, else the first record with the same date, name and phone.
pub fn find_for_delete(bucket: &[LeadRecord], row: &RowRef) -> Option<usize> {
    match row.id.as_deref() {
        Some(id) => bucket.iter().position(|lead| lead.id == id),
        None => bucket
            .iter()
            .position(|lead| lead.same_identity(row.date, &row.customer_name, &row.phone)),
    }
}
