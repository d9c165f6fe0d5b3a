//! Flat CSV export and deduplicating import of the whole lead document.

use std::collections::HashMap;

use anyhow::{Context, Result};
use csv::QuoteStyle;
use serde::{Deserialize, Serialize};

use crate::{
    log_info, log_warn,
    models::{new_lead_id, parse_lead_date, parse_timestamp, Document, LeadRecord, MonthKey},
};

const ENABLE_LOGS: bool = true;

pub const EXPORT_FILE_NAME: &str = "lead_tracker_export.csv";

/// Export column order. Every record has every column.
pub const LEAD_COLUMNS: [&str; 15] = [
    "id",
    "date",
    "customerName",
    "phone",
    "source",
    "callAttempts",
    "textAttempts",
    "emailAttempts",
    "contactMadeCall",
    "contactMadeText",
    "contactMadeEmail",
    "hot",
    "status",
    "lastContactAttempt",
    "contactMadeOn",
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub added: usize,
    /// Rows whose (date, name, phone) was already stored.
    pub duplicates: usize,
    /// Rows without a usable date.
    pub skipped: usize,
    /// Months that received at least one record.
    pub months: Vec<MonthKey>,
}

fn column_value(lead: &LeadRecord, column: &str) -> String {
    match column {
        "id" => lead.id.clone(),
        "date" => lead.date.format("%Y-%m-%d").to_string(),
        "customerName" => lead.customer_name.clone(),
        "phone" => lead.phone.clone(),
        "source" => lead.source.map(|s| s.as_str().to_string()).unwrap_or_default(),
        "callAttempts" => lead.call_attempts.to_string(),
        "textAttempts" => lead.text_attempts.to_string(),
        "emailAttempts" => lead.email_attempts.to_string(),
        "contactMadeCall" => lead.contact_made_call.to_string(),
        "contactMadeText" => lead.contact_made_text.to_string(),
        "contactMadeEmail" => lead.contact_made_email.to_string(),
        "hot" => lead.hot.to_string(),
        "status" => lead.status.as_str().to_string(),
        "lastContactAttempt" => lead
            .last_contact_attempt
            .map(|dt| dt.to_rfc3339())
            .unwrap_or_default(),
        "contactMadeOn" => lead
            .contact_made_on
            .map(|dt| dt.to_rfc3339())
            .unwrap_or_default(),
        _ => String::new(),
    }
}

/// All months' records as CSV: a bare header line, then one fully quoted
/// line per record. An empty document exports as an empty string.
pub fn export_csv(document: &Document) -> Result<String> {
    if document.is_empty() {
        return Ok(String::new());
    }

    let mut out = Vec::new();
    {
        let mut header = csv::Writer::from_writer(&mut out);
        header
            .write_record(LEAD_COLUMNS)
            .context("failed to write CSV header")?;
        header.flush().context("failed to write CSV header")?;
    }
    let mut rows = csv::WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .from_writer(&mut out);
    for lead in document.records() {
        rows.write_record(LEAD_COLUMNS.iter().map(|column| column_value(lead, column)))
            .with_context(|| format!("failed to write lead {}", lead.id))?;
    }
    rows.flush().context("failed to write CSV rows")?;
    drop(rows);

    String::from_utf8(out).context("CSV export is not UTF-8")
}

pub type CsvRow = HashMap<String, String>;

/// Header-keyed rows. Quoted fields may hold commas, doubled quotes and line
/// breaks. Header names are trimmed; a row shorter than the header lacks the
/// trailing columns. Records the reader cannot decode come back as errors.
pub fn parse_rows(text: &str) -> Vec<Result<CsvRow, csv::Error>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());
    let header: Vec<String> = match reader.headers() {
        Ok(names) => names.iter().map(|name| name.trim().to_string()).collect(),
        Err(err) => return vec![Err(err)],
    };
    reader
        .records()
        .map(|record| {
            record.map(|values| {
                header
                    .iter()
                    .cloned()
                    .zip(values.iter().map(str::to_string))
                    .collect()
            })
        })
        .collect()
}

fn parse_flag(value: Option<&String>) -> bool {
    value.is_some_and(|v| {
        let v = v.trim();
        v.eq_ignore_ascii_case("true") || v == "1"
    })
}

fn parse_count(value: Option<&String>) -> u32 {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(0)
}

/// Builds a record from an imported row. `None` when the date is missing or
/// unparseable; every other column falls back to its default.
pub fn record_from_row(row: &CsvRow) -> Option<LeadRecord> {
    let date = parse_lead_date(row.get("date")?)?;
    let text = |column: &str| row.get(column).cloned().unwrap_or_default();

    let mut lead = LeadRecord::placeholder(date);
    if let Some(id) = row.get("id").map(|id| id.trim()).filter(|id| !id.is_empty()) {
        lead.id = id.to_string();
    }
    lead.customer_name = text("customerName");
    lead.phone = text("phone");
    lead.source = row.get("source").and_then(|v| v.trim().parse().ok());
    lead.call_attempts = parse_count(row.get("callAttempts"));
    lead.text_attempts = parse_count(row.get("textAttempts"));
    lead.email_attempts = parse_count(row.get("emailAttempts"));
    lead.contact_made_call = parse_flag(row.get("contactMadeCall"));
    lead.contact_made_text = parse_flag(row.get("contactMadeText"));
    lead.contact_made_email = parse_flag(row.get("contactMadeEmail"));
    lead.hot = parse_flag(row.get("hot"));
    lead.status = row
        .get("status")
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or_default();
    lead.last_contact_attempt = row.get("lastContactAttempt").and_then(|v| parse_timestamp(v));
    lead.contact_made_on = row.get("contactMadeOn").and_then(|v| parse_timestamp(v));
    Some(lead)
}

/// Appends every imported record whose (date, name, phone) is not already in
/// its month. Nothing stored is overwritten or merged. The document is only
/// touched after the whole text has been parsed.
pub fn import_csv(document: &mut Document, text: &str) -> ImportReport {
    let mut report = ImportReport::default();
    let mut parsed = Vec::new();
    for row in parse_rows(text) {
        match row {
            Ok(row) => match record_from_row(&row) {
                Some(lead) => parsed.push(lead),
                None => report.skipped += 1,
            },
            Err(err) => {
                log_warn!("Skipping unreadable CSV row: {err}");
                report.skipped += 1;
            }
        }
    }

    for mut lead in parsed {
        if document.contains_identity(lead.date, &lead.customer_name, &lead.phone) {
            report.duplicates += 1;
            continue;
        }
        if document.contains_id(&lead.id) {
            lead.id = new_lead_id();
        }
        let month = lead.month_key();
        document.bucket_mut(month).push(lead);
        report.added += 1;
        if !report.months.contains(&month) {
            report.months.push(month);
        }
    }

    log_info!(
        "Imported {} leads ({} duplicates, {} skipped)",
        report.added,
        report.duplicates,
        report.skipped
    );
    report
}
