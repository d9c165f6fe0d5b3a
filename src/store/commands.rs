use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::resolver::{find_for_delete, resolve_row, Resolution, RowRef};
use crate::models::{ContactChannel, Document, LeadRecord, LeadSource, LeadStatus, MonthKey};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "field", content = "value")]
pub enum FieldUpdate {
    CustomerName(String),
    Phone(String),
    Source(Option<LeadSource>),
    Status(LeadStatus),
}

/// One user edit against the lead grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum LeadCommand {
    UpdateField { row: RowRef, update: FieldUpdate },
    IncrementAttempt { row: RowRef, channel: ContactChannel },
    ToggleContactMade { row: RowRef, channel: ContactChannel },
    ToggleHot { row: RowRef },
    SetStatus { row: RowRef, status: LeadStatus },
    AddRow { date: NaiveDate },
    DeleteRow { row: RowRef },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum ChangeReason {
    RecordUpdated,
    RowAdded,
    RowDeleted,
    Imported { added: usize },
    Cleared,
}

/// Emitted after every change to the document so views can redraw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeNotice {
    pub months: Vec<MonthKey>,
    pub reason: ChangeReason,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommandOutcome {
    /// The record as it stands after the command; the removed record for a
    /// delete; `None` when a delete matched nothing.
    pub record: Option<LeadRecord>,
    pub resolution: Option<Resolution>,
    pub notice: ChangeNotice,
}

/// Applies `command` to `document` in memory. Persisting is the caller's job.
pub fn apply_command(document: &mut Document, command: LeadCommand, now: DateTime<Utc>) -> CommandOutcome {
    match command {
        LeadCommand::AddRow { date } => {
            let lead = LeadRecord::placeholder(date);
            let month = lead.month_key();
            document.bucket_mut(month).push(lead.clone());
            CommandOutcome {
                record: Some(lead),
                resolution: None,
                notice: ChangeNotice {
                    months: vec![month],
                    reason: ChangeReason::RowAdded,
                },
            }
        }
        LeadCommand::DeleteRow { row } => {
            let month = MonthKey::from_date(row.date);
            let removed = document.month_mut(&month).and_then(|bucket| {
                find_for_delete(bucket, &row).map(|index| bucket.remove(index))
            });
            document.prune_month(&month);
            CommandOutcome {
                record: removed,
                resolution: None,
                notice: ChangeNotice {
                    months: vec![month],
                    reason: ChangeReason::RowDeleted,
                },
            }
        }
        LeadCommand::UpdateField { row, update } => edit(document, &row, |lead| match update {
            FieldUpdate::CustomerName(name) => lead.customer_name = name,
            FieldUpdate::Phone(phone) => lead.phone = phone,
            FieldUpdate::Source(source) => lead.source = source,
            FieldUpdate::Status(status) => lead.status = status,
        }),
        LeadCommand::IncrementAttempt { row, channel } => {
            edit(document, &row, |lead| lead.record_attempt(channel, now))
        }
        LeadCommand::ToggleContactMade { row, channel } => edit(document, &row, |lead| {
            lead.toggle_contact(channel, now);
        }),
        LeadCommand::ToggleHot { row } => edit(document, &row, |lead| {
            lead.toggle_hot();
        }),
        LeadCommand::SetStatus { row, status } => edit(document, &row, |lead| lead.status = status),
    }
}

// Never leaves an empty bucket behind: a month with no stored records always
// resolves to a newly created one.
fn edit<F>(document: &mut Document, row: &RowRef, change: F) -> CommandOutcome
where
    F: FnOnce(&mut LeadRecord),
{
    let month = MonthKey::from_date(row.date);
    let bucket = document.bucket_mut(month);
    let (index, resolution) = resolve_row(bucket, row);
    let lead = &mut bucket[index];
    change(lead);
    CommandOutcome {
        record: Some(lead.clone()),
        resolution: Some(resolution),
        notice: ChangeNotice {
            months: vec![month],
            reason: ChangeReason::RecordUpdated,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 15, 30, 0).unwrap()
    }

    fn march() -> MonthKey {
        MonthKey::new(2024, 3).unwrap()
    }

    #[test]
    fn editing_a_placeholder_stores_it() {
        let mut doc = Document::new();
        let outcome = apply_command(
            &mut doc,
            LeadCommand::UpdateField {
                row: RowRef::new(day(4), "", "", 1),
                update: FieldUpdate::CustomerName("Jane Doe".into()),
            },
            now(),
        );
        assert_eq!(outcome.resolution, Some(Resolution::Created));
        assert_eq!(outcome.notice.months, vec![march()]);
        assert_eq!(doc.month(&march()).len(), 1);
        assert_eq!(doc.month(&march())[0].customer_name, "Jane Doe");
    }

    #[test]
    fn increment_sets_last_attempt_every_time() {
        let mut doc = Document::new();
        let row = RowRef::new(day(4), "", "", 0);
        apply_command(
            &mut doc,
            LeadCommand::IncrementAttempt { row: row.clone(), channel: ContactChannel::Text },
            now(),
        );
        let later = now() + Duration::minutes(10);
        let outcome = apply_command(
            &mut doc,
            LeadCommand::IncrementAttempt { row, channel: ContactChannel::Text },
            later,
        );
        let lead = outcome.record.unwrap();
        assert_eq!(lead.text_attempts, 2);
        assert_eq!(lead.last_contact_attempt, Some(later));
        assert_eq!(doc.len(), 1);
    }

    #[test]
    fn status_and_hot_leave_timestamps_alone() {
        let mut doc = Document::new();
        let row = RowRef::new(day(4), "", "", 0);
        apply_command(&mut doc, LeadCommand::ToggleHot { row: row.clone() }, now());
        let outcome = apply_command(
            &mut doc,
            LeadCommand::SetStatus { row, status: LeadStatus::ClosedLost },
            now(),
        );
        let lead = outcome.record.unwrap();
        assert!(lead.hot);
        assert_eq!(lead.status, LeadStatus::ClosedLost);
        assert_eq!(lead.last_contact_attempt, None);
        assert_eq!(lead.contact_made_on, None);
        assert_eq!(lead.call_attempts, 0);
    }

    #[test]
    fn add_row_appends_to_the_month() {
        let mut doc = Document::new();
        apply_command(&mut doc, LeadCommand::AddRow { date: day(4) }, now());
        let outcome = apply_command(&mut doc, LeadCommand::AddRow { date: day(4) }, now());
        assert_eq!(outcome.notice.reason, ChangeReason::RowAdded);
        let bucket = doc.month(&march());
        assert_eq!(bucket.len(), 2);
        assert_ne!(bucket[0].id, bucket[1].id);
        assert_eq!(bucket[1].status, LeadStatus::Open);
    }

    #[test]
    fn delete_removes_only_the_first_exact_match() {
        let mut doc = Document::new();
        for _ in 0..2 {
            apply_command(&mut doc, LeadCommand::AddRow { date: day(4) }, now());
        }
        let second_id = doc.month(&march())[1].id.clone();

        let outcome = apply_command(
            &mut doc,
            LeadCommand::DeleteRow { row: RowRef::new(day(4), "", "", 1) },
            now(),
        );
        assert!(outcome.record.is_some());
        assert_eq!(doc.month(&march()).len(), 1);
        assert_eq!(doc.month(&march())[0].id, second_id);

        let missing = apply_command(
            &mut doc,
            LeadCommand::DeleteRow { row: RowRef::new(day(4), "Nobody", "", 0) },
            now(),
        );
        assert_eq!(missing.record, None);
        assert_eq!(doc.month(&march()).len(), 1);
    }

    #[test]
    fn delete_in_an_unstored_month_adds_no_bucket() {
        let mut doc = Document::new();
        let outcome = apply_command(
            &mut doc,
            LeadCommand::DeleteRow { row: RowRef::new(day(4), "Ann", "", 0) },
            now(),
        );
        assert_eq!(outcome.record, None);
        assert_eq!(doc.months().count(), 0);
        assert_eq!(doc.to_json().unwrap(), "{}");
    }

    #[test]
    fn deleting_the_last_record_drops_the_month() {
        let mut doc = Document::new();
        apply_command(&mut doc, LeadCommand::AddRow { date: day(4) }, now());
        apply_command(
            &mut doc,
            LeadCommand::DeleteRow { row: RowRef::new(day(4), "", "", 0) },
            now(),
        );
        assert!(doc.is_empty());
        assert_eq!(doc.months().count(), 0);
    }

    #[test]
    fn edits_always_fill_the_bucket_they_create() {
        let mut doc = Document::new();
        let april = MonthKey::new(2024, 4).unwrap();
        apply_command(
            &mut doc,
            LeadCommand::ToggleHot {
                row: RowRef::new(NaiveDate::from_ymd_opt(2024, 4, 2).unwrap(), "", "", 2),
            },
            now(),
        );
        assert_eq!(doc.months().copied().collect::<Vec<_>>(), vec![april]);
        assert_eq!(doc.month(&april).len(), 1);
    }

    #[test]
    fn command_wire_format() {
        let command = LeadCommand::SetStatus {
            row: RowRef::new(day(4), "Jane", "555", 0),
            status: LeadStatus::ClosedWon,
        };
        let value = serde_json::to_value(&command).unwrap();
        assert_eq!(value["type"], "setStatus");
        assert_eq!(value["status"], "Closed Won");
        assert_eq!(value["row"]["customerName"], "Jane");
        let parsed: LeadCommand = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, command);
    }
}
