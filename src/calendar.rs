//! Selling-day calendar and the per-day row grid shown for a month.

use std::collections::HashMap;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::{
    models::{LeadRecord, MonthKey},
    settings::TrackerSettings,
};

/// Monday through Saturday, as weekday numbers with 0 = Sunday.
pub const DEFAULT_SELLING_DAYS: [u32; 6] = [1, 2, 3, 4, 5, 6];

/// Number of days in the month, found as the first of the following month
/// minus one day. `month0` is zero-based; out-of-range months have no days.
pub fn days_in_month(year: i32, month0: u32) -> u32 {
    let next = match month0 {
        0..=10 => Some((year, month0 + 2)),
        11 => year.checked_add(1).map(|next_year| (next_year, 1)),
        _ => None,
    };
    next.and_then(|(next_year, next_month)| NaiveDate::from_ymd_opt(next_year, next_month, 1))
        .and_then(|first_of_next| first_of_next.pred_opt())
        .map(|last| last.day())
        .unwrap_or(0)
}

/// Lazy walk over the selling days of one month. Clone it to restart.
#[derive(Debug, Clone)]
pub struct SellingDays {
    year: i32,
    month: u32,
    next_day: u32,
    last_day: u32,
    weekdays: [bool; 7],
}

impl Iterator for SellingDays {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        while self.next_day <= self.last_day {
            let day = NaiveDate::from_ymd_opt(self.year, self.month, self.next_day)?;
            self.next_day += 1;
            if self.weekdays[day.weekday().num_days_from_sunday() as usize] {
                return Some(day);
            }
        }
        None
    }
}

pub fn selling_days(year: i32, month0: u32, selling: &[u32]) -> SellingDays {
    let mut weekdays = [false; 7];
    for &weekday in selling {
        if let Some(slot) = weekdays.get_mut(weekday as usize) {
            *slot = true;
        }
    }
    // An out-of-range month has no days, so the walk is empty.
    SellingDays {
        year,
        month: month0.saturating_add(1),
        next_day: 1,
        last_day: days_in_month(year, month0),
        weekdays,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadRow {
    /// Zero-based position among the rows for this day.
    pub position: usize,
    /// Synthesized for an empty day and not stored yet.
    pub placeholder: bool,
    pub record: LeadRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayRows {
    pub date: NaiveDate,
    pub rows: Vec<LeadRow>,
}

impl DayRows {
    pub fn placeholder_count(&self) -> usize {
        self.rows.iter().filter(|row| row.placeholder).count()
    }
}

/// One entry per selling day of `month`: the stored leads for that date in
/// store order, or `rows_per_day` placeholders when there are none.
pub fn month_grid(records: &[LeadRecord], month: MonthKey, settings: &TrackerSettings) -> Vec<DayRows> {
    let mut by_date: HashMap<NaiveDate, Vec<&LeadRecord>> = HashMap::new();
    for lead in records {
        by_date.entry(lead.date).or_default().push(lead);
    }

    selling_days(month.year(), month.month0(), &settings.selling_days)
        .map(|date| {
            let rows = match by_date.get(&date) {
                Some(stored) => stored
                    .iter()
                    .enumerate()
                    .map(|(position, lead)| LeadRow {
                        position,
                        placeholder: false,
                        record: (*lead).clone(),
                    })
                    .collect(),
                None => (0..settings.rows_per_day)
                    .map(|position| LeadRow {
                        position,
                        placeholder: true,
                        record: LeadRecord::placeholder(date),
                    })
                    .collect(),
            };
            DayRows { date, rows }
        })
        .collect()
}
