//! Lead record data models.
//!
//! A `LeadRecord` is one prospective sale, bucketed by its `date`. Name and phone
//! are free text and only used heuristically for identity; `id` is the durable key.

use std::str::FromStr;

use anyhow::{anyhow, Error};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use super::MonthKey;

pub fn new_lead_id() -> String {
    Uuid::new_v4().to_string()
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum LeadSource {
    #[serde(rename = "AS Call")]
    AsCall,
    #[serde(rename = "AS Internet")]
    AsInternet,
    #[serde(rename = "Internet")]
    Internet,
}

impl LeadSource {
    pub const ALL: [LeadSource; 3] = [LeadSource::AsCall, LeadSource::AsInternet, LeadSource::Internet];

    pub fn as_str(&self) -> &'static str {
        match self {
            LeadSource::AsCall => "AS Call",
            LeadSource::AsInternet => "AS Internet",
            LeadSource::Internet => "Internet",
        }
    }
}

impl FromStr for LeadSource {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "AS Call" => Ok(LeadSource::AsCall),
            "AS Internet" => Ok(LeadSource::AsInternet),
            "Internet" => Ok(LeadSource::Internet),
            other => Err(anyhow!("unknown lead source '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum LeadStatus {
    #[default]
    Open,
    #[serde(rename = "Closed Won")]
    ClosedWon,
    #[serde(rename = "Closed Lost")]
    ClosedLost,
}

impl LeadStatus {
    pub const ALL: [LeadStatus; 3] = [LeadStatus::Open, LeadStatus::ClosedWon, LeadStatus::ClosedLost];

    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::Open => "Open",
            LeadStatus::ClosedWon => "Closed Won",
            LeadStatus::ClosedLost => "Closed Lost",
        }
    }
}

impl FromStr for LeadStatus {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "Open" => Ok(LeadStatus::Open),
            "Closed Won" => Ok(LeadStatus::ClosedWon),
            "Closed Lost" => Ok(LeadStatus::ClosedLost),
            other => Err(anyhow!("unknown lead status '{other}'")),
        }
    }
}

/// The three ways a lead can be worked. Each has its own attempt counter and
/// contact-made flag.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum ContactChannel {
    Call,
    Text,
    Email,
}

impl ContactChannel {
    pub const ALL: [ContactChannel; 3] = [ContactChannel::Call, ContactChannel::Text, ContactChannel::Email];
}

/// One lead. Older documents stored numbers and flags as strings and blank
/// timestamps as `""`; all of those load.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LeadRecord {
    #[serde(default = "new_lead_id", deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(deserialize_with = "deserialize_lead_date")]
    pub date: NaiveDate,
    #[serde(default, deserialize_with = "deserialize_text")]
    pub customer_name: String,
    #[serde(default, deserialize_with = "deserialize_text")]
    pub phone: String,
    #[serde(default, deserialize_with = "deserialize_source")]
    pub source: Option<LeadSource>,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub call_attempts: u32,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub text_attempts: u32,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub email_attempts: u32,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub contact_made_call: bool,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub contact_made_text: bool,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub contact_made_email: bool,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub hot: bool,
    #[serde(default, deserialize_with = "deserialize_status")]
    pub status: LeadStatus,
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub last_contact_attempt: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub contact_made_on: Option<DateTime<Utc>>,
}

impl LeadRecord {
    /// Blank Open lead for `date` with a fresh id.
    pub fn placeholder(date: NaiveDate) -> Self {
        Self {
            id: new_lead_id(),
            date,
            customer_name: String::new(),
            phone: String::new(),
            source: None,
            call_attempts: 0,
            text_attempts: 0,
            email_attempts: 0,
            contact_made_call: false,
            contact_made_text: false,
            contact_made_email: false,
            hot: false,
            status: LeadStatus::Open,
            last_contact_attempt: None,
            contact_made_on: None,
        }
    }

    pub fn month_key(&self) -> MonthKey {
        MonthKey::from_date(self.date)
    }

    pub fn is_named(&self) -> bool {
        !self.customer_name.is_empty()
    }

    pub fn same_identity(&self, date: NaiveDate, customer_name: &str, phone: &str) -> bool {
        self.date == date && self.customer_name == customer_name && self.phone == phone
    }

    pub fn attempts(&self, channel: ContactChannel) -> u32 {
        match channel {
            ContactChannel::Call => self.call_attempts,
            ContactChannel::Text => self.text_attempts,
            ContactChannel::Email => self.email_attempts,
        }
    }

    fn attempts_mut(&mut self, channel: ContactChannel) -> &mut u32 {
        match channel {
            ContactChannel::Call => &mut self.call_attempts,
            ContactChannel::Text => &mut self.text_attempts,
            ContactChannel::Email => &mut self.email_attempts,
        }
    }

    pub fn contact_made(&self, channel: ContactChannel) -> bool {
        match channel {
            ContactChannel::Call => self.contact_made_call,
            ContactChannel::Text => self.contact_made_text,
            ContactChannel::Email => self.contact_made_email,
        }
    }

    fn contact_made_mut(&mut self, channel: ContactChannel) -> &mut bool {
        match channel {
            ContactChannel::Call => &mut self.contact_made_call,
            ContactChannel::Text => &mut self.contact_made_text,
            ContactChannel::Email => &mut self.contact_made_email,
        }
    }

    /// Channels on which contact has been made, in call/text/email order.
    pub fn contact_channels(&self) -> Vec<ContactChannel> {
        ContactChannel::ALL
            .into_iter()
            .filter(|channel| self.contact_made(*channel))
            .collect()
    }

    pub fn has_contact(&self) -> bool {
        ContactChannel::ALL
            .into_iter()
            .any(|channel| self.contact_made(channel))
    }

    pub fn record_attempt(&mut self, channel: ContactChannel, now: DateTime<Utc>) {
        let counter = self.attempts_mut(channel);
        *counter = counter.saturating_add(1);
        self.last_contact_attempt = Some(now);
    }

    /// Flips the contact-made flag and returns its new value. The first
    /// false→true transition stamps `contact_made_on`; later toggles never touch it.
    pub fn toggle_contact(&mut self, channel: ContactChannel, now: DateTime<Utc>) -> bool {
        let flag = self.contact_made_mut(channel);
        *flag = !*flag;
        let made = *flag;
        if made && self.contact_made_on.is_none() {
            self.contact_made_on = Some(now);
        }
        made
    }

    pub fn toggle_hot(&mut self) -> bool {
        self.hot = !self.hot;
        self.hot
    }

    /// Days from the lead date (midnight UTC) to first contact, 0 when contact
    /// was never made.
    pub fn lifecycle_days(&self) -> f64 {
        match self.contact_made_on {
            Some(made_on) => {
                let start = self.date.and_time(NaiveTime::MIN).and_utc();
                (made_on - start).num_milliseconds() as f64 / MILLIS_PER_DAY
            }
            None => 0.0,
        }
    }
}

const MILLIS_PER_DAY: f64 = 1000.0 * 60.0 * 60.0 * 24.0;

/// Parses the date forms a lead date shows up in: `2024-03-04`, an RFC 3339
/// timestamp, a naive ISO timestamp, or the display form `Mar 4, 2024`.
/// Timestamps are read as the local calendar day they fall on.
pub fn parse_lead_date(value: &str) -> Option<NaiveDate> {
    parse_lead_date_in(value, &Local)
}

/// [`parse_lead_date`] with timestamps placed in `tz`. A stored lead date is
/// the user's local midnight, which is the previous UTC day east of UTC.
pub fn parse_lead_date_in<Tz: TimeZone>(value: &str, tz: &Tz) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(value) {
        return Some(timestamp.with_timezone(tz).date_naive());
    }
    if let Ok(timestamp) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(timestamp.date());
    }
    NaiveDate::parse_from_str(value, "%b %d, %Y").ok()
}

/// RFC 3339 instant, or `None` for blank or unreadable text.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

/// Any JSON scalar a stored field may hold.
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Flag(bool),
    Whole(u64),
    Number(f64),
    Text(String),
}

fn deserialize_lead_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_lead_date(&raw).ok_or_else(|| de::Error::custom(format!("invalid lead date '{raw}'")))
}

fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .unwrap_or_else(new_lead_id))
}

fn deserialize_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Scalar>::deserialize(deserializer)? {
        None => String::new(),
        Some(Scalar::Text(text)) => text,
        Some(Scalar::Flag(flag)) => flag.to_string(),
        Some(Scalar::Whole(number)) => number.to_string(),
        Some(Scalar::Number(number)) => number.to_string(),
    })
}

fn deserialize_count<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Scalar>::deserialize(deserializer)? {
        None => Ok(0),
        Some(Scalar::Whole(number)) => u32::try_from(number).map_err(de::Error::custom),
        Some(Scalar::Number(number)) if number.is_finite() && number >= 0.0 => {
            Ok(number.min(f64::from(u32::MAX)) as u32)
        }
        Some(Scalar::Text(text)) if text.trim().is_empty() => Ok(0),
        Some(Scalar::Text(text)) => text
            .trim()
            .parse()
            .map_err(|_| de::Error::custom(format!("invalid attempt count '{text}'"))),
        Some(_) => Err(de::Error::custom("invalid attempt count")),
    }
}

fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Scalar>::deserialize(deserializer)? {
        None => Ok(false),
        Some(Scalar::Flag(flag)) => Ok(flag),
        Some(Scalar::Whole(number)) => Ok(number != 0),
        Some(Scalar::Text(text)) => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" | "" => Ok(false),
            _ => Err(de::Error::custom(format!("invalid flag '{text}'"))),
        },
        Some(Scalar::Number(_)) => Err(de::Error::custom("invalid flag")),
    }
}

fn deserialize_status<'de, D>(deserializer: D) -> Result<LeadStatus, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(LeadStatus::Open),
        Some(value) => value.parse().map_err(de::Error::custom),
    }
}

// Blank sources are stored as "".
fn deserialize_source<'de, D>(deserializer: D) -> Result<Option<LeadSource>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(de::Error::custom),
    }
}

// Never-set timestamps are stored as "".
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => parse_timestamp(value)
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("invalid timestamp '{value}'"))),
    }
}
