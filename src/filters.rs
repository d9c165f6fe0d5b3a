//! Row filters, staleness and the per-row badge.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{LeadRecord, LeadSource, LeadStatus};

/// A lead never attempted, or last attempted more than `stale_after` ago.
pub fn is_stale(lead: &LeadRecord, now: DateTime<Utc>, stale_after: Duration) -> bool {
    match lead.last_contact_attempt {
        Some(last) => now - last > stale_after,
        None => true,
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum ContactFilter {
    #[default]
    All,
    /// Contact made on at least one channel.
    Contacted,
    /// No contact made on any channel.
    NoContact,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct FilterState {
    pub contact: ContactFilter,
    pub status: Option<LeadStatus>,
    pub source: Option<LeadSource>,
    pub hot_only: bool,
    pub stale_only: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", tag = "type", content = "value")]
pub enum FilterUpdate {
    Contact(ContactFilter),
    Status(Option<LeadStatus>),
    Source(Option<LeadSource>),
    ToggleHot,
    ToggleStale,
    Reset,
}

impl FilterState {
    pub fn is_active(&self) -> bool {
        *self != Self::default()
    }

    pub fn apply(&mut self, update: FilterUpdate) {
        match update {
            FilterUpdate::Contact(contact) => self.contact = contact,
            FilterUpdate::Status(status) => self.status = status,
            FilterUpdate::Source(source) => self.source = source,
            FilterUpdate::ToggleHot => self.hot_only = !self.hot_only,
            FilterUpdate::ToggleStale => self.stale_only = !self.stale_only,
            FilterUpdate::Reset => *self = Self::default(),
        }
    }

    /// AND of every active filter.
    pub fn matches(&self, lead: &LeadRecord, now: DateTime<Utc>, stale_after: Duration) -> bool {
        let contact_ok = match self.contact {
            ContactFilter::All => true,
            ContactFilter::Contacted => lead.has_contact(),
            ContactFilter::NoContact => !lead.has_contact(),
        };
        contact_ok
            && self.status.map_or(true, |status| lead.status == status)
            && self.source.map_or(true, |source| lead.source == Some(source))
            && (!self.hot_only || lead.hot)
            && (!self.stale_only || is_stale(lead, now, stale_after))
    }
}

/// Row marker, highest priority first.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum LeadBadge {
    Hot,
    ClosedWon,
    ClosedLost,
    Stale,
}

pub fn lead_badge(lead: &LeadRecord, now: DateTime<Utc>, stale_after: Duration) -> Option<LeadBadge> {
    if lead.hot {
        Some(LeadBadge::Hot)
    } else if lead.status == LeadStatus::ClosedWon {
        Some(LeadBadge::ClosedWon)
    } else if lead.status == LeadStatus::ClosedLost {
        Some(LeadBadge::ClosedLost)
    } else if is_stale(lead, now, stale_after) {
        Some(LeadBadge::Stale)
    } else {
        None
    }
}
