pub mod document;
pub mod lead;
pub mod month;

pub use document::{Document, LoadSummary};
pub use lead::{
    new_lead_id, parse_lead_date, parse_lead_date_in, parse_timestamp, ContactChannel, LeadRecord,
    LeadSource, LeadStatus,
};
pub use month::MonthKey;
