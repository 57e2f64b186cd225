//! Response decoding
//!
//! # Overview
//!
//! Xero wraps every list response in an envelope keyed by the resource name,
//! e.g. `{"Invoices": [...]}`. Decoding parses the body with arbitrary
//! precision numbers, normalizes every date literal to RFC 3339 UTC, and
//! unwraps the envelope into a page of records.

mod dates;
mod envelope;

pub use dates::{format_date, normalize_date_string, normalize_dates, parse_date};
pub use envelope::decode_page;
