//! The email record surfaced to the dashboard, and its date ordering.

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

/// One inbox message, normalized for the dashboard.
///
/// `id` is derived from the IMAP sequence number and is unique only within
/// one response — sequence numbers are session-relative, not stable UIDs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailRecord {
    pub id: String,
    pub from: String,
    pub subject: String,
    /// Raw Date header value; empty when absent. Not validated — the sort
    /// tolerates unparseable values.
    pub date: String,
    pub preview: String,
    /// 0-100, assigned by the scoring strategy.
    pub importance: u8,
    pub read_status: bool,
    pub categories: Vec<String>,
}

impl EmailRecord {
    /// Record id for a message at the given sequence number.
    pub fn sequence_id(seqno: u32) -> String {
        format!("email-{seqno}")
    }
}

/// Parse a Date header value for ordering.
///
/// Tries RFC 2822 (the mail norm), then RFC 3339, then a bare
/// `YYYY-MM-DD`. Returns `None` when nothing matches.
pub fn parse_email_date(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().fixed_offset())
}

/// Sort newest-first. Unparseable or missing dates order as oldest,
/// keeping their arrival order among themselves (the sort is stable).
pub fn sort_by_date_desc(records: &mut [EmailRecord]) {
    records.sort_by_key(|r| std::cmp::Reverse(parse_email_date(&r.date)));
}
