//! Rebuilding a message's web archive URL from its subject and date.

use std::fmt::Write;
use std::sync::LazyLock;

use chrono::{DateTime, FixedOffset};
use regex::Regex;

/// `[tag N]` at the start of a subject, as added by the list's subject prefix.
static SEQUENCE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[\w+ (\d+)\]").expect("valid regex"));

/// Month directory layout used when none is configured: `April-2020`.
pub const DEFAULT_MONTH_FORMAT: &str = "%B-%Y";

/// Sequence number from a `[tag N] ...` subject.
pub fn sequence_number(subject: &str) -> Option<u64> {
    SEQUENCE_TAG
        .captures(subject)
        .and_then(|caps| caps[1].parse().ok())
}

/// `<base><month dir>/<N-1, 6 digits>.html`, or `None` when the subject has
/// no sequence tag, the date is unknown, N is 0, or `month_format` is not a
/// valid `strftime` layout.
///
/// The archiver numbers its HTML pages from zero while the list counts
/// posts from one, hence the offset.
pub fn permalink(
    base_url: &str,
    month_format: &str,
    subject: &str,
    date: Option<&DateTime<FixedOffset>>,
) -> Option<String> {
    let date = date?;
    let index = sequence_number(subject)?.checked_sub(1)?;

    // An invalid layout fails here instead of panicking inside format!
    let mut month = String::new();
    write!(month, "{}", date.format(month_format)).ok()?;
    Some(format!("{base_url}{month}/{index:06}.html"))
}
