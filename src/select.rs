//! Picking the most recent messages across month archives.

use tracing::{debug, warn};

use crate::archive::{MonthArchiveLoader, MonthArchiveRef};
use crate::error::Result;
use crate::fetch::Fetcher;
use crate::model::message::Message;
use crate::parser::decode;

/// Collect up to `target` messages, newest first.
///
/// Months are visited in the given order and each month's messages are
/// reversed, so the last message delivered in a month comes first. No month
/// is fetched once `target` messages are in hand. Ordering follows the
/// archive layout only; message dates play no part.
///
/// A message that fails to decode is logged and skipped; the rest of its
/// month is kept.
pub fn select<F: Fetcher>(
    loader: &MonthArchiveLoader<F>,
    months: &[MonthArchiveRef],
    target: usize,
) -> Result<Vec<Message>> {
    let mut selected: Vec<Message> = Vec::new();

    for month in months {
        if selected.len() >= target {
            break;
        }

        let mut skipped = 0usize;
        for (position, raw) in loader.load(month)?.enumerate().rev() {
            match decode::decode(&raw) {
                Ok(message) => selected.push(message),
                Err(e) => {
                    skipped += 1;
                    warn!(url = %month.url, position, error = %e, "Skipping undecodable message");
                }
            }
        }
        debug!(url = %month.url, total = selected.len(), skipped, "Collected month");
    }

    selected.truncate(target);
    Ok(selected)
}
