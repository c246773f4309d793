//! The whole run: index page to finished RSS document.

use chrono::Utc;
use tracing::info;

use crate::archive::month::DEFAULT_MAX_BYTES;
use crate::archive::{Archive, MonthArchiveLoader};
use crate::error::{FeedError, Result};
use crate::feed;
use crate::fetch::Fetcher;
use crate::parser::decode::MessageEncoding;
use crate::render::permalink::DEFAULT_MONTH_FORMAT;
use crate::render::FeedItemRenderer;
use crate::select;

/// Per-run feed settings, resolved from config and command line.
#[derive(Debug, Clone)]
pub struct FeedOptions {
    /// Number of messages to emit.
    pub count: usize,
    /// Charset every message is decoded with.
    pub encoding: MessageEncoding,
    /// Channel `<language>` tag.
    pub language: String,
    /// `strftime` layout of the month directory in permalinks.
    pub month_format: String,
    /// Largest decompressed month archive accepted, in bytes.
    pub max_bytes: u64,
}

impl Default for FeedOptions {
    fn default() -> Self {
        Self {
            count: 25,
            encoding: MessageEncoding::Ascii,
            language: "ja-JP".to_string(),
            month_format: DEFAULT_MONTH_FORMAT.to_string(),
            max_bytes: DEFAULT_MAX_BYTES,
        }
    }
}

/// RFC 2822 timestamp of "now" in UTC, taken once per run.
pub fn build_time() -> String {
    Utc::now().to_rfc2822()
}

/// Build the feed for the archive at `base_url`.
///
/// Fails with [`FeedError::NoMonthArchives`] when the index page lists no
/// month archives. Months are fetched only until `count` messages are in hand.
pub fn build_feed<F: Fetcher>(
    fetcher: &F,
    base_url: &str,
    options: &FeedOptions,
    build_time: &str,
) -> Result<String> {
    let archive = Archive::open(fetcher, base_url)?;
    if archive.month_archives().is_empty() {
        return Err(FeedError::NoMonthArchives(archive.base_url().to_string()));
    }

    let loader =
        MonthArchiveLoader::new(fetcher, options.encoding).with_max_bytes(options.max_bytes);
    let messages = select::select(&loader, archive.month_archives(), options.count)?;

    let renderer = FeedItemRenderer::new(archive.base_url(), build_time)
        .with_month_format(options.month_format.as_str());
    let items: Vec<_> = messages.iter().map(|m| renderer.render(m)).collect();
    info!(
        url = %archive.base_url(),
        items = items.len(),
        encoding = options.encoding.name(),
        "Built feed"
    );

    feed::write(&archive, items, &options.language, build_time)
}
