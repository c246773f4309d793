//! Loading one month's compressed mbox.

use std::io::{Read, Write};

use flate2::read::MultiGzDecoder;
use tracing::{debug, warn};

use crate::archive::index::MonthArchiveRef;
use crate::error::{FeedError, Result};
use crate::fetch::Fetcher;
use crate::model::message::RawMessage;
use crate::parser::decode::MessageEncoding;
use crate::parser::mbox::MboxParser;

/// Decompressed size limit used unless [`MonthArchiveLoader::with_max_bytes`] says otherwise.
pub const DEFAULT_MAX_BYTES: u64 = 64 * 1024 * 1024;

/// Fetches month archives and splits them into raw messages.
pub struct MonthArchiveLoader<F> {
    fetcher: F,
    encoding: MessageEncoding,
    max_bytes: u64,
}

impl<F: Fetcher> MonthArchiveLoader<F> {
    /// `encoding` is attached to every message this loader yields.
    pub fn new(fetcher: F, encoding: MessageEncoding) -> Self {
        Self {
            fetcher,
            encoding,
            max_bytes: DEFAULT_MAX_BYTES,
        }
    }

    /// Cap the decompressed size of a single month.
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Fetch, decompress and split one month, oldest message first.
    pub fn load(&self, month: &MonthArchiveRef) -> Result<MonthMessages> {
        let compressed = self.fetcher.fetch(&month.url)?;
        let mbox = gunzip(&month.url, &compressed, self.max_bytes)?;
        debug!(
            url = %month.url,
            compressed = compressed.len(),
            bytes = mbox.len(),
            "Decompressed month archive"
        );

        let messages = split_mbox(&mbox)?
            .into_iter()
            .map(|bytes| RawMessage {
                bytes,
                encoding: self.encoding,
            })
            .collect::<Vec<_>>();
        debug!(url = %month.url, messages = messages.len(), "Loaded month archive");

        Ok(MonthMessages {
            inner: messages.into_iter(),
        })
    }
}

/// Messages of one month in container order. Single pass.
#[derive(Debug)]
pub struct MonthMessages {
    inner: std::vec::IntoIter<RawMessage>,
}

impl Iterator for MonthMessages {
    type Item = RawMessage;

    fn next(&mut self) -> Option<RawMessage> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl DoubleEndedIterator for MonthMessages {
    fn next_back(&mut self) -> Option<RawMessage> {
        self.inner.next_back()
    }
}

impl ExactSizeIterator for MonthMessages {}

/// Decompress every gzip member, refusing output larger than `max_bytes`.
fn gunzip(url: &str, compressed: &[u8], max_bytes: u64) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    MultiGzDecoder::new(compressed)
        .take(max_bytes.saturating_add(1))
        .read_to_end(&mut out)
        .map_err(|source| FeedError::Gzip {
            url: url.to_string(),
            source,
        })?;
    if out.len() as u64 > max_bytes {
        return Err(FeedError::TooLarge {
            url: url.to_string(),
            max_bytes,
        });
    }
    Ok(out)
}

/// Stage decompressed bytes in a temporary file and run the mbox parser over it.
///
/// The staging file is unlinked as soon as the parser has it open; on every
/// earlier error path it is removed when the handle drops.
fn split_mbox(mbox: &[u8]) -> Result<Vec<Vec<u8>>> {
    let mut staged = tempfile::Builder::new()
        .prefix("mailman-rss-")
        .suffix(".mbox")
        .tempfile()
        .map_err(|e| FeedError::io(std::env::temp_dir(), e))?;
    let staged_path = staged.path().to_path_buf();
    staged
        .write_all(mbox)
        .and_then(|()| staged.flush())
        .map_err(|e| FeedError::io(&staged_path, e))?;

    let parser = MboxParser::new(&staged_path);
    let mut reader = parser.open()?;
    if let Err(e) = staged.close() {
        warn!(path = %staged_path.display(), error = %e, "Failed to remove staging file");
    }

    let mut messages = Vec::new();
    parser.parse(&mut reader, &mut |raw| {
        messages.push(raw.to_vec());
        true
    })?;
    Ok(messages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use flate2::write::GzEncoder;
    use flate2::Compression;

    struct MapFetcher(HashMap<String, Vec<u8>>);

    impl Fetcher for MapFetcher {
        fn fetch(&self, url: &str) -> Result<Vec<u8>> {
            self.0
                .get(url)
                .cloned()
                .ok_or_else(|| FeedError::HttpStatus {
                    url: url.to_string(),
                    status: 404,
                })
        }
    }

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(data).unwrap();
        enc.finish().unwrap()
    }

    const MBOX: &[u8] = b"From a at x  Wed Apr  1 00:00:00 2020\nSubject: first\n\none\n\n\
From b at x  Thu Apr  2 00:00:00 2020\nSubject: second\n\ntwo\n";

    #[test]
    fn test_load_yields_container_order() {
        let url = "http://x/2020-April.txt.gz";
        let fetcher = MapFetcher(HashMap::from([(url.to_string(), gzip(MBOX))]));
        let loader = MonthArchiveLoader::new(fetcher, MessageEncoding::Ascii);

        let messages: Vec<RawMessage> = loader
            .load(&MonthArchiveRef { url: url.into() })
            .unwrap()
            .collect();
        assert_eq!(messages.len(), 2);
        assert!(String::from_utf8_lossy(&messages[0].bytes).contains("Subject: first"));
        assert!(String::from_utf8_lossy(&messages[1].bytes).contains("Subject: second"));
        assert!(messages.iter().all(|m| m.encoding == MessageEncoding::Ascii));
    }

    #[test]
    fn test_not_gzip_is_an_error() {
        let url = "http://x/broken.txt.gz";
        let fetcher = MapFetcher(HashMap::from([(url.to_string(), b"plain text".to_vec())]));
        let loader = MonthArchiveLoader::new(fetcher, MessageEncoding::Ascii);
        let err = loader.load(&MonthArchiveRef { url: url.into() }).unwrap_err();
        assert!(matches!(err, FeedError::Gzip { .. }));
    }

    #[test]
    fn test_fetch_error_propagates() {
        let loader = MonthArchiveLoader::new(MapFetcher(HashMap::new()), MessageEncoding::Ascii);
        let err = loader
            .load(&MonthArchiveRef {
                url: "http://x/missing.txt.gz".into(),
            })
            .unwrap_err();
        assert!(matches!(err, FeedError::HttpStatus { status: 404, .. }));
    }

    #[test]
    fn test_concatenated_gzip_members() {
        let url = "http://x/2020-April.txt.gz";
        let (first, second) = MBOX.split_at(MBOX.len() / 2);
        let mut body = gzip(first);
        body.extend_from_slice(&gzip(second));
        let fetcher = MapFetcher(HashMap::from([(url.to_string(), body)]));
        let loader = MonthArchiveLoader::new(fetcher, MessageEncoding::Ascii);

        let messages: Vec<RawMessage> = loader
            .load(&MonthArchiveRef { url: url.into() })
            .unwrap()
            .collect();
        assert_eq!(messages.len(), 2);
        assert!(String::from_utf8_lossy(&messages[1].bytes).contains("two"));
    }

    #[test]
    fn test_decompressed_size_is_capped() {
        let url = "http://x/2020-April.txt.gz";
        let fetcher = MapFetcher(HashMap::from([(url.to_string(), gzip(MBOX))]));
        let loader =
            MonthArchiveLoader::new(fetcher, MessageEncoding::Ascii).with_max_bytes(16);
        let err = loader.load(&MonthArchiveRef { url: url.into() }).unwrap_err();
        assert!(matches!(err, FeedError::TooLarge { max_bytes: 16, .. }));
    }

    #[test]
    fn test_exact_size_limit_is_allowed() {
        let url = "http://x/2020-April.txt.gz";
        let fetcher = MapFetcher(HashMap::from([(url.to_string(), gzip(MBOX))]));
        let loader = MonthArchiveLoader::new(fetcher, MessageEncoding::Ascii)
            .with_max_bytes(MBOX.len() as u64);
        assert_eq!(loader.load(&MonthArchiveRef { url: url.into() }).unwrap().len(), 2);
    }

    #[test]
    fn test_empty_month() {
        let url = "http://x/empty.txt.gz";
        let fetcher = MapFetcher(HashMap::from([(url.to_string(), gzip(b""))]));
        let loader = MonthArchiveLoader::new(fetcher, MessageEncoding::Ascii);
        assert_eq!(loader.load(&MonthArchiveRef { url: url.into() }).unwrap().len(), 0);
    }
}
