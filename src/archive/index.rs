//! The archive index page: display title and month archive links.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use tracing::{debug, info};
use url::Url;

use crate::error::{FeedError, Result};
use crate::fetch::Fetcher;

/// Month text archives as the archiver names them, e.g. `2020-April.txt.gz`.
static MONTH_HREF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.txt(\.gz)?$").expect("valid regex"));

/// A link to one month's compressed mbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthArchiveRef {
    /// Absolute URL, always ending in `.gz`.
    pub url: String,
}

/// A mailing-list web archive, as described by its index page.
#[derive(Debug, Clone)]
pub struct Archive {
    base_url: String,
    title: Option<String>,
    months: Vec<MonthArchiveRef>,
}

impl Archive {
    /// Fetch and read the index page at `base_url`.
    ///
    /// Finding no month links is not an error here; callers decide.
    pub fn open(fetcher: &impl Fetcher, base_url: &str) -> Result<Self> {
        let base_url = normalize_base_url(base_url);
        let bytes = fetcher.fetch(&base_url)?;
        let archive = Self::from_index(&base_url, &decode_index(&bytes))?;
        info!(
            url = %archive.base_url,
            months = archive.months.len(),
            title = archive.title.as_deref().unwrap_or(""),
            "Read archive index"
        );
        Ok(archive)
    }

    /// Build from an already-fetched index document.
    pub fn from_index(base_url: &str, html: &str) -> Result<Self> {
        let base_url = normalize_base_url(base_url);
        let base = Url::parse(&base_url).map_err(|e| FeedError::InvalidUrl {
            url: base_url.clone(),
            reason: e.to_string(),
        })?;

        let document = Html::parse_document(html);
        let title_selector = Selector::parse("title").expect("valid selector");
        let anchor_selector = Selector::parse("a[href]").expect("valid selector");

        let title = document
            .select(&title_selector)
            .next()
            .map(|t| t.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty());

        let mut months = Vec::new();
        for anchor in document.select(&anchor_selector) {
            let Some(href) = anchor.value().attr("href").map(str::trim) else {
                continue;
            };
            if !MONTH_HREF.is_match(href) {
                continue;
            }
            let href = if href.ends_with(".gz") {
                href.to_string()
            } else {
                format!("{href}.gz")
            };
            match base.join(&href) {
                Ok(url) => months.push(MonthArchiveRef { url: url.into() }),
                Err(e) => debug!(href, error = %e, "Skipping unresolvable month link"),
            }
        }

        Ok(Self {
            base_url,
            title,
            months,
        })
    }

    /// Base URL, always ending with `/`.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Text of the index page's `<title>`, if any.
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Month archives in the order the index page lists them.
    pub fn month_archives(&self) -> &[MonthArchiveRef] {
        &self.months
    }
}

/// Append the trailing `/` month links are resolved against.
pub fn normalize_base_url(url: &str) -> String {
    let url = url.trim();
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{url}/")
    }
}

/// Index pages are read as UTF-8 when valid, otherwise as windows-1252
/// (which accepts every byte).
fn decode_index(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INDEX: &str = r#"<!DOCTYPE HTML PUBLIC "-//W3C//DTD HTML 3.2//EN">
<HTML>
  <HEAD>
     <title>The Dev-ja Archives</title>
  </HEAD>
  <BODY>
    <table border=3>
      <tr><td>May 2020:</td>
        <td><A href="2020-May/thread.html">[ Thread ]</a></td>
        <td><A href="2020-May.txt.gz">[ Gzip'd Text 1 KB ]</a></td>
      </tr>
      <tr><td>April 2020:</td>
        <td><A href="2020-April/date.html">[ Date ]</a></td>
        <td><A href="2020-April.txt">[ Text 3 KB ]</a></td>
      </tr>
    </table>
    <a href="http://www.list.org/">Mailman</a>
  </BODY>
</HTML>"#;

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(normalize_base_url("http://x/pipermail/dev"), "http://x/pipermail/dev/");
        assert_eq!(normalize_base_url("http://x/pipermail/dev/"), "http://x/pipermail/dev/");
    }

    #[test]
    fn test_month_links_in_document_order() {
        let archive = Archive::from_index("http://lists.example.org/pipermail/dev", INDEX).unwrap();
        let urls: Vec<&str> = archive.month_archives().iter().map(|m| m.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "http://lists.example.org/pipermail/dev/2020-May.txt.gz",
                "http://lists.example.org/pipermail/dev/2020-April.txt.gz",
            ]
        );
        assert_eq!(archive.base_url(), "http://lists.example.org/pipermail/dev/");
    }

    #[test]
    fn test_title() {
        let archive = Archive::from_index("http://x/", INDEX).unwrap();
        assert_eq!(archive.title(), Some("The Dev-ja Archives"));
    }

    #[test]
    fn test_missing_title_and_no_months() {
        let archive = Archive::from_index("http://x/", "<html><body><p>empty</p></body></html>")
            .unwrap();
        assert_eq!(archive.title(), None);
        assert!(archive.month_archives().is_empty());
    }

    #[test]
    fn test_absolute_month_link() {
        let html = r#"<a href="https://mirror.example.net/dev/2019-June.txt.gz">x</a>"#;
        let archive = Archive::from_index("http://x/dev/", html).unwrap();
        assert_eq!(
            archive.month_archives()[0].url,
            "https://mirror.example.net/dev/2019-June.txt.gz"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let err = Archive::from_index("not a url", INDEX).unwrap_err();
        assert!(matches!(err, FeedError::InvalidUrl { .. }));
    }

    #[test]
    fn test_decode_index_latin1_fallback() {
        assert_eq!(decode_index(b"caf\xe9"), "café");
        assert_eq!(decode_index("café".as_bytes()), "café");
    }
}
