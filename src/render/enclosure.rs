//! Enclosures recovered from scrubbed-attachment notices.
//!
//! The archiver replaces each non-text attachment with a notice like:
//!
//! ```text
//! A non-text attachment was scrubbed...
//! Name: screenshot.png
//! Type: image/png
//! Size: 12345 bytes
//! Desc: not available
//! Url : http://lists.example.org/pipermail/dev/attachments/20200416/abc.png
//! ```

use url::Url;

use crate::model::feed::Enclosure;

const SCRUBBED_MARKER: &str = "A non-text attachment was scrubbed";

/// Value of the first line whose lowercase form starts with `label`:
/// everything after the first colon, trimmed. Empty values count as absent.
pub fn notice_field<'a>(notice: &'a str, label: &str) -> Option<&'a str> {
    let line = notice
        .lines()
        .find(|line| line.to_lowercase().starts_with(label))?;
    let (_, value) = line.split_once(':')?;
    Some(value.trim()).filter(|v| !v.is_empty())
}

/// Enclosure described by one notice, if it is a scrubbed-attachment notice
/// with type, size and an absolute URL.
pub fn enclosure(notice: &str) -> Option<Enclosure> {
    if !notice.contains(SCRUBBED_MARKER) {
        return None;
    }

    let mime_type = notice_field(notice, "type")?;
    let length = notice_field(notice, "size")?;
    let url = notice_field(notice, "url")?;
    let url = url
        .strip_prefix('<')
        .and_then(|u| u.strip_suffix('>'))
        .unwrap_or(url);

    // Relative attachment paths would not resolve for feed readers
    let parsed = Url::parse(url).ok()?;
    if !parsed.host_str().is_some_and(|h| !h.is_empty()) {
        return None;
    }

    Some(Enclosure {
        url: url.to_string(),
        length: length.to_string(),
        mime_type: mime_type.to_string(),
    })
}

/// Enclosures for every usable notice, in order.
pub fn enclosures(notices: &[String]) -> Vec<Enclosure> {
    notices.iter().filter_map(|n| enclosure(n)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notice(url_line: &str) -> String {
        format!(
            "A non-text attachment was scrubbed...\nName: x.png\nType: image/png\n\
Size: 12345 bytes\nDesc: not available\n{url_line}"
        )
    }

    #[test]
    fn test_absolute_url_enclosure() {
        let found = enclosures(&[notice("Url: http://example.org/x.png")]);
        assert_eq!(
            found,
            vec![Enclosure {
                url: "http://example.org/x.png".into(),
                length: "12345 bytes".into(),
                mime_type: "image/png".into(),
            }]
        );
    }

    #[test]
    fn test_relative_url_dropped() {
        assert!(enclosures(&[notice("Url: ../x.png")]).is_empty());
        assert!(enclosures(&[notice("Url: file:///tmp/x.png")]).is_empty());
    }

    #[test]
    fn test_spaced_label_and_angle_brackets() {
        let found = enclosure(&notice("URL: <http://example.org/attachments/x.png>")).unwrap();
        assert_eq!(found.url, "http://example.org/attachments/x.png");
        let found = enclosure(&notice("Url : http://example.org/y.png")).unwrap();
        assert_eq!(found.url, "http://example.org/y.png");
    }

    #[test]
    fn test_missing_field_or_marker() {
        let no_size = "A non-text attachment was scrubbed...\nType: image/png\nUrl: http://e.org/x";
        assert_eq!(enclosure(no_size), None);

        let no_marker = "Type: image/png\nSize: 1 bytes\nUrl: http://e.org/x";
        assert_eq!(enclosure(no_marker), None);
    }

    #[test]
    fn test_notice_field_first_match_wins() {
        let text = "Type: a/b\ntype: c/d\nnothing here";
        assert_eq!(notice_field(text, "type"), Some("a/b"));
        assert_eq!(notice_field(text, "size"), None);
        assert_eq!(notice_field("Size without colon", "size"), None);
    }
}
