//! Message body extraction and scrubbed-attachment splitting.

use std::sync::LazyLock;

use mail_parser::{MessageParser, PartType};
use regex::Regex;

/// Delimiter the list archiver puts where a non-text attachment was removed:
/// `-------------- next part --------------` on a line of its own.
static NEXT_PART: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?mR)^-+\s+next part\s+-+$").expect("valid regex"));

/// Skip the `From ` separator line at the start of MBOX messages.
pub fn skip_from_line(text: &str) -> &str {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    if text.starts_with("From ") {
        return match text.find('\n') {
            Some(pos) => &text[pos + 1..],
            None => "",
        };
    }
    text
}

/// Split a message into its header block and everything after the first blank line.
pub fn split_header_block(text: &str) -> (&str, &str) {
    if let Some(pos) = text.find("\r\n\r\n") {
        if text.find("\n\n").is_none_or(|lf| lf > pos) {
            return (&text[..pos], &text[pos + 4..]);
        }
    }
    match text.find("\n\n") {
        Some(pos) => (&text[..pos], &text[pos + 2..]),
        None => (text, ""),
    }
}

/// Raw body text of a message (separator line already removed).
///
/// For a multipart message this is the first part's payload; otherwise the
/// whole payload. Transfer encodings are left untouched, as the archive
/// stores text parts already flattened.
pub fn body_text(message: &str) -> &str {
    first_part_payload(message).unwrap_or_else(|| split_header_block(message).1)
}

fn first_part_payload(message: &str) -> Option<&str> {
    let parsed = MessageParser::default().parse(message.as_bytes())?;
    let root = parsed.root_part();

    let part = match &root.body {
        PartType::Multipart(children) => children
            .first()
            .and_then(|&id| parsed.parts.get(id as usize))
            .unwrap_or(root),
        _ => root,
    };

    let start = part.raw_body_offset() as usize;
    let end = part.raw_end_offset() as usize;
    message.get(start..end.max(start))
}

/// Split body text on "next part" delimiters.
///
/// Returns the trimmed text before the first delimiter and the trimmed
/// segments after each delimiter, in order.
pub fn split_next_parts(body: &str) -> (String, Vec<String>) {
    let mut segments = NEXT_PART.split(body).map(|s| s.trim().to_string());
    let head = segments.next().unwrap_or_default();
    (head, segments.collect())
}
