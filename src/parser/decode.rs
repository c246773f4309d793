//! Turning raw mbox records into [`Message`]s.

use encoding_rs::Encoding;

use crate::error::{FeedError, Result};
use crate::model::message::{Message, RawMessage};
use crate::parser::header::{decode_encoded_words, parse_date, Headers};
use crate::parser::mime;

/// Charset every message of a run is decoded with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MessageEncoding {
    /// Strict 7-bit ASCII: any byte above 0x7F is an error.
    #[default]
    Ascii,
    /// Any WHATWG-registered encoding, malformed sequences are errors.
    Charset(&'static Encoding),
}

impl MessageEncoding {
    /// Resolve a user-supplied charset label such as `"ascii"`, `"utf-8"` or `"euc-jp"`.
    ///
    /// `ascii` is kept strict rather than mapped to windows-1252 as the
    /// WHATWG registry would.
    pub fn from_label(label: &str) -> Result<Self> {
        let trimmed = label.trim();
        if ["ascii", "us-ascii", "us_ascii", "646"]
            .iter()
            .any(|a| trimmed.eq_ignore_ascii_case(a))
        {
            return Ok(Self::Ascii);
        }
        Encoding::for_label(trimmed.as_bytes())
            .map(Self::Charset)
            .ok_or_else(|| FeedError::UnsupportedEncoding(label.to_string()))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Ascii => "ascii",
            Self::Charset(encoding) => encoding.name(),
        }
    }

    /// Decode a whole message, failing on the first invalid sequence.
    pub fn decode(&self, bytes: &[u8]) -> Result<String> {
        match self {
            Self::Ascii => match bytes.iter().position(|b| !b.is_ascii()) {
                Some(pos) => Err(FeedError::Decode {
                    encoding: self.name().to_string(),
                    reason: format!("byte 0x{:02x} at offset {pos}", bytes[pos]),
                }),
                None => Ok(bytes.iter().map(|&b| b as char).collect()),
            },
            Self::Charset(encoding) => encoding
                .decode_without_bom_handling_and_without_replacement(bytes)
                .map(|text| text.into_owned())
                .ok_or_else(|| FeedError::Decode {
                    encoding: self.name().to_string(),
                    reason: "malformed byte sequence".to_string(),
                }),
        }
    }
}

/// Decode one raw record with its declared encoding and extract the fields
/// the feed needs.
pub fn decode(raw: &RawMessage) -> Result<Message> {
    let text = raw.encoding.decode(&raw.bytes)?;
    Ok(parse_message(&text))
}

/// Extract headers and body from already-decoded message text.
///
/// Never fails: missing headers become `None`.
pub fn parse_message(text: &str) -> Message {
    let message = mime::skip_from_line(text);
    let (header_block, _) = mime::split_header_block(message);
    let headers = Headers::parse(header_block);

    let date = headers.get("date").map(str::to_string);
    let parsed_date = date.as_deref().and_then(parse_date);
    let (body_text, attachment_notices) = mime::split_next_parts(mime::body_text(message));

    Message {
        parsed_date,
        date,
        author: headers.get("from").map(decode_encoded_words),
        subject: headers.get("subject").map(decode_encoded_words),
        message_id: headers.get("message-id").map(str::to_string),
        body_text,
        attachment_notices,
    }
}
