//! Raw and decoded message types.

use chrono::{DateTime, FixedOffset};

use crate::parser::decode::MessageEncoding;

/// One message exactly as the mbox container yielded it.
///
/// Only lives between the month loader and [`crate::parser::decode::decode`].
#[derive(Debug, Clone)]
pub struct RawMessage {
    /// Message bytes, including the leading `From ` separator line.
    pub bytes: Vec<u8>,
    /// Charset the bytes are declared to be in. One value applies to a whole run.
    pub encoding: MessageEncoding,
}

/// A decoded email, ready to be rendered as a feed item.
///
/// Every header is optional: a missing header is `None`, never an error.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Message {
    /// `Date:` header text, verbatim.
    pub date: Option<String>,

    /// `Date:` parsed, keeping the sender's own UTC offset.
    pub parsed_date: Option<DateTime<FixedOffset>>,

    /// `From:` header with RFC 2047 encoded-words resolved.
    pub author: Option<String>,

    /// `Subject:` header with RFC 2047 encoded-words resolved.
    pub subject: Option<String>,

    /// `Message-ID:` header, verbatim (angle brackets included).
    pub message_id: Option<String>,

    /// Body text before the first "next part" delimiter, trimmed.
    pub body_text: String,

    /// Trimmed segments that followed each "next part" delimiter, in order.
    pub attachment_notices: Vec<String>,
}
