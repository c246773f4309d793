//! Turning decoded messages into feed items.

pub mod enclosure;
pub mod permalink;

use crate::model::feed::FeedItem;
use crate::model::message::Message;

/// Line break marker the body's newlines are replaced with.
const LINE_BREAK: &str = "<br/>";

/// Renders [`Message`]s for one archive and one run.
///
/// Pure: the same message always renders to the same item.
#[derive(Debug, Clone)]
pub struct FeedItemRenderer {
    base_url: String,
    build_time: String,
    month_format: String,
}

impl FeedItemRenderer {
    /// `build_time` stands in for missing `Date:` headers.
    pub fn new(base_url: impl Into<String>, build_time: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            build_time: build_time.into(),
            month_format: permalink::DEFAULT_MONTH_FORMAT.to_string(),
        }
    }

    /// Use a different `strftime` layout for the month directory of permalinks.
    pub fn with_month_format(mut self, month_format: impl Into<String>) -> Self {
        self.month_format = month_format.into();
        self
    }

    pub fn render(&self, message: &Message) -> FeedItem {
        let link = message.subject.as_deref().and_then(|subject| {
            permalink::permalink(
                &self.base_url,
                &self.month_format,
                subject,
                message.parsed_date.as_ref(),
            )
        });

        FeedItem {
            title: message.subject.clone(),
            author: message.author.as_deref().map(deobfuscate_author),
            pub_date: message
                .date
                .clone()
                .unwrap_or_else(|| self.build_time.clone()),
            guid: message.message_id.as_deref().and_then(strip_guid),
            link,
            description_html: body_markup(&message.body_text),
            enclosures: enclosure::enclosures(&message.attachment_notices),
        }
    }
}

/// Undo the archiver's `user at host` address obfuscation.
pub fn deobfuscate_author(author: &str) -> String {
    author.replace(" at ", "@")
}

/// Message-ID without surrounding angle brackets.
fn strip_guid(message_id: &str) -> Option<String> {
    let stripped = message_id.trim_matches(|c| c == '<' || c == '>');
    (!stripped.is_empty()).then(|| stripped.to_string())
}

/// Body text as markup for a CDATA section: newlines become `<br/>`, and the
/// one sequence that would end the section early is neutralized.
fn body_markup(body: &str) -> String {
    body.replace("\r\n", "\n")
        .replace('\n', LINE_BREAK)
        .replace("]]>", "]]&gt;")
}
