//! Feed item types produced by the renderer.

/// A downloadable resource attached to a feed item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enclosure {
    /// Absolute URL of the resource.
    pub url: String,
    /// Length as written in the attachment notice (e.g. `"12345 bytes"`).
    pub length: String,
    /// MIME type (e.g. `"image/png"`).
    pub mime_type: String,
}

/// One `<item>` of the feed, produced 1:1 from a [`super::message::Message`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedItem {
    pub title: Option<String>,
    pub author: Option<String>,
    /// Date header text, or the run's build timestamp.
    pub pub_date: String,
    /// Message-ID without angle brackets. Never a permalink.
    pub guid: Option<String>,
    /// Reconstructed web archive URL, when the subject carries a sequence number.
    pub link: Option<String>,
    /// Body markup, inserted into the document unescaped.
    pub description_html: String,
    pub enclosures: Vec<Enclosure>,
}
