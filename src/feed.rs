//! RSS 2.0 document assembly.

use std::borrow::Cow;
use std::io::Write;

use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::archive::Archive;
use crate::error::{FeedError, Result};
use crate::model::feed::FeedItem;

type XmlResult = std::result::Result<(), Box<dyn std::error::Error>>;

/// A complete feed, ready to serialize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feed {
    pub language: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub link: String,
    /// Taken from the first item once, never updated afterwards.
    pub pub_date: String,
    pub items: Vec<FeedItem>,
}

impl Feed {
    /// Build the channel for `archive`. The channel date is the first item's
    /// date, or `build_time` when there are no items.
    pub fn new(
        archive: &Archive,
        items: Vec<FeedItem>,
        language: impl Into<String>,
        build_time: &str,
    ) -> Self {
        let pub_date = items
            .first()
            .map_or_else(|| build_time.to_string(), |item| item.pub_date.clone());
        Self {
            language: language.into(),
            title: archive.title().map(str::to_string),
            description: archive.title().map(str::to_string),
            link: archive.base_url().to_string(),
            pub_date,
            items,
        }
    }

    /// Serialize to an RSS 2.0 document.
    pub fn to_xml(&self) -> Result<String> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        self.write_document(&mut writer).map_err(xml_error)?;

        let mut out = writer.into_inner();
        out.push(b'\n');
        String::from_utf8(out).map_err(xml_error)
    }

    fn write_document<W: Write>(&self, w: &mut Writer<W>) -> XmlResult {
        w.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

        let mut rss = BytesStart::new("rss");
        rss.push_attribute(("version", "2.0"));
        w.write_event(Event::Start(rss))?;
        w.write_event(Event::Start(BytesStart::new("channel")))?;

        write_text_element(w, "language", &self.language)?;
        if let Some(title) = &self.title {
            write_text_element(w, "title", title)?;
        }
        if let Some(description) = &self.description {
            write_text_element(w, "description", description)?;
        }
        write_text_element(w, "link", &self.link)?;
        write_text_element(w, "pubDate", &self.pub_date)?;

        for item in &self.items {
            write_item(w, item)?;
        }

        w.write_event(Event::End(BytesEnd::new("channel")))?;
        w.write_event(Event::End(BytesEnd::new("rss")))?;
        Ok(())
    }
}

/// Assemble and serialize the feed for `archive` in one step.
pub fn write(
    archive: &Archive,
    items: Vec<FeedItem>,
    language: &str,
    build_time: &str,
) -> Result<String> {
    Feed::new(archive, items, language, build_time).to_xml()
}

fn write_item<W: Write>(w: &mut Writer<W>, item: &FeedItem) -> XmlResult {
    w.write_event(Event::Start(BytesStart::new("item")))?;

    if let Some(author) = &item.author {
        write_text_element(w, "author", author)?;
    }
    write_text_element(w, "pubDate", &item.pub_date)?;
    if let Some(title) = &item.title {
        write_text_element(w, "title", title)?;
    }
    if let Some(link) = &item.link {
        write_text_element(w, "link", link)?;
    }
    if let Some(guid) = &item.guid {
        let mut start = BytesStart::new("guid");
        start.push_attribute(("isPermaLink", "false"));
        w.write_event(Event::Start(start))?;
        w.write_event(Event::Text(BytesText::from_escaped(escape_text(guid))))?;
        w.write_event(Event::End(BytesEnd::new("guid")))?;
    }

    w.write_event(Event::Start(BytesStart::new("description")))?;
    let markup = strip_invalid_chars(&item.description_html);
    w.write_event(Event::CData(BytesCData::new(&*markup)))?;
    w.write_event(Event::End(BytesEnd::new("description")))?;

    for enclosure in &item.enclosures {
        let mut start = BytesStart::new("enclosure");
        start.push_attribute(("url", enclosure.url.as_str()));
        start.push_attribute(("length", enclosure.length.as_str()));
        start.push_attribute(("type", enclosure.mime_type.as_str()));
        w.write_event(Event::Empty(start))?;
    }

    w.write_event(Event::End(BytesEnd::new("item")))?;
    Ok(())
}

fn write_text_element<W: Write>(w: &mut Writer<W>, name: &str, text: &str) -> XmlResult {
    w.write_event(Event::Start(BytesStart::new(name)))?;
    w.write_event(Event::Text(BytesText::from_escaped(escape_text(text))))?;
    w.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

/// Escape `&`, `<`, `>` and `"`, dropping characters XML 1.0 cannot carry.
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars().filter(|&c| is_xml_char(c)) {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

fn strip_invalid_chars(text: &str) -> Cow<'_, str> {
    if text.chars().all(is_xml_char) {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(text.chars().filter(|&c| is_xml_char(c)).collect())
    }
}

fn is_xml_char(c: char) -> bool {
    !matches!(
        c,
        '\u{0}'..='\u{8}' | '\u{B}' | '\u{C}' | '\u{E}'..='\u{1F}' | '\u{FFFE}' | '\u{FFFF}'
    )
}

fn xml_error(e: impl std::fmt::Display) -> FeedError {
    FeedError::Feed(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::feed::Enclosure;
    use quick_xml::Reader;

    const BUILD_TIME: &str = "Mon, 19 Oct 2026 00:00:00 +0000";

    fn archive(title: &str) -> Archive {
        let html = format!("<html><head><title>{title}</title></head><body></body></html>");
        Archive::from_index("http://lists.example.org/pipermail/dev/", &html).unwrap()
    }

    fn item(pub_date: &str) -> FeedItem {
        FeedItem {
            title: Some("[dev 3] a < b & \"c\"".into()),
            author: Some("jane@example.org (Jane <J>)".into()),
            pub_date: pub_date.into(),
            guid: Some("abc123@host".into()),
            link: Some("http://lists.example.org/pipermail/dev/April-2020/000002.html".into()),
            description_html: "line one<br/>line two".into(),
            enclosures: vec![Enclosure {
                url: "http://example.org/x.png?a=1&b=2".into(),
                length: "12345 bytes".into(),
                mime_type: "image/png".into(),
            }],
        }
    }

    /// Walk every event; any syntax error fails the test.
    fn assert_well_formed(xml: &str) {
        let mut reader = Reader::from_str(xml);
        loop {
            match reader.read_event() {
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => panic!("malformed XML at {}: {e}\n{xml}", reader.buffer_position()),
            }
        }
    }

    /// Unescaped text of every element named `name`, in document order.
    fn texts(xml: &str, name: &str) -> Vec<String> {
        let mut reader = Reader::from_str(xml);
        let mut inside = false;
        let mut out = Vec::new();
        loop {
            match reader.read_event().unwrap() {
                Event::Start(e) if e.name().as_ref() == name.as_bytes() => {
                    inside = true;
                    out.push(String::new());
                }
                Event::End(e) if e.name().as_ref() == name.as_bytes() => inside = false,
                Event::Text(t) if inside => {
                    if let Some(last) = out.last_mut() {
                        last.push_str(&t.unescape().unwrap());
                    }
                }
                Event::CData(c) if inside => {
                    if let Some(last) = out.last_mut() {
                        last.push_str(&String::from_utf8_lossy(&c));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }
        out
    }

    #[test]
    fn test_channel_header() {
        let xml = write(&archive("The Dev Archives"), vec![], "ja-JP", BUILD_TIME).unwrap();
        assert_well_formed(&xml);
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("<rss version=\"2.0\">"));
        assert_eq!(texts(&xml, "language"), vec!["ja-JP"]);
        assert_eq!(texts(&xml, "title"), vec!["The Dev Archives"]);
        assert_eq!(texts(&xml, "description"), vec!["The Dev Archives"]);
        assert_eq!(texts(&xml, "link"), vec!["http://lists.example.org/pipermail/dev/"]);
        assert_eq!(texts(&xml, "pubDate"), vec![BUILD_TIME]);
        assert!(!xml.contains("<item>"));
    }

    #[test]
    fn test_channel_pub_date_is_first_item() {
        let items = vec![
            item("Thu, 16 Apr 2020 10:00:00 +0900"),
            item("Wed, 15 Apr 2020 10:00:00 +0900"),
        ];
        let feed = Feed::new(&archive("x"), items, "en", BUILD_TIME);
        assert_eq!(feed.pub_date, "Thu, 16 Apr 2020 10:00:00 +0900");
    }

    #[test]
    fn test_item_fields_are_escaped() {
        let xml = write(
            &archive("x"),
            vec![item("Thu, 16 Apr 2020 10:00:00 +0900")],
            "ja-JP",
            BUILD_TIME,
        )
        .unwrap();
        assert_well_formed(&xml);
        assert!(xml.contains("a &lt; b &amp; &quot;c&quot;"));
        assert!(xml.contains("(Jane &lt;J&gt;)"));
        assert!(xml.contains("<guid isPermaLink=\"false\">abc123@host</guid>"));
        assert!(xml.contains("<![CDATA[line one<br/>line two]]>"));
        assert!(xml.contains("url=\"http://example.org/x.png?a=1&amp;b=2\""));
        assert!(xml.contains("length=\"12345 bytes\""));
        assert!(xml.contains("type=\"image/png\""));

        assert_eq!(texts(&xml, "title")[1], "[dev 3] a < b & \"c\"");
        assert_eq!(texts(&xml, "author"), vec!["jane@example.org (Jane <J>)"]);
    }

    #[test]
    fn test_item_element_order() {
        let xml = write(&archive("x"), vec![item(BUILD_TIME)], "ja-JP", BUILD_TIME).unwrap();
        let item_xml = &xml[xml.find("<item>").unwrap()..];
        let positions: Vec<usize> = [
            "<author>",
            "<pubDate>",
            "<title>",
            "<link>",
            "<guid",
            "<description>",
            "<enclosure",
        ]
        .iter()
        .map(|tag| item_xml.find(tag).unwrap())
        .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_absent_fields_are_omitted() {
        let bare = FeedItem {
            title: None,
            author: None,
            pub_date: BUILD_TIME.into(),
            guid: None,
            link: None,
            description_html: String::new(),
            enclosures: vec![],
        };
        let xml = write(&archive("x"), vec![bare], "ja-JP", BUILD_TIME).unwrap();
        assert_well_formed(&xml);
        let item_xml = &xml[xml.find("<item>").unwrap()..];
        assert!(!item_xml.contains("<author>"));
        assert!(!item_xml.contains("<title>"));
        assert!(!item_xml.contains("<link>"));
        assert!(!item_xml.contains("<guid"));
        assert!(!item_xml.contains("<enclosure"));
        assert!(item_xml.contains("<description>"));
    }

    #[test]
    fn test_untitled_archive_omits_title_and_description() {
        let archive = Archive::from_index("http://x/", "<html></html>").unwrap();
        let xml = write(&archive, vec![], "ja-JP", BUILD_TIME).unwrap();
        assert_well_formed(&xml);
        assert!(texts(&xml, "title").is_empty());
        assert!(texts(&xml, "description").is_empty());
        assert!(!xml.contains("<title>"));
        assert!(!xml.contains("<description>"));
        assert_eq!(texts(&xml, "link"), vec!["http://x/"]);
    }

    #[test]
    fn test_escape_text() {
        assert_eq!(escape_text("a&b<c>d\"e'f"), "a&amp;b&lt;c&gt;d&quot;e'f");
        assert_eq!(escape_text("bell\u{7}tab\t"), "belltab\t");
    }

    #[test]
    fn test_control_chars_removed_from_description() {
        let mut it = item(BUILD_TIME);
        it.description_html = "nul\u{0}here".into();
        let xml = write(&archive("x"), vec![it], "ja-JP", BUILD_TIME).unwrap();
        assert_well_formed(&xml);
        assert!(xml.contains("<![CDATA[nulhere]]>"));
    }
}
