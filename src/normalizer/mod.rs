//! Syndication document decoding.
//!
//! RSS channels are read with the `rss` crate so each entry keeps its raw
//! `<pubDate>` text. Documents whose root is not `<rss>` are handed to
//! `feed-rs`, which covers Atom; their dates are rendered back into
//! [`PUB_DATE_FORMAT`] so downstream code sees one shape.

use feed_rs::parser;
use html_escape::decode_html_entities;
use rss::Channel;

use crate::app::{GatorError, Result};
use crate::domain::{ParsedEntry, ParsedFeed};

/// RFC 1123 with a numeric zone, e.g. `Mon, 02 Jan 2006 15:04:05 -0700`.
pub const PUB_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S %z";

/// [`PUB_DATE_FORMAT`] after the `"Mon, "` weekday prefix.
pub const PUB_DATE_BODY_FORMAT: &str = "%d %b %Y %H:%M:%S %z";

#[derive(Clone, Default)]
pub struct Normalizer;

impl Normalizer {
    pub fn new() -> Self {
        Self
    }

    pub fn normalize(&self, body: &[u8]) -> Result<ParsedFeed> {
        match Channel::read_from(body) {
            Ok(channel) => Ok(from_channel(channel)),
            Err(rss::Error::InvalidStartTag) => self.normalize_atom(body),
            Err(e) => Err(GatorError::FeedParse(e.to_string())),
        }
    }

    fn normalize_atom(&self, body: &[u8]) -> Result<ParsedFeed> {
        let feed = parser::parse(body).map_err(|e| GatorError::FeedParse(e.to_string()))?;

        let entries = feed
            .entries
            .into_iter()
            .map(|entry| ParsedEntry {
                title: entry
                    .title
                    .map(|t| decode(&t.content))
                    .unwrap_or_default(),
                link: non_empty(entry.links.first().map(|l| l.href.as_str())),
                description: non_empty(entry.summary.as_ref().map(|s| s.content.as_str()))
                    .map(|s| decode(&s)),
                pub_date: entry
                    .published
                    .or(entry.updated)
                    .map(|dt| dt.format(PUB_DATE_FORMAT).to_string()),
            })
            .collect();

        Ok(ParsedFeed {
            title: feed.title.map(|t| decode(&t.content)).unwrap_or_default(),
            link: feed.links.first().map(|l| l.href.clone()).unwrap_or_default(),
            description: feed
                .description
                .map(|d| decode(&d.content))
                .unwrap_or_default(),
            entries,
        })
    }
}

fn from_channel(channel: Channel) -> ParsedFeed {
    let entries = channel
        .items()
        .iter()
        .map(|item| ParsedEntry {
            title: item.title().map(decode).unwrap_or_default(),
            link: non_empty(item.link()),
            description: non_empty(item.description()).map(|d| decode(&d)),
            pub_date: non_empty(item.pub_date()),
        })
        .collect();

    ParsedFeed {
        title: decode(channel.title()),
        link: channel.link().to_string(),
        description: decode(channel.description()),
        entries,
    }
}

// Feeds routinely escape markup twice; the XML reader only removes one layer.
fn decode(s: &str) -> String {
    decode_html_entities(s).to_string()
}

fn non_empty(s: Option<&str>) -> Option<String> {
    s.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}
