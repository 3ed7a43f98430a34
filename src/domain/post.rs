use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub feed_id: i64,
    pub title: String,
    /// Unique across all posts when present.
    pub url: Option<String>,
    pub description: Option<String>,
    /// Absent when the source date did not parse.
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            "(Untitled)"
        } else {
            &self.title
        }
    }
}

/// Insert parameters for a post.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPost {
    pub feed_id: i64,
    pub title: String,
    pub url: Option<String>,
    pub description: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

/// One entry as decoded from a syndication document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedEntry {
    pub title: String,
    pub link: Option<String>,
    pub description: Option<String>,
    /// Publication date exactly as the document supplied it.
    pub pub_date: Option<String>,
}

/// A decoded syndication document: channel metadata plus entries in source order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedFeed {
    pub title: String,
    pub link: String,
    pub description: String,
    pub entries: Vec<ParsedEntry>,
}
