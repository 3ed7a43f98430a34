use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, warn};

use crate::domain::{NewPost, ParsedEntry};
use crate::normalizer::PUB_DATE_BODY_FORMAT;
use crate::store::{Gateway, InsertOutcome};

/// Per-batch counters. `undated` overlaps the others: an undated entry is
/// still inserted, skipped or failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub inserted: usize,
    pub duplicates: usize,
    pub failed: usize,
    pub undated: usize,
}

const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// Parses a raw publication date against
/// [`PUB_DATE_FORMAT`](crate::normalizer::PUB_DATE_FORMAT).
///
/// The weekday must be a valid abbreviation but is not checked against the
/// date; feeds get it wrong often enough.
pub fn parse_pub_date(raw: &str) -> Option<DateTime<Utc>> {
    let (weekday, rest) = raw.trim().split_once(", ")?;
    if !WEEKDAYS.contains(&weekday) {
        return None;
    }

    DateTime::parse_from_str(rest, PUB_DATE_BODY_FORMAT)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

/// Turns parsed entries into stored posts, one at a time and in source order.
pub struct Ingestor<G> {
    gateway: Arc<G>,
}

impl<G: Gateway> Ingestor<G> {
    pub fn new(gateway: Arc<G>) -> Self {
        Self { gateway }
    }

    /// Best effort: a failing entry never stops the rest of the batch.
    pub fn ingest(&self, feed_id: i64, entries: Vec<ParsedEntry>) -> IngestReport {
        let mut report = IngestReport::default();

        for entry in entries {
            let published_at = entry.pub_date.as_deref().and_then(parse_pub_date);
            if published_at.is_none() {
                report.undated += 1;
                warn!(
                    title = %entry.title,
                    raw = entry.pub_date.as_deref().unwrap_or(""),
                    "failed parsing publication date, storing post without it"
                );
            }

            let post = NewPost {
                feed_id,
                title: entry.title,
                url: entry.link,
                description: entry.description,
                published_at,
            };

            match self.gateway.insert_post(&post) {
                InsertOutcome::Inserted(_) => report.inserted += 1,
                InsertOutcome::AlreadyExists => {
                    report.duplicates += 1;
                    debug!(url = post.url.as_deref().unwrap_or(""), "post already stored");
                }
                InsertOutcome::Failed(e) => {
                    report.failed += 1;
                    error!(title = %post.title, error = %e, "failed creating post");
                }
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::TimeZone;

    use super::*;
    use crate::app::{GatorError, Result};
    use crate::domain::{Feed, Post};

    /// Accepts posts in memory, rejecting repeated URLs and titles listed in `fail_titles`.
    #[derive(Default)]
    struct MemoryGateway {
        posts: Mutex<Vec<NewPost>>,
        fail_titles: Vec<String>,
    }

    impl Gateway for MemoryGateway {
        fn select_feed_to_fetch(&self) -> Result<Option<Feed>> {
            Ok(None)
        }

        fn mark_fetched(&self, feed_id: i64, _at: DateTime<Utc>) -> Result<Feed> {
            Err(GatorError::FeedNotFound(feed_id.to_string()))
        }

        fn insert_post(&self, post: &NewPost) -> InsertOutcome {
            if self.fail_titles.contains(&post.title) {
                return InsertOutcome::Failed(GatorError::Config("disk full".into()));
            }
            let mut posts = self.posts.lock().unwrap();
            if post.url.is_some() && posts.iter().any(|p| p.url == post.url) {
                return InsertOutcome::AlreadyExists;
            }
            posts.push(post.clone());
            let now = Utc::now();
            InsertOutcome::Inserted(Post {
                id: posts.len() as i64,
                feed_id: post.feed_id,
                title: post.title.clone(),
                url: post.url.clone(),
                description: post.description.clone(),
                published_at: post.published_at,
                created_at: now,
                updated_at: now,
            })
        }
    }

    fn entry(title: &str, link: &str, pub_date: Option<&str>) -> ParsedEntry {
        ParsedEntry {
            title: title.into(),
            link: Some(link.into()),
            description: None,
            pub_date: pub_date.map(String::from),
        }
    }

    #[test]
    fn test_parse_pub_date() {
        let parsed = parse_pub_date("Mon, 02 Jan 2006 15:04:05 -0700").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2006, 1, 2, 22, 4, 5).unwrap());
    }

    #[test]
    fn test_parse_pub_date_ignores_wrong_weekday() {
        // 2 Jan 2024 was a Tuesday.
        let parsed = parse_pub_date("Mon, 02 Jan 2024 09:30:00 +0000").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 1, 2, 9, 30, 0).unwrap());
    }

    #[test]
    fn test_parse_pub_date_rejects_other_layouts() {
        assert!(parse_pub_date("Xyz, 02 Jan 2024 09:30:00 +0000").is_none());
        assert!(parse_pub_date("Monday, 02 Jan 2024 09:30:00 +0000").is_none());
        assert!(parse_pub_date("02 Jan 2024 09:30:00 +0000").is_none());
        assert!(parse_pub_date("not-a-date").is_none());
        assert!(parse_pub_date("2006-01-02T15:04:05Z").is_none());
        assert!(parse_pub_date("Mon, 02 Jan 2006 15:04:05 GMT").is_none());
        assert!(parse_pub_date("").is_none());
    }

    #[test]
    fn test_unparseable_date_still_stored() {
        let gateway = Arc::new(MemoryGateway::default());
        let ingestor = Ingestor::new(gateway.clone());

        let report = ingestor.ingest(1, vec![entry("X", "u1", Some("not-a-date"))]);

        assert_eq!(report.inserted, 1);
        assert_eq!(report.undated, 1);
        let posts = gateway.posts.lock().unwrap();
        assert_eq!(posts[0].title, "X");
        assert_eq!(posts[0].url.as_deref(), Some("u1"));
        assert_eq!(posts[0].published_at, None);
    }

    #[test]
    fn test_same_entry_twice_is_stored_once() {
        let gateway = Arc::new(MemoryGateway::default());
        let ingestor = Ingestor::new(gateway.clone());
        let e = entry("X", "u1", Some("Mon, 02 Jan 2006 15:04:05 -0700"));

        let first = ingestor.ingest(1, vec![e.clone()]);
        let second = ingestor.ingest(1, vec![e]);

        assert_eq!(first.inserted, 1);
        assert_eq!(second.inserted, 0);
        assert_eq!(second.duplicates, 1);
        assert_eq!(second.failed, 0);
        assert_eq!(gateway.posts.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_failure_does_not_abort_batch() {
        let gateway = Arc::new(MemoryGateway {
            fail_titles: vec!["bad".into()],
            ..Default::default()
        });
        let ingestor = Ingestor::new(gateway.clone());

        let report = ingestor.ingest(
            1,
            vec![
                entry("a", "u1", None),
                entry("bad", "u2", None),
                entry("a-again", "u1", None),
                entry("c", "u3", None),
            ],
        );

        assert_eq!(
            report,
            IngestReport {
                inserted: 2,
                duplicates: 1,
                failed: 1,
                undated: 4,
            }
        );
        let titles: Vec<String> = gateway
            .posts
            .lock()
            .unwrap()
            .iter()
            .map(|p| p.title.clone())
            .collect();
        assert_eq!(titles, vec!["a", "c"]);
    }
}
