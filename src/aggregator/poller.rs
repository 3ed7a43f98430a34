use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::aggregator::ingest::{IngestReport, Ingestor};
use crate::aggregator::interval::format_interval;
use crate::aggregator::scheduler::Scheduler;
use crate::app::{GatorError, Result};
use crate::domain::Feed;
use crate::fetcher::FeedSource;
use crate::store::Gateway;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    /// Waiting for the next tick.
    Idle,
    /// Fetching and ingesting a single feed.
    Fetching { feed_id: i64 },
}

#[derive(Debug, Clone)]
pub struct TickReport {
    pub feed: Feed,
    pub ingest: IngestReport,
}

/// Drives scheduler → source → ingestor, one feed per tick.
pub struct Poller<G> {
    scheduler: Scheduler<G>,
    ingestor: Ingestor<G>,
    source: Arc<dyn FeedSource + Send + Sync>,
    state: PollState,
}

impl<G: Gateway> Poller<G> {
    pub fn new(gateway: Arc<G>, source: Arc<dyn FeedSource + Send + Sync>) -> Self {
        Self {
            scheduler: Scheduler::new(gateway.clone()),
            ingestor: Ingestor::new(gateway),
            source,
            state: PollState::Idle,
        }
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    /// Processes exactly one feed.
    ///
    /// An empty feed set fails the tick with [`GatorError::NoFeeds`], while
    /// per-entry storage failures only show up in the report.
    pub async fn tick(&mut self) -> Result<TickReport> {
        let feed = self.scheduler.next_feed()?.ok_or(GatorError::NoFeeds)?;
        info!(feed_id = feed.id, name = %feed.name, url = %feed.url, "Fetching items for feed");

        self.state = PollState::Fetching { feed_id: feed.id };
        let result = self.fetch_and_ingest(feed).await;
        self.state = PollState::Idle;

        result
    }

    async fn fetch_and_ingest(&self, feed: Feed) -> Result<TickReport> {
        let parsed = self.source.fetch(&feed.url).await?;
        let ingest = self.ingestor.ingest(feed.id, parsed.entries);

        Ok(TickReport { feed, ingest })
    }

    /// Ticks every `every`, starting immediately, until `shutdown` resolves.
    ///
    /// Shutdown is only observed between ticks; a tick in progress always
    /// runs to completion.
    pub async fn run<F>(&mut self, every: Duration, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        info!("Collecting feeds every {}", format_interval(every));

        let mut timer = interval(every);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = timer.tick() => {}
            }

            match self.tick().await {
                Ok(report) => log_success(&report),
                Err(e) => log_failure(&e),
            }
        }

        drop(timer);
        info!("Polling loop stopped");
    }
}

fn log_success(report: &TickReport) {
    let IngestReport {
        inserted,
        duplicates,
        failed,
        undated,
    } = report.ingest;
    info!(
        feed = %report.feed.display_title(),
        inserted,
        duplicates,
        failed,
        undated,
        "Feed ingested"
    );
}

fn log_failure(err: &GatorError) {
    match err {
        GatorError::NoFeeds => warn!("No feeds to fetch; add one with `gator addfeed <name> <url>`"),
        e if e.is_transient_fetch() => warn!(error = %e, "Failed fetching feed"),
        e if e.is_feed_parse() => warn!(error = %e, "Failed parsing feed"),
        e => error!(error = %e, "Failed scraping feed"),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::{DateTime, Utc};

    use super::*;
    use crate::domain::{NewPost, ParsedEntry, ParsedFeed};
    use crate::store::{InsertOutcome, SqliteStore, Store};

    /// Delegates to SQLite while counting every gateway call.
    struct CountingGateway {
        inner: SqliteStore,
        selects: AtomicUsize,
        marks: AtomicUsize,
        inserts: AtomicUsize,
    }

    impl CountingGateway {
        fn new() -> Self {
            Self {
                inner: SqliteStore::in_memory().unwrap(),
                selects: AtomicUsize::new(0),
                marks: AtomicUsize::new(0),
                inserts: AtomicUsize::new(0),
            }
        }
    }

    impl Gateway for CountingGateway {
        fn select_feed_to_fetch(&self) -> Result<Option<Feed>> {
            self.selects.fetch_add(1, Ordering::SeqCst);
            self.inner.select_feed_to_fetch()
        }

        fn mark_fetched(&self, feed_id: i64, at: DateTime<Utc>) -> Result<Feed> {
            self.marks.fetch_add(1, Ordering::SeqCst);
            self.inner.mark_fetched(feed_id, at)
        }

        fn insert_post(&self, post: &NewPost) -> InsertOutcome {
            self.inserts.fetch_add(1, Ordering::SeqCst);
            self.inner.insert_post(post)
        }
    }

    /// Replays queued results and records requested URLs.
    #[derive(Default)]
    struct ScriptedSource {
        responses: Mutex<VecDeque<Result<ParsedFeed>>>,
        requested: Mutex<Vec<String>>,
    }

    impl ScriptedSource {
        fn push(&self, response: Result<ParsedFeed>) {
            self.responses.lock().unwrap().push_back(response);
        }
    }

    #[async_trait]
    impl FeedSource for ScriptedSource {
        async fn fetch(&self, url: &str) -> Result<ParsedFeed> {
            self.requested.lock().unwrap().push(url.to_string());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(GatorError::FeedParse("no scripted response".into())))
        }
    }

    fn feed_of(links: &[&str]) -> ParsedFeed {
        ParsedFeed {
            entries: links
                .iter()
                .map(|link| ParsedEntry {
                    title: format!("title {link}"),
                    link: Some(link.to_string()),
                    description: None,
                    pub_date: Some("Mon, 01 Jan 2024 10:00:00 +0000".into()),
                })
                .collect(),
            ..Default::default()
        }
    }

    fn setup() -> (Arc<CountingGateway>, Arc<ScriptedSource>, Poller<CountingGateway>) {
        let gateway = Arc::new(CountingGateway::new());
        let source = Arc::new(ScriptedSource::default());
        let poller = Poller::new(gateway.clone(), source.clone());
        (gateway, source, poller)
    }

    fn add_feed(gateway: &CountingGateway, name: &str) -> Feed {
        let user = match gateway.inner.get_user("alice").unwrap() {
            Some(user) => user,
            None => gateway.inner.create_user("alice").unwrap(),
        };
        gateway
            .inner
            .create_feed(&Feed::new(
                name.into(),
                format!("https://example.com/{name}.xml"),
                user.id,
            ))
            .unwrap()
    }

    #[tokio::test]
    async fn test_empty_feed_set_touches_nothing_else() {
        let (gateway, source, mut poller) = setup();

        let err = poller.tick().await.unwrap_err();

        assert!(matches!(err, GatorError::NoFeeds));
        assert_eq!(gateway.selects.load(Ordering::SeqCst), 1);
        assert_eq!(gateway.marks.load(Ordering::SeqCst), 0);
        assert_eq!(gateway.inserts.load(Ordering::SeqCst), 0);
        assert!(source.requested.lock().unwrap().is_empty());
        assert_eq!(poller.state(), PollState::Idle);
    }

    #[tokio::test]
    async fn test_tick_ingests_one_feed() {
        let (gateway, source, mut poller) = setup();
        let feed = add_feed(&gateway, "blog");
        source.push(Ok(feed_of(&["u1", "u2"])));

        let report = poller.tick().await.unwrap();

        assert_eq!(report.feed.id, feed.id);
        assert!(report.feed.last_fetched_at.is_some());
        assert_eq!(report.ingest.inserted, 2);
        assert_eq!(
            source.requested.lock().unwrap().as_slice(),
            ["https://example.com/blog.xml"]
        );
        assert_eq!(poller.state(), PollState::Idle);
    }

    #[tokio::test]
    async fn test_failed_fetch_still_stamps_feed() {
        let (gateway, source, mut poller) = setup();
        let broken = add_feed(&gateway, "broken");
        let healthy = add_feed(&gateway, "healthy");
        source.push(Err(GatorError::HttpStatus {
            url: broken.url.clone(),
            status: 500,
        }));
        source.push(Ok(feed_of(&["u1"])));

        let err = poller.tick().await.unwrap_err();
        assert!(err.is_transient_fetch());
        assert_eq!(gateway.inserts.load(Ordering::SeqCst), 0);

        // The broken feed was stamped, so the next tick moves on.
        let report = poller.tick().await.unwrap();
        assert_eq!(report.feed.id, healthy.id);
        assert_eq!(report.ingest.inserted, 1);
    }

    #[tokio::test]
    async fn test_duplicates_across_ticks() {
        let (gateway, source, mut poller) = setup();
        let feed = add_feed(&gateway, "blog");
        source.push(Ok(feed_of(&["u1", "u2"])));
        source.push(Ok(feed_of(&["u1", "u2", "u3", "u4"])));

        poller.tick().await.unwrap();
        let report = poller.tick().await.unwrap();

        assert_eq!(report.ingest.inserted, 2);
        assert_eq!(report.ingest.duplicates, 2);
        assert_eq!(gateway.inner.get_posts_by_feed(feed.id).unwrap().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_ticks_until_shutdown() {
        let (gateway, source, mut poller) = setup();
        add_feed(&gateway, "blog");
        for _ in 0..10 {
            source.push(Ok(feed_of(&[])));
        }

        // Ticks at 0, 60s and 120s, then shutdown at 150s.
        poller
            .run(
                Duration::from_secs(60),
                tokio::time::sleep(Duration::from_secs(150)),
            )
            .await;

        assert_eq!(source.requested.lock().unwrap().len(), 3);
        assert_eq!(gateway.marks.load(Ordering::SeqCst), 3);
        assert_eq!(poller.state(), PollState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_survives_failing_ticks() {
        let (gateway, source, mut poller) = setup();

        // Two ticks with no feeds, then a feed appears.
        let late = {
            let gateway = gateway.clone();
            async move {
                tokio::time::sleep(Duration::from_secs(90)).await;
                add_feed(&gateway, "late");
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
        };
        source.push(Ok(feed_of(&["u1"])));

        poller.run(Duration::from_secs(60), late).await;

        assert_eq!(gateway.selects.load(Ordering::SeqCst), 3);
        assert_eq!(gateway.inserts.load(Ordering::SeqCst), 1);
    }
}
