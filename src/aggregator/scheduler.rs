use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::app::Result;
use crate::domain::Feed;
use crate::store::Gateway;

/// Round-robin feed selection.
///
/// The chosen feed is stamped before it is returned, so a feed that fails
/// to fetch goes to the back of the queue like any other.
pub struct Scheduler<G> {
    gateway: Arc<G>,
}

impl<G: Gateway> Scheduler<G> {
    pub fn new(gateway: Arc<G>) -> Self {
        Self { gateway }
    }

    /// `Ok(None)` means no feeds are registered.
    pub fn next_feed(&self) -> Result<Option<Feed>> {
        self.next_feed_at(Utc::now())
    }

    pub fn next_feed_at(&self, now: DateTime<Utc>) -> Result<Option<Feed>> {
        let Some(feed) = self.gateway.select_feed_to_fetch()? else {
            return Ok(None);
        };

        debug!(feed_id = feed.id, first_fetch = feed.never_fetched(), "claiming feed");

        // Single writer: nothing else stamps feeds between select and mark.
        let feed = self.gateway.mark_fetched(feed.id, now)?;
        Ok(Some(feed))
    }
}
