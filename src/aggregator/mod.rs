//! The feed-polling engine.
//!
//! ```text
//! timer tick → Scheduler → FeedSource → Ingestor → Gateway
//! ```
//!
//! One feed is processed per tick, so with `N` feeds and a tick interval
//! `T` every feed is refreshed roughly every `N × T`.

pub mod ingest;
pub mod interval;
pub mod poller;
pub mod scheduler;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::fetcher::FeedSource;
use crate::store::Gateway;

pub use ingest::{parse_pub_date, IngestReport, Ingestor};
pub use interval::{format_interval, parse_interval};
pub use poller::{PollState, Poller, TickReport};
pub use scheduler::Scheduler;

/// Polls one feed every `every` until `shutdown` resolves.
pub async fn run_polling_loop<G, F>(
    gateway: Arc<G>,
    source: Arc<dyn FeedSource + Send + Sync>,
    every: Duration,
    shutdown: F,
) where
    G: Gateway,
    F: Future<Output = ()>,
{
    Poller::new(gateway, source).run(every, shutdown).await
}
