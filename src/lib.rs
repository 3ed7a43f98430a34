//! # gator
//!
//! A personal feed aggregator: users follow RSS/Atom feeds and a
//! long-running `agg` process polls them, storing new posts in SQLite.
//!
//! ## Architecture
//!
//! ```text
//! Scheduler → FeedSource (fetch + Normalizer) → Ingestor → Store
//! ```
//!
//! - [`aggregator`]: the polling engine (scheduler, ingestion, loop)
//! - [`fetcher`]: HTTP retrieval of feed documents
//! - [`normalizer`]: RSS/Atom decoding into [`ParsedFeed`](domain::ParsedFeed)
//! - [`store`]: SQLite persistence
//!
//! ## Quick Start
//!
//! ```bash
//! gator register alice
//! gator addfeed "Rust Blog" https://blog.rust-lang.org/feed.xml
//! gator agg 1m
//! gator browse 10
//! ```

/// Feed polling: round-robin scheduling, ingestion and the tick loop.
///
/// - [`Scheduler`](aggregator::Scheduler): picks and claims the next feed
/// - [`Ingestor`](aggregator::Ingestor): stores entries, absorbing duplicates
/// - [`Poller`](aggregator::Poller): one feed per timer tick
pub mod aggregator;

/// Application context and error handling.
pub mod app;

/// Command-line interface using clap.
pub mod cli;

/// Configuration file handling (`~/.config/gator/config.toml`).
pub mod config;

/// Core domain models.
///
/// - [`Feed`](domain::Feed), [`FeedFollow`](domain::FeedFollow), [`User`](domain::User)
/// - [`Post`](domain::Post): a stored entry, unique by URL
/// - [`ParsedEntry`](domain::ParsedEntry): an entry straight from a feed document
pub mod domain;

/// Feed retrieval.
///
/// - [`FeedSource`](fetcher::FeedSource): async trait for fetching and decoding a feed
/// - [`HttpSource`](fetcher::HttpSource): reqwest-based implementation
pub mod fetcher;

/// Feed document decoding.
pub mod normalizer;

/// SQLite persistence layer.
///
/// - [`Gateway`](store::Gateway): what the polling engine needs
/// - [`Store`](store::Store): user, feed and follow bookkeeping for the CLI
/// - [`SqliteStore`](store::SqliteStore): SQLite implementation of both
pub mod store;
