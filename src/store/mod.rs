pub mod sqlite;

use chrono::{DateTime, Utc};

use crate::app::{GatorError, Result};
use crate::domain::{Feed, FeedFollow, FeedWithOwner, NewPost, Post, User};

pub use sqlite::SqliteStore;

/// Result of inserting a post keyed by its URL.
#[derive(Debug)]
pub enum InsertOutcome {
    Inserted(Post),
    /// A post with the same URL is already stored.
    AlreadyExists,
    Failed(GatorError),
}

/// The operations the polling core needs from persistent storage.
pub trait Gateway {
    /// Never-fetched feeds first (oldest created first), then the feed with
    /// the oldest `last_fetched_at`. `None` when no feeds exist.
    fn select_feed_to_fetch(&self) -> Result<Option<Feed>>;

    /// Unconditionally stamps `last_fetched_at` and returns the updated feed.
    /// The stamp is stored, and returned, at microsecond precision.
    fn mark_fetched(&self, feed_id: i64, at: DateTime<Utc>) -> Result<Feed>;

    fn insert_post(&self, post: &NewPost) -> InsertOutcome;
}

/// Bookkeeping used by the command-line handlers.
pub trait Store {
    // User operations
    fn create_user(&self, name: &str) -> Result<User>;
    fn get_user(&self, name: &str) -> Result<Option<User>>;
    fn get_users(&self) -> Result<Vec<User>>;
    fn delete_all_users(&self) -> Result<usize>;

    // Feed operations
    fn create_feed(&self, feed: &Feed) -> Result<Feed>;
    fn get_feed_by_url(&self, url: &str) -> Result<Option<Feed>>;
    fn get_feeds_with_owner(&self) -> Result<Vec<FeedWithOwner>>;

    // Follow operations
    fn create_feed_follow(&self, user_id: i64, feed_id: i64) -> Result<FeedFollow>;
    fn get_follows_for_user(&self, user_id: i64) -> Result<Vec<FeedFollow>>;
    fn delete_feed_follow(&self, user_id: i64, feed_id: i64) -> Result<bool>;

    // Post operations
    fn get_posts_for_user(&self, user_id: i64, limit: usize) -> Result<Vec<Post>>;
    fn get_posts_by_feed(&self, feed_id: i64) -> Result<Vec<Post>>;
}
