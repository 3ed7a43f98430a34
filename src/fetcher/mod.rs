pub mod http_fetcher;

use async_trait::async_trait;

use crate::app::Result;
use crate::domain::ParsedFeed;

pub use http_fetcher::HttpSource;

/// Retrieves a feed document and decodes it into entries.
///
/// Either the whole document is returned or an error; never a partial feed.
#[async_trait]
pub trait FeedSource {
    async fn fetch(&self, url: &str) -> Result<ParsedFeed>;
}
