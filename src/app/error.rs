use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatorError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Feed parsing error: {0}")]
    FeedParse(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No feeds registered")]
    NoFeeds,

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Feed already exists: {0}")]
    FeedExists(String),

    #[error("Feed not found: {0}")]
    FeedNotFound(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("User already exists: {0}")]
    UserExists(String),

    #[error("Already following {0}")]
    AlreadyFollowing(String),

    #[error("Not logged in; run `gator register <name>` or `gator login <name>` first")]
    NotLoggedIn,

    #[error("Invalid interval: {0}")]
    InvalidInterval(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    ConfigFile(#[from] crate::config::ConfigError),
}

impl GatorError {
    /// Network failures, timeouts and non-success responses. The next tick
    /// is the only retry.
    pub fn is_transient_fetch(&self) -> bool {
        matches!(self, GatorError::Http(_) | GatorError::HttpStatus { .. })
    }

    pub fn is_feed_parse(&self) -> bool {
        matches!(self, GatorError::FeedParse(_))
    }
}

pub type Result<T> = std::result::Result<T, GatorError>;
