pub mod feed;
pub mod post;
pub mod user;

pub use feed::{Feed, FeedFollow, FeedWithOwner};
pub use post::{NewPost, ParsedEntry, ParsedFeed, Post};
pub use user::User;
