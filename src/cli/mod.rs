pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "gator")]
#[command(about = "A feed aggregator for the terminal", long_about = None)]
pub struct Cli {
    /// Config file to use instead of ~/.config/gator/config.toml
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a user and log in as them
    Register {
        /// Name of the new user
        name: String,
    },
    /// Switch the current user
    Login {
        /// Name of an existing user
        name: String,
    },
    /// List all users
    Users,
    /// Delete every user along with their feeds, follows and posts
    Reset,
    /// Add a feed and follow it
    #[command(name = "addfeed")]
    AddFeed {
        /// Display name of the feed
        name: String,
        /// URL of the feed
        url: String,
    },
    /// List all feeds
    Feeds,
    /// Follow an existing feed
    Follow {
        /// URL of the feed to follow
        url: String,
    },
    /// List the feeds the current user follows
    Following,
    /// Stop following a feed
    Unfollow {
        /// URL of the feed to unfollow
        url: String,
    },
    /// Poll feeds forever, one feed per interval
    Agg {
        /// Time between polls (e.g., "30s", "1m", "1h30m")
        interval: String,
    },
    /// Show the newest posts from followed feeds
    Browse {
        /// Number of posts to show (default: 2)
        limit: Option<String>,
    },
}
