use tracing::warn;

use crate::aggregator::{parse_interval, run_polling_loop};
use crate::app::{AppContext, GatorError, Result};
use crate::cli::Commands;
use crate::domain::Feed;
use crate::store::Store;

pub const DEFAULT_BROWSE_LIMIT: usize = 2;

pub async fn run(ctx: &mut AppContext, command: Commands) -> Result<()> {
    match command {
        Commands::Register { name } => register(ctx, &name),
        Commands::Login { name } => login(ctx, &name),
        Commands::Users => list_users(ctx),
        Commands::Reset => reset(ctx),
        Commands::AddFeed { name, url } => add_feed(ctx, &name, &url),
        Commands::Feeds => list_feeds(ctx),
        Commands::Follow { url } => follow(ctx, &url),
        Commands::Following => following(ctx),
        Commands::Unfollow { url } => unfollow(ctx, &url),
        Commands::Agg { interval } => aggregate(ctx, &interval).await,
        Commands::Browse { limit } => browse(ctx, limit.as_deref()),
    }
}

pub fn register(ctx: &mut AppContext, name: &str) -> Result<()> {
    let user = ctx.store.create_user(name)?;
    ctx.config.set_user(&user.name)?;
    println!("User {} created", user.name);
    Ok(())
}

pub fn login(ctx: &mut AppContext, name: &str) -> Result<()> {
    let user = ctx
        .store
        .get_user(name)?
        .ok_or_else(|| GatorError::UserNotFound(name.to_string()))?;

    ctx.config.set_user(&user.name)?;
    println!("User successfully set to {}", user.name);
    Ok(())
}

pub fn list_users(ctx: &AppContext) -> Result<()> {
    let current = ctx.config.current_user_name.as_deref();

    for user in ctx.store.get_users()? {
        if current == Some(user.name.as_str()) {
            println!("* {} (current)", user.name);
        } else {
            println!("* {}", user.name);
        }
    }

    Ok(())
}

pub fn reset(ctx: &AppContext) -> Result<()> {
    let removed = ctx.store.delete_all_users()?;
    println!("users cleared ({} removed)", removed);
    Ok(())
}

pub fn add_feed(ctx: &AppContext, name: &str, url: &str) -> Result<()> {
    let user = ctx.current_user()?;
    url::Url::parse(url)?;

    let feed = ctx
        .store
        .create_feed(&Feed::new(name.to_string(), url.to_string(), user.id))?;
    ctx.store.create_feed_follow(user.id, feed.id)?;

    println!("Name: {}", feed.name);
    println!("URL: {}", feed.url);
    println!("User: {}", user.name);
    Ok(())
}

pub fn list_feeds(ctx: &AppContext) -> Result<()> {
    let feeds = ctx.store.get_feeds_with_owner()?;

    if feeds.is_empty() {
        println!("No feeds");
        return Ok(());
    }

    for entry in feeds {
        println!("Name: {}", entry.feed.display_title());
        println!("URL: {}", entry.feed.url);
        println!("User: {}", entry.user_name);
        println!();
    }

    Ok(())
}

pub fn follow(ctx: &AppContext, url: &str) -> Result<()> {
    let user = ctx.current_user()?;
    let feed = ctx
        .store
        .get_feed_by_url(url)?
        .ok_or_else(|| GatorError::FeedNotFound(url.to_string()))?;

    let follow = ctx.store.create_feed_follow(user.id, feed.id)?;
    println!("Feed: {}", follow.feed_name);
    println!("User: {}", follow.user_name);
    Ok(())
}

pub fn following(ctx: &AppContext) -> Result<()> {
    let user = ctx.current_user()?;

    for follow in ctx.store.get_follows_for_user(user.id)? {
        println!("- '{}'", follow.feed_name);
    }

    Ok(())
}

pub fn unfollow(ctx: &AppContext, url: &str) -> Result<()> {
    let user = ctx.current_user()?;
    let feed = ctx
        .store
        .get_feed_by_url(url)?
        .ok_or_else(|| GatorError::FeedNotFound(url.to_string()))?;

    if ctx.store.delete_feed_follow(user.id, feed.id)? {
        println!("Unfollowed {}", feed.display_title());
    } else {
        println!("Not following {}", feed.display_title());
    }
    Ok(())
}

pub fn browse(ctx: &AppContext, limit: Option<&str>) -> Result<()> {
    let user = ctx.current_user()?;
    let limit = parse_limit(limit);

    for post in ctx.store.get_posts_for_user(user.id, limit)? {
        let date = post
            .published_at
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "          ".to_string());
        println!("{} {}", date, post.display_title());
        if let Some(url) = post.url {
            println!("           {}", url);
        }
    }

    Ok(())
}

/// Runs until the process receives Ctrl-C or SIGTERM.
pub async fn aggregate(ctx: &AppContext, interval: &str) -> Result<()> {
    let every = parse_interval(interval)?;
    run_polling_loop(ctx.store.clone(), ctx.source.clone(), every, shutdown_signal()).await;
    Ok(())
}

fn parse_limit(limit: Option<&str>) -> usize {
    limit
        .and_then(|s| s.trim().parse::<usize>().ok())
        .unwrap_or(DEFAULT_BROWSE_LIMIT)
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = sigterm.recv() => {},
                    _ = tokio::signal::ctrl_c() => {},
                }
                return;
            }
            Err(e) => warn!(error = %e, "Failed to set up SIGTERM handler"),
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to set up Ctrl-C handler; polling until killed");
        std::future::pending::<()>().await;
    }
}
