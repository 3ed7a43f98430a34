use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use rusqlite_migration::{Migrations, M};
use tracing::warn;

use crate::app::{GatorError, Result};
use crate::domain::{Feed, FeedFollow, FeedWithOwner, NewPost, Post, User};
use crate::store::{Gateway, InsertOutcome, Store};

const FEED_COLUMNS: &str =
    "f.id, f.name, f.url, f.user_id, f.last_fetched_at, f.created_at, f.updated_at";
const POST_COLUMNS: &str =
    "p.id, p.feed_id, p.title, p.url, p.description, p.published_at, p.created_at, p.updated_at";
const FOLLOW_SELECT: &str = "SELECT ff.id, ff.user_id, ff.feed_id, f.name, u.name, ff.created_at
     FROM feed_follows ff
     JOIN feeds f ON f.id = ff.feed_id
     JOIN users u ON u.id = ff.user_id";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        let migrations = Migrations::new(vec![M::up(include_str!(
            "../../migrations/001-initial/up.sql"
        ))]);

        let mut conn = self.lock()?;

        conn.execute_batch("PRAGMA foreign_keys = ON")?;
        migrations
            .to_latest(&mut conn)
            .map_err(|e| GatorError::Migration(e.to_string()))?;

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| {
            GatorError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(1),
                Some(e.to_string()),
            ))
        })
    }

    fn try_insert_post(&self, post: &NewPost) -> Result<Post> {
        let conn = self.lock()?;
        let now = now_micros();

        conn.execute(
            "INSERT INTO posts (feed_id, title, url, description, published_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            params![
                post.feed_id,
                post.title,
                post.url,
                post.description,
                post.published_at.as_ref().map(format_datetime),
                format_datetime(&now)
            ],
        )?;

        Ok(Post {
            id: conn.last_insert_rowid(),
            feed_id: post.feed_id,
            title: post.title.clone(),
            url: post.url.clone(),
            description: post.description.clone(),
            published_at: post.published_at,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Current time at the precision timestamps are stored with.
fn now_micros() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Fixed width keeps textual order equal to chronological order in SQL.
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

fn datetime_at(row: &Row<'_>, idx: usize) -> DateTime<Utc> {
    let raw = row.get::<_, String>(idx).ok();
    match raw.as_deref().and_then(parse_datetime) {
        Some(dt) => dt,
        None => {
            warn!(column = idx, raw = raw.as_deref().unwrap_or(""), "unreadable timestamp, using now");
            now_micros()
        }
    }
}

fn optional_datetime_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    Ok(row
        .get::<_, Option<String>>(idx)?
        .and_then(|s| parse_datetime(&s)))
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        created_at: datetime_at(row, 2),
        updated_at: datetime_at(row, 3),
    })
}

fn feed_from_row(row: &Row<'_>) -> rusqlite::Result<Feed> {
    Ok(Feed {
        id: row.get(0)?,
        name: row.get(1)?,
        url: row.get(2)?,
        user_id: row.get(3)?,
        last_fetched_at: optional_datetime_at(row, 4)?,
        created_at: datetime_at(row, 5),
        updated_at: datetime_at(row, 6),
    })
}

fn post_from_row(row: &Row<'_>) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get(0)?,
        feed_id: row.get(1)?,
        title: row.get(2)?,
        url: row.get(3)?,
        description: row.get(4)?,
        published_at: optional_datetime_at(row, 5)?,
        created_at: datetime_at(row, 6),
        updated_at: datetime_at(row, 7),
    })
}

fn follow_from_row(row: &Row<'_>) -> rusqlite::Result<FeedFollow> {
    Ok(FeedFollow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        feed_id: row.get(2)?,
        feed_name: row.get(3)?,
        user_name: row.get(4)?,
        created_at: datetime_at(row, 5),
    })
}

impl Gateway for SqliteStore {
    fn select_feed_to_fetch(&self) -> Result<Option<Feed>> {
        let conn = self.lock()?;

        let feed = conn
            .query_row(
                &format!(
                    "SELECT {FEED_COLUMNS} FROM feeds f
                     ORDER BY f.last_fetched_at IS NOT NULL, f.last_fetched_at ASC,
                              f.created_at ASC, f.id ASC
                     LIMIT 1"
                ),
                [],
                feed_from_row,
            )
            .optional()?;

        Ok(feed)
    }

    fn mark_fetched(&self, feed_id: i64, at: DateTime<Utc>) -> Result<Feed> {
        let conn = self.lock()?;

        let updated = conn.execute(
            "UPDATE feeds SET last_fetched_at = ?1, updated_at = ?1 WHERE id = ?2",
            params![format_datetime(&at), feed_id],
        )?;
        if updated == 0 {
            return Err(GatorError::FeedNotFound(feed_id.to_string()));
        }

        let feed = conn.query_row(
            &format!("SELECT {FEED_COLUMNS} FROM feeds f WHERE f.id = ?1"),
            params![feed_id],
            feed_from_row,
        )?;

        Ok(feed)
    }

    fn insert_post(&self, post: &NewPost) -> InsertOutcome {
        match self.try_insert_post(post) {
            Ok(post) => InsertOutcome::Inserted(post),
            Err(GatorError::Database(e)) if is_unique_violation(&e) => InsertOutcome::AlreadyExists,
            Err(e) => InsertOutcome::Failed(e),
        }
    }
}

impl Store for SqliteStore {
    fn create_user(&self, name: &str) -> Result<User> {
        let conn = self.lock()?;
        let now = now_micros();

        match conn.execute(
            "INSERT INTO users (name, created_at, updated_at) VALUES (?1, ?2, ?2)",
            params![name, format_datetime(&now)],
        ) {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => return Err(GatorError::UserExists(name.into())),
            Err(e) => return Err(e.into()),
        }

        Ok(User {
            id: conn.last_insert_rowid(),
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        })
    }

    fn get_user(&self, name: &str) -> Result<Option<User>> {
        let conn = self.lock()?;

        let user = conn
            .query_row(
                "SELECT id, name, created_at, updated_at FROM users WHERE name = ?1",
                params![name],
                user_from_row,
            )
            .optional()?;

        Ok(user)
    }

    fn get_users(&self) -> Result<Vec<User>> {
        let conn = self.lock()?;

        let mut stmt =
            conn.prepare("SELECT id, name, created_at, updated_at FROM users ORDER BY name")?;
        let users = stmt
            .query_map([], user_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(users)
    }

    fn delete_all_users(&self) -> Result<usize> {
        let conn = self.lock()?;
        Ok(conn.execute("DELETE FROM users", [])?)
    }

    fn create_feed(&self, feed: &Feed) -> Result<Feed> {
        let conn = self.lock()?;

        match conn.execute(
            "INSERT INTO feeds (name, url, user_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                feed.name,
                feed.url,
                feed.user_id,
                format_datetime(&feed.created_at),
                format_datetime(&feed.updated_at)
            ],
        ) {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                return Err(GatorError::FeedExists(feed.url.clone()))
            }
            Err(e) => return Err(e.into()),
        }

        Ok(Feed {
            id: conn.last_insert_rowid(),
            last_fetched_at: None,
            created_at: feed.created_at.trunc_subsecs(6),
            updated_at: feed.updated_at.trunc_subsecs(6),
            ..feed.clone()
        })
    }

    fn get_feed_by_url(&self, url: &str) -> Result<Option<Feed>> {
        let conn = self.lock()?;

        let feed = conn
            .query_row(
                &format!("SELECT {FEED_COLUMNS} FROM feeds f WHERE f.url = ?1"),
                params![url],
                feed_from_row,
            )
            .optional()?;

        Ok(feed)
    }

    fn get_feeds_with_owner(&self) -> Result<Vec<FeedWithOwner>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {FEED_COLUMNS}, u.name FROM feeds f
             JOIN users u ON u.id = f.user_id
             ORDER BY f.created_at, f.id"
        ))?;
        let feeds = stmt
            .query_map([], |row| {
                Ok(FeedWithOwner {
                    feed: feed_from_row(row)?,
                    user_name: row.get(7)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(feeds)
    }

    fn create_feed_follow(&self, user_id: i64, feed_id: i64) -> Result<FeedFollow> {
        let conn = self.lock()?;
        let now = format_datetime(&now_micros());

        match conn.execute(
            "INSERT INTO feed_follows (user_id, feed_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?3)",
            params![user_id, feed_id, now],
        ) {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                let name: String = conn.query_row(
                    "SELECT name FROM feeds WHERE id = ?1",
                    params![feed_id],
                    |row| row.get(0),
                )?;
                return Err(GatorError::AlreadyFollowing(name));
            }
            Err(e) => return Err(e.into()),
        }

        let follow = conn.query_row(
            &format!("{FOLLOW_SELECT} WHERE ff.id = ?1"),
            params![conn.last_insert_rowid()],
            follow_from_row,
        )?;

        Ok(follow)
    }

    fn get_follows_for_user(&self, user_id: i64) -> Result<Vec<FeedFollow>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(&format!(
            "{FOLLOW_SELECT} WHERE ff.user_id = ?1 ORDER BY f.name, ff.id"
        ))?;
        let follows = stmt
            .query_map(params![user_id], follow_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(follows)
    }

    fn delete_feed_follow(&self, user_id: i64, feed_id: i64) -> Result<bool> {
        let conn = self.lock()?;

        let deleted = conn.execute(
            "DELETE FROM feed_follows WHERE user_id = ?1 AND feed_id = ?2",
            params![user_id, feed_id],
        )?;

        Ok(deleted > 0)
    }

    fn get_posts_for_user(&self, user_id: i64, limit: usize) -> Result<Vec<Post>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {POST_COLUMNS} FROM posts p
             JOIN feed_follows ff ON ff.feed_id = p.feed_id
             WHERE ff.user_id = ?1
             ORDER BY p.published_at IS NULL, p.published_at DESC, p.created_at DESC
             LIMIT ?2"
        ))?;
        let posts = stmt
            .query_map(params![user_id, limit as i64], post_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(posts)
    }

    fn get_posts_by_feed(&self, feed_id: i64) -> Result<Vec<Post>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {POST_COLUMNS} FROM posts p WHERE p.feed_id = ?1 ORDER BY p.id"
        ))?;
        let posts = stmt
            .query_map(params![feed_id], post_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(posts)
    }
}
