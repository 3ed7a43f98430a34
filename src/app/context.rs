use std::path::PathBuf;
use std::sync::Arc;

use crate::app::error::{GatorError, Result};
use crate::config::Config;
use crate::domain::User;
use crate::fetcher::{FeedSource, HttpSource};
use crate::store::sqlite::SqliteStore;
use crate::store::Store;

pub struct AppContext {
    pub config: Config,
    pub store: Arc<SqliteStore>,
    pub source: Arc<dyn FeedSource + Send + Sync>,
}

impl AppContext {
    pub fn new(config: Config) -> Result<Self> {
        let db_path = match config.db_path.clone() {
            Some(p) => p,
            None => Self::default_db_path()?,
        };
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let store = Arc::new(SqliteStore::new(&db_path)?);
        Self::with_store(config, store)
    }

    pub fn in_memory(config: Config) -> Result<Self> {
        let store = Arc::new(SqliteStore::in_memory()?);
        Self::with_store(config, store)
    }

    fn with_store(config: Config, store: Arc<SqliteStore>) -> Result<Self> {
        let source: Arc<dyn FeedSource + Send + Sync> = Arc::new(HttpSource::new()?);

        Ok(Self {
            config,
            store,
            source,
        })
    }

    /// The logged-in user, as named in the config file.
    pub fn current_user(&self) -> Result<User> {
        let name = self
            .config
            .current_user_name
            .as_deref()
            .ok_or(GatorError::NotLoggedIn)?;

        self.store
            .get_user(name)?
            .ok_or_else(|| GatorError::UserNotFound(name.to_string()))
    }

    fn default_db_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| GatorError::Config("Could not find data directory".into()))?;
        Ok(data_dir.join("gator").join("gator.db"))
    }
}
