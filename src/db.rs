use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use anyhow::Context;
use sqlx::{
    migrate::Migrator,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions},
};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::pantry::repo::PantryStore;

static CREDENTIALS_MIGRATOR: Migrator = sqlx::migrate!("./migrations/credentials");
static PANTRY_MIGRATOR: Migrator = sqlx::migrate!("./migrations/pantry");

/// Storage key of a user's pantry: the username trimmed and lowercased.
pub fn namespace_key(username: &str) -> String {
    username.trim().to_lowercase()
}

async fn connect_sqlite(path: &Path, max_connections: u32) -> anyhow::Result<SqlitePool> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }

    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal);

    SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
        .with_context(|| format!("open sqlite database {}", path.display()))
}

/// Opens the process-wide credentials database and applies its migrations.
pub async fn open_credentials(path: &Path) -> anyhow::Result<SqlitePool> {
    let pool = connect_sqlite(path, 5).await?;
    CREDENTIALS_MIGRATOR
        .run(&pool)
        .await
        .context("migrate credentials database")?;
    Ok(pool)
}

/// Keyed map of open pantry databases, one file per user under `root`.
pub struct PantryRegistry {
    root: PathBuf,
    open: RwLock<HashMap<String, PantryStore>>,
}

impl PantryRegistry {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            open: RwLock::new(HashMap::new()),
        }
    }

    pub fn db_path(&self, username: &str) -> PathBuf {
        self.root.join(format!("{}.db", namespace_key(username)))
    }

    /// Returns the user's pantry, creating and migrating its database on first access.
    pub async fn open(&self, username: &str) -> anyhow::Result<PantryStore> {
        let key = namespace_key(username);
        if let Some(store) = self.open.read().await.get(&key) {
            return Ok(store.clone());
        }

        let mut open = self.open.write().await;
        if let Some(store) = open.get(&key) {
            return Ok(store.clone());
        }

        let path = self.db_path(&key);
        let pool = connect_sqlite(&path, 2).await?;
        PANTRY_MIGRATOR
            .run(&pool)
            .await
            .with_context(|| format!("migrate pantry {}", path.display()))?;
        info!(namespace = %key, path = %path.display(), "pantry opened");

        let store = PantryStore::new(pool);
        open.insert(key, store.clone());
        Ok(store)
    }

    /// Closes the user's pantry if it is open. Returns whether anything was closed.
    pub async fn close(&self, username: &str) -> bool {
        let key = namespace_key(username);
        let removed = self.open.write().await.remove(&key);
        match removed {
            Some(store) => {
                store.close().await;
                info!(namespace = %key, "pantry closed");
                true
            }
            None => false,
        }
    }

    pub async fn close_all(&self) {
        let drained: Vec<_> = self.open.write().await.drain().collect();
        for (key, store) in drained {
            store.close().await;
            debug!(namespace = %key, "pantry closed on shutdown");
        }
    }

    pub async fn is_open(&self, username: &str) -> bool {
        self.open.read().await.contains_key(&namespace_key(username))
    }
}
