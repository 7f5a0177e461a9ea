use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Row, Sqlite,
};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    str::FromStr,
    sync::atomic::{AtomicBool, Ordering},
};
use tokio::sync::Mutex;
use tracing::debug;

/// Keyed store for serialized term-slot documents.
///
/// Values are opaque to the store; the planner owns their format.
#[async_trait]
pub trait PlanCache: Send + Sync {
    async fn load_plan(&self, cache_key: &str) -> Result<Option<String>>;
    async fn store_plan(&self, cache_key: &str, document: &str) -> Result<()>;
    async fn remove_plan(&self, cache_key: &str) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct CachedPlanSummary {
    pub cache_key: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        // Every connection to `sqlite::memory:` opens its own database.
        let max_connections = if database_url.starts_with("sqlite::memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    /// Every cached plan, most recently written first.
    pub async fn list_cached_plans(&self) -> Result<Vec<CachedPlanSummary>> {
        let rows = sqlx::query(
            "SELECT cache_key, updated_at FROM plan_cache ORDER BY updated_at DESC, cache_key ASC",
        )
        .fetch_all(&self.pool)
        .await
        .context("failed to list cached plans")?;

        rows.into_iter()
            .map(|row| {
                Ok(CachedPlanSummary {
                    cache_key: row.try_get("cache_key")?,
                    updated_at: row.try_get("updated_at")?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl PlanCache for Storage {
    async fn load_plan(&self, cache_key: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT document FROM plan_cache WHERE cache_key = ?")
            .bind(cache_key)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("failed to read cached plan '{cache_key}'"))?;
        Ok(row.map(|r| r.get::<String, _>(0)))
    }

    async fn store_plan(&self, cache_key: &str, document: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO plan_cache (cache_key, document, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(cache_key) DO UPDATE
             SET document = excluded.document, updated_at = excluded.updated_at",
        )
        .bind(cache_key)
        .bind(document)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to write cached plan '{cache_key}'"))?;
        debug!(cache_key, bytes = document.len(), "stored cached plan");
        Ok(())
    }

    async fn remove_plan(&self, cache_key: &str) -> Result<()> {
        sqlx::query("DELETE FROM plan_cache WHERE cache_key = ?")
            .bind(cache_key)
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to remove cached plan '{cache_key}'"))?;
        Ok(())
    }
}

/// Process-local cache, used when no database is configured and in tests.
#[derive(Default)]
pub struct MemoryPlanCache {
    entries: Mutex<HashMap<String, String>>,
    fail_writes: AtomicBool,
}

impl MemoryPlanCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// A cache whose writes always fail, as a full store would.
    pub fn rejecting_writes() -> Self {
        let cache = Self::default();
        cache.fail_writes.store(true, Ordering::SeqCst);
        cache
    }

    pub async fn insert_raw(&self, cache_key: &str, document: &str) {
        self.entries
            .lock()
            .await
            .insert(cache_key.to_string(), document.to_string());
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[async_trait]
impl PlanCache for MemoryPlanCache {
    async fn load_plan(&self, cache_key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().await.get(cache_key).cloned())
    }

    async fn store_plan(&self, cache_key: &str, document: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(anyhow!("plan cache is full"));
        }
        self.insert_raw(cache_key, document).await;
        Ok(())
    }

    async fn remove_plan(&self, cache_key: &str) -> Result<()> {
        self.entries.lock().await.remove(cache_key);
        Ok(())
    }
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url == "sqlite::memory:" || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
