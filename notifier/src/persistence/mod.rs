mod error;

use chrono::Utc;
use deploy_notifier_common::{constants::state_key, TrackedState};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::{debug, instrument};

pub use self::error::Error as PersistenceError;
use self::error::Result;

/// Path that selects a store living only as long as the process
pub const IN_MEMORY: &str = ":memory:";

/// A string keyed store holding one record per tracked project
#[allow(async_fn_in_trait)]
pub trait StateStore {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Insert or overwrite the record under `key`
    async fn put(&self, key: &str, value: &str) -> Result<()>;

    /// Remove the record under `key`. Returns whether there was one
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Get the state tracked for a project, if it was ever observed
    async fn load_state(&self, project: &str) -> Result<Option<TrackedState>> {
        match self.get(&state_key(project)).await? {
            Some(record) => Ok(Some(serde_json::from_str(&record)?)),
            None => Ok(None),
        }
    }

    async fn store_state(&self, project: &str, state: &TrackedState) -> Result<()> {
        let record = serde_json::to_string(state)?;

        self.put(&state_key(project), &record).await
    }

    /// Forget a project so its next observation is treated as the first one
    async fn reset_state(&self, project: &str) -> Result<bool> {
        self.delete(&state_key(project)).await
    }
}

#[derive(Clone)]
pub struct Sqlite {
    pool: SqlitePool,
}

impl Sqlite {
    /// Open the store at `path`, creating the file and its table if needed
    pub async fn new(path: &str) -> Result<Self> {
        if path == IN_MEMORY {
            return Self::new_in_memory().await;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;

        debug!(path, "opened state store");

        Self::from_pool(pool).await
    }

    /// Every connection to `sqlite::memory:` sees its own database, so the pool is held at a
    /// single connection that is never recycled.
    pub async fn new_in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        Self::from_pool(pool).await
    }

    async fn from_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::query(
            "
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY, -- State key, derived from the project name.
                value TEXT NOT NULL,  -- Serialized record.
                last_update INTEGER   -- Unix epoch of the last write.
            );
            ",
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }
}

impl StateStore for Sqlite {
    #[instrument(skip(self))]
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let record = sqlx::query_as::<_, (String,)>("SELECT value FROM kv WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(record.map(|(value,)| value))
    }

    #[instrument(skip(self, value))]
    async fn put(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO kv (key, value, last_update) VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, last_update = excluded.last_update",
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, key: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM kv WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
