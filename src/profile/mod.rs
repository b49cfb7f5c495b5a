//! Profile store: per-user usage counters and recent queries.
//!
//! - `model`: the `Profile` document returned to callers.
//! - `repo`: SQL-only functions over the `profiles` table.
//!
//! The session controller only depends on the `ProfileStore` trait;
//! `SqliteProfileStore` is the sqlx-backed implementation.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

pub mod model;
pub mod repo;

pub use model::Profile;
pub use repo::{init_pool, run_migrations, Pool};

#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Count one completed analysis and prepend `query` to the recent list.
    async fn record_analysis(&self, user_id: &str, query: &str) -> Result<()>;

    /// Count a visit unless the previous one is within `window`. Returns whether
    /// the visit was counted.
    async fn record_visit(&self, user_id: &str, now: DateTime<Utc>, window: Duration)
        -> Result<bool>;

    async fn load_profile(&self, user_id: &str) -> Result<Option<Profile>>;
}

#[derive(Debug, Clone)]
pub struct SqliteProfileStore {
    pool: Pool,
}

impl SqliteProfileStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }
}

#[async_trait]
impl ProfileStore for SqliteProfileStore {
    async fn record_analysis(&self, user_id: &str, query: &str) -> Result<()> {
        repo::record_analysis(&self.pool, user_id, query).await
    }

    async fn record_visit(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Result<bool> {
        repo::record_visit(&self.pool, user_id, now, window).await
    }

    async fn load_profile(&self, user_id: &str) -> Result<Option<Profile>> {
        repo::load_profile(&self.pool, user_id).await
    }
}
