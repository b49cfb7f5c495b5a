use super::model::Profile;
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, instrument};

pub type Pool = SqlitePool;

pub async fn init_pool(database_url: &str) -> Result<Pool> {
    let normalized = prepare_sqlite_url(database_url);
    let options = SqliteConnectOptions::from_str(&normalized)
        .with_context(|| format!("invalid database url {normalized}"))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal);
    let pool = SqlitePool::connect_with(options)
        .await
        .context("failed to open profile database")?;
    Ok(pool)
}

/// For file-backed SQLite URLs, expand a leading `~/` and create the parent
/// directory. In-memory and non-sqlite URLs are returned unchanged.
fn prepare_sqlite_url(url: &str) -> String {
    let Some(rest) = url.strip_prefix("sqlite:") else {
        return url.to_string();
    };
    if rest.starts_with(":memory") {
        return url.to_string();
    }

    let rest = rest.strip_prefix("//").unwrap_or(rest);
    let (path, query) = match rest.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (rest, None),
    };
    if path.is_empty() {
        return url.to_string();
    }

    let path = match (path.strip_prefix("~/"), std::env::var("HOME")) {
        (Some(tail), Ok(home)) => format!("{}/{}", home.trim_end_matches('/'), tail),
        _ => path.to_string(),
    };
    if let Some(parent) = std::path::Path::new(&path).parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }

    match query {
        Some(q) => format!("sqlite://{path}?{q}"),
        None => format!("sqlite://{path}"),
    }
}

pub async fn run_migrations(pool: &Pool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

#[instrument(skip_all)]
pub async fn record_analysis(pool: &Pool, user_id: &str, query: &str) -> Result<()> {
    let mut tx = pool.begin().await?;
    let stored: Option<String> =
        sqlx::query_scalar("SELECT recent FROM profiles WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?;
    let mut recent = stored.as_deref().map(decode_recent).unwrap_or_default();
    recent.insert(0, query.to_string());
    let encoded = serde_json::to_string(&recent)?;

    sqlx::query(
        "INSERT INTO profiles (user_id, sentiments, recent) VALUES (?, 1, ?) \
         ON CONFLICT(user_id) DO UPDATE SET sentiments = sentiments + 1, recent = excluded.recent",
    )
    .bind(user_id)
    .bind(&encoded)
    .execute(&mut *tx)
    .await
    .context("failed to record analysis")?;
    tx.commit().await?;
    Ok(())
}

#[instrument(skip_all)]
pub async fn record_visit(
    pool: &Pool,
    user_id: &str,
    now: DateTime<Utc>,
    window: Duration,
) -> Result<bool> {
    let mut tx = pool.begin().await?;
    let last: Option<Option<DateTime<Utc>>> =
        sqlx::query_scalar("SELECT last_visit FROM profiles WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?;
    if let Some(last) = last.flatten() {
        if now.signed_duration_since(last) <= window {
            debug!(user_id, %last, "visit within window; not counted");
            return Ok(false);
        }
    }

    sqlx::query(
        "INSERT INTO profiles (user_id, visits, last_visit) VALUES (?, 1, ?) \
         ON CONFLICT(user_id) DO UPDATE SET visits = visits + 1, last_visit = excluded.last_visit",
    )
    .bind(user_id)
    .bind(now)
    .execute(&mut *tx)
    .await
    .context("failed to record visit")?;
    tx.commit().await?;
    Ok(true)
}

#[instrument(skip_all)]
pub async fn load_profile(pool: &Pool, user_id: &str) -> Result<Option<Profile>> {
    let row = sqlx::query(
        "SELECT user_id, name, email, plan, visits, last_visit, sentiments, recent \
         FROM profiles WHERE user_id = ?",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };
    let recent: String = row.get("recent");
    Ok(Some(Profile {
        user_id: row.get("user_id"),
        name: row.try_get::<Option<String>, _>("name").ok().flatten(),
        email: row.try_get::<Option<String>, _>("email").ok().flatten(),
        plan: row.get("plan"),
        visits: row.get("visits"),
        last_visit: row
            .try_get::<Option<DateTime<Utc>>, _>("last_visit")
            .ok()
            .flatten(),
        sentiments: row.get("sentiments"),
        recent: decode_recent(&recent),
    }))
}

/// Unreadable lists are treated as empty rather than failing the write.
fn decode_recent(raw: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_default()
}
