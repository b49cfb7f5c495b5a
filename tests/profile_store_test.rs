use chrono::{Duration, TimeZone, Utc};
use sentiscope::profile::{Profile, ProfileStore, SqliteProfileStore};
use sqlx::sqlite::SqlitePoolOptions;

async fn setup_store() -> SqliteProfileStore {
    // A single connection keeps every query on the same in-memory database.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    SqliteProfileStore::new(pool)
}

#[tokio::test]
async fn unknown_user_has_no_profile() {
    let store = setup_store().await;
    assert_eq!(store.load_profile("nobody").await.unwrap(), None);
}

#[tokio::test]
async fn analyses_prepend_recent_queries() {
    let store = setup_store().await;
    for q in ["rust", "go", "zig"] {
        store.record_analysis("u1", q).await.unwrap();
    }
    store.record_analysis("u2", "python").await.unwrap();

    let profile = store.load_profile("u1").await.unwrap().unwrap();
    assert_eq!(profile.sentiments, 3);
    assert_eq!(profile.recent, vec!["zig", "go", "rust"]);
    assert_eq!(profile.plan, "free");
    assert_eq!(profile.visits, 0);
    assert_eq!(profile.recent_page(2), ["zig".to_string(), "go".to_string()]);

    let other = store.load_profile("u2").await.unwrap().unwrap();
    assert_eq!(other.recent, vec!["python"]);
}

#[tokio::test]
async fn visits_within_window_are_not_counted() {
    let store = setup_store().await;
    let window = Duration::minutes(120);
    let t0 = Utc.with_ymd_and_hms(2025, 8, 1, 9, 0, 0).unwrap();

    assert!(store.record_visit("u1", t0, window).await.unwrap());
    assert!(!store
        .record_visit("u1", t0 + Duration::minutes(90), window)
        .await
        .unwrap());
    assert!(store
        .record_visit("u1", t0 + Duration::minutes(121), window)
        .await
        .unwrap());

    let profile = store.load_profile("u1").await.unwrap().unwrap();
    assert_eq!(profile.visits, 2);
    assert_eq!(profile.last_visit, Some(t0 + Duration::minutes(121)));
}

#[tokio::test]
async fn visits_and_analyses_share_one_row() {
    let store = setup_store().await;
    let now = Utc.with_ymd_and_hms(2025, 8, 1, 9, 0, 0).unwrap();
    store.record_visit("u1", now, Duration::hours(2)).await.unwrap();
    store.record_analysis("u1", "rust").await.unwrap();

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM profiles")
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert_eq!(count, 1);

    let profile = store.load_profile("u1").await.unwrap().unwrap();
    assert_eq!(
        profile,
        Profile {
            visits: 1,
            last_visit: Some(now),
            sentiments: 1,
            recent: vec!["rust".into()],
            ..Profile::empty("u1")
        }
    );
}
