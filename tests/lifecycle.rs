use anyhow::{Context, Result};
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use tempfile::{tempdir, TempDir};
use uuid::Uuid;

use activity_core::cache::CacheCoordinator;
use activity_core::context::ActorContext;
use activity_core::lifecycle::ActivityLifecycle;
use activity_core::models::{NewActivity, NewUser, Priority, Status};
use activity_core::store;
use activity_core::AppError;

async fn setup_pool() -> Result<(SqlitePool, TempDir)> {
    let dir = tempdir().context("failed to create tempdir")?;
    let db_path = dir.path().join("test.db");
    let opts = SqliteConnectOptions::new()
        .filename(db_path.as_path())
        .create_if_missing(true);
    let pool = SqlitePool::connect_with(opts).await?;

    let migrator = sqlx::migrate::Migrator::new(
        std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations"),
    )
    .await?;
    migrator.run(&pool).await?;

    Ok((pool, dir))
}

async fn seed_user(pool: &SqlitePool, name: &str, email: &str) -> Result<Uuid> {
    let user = store::insert_user(
        pool,
        NewUser {
            name: name.to_string(),
            email: email.to_string(),
            department: Some("Support".to_string()),
        },
    )
    .await?;
    Ok(user.id)
}

async fn seed_activity(pool: &SqlitePool, created_by: Uuid) -> Result<Uuid> {
    let activity = store::insert_activity(
        pool,
        NewActivity {
            name: "Investigate printer outage".to_string(),
            description: Some("Third floor printer offline".to_string()),
            priority: Priority::High,
            created_by,
            assigned_to: None,
            due_date: None,
        },
    )
    .await?;
    Ok(activity.id)
}

#[tokio::test]
async fn transition_updates_status_and_writes_audit_entry() -> Result<()> {
    let (pool, _dir) = setup_pool().await?;
    let user_id = seed_user(&pool, "Ada", "ada@example.com").await?;
    let activity_id = seed_activity(&pool, user_id).await?;

    let lifecycle = ActivityLifecycle::new(pool.clone(), CacheCoordinator::in_memory());
    let ctx = ActorContext::for_user(user_id)
        .with_ip("10.0.0.5")
        .with_user_agent("test-client/1.0");

    let (activity, entry) = lifecycle
        .transition(activity_id, Status::Done, "Fixed the issue", &ctx)
        .await?;

    assert_eq!(activity.status, Status::Done);
    assert_eq!(entry.previous_status, Status::Pending);
    assert_eq!(entry.new_status, Status::Done);
    assert_eq!(entry.remarks, "Fixed the issue");
    assert_eq!(entry.user_id, user_id);
    assert_eq!(entry.ip_address.as_deref(), Some("10.0.0.5"));

    // persisted state matches the returned values
    let stored = store::find_activity(&pool, activity_id)
        .await?
        .context("activity missing")?;
    assert_eq!(stored.status, Status::Done);

    let trail = store::list_updates_for_activity(&pool, activity_id).await?;
    assert_eq!(trail.len(), 1);
    assert_eq!(trail[0].previous_status, Status::Pending);
    assert_eq!(trail[0].new_status, Status::Done);

    Ok(())
}

#[tokio::test]
async fn same_status_transition_records_noop_entry() -> Result<()> {
    let (pool, _dir) = setup_pool().await?;
    let user_id = seed_user(&pool, "Ada", "ada@example.com").await?;
    let activity_id = seed_activity(&pool, user_id).await?;

    let lifecycle = ActivityLifecycle::new(pool.clone(), CacheCoordinator::in_memory());
    let ctx = ActorContext::for_user(user_id);

    let (activity, entry) = lifecycle
        .transition(activity_id, Status::Pending, "re-checked, still open", &ctx)
        .await?;

    assert_eq!(activity.status, Status::Pending);
    assert_eq!(entry.previous_status, Status::Pending);
    assert_eq!(entry.new_status, Status::Pending);

    Ok(())
}

#[tokio::test]
async fn statuses_are_mutually_reachable() -> Result<()> {
    let (pool, _dir) = setup_pool().await?;
    let user_id = seed_user(&pool, "Ada", "ada@example.com").await?;
    let activity_id = seed_activity(&pool, user_id).await?;

    let lifecycle = ActivityLifecycle::new(pool.clone(), CacheCoordinator::in_memory());
    let ctx = ActorContext::for_user(user_id);

    lifecycle
        .transition(activity_id, Status::Done, "resolved", &ctx)
        .await?;
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    let (activity, entry) = lifecycle
        .transition(activity_id, Status::Pending, "reopened, issue came back", &ctx)
        .await?;

    assert_eq!(activity.status, Status::Pending);
    assert_eq!(entry.previous_status, Status::Done);

    // the trail is chronological and chains together
    let trail = store::list_updates_for_activity(&pool, activity_id).await?;
    assert_eq!(trail.len(), 2);
    assert_eq!(trail[0].new_status, trail[1].previous_status);

    Ok(())
}

#[tokio::test]
async fn empty_remarks_are_rejected() -> Result<()> {
    let (pool, _dir) = setup_pool().await?;
    let user_id = seed_user(&pool, "Ada", "ada@example.com").await?;
    let activity_id = seed_activity(&pool, user_id).await?;

    let lifecycle = ActivityLifecycle::new(pool.clone(), CacheCoordinator::in_memory());
    let ctx = ActorContext::for_user(user_id);

    let err = lifecycle
        .transition(activity_id, Status::Done, "   ", &ctx)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    // no state change, no audit entry
    let stored = store::find_activity(&pool, activity_id)
        .await?
        .context("activity missing")?;
    assert_eq!(stored.status, Status::Pending);
    assert!(store::list_updates_for_activity(&pool, activity_id).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn missing_activity_is_not_found() -> Result<()> {
    let (pool, _dir) = setup_pool().await?;
    let user_id = seed_user(&pool, "Ada", "ada@example.com").await?;

    let lifecycle = ActivityLifecycle::new(pool.clone(), CacheCoordinator::in_memory());
    let ctx = ActorContext::for_user(user_id);

    let err = lifecycle
        .transition(Uuid::new_v4(), Status::Done, "done", &ctx)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    Ok(())
}

#[tokio::test]
async fn anonymous_actor_is_rejected() -> Result<()> {
    let (pool, _dir) = setup_pool().await?;
    let user_id = seed_user(&pool, "Ada", "ada@example.com").await?;
    let activity_id = seed_activity(&pool, user_id).await?;

    let lifecycle = ActivityLifecycle::new(pool.clone(), CacheCoordinator::in_memory());

    let err = lifecycle
        .transition(activity_id, Status::Done, "done", &ActorContext::anonymous())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    Ok(())
}

#[tokio::test]
async fn failed_audit_write_rolls_back_the_status_change() -> Result<()> {
    let (pool, _dir) = setup_pool().await?;
    let user_id = seed_user(&pool, "Ada", "ada@example.com").await?;
    let activity_id = seed_activity(&pool, user_id).await?;

    // sabotage the audit-entry insert so the transaction cannot commit
    sqlx::query("ALTER TABLE activity_updates RENAME TO activity_updates_gone")
        .execute(&pool)
        .await?;

    let lifecycle = ActivityLifecycle::new(pool.clone(), CacheCoordinator::in_memory());
    let ctx = ActorContext::for_user(user_id);

    let err = lifecycle
        .transition(activity_id, Status::Done, "should not stick", &ctx)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Database(_)));

    // the status update in the same transaction rolled back with it
    let stored = store::find_activity(&pool, activity_id)
        .await?
        .context("activity missing")?;
    assert_eq!(stored.status, Status::Pending);

    Ok(())
}
