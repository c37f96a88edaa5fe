//! Entity Store access: inline sqlx queries over the shared pool. Listing
//! queries go through the tolerant row parsers so mixed timestamp/uuid
//! storage formats in existing databases still decode.

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::row_parsers::{db_activity_from_row, db_activity_update_from_row};
use crate::errors::{AppError, AppResult};
use crate::models::{Activity, ActivityUpdate, DbActivity, DbUser, NewActivity, NewUser, Status, User};
use crate::stats::DateRange;
use crate::utils::utc_now;

pub async fn insert_user(pool: &SqlitePool, new_user: NewUser) -> AppResult<User> {
    let id = Uuid::new_v4();
    let now = utc_now();

    sqlx::query(
        "INSERT INTO users (id, name, email, department, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(&new_user.name)
    .bind(&new_user.email)
    .bind(&new_user.department)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .map_err(|err| match err {
        sqlx::Error::Database(ref db) if db.message().contains("UNIQUE") => {
            AppError::conflict("email already in use")
        }
        other => AppError::from(other),
    })?;

    Ok(User {
        id,
        name: new_user.name,
        email: new_user.email,
        department: new_user.department,
        created_at: now,
        updated_at: now,
    })
}

pub async fn find_user(pool: &SqlitePool, id: Uuid) -> AppResult<Option<User>> {
    let row = sqlx::query_as::<_, DbUser>(
        "SELECT id, name, email, department, created_at, updated_at FROM users WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.map(User::try_from).transpose()
}

pub async fn list_users(pool: &SqlitePool) -> AppResult<Vec<User>> {
    let rows = sqlx::query_as::<_, DbUser>(
        "SELECT id, name, email, department, created_at, updated_at FROM users ORDER BY name",
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(User::try_from).collect()
}

pub async fn list_departments(pool: &SqlitePool) -> AppResult<Vec<String>> {
    let rows: Vec<String> = sqlx::query_scalar(
        "SELECT DISTINCT department FROM users WHERE department IS NOT NULL ORDER BY department",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn insert_activity(pool: &SqlitePool, new_activity: NewActivity) -> AppResult<Activity> {
    if new_activity.name.trim().is_empty() {
        return Err(AppError::bad_request("activity name must not be empty"));
    }

    let id = Uuid::new_v4();
    let now = utc_now();

    sqlx::query(
        "INSERT INTO activities (id, name, description, status, priority, created_by, assigned_to, due_date, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(&new_activity.name)
    .bind(&new_activity.description)
    .bind(Status::Pending.as_str())
    .bind(new_activity.priority.as_str())
    .bind(new_activity.created_by)
    .bind(new_activity.assigned_to)
    .bind(new_activity.due_date)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(Activity {
        id,
        name: new_activity.name,
        description: new_activity.description,
        status: Status::Pending,
        priority: new_activity.priority,
        created_by: new_activity.created_by,
        assigned_to: new_activity.assigned_to,
        due_date: new_activity.due_date,
        created_at: now,
        updated_at: now,
    })
}

pub async fn find_activity(pool: &SqlitePool, id: Uuid) -> AppResult<Option<Activity>> {
    let row = sqlx::query_as::<_, DbActivity>(
        "SELECT id, name, description, status, priority, created_by, assigned_to, due_date, created_at, updated_at \
         FROM activities WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.map(Activity::try_from).transpose()
}

pub async fn list_activities_created_between(pool: &SqlitePool, range: &DateRange) -> AppResult<Vec<Activity>> {
    let rows = sqlx::query(
        "SELECT id, name, description, status, priority, created_by, assigned_to, due_date, created_at, updated_at \
         FROM activities WHERE created_at >= ? AND created_at < ? ORDER BY created_at",
    )
    .bind(range.start_at())
    .bind(range.end_exclusive())
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| db_activity_from_row(row).and_then(Activity::try_from))
        .collect()
}

/// Audit trail for one activity, chronological.
pub async fn list_updates_for_activity(pool: &SqlitePool, activity_id: Uuid) -> AppResult<Vec<ActivityUpdate>> {
    let rows = sqlx::query(
        "SELECT id, activity_id, user_id, previous_status, new_status, remarks, ip_address, user_agent, created_at \
         FROM activity_updates WHERE activity_id = ? ORDER BY created_at",
    )
    .bind(activity_id)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| db_activity_update_from_row(row).and_then(ActivityUpdate::try_from))
        .collect()
}

/// Updates belonging to activities created in the range, for resolution-time
/// aggregation.
pub async fn list_updates_for_range(pool: &SqlitePool, range: &DateRange) -> AppResult<Vec<ActivityUpdate>> {
    let rows = sqlx::query(
        "SELECT au.id, au.activity_id, au.user_id, au.previous_status, au.new_status, au.remarks, au.ip_address, au.user_agent, au.created_at \
         FROM activity_updates au \
         INNER JOIN activities a ON a.id = au.activity_id \
         WHERE a.created_at >= ? AND a.created_at < ? \
         ORDER BY au.created_at",
    )
    .bind(range.start_at())
    .bind(range.end_exclusive())
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| db_activity_update_from_row(row).and_then(ActivityUpdate::try_from))
        .collect()
}
