use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{DbActivity, DbActivityUpdate, DbAuditLog};

pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>, AppError> {
    let s = s.trim();

    // Try RFC3339 first (e.g. 2025-11-19T12:34:56Z)
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    // Try SQLite default timestamp format: "YYYY-MM-DD HH:MM:SS" (with optional fractional seconds)
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return Ok(Utc.from_utc_datetime(&naive));
    }

    // Try date-only format: "YYYY-MM-DD"
    if let Ok(naive_date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        let ndt = naive_date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| AppError::internal("invalid datetime: date out of range".to_string()))?;
        return Ok(Utc.from_utc_datetime(&ndt));
    }

    Err(AppError::internal(format!("invalid datetime: {}", s)))
}

pub fn parse_opt_datetime(s: Option<String>) -> Result<Option<DateTime<Utc>>, AppError> {
    match s {
        Some(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Ok(None)
            } else {
                Ok(Some(parse_datetime(trimmed)?))
            }
        }
        None => Ok(None),
    }
}

fn get_uuid(row: &SqliteRow, col: &str) -> Result<Uuid, AppError> {
    row.try_get(col)
        .map_err(|e| AppError::internal(format!("missing {}: {}", col, e)))
}

fn get_opt_uuid(row: &SqliteRow, col: &str) -> Result<Option<Uuid>, AppError> {
    row.try_get(col)
        .map_err(|e| AppError::internal(format!("missing {}: {}", col, e)))
}

fn get_datetime(row: &SqliteRow, col: &str) -> Result<DateTime<Utc>, AppError> {
    let s: String = row
        .try_get(col)
        .map_err(|e| AppError::internal(format!("missing {}: {}", col, e)))?;
    parse_datetime(&s)
}

pub fn db_activity_from_row(row: &SqliteRow) -> Result<DbActivity, AppError> {
    let name: String = row.try_get("name").map_err(|e| AppError::internal(format!("missing name: {}", e)))?;
    let description: Option<String> = row.try_get("description").map_err(|e| AppError::internal(format!("missing description: {}", e)))?;
    let status: String = row.try_get("status").map_err(|e| AppError::internal(format!("missing status: {}", e)))?;
    let priority: String = row.try_get("priority").map_err(|e| AppError::internal(format!("missing priority: {}", e)))?;
    let due_date_s: Option<String> = row.try_get("due_date").map_err(|e| AppError::internal(format!("missing due_date: {}", e)))?;

    Ok(DbActivity {
        id: get_uuid(row, "id")?,
        name,
        description,
        status,
        priority,
        created_by: get_uuid(row, "created_by")?,
        assigned_to: get_opt_uuid(row, "assigned_to")?,
        due_date: parse_opt_datetime(due_date_s)?,
        created_at: get_datetime(row, "created_at")?,
        updated_at: get_datetime(row, "updated_at")?,
    })
}

pub fn db_activity_update_from_row(row: &SqliteRow) -> Result<DbActivityUpdate, AppError> {
    let previous_status: String = row.try_get("previous_status").map_err(|e| AppError::internal(format!("missing previous_status: {}", e)))?;
    let new_status: String = row.try_get("new_status").map_err(|e| AppError::internal(format!("missing new_status: {}", e)))?;
    let remarks: String = row.try_get("remarks").map_err(|e| AppError::internal(format!("missing remarks: {}", e)))?;
    let ip_address: Option<String> = row.try_get("ip_address").map_err(|e| AppError::internal(format!("missing ip_address: {}", e)))?;
    let user_agent: Option<String> = row.try_get("user_agent").map_err(|e| AppError::internal(format!("missing user_agent: {}", e)))?;

    Ok(DbActivityUpdate {
        id: get_uuid(row, "id")?,
        activity_id: get_uuid(row, "activity_id")?,
        user_id: get_uuid(row, "user_id")?,
        previous_status,
        new_status,
        remarks,
        ip_address,
        user_agent,
        created_at: get_datetime(row, "created_at")?,
    })
}

pub fn db_audit_log_from_row(row: &SqliteRow) -> Result<DbAuditLog, AppError> {
    let action: String = row.try_get("action").map_err(|e| AppError::internal(format!("missing action: {}", e)))?;
    let subject_type: Option<String> = row.try_get("subject_type").map_err(|e| AppError::internal(format!("missing subject_type: {}", e)))?;
    let old_values: Option<String> = row.try_get("old_values").map_err(|e| AppError::internal(format!("missing old_values: {}", e)))?;
    let new_values: Option<String> = row.try_get("new_values").map_err(|e| AppError::internal(format!("missing new_values: {}", e)))?;
    let ip_address: Option<String> = row.try_get("ip_address").map_err(|e| AppError::internal(format!("missing ip_address: {}", e)))?;
    let user_agent: Option<String> = row.try_get("user_agent").map_err(|e| AppError::internal(format!("missing user_agent: {}", e)))?;
    let url: Option<String> = row.try_get("url").map_err(|e| AppError::internal(format!("missing url: {}", e)))?;
    let method: Option<String> = row.try_get("method").map_err(|e| AppError::internal(format!("missing method: {}", e)))?;
    let payload: Option<String> = row.try_get("payload").map_err(|e| AppError::internal(format!("missing payload: {}", e)))?;
    let session_id: Option<String> = row.try_get("session_id").map_err(|e| AppError::internal(format!("missing session_id: {}", e)))?;

    Ok(DbAuditLog {
        id: get_uuid(row, "id")?,
        user_id: get_opt_uuid(row, "user_id")?,
        action,
        subject_type,
        subject_id: get_opt_uuid(row, "subject_id")?,
        old_values,
        new_values,
        ip_address,
        user_agent,
        url,
        method,
        payload,
        session_id,
        created_at: get_datetime(row, "created_at")?,
    })
}
