use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

use crate::errors::AppError;

/// General-purpose action log, distinct from the per-activity audit trail.
/// `user_id` is nullable so failed logins can still be recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLog {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub action: String,
    pub subject_type: Option<String>,
    pub subject_id: Option<Uuid>,
    pub old_values: Option<Value>,
    pub new_values: Option<Value>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub url: Option<String>,
    pub method: Option<String>,
    pub payload: Option<Value>,
    pub session_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct DbAuditLog {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub action: String,
    pub subject_type: Option<String>,
    pub subject_id: Option<Uuid>,
    pub old_values: Option<String>,
    pub new_values: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub url: Option<String>,
    pub method: Option<String>,
    pub payload: Option<String>,
    pub session_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

fn parse_json_column(raw: Option<String>, column: &str) -> Result<Option<Value>, AppError> {
    match raw {
        Some(s) if !s.trim().is_empty() => serde_json::from_str(&s)
            .map(Some)
            .map_err(|e| AppError::internal(format!("invalid json in {column}: {e}"))),
        _ => Ok(None),
    }
}

impl TryFrom<DbAuditLog> for AuditLog {
    type Error = AppError;

    fn try_from(value: DbAuditLog) -> Result<Self, Self::Error> {
        Ok(AuditLog {
            id: value.id,
            user_id: value.user_id,
            action: value.action,
            subject_type: value.subject_type,
            subject_id: value.subject_id,
            old_values: parse_json_column(value.old_values, "old_values")?,
            new_values: parse_json_column(value.new_values, "new_values")?,
            ip_address: value.ip_address,
            user_agent: value.user_agent,
            url: value.url,
            method: value.method,
            payload: parse_json_column(value.payload, "payload")?,
            session_id: value.session_id,
            created_at: value.created_at,
        })
    }
}
