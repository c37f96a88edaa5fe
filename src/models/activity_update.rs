use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::activity::Status;

/// One entry of an activity's audit trail. Append-only: rows are never
/// updated or deleted, ordering is by `created_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityUpdate {
    pub id: Uuid,
    pub activity_id: Uuid,
    pub user_id: Uuid,
    pub previous_status: Status,
    pub new_status: Status,
    pub remarks: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct DbActivityUpdate {
    pub id: Uuid,
    pub activity_id: Uuid,
    pub user_id: Uuid,
    pub previous_status: String,
    pub new_status: String,
    pub remarks: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<DbActivityUpdate> for ActivityUpdate {
    type Error = AppError;

    fn try_from(value: DbActivityUpdate) -> Result<Self, Self::Error> {
        Ok(ActivityUpdate {
            id: value.id,
            activity_id: value.activity_id,
            user_id: value.user_id,
            previous_status: Status::parse(&value.previous_status)?,
            new_status: Status::parse(&value.new_status)?,
            remarks: value.remarks,
            ip_address: value.ip_address,
            user_agent: value.user_agent,
            created_at: value.created_at,
        })
    }
}
