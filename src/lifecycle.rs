//! Activity Lifecycle Engine: the only mutation path for activity status.
//! Each transition writes the status change and its audit-trail entry in one
//! transaction; neither is ever visible without the other.

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::cache::{CacheCoordinator, InvalidationScope};
use crate::context::ActorContext;
use crate::errors::{AppError, AppResult};
use crate::models::{Activity, ActivityUpdate, Status};
use crate::store;
use crate::utils::utc_now;

#[derive(Clone)]
pub struct ActivityLifecycle {
    pool: SqlitePool,
    cache: CacheCoordinator,
}

impl ActivityLifecycle {
    pub fn new(pool: SqlitePool, cache: CacheCoordinator) -> Self {
        Self { pool, cache }
    }

    /// Transition an activity to `new_status`, recording one audit-trail
    /// entry. Authorization is the caller's responsibility (see
    /// `authz::can_update`); this engine does not re-derive it.
    ///
    /// A request for the current status is allowed and records a no-op entry
    /// with previous == new.
    pub async fn transition(
        &self,
        activity_id: Uuid,
        new_status: Status,
        remarks: &str,
        ctx: &ActorContext,
    ) -> AppResult<(Activity, ActivityUpdate)> {
        if remarks.trim().is_empty() {
            return Err(AppError::bad_request("remarks must not be empty"));
        }
        let actor_id = ctx
            .user_id
            .ok_or_else(|| AppError::bad_request("actor user id is required for a transition"))?;

        let mut activity = store::find_activity(&self.pool, activity_id)
            .await?
            .ok_or_else(|| AppError::not_found("activity not found"))?;

        let previous_status = activity.status;
        let now = utc_now();
        let update_id = Uuid::new_v4();

        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE activities SET status = ?, updated_at = ? WHERE id = ?")
            .bind(new_status.as_str())
            .bind(now)
            .bind(activity_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO activity_updates (id, activity_id, user_id, previous_status, new_status, remarks, ip_address, user_agent, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(update_id)
        .bind(activity_id)
        .bind(actor_id)
        .bind(previous_status.as_str())
        .bind(new_status.as_str())
        .bind(remarks)
        .bind(&ctx.ip)
        .bind(&ctx.user_agent)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            activity_id = %activity_id,
            user_id = %actor_id,
            previous = previous_status.as_str(),
            new = new_status.as_str(),
            "activity status transition"
        );

        // dashboards and reports covering this activity are now stale
        self.cache
            .invalidate(InvalidationScope::Prefix("reports".to_string()))
            .await;

        activity.status = new_status;
        activity.updated_at = now;

        let entry = ActivityUpdate {
            id: update_id,
            activity_id,
            user_id: actor_id,
            previous_status,
            new_status,
            remarks: remarks.to_string(),
            ip_address: ctx.ip.clone(),
            user_agent: ctx.user_agent.clone(),
            created_at: now,
        };

        Ok((activity, entry))
    }
}
