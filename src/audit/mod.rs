//! Audit Log Writer: append-only action log with mandatory payload
//! redaction. Distinct from the per-activity audit trail; this one covers
//! arbitrary actions, including ones with no resolved user (failed logins).

use std::future::Future;

use chrono::Duration;
use serde::Serialize;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::context::ActorContext;
use crate::db::row_parsers::db_audit_log_from_row;
use crate::errors::{AppError, AppResult};
use crate::models::AuditLog;
use crate::utils::utc_now;

pub const REDACTION_MARKER: &str = "[REDACTED]";

/// Actions surfaced by `security_events`.
pub const SECURITY_ACTIONS: &[&str] = &[
    "login_failed",
    "login_success",
    "logout",
    "password_change",
    "unauthorized_access",
];

const SENSITIVE_KEYS: &[&str] = &[
    "password",
    "password_confirmation",
    "current_password",
    "new_password",
    "_token",
];

fn is_sensitive_key(key: &str) -> bool {
    let key = key.to_lowercase();
    SENSITIVE_KEYS.contains(&key.as_str())
        || key.contains("token")
        || key.contains("secret")
        || key.contains("api_key")
}

/// Replace sensitive top-level values with the redaction marker. The scan is
/// shallow: only top-level keys of an object are checked. Non-object
/// payloads pass through.
pub fn sanitize_payload(payload: &Value) -> Value {
    match payload {
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (key, value) in map {
                if is_sensitive_key(key) {
                    out.insert(key.clone(), Value::String(REDACTION_MARKER.to_string()));
                } else {
                    out.insert(key.clone(), value.clone());
                }
            }
            Value::Object(out)
        }
        other => other.clone(),
    }
}

/// One loggable action. Build with the field setters, then hand to
/// `AuditService::record`.
#[derive(Debug, Clone, Default)]
pub struct AuditEvent {
    pub action: String,
    pub subject_type: Option<String>,
    pub subject_id: Option<Uuid>,
    pub old_values: Option<Value>,
    pub new_values: Option<Value>,
    pub url: Option<String>,
    pub method: Option<String>,
    pub payload: Option<Value>,
    pub session_id: Option<String>,
}

impl AuditEvent {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            ..Self::default()
        }
    }

    pub fn with_subject(mut self, subject_type: impl Into<String>, subject_id: Uuid) -> Self {
        self.subject_type = Some(subject_type.into());
        self.subject_id = Some(subject_id);
        self
    }

    pub fn with_old_values(mut self, values: Value) -> Self {
        self.old_values = Some(values);
        self
    }

    pub fn with_new_values(mut self, values: Value) -> Self {
        self.new_values = Some(values);
        self
    }

    pub fn with_request(mut self, url: impl Into<String>, method: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self.method = Some(method.into());
        self
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

/// Injectable writer over the shared pool; construct one per unit of work or
/// share it, both are fine.
#[derive(Clone)]
pub struct AuditService {
    pool: SqlitePool,
}

impl AuditService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Append one audit row. Redaction of payload and value snapshots happens
    /// here unconditionally; callers cannot opt out.
    pub async fn record(&self, event: AuditEvent, ctx: &ActorContext) -> AppResult<AuditLog> {
        let id = Uuid::new_v4();
        let now = utc_now();

        let old_values = event.old_values.as_ref().map(sanitize_payload);
        let new_values = event.new_values.as_ref().map(sanitize_payload);
        let payload = event.payload.as_ref().map(sanitize_payload);

        let old_values_json = encode_json(&old_values)?;
        let new_values_json = encode_json(&new_values)?;
        let payload_json = encode_json(&payload)?;

        sqlx::query(
            "INSERT INTO audit_logs (id, user_id, action, subject_type, subject_id, old_values, new_values, ip_address, user_agent, url, method, payload, session_id, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(ctx.user_id)
        .bind(&event.action)
        .bind(&event.subject_type)
        .bind(event.subject_id)
        .bind(&old_values_json)
        .bind(&new_values_json)
        .bind(&ctx.ip)
        .bind(&ctx.user_agent)
        .bind(&event.url)
        .bind(&event.method)
        .bind(&payload_json)
        .bind(&event.session_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(AuditLog {
            id,
            user_id: ctx.user_id,
            action: event.action,
            subject_type: event.subject_type,
            subject_id: event.subject_id,
            old_values,
            new_values,
            ip_address: ctx.ip.clone(),
            user_agent: ctx.user_agent.clone(),
            url: event.url,
            method: event.method,
            payload,
            session_id: event.session_id,
            created_at: now,
        })
    }

    /// Authentication events; the context may carry no user id (failed login).
    pub async fn record_auth_event(&self, action: &str, ctx: &ActorContext) -> AppResult<AuditLog> {
        self.record(AuditEvent::new(action), ctx).await
    }

    /// Log a change to an entity, deriving the new-value snapshot from its
    /// current state.
    pub async fn record_model_change<T: Serialize>(
        &self,
        action: &str,
        subject_type: &str,
        subject_id: Uuid,
        state: &T,
        ctx: &ActorContext,
    ) -> AppResult<AuditLog> {
        let snapshot = serde_json::to_value(state)
            .map_err(|e| AppError::internal(format!("failed to snapshot {subject_type}: {e}")))?;
        self.record(
            AuditEvent::new(action)
                .with_subject(subject_type, subject_id)
                .with_new_values(snapshot),
            ctx,
        )
        .await
    }

    /// Entries for one subject, newest first.
    pub async fn for_subject(&self, subject_type: &str, subject_id: Uuid, limit: i64) -> AppResult<Vec<AuditLog>> {
        let rows = sqlx::query(
            "SELECT id, user_id, action, subject_type, subject_id, old_values, new_values, ip_address, user_agent, url, method, payload, session_id, created_at \
             FROM audit_logs WHERE subject_type = ? AND subject_id = ? ORDER BY created_at DESC LIMIT ?",
        )
        .bind(subject_type)
        .bind(subject_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| db_audit_log_from_row(row).and_then(AuditLog::try_from))
            .collect()
    }

    /// Entries produced by one actor, newest first.
    pub async fn for_actor(&self, user_id: Uuid, limit: i64) -> AppResult<Vec<AuditLog>> {
        let rows = sqlx::query(
            "SELECT id, user_id, action, subject_type, subject_id, old_values, new_values, ip_address, user_agent, url, method, payload, session_id, created_at \
             FROM audit_logs WHERE user_id = ? ORDER BY created_at DESC LIMIT ?",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| db_audit_log_from_row(row).and_then(AuditLog::try_from))
            .collect()
    }

    /// Security-relevant entries within the last `window_days` days.
    pub async fn security_events(&self, window_days: i64) -> AppResult<Vec<AuditLog>> {
        let cutoff = utc_now() - Duration::days(window_days);
        let rows = sqlx::query(
            "SELECT id, user_id, action, subject_type, subject_id, old_values, new_values, ip_address, user_agent, url, method, payload, session_id, created_at \
             FROM audit_logs \
             WHERE action IN ('login_failed', 'login_success', 'logout', 'password_change', 'unauthorized_access') \
               AND created_at >= ? \
             ORDER BY created_at DESC",
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| db_audit_log_from_row(row).and_then(AuditLog::try_from))
            .collect()
    }

    /// Retention: delete entries older than `days_to_keep` days and return how
    /// many were removed. The only deletion path for audit logs.
    pub async fn cleanup(&self, days_to_keep: i64) -> AppResult<u64> {
        let cutoff = utc_now() - Duration::days(days_to_keep);
        let result = sqlx::query("DELETE FROM audit_logs WHERE created_at < ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;

        let deleted = result.rows_affected();
        tracing::info!(deleted, days_to_keep, "audit log cleanup");
        Ok(deleted)
    }

    /// Run `work` and log its outcome as `{action}_success` or
    /// `{action}_failed`. The outcome row is written on this service's own
    /// connection, after `work` has finished, so a failure entry survives a
    /// rollback of whatever transaction `work` ran.
    pub async fn run_audited<T, F, Fut>(
        &self,
        action: &str,
        description: &str,
        ctx: &ActorContext,
        work: F,
    ) -> AppResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        match work().await {
            Ok(value) => {
                let logged = self
                    .record(
                        AuditEvent::new(format!("{action}_success"))
                            .with_payload(json!({ "description": description })),
                        ctx,
                    )
                    .await;
                if let Err(log_err) = logged {
                    tracing::error!(%log_err, action, "failed to record success audit entry");
                }
                Ok(value)
            }
            Err(err) => {
                let logged = self
                    .record(
                        AuditEvent::new(format!("{action}_failed")).with_payload(json!({
                            "description": description,
                            "error": err.to_string(),
                        })),
                        ctx,
                    )
                    .await;
                if let Err(log_err) = logged {
                    tracing::error!(%log_err, action, "failed to record failure audit entry");
                }
                Err(err)
            }
        }
    }
}

fn encode_json(value: &Option<Value>) -> AppResult<Option<String>> {
    value
        .as_ref()
        .map(|v| serde_json::to_string(v).map_err(|e| AppError::internal(format!("failed to encode json: {e}"))))
        .transpose()
}
