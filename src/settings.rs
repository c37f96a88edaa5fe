//! Typed system settings. Values carry an explicit kind tag instead of being
//! re-inferred from the stored string; changes go through the audit log.

use serde_json::json;
use sqlx::SqlitePool;

use crate::audit::{AuditEvent, AuditService};
use crate::context::ActorContext;
use crate::errors::AppResult;
use crate::models::{DbSystemSetting, SettingValue, SystemSetting};
use crate::utils::utc_now;

#[derive(Clone)]
pub struct SettingsService {
    pool: SqlitePool,
    audit: AuditService,
}

impl SettingsService {
    pub fn new(pool: SqlitePool, audit: AuditService) -> Self {
        Self { pool, audit }
    }

    pub async fn get(&self, key: &str) -> AppResult<Option<SettingValue>> {
        let row = sqlx::query_as::<_, DbSystemSetting>(
            "SELECT key, kind, value, updated_at FROM system_settings WHERE key = ?",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        row.map(SystemSetting::try_from)
            .transpose()
            .map(|opt| opt.map(|s| s.value))
    }

    /// Upsert a setting and audit the old/new values.
    pub async fn set(&self, key: &str, value: SettingValue, ctx: &ActorContext) -> AppResult<()> {
        let old = self.get(key).await?;
        let now = utc_now();

        sqlx::query(
            "INSERT INTO system_settings (key, kind, value, updated_at) VALUES (?, ?, ?, ?) \
             ON CONFLICT(key) DO UPDATE SET kind = excluded.kind, value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(value.kind())
        .bind(value.encode())
        .bind(now)
        .execute(&self.pool)
        .await?;

        let mut event = AuditEvent::new("setting_updated")
            .with_new_values(json!({ "key": key, "value": value }));
        if let Some(old) = old {
            event = event.with_old_values(json!({ "key": key, "value": old }));
        }
        self.audit.record(event, ctx).await?;

        Ok(())
    }

    pub async fn list(&self) -> AppResult<Vec<SystemSetting>> {
        let rows = sqlx::query_as::<_, DbSystemSetting>(
            "SELECT key, kind, value, updated_at FROM system_settings ORDER BY key",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(SystemSetting::try_from).collect()
    }
}
