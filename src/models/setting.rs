use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::errors::AppError;

/// Typed system-setting value. Persisted as a (kind, raw-string) pair so the
/// stored form stays human-readable; the kind tag replaces runtime type
/// inference on the raw string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum SettingValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<String>),
}

impl SettingValue {
    pub fn kind(&self) -> &'static str {
        match self {
            SettingValue::Bool(_) => "bool",
            SettingValue::Int(_) => "int",
            SettingValue::Float(_) => "float",
            SettingValue::Text(_) => "text",
            SettingValue::List(_) => "list",
        }
    }

    pub fn encode(&self) -> String {
        match self {
            SettingValue::Bool(v) => v.to_string(),
            SettingValue::Int(v) => v.to_string(),
            SettingValue::Float(v) => v.to_string(),
            SettingValue::Text(v) => v.clone(),
            SettingValue::List(v) => serde_json::to_string(v).unwrap_or_else(|_| "[]".to_string()),
        }
    }

    pub fn decode(kind: &str, raw: &str) -> Result<Self, AppError> {
        match kind {
            "bool" => raw
                .parse::<bool>()
                .map(SettingValue::Bool)
                .map_err(|_| AppError::bad_request(format!("invalid bool setting: {raw}"))),
            "int" => raw
                .parse::<i64>()
                .map(SettingValue::Int)
                .map_err(|_| AppError::bad_request(format!("invalid int setting: {raw}"))),
            "float" => raw
                .parse::<f64>()
                .map(SettingValue::Float)
                .map_err(|_| AppError::bad_request(format!("invalid float setting: {raw}"))),
            "text" => Ok(SettingValue::Text(raw.to_string())),
            "list" => serde_json::from_str(raw)
                .map(SettingValue::List)
                .map_err(|_| AppError::bad_request(format!("invalid list setting: {raw}"))),
            other => Err(AppError::bad_request(format!("unknown setting kind: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemSetting {
    pub key: String,
    pub value: SettingValue,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct DbSystemSetting {
    pub key: String,
    pub kind: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DbSystemSetting> for SystemSetting {
    type Error = AppError;

    fn try_from(value: DbSystemSetting) -> Result<Self, Self::Error> {
        Ok(SystemSetting {
            key: value.key,
            value: SettingValue::decode(&value.kind, &value.value)?,
            updated_at: value.updated_at,
        })
    }
}
