pub mod activity;
pub mod activity_update;
pub mod audit_log;
pub mod setting;
pub mod user;

pub use activity::{Activity, DbActivity, NewActivity, Priority, Status};
pub use activity_update::{ActivityUpdate, DbActivityUpdate};
pub use audit_log::{AuditLog, DbAuditLog};
pub use setting::{DbSystemSetting, SettingValue, SystemSetting};
pub use user::{DbUser, NewUser, User};
