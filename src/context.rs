use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Actor context for mutating calls (who did it, from where).
/// The calling boundary fills this in; nothing here is derived internally.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActorContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl ActorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_user(user_id: Uuid) -> Self {
        Self {
            user_id: Some(user_id),
            ..Self::default()
        }
    }

    /// Anonymous context, e.g. a failed login where no user id resolves.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip = Some(ip.into());
        self
    }

    pub fn with_user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }
}
