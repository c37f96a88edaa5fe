//! Authorization check for activity updates.
//!
//! A capability/ownership predicate, not a full policy engine: the capability
//! set on a `Principal` is resolved by an external role/permission layer
//! before it reaches this module.

use std::collections::HashSet;

use uuid::Uuid;

use crate::models::Activity;

/// Well-known capability names
pub mod capabilities {
    pub const ACTIVITY_MANAGE: &str = "activity.manage";
    pub const AUDIT_VIEW: &str = "audit.view";
    pub const SETTINGS_MANAGE: &str = "settings.manage";
}

/// Principal represents an authenticated user with their resolved capabilities
#[derive(Debug, Clone)]
pub struct Principal {
    pub user_id: Uuid,
    pub capabilities: HashSet<String>,
}

impl Principal {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            capabilities: HashSet::new(),
        }
    }

    pub fn with_capabilities(mut self, caps: impl IntoIterator<Item = String>) -> Self {
        self.capabilities = caps.into_iter().collect();
        self
    }

    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.contains(capability)
    }
}

/// True iff the user may change the activity's status: they hold the
/// manage capability, created the activity, or are its assignee.
/// A missing (unauthenticated) user is always denied.
pub fn can_update(activity: &Activity, user: Option<&Principal>) -> bool {
    let user = match user {
        Some(u) => u,
        None => return false,
    };

    if user.has_capability(capabilities::ACTIVITY_MANAGE) {
        return true;
    }

    if user.user_id == activity.created_by {
        return true;
    }

    if activity.assigned_to == Some(user.user_id) {
        return true;
    }

    tracing::debug!(
        user_id = %user.user_id,
        activity_id = %activity.id,
        "activity update denied"
    );
    false
}
