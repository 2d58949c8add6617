use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of identity roles. Adding a role is a compile-time-checked
/// change at every match site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Vendor,
    Admin,
    CommunityManager,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Vendor => "vendor",
            Role::Admin => "admin",
            Role::CommunityManager => "community_manager",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "user" => Some(Role::User),
            "vendor" => Some(Role::Vendor),
            "admin" => Some(Role::Admin),
            "community_manager" => Some(Role::CommunityManager),
            _ => None,
        }
    }

    /// Vendor-level actions: creating listings/items, receiving bookings.
    /// Admins may act as vendors for support purposes.
    pub fn can_vend(&self) -> bool {
        match self {
            Role::Vendor | Role::Admin => true,
            Role::User | Role::CommunityManager => false,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
