use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Role identifier used for RBAC.
///
/// The set is closed: every role a token may legitimately carry is listed here.
/// Tokens are still allowed to carry other strings; they simply match no gate.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Platform administrator (operates the SaaS itself).
    #[serde(rename = "admin")]
    Admin,
    /// Owner of a customer organization.
    #[serde(rename = "tenant-owner")]
    TenantOwner,
    /// Store manager.
    #[serde(rename = "manager")]
    Manager,
    /// Store operator.
    #[serde(rename = "operator")]
    Operator,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

impl Role {
    pub const ALL: [Role; 4] = [Role::Admin, Role::TenantOwner, Role::Manager, Role::Operator];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::TenantOwner => "tenant-owner",
            Role::Manager => "manager",
            Role::Operator => "operator",
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Role::Admin => 3,
            Role::TenantOwner => 2,
            Role::Manager => 1,
            Role::Operator => 0,
        }
    }

    /// Whether an actor holding `self` may hand `target` to another account.
    ///
    /// Nobody grants `admin`, and nobody grants above their own rank.
    pub fn can_grant(&self, target: Role) -> bool {
        target != Role::Admin && self.rank() >= target.rank()
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

/// Static per-route allow-list.
///
/// Built once at router wiring time and shared (cheaply cloned) by every request
/// that passes through the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowedRoles(Arc<[Role]>);

impl AllowedRoles {
    pub fn new(roles: impl IntoIterator<Item = Role>) -> Self {
        let mut ordered: Vec<Role> = Vec::new();
        for role in roles {
            if !ordered.contains(&role) {
                ordered.push(role);
            }
        }
        Self(ordered.into())
    }

    pub fn roles(&self) -> &[Role] {
        &self.0
    }

    /// Membership test shared by every role gate.
    ///
    /// Exact, case-sensitive comparison against the wire form of each role.
    pub fn permits(&self, role: &str) -> bool {
        self.0.iter().any(|allowed| allowed.as_str() == role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_round_trip_through_from_str() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("Admin".parse::<Role>().is_err());
        assert!("tenant".parse::<Role>().is_err());
    }

    #[test]
    fn serde_uses_wire_names() {
        let json = serde_json::to_string(&Role::TenantOwner).unwrap();
        assert_eq!(json, "\"tenant-owner\"");
        let back: Role = serde_json::from_str("\"operator\"").unwrap();
        assert_eq!(back, Role::Operator);
    }

    #[test]
    fn allow_list_matches_exactly() {
        let allowed = AllowedRoles::new([Role::Admin, Role::TenantOwner]);

        assert!(allowed.permits("admin"));
        assert!(allowed.permits("tenant-owner"));
        assert!(!allowed.permits("operator"));
        assert!(!allowed.permits("ADMIN"));
        assert!(!allowed.permits("admin "));
        assert!(!allowed.permits(""));
    }

    #[test]
    fn allow_list_keeps_first_occurrence_order() {
        let allowed = AllowedRoles::new([Role::Manager, Role::Admin, Role::Manager]);
        assert_eq!(allowed.roles(), &[Role::Manager, Role::Admin]);
    }

    #[test]
    fn empty_allow_list_permits_nothing() {
        let allowed = AllowedRoles::new([]);
        for role in Role::ALL {
            assert!(!allowed.permits(role.as_str()));
        }
    }

    #[test]
    fn grants_never_escalate() {
        assert!(Role::Admin.can_grant(Role::TenantOwner));
        assert!(!Role::Admin.can_grant(Role::Admin));
        assert!(Role::TenantOwner.can_grant(Role::Operator));
        assert!(!Role::Manager.can_grant(Role::TenantOwner));
        assert!(!Role::Operator.can_grant(Role::Manager));
    }
}
