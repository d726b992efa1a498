use gondola_auth::{Actor, Role};
use gondola_core::{TenantId, UserId};

/// Authenticated identity for a request.
///
/// Inserted into request extensions by the auth middleware only after the token
/// verified and its ids parsed. The role is kept exactly as the token carried it;
/// a role outside the known set is never permitted by any gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    subject_id: UserId,
    tenant_id: TenantId,
    role: String,
}

impl AuthContext {
    pub(crate) fn new(subject_id: UserId, tenant_id: TenantId, role: String) -> Self {
        Self {
            subject_id,
            tenant_id,
            role,
        }
    }

    pub fn subject_id(&self) -> UserId {
        self.subject_id
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn role_str(&self) -> &str {
        &self.role
    }

    /// The role, if it is one of the known roles.
    pub fn role(&self) -> Option<Role> {
        self.role.parse().ok()
    }

    pub fn actor(&self) -> Option<Actor> {
        Some(Actor {
            subject: self.subject_id,
            tenant_id: self.tenant_id,
            role: self.role()?,
        })
    }
}
