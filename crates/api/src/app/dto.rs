
use serde::{Deserialize, Serialize};

use gondola_auth::{
    AccountStatus, AccountSummary, LoginOutcome, NewAccount, NewOrganization, OrganizationPlan,
    OrganizationSector, Role,
};
use gondola_core::{StoreId, TenantId, UserId};

use crate::context::AuthContext;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct RegisterAccountRequest {
    /// Defaults to the caller's organization.
    pub organization_id: Option<TenantId>,
    pub store_id: Option<StoreId>,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password: String,
    pub role: Role,
    pub timezone: Option<String>,
    pub language: Option<String>,
}

impl RegisterAccountRequest {
    pub fn into_new_account(self, caller_tenant: TenantId) -> NewAccount {
        NewAccount {
            tenant_id: self.organization_id.unwrap_or(caller_tenant),
            store_id: self.store_id,
            name: self.name,
            email: self.email,
            phone: self.phone,
            password: self.password,
            role: self.role,
            timezone: self.timezone,
            language: self.language,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: AccountStatus,
}

#[derive(Debug, Deserialize)]
pub struct CreateOrganizationRequest {
    pub name: String,
    /// Tax id (CNPJ), formatted or digits only.
    pub document: String,
    pub slug: String,
    pub sector: OrganizationSector,
    #[serde(default)]
    pub plan: OrganizationPlan,
}

impl From<CreateOrganizationRequest> for NewOrganization {
    fn from(req: CreateOrganizationRequest) -> Self {
        Self {
            name: req.name,
            document: req.document,
            slug: req.slug,
            sector: req.sector,
            plan: req.plan,
        }
    }
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub user: AccountSummary,
}

impl From<LoginOutcome> for LoginResponse {
    fn from(outcome: LoginOutcome) -> Self {
        Self {
            access_token: outcome.token.token,
            token_type: "Bearer",
            expires_in: outcome.token.expires_in,
            user: outcome.account,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user_id: UserId,
    pub organization_id: TenantId,
    pub role: String,
}

impl From<&AuthContext> for MeResponse {
    fn from(ctx: &AuthContext) -> Self {
        Self {
            user_id: ctx.subject_id(),
            organization_id: ctx.tenant_id(),
            role: ctx.role_str().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_defaults_to_the_caller_tenant() {
        let caller = TenantId::new();
        let request: RegisterAccountRequest = serde_json::from_value(serde_json::json!({
            "name": "Bia",
            "email": "bia@example.com",
            "password": "Secr3t!",
            "role": "operator",
        }))
        .unwrap();

        let new = request.into_new_account(caller);
        assert_eq!(new.tenant_id, caller);
        assert_eq!(new.role, Role::Operator);
    }

    #[test]
    fn unknown_roles_and_statuses_do_not_deserialize() {
        let request = serde_json::from_value::<RegisterAccountRequest>(serde_json::json!({
            "name": "Bia",
            "email": "bia@example.com",
            "password": "Secr3t!",
            "role": "superuser",
        }));
        assert!(request.is_err());

        let status = serde_json::from_value::<UpdateStatusRequest>(serde_json::json!({ "status": "deleted" }));
        assert!(status.is_err());
    }

    #[test]
    fn organization_plan_defaults_to_free() {
        let request: CreateOrganizationRequest = serde_json::from_value(serde_json::json!({
            "name": "Mercado Central",
            "document": "11.222.333/0001-81",
            "slug": "mercado-central",
            "sector": "supermarket",
        }))
        .unwrap();

        let new = NewOrganization::from(request);
        assert_eq!(new.plan, OrganizationPlan::Free);
        assert_eq!(new.sector, OrganizationSector::Supermarket);
    }
}
