//! Service wiring: token issuer/validator and the use-case services over their directories.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;

use gondola_auth::{
    Account, AccountDirectory, AccountError, AccountService, AccountSummary, Cnpj, DirectoryError,
    Hs256JwtValidator, JwtValidator, NewAccount, Organization, OrganizationDirectory,
    OrganizationService, PasswordError, Role, TokenError, TokenIssuer, spawn_hash_password,
};
use gondola_core::TenantId;

use crate::config::{AuthConfig, BootstrapAdmin};

#[derive(Debug, Error)]
pub enum ServiceBuildError {
    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Password(#[from] PasswordError),
}

/// Everything the router needs, built once at startup.
#[derive(Clone)]
pub struct AppServices {
    pub accounts: Arc<AccountService>,
    pub organizations: Arc<OrganizationService>,
    pub jwt: Arc<dyn JwtValidator>,
    pub request_timeout: Duration,
}

pub fn build_services(
    auth: &AuthConfig,
    accounts: Arc<dyn AccountDirectory>,
    organizations: Arc<dyn OrganizationDirectory>,
    request_timeout: Duration,
) -> Result<AppServices, ServiceBuildError> {
    let issuer = TokenIssuer::new(auth.secret(), auth.token_ttl())?;
    let jwt: Arc<dyn JwtValidator> = Arc::new(Hs256JwtValidator::new(auth.secret())?);
    let account_service = Arc::new(AccountService::new(accounts, organizations.clone(), issuer)?);
    let organization_service = Arc::new(OrganizationService::new(organizations, Arc::new(Cnpj)));

    Ok(AppServices {
        accounts: account_service,
        organizations: organization_service,
        jwt,
        request_timeout,
    })
}

/// Create the bootstrap `admin` account, and its organization when the slug is
/// not taken yet.
///
/// Returns `None` when an account with that email already exists.
pub async fn seed_admin(
    accounts: &dyn AccountDirectory,
    organizations: &dyn OrganizationDirectory,
    admin: &BootstrapAdmin,
    now: DateTime<Utc>,
) -> Result<Option<AccountSummary>, AccountError> {
    let mut new = NewAccount {
        tenant_id: TenantId::new(),
        store_id: None,
        name: "Administrator".to_string(),
        email: admin.email.clone(),
        phone: None,
        password: admin.password.clone(),
        role: Role::Admin,
        timezone: None,
        language: None,
    };
    new.validate()?;

    let organization = match organizations.find_by_slug(&admin.organization_slug).await? {
        Some(existing) => existing,
        None => {
            let created = Organization::bootstrap(&admin.organization_name, &admin.organization_slug, now);
            organizations.insert(created.clone()).await?;
            tracing::info!(organization_id = %created.id, slug = %created.slug, "bootstrap organization created");
            created
        }
    };
    new.tenant_id = organization.id;

    let password_hash = spawn_hash_password(new.password.clone()).await?;
    let account = Account::from_registration(new, password_hash, now);
    let summary = account.summary();

    match accounts.insert(account).await {
        Ok(()) => Ok(Some(summary)),
        Err(DirectoryError::EmailTaken) => Ok(None),
        Err(err) => Err(err.into()),
    }
}
