//! Use cases: login, account registration and status changes, organizations.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

use gondola_core::{DomainError, TenantId, UserId};

use crate::account::{Account, AccountStatus, AccountSummary, NewAccount, normalize_email};
use crate::directory::{AccountDirectory, DirectoryError, OrganizationDirectory};
use crate::organization::{NewOrganization, Organization, TaxIdValidator};
use crate::password::{PasswordError, hash_password, spawn_hash_password, spawn_verify_password};
use crate::token::{IssuedToken, TokenError, TokenIssuer};
use crate::Role;

/// Hashed once at startup; verified against when the email is unknown so both
/// rejection paths pay for one Argon2 verification.
const DUMMY_PASSWORD: &str = "gondola-timing-equalizer";

#[derive(Debug, Error)]
pub enum LoginError {
    /// Unknown email or wrong password. Deliberately indistinguishable.
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("account not active")]
    AccountNotActive(AccountStatus),

    #[error(transparent)]
    Directory(#[from] DirectoryError),

    /// The stored hash could not be read; a data fault, not a bad password.
    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Token(#[from] TokenError),
}

#[derive(Debug, Error)]
pub enum AccountError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Directory(DirectoryError),
}

impl From<DirectoryError> for AccountError {
    fn from(value: DirectoryError) -> Self {
        match value {
            DirectoryError::EmailTaken => {
                AccountError::Domain(DomainError::conflict("email already registered"))
            }
            other => AccountError::Directory(other),
        }
    }
}

#[derive(Debug, Error)]
pub enum OrganizationError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Directory(DirectoryError),
}

impl From<DirectoryError> for OrganizationError {
    fn from(value: DirectoryError) -> Self {
        match value {
            DirectoryError::SlugTaken => {
                OrganizationError::Domain(DomainError::conflict("slug already in use"))
            }
            other => OrganizationError::Directory(other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub token: IssuedToken,
    pub account: AccountSummary,
}

/// The authenticated caller of an account-management operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub subject: UserId,
    pub tenant_id: TenantId,
    pub role: Role,
}

impl Actor {
    fn sees(&self, account: &Account) -> bool {
        self.role == Role::Admin || self.tenant_id == account.tenant_id
    }
}

pub struct AccountService {
    directory: Arc<dyn AccountDirectory>,
    organizations: Arc<dyn OrganizationDirectory>,
    issuer: TokenIssuer,
    dummy_hash: String,
}

impl AccountService {
    pub fn new(
        directory: Arc<dyn AccountDirectory>,
        organizations: Arc<dyn OrganizationDirectory>,
        issuer: TokenIssuer,
    ) -> Result<Self, PasswordError> {
        Ok(Self {
            directory,
            organizations,
            issuer,
            dummy_hash: hash_password(DUMMY_PASSWORD)?,
        })
    }

    /// Verify credentials and issue an access token.
    ///
    /// Unknown email and wrong password both end in
    /// [`LoginError::InvalidCredentials`]; only the log line tells them apart.
    #[tracing::instrument(skip_all)]
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<LoginOutcome, LoginError> {
        let email = normalize_email(email);

        let Some(account) = self.directory.find_by_email(&email).await? else {
            let _ = spawn_verify_password(password.to_string(), self.dummy_hash.clone()).await;
            tracing::info!(reason = "unknown_email", "login rejected");
            return Err(LoginError::InvalidCredentials);
        };

        match spawn_verify_password(password.to_string(), account.password_hash.clone()).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::info!(reason = "password_mismatch", account_id = %account.id, "login rejected");
                return Err(LoginError::InvalidCredentials);
            }
            Err(err) => {
                tracing::error!(account_id = %account.id, error = %err, "stored password hash unreadable");
                return Err(LoginError::Password(err));
            }
        }

        if !account.is_active() {
            tracing::info!(reason = "inactive", account_id = %account.id, status = %account.status, "login rejected");
            return Err(LoginError::AccountNotActive(account.status));
        }

        let token = self.issuer.issue(account.id, account.tenant_id, account.role, now)?;
        tracing::info!(account_id = %account.id, tenant_id = %account.tenant_id, role = %account.role, "login succeeded");

        Ok(LoginOutcome {
            token,
            account: account.summary(),
        })
    }

    /// Register a new account on behalf of `actor`.
    ///
    /// Non-admins register only into their own tenant, and nobody grants a role
    /// above their own (or `admin`). The target organization must exist and be
    /// active.
    #[tracing::instrument(skip_all, fields(actor = %actor.subject))]
    pub async fn register(
        &self,
        actor: Actor,
        new: NewAccount,
        now: DateTime<Utc>,
    ) -> Result<AccountSummary, AccountError> {
        new.validate()?;

        if !actor.role.can_grant(new.role) {
            return Err(DomainError::Unauthorized.into());
        }
        if actor.role != Role::Admin && new.tenant_id != actor.tenant_id {
            return Err(DomainError::Unauthorized.into());
        }

        match self.organizations.find_by_id(new.tenant_id).await? {
            Some(org) if org.is_active => {}
            Some(_) => return Err(DomainError::validation("organization is not active").into()),
            None => return Err(DomainError::validation("unknown organization").into()),
        }

        let password_hash = spawn_hash_password(new.password.clone()).await?;
        let account = Account::from_registration(new, password_hash, now);
        let summary = account.summary();
        self.directory.insert(account).await?;

        tracing::info!(account_id = %summary.id, tenant_id = %summary.organization_id, role = %summary.role, "account registered");
        Ok(summary)
    }

    /// Change the status of an account visible to `actor`.
    ///
    /// Accounts outside the actor's tenant are reported as not found.
    #[tracing::instrument(skip_all, fields(actor = %actor.subject, target = %id))]
    pub async fn set_status(
        &self,
        actor: Actor,
        id: UserId,
        status: AccountStatus,
        now: DateTime<Utc>,
    ) -> Result<AccountSummary, AccountError> {
        if id == actor.subject {
            return Err(DomainError::validation("cannot change own account status").into());
        }

        let account = self
            .directory
            .find_by_id(id)
            .await?
            .filter(|a| actor.sees(a))
            .ok_or_else(DomainError::not_found)?;

        if actor.role != Role::Admin && !actor.role.can_grant(account.role) {
            return Err(DomainError::Unauthorized.into());
        }

        let updated = self
            .directory
            .update_status(id, status, now)
            .await?
            .ok_or_else(DomainError::not_found)?;

        tracing::info!(status = %updated.status, "account status changed");
        Ok(updated.summary())
    }
}

pub struct OrganizationService {
    directory: Arc<dyn OrganizationDirectory>,
    tax_ids: Arc<dyn TaxIdValidator>,
}

impl OrganizationService {
    pub fn new(directory: Arc<dyn OrganizationDirectory>, tax_ids: Arc<dyn TaxIdValidator>) -> Self {
        Self { directory, tax_ids }
    }

    /// Create a tenant. Platform admins only.
    #[tracing::instrument(skip_all, fields(actor = %actor.subject))]
    pub async fn create(
        &self,
        actor: Actor,
        new: NewOrganization,
        now: DateTime<Utc>,
    ) -> Result<Organization, OrganizationError> {
        if actor.role != Role::Admin {
            return Err(DomainError::Unauthorized.into());
        }
        new.validate(self.tax_ids.as_ref())?;

        let organization = Organization::from_registration(new, now);
        self.directory.insert(organization.clone()).await?;

        tracing::info!(organization_id = %organization.id, slug = %organization.slug, plan = organization.plan.as_str(), "organization created");
        Ok(organization)
    }

    /// Fetch an organization. Non-admins only see their own.
    pub async fn get(&self, actor: Actor, id: TenantId) -> Result<Organization, OrganizationError> {
        if actor.role != Role::Admin && actor.tenant_id != id {
            return Err(DomainError::NotFound.into());
        }
        self.directory
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::NotFound.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::organization::{Cnpj, OrganizationPlan, OrganizationSector};
    use crate::{Hs256JwtValidator, InMemoryAccountDirectory, InMemoryOrganizationDirectory, JwtValidator};
    use chrono::Duration;
    use std::time::Instant;

    const SECRET: &[u8] = b"service-test-secret";

    struct Fixture {
        service: AccountService,
        directory: Arc<InMemoryAccountDirectory>,
        organizations: Arc<InMemoryOrganizationDirectory>,
        tenant: TenantId,
    }

    fn registration(tenant: TenantId, email: &str, role: Role) -> NewAccount {
        NewAccount {
            tenant_id: tenant,
            store_id: None,
            name: "Test User".to_string(),
            email: email.to_string(),
            phone: None,
            password: "Secr3t!".to_string(),
            role,
            timezone: None,
            language: None,
        }
    }

    async fn seed(directory: &InMemoryAccountDirectory, new: NewAccount, status: AccountStatus) -> Account {
        let hash = hash_password(&new.password).unwrap();
        let mut account = Account::from_registration(new, hash, Utc::now());
        account.status = status;
        directory.insert(account.clone()).await.unwrap();
        account
    }

    async fn fixture() -> Fixture {
        let directory = Arc::new(InMemoryAccountDirectory::new());
        let organizations = Arc::new(InMemoryOrganizationDirectory::new());
        let org = Organization::bootstrap("Acme", "acme", Utc::now());
        let tenant = org.id;
        organizations.insert(org).await.unwrap();

        let issuer = TokenIssuer::new(SECRET, Duration::hours(24)).unwrap();
        let service = AccountService::new(directory.clone(), organizations.clone(), issuer).unwrap();
        Fixture {
            service,
            directory,
            organizations,
            tenant,
        }
    }

    fn actor(tenant: TenantId, role: Role) -> Actor {
        Actor {
            subject: UserId::new(),
            tenant_id: tenant,
            role,
        }
    }

    #[tokio::test]
    async fn login_issues_token_for_active_account() {
        let f = fixture().await;
        let account = seed(
            &f.directory,
            registration(f.tenant, "u@example.com", Role::Manager),
            AccountStatus::Active,
        )
        .await;

        let now = Utc::now();
        let outcome = f.service.login("u@example.com", "Secr3t!", now).await.unwrap();

        assert!(!outcome.token.token.is_empty());
        assert_eq!(outcome.token.expires_in, 24 * 3600);
        assert_eq!(outcome.account.id, account.id);

        let claims = Hs256JwtValidator::new(SECRET)
            .unwrap()
            .validate(&outcome.token.token, now)
            .unwrap();
        assert_eq!(claims.subject_id().unwrap(), account.id);
        assert_eq!(claims.tenant_id().unwrap(), f.tenant);
        assert_eq!(claims.role, "manager");
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_look_identical() {
        let f = fixture().await;
        seed(
            &f.directory,
            registration(f.tenant, "u@example.com", Role::Operator),
            AccountStatus::Active,
        )
        .await;

        let wrong = f.service.login("u@example.com", "wrong", Utc::now()).await.unwrap_err();
        let ghost = f.service.login("ghost@example.com", "Secr3t!", Utc::now()).await.unwrap_err();

        assert!(matches!(wrong, LoginError::InvalidCredentials));
        assert!(matches!(ghost, LoginError::InvalidCredentials));
        assert_eq!(wrong.to_string(), ghost.to_string());
    }

    #[tokio::test]
    async fn inactive_accounts_get_no_token() {
        let f = fixture().await;
        seed(
            &f.directory,
            registration(f.tenant, "s@example.com", Role::Operator),
            AccountStatus::Suspended,
        )
        .await;
        seed(
            &f.directory,
            registration(f.tenant, "p@example.com", Role::Operator),
            AccountStatus::Pending,
        )
        .await;

        assert!(matches!(
            f.service.login("s@example.com", "Secr3t!", Utc::now()).await,
            Err(LoginError::AccountNotActive(AccountStatus::Suspended))
        ));
        assert!(matches!(
            f.service.login("p@example.com", "Secr3t!", Utc::now()).await,
            Err(LoginError::AccountNotActive(AccountStatus::Pending))
        ));
    }

    #[tokio::test]
    async fn inactive_check_runs_after_password_check() {
        let f = fixture().await;
        seed(
            &f.directory,
            registration(f.tenant, "s@example.com", Role::Operator),
            AccountStatus::Suspended,
        )
        .await;

        assert!(matches!(
            f.service.login("s@example.com", "wrong", Utc::now()).await,
            Err(LoginError::InvalidCredentials)
        ));
    }

    struct FailingDirectory;

    #[async_trait::async_trait]
    impl AccountDirectory for FailingDirectory {
        async fn find_by_email(&self, _email: &str) -> Result<Option<Account>, DirectoryError> {
            Err(DirectoryError::backend("connection refused"))
        }

        async fn find_by_id(&self, _id: UserId) -> Result<Option<Account>, DirectoryError> {
            Err(DirectoryError::backend("connection refused"))
        }

        async fn insert(&self, _account: Account) -> Result<(), DirectoryError> {
            Err(DirectoryError::backend("connection refused"))
        }

        async fn update_status(
            &self,
            _id: UserId,
            _status: AccountStatus,
            _now: DateTime<Utc>,
        ) -> Result<Option<Account>, DirectoryError> {
            Err(DirectoryError::backend("connection refused"))
        }
    }

    #[tokio::test]
    async fn directory_failure_is_not_an_auth_failure() {
        let issuer = TokenIssuer::new(SECRET, Duration::hours(1)).unwrap();
        let service = AccountService::new(
            Arc::new(FailingDirectory),
            Arc::new(InMemoryOrganizationDirectory::new()),
            issuer,
        )
        .unwrap();

        assert!(matches!(
            service.login("u@example.com", "Secr3t!", Utc::now()).await,
            Err(LoginError::Directory(DirectoryError::Backend(_)))
        ));
    }

    #[tokio::test]
    async fn tenant_owner_registers_into_own_tenant_only() {
        let f = fixture().await;
        let owner = actor(f.tenant, Role::TenantOwner);

        let summary = f
            .service
            .register(owner, registration(f.tenant, "New@Example.com", Role::Operator), Utc::now())
            .await
            .unwrap();
        assert_eq!(summary.email, "new@example.com");
        assert_eq!(summary.organization_id, f.tenant);

        let other = f
            .service
            .register(owner, registration(TenantId::new(), "x@example.com", Role::Operator), Utc::now())
            .await;
        assert!(matches!(other, Err(AccountError::Domain(DomainError::Unauthorized))));
    }

    #[tokio::test]
    async fn nobody_registers_an_admin() {
        let f = fixture().await;
        let admin = actor(f.tenant, Role::Admin);

        let result = f
            .service
            .register(admin, registration(f.tenant, "root@example.com", Role::Admin), Utc::now())
            .await;
        assert!(matches!(result, Err(AccountError::Domain(DomainError::Unauthorized))));
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let f = fixture().await;
        let admin = actor(f.tenant, Role::Admin);
        f.service
            .register(admin, registration(f.tenant, "dup@example.com", Role::Manager), Utc::now())
            .await
            .unwrap();

        let again = f
            .service
            .register(admin, registration(f.tenant, "DUP@example.com", Role::Manager), Utc::now())
            .await;
        assert!(matches!(again, Err(AccountError::Domain(DomainError::Conflict(_)))));
    }

    #[tokio::test]
    async fn invalid_registration_is_rejected_before_hashing() {
        let f = fixture().await;
        let mut new = registration(f.tenant, "short@example.com", Role::Manager);
        new.password = "123".to_string();

        let result = f.service.register(actor(f.tenant, Role::Admin), new, Utc::now()).await;
        assert!(matches!(result, Err(AccountError::Domain(DomainError::Validation(_)))));
        assert!(f.directory.is_empty());
    }

    #[tokio::test]
    async fn suspension_blocks_later_logins() {
        let f = fixture().await;
        let account = seed(
            &f.directory,
            registration(f.tenant, "op@example.com", Role::Operator),
            AccountStatus::Active,
        )
        .await;

        let owner = actor(f.tenant, Role::TenantOwner);
        let updated = f
            .service
            .set_status(owner, account.id, AccountStatus::Suspended, Utc::now())
            .await
            .unwrap();
        assert_eq!(updated.status, AccountStatus::Suspended);

        assert!(matches!(
            f.service.login("op@example.com", "Secr3t!", Utc::now()).await,
            Err(LoginError::AccountNotActive(AccountStatus::Suspended))
        ));
    }

    #[tokio::test]
    async fn other_tenants_accounts_are_invisible() {
        let f = fixture().await;
        let account = seed(
            &f.directory,
            registration(f.tenant, "op@example.com", Role::Operator),
            AccountStatus::Active,
        )
        .await;

        let outsider = actor(TenantId::new(), Role::TenantOwner);
        let result = f
            .service
            .set_status(outsider, account.id, AccountStatus::Suspended, Utc::now())
            .await;
        assert!(matches!(result, Err(AccountError::Domain(DomainError::NotFound))));
    }

    #[tokio::test]
    async fn own_status_cannot_be_changed() {
        let f = fixture().await;
        let account = seed(
            &f.directory,
            registration(f.tenant, "owner@example.com", Role::TenantOwner),
            AccountStatus::Active,
        )
        .await;

        let me = Actor {
            subject: account.id,
            tenant_id: f.tenant,
            role: Role::TenantOwner,
        };
        let result = f.service.set_status(me, account.id, AccountStatus::Suspended, Utc::now()).await;
        assert!(matches!(result, Err(AccountError::Domain(DomainError::Validation(_)))));
    }

    #[tokio::test]
    async fn unreadable_stored_hash_is_a_fault_not_bad_credentials() {
        let f = fixture().await;
        let new = registration(f.tenant, "broken@example.com", Role::Operator);
        let account = Account::from_registration(new, "corrupted-hash".to_string(), Utc::now());
        f.directory.insert(account).await.unwrap();

        let result = f.service.login("broken@example.com", "Secr3t!", Utc::now()).await;
        assert!(matches!(result, Err(LoginError::Password(PasswordError::InvalidHashFormat))));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn login_hashing_leaves_the_runtime_thread_free() {
        let f = fixture().await;
        seed(
            &f.directory,
            registration(f.tenant, "u@example.com", Role::Operator),
            AccountStatus::Active,
        )
        .await;

        let (finished_at, ticked_at) = tokio::join!(
            async {
                let _ = f.service.login("u@example.com", "wrong", Utc::now()).await;
                Instant::now()
            },
            async {
                tokio::task::yield_now().await;
                Instant::now()
            },
        );
        assert!(ticked_at < finished_at);
    }

    #[tokio::test]
    async fn registration_requires_an_active_organization() {
        let f = fixture().await;
        let admin = actor(f.tenant, Role::Admin);

        let unknown = f
            .service
            .register(admin, registration(TenantId::new(), "x@example.com", Role::Manager), Utc::now())
            .await;
        assert!(matches!(unknown, Err(AccountError::Domain(DomainError::Validation(_)))));

        let mut dormant = Organization::bootstrap("Dormant", "dormant", Utc::now());
        dormant.is_active = false;
        let dormant_id = dormant.id;
        f.organizations.insert(dormant).await.unwrap();
        let inactive = f
            .service
            .register(admin, registration(dormant_id, "y@example.com", Role::Manager), Utc::now())
            .await;
        assert!(matches!(inactive, Err(AccountError::Domain(DomainError::Validation(_)))));
        assert!(f.directory.is_empty());
    }

    fn organization_service() -> OrganizationService {
        OrganizationService::new(Arc::new(InMemoryOrganizationDirectory::new()), Arc::new(Cnpj))
    }

    fn new_organization(slug: &str, document: &str) -> NewOrganization {
        NewOrganization {
            name: "Farmacia Sul".to_string(),
            document: document.to_string(),
            slug: slug.to_string(),
            sector: OrganizationSector::Pharmacy,
            plan: OrganizationPlan::Free,
        }
    }

    #[tokio::test]
    async fn admins_create_organizations_with_valid_tax_ids() {
        let service = organization_service();
        let admin = actor(TenantId::new(), Role::Admin);

        let org = service
            .create(admin, new_organization("farmacia-sul", "11.444.777/0001-61"), Utc::now())
            .await
            .unwrap();
        assert_eq!(org.document, "11444777000161");
        assert_eq!(service.get(admin, org.id).await.unwrap(), org);

        let bad = service
            .create(admin, new_organization("other", "11444777000162"), Utc::now())
            .await;
        assert!(matches!(bad, Err(OrganizationError::Domain(DomainError::Validation(_)))));

        let dup = service
            .create(admin, new_organization("Farmacia-Sul", "11222333000181"), Utc::now())
            .await;
        assert!(matches!(dup, Err(OrganizationError::Domain(DomainError::Conflict(_)))));
    }

    #[tokio::test]
    async fn only_admins_create_and_others_see_their_own() {
        let service = organization_service();
        let admin = actor(TenantId::new(), Role::Admin);
        let org = service
            .create(admin, new_organization("farmacia-sul", "11444777000161"), Utc::now())
            .await
            .unwrap();

        let owner = actor(org.id, Role::TenantOwner);
        let denied = service
            .create(owner, new_organization("mine", "11222333000181"), Utc::now())
            .await;
        assert!(matches!(denied, Err(OrganizationError::Domain(DomainError::Unauthorized))));

        assert_eq!(service.get(owner, org.id).await.unwrap().id, org.id);
        let outsider = actor(TenantId::new(), Role::TenantOwner);
        assert!(matches!(
            service.get(outsider, org.id).await,
            Err(OrganizationError::Domain(DomainError::NotFound))
        ));
        assert!(matches!(
            service.get(admin, TenantId::new()).await,
            Err(OrganizationError::Domain(DomainError::NotFound))
        ));
    }
}
