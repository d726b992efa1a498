//! Directory ports for accounts and organizations, with in-memory adapters.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use thiserror::Error;

use gondola_core::{TenantId, UserId};

use crate::account::{Account, AccountStatus, normalize_email};
use crate::organization::{Organization, normalize_slug};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("email is already registered")]
    EmailTaken,

    #[error("organization slug is already taken")]
    SlugTaken,

    #[error("account directory failure: {0}")]
    Backend(String),
}

impl DirectoryError {
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}

/// Lookup and persistence of accounts.
///
/// Implementations receive emails already normalized by the caller but must
/// treat them case-insensitively anyway.
#[async_trait::async_trait]
pub trait AccountDirectory: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, DirectoryError>;

    async fn find_by_id(&self, id: UserId) -> Result<Option<Account>, DirectoryError>;

    /// Insert a new account; fails with [`DirectoryError::EmailTaken`] on a duplicate email.
    async fn insert(&self, account: Account) -> Result<(), DirectoryError>;

    /// Change an account's status, returning the updated account if it exists.
    async fn update_status(
        &self,
        id: UserId,
        status: AccountStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<Account>, DirectoryError>;
}

/// In-memory directory for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryAccountDirectory {
    inner: RwLock<Accounts>,
}

#[derive(Debug, Default)]
struct Accounts {
    by_id: HashMap<UserId, Account>,
    id_by_email: HashMap<String, UserId>,
}

impl InMemoryAccountDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|a| a.by_id.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> DirectoryError {
    DirectoryError::backend("in-memory directory lock poisoned")
}

#[async_trait::async_trait]
impl AccountDirectory for InMemoryAccountDirectory {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, DirectoryError> {
        let accounts = self.inner.read().map_err(|_| poisoned())?;
        Ok(accounts
            .id_by_email
            .get(&normalize_email(email))
            .and_then(|id| accounts.by_id.get(id))
            .cloned())
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<Account>, DirectoryError> {
        let accounts = self.inner.read().map_err(|_| poisoned())?;
        Ok(accounts.by_id.get(&id).cloned())
    }

    async fn insert(&self, account: Account) -> Result<(), DirectoryError> {
        let mut accounts = self.inner.write().map_err(|_| poisoned())?;
        let email = normalize_email(&account.email);
        if accounts.id_by_email.contains_key(&email) {
            return Err(DirectoryError::EmailTaken);
        }
        accounts.id_by_email.insert(email, account.id);
        accounts.by_id.insert(account.id, account);
        Ok(())
    }

    async fn update_status(
        &self,
        id: UserId,
        status: AccountStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<Account>, DirectoryError> {
        let mut accounts = self.inner.write().map_err(|_| poisoned())?;
        Ok(accounts.by_id.get_mut(&id).map(|account| {
            account.status = status;
            account.updated_at = now;
            account.clone()
        }))
    }
}

/// Lookup and persistence of organizations.
#[async_trait::async_trait]
pub trait OrganizationDirectory: Send + Sync {
    async fn find_by_id(&self, id: TenantId) -> Result<Option<Organization>, DirectoryError>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Organization>, DirectoryError>;

    /// Insert a new organization; fails with [`DirectoryError::SlugTaken`] on a duplicate slug.
    async fn insert(&self, organization: Organization) -> Result<(), DirectoryError>;
}

#[derive(Debug, Default)]
pub struct InMemoryOrganizationDirectory {
    inner: RwLock<Organizations>,
}

#[derive(Debug, Default)]
struct Organizations {
    by_id: HashMap<TenantId, Organization>,
    id_by_slug: HashMap<String, TenantId>,
}

impl InMemoryOrganizationDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|o| o.by_id.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait::async_trait]
impl OrganizationDirectory for InMemoryOrganizationDirectory {
    async fn find_by_id(&self, id: TenantId) -> Result<Option<Organization>, DirectoryError> {
        let organizations = self.inner.read().map_err(|_| poisoned())?;
        Ok(organizations.by_id.get(&id).cloned())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Organization>, DirectoryError> {
        let organizations = self.inner.read().map_err(|_| poisoned())?;
        Ok(organizations
            .id_by_slug
            .get(&normalize_slug(slug))
            .and_then(|id| organizations.by_id.get(id))
            .cloned())
    }

    async fn insert(&self, organization: Organization) -> Result<(), DirectoryError> {
        let mut organizations = self.inner.write().map_err(|_| poisoned())?;
        let slug = normalize_slug(&organization.slug);
        if organizations.id_by_slug.contains_key(&slug) {
            return Err(DirectoryError::SlugTaken);
        }
        organizations.id_by_slug.insert(slug, organization.id);
        organizations.by_id.insert(organization.id, organization);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{NewAccount, Role};

    fn account(email: &str) -> Account {
        let new = NewAccount {
            tenant_id: TenantId::new(),
            store_id: None,
            name: "Test".to_string(),
            email: email.to_string(),
            phone: None,
            password: "unused".to_string(),
            role: Role::Operator,
            timezone: None,
            language: None,
        };
        Account::from_registration(new, "hash".to_string(), Utc::now())
    }

    #[tokio::test]
    async fn insert_then_find_case_insensitively() {
        let dir = InMemoryAccountDirectory::new();
        let a = account("u@example.com");
        dir.insert(a.clone()).await.unwrap();

        assert_eq!(dir.find_by_email("U@Example.COM").await.unwrap(), Some(a.clone()));
        assert_eq!(dir.find_by_id(a.id).await.unwrap(), Some(a));
        assert_eq!(dir.find_by_email("ghost@example.com").await.unwrap(), None);
        assert_eq!(dir.len(), 1);
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let dir = InMemoryAccountDirectory::new();
        dir.insert(account("u@example.com")).await.unwrap();

        assert_eq!(
            dir.insert(account("u@example.com")).await,
            Err(DirectoryError::EmailTaken)
        );
        assert_eq!(dir.len(), 1);
    }

    #[tokio::test]
    async fn update_status_touches_only_the_target() {
        let dir = InMemoryAccountDirectory::new();
        let a = account("a@example.com");
        let b = account("b@example.com");
        dir.insert(a.clone()).await.unwrap();
        dir.insert(b.clone()).await.unwrap();

        let updated = dir
            .update_status(a.id, AccountStatus::Suspended, Utc::now())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, AccountStatus::Suspended);
        assert_eq!(dir.find_by_id(b.id).await.unwrap().unwrap().status, AccountStatus::Active);

        assert_eq!(
            dir.update_status(UserId::new(), AccountStatus::Active, Utc::now()).await,
            Ok(None)
        );
    }

    #[tokio::test]
    async fn organization_slugs_are_unique_case_insensitively() {
        let dir = InMemoryOrganizationDirectory::new();
        let org = Organization::bootstrap("Platform", "platform", Utc::now());
        dir.insert(org.clone()).await.unwrap();

        assert_eq!(dir.find_by_slug("PLATFORM").await.unwrap(), Some(org.clone()));
        assert_eq!(dir.find_by_id(org.id).await.unwrap(), Some(org));
        assert_eq!(dir.find_by_id(TenantId::new()).await.unwrap(), None);

        let again = Organization::bootstrap("Other", "Platform", Utc::now());
        assert_eq!(dir.insert(again).await, Err(DirectoryError::SlugTaken));
        assert_eq!(dir.len(), 1);
    }
}
