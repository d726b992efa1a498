//! Account model consumed by the login path.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use gondola_core::{DomainError, StoreId, TenantId, UserId};

use crate::Role;

pub const MIN_PASSWORD_LEN: usize = 6;
pub const DEFAULT_TIMEZONE: &str = "UTC";
pub const DEFAULT_LANGUAGE: &str = "pt-BR";

/// Account lifecycle status. Only `Active` accounts may log in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    /// Waiting for approval.
    Pending,
    #[default]
    Active,
    /// Blocked (unpaid plan, dismissal, ...).
    Suspended,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Pending => "pending",
            AccountStatus::Active => "active",
            AccountStatus::Suspended => "suspended",
        }
    }
}

impl core::fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for AccountStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(AccountStatus::Pending),
            "active" => Ok(AccountStatus::Active),
            "suspended" => Ok(AccountStatus::Suspended),
            other => Err(DomainError::validation(format!("unknown account status '{other}'"))),
        }
    }
}

/// Stored account, including its password hash.
///
/// Never serialized as-is; [`Account::summary`] is the public projection.
#[derive(Clone, PartialEq, Eq)]
pub struct Account {
    pub id: UserId,
    pub tenant_id: TenantId,
    pub store_id: Option<StoreId>,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password_hash: String,
    pub role: Role,
    pub status: AccountStatus,
    pub timezone: String,
    pub language: String,
    /// Persisted but not consulted: there is no lockout policy.
    pub failed_login_attempts: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Build a new active account from a validated registration.
    pub fn from_registration(new: NewAccount, password_hash: String, now: DateTime<Utc>) -> Self {
        Self {
            id: UserId::new(),
            tenant_id: new.tenant_id,
            store_id: new.store_id,
            name: new.name.trim().to_string(),
            email: normalize_email(&new.email),
            phone: new.phone.filter(|p| !p.trim().is_empty()),
            password_hash,
            role: new.role,
            status: AccountStatus::Active,
            timezone: new
                .timezone
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_TIMEZONE.to_string()),
            language: new
                .language
                .filter(|l| !l.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
            failed_login_attempts: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }

    pub fn summary(&self) -> AccountSummary {
        AccountSummary {
            id: self.id,
            organization_id: self.tenant_id,
            store_id: self.store_id,
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
            status: self.status,
            timezone: self.timezone.clone(),
            language: self.language.clone(),
        }
    }
}

impl core::fmt::Debug for Account {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("tenant_id", &self.tenant_id)
            .field("email", &self.email)
            .field("role", &self.role)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// Public identity summary returned at login and by account endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSummary {
    pub id: UserId,
    pub organization_id: TenantId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_id: Option<StoreId>,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub status: AccountStatus,
    pub timezone: String,
    pub language: String,
}

/// Registration input.
#[derive(Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub tenant_id: TenantId,
    pub store_id: Option<StoreId>,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password: String,
    pub role: Role,
    pub timezone: Option<String>,
    pub language: Option<String>,
}

impl NewAccount {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("name is required"));
        }
        let email = self.email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(DomainError::validation("invalid email format"));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(DomainError::validation(format!(
                "password must have at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        Ok(())
    }
}

impl core::fmt::Debug for NewAccount {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NewAccount")
            .field("tenant_id", &self.tenant_id)
            .field("email", &self.email)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

/// Canonical form used for storage and lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
