//! Organizations: the tenants every account and token is scoped to.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use gondola_core::{DomainError, TenantId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrganizationPlan {
    #[default]
    Free,
    Pro,
    Enterprise,
}

impl OrganizationPlan {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrganizationPlan::Free => "free",
            OrganizationPlan::Pro => "pro",
            OrganizationPlan::Enterprise => "enterprise",
        }
    }

    /// Usage limits that come with the plan.
    pub fn settings(&self) -> OrganizationSettings {
        match self {
            OrganizationPlan::Free => OrganizationSettings {
                max_users: 2,
                max_devices: 10,
            },
            OrganizationPlan::Pro => OrganizationSettings {
                max_users: 10,
                max_devices: 500,
            },
            OrganizationPlan::Enterprise => OrganizationSettings {
                max_users: 9_999,
                max_devices: 99_999,
            },
        }
    }
}

impl core::str::FromStr for OrganizationPlan {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(OrganizationPlan::Free),
            "pro" => Ok(OrganizationPlan::Pro),
            "enterprise" => Ok(OrganizationPlan::Enterprise),
            other => Err(DomainError::validation(format!("unknown plan '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrganizationSector {
    Supermarket,
    Pharmacy,
    Retail,
    Warehouse,
    Other,
}

impl OrganizationSector {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrganizationSector::Supermarket => "supermarket",
            OrganizationSector::Pharmacy => "pharmacy",
            OrganizationSector::Retail => "retail",
            OrganizationSector::Warehouse => "warehouse",
            OrganizationSector::Other => "other",
        }
    }
}

impl core::str::FromStr for OrganizationSector {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "supermarket" => Ok(OrganizationSector::Supermarket),
            "pharmacy" => Ok(OrganizationSector::Pharmacy),
            "retail" => Ok(OrganizationSector::Retail),
            "warehouse" => Ok(OrganizationSector::Warehouse),
            "other" => Ok(OrganizationSector::Other),
            other => Err(DomainError::validation(format!("unknown sector '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationSettings {
    pub max_users: u32,
    pub max_devices: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: TenantId,
    pub name: String,
    /// Tax id, digits only. Empty for the bootstrap organization.
    pub document: String,
    pub slug: String,
    pub plan: OrganizationPlan,
    pub sector: OrganizationSector,
    pub settings: OrganizationSettings,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Organization {
    /// Build a new active organization from a validated registration.
    pub fn from_registration(new: NewOrganization, now: DateTime<Utc>) -> Self {
        Self {
            id: TenantId::new(),
            name: new.name.trim().to_string(),
            document: digits_only(&new.document),
            slug: normalize_slug(&new.slug),
            plan: new.plan,
            sector: new.sector,
            settings: new.plan.settings(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// The operator's own organization, created at startup without a tax id.
    pub fn bootstrap(name: &str, slug: &str, now: DateTime<Utc>) -> Self {
        let plan = OrganizationPlan::Enterprise;
        Self {
            id: TenantId::new(),
            name: name.trim().to_string(),
            document: String::new(),
            slug: normalize_slug(slug),
            plan,
            sector: OrganizationSector::Other,
            settings: plan.settings(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrganization {
    pub name: String,
    pub document: String,
    pub slug: String,
    pub sector: OrganizationSector,
    pub plan: OrganizationPlan,
}

impl NewOrganization {
    pub fn validate(&self, tax_ids: &dyn TaxIdValidator) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("organization name is required"));
        }
        let slug = normalize_slug(&self.slug);
        if slug.is_empty() {
            return Err(DomainError::validation("slug is required"));
        }
        if !slug.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(DomainError::validation(
                "slug may only contain letters, digits and '-'",
            ));
        }
        if !tax_ids.is_valid(&digits_only(&self.document)) {
            return Err(DomainError::validation("invalid tax id"));
        }
        Ok(())
    }
}

/// Tax-id check applied to organization documents (digits only).
pub trait TaxIdValidator: Send + Sync {
    fn is_valid(&self, document: &str) -> bool;
}

impl<F> TaxIdValidator for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn is_valid(&self, document: &str) -> bool {
        self(document)
    }
}

/// Brazilian CNPJ: 14 digits, two mod-11 check digits, not all the same digit.
#[derive(Debug, Clone, Copy, Default)]
pub struct Cnpj;

impl Cnpj {
    fn check_digit(digits: &[u32], weights: &[u32]) -> u32 {
        let sum: u32 = digits.iter().zip(weights).map(|(d, w)| d * w).sum();
        match sum % 11 {
            r if r < 2 => 0,
            r => 11 - r,
        }
    }
}

impl TaxIdValidator for Cnpj {
    fn is_valid(&self, document: &str) -> bool {
        const FIRST: [u32; 12] = [5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];
        const SECOND: [u32; 13] = [6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];

        let digits: Vec<u32> = document.chars().filter_map(|c| c.to_digit(10)).collect();
        if digits.len() != 14 || document.chars().any(|c| !c.is_ascii_digit()) {
            return false;
        }
        if digits.iter().all(|d| *d == digits[0]) {
            return false;
        }

        Self::check_digit(&digits[..12], &FIRST) == digits[12]
            && Self::check_digit(&digits[..13], &SECOND) == digits[13]
    }
}

pub fn normalize_slug(slug: &str) -> String {
    slug.trim().to_lowercase()
}

/// Strip punctuation from a formatted document (`11.222.333/0001-81`).
pub fn digits_only(document: &str) -> String {
    document.chars().filter(char::is_ascii_digit).collect()
}
