//! `gondola-auth`: authentication and authorization core.
//!
//! This crate is intentionally decoupled from HTTP. Storage is reached only
//! through the [`AccountDirectory`] and [`OrganizationDirectory`] ports.

pub mod account;
pub mod claims;
pub mod directory;
pub mod organization;
pub mod password;
pub mod roles;
pub mod service;
pub mod token;

pub use account::{Account, AccountStatus, AccountSummary, NewAccount};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use directory::{
    AccountDirectory, DirectoryError, InMemoryAccountDirectory, InMemoryOrganizationDirectory,
    OrganizationDirectory,
};
pub use organization::{
    Cnpj, NewOrganization, Organization, OrganizationPlan, OrganizationSector, OrganizationSettings,
    TaxIdValidator,
};
pub use password::{
    PasswordError, hash_password, spawn_hash_password, spawn_verify_password, verify_password,
};
pub use roles::{AllowedRoles, Role};
pub use service::{
    AccountError, AccountService, Actor, LoginError, LoginOutcome, OrganizationError,
    OrganizationService,
};
pub use token::{Hs256JwtValidator, IssuedToken, JwtValidator, TokenError, TokenIssuer};
