use chrono::{DateTime, Duration, Utc};
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use gondola_core::{DomainResult, TenantId, UserId};

use crate::Role;

/// JWT claims as they travel on the wire.
///
/// Identifier and role claims are kept as raw strings: a verified signature only
/// proves who minted the payload, not that its fields are well-formed. Missing,
/// null or non-string values decode as empty strings and fail identifier
/// parsing later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (account identifier).
    #[serde(default, deserialize_with = "string_or_empty")]
    pub sub: String,

    /// Tenant (organization) identifier.
    #[serde(default, deserialize_with = "string_or_empty")]
    pub org_id: String,

    /// Role granted within the tenant.
    #[serde(default, deserialize_with = "string_or_empty")]
    pub role: String,

    /// Issued-at, seconds since the Unix epoch.
    pub iat: i64,

    /// Expiry, seconds since the Unix epoch.
    pub exp: i64,
}

impl JwtClaims {
    pub fn new(
        subject: UserId,
        tenant_id: TenantId,
        role: Role,
        issued_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        Self {
            sub: subject.to_string(),
            org_id: tenant_id.to_string(),
            role: role.as_str().to_string(),
            iat: issued_at.timestamp(),
            exp: (issued_at + ttl).timestamp(),
        }
    }

    pub fn subject_id(&self) -> DomainResult<UserId> {
        self.sub.parse()
    }

    pub fn tenant_id(&self) -> DomainResult<TenantId> {
        self.org_id.parse()
    }

}

fn string_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Lenient {
        Text(String),
        Other(IgnoredAny),
    }

    Ok(match Lenient::deserialize(deserializer)? {
        Lenient::Text(s) => s,
        Lenient::Other(_) => String::new(),
    })
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (iat is in the future)")]
    NotYetValid,

    #[error("invalid token time window (exp <= iat)")]
    InvalidTimeWindow,
}

/// Deterministically validate the time window of decoded claims.
///
/// Signature verification happens before this is called; see
/// [`crate::Hs256JwtValidator`]. A token is expired from the second its `exp`
/// is reached.
pub fn validate_claims(claims: &JwtClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    if claims.exp <= claims.iat {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    let now = now.timestamp();
    if now < claims.iat {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.exp {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}
