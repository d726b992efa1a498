//! HS256 token issuing and validation.
//!
//! Both halves are built from an explicit secret at startup. The validator pins
//! the algorithm: the header's `alg` must be `HS256` before the signature is
//! even looked at, so `none`, asymmetric and other HMAC variants are refused.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use thiserror::Error;

use gondola_core::{TenantId, UserId};

use crate::claims::{JwtClaims, TokenValidationError, validate_claims};
use crate::Role;

const ALGORITHM: Algorithm = Algorithm::HS256;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("signing secret is empty")]
    EmptySecret,

    #[error("token lifetime must be at least one second")]
    InvalidTtl,

    #[error("failed to sign token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),

    #[error("token is malformed")]
    Malformed,

    #[error("token algorithm is not accepted")]
    InvalidAlgorithm,

    #[error("token signature is invalid")]
    InvalidSignature,

    #[error(transparent)]
    Claims(#[from] TokenValidationError),
}

/// A freshly signed access token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    /// Lifetime in whole seconds.
    pub expires_in: i64,
    pub claims: JwtClaims,
}

/// Signs claim sets with the configured secret.
#[derive(Clone)]
pub struct TokenIssuer {
    key: EncodingKey,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &[u8], ttl: Duration) -> Result<Self, TokenError> {
        if secret.is_empty() {
            return Err(TokenError::EmptySecret);
        }
        if ttl.num_seconds() < 1 {
            return Err(TokenError::InvalidTtl);
        }
        Ok(Self {
            key: EncodingKey::from_secret(secret),
            ttl,
        })
    }

    /// Issue a token with the configured lifetime.
    pub fn issue(
        &self,
        subject: UserId,
        tenant_id: TenantId,
        role: Role,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, TokenError> {
        self.issue_with_ttl(subject, tenant_id, role, self.ttl, now)
    }

    pub fn issue_with_ttl(
        &self,
        subject: UserId,
        tenant_id: TenantId,
        role: Role,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, TokenError> {
        // Claims carry whole seconds; anything shorter would give `exp == iat`.
        if ttl.num_seconds() < 1 {
            return Err(TokenError::InvalidTtl);
        }
        let claims = JwtClaims::new(subject, tenant_id, role, now, ttl);
        let token = encode(&Header::new(ALGORITHM), &claims, &self.key).map_err(TokenError::Signing)?;

        Ok(IssuedToken {
            token,
            expires_in: ttl.num_seconds(),
            claims,
        })
    }
}

impl core::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TokenIssuer").field("ttl", &self.ttl).finish_non_exhaustive()
    }
}

/// Verifies a compact token and returns its claims.
///
/// `now` is passed in so expiry decisions are deterministic in tests.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenError>;
}

pub struct Hs256JwtValidator {
    key: DecodingKey,
    validation: Validation,
}

impl Hs256JwtValidator {
    pub fn new(secret: &[u8]) -> Result<Self, TokenError> {
        if secret.is_empty() {
            return Err(TokenError::EmptySecret);
        }

        let mut validation = Validation::new(ALGORITHM);
        // Expiry is checked by `validate_claims` against the caller's clock.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Ok(Self {
            key: DecodingKey::from_secret(secret),
            validation,
        })
    }
}

impl JwtValidator for Hs256JwtValidator {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenError> {
        let data = decode::<JwtClaims>(token, &self.key, &self.validation).map_err(|e| match e.kind() {
            ErrorKind::InvalidAlgorithm => TokenError::InvalidAlgorithm,
            ErrorKind::InvalidSignature => TokenError::InvalidSignature,
            _ => TokenError::Malformed,
        })?;

        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

impl core::fmt::Debug for Hs256JwtValidator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Hs256JwtValidator").finish_non_exhaustive()
    }
}
