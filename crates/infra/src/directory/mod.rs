//! Postgres directories sharing one pool and one schema.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | DirectoryError |
//! |------------|----------------------|----------------|
//! | Unique violation on `users_email_key` | `23505` | `EmailTaken` |
//! | Unique violation on `organizations_slug_key` | `23505` | `SlugTaken` |
//! | Any other unique violation | `23505` | `Backend` |
//! | Database (other) | Any other | `Backend` |
//! | Everything else | N/A | `Backend` |

use gondola_auth::DirectoryError;
use sqlx::PgPool;

pub mod accounts;
pub mod organizations;

const MIGRATIONS: [&str; 2] = [
    include_str!("../../migrations/0001_organizations.sql"),
    include_str!("../../migrations/0002_users.sql"),
];

const EMAIL_CONSTRAINT: &str = "users_email_key";
const SLUG_CONSTRAINT: &str = "organizations_slug_key";

pub async fn connect(database_url: &str) -> Result<PgPool, DirectoryError> {
    PgPool::connect(database_url)
        .await
        .map_err(|e| map_sqlx_error("connect", e))
}

/// Create the `organizations` and `users` tables if they do not exist yet.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), DirectoryError> {
    for migration in MIGRATIONS {
        sqlx::raw_sql(migration)
            .execute(pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
    }
    Ok(())
}

pub(crate) fn map_sqlx_error(operation: &str, err: sqlx::Error) -> DirectoryError {
    match err {
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505") => {
            unique_violation(operation, db_err.constraint(), db_err.message())
        }
        sqlx::Error::Database(db_err) => {
            DirectoryError::backend(format!("database error in {operation}: {}", db_err.message()))
        }
        other => DirectoryError::backend(format!("{operation}: {other}")),
    }
}

fn unique_violation(operation: &str, constraint: Option<&str>, message: &str) -> DirectoryError {
    match constraint {
        Some(EMAIL_CONSTRAINT) => DirectoryError::EmailTaken,
        Some(SLUG_CONSTRAINT) => DirectoryError::SlugTaken,
        _ => DirectoryError::backend(format!("unique violation in {operation}: {message}")),
    }
}
