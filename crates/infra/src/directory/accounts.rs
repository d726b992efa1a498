//! Postgres-backed account directory.
//!
//! Emails are stored normalized (trimmed, lower-cased) and looked up the same way.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use gondola_auth::account::normalize_email;
use gondola_auth::{Account, AccountDirectory, AccountStatus, DirectoryError, Role};
use gondola_core::{StoreId, TenantId, UserId};

use super::map_sqlx_error;

const SELECT_ACCOUNT: &str = r#"
    SELECT
        id, organization_id, store_id, name, email, phone, password_hash,
        role, status, timezone, language, failed_login_attempts,
        created_at, updated_at
    FROM users
"#;

/// Account directory over a `users` table.
///
/// Uses the SQLx connection pool, which is `Send + Sync` and cheap to clone.
#[derive(Debug, Clone)]
pub struct PostgresAccountDirectory {
    pool: PgPool,
}

impl PostgresAccountDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl AccountDirectory for PostgresAccountDirectory {
    #[instrument(skip_all)]
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, DirectoryError> {
        let row = sqlx::query(&format!("{SELECT_ACCOUNT} WHERE email = $1"))
            .bind(normalize_email(email))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_by_email", e))?;

        row.map(|r| account_from_row("find_by_email", &r)).transpose()
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: UserId) -> Result<Option<Account>, DirectoryError> {
        let row = sqlx::query(&format!("{SELECT_ACCOUNT} WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_by_id", e))?;

        row.map(|r| account_from_row("find_by_id", &r)).transpose()
    }

    #[instrument(skip_all, fields(account_id = %account.id))]
    async fn insert(&self, account: Account) -> Result<(), DirectoryError> {
        sqlx::query(
            r#"
            INSERT INTO users (
                id, organization_id, store_id, name, email, phone, password_hash,
                role, status, timezone, language, failed_login_attempts,
                created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(account.id.as_uuid())
        .bind(account.tenant_id.as_uuid())
        .bind(account.store_id.map(Uuid::from))
        .bind(&account.name)
        .bind(normalize_email(&account.email))
        .bind(&account.phone)
        .bind(&account.password_hash)
        .bind(account.role.as_str())
        .bind(account.status.as_str())
        .bind(&account.timezone)
        .bind(&account.language)
        .bind(i32::try_from(account.failed_login_attempts).unwrap_or(i32::MAX))
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert", e))?;
        Ok(())
    }

    #[instrument(skip(self, now))]
    async fn update_status(
        &self,
        id: UserId,
        status: AccountStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<Account>, DirectoryError> {
        let result = sqlx::query("UPDATE users SET status = $1, updated_at = $2 WHERE id = $3")
            .bind(status.as_str())
            .bind(now)
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_status", e))?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.find_by_id(id).await
    }
}

fn account_from_row(operation: &str, row: &sqlx::postgres::PgRow) -> Result<Account, DirectoryError> {
    AccountRow::from_row(row)
        .map_err(|e| map_sqlx_error(operation, e))
        .and_then(Account::try_from)
}

/// Raw `users` row before enum parsing.
#[derive(Debug, Clone)]
struct AccountRow {
    id: Uuid,
    organization_id: Uuid,
    store_id: Option<Uuid>,
    name: String,
    email: String,
    phone: Option<String>,
    password_hash: String,
    role: String,
    status: String,
    timezone: String,
    language: String,
    failed_login_attempts: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, sqlx::postgres::PgRow> for AccountRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(AccountRow {
            id: row.try_get("id")?,
            organization_id: row.try_get("organization_id")?,
            store_id: row.try_get("store_id")?,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            phone: row.try_get("phone")?,
            password_hash: row.try_get("password_hash")?,
            role: row.try_get("role")?,
            status: row.try_get("status")?,
            timezone: row.try_get("timezone")?,
            language: row.try_get("language")?,
            failed_login_attempts: row.try_get("failed_login_attempts")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl TryFrom<AccountRow> for Account {
    type Error = DirectoryError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        let role: Role = row
            .role
            .parse()
            .map_err(|e| DirectoryError::backend(format!("users.role for {}: {e}", row.id)))?;
        let status: AccountStatus = row
            .status
            .parse()
            .map_err(|e| DirectoryError::backend(format!("users.status for {}: {e}", row.id)))?;

        Ok(Account {
            id: UserId::from_uuid(row.id),
            tenant_id: TenantId::from_uuid(row.organization_id),
            store_id: row.store_id.map(StoreId::from_uuid),
            name: row.name,
            email: row.email,
            phone: row.phone,
            password_hash: row.password_hash,
            role,
            status,
            timezone: row.timezone,
            language: row.language,
            failed_login_attempts: u32::try_from(row.failed_login_attempts).unwrap_or(0),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(role: &str, status: &str) -> AccountRow {
        let now = Utc::now();
        AccountRow {
            id: Uuid::now_v7(),
            organization_id: Uuid::now_v7(),
            store_id: None,
            name: "Row".to_string(),
            email: "row@example.com".to_string(),
            phone: None,
            password_hash: "$argon2id$...".to_string(),
            role: role.to_string(),
            status: status.to_string(),
            timezone: "UTC".to_string(),
            language: "pt-BR".to_string(),
            failed_login_attempts: -3,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn row_maps_to_account() {
        let r = row("tenant-owner", "suspended");
        let id = r.id;
        let account = Account::try_from(r).unwrap();

        assert_eq!(account.id, UserId::from_uuid(id));
        assert_eq!(account.role, Role::TenantOwner);
        assert_eq!(account.status, AccountStatus::Suspended);
        assert_eq!(account.failed_login_attempts, 0);
    }

    #[test]
    fn unknown_enum_values_are_backend_errors() {
        assert!(matches!(
            Account::try_from(row("superuser", "active")),
            Err(DirectoryError::Backend(_))
        ));
        assert!(matches!(
            Account::try_from(row("operator", "deleted")),
            Err(DirectoryError::Backend(_))
        ));
    }
}
