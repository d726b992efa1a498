//! Postgres-backed organization directory.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use gondola_auth::organization::normalize_slug;
use gondola_auth::{DirectoryError, Organization, OrganizationDirectory, OrganizationSettings};
use gondola_core::TenantId;

use super::map_sqlx_error;

const SELECT_ORGANIZATION: &str = r#"
    SELECT
        id, name, document, slug, plan, sector, max_users, max_devices,
        is_active, created_at, updated_at
    FROM organizations
"#;

#[derive(Debug, Clone)]
pub struct PostgresOrganizationDirectory {
    pool: PgPool,
}

impl PostgresOrganizationDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl OrganizationDirectory for PostgresOrganizationDirectory {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: TenantId) -> Result<Option<Organization>, DirectoryError> {
        let row = sqlx::query(&format!("{SELECT_ORGANIZATION} WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_by_id", e))?;

        row.map(|r| organization_from_row("find_by_id", &r)).transpose()
    }

    #[instrument(skip(self))]
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Organization>, DirectoryError> {
        let row = sqlx::query(&format!("{SELECT_ORGANIZATION} WHERE slug = $1"))
            .bind(normalize_slug(slug))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_by_slug", e))?;

        row.map(|r| organization_from_row("find_by_slug", &r)).transpose()
    }

    #[instrument(skip_all, fields(organization_id = %organization.id))]
    async fn insert(&self, organization: Organization) -> Result<(), DirectoryError> {
        sqlx::query(
            r#"
            INSERT INTO organizations (
                id, name, document, slug, plan, sector, max_users, max_devices,
                is_active, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(organization.id.as_uuid())
        .bind(&organization.name)
        .bind(&organization.document)
        .bind(normalize_slug(&organization.slug))
        .bind(organization.plan.as_str())
        .bind(organization.sector.as_str())
        .bind(i32::try_from(organization.settings.max_users).unwrap_or(i32::MAX))
        .bind(i32::try_from(organization.settings.max_devices).unwrap_or(i32::MAX))
        .bind(organization.is_active)
        .bind(organization.created_at)
        .bind(organization.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert", e))?;
        Ok(())
    }
}

fn organization_from_row(
    operation: &str,
    row: &sqlx::postgres::PgRow,
) -> Result<Organization, DirectoryError> {
    OrganizationRow::from_row(row)
        .map_err(|e| map_sqlx_error(operation, e))
        .and_then(Organization::try_from)
}

/// Raw `organizations` row before enum parsing.
#[derive(Debug, Clone)]
struct OrganizationRow {
    id: Uuid,
    name: String,
    document: String,
    slug: String,
    plan: String,
    sector: String,
    max_users: i32,
    max_devices: i32,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, sqlx::postgres::PgRow> for OrganizationRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(OrganizationRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            document: row.try_get("document")?,
            slug: row.try_get("slug")?,
            plan: row.try_get("plan")?,
            sector: row.try_get("sector")?,
            max_users: row.try_get("max_users")?,
            max_devices: row.try_get("max_devices")?,
            is_active: row.try_get("is_active")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl TryFrom<OrganizationRow> for Organization {
    type Error = DirectoryError;

    fn try_from(row: OrganizationRow) -> Result<Self, Self::Error> {
        let plan = row
            .plan
            .parse()
            .map_err(|e| DirectoryError::backend(format!("organizations.plan for {}: {e}", row.id)))?;
        let sector = row
            .sector
            .parse()
            .map_err(|e| DirectoryError::backend(format!("organizations.sector for {}: {e}", row.id)))?;

        Ok(Organization {
            id: TenantId::from_uuid(row.id),
            name: row.name,
            document: row.document,
            slug: row.slug,
            plan,
            sector,
            settings: OrganizationSettings {
                max_users: u32::try_from(row.max_users).unwrap_or(0),
                max_devices: u32::try_from(row.max_devices).unwrap_or(0),
            },
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gondola_auth::{OrganizationPlan, OrganizationSector};

    fn row(plan: &str, sector: &str) -> OrganizationRow {
        let now = Utc::now();
        OrganizationRow {
            id: Uuid::now_v7(),
            name: "Row".to_string(),
            document: "11222333000181".to_string(),
            slug: "row".to_string(),
            plan: plan.to_string(),
            sector: sector.to_string(),
            max_users: 10,
            max_devices: -1,
            is_active: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn row_maps_to_organization() {
        let r = row("pro", "retail");
        let id = r.id;
        let org = Organization::try_from(r).unwrap();

        assert_eq!(org.id, TenantId::from_uuid(id));
        assert_eq!(org.plan, OrganizationPlan::Pro);
        assert_eq!(org.sector, OrganizationSector::Retail);
        assert_eq!(org.settings.max_users, 10);
        assert_eq!(org.settings.max_devices, 0);
        assert!(!org.is_active);
    }

    #[test]
    fn unknown_plan_or_sector_is_a_backend_error() {
        assert!(matches!(
            Organization::try_from(row("platinum", "retail")),
            Err(DirectoryError::Backend(_))
        ));
        assert!(matches!(
            Organization::try_from(row("free", "bakery")),
            Err(DirectoryError::Backend(_))
        ));
    }
}
