//! # Brand Repository
//!
//! Companies and the brands they distribute.

use sqlx::{SqliteExecutor, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use jazzy_core::{Brand, Company, CompanyGroup};

const BRAND_SELECT: &str = r#"
    SELECT
        b.id, b.brand_name, b.company_id, c.company_name, b.allocation_quantity,
        (SELECT COUNT(*) FROM frames f WHERE f.brand_id = b.id) AS product_count
    FROM brands b
    JOIN companies c ON c.id = b.company_id
"#;

#[derive(Debug, Clone)]
pub struct BrandRepository {
    pool: SqlitePool,
}

impl BrandRepository {
    pub fn new(pool: SqlitePool) -> Self {
        BrandRepository { pool }
    }

    pub async fn companies(&self) -> DbResult<Vec<Company>> {
        let companies = sqlx::query_as::<_, Company>(
            "SELECT id, company_name FROM companies ORDER BY company_name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(companies)
    }

    pub async fn get(&self, brand_id: i64) -> DbResult<Option<Brand>> {
        fetch_brand(&self.pool, brand_id).await
    }

    pub async fn list(&self) -> DbResult<Vec<Brand>> {
        let sql = format!("{BRAND_SELECT} ORDER BY c.company_name, b.brand_name");
        let brands = sqlx::query_as::<_, Brand>(&sql).fetch_all(&self.pool).await?;
        Ok(brands)
    }

    /// Brands grouped under their companies, companies by name.
    pub async fn list_grouped(&self) -> DbResult<Vec<CompanyGroup>> {
        let companies = self.companies().await?;
        let brands = self.list().await?;
        Ok(CompanyGroup::group(companies, brands))
    }
}

// =============================================================================
// Executor Functions
// =============================================================================

pub async fn fetch_company<'e>(db: impl SqliteExecutor<'e>, id: i64) -> DbResult<Option<Company>> {
    let company = sqlx::query_as::<_, Company>("SELECT id, company_name FROM companies WHERE id = ?1")
        .bind(id)
        .fetch_optional(db)
        .await?;
    Ok(company)
}

pub async fn insert_company<'e>(db: impl SqliteExecutor<'e>, name: &str) -> DbResult<Company> {
    debug!(name = %name, "Creating company");

    let result = sqlx::query("INSERT INTO companies (company_name) VALUES (?1)")
        .bind(name)
        .execute(db)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("company name", name),
            other => other,
        })?;

    Ok(Company {
        id: result.last_insert_rowid(),
        company_name: name.to_string(),
    })
}

pub async fn rename_company<'e>(db: impl SqliteExecutor<'e>, id: i64, name: &str) -> DbResult<()> {
    let result = sqlx::query("UPDATE companies SET company_name = ?2 WHERE id = ?1")
        .bind(id)
        .bind(name)
        .execute(db)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("company name", name),
            other => other,
        })?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Company", id));
    }
    Ok(())
}

pub async fn fetch_brand<'e>(db: impl SqliteExecutor<'e>, id: i64) -> DbResult<Option<Brand>> {
    let sql = format!("{BRAND_SELECT} WHERE b.id = ?1");
    let brand = sqlx::query_as::<_, Brand>(&sql)
        .bind(id)
        .fetch_optional(db)
        .await?;
    Ok(brand)
}

pub async fn brand_exists<'e>(db: impl SqliteExecutor<'e>, id: i64) -> DbResult<bool> {
    let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM brands WHERE id = ?1")
        .bind(id)
        .fetch_optional(db)
        .await?;
    Ok(found.is_some())
}

pub async fn insert_brand<'e>(
    db: impl SqliteExecutor<'e>,
    id: i64,
    name: &str,
    company_id: i64,
    allocation_quantity: i64,
) -> DbResult<()> {
    debug!(brand_id = id, name = %name, "Creating brand");

    sqlx::query(
        "INSERT INTO brands (id, brand_name, company_id, allocation_quantity) VALUES (?1, ?2, ?3, ?4)",
    )
    .bind(id)
    .bind(name)
    .bind(company_id)
    .bind(allocation_quantity)
    .execute(db)
    .await
    .map_err(|e| match DbError::from(e) {
        DbError::UniqueViolation { .. } => DbError::duplicate("brand id", id.to_string()),
        other => other,
    })?;
    Ok(())
}

pub async fn update_brand<'e>(
    db: impl SqliteExecutor<'e>,
    id: i64,
    name: &str,
    company_id: i64,
    allocation_quantity: i64,
) -> DbResult<()> {
    let result = sqlx::query(
        "UPDATE brands SET brand_name = ?2, company_id = ?3, allocation_quantity = ?4 WHERE id = ?1",
    )
    .bind(id)
    .bind(name)
    .bind(company_id)
    .bind(allocation_quantity)
    .execute(db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Brand", id));
    }
    Ok(())
}
