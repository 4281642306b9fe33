//! # Catalog
//!
//! Management of reference data: frame statuses, companies and brands.
//!
//! Every write validates its input with `jazzy_core::validation`, then runs
//! in a unit of work. Unique-constraint failures come back as
//! `ValidationError::Duplicate` so callers can show them next to the field.

use sqlx::SqliteConnection;
use tracing::info;

use crate::error::{DbError, EngineError, EngineResult};
use crate::pool::Database;
use crate::repository::{brand, status};
use jazzy_core::status::{ensure_deletable, ensure_editable, next_display_order};
use jazzy_core::validation;
use jazzy_core::{
    Brand, BrandUpdate, ColorScheme, Company, CompanyGroup, CoreError, FrameStatus,
    FrameStatusSummary, NewBrand, StatusUpdate, ValidationError,
};

fn duplicate_as_validation(err: DbError) -> EngineError {
    match err {
        DbError::UniqueViolation { field, value } => ValidationError::Duplicate { field, value }.into(),
        other => other.into(),
    }
}

/// Service for statuses, companies and brands.
#[derive(Debug, Clone)]
pub struct Catalog {
    db: Database,
}

impl Catalog {
    pub fn new(db: Database) -> Self {
        Catalog { db }
    }

    // =========================================================================
    // Statuses
    // =========================================================================

    /// Statuses in display order with product counts.
    pub async fn list_statuses(&self) -> EngineResult<Vec<FrameStatusSummary>> {
        Ok(self.db.statuses().list().await?)
    }

    /// Creates an unprotected status placed after every existing one.
    pub async fn create_status(&self, name: &str, color_scheme: ColorScheme) -> EngineResult<FrameStatus> {
        let name = validation::validate_status_name(name)?;

        let mut uow = self.db.begin_unit("create_status").await?;
        let outcome = create_status_in(uow.conn(), &name, color_scheme).await;
        let created = uow.finish(outcome).await?;

        info!(status_id = created.id, name = %created.name, "Status created");
        Ok(created)
    }

    pub async fn update_status(&self, id: i64, update: StatusUpdate) -> EngineResult<FrameStatus> {
        let name = update
            .name
            .as_deref()
            .map(validation::validate_status_name)
            .transpose()?;

        let mut uow = self.db.begin_unit("update_status").await?;
        let outcome = update_status_in(uow.conn(), id, name, &update).await;
        let updated = uow.finish(outcome).await?;

        info!(status_id = id, name = %updated.name, "Status updated");
        Ok(updated)
    }

    /// Deletes an unprotected status no frame carries.
    pub async fn delete_status(&self, id: i64) -> EngineResult<()> {
        let mut uow = self.db.begin_unit("delete_status").await?;
        let outcome = delete_status_in(uow.conn(), id).await;
        uow.finish(outcome).await?;

        info!(status_id = id, "Status deleted");
        Ok(())
    }

    // =========================================================================
    // Companies and Brands
    // =========================================================================

    pub async fn create_company(&self, name: &str) -> EngineResult<Company> {
        let name = validation::validate_company_name(name)?;

        let mut uow = self.db.begin_unit("create_company").await?;
        let outcome = brand::insert_company(uow.conn(), &name)
            .await
            .map_err(duplicate_as_validation);
        let company = uow.finish(outcome).await?;

        info!(company_id = company.id, name = %company.company_name, "Company created");
        Ok(company)
    }

    pub async fn rename_company(&self, id: i64, name: &str) -> EngineResult<Company> {
        let name = validation::validate_company_name(name)?;

        let mut uow = self.db.begin_unit("rename_company").await?;
        let outcome = rename_company_in(uow.conn(), id, &name).await;
        let company = uow.finish(outcome).await?;

        info!(company_id = id, name = %company.company_name, "Company renamed");
        Ok(company)
    }

    pub async fn create_brand(&self, new: NewBrand) -> EngineResult<Brand> {
        validation::validate_brand_id(new.id)?;
        let name = validation::validate_brand_name(&new.brand_name)?;
        validation::validate_allocation(new.allocation_quantity)?;

        let mut uow = self.db.begin_unit("create_brand").await?;
        let outcome = create_brand_in(uow.conn(), &new, &name).await;
        let created = uow.finish(outcome).await?;

        info!(brand_id = created.id, name = %created.brand_name, "Brand created");
        Ok(created)
    }

    /// Updates a brand's name, company or allocation. The id never changes.
    pub async fn update_brand(&self, id: i64, update: BrandUpdate) -> EngineResult<Brand> {
        let name = update
            .brand_name
            .as_deref()
            .map(validation::validate_brand_name)
            .transpose()?;
        if let Some(allocation) = update.allocation_quantity {
            validation::validate_allocation(allocation)?;
        }

        let mut uow = self.db.begin_unit("update_brand").await?;
        let outcome = update_brand_in(uow.conn(), id, name, &update).await;
        let updated = uow.finish(outcome).await?;

        info!(brand_id = id, "Brand updated");
        Ok(updated)
    }

    pub async fn brand(&self, id: i64) -> EngineResult<Brand> {
        self.db
            .brands()
            .get(id)
            .await?
            .ok_or_else(|| CoreError::BrandNotFound(id).into())
    }

    /// Brands grouped under their companies.
    pub async fn brands_by_company(&self) -> EngineResult<Vec<CompanyGroup>> {
        Ok(self.db.brands().list_grouped().await?)
    }
}

// =============================================================================
// Unit-of-work bodies
// =============================================================================

async fn create_status_in(
    conn: &mut SqliteConnection,
    name: &str,
    color_scheme: ColorScheme,
) -> EngineResult<FrameStatus> {
    let existing = status::list(&mut *conn).await?;
    let display_order = next_display_order(&existing);
    status::insert(&mut *conn, name, color_scheme, display_order)
        .await
        .map_err(duplicate_as_validation)
}

async fn update_status_in(
    conn: &mut SqliteConnection,
    id: i64,
    name: Option<String>,
    update: &StatusUpdate,
) -> EngineResult<FrameStatus> {
    let current = status::fetch(&mut *conn, id)
        .await?
        .ok_or_else(|| CoreError::StatusNotFound(id.to_string()))?;
    ensure_editable(&current)?;

    let updated = FrameStatus {
        name: name.unwrap_or(current.name),
        color_scheme: update.color_scheme.unwrap_or(current.color_scheme),
        display_order: update.display_order.unwrap_or(current.display_order),
        ..current
    };
    status::update(&mut *conn, &updated)
        .await
        .map_err(duplicate_as_validation)?;
    Ok(updated)
}

async fn delete_status_in(conn: &mut SqliteConnection, id: i64) -> EngineResult<()> {
    let current = status::fetch(&mut *conn, id)
        .await?
        .ok_or_else(|| CoreError::StatusNotFound(id.to_string()))?;
    let product_count = status::count_products(&mut *conn, id).await?;
    ensure_deletable(&current, product_count)?;
    status::delete(&mut *conn, id).await?;
    Ok(())
}

async fn rename_company_in(conn: &mut SqliteConnection, id: i64, name: &str) -> EngineResult<Company> {
    if brand::fetch_company(&mut *conn, id).await?.is_none() {
        return Err(CoreError::CompanyNotFound(id).into());
    }
    brand::rename_company(&mut *conn, id, name)
        .await
        .map_err(duplicate_as_validation)?;
    Ok(Company {
        id,
        company_name: name.to_string(),
    })
}

async fn create_brand_in(conn: &mut SqliteConnection, new: &NewBrand, name: &str) -> EngineResult<Brand> {
    if brand::fetch_company(&mut *conn, new.company_id).await?.is_none() {
        return Err(CoreError::CompanyNotFound(new.company_id).into());
    }
    brand::insert_brand(&mut *conn, new.id, name, new.company_id, new.allocation_quantity)
        .await
        .map_err(duplicate_as_validation)?;
    brand::fetch_brand(&mut *conn, new.id)
        .await?
        .ok_or_else(|| CoreError::BrandNotFound(new.id).into())
}

async fn update_brand_in(
    conn: &mut SqliteConnection,
    id: i64,
    name: Option<String>,
    update: &BrandUpdate,
) -> EngineResult<Brand> {
    let current = brand::fetch_brand(&mut *conn, id)
        .await?
        .ok_or(CoreError::BrandNotFound(id))?;
    let company_id = update.company_id.unwrap_or(current.company_id);
    if company_id != current.company_id && brand::fetch_company(&mut *conn, company_id).await?.is_none() {
        return Err(CoreError::CompanyNotFound(company_id).into());
    }

    brand::update_brand(
        &mut *conn,
        id,
        name.as_deref().unwrap_or(&current.brand_name),
        company_id,
        update.allocation_quantity.unwrap_or(current.allocation_quantity),
    )
    .await?;

    brand::fetch_brand(&mut *conn, id)
        .await?
        .ok_or_else(|| CoreError::BrandNotFound(id).into())
}

// =============================================================================
// Unit Tests
// =============================================================================
