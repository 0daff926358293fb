//! Catalog gateway: read-only lookups of products, locations, users and
//! vehicles
//!
//! The catalog itself is owned by other systems; this service only resolves
//! existence and display data before a ledger operation runs. There is no
//! create, update or delete surface here.

use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{LocationSummary, ProductSummary, UserSummary, VehicleSummary};

/// Read-only catalog lookups
#[derive(Clone)]
pub struct CatalogService {
    db: PgPool,
}

impl CatalogService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Resolve a product or fail with `NotFound`
    pub async fn get_product(&self, product_id: Uuid) -> AppResult<ProductSummary> {
        let row = sqlx::query_as::<_, (Uuid, String, String)>(
            "SELECT id, name, code FROM products WHERE id = $1",
        )
        .bind(product_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        Ok(ProductSummary {
            id: row.0,
            name: row.1,
            code: row.2,
        })
    }

    /// Resolve a location or fail with `NotFound`
    pub async fn get_location(&self, location_id: Uuid) -> AppResult<LocationSummary> {
        let row = sqlx::query_as::<_, (Uuid, String, Option<String>)>(
            "SELECT id, name, address FROM locations WHERE id = $1",
        )
        .bind(location_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Location".to_string()))?;

        Ok(LocationSummary {
            id: row.0,
            name: row.1,
            address: row.2,
        })
    }

    /// Resolve a user or fail with `NotFound`
    pub async fn get_user(&self, user_id: Uuid) -> AppResult<UserSummary> {
        let row = sqlx::query_as::<_, (Uuid, String, String)>(
            "SELECT id, username, full_name FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))?;

        Ok(UserSummary {
            id: row.0,
            username: row.1,
            full_name: row.2,
        })
    }

    /// Resolve a vehicle or fail with `NotFound`
    pub async fn get_vehicle(&self, vehicle_id: Uuid) -> AppResult<VehicleSummary> {
        let row = sqlx::query_as::<_, (Uuid, String, Option<String>)>(
            "SELECT id, plate, description FROM vehicles WHERE id = $1",
        )
        .bind(vehicle_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Vehicle".to_string()))?;

        Ok(VehicleSummary {
            id: row.0,
            plate: row.1,
            description: row.2,
        })
    }

    /// Existence check for hot paths that do not need display data
    pub async fn product_exists(&self, product_id: Uuid) -> AppResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM products WHERE id = $1)",
        )
        .bind(product_id)
        .fetch_one(&self.db)
        .await?;

        Ok(exists)
    }

    /// Existence check for hot paths that do not need display data
    pub async fn location_exists(&self, location_id: Uuid) -> AppResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM locations WHERE id = $1)",
        )
        .bind(location_id)
        .fetch_one(&self.db)
        .await?;

        Ok(exists)
    }

    /// Batch display lookup used when enriching line items
    pub async fn get_products(&self, product_ids: &[Uuid]) -> AppResult<Vec<ProductSummary>> {
        let rows = sqlx::query_as::<_, (Uuid, String, String)>(
            "SELECT id, name, code FROM products WHERE id = ANY($1)",
        )
        .bind(product_ids)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, name, code)| ProductSummary { id, name, code })
            .collect())
    }
}
