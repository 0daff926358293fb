//! Inventory service: record registration, stock views, and manual corrections
//!
//! Read methods join product and location display data into flat view rows
//! and compute a `low_stock` flag. Every write delegates to the configured
//! [`LedgerStore`] inside its own transaction.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use shared::models::StockAdjustment;
use shared::types::{PaginatedResponse, Pagination};
use shared::validation::is_low_stock;

use crate::error::{AppError, AppResult};
use crate::services::catalog::CatalogService;
use crate::services::ledger::{InventoryRecord, LedgerStore};

/// Inventory service for registering records and correcting quantities
#[derive(Clone)]
pub struct InventoryService {
    db: PgPool,
    store: Arc<dyn LedgerStore>,
    low_stock_threshold: i64,
}

/// Inventory record enriched for API responses
#[derive(Debug, Clone, Serialize)]
pub struct InventoryView {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub product_code: String,
    pub location_id: Uuid,
    pub location_name: String,
    pub quantity: i64,
    pub low_stock: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row for inventory view queries
#[derive(Debug, FromRow)]
struct InventoryViewRow {
    id: Uuid,
    product_id: Uuid,
    product_name: String,
    product_code: String,
    location_id: Uuid,
    location_name: String,
    quantity: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl InventoryViewRow {
    fn into_view(self, threshold: i64) -> InventoryView {
        InventoryView {
            id: self.id,
            product_id: self.product_id,
            product_name: self.product_name,
            product_code: self.product_code,
            location_id: self.location_id,
            location_name: self.location_name,
            quantity: self.quantity,
            low_stock: is_low_stock(self.quantity, threshold),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Row for adjustment audit queries
#[derive(Debug, FromRow)]
struct AdjustmentRow {
    id: Uuid,
    inventory_id: Uuid,
    location_id: Uuid,
    quantity: i64,
    reason: Option<String>,
    observations: Option<String>,
    performed_by: Uuid,
    created_at: DateTime<Utc>,
}

impl AdjustmentRow {
    fn into_model(self) -> StockAdjustment {
        StockAdjustment {
            id: self.id,
            inventory_id: self.inventory_id,
            location_id: self.location_id,
            quantity: self.quantity,
            reason: self.reason,
            observations: self.observations,
            performed_by: self.performed_by,
            created_at: self.created_at,
        }
    }
}

/// Input for registering a product at a location
#[derive(Debug, Deserialize)]
pub struct RegisterInventoryInput {
    pub product_id: Uuid,
    pub location_id: Uuid,
    pub initial_quantity: i64,
}

/// Input for overwriting a record's quantity after a physical count
#[derive(Debug, Deserialize)]
pub struct SetQuantityInput {
    pub quantity: i64,
}

/// Input for deducting stock outside a sale (damage, loss, corrections)
#[derive(Debug, Deserialize)]
pub struct DeductStockInput {
    pub location_id: Uuid,
    pub quantity: i64,
    pub reason: Option<String>,
    pub observations: Option<String>,
}

impl InventoryService {
    /// Create a new InventoryService instance
    pub fn new(db: PgPool, store: Arc<dyn LedgerStore>, low_stock_threshold: i64) -> Self {
        Self {
            db,
            store,
            low_stock_threshold,
        }
    }

    /// Register an inventory record for a product at a location
    pub async fn register(&self, input: RegisterInventoryInput) -> AppResult<InventoryView> {
        if input.initial_quantity < 0 {
            return Err(AppError::Validation {
                field: "initial_quantity".to_string(),
                message: "Initial quantity cannot be negative".to_string(),
                message_es: "La cantidad inicial no puede ser negativa".to_string(),
            });
        }

        let catalog = CatalogService::new(self.db.clone());
        let product = catalog.get_product(input.product_id).await?;
        let location = catalog.get_location(input.location_id).await?;

        let mut tx = self.db.begin().await?;

        if self
            .store
            .get(&mut *tx, input.product_id, input.location_id)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict {
                resource: "inventory".to_string(),
                message: "An inventory record already exists for this product at this location"
                    .to_string(),
                message_es: "Ya existe un inventario para este producto en esta sede".to_string(),
            });
        }

        let record = self
            .store
            .ensure(&mut *tx, input.product_id, input.location_id, input.initial_quantity)
            .await?;

        tx.commit().await?;

        tracing::info!(
            "Registered inventory {} for product {} at location {}",
            record.id,
            product.id,
            location.id
        );

        Ok(InventoryView {
            id: record.id,
            product_id: product.id,
            product_name: product.name,
            product_code: product.code,
            location_id: location.id,
            location_name: location.name,
            quantity: record.quantity,
            low_stock: is_low_stock(record.quantity, self.low_stock_threshold),
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }

    /// Get an inventory record by id
    pub async fn get_record(&self, record_id: Uuid) -> AppResult<InventoryView> {
        let row = sqlx::query_as::<_, InventoryViewRow>(
            r#"
            SELECT i.id, i.product_id, p.name AS product_name, p.code AS product_code,
                   i.location_id, l.name AS location_name, i.quantity,
                   i.created_at, i.updated_at
            FROM inventory i
            JOIN products p ON p.id = i.product_id
            JOIN locations l ON l.id = i.location_id
            WHERE i.id = $1
            "#,
        )
        .bind(record_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Inventory record".to_string()))?;

        Ok(row.into_view(self.low_stock_threshold))
    }

    /// Get the record for a product at a location
    pub async fn get_by_product_and_location(
        &self,
        product_id: Uuid,
        location_id: Uuid,
    ) -> AppResult<InventoryView> {
        let row = sqlx::query_as::<_, InventoryViewRow>(
            r#"
            SELECT i.id, i.product_id, p.name AS product_name, p.code AS product_code,
                   i.location_id, l.name AS location_name, i.quantity,
                   i.created_at, i.updated_at
            FROM inventory i
            JOIN products p ON p.id = i.product_id
            JOIN locations l ON l.id = i.location_id
            WHERE i.product_id = $1 AND i.location_id = $2
            "#,
        )
        .bind(product_id)
        .bind(location_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Inventory record".to_string()))?;

        Ok(row.into_view(self.low_stock_threshold))
    }

    /// List all inventory records, paginated
    pub async fn list_all(
        &self,
        pagination: Pagination,
    ) -> AppResult<PaginatedResponse<InventoryView>> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM inventory")
            .fetch_one(&self.db)
            .await?;

        let rows = sqlx::query_as::<_, InventoryViewRow>(
            r#"
            SELECT i.id, i.product_id, p.name AS product_name, p.code AS product_code,
                   i.location_id, l.name AS location_name, i.quantity,
                   i.created_at, i.updated_at
            FROM inventory i
            JOIN products p ON p.id = i.product_id
            JOIN locations l ON l.id = i.location_id
            ORDER BY p.name, l.name
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        let data = rows
            .into_iter()
            .map(|row| row.into_view(self.low_stock_threshold))
            .collect();

        Ok(PaginatedResponse::new(data, pagination, total as u64))
    }

    /// List the inventory of one location
    pub async fn list_by_location(&self, location_id: Uuid) -> AppResult<Vec<InventoryView>> {
        let catalog = CatalogService::new(self.db.clone());
        if !catalog.location_exists(location_id).await? {
            return Err(AppError::NotFound("Location".to_string()));
        }

        let rows = sqlx::query_as::<_, InventoryViewRow>(
            r#"
            SELECT i.id, i.product_id, p.name AS product_name, p.code AS product_code,
                   i.location_id, l.name AS location_name, i.quantity,
                   i.created_at, i.updated_at
            FROM inventory i
            JOIN products p ON p.id = i.product_id
            JOIN locations l ON l.id = i.location_id
            WHERE i.location_id = $1
            ORDER BY p.name
            "#,
        )
        .bind(location_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| row.into_view(self.low_stock_threshold))
            .collect())
    }

    /// List the records of one product across locations
    pub async fn list_by_product(&self, product_id: Uuid) -> AppResult<Vec<InventoryView>> {
        let catalog = CatalogService::new(self.db.clone());
        if !catalog.product_exists(product_id).await? {
            return Err(AppError::NotFound("Product".to_string()));
        }

        let rows = sqlx::query_as::<_, InventoryViewRow>(
            r#"
            SELECT i.id, i.product_id, p.name AS product_name, p.code AS product_code,
                   i.location_id, l.name AS location_name, i.quantity,
                   i.created_at, i.updated_at
            FROM inventory i
            JOIN products p ON p.id = i.product_id
            JOIN locations l ON l.id = i.location_id
            WHERE i.product_id = $1
            ORDER BY l.name
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| row.into_view(self.low_stock_threshold))
            .collect())
    }

    /// List records at or below the threshold, most depleted first
    pub async fn list_low_stock(&self, threshold: Option<i64>) -> AppResult<Vec<InventoryView>> {
        let threshold = threshold.unwrap_or(self.low_stock_threshold);

        let rows = sqlx::query_as::<_, InventoryViewRow>(
            r#"
            SELECT i.id, i.product_id, p.name AS product_name, p.code AS product_code,
                   i.location_id, l.name AS location_name, i.quantity,
                   i.created_at, i.updated_at
            FROM inventory i
            JOIN products p ON p.id = i.product_id
            JOIN locations l ON l.id = i.location_id
            WHERE i.quantity <= $1
            ORDER BY i.quantity, p.name
            "#,
        )
        .bind(threshold)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| row.into_view(threshold))
            .collect())
    }

    /// List low-stock records at one location
    pub async fn list_low_stock_by_location(
        &self,
        location_id: Uuid,
        threshold: Option<i64>,
    ) -> AppResult<Vec<InventoryView>> {
        let catalog = CatalogService::new(self.db.clone());
        if !catalog.location_exists(location_id).await? {
            return Err(AppError::NotFound("Location".to_string()));
        }

        let threshold = threshold.unwrap_or(self.low_stock_threshold);

        let rows = sqlx::query_as::<_, InventoryViewRow>(
            r#"
            SELECT i.id, i.product_id, p.name AS product_name, p.code AS product_code,
                   i.location_id, l.name AS location_name, i.quantity,
                   i.created_at, i.updated_at
            FROM inventory i
            JOIN products p ON p.id = i.product_id
            JOIN locations l ON l.id = i.location_id
            WHERE i.location_id = $1 AND i.quantity <= $2
            ORDER BY i.quantity, p.name
            "#,
        )
        .bind(location_id)
        .bind(threshold)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| row.into_view(threshold))
            .collect())
    }

    /// Overwrite a record's quantity (physical count correction)
    pub async fn set_absolute_quantity(
        &self,
        record_id: Uuid,
        input: SetQuantityInput,
    ) -> AppResult<InventoryView> {
        if input.quantity < 0 {
            return Err(AppError::Validation {
                field: "quantity".to_string(),
                message: "Quantity cannot be negative".to_string(),
                message_es: "La cantidad no puede ser negativa".to_string(),
            });
        }

        let mut tx = self.db.begin().await?;
        let record = self.store.set_absolute(&mut *tx, record_id, input.quantity).await?;
        tx.commit().await?;

        tracing::info!("Set inventory {} quantity to {}", record.id, record.quantity);

        self.get_record(record_id).await
    }

    /// Deduct stock with an audit trail entry, all in one transaction
    pub async fn deduct_stock(
        &self,
        record_id: Uuid,
        input: DeductStockInput,
        performed_by: Uuid,
    ) -> AppResult<InventoryView> {
        if input.quantity <= 0 {
            return Err(AppError::Validation {
                field: "quantity".to_string(),
                message: "Quantity must be greater than zero".to_string(),
                message_es: "La cantidad debe ser mayor que cero".to_string(),
            });
        }

        let mut tx = self.db.begin().await?;

        let record = sqlx::query_as::<_, InventoryRecord>(
            r#"
            SELECT id, product_id, location_id, quantity, version, created_at, updated_at
            FROM inventory
            WHERE id = $1
            "#,
        )
        .bind(record_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Inventory record".to_string()))?;

        if record.location_id != input.location_id {
            return Err(AppError::LocationMismatch {
                inventory_id: record_id,
                expected: input.location_id,
                actual: record.location_id,
            });
        }

        let catalog = CatalogService::new(self.db.clone());
        if !catalog.location_exists(input.location_id).await? {
            return Err(AppError::NotFound("Location".to_string()));
        }

        let updated = self
            .store
            .decrement_if_sufficient(&mut *tx, record.product_id, record.location_id, input.quantity)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO stock_adjustments (inventory_id, location_id, quantity, reason, observations, performed_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(record_id)
        .bind(input.location_id)
        .bind(input.quantity)
        .bind(&input.reason)
        .bind(&input.observations)
        .bind(performed_by)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            "Deducted {} units from inventory {} (remaining: {})",
            input.quantity,
            record_id,
            updated.quantity
        );

        self.get_record(record_id).await
    }

    /// Adjustment audit rows for one record, newest first
    pub async fn list_adjustments(&self, record_id: Uuid) -> AppResult<Vec<StockAdjustment>> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM inventory WHERE id = $1)")
                .bind(record_id)
                .fetch_one(&self.db)
                .await?;

        if !exists {
            return Err(AppError::NotFound("Inventory record".to_string()));
        }

        let rows = sqlx::query_as::<_, AdjustmentRow>(
            r#"
            SELECT id, inventory_id, location_id, quantity, reason, observations, performed_by, created_at
            FROM stock_adjustments
            WHERE inventory_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(record_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(AdjustmentRow::into_model).collect())
    }
}
