//! Stock-in service: receiving shipments into branch inventory
//!
//! A receipt increments one inventory record per line and persists an event
//! with its lines in the same transaction, so partial receipts never exist.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use shared::models::{ProductSummary, StockInLineInput};
use shared::types::{DateRange, PaginatedResponse, Pagination};
use shared::validation::line_subtotal;

use crate::error::{AppError, AppResult};
use crate::services::catalog::CatalogService;
use crate::services::ledger::LedgerStore;

/// Stock-in service for recording incoming shipments
#[derive(Clone)]
pub struct StockInService {
    db: PgPool,
    store: Arc<dyn LedgerStore>,
}

/// Stock receipt enriched for API responses
#[derive(Debug, Clone, Serialize)]
pub struct StockInView {
    pub id: Uuid,
    pub location_id: Uuid,
    pub location_name: String,
    pub performed_by: Uuid,
    pub performed_by_name: String,
    pub total_cost: Decimal,
    pub created_at: DateTime<Utc>,
    pub lines: Vec<StockInLineView>,
}

/// Receipt line with product display data
#[derive(Debug, Clone, Serialize)]
pub struct StockInLineView {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i64,
    pub unit_cost: Decimal,
    pub subtotal: Decimal,
}

/// Summary row for receipt listings
#[derive(Debug, Clone, Serialize)]
pub struct StockInSummary {
    pub id: Uuid,
    pub location_id: Uuid,
    pub location_name: String,
    pub performed_by: Uuid,
    pub performed_by_name: String,
    pub line_count: i64,
    pub total_cost: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Row for receipt header queries
#[derive(Debug, FromRow)]
struct StockInHeaderRow {
    id: Uuid,
    location_id: Uuid,
    location_name: String,
    performed_by: Uuid,
    performed_by_name: String,
    created_at: DateTime<Utc>,
}

impl StockInHeaderRow {
    fn into_view(self, lines: Vec<StockInLineView>) -> StockInView {
        let total_cost = lines.iter().map(|line| line.subtotal).sum();
        StockInView {
            id: self.id,
            location_id: self.location_id,
            location_name: self.location_name,
            performed_by: self.performed_by,
            performed_by_name: self.performed_by_name,
            total_cost,
            created_at: self.created_at,
            lines,
        }
    }
}

/// Row for receipt line queries
#[derive(Debug, FromRow)]
struct StockInLineRow {
    id: Uuid,
    product_id: Uuid,
    product_name: String,
    quantity: i64,
    unit_cost: Decimal,
}

impl StockInLineRow {
    fn into_view(self) -> StockInLineView {
        let subtotal = line_subtotal(self.quantity, self.unit_cost);
        StockInLineView {
            id: self.id,
            product_id: self.product_id,
            product_name: self.product_name,
            quantity: self.quantity,
            unit_cost: self.unit_cost,
            subtotal,
        }
    }
}

/// Row for receipt summary queries
#[derive(Debug, FromRow)]
struct StockInSummaryRow {
    id: Uuid,
    location_id: Uuid,
    location_name: String,
    performed_by: Uuid,
    performed_by_name: String,
    line_count: i64,
    total_cost: Decimal,
    created_at: DateTime<Utc>,
}

impl StockInSummaryRow {
    fn into_summary(self) -> StockInSummary {
        StockInSummary {
            id: self.id,
            location_id: self.location_id,
            location_name: self.location_name,
            performed_by: self.performed_by,
            performed_by_name: self.performed_by_name,
            line_count: self.line_count,
            total_cost: self.total_cost,
            created_at: self.created_at,
        }
    }
}

/// Input for receiving a shipment
#[derive(Debug, Deserialize, Validate)]
pub struct ReceiveStockInput {
    pub location_id: Uuid,
    #[validate(length(min = 1, message = "A receipt must contain at least one line"))]
    pub lines: Vec<StockInLineInput>,
}

impl StockInService {
    /// Create a new StockInService instance
    pub fn new(db: PgPool, store: Arc<dyn LedgerStore>) -> Self {
        Self { db, store }
    }

    /// Record a shipment: increment stock per line and persist the event
    pub async fn receive(
        &self,
        performed_by: Uuid,
        input: ReceiveStockInput,
    ) -> AppResult<StockInView> {
        input
            .validate()
            .map_err(|e| AppError::ValidationError(e.to_string()))?;

        for line in &input.lines {
            if line.quantity <= 0 {
                return Err(AppError::Validation {
                    field: "quantity".to_string(),
                    message: "Quantity must be greater than zero".to_string(),
                    message_es: "La cantidad debe ser mayor que cero".to_string(),
                });
            }
            if line.unit_cost < Decimal::ZERO {
                return Err(AppError::Validation {
                    field: "unit_cost".to_string(),
                    message: "Unit cost cannot be negative".to_string(),
                    message_es: "El costo unitario no puede ser negativo".to_string(),
                });
            }
        }

        let catalog = CatalogService::new(self.db.clone());
        catalog.get_location(input.location_id).await?;
        catalog.get_user(performed_by).await?;

        // Resolve every product before any stock moves
        let product_ids: Vec<Uuid> = input.lines.iter().map(|line| line.product_id).collect();
        let products: HashMap<Uuid, ProductSummary> = catalog
            .get_products(&product_ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        for line in &input.lines {
            if !products.contains_key(&line.product_id) {
                return Err(AppError::NotFound(format!("Product {}", line.product_id)));
            }
        }

        let mut tx = self.db.begin().await?;

        let event_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO stock_in_events (location_id, performed_by)
            VALUES ($1, $2)
            RETURNING id
            "#,
        )
        .bind(input.location_id)
        .bind(performed_by)
        .fetch_one(&mut *tx)
        .await?;

        for line in &input.lines {
            self.store
                .increment(&mut *tx, line.product_id, input.location_id, line.quantity)
                .await?;

            sqlx::query(
                r#"
                INSERT INTO stock_in_lines (stock_in_id, product_id, quantity, unit_cost)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(event_id)
            .bind(line.product_id)
            .bind(line.quantity)
            .bind(line.unit_cost)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::info!(
            "Received stock-in {} at location {} ({} lines)",
            event_id,
            input.location_id,
            input.lines.len()
        );

        self.get(event_id).await
    }

    /// Get a receipt by id, with its lines
    pub async fn get(&self, stock_in_id: Uuid) -> AppResult<StockInView> {
        let header = sqlx::query_as::<_, StockInHeaderRow>(
            r#"
            SELECT si.id, si.location_id, l.name AS location_name,
                   si.performed_by, u.full_name AS performed_by_name, si.created_at
            FROM stock_in_events si
            JOIN locations l ON l.id = si.location_id
            JOIN users u ON u.id = si.performed_by
            WHERE si.id = $1
            "#,
        )
        .bind(stock_in_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Stock-in event".to_string()))?;

        let lines = self.fetch_lines(stock_in_id).await?;

        Ok(header.into_view(lines))
    }

    /// List receipts, newest first, paginated
    pub async fn list(&self, pagination: Pagination) -> AppResult<PaginatedResponse<StockInSummary>> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM stock_in_events")
            .fetch_one(&self.db)
            .await?;

        let rows = sqlx::query_as::<_, StockInSummaryRow>(
            r#"
            SELECT si.id, si.location_id, l.name AS location_name,
                   si.performed_by, u.full_name AS performed_by_name,
                   COUNT(sl.id) AS line_count,
                   COALESCE(SUM(sl.quantity * sl.unit_cost), 0) AS total_cost,
                   si.created_at
            FROM stock_in_events si
            JOIN locations l ON l.id = si.location_id
            JOIN users u ON u.id = si.performed_by
            LEFT JOIN stock_in_lines sl ON sl.stock_in_id = si.id
            GROUP BY si.id, l.name, u.full_name
            ORDER BY si.created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        let data = rows
            .into_iter()
            .map(StockInSummaryRow::into_summary)
            .collect();

        Ok(PaginatedResponse::new(data, pagination, total as u64))
    }

    /// List the receipts of one location, newest first
    pub async fn list_by_location(&self, location_id: Uuid) -> AppResult<Vec<StockInSummary>> {
        let catalog = CatalogService::new(self.db.clone());
        if !catalog.location_exists(location_id).await? {
            return Err(AppError::NotFound("Location".to_string()));
        }

        let rows = sqlx::query_as::<_, StockInSummaryRow>(
            r#"
            SELECT si.id, si.location_id, l.name AS location_name,
                   si.performed_by, u.full_name AS performed_by_name,
                   COUNT(sl.id) AS line_count,
                   COALESCE(SUM(sl.quantity * sl.unit_cost), 0) AS total_cost,
                   si.created_at
            FROM stock_in_events si
            JOIN locations l ON l.id = si.location_id
            JOIN users u ON u.id = si.performed_by
            LEFT JOIN stock_in_lines sl ON sl.stock_in_id = si.id
            WHERE si.location_id = $1
            GROUP BY si.id, l.name, u.full_name
            ORDER BY si.created_at DESC
            "#,
        )
        .bind(location_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(StockInSummaryRow::into_summary).collect())
    }

    /// List the receipts recorded by one user, newest first
    pub async fn list_by_user(&self, user_id: Uuid) -> AppResult<Vec<StockInSummary>> {
        let catalog = CatalogService::new(self.db.clone());
        catalog.get_user(user_id).await?;

        let rows = sqlx::query_as::<_, StockInSummaryRow>(
            r#"
            SELECT si.id, si.location_id, l.name AS location_name,
                   si.performed_by, u.full_name AS performed_by_name,
                   COUNT(sl.id) AS line_count,
                   COALESCE(SUM(sl.quantity * sl.unit_cost), 0) AS total_cost,
                   si.created_at
            FROM stock_in_events si
            JOIN locations l ON l.id = si.location_id
            JOIN users u ON u.id = si.performed_by
            LEFT JOIN stock_in_lines sl ON sl.stock_in_id = si.id
            WHERE si.performed_by = $1
            GROUP BY si.id, l.name, u.full_name
            ORDER BY si.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(StockInSummaryRow::into_summary).collect())
    }

    /// List receipts in a datetime range, newest first
    pub async fn list_by_date_range(&self, range: DateRange) -> AppResult<Vec<StockInSummary>> {
        if !range.is_ordered() {
            return Err(AppError::Validation {
                field: "start".to_string(),
                message: "Start date must not be after end date".to_string(),
                message_es: "La fecha de inicio no puede ser posterior a la fecha de fin"
                    .to_string(),
            });
        }

        let rows = sqlx::query_as::<_, StockInSummaryRow>(
            r#"
            SELECT si.id, si.location_id, l.name AS location_name,
                   si.performed_by, u.full_name AS performed_by_name,
                   COUNT(sl.id) AS line_count,
                   COALESCE(SUM(sl.quantity * sl.unit_cost), 0) AS total_cost,
                   si.created_at
            FROM stock_in_events si
            JOIN locations l ON l.id = si.location_id
            JOIN users u ON u.id = si.performed_by
            LEFT JOIN stock_in_lines sl ON sl.stock_in_id = si.id
            WHERE si.created_at BETWEEN $1 AND $2
            GROUP BY si.id, l.name, u.full_name
            ORDER BY si.created_at DESC
            "#,
        )
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(StockInSummaryRow::into_summary).collect())
    }

    /// List the receipts of one location in a datetime range, newest first
    pub async fn list_by_location_and_date_range(
        &self,
        location_id: Uuid,
        range: DateRange,
    ) -> AppResult<Vec<StockInSummary>> {
        if !range.is_ordered() {
            return Err(AppError::Validation {
                field: "start".to_string(),
                message: "Start date must not be after end date".to_string(),
                message_es: "La fecha de inicio no puede ser posterior a la fecha de fin"
                    .to_string(),
            });
        }

        let catalog = CatalogService::new(self.db.clone());
        if !catalog.location_exists(location_id).await? {
            return Err(AppError::NotFound("Location".to_string()));
        }

        let rows = sqlx::query_as::<_, StockInSummaryRow>(
            r#"
            SELECT si.id, si.location_id, l.name AS location_name,
                   si.performed_by, u.full_name AS performed_by_name,
                   COUNT(sl.id) AS line_count,
                   COALESCE(SUM(sl.quantity * sl.unit_cost), 0) AS total_cost,
                   si.created_at
            FROM stock_in_events si
            JOIN locations l ON l.id = si.location_id
            JOIN users u ON u.id = si.performed_by
            LEFT JOIN stock_in_lines sl ON sl.stock_in_id = si.id
            WHERE si.location_id = $1 AND si.created_at BETWEEN $2 AND $3
            GROUP BY si.id, l.name, u.full_name
            ORDER BY si.created_at DESC
            "#,
        )
        .bind(location_id)
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(StockInSummaryRow::into_summary).collect())
    }

    async fn fetch_lines(&self, stock_in_id: Uuid) -> AppResult<Vec<StockInLineView>> {
        let rows = sqlx::query_as::<_, StockInLineRow>(
            r#"
            SELECT sl.id, sl.product_id, p.name AS product_name, sl.quantity, sl.unit_cost
            FROM stock_in_lines sl
            JOIN products p ON p.id = sl.product_id
            WHERE sl.stock_in_id = $1
            ORDER BY p.name
            "#,
        )
        .bind(stock_in_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(StockInLineRow::into_view).collect())
    }
}
