//! Sale service: multi-line sales that deduct stock, and their reversal
//!
//! A sale decrements one inventory record per line inside a single
//! transaction; the first shortage aborts the whole sale so no partial
//! deduction ever survives. Voiding restores every line by delta under a row
//! lock on the sale, so a sale can be credited back at most once.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use shared::models::{ProductSummary, SaleLineInput};
use shared::types::{DateRange, PaginatedResponse, Pagination};
use shared::validation::{line_subtotal, sale_total};

use crate::error::{AppError, AppResult};
use crate::services::catalog::CatalogService;
use crate::services::ledger::LedgerStore;

/// Sale service for creating, querying, and voiding sales
#[derive(Clone)]
pub struct SaleService {
    db: PgPool,
    store: Arc<dyn LedgerStore>,
}

/// Sale enriched for API responses
#[derive(Debug, Clone, Serialize)]
pub struct SaleView {
    pub id: Uuid,
    pub location_id: Uuid,
    pub location_name: String,
    pub performed_by: Uuid,
    pub performed_by_name: String,
    pub vehicle_id: Option<Uuid>,
    pub vehicle_plate: Option<String>,
    pub delivery_date: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub total: Decimal,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub lines: Vec<SaleLineView>,
}

/// Sale line with product display data
#[derive(Debug, Clone, Serialize)]
pub struct SaleLineView {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
}

/// Summary row for sale listings
#[derive(Debug, Clone, Serialize)]
pub struct SaleSummary {
    pub id: Uuid,
    pub location_id: Uuid,
    pub location_name: String,
    pub performed_by: Uuid,
    pub performed_by_name: String,
    pub delivery_date: Option<DateTime<Utc>>,
    pub total: Decimal,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// Row for sale header queries
#[derive(Debug, FromRow)]
struct SaleHeaderRow {
    id: Uuid,
    location_id: Uuid,
    location_name: String,
    performed_by: Uuid,
    performed_by_name: String,
    vehicle_id: Option<Uuid>,
    vehicle_plate: Option<String>,
    delivery_date: Option<DateTime<Utc>>,
    description: Option<String>,
    total: Decimal,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl SaleHeaderRow {
    fn into_view(self, lines: Vec<SaleLineView>) -> SaleView {
        SaleView {
            id: self.id,
            location_id: self.location_id,
            location_name: self.location_name,
            performed_by: self.performed_by,
            performed_by_name: self.performed_by_name,
            vehicle_id: self.vehicle_id,
            vehicle_plate: self.vehicle_plate,
            delivery_date: self.delivery_date,
            description: self.description,
            total: self.total,
            active: self.active,
            created_at: self.created_at,
            updated_at: self.updated_at,
            lines,
        }
    }
}

/// Row for sale line queries
#[derive(Debug, FromRow)]
struct SaleLineRow {
    id: Uuid,
    product_id: Uuid,
    product_name: String,
    quantity: i64,
    unit_price: Decimal,
}

impl SaleLineRow {
    fn into_view(self) -> SaleLineView {
        let subtotal = line_subtotal(self.quantity, self.unit_price);
        SaleLineView {
            id: self.id,
            product_id: self.product_id,
            product_name: self.product_name,
            quantity: self.quantity,
            unit_price: self.unit_price,
            subtotal,
        }
    }
}

/// Row for sale summary queries
#[derive(Debug, FromRow)]
struct SaleSummaryRow {
    id: Uuid,
    location_id: Uuid,
    location_name: String,
    performed_by: Uuid,
    performed_by_name: String,
    delivery_date: Option<DateTime<Utc>>,
    total: Decimal,
    active: bool,
    created_at: DateTime<Utc>,
}

impl SaleSummaryRow {
    fn into_summary(self) -> SaleSummary {
        SaleSummary {
            id: self.id,
            location_id: self.location_id,
            location_name: self.location_name,
            performed_by: self.performed_by,
            performed_by_name: self.performed_by_name,
            delivery_date: self.delivery_date,
            total: self.total,
            active: self.active,
            created_at: self.created_at,
        }
    }
}

/// Input for creating a sale
#[derive(Debug, Deserialize, Validate)]
pub struct CreateSaleInput {
    pub location_id: Uuid,
    pub vehicle_id: Option<Uuid>,
    pub delivery_date: Option<DateTime<Utc>>,
    pub description: Option<String>,
    #[validate(length(min = 1, message = "A sale must contain at least one line"))]
    pub lines: Vec<SaleLineInput>,
}

/// Input for rescheduling a delivery
#[derive(Debug, Deserialize)]
pub struct UpdateDeliveryDateInput {
    pub delivery_date: DateTime<Utc>,
}

/// Input for replacing a sale's description
#[derive(Debug, Deserialize)]
pub struct UpdateDescriptionInput {
    pub description: String,
}

impl SaleService {
    /// Create a new SaleService instance
    pub fn new(db: PgPool, store: Arc<dyn LedgerStore>) -> Self {
        Self { db, store }
    }

    /// Create a sale, deducting stock per line in one transaction
    pub async fn create_sale(
        &self,
        performed_by: Uuid,
        input: CreateSaleInput,
    ) -> AppResult<SaleView> {
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
            if line.unit_price < Decimal::ZERO {
                return Err(AppError::Validation {
                    field: "unit_price".to_string(),
                    message: "Unit price cannot be negative".to_string(),
                    message_es: "El precio unitario no puede ser negativo".to_string(),
                });
            }
        }

        let catalog = CatalogService::new(self.db.clone());
        let location = catalog.get_location(input.location_id).await?;
        catalog.get_user(performed_by).await?;
        if let Some(vehicle_id) = input.vehicle_id {
            catalog.get_vehicle(vehicle_id).await?;
        }

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

        // The total is fixed at creation and never recomputed afterwards
        let total = sale_total(&input.lines);

        let mut tx = self.db.begin().await?;

        // Lines in submitted order; the first shortage rolls back everything
        for line in &input.lines {
            self.store
                .get(&mut *tx, line.product_id, input.location_id)
                .await?
                .ok_or_else(|| {
                    AppError::NotFound(format!(
                        "Inventory for product {} at location {}",
                        line.product_id, input.location_id
                    ))
                })?;

            self.store
                .decrement_if_sufficient(&mut *tx, line.product_id, input.location_id, line.quantity)
                .await?;
        }

        let sale_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO sales (location_id, performed_by, vehicle_id, delivery_date, description, total, active)
            VALUES ($1, $2, $3, $4, $5, $6, TRUE)
            RETURNING id
            "#,
        )
        .bind(input.location_id)
        .bind(performed_by)
        .bind(input.vehicle_id)
        .bind(input.delivery_date)
        .bind(&input.description)
        .bind(total)
        .fetch_one(&mut *tx)
        .await?;

        for line in &input.lines {
            sqlx::query(
                r#"
                INSERT INTO sale_lines (sale_id, product_id, quantity, unit_price)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(sale_id)
            .bind(line.product_id)
            .bind(line.quantity)
            .bind(line.unit_price)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::info!(
            "Created sale {} at location {} (total: {})",
            sale_id,
            location.id,
            total
        );

        self.get(sale_id).await
    }

    /// Void a sale: restore every line's stock and flip the activity flag
    pub async fn void_sale(&self, sale_id: Uuid) -> AppResult<SaleView> {
        let mut tx = self.db.begin().await?;

        // Lock the sale row so two concurrent voids serialize; the loser
        // re-reads active = false and fails without double-crediting
        let (location_id, active) = sqlx::query_as::<_, (Uuid, bool)>(
            "SELECT location_id, active FROM sales WHERE id = $1 FOR UPDATE",
        )
        .bind(sale_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Sale".to_string()))?;

        if !active {
            return Err(AppError::AlreadyVoided(sale_id));
        }

        let lines = sqlx::query_as::<_, (Uuid, i64)>(
            "SELECT product_id, quantity FROM sale_lines WHERE sale_id = $1",
        )
        .bind(sale_id)
        .fetch_all(&mut *tx)
        .await?;

        // Restore by delta, not absolute value, so interleaved mutations on
        // the same records stay correct
        for (product_id, quantity) in &lines {
            self.store
                .increment(&mut *tx, *product_id, location_id, *quantity)
                .await?;
        }

        sqlx::query("UPDATE sales SET active = FALSE, updated_at = NOW() WHERE id = $1")
            .bind(sale_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!("Voided sale {} ({} lines restored)", sale_id, lines.len());

        self.get(sale_id).await
    }

    /// Reschedule a delivery; voided sales cannot be rescheduled
    pub async fn update_delivery_date(
        &self,
        sale_id: Uuid,
        input: UpdateDeliveryDateInput,
    ) -> AppResult<SaleView> {
        // The activity guard lives in the UPDATE itself; a separate
        // check-then-write would let a concurrent void land in between
        let updated = sqlx::query(
            "UPDATE sales SET delivery_date = $2, updated_at = NOW() WHERE id = $1 AND active = TRUE",
        )
        .bind(sale_id)
        .bind(input.delivery_date)
        .execute(&self.db)
        .await?
        .rows_affected();

        if updated == 0 {
            let exists =
                sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM sales WHERE id = $1)")
                    .bind(sale_id)
                    .fetch_one(&self.db)
                    .await?;
            if exists {
                return Err(AppError::AlreadyVoided(sale_id));
            }
            return Err(AppError::NotFound("Sale".to_string()));
        }

        self.get(sale_id).await
    }

    /// Replace a sale's description; voided sales cannot be edited
    pub async fn update_description(
        &self,
        sale_id: Uuid,
        input: UpdateDescriptionInput,
    ) -> AppResult<SaleView> {
        if input.description.trim().is_empty() {
            return Err(AppError::Validation {
                field: "description".to_string(),
                message: "Description cannot be empty".to_string(),
                message_es: "La descripción no puede estar vacía".to_string(),
            });
        }

        let updated = sqlx::query(
            "UPDATE sales SET description = $2, updated_at = NOW() WHERE id = $1 AND active = TRUE",
        )
        .bind(sale_id)
        .bind(&input.description)
        .execute(&self.db)
        .await?
        .rows_affected();

        if updated == 0 {
            let exists =
                sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM sales WHERE id = $1)")
                    .bind(sale_id)
                    .fetch_one(&self.db)
                    .await?;
            if exists {
                return Err(AppError::AlreadyVoided(sale_id));
            }
            return Err(AppError::NotFound("Sale".to_string()));
        }

        self.get(sale_id).await
    }

    /// Get a sale by id, with its lines
    pub async fn get(&self, sale_id: Uuid) -> AppResult<SaleView> {
        let header = sqlx::query_as::<_, SaleHeaderRow>(
            r#"
            SELECT s.id, s.location_id, l.name AS location_name,
                   s.performed_by, u.full_name AS performed_by_name,
                   s.vehicle_id, v.plate AS vehicle_plate,
                   s.delivery_date, s.description, s.total, s.active,
                   s.created_at, s.updated_at
            FROM sales s
            JOIN locations l ON l.id = s.location_id
            JOIN users u ON u.id = s.performed_by
            LEFT JOIN vehicles v ON v.id = s.vehicle_id
            WHERE s.id = $1
            "#,
        )
        .bind(sale_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Sale".to_string()))?;

        let lines = self.fetch_lines(sale_id).await?;

        Ok(header.into_view(lines))
    }

    /// List sales, newest first, paginated, optionally within a datetime range
    pub async fn list(
        &self,
        pagination: Pagination,
        range: Option<DateRange>,
    ) -> AppResult<PaginatedResponse<SaleSummary>> {
        if let Some(range) = &range {
            Self::check_range(range)?;
        }

        let (total, rows) = match range {
            Some(range) => {
                let total = sqlx::query_scalar::<_, i64>(
                    "SELECT COUNT(*) FROM sales WHERE created_at BETWEEN $1 AND $2",
                )
                .bind(range.start)
                .bind(range.end)
                .fetch_one(&self.db)
                .await?;

                let rows = sqlx::query_as::<_, SaleSummaryRow>(
                    r#"
                    SELECT s.id, s.location_id, l.name AS location_name,
                           s.performed_by, u.full_name AS performed_by_name,
                           s.delivery_date, s.total, s.active, s.created_at
                    FROM sales s
                    JOIN locations l ON l.id = s.location_id
                    JOIN users u ON u.id = s.performed_by
                    WHERE s.created_at BETWEEN $1 AND $2
                    ORDER BY s.created_at DESC
                    LIMIT $3 OFFSET $4
                    "#,
                )
                .bind(range.start)
                .bind(range.end)
                .bind(pagination.limit())
                .bind(pagination.offset())
                .fetch_all(&self.db)
                .await?;

                (total, rows)
            }
            None => {
                let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM sales")
                    .fetch_one(&self.db)
                    .await?;

                let rows = sqlx::query_as::<_, SaleSummaryRow>(
                    r#"
                    SELECT s.id, s.location_id, l.name AS location_name,
                           s.performed_by, u.full_name AS performed_by_name,
                           s.delivery_date, s.total, s.active, s.created_at
                    FROM sales s
                    JOIN locations l ON l.id = s.location_id
                    JOIN users u ON u.id = s.performed_by
                    ORDER BY s.created_at DESC
                    LIMIT $1 OFFSET $2
                    "#,
                )
                .bind(pagination.limit())
                .bind(pagination.offset())
                .fetch_all(&self.db)
                .await?;

                (total, rows)
            }
        };

        let data = rows.into_iter().map(SaleSummaryRow::into_summary).collect();

        Ok(PaginatedResponse::new(data, pagination, total as u64))
    }

    /// List the sales of one location, paginated, optionally within a range
    pub async fn list_by_location(
        &self,
        location_id: Uuid,
        pagination: Pagination,
        range: Option<DateRange>,
    ) -> AppResult<PaginatedResponse<SaleSummary>> {
        if let Some(range) = &range {
            Self::check_range(range)?;
        }

        let catalog = CatalogService::new(self.db.clone());
        if !catalog.location_exists(location_id).await? {
            return Err(AppError::NotFound("Location".to_string()));
        }

        let (total, rows) = match range {
            Some(range) => {
                let total = sqlx::query_scalar::<_, i64>(
                    "SELECT COUNT(*) FROM sales WHERE location_id = $1 AND created_at BETWEEN $2 AND $3",
                )
                .bind(location_id)
                .bind(range.start)
                .bind(range.end)
                .fetch_one(&self.db)
                .await?;

                let rows = sqlx::query_as::<_, SaleSummaryRow>(
                    r#"
                    SELECT s.id, s.location_id, l.name AS location_name,
                           s.performed_by, u.full_name AS performed_by_name,
                           s.delivery_date, s.total, s.active, s.created_at
                    FROM sales s
                    JOIN locations l ON l.id = s.location_id
                    JOIN users u ON u.id = s.performed_by
                    WHERE s.location_id = $1 AND s.created_at BETWEEN $2 AND $3
                    ORDER BY s.created_at DESC
                    LIMIT $4 OFFSET $5
                    "#,
                )
                .bind(location_id)
                .bind(range.start)
                .bind(range.end)
                .bind(pagination.limit())
                .bind(pagination.offset())
                .fetch_all(&self.db)
                .await?;

                (total, rows)
            }
            None => {
                let total = sqlx::query_scalar::<_, i64>(
                    "SELECT COUNT(*) FROM sales WHERE location_id = $1",
                )
                .bind(location_id)
                .fetch_one(&self.db)
                .await?;

                let rows = sqlx::query_as::<_, SaleSummaryRow>(
                    r#"
                    SELECT s.id, s.location_id, l.name AS location_name,
                           s.performed_by, u.full_name AS performed_by_name,
                           s.delivery_date, s.total, s.active, s.created_at
                    FROM sales s
                    JOIN locations l ON l.id = s.location_id
                    JOIN users u ON u.id = s.performed_by
                    WHERE s.location_id = $1
                    ORDER BY s.created_at DESC
                    LIMIT $2 OFFSET $3
                    "#,
                )
                .bind(location_id)
                .bind(pagination.limit())
                .bind(pagination.offset())
                .fetch_all(&self.db)
                .await?;

                (total, rows)
            }
        };

        let data = rows.into_iter().map(SaleSummaryRow::into_summary).collect();

        Ok(PaginatedResponse::new(data, pagination, total as u64))
    }

    /// List the sales recorded by one user, newest first, paginated
    pub async fn list_by_user(
        &self,
        user_id: Uuid,
        pagination: Pagination,
    ) -> AppResult<PaginatedResponse<SaleSummary>> {
        let catalog = CatalogService::new(self.db.clone());
        catalog.get_user(user_id).await?;

        let total =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM sales WHERE performed_by = $1")
                .bind(user_id)
                .fetch_one(&self.db)
                .await?;

        let rows = sqlx::query_as::<_, SaleSummaryRow>(
            r#"
            SELECT s.id, s.location_id, l.name AS location_name,
                   s.performed_by, u.full_name AS performed_by_name,
                   s.delivery_date, s.total, s.active, s.created_at
            FROM sales s
            JOIN locations l ON l.id = s.location_id
            JOIN users u ON u.id = s.performed_by
            WHERE s.performed_by = $1
            ORDER BY s.created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        let data = rows.into_iter().map(SaleSummaryRow::into_summary).collect();

        Ok(PaginatedResponse::new(data, pagination, total as u64))
    }

    /// Today's sales for a location (UTC day), newest first
    pub async fn list_today_by_location(&self, location_id: Uuid) -> AppResult<Vec<SaleSummary>> {
        let catalog = CatalogService::new(self.db.clone());
        if !catalog.location_exists(location_id).await? {
            return Err(AppError::NotFound("Location".to_string()));
        }

        let start = Utc::now().date_naive().and_time(NaiveTime::MIN).and_utc();
        let end = start + Duration::days(1);

        let rows = sqlx::query_as::<_, SaleSummaryRow>(
            r#"
            SELECT s.id, s.location_id, l.name AS location_name,
                   s.performed_by, u.full_name AS performed_by_name,
                   s.delivery_date, s.total, s.active, s.created_at
            FROM sales s
            JOIN locations l ON l.id = s.location_id
            JOIN users u ON u.id = s.performed_by
            WHERE s.location_id = $1 AND s.created_at >= $2 AND s.created_at < $3
            ORDER BY s.created_at DESC
            "#,
        )
        .bind(location_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(SaleSummaryRow::into_summary).collect())
    }

    /// Active sales with a future delivery date, soonest first, paginated
    pub async fn list_pending_deliveries(
        &self,
        pagination: Pagination,
    ) -> AppResult<PaginatedResponse<SaleSummary>> {
        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM sales WHERE active = TRUE AND delivery_date > NOW()",
        )
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, SaleSummaryRow>(
            r#"
            SELECT s.id, s.location_id, l.name AS location_name,
                   s.performed_by, u.full_name AS performed_by_name,
                   s.delivery_date, s.total, s.active, s.created_at
            FROM sales s
            JOIN locations l ON l.id = s.location_id
            JOIN users u ON u.id = s.performed_by
            WHERE s.active = TRUE AND s.delivery_date > NOW()
            ORDER BY s.delivery_date
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        let data = rows.into_iter().map(SaleSummaryRow::into_summary).collect();

        Ok(PaginatedResponse::new(data, pagination, total as u64))
    }

    /// Pending deliveries for one location, soonest first, paginated
    pub async fn list_pending_deliveries_by_location(
        &self,
        location_id: Uuid,
        pagination: Pagination,
    ) -> AppResult<PaginatedResponse<SaleSummary>> {
        let catalog = CatalogService::new(self.db.clone());
        if !catalog.location_exists(location_id).await? {
            return Err(AppError::NotFound("Location".to_string()));
        }

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM sales WHERE location_id = $1 AND active = TRUE AND delivery_date > NOW()",
        )
        .bind(location_id)
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, SaleSummaryRow>(
            r#"
            SELECT s.id, s.location_id, l.name AS location_name,
                   s.performed_by, u.full_name AS performed_by_name,
                   s.delivery_date, s.total, s.active, s.created_at
            FROM sales s
            JOIN locations l ON l.id = s.location_id
            JOIN users u ON u.id = s.performed_by
            WHERE s.location_id = $1 AND s.active = TRUE AND s.delivery_date > NOW()
            ORDER BY s.delivery_date
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(location_id)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        let data = rows.into_iter().map(SaleSummaryRow::into_summary).collect();

        Ok(PaginatedResponse::new(data, pagination, total as u64))
    }

    async fn fetch_lines(&self, sale_id: Uuid) -> AppResult<Vec<SaleLineView>> {
        let rows = sqlx::query_as::<_, SaleLineRow>(
            r#"
            SELECT sl.id, sl.product_id, p.name AS product_name, sl.quantity, sl.unit_price
            FROM sale_lines sl
            JOIN products p ON p.id = sl.product_id
            WHERE sl.sale_id = $1
            ORDER BY p.name
            "#,
        )
        .bind(sale_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(SaleLineRow::into_view).collect())
    }

    fn check_range(range: &DateRange) -> AppResult<()> {
        if !range.is_ordered() {
            return Err(AppError::Validation {
                field: "start".to_string(),
                message: "Start date must not be after end date".to_string(),
                message_es: "La fecha de inicio no puede ser posterior a la fecha de fin"
                    .to_string(),
            });
        }
        Ok(())
    }
}
