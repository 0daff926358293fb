//! Stock ledger: the single mutation path for inventory quantities
//!
//! Every component that moves stock (sales, receipts, voids, manual
//! adjustments) goes through [`LedgerStore`]; nothing else writes the
//! `quantity` column. Two implementations serialize concurrent mutations of
//! the same record in different ways, chosen at startup from
//! `ledger.strategy`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgConnection};
use uuid::Uuid;

use crate::config::LedgerStrategy;
use crate::error::{AppError, AppResult};

/// Stock record for one product at one location
///
/// At most one row exists per `(product_id, location_id)`; `quantity` never
/// goes below zero. Both invariants are backed by database constraints.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct InventoryRecord {
    pub id: Uuid,
    pub product_id: Uuid,
    pub location_id: Uuid,
    pub quantity: i64,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The ledger's mutation contract
///
/// Methods run on a caller-supplied connection so a composite operation (a
/// sale, a void, a receipt) wraps several calls in one database transaction;
/// dropping the transaction on error rolls every call back together.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Read the record for a pair, if one is registered
    async fn get(
        &self,
        conn: &mut PgConnection,
        product_id: Uuid,
        location_id: Uuid,
    ) -> AppResult<Option<InventoryRecord>>;

    /// Return the existing record or create one with the given opening quantity
    ///
    /// A concurrent creation race is resolved by returning the winner's
    /// record; callers that only need the record to exist never see an error.
    async fn ensure(
        &self,
        conn: &mut PgConnection,
        product_id: Uuid,
        location_id: Uuid,
        initial_quantity: i64,
    ) -> AppResult<InventoryRecord>;

    /// Add `delta` units, creating the record first if absent
    async fn increment(
        &self,
        conn: &mut PgConnection,
        product_id: Uuid,
        location_id: Uuid,
        delta: i64,
    ) -> AppResult<InventoryRecord>;

    /// Subtract `delta` units, failing without effect when stock is short
    ///
    /// The availability check and the subtraction are indivisible; a record
    /// observed as sufficient cannot be drained by a concurrent caller before
    /// the subtraction lands.
    async fn decrement_if_sufficient(
        &self,
        conn: &mut PgConnection,
        product_id: Uuid,
        location_id: Uuid,
        delta: i64,
    ) -> AppResult<InventoryRecord>;

    /// Overwrite the quantity of an existing record
    async fn set_absolute(
        &self,
        conn: &mut PgConnection,
        record_id: Uuid,
        new_quantity: i64,
    ) -> AppResult<InventoryRecord>;
}

/// Build the store for the configured strategy
pub fn build_store(strategy: LedgerStrategy) -> Arc<dyn LedgerStore> {
    match strategy {
        LedgerStrategy::RowLock => Arc::new(RowLockLedger),
        LedgerStrategy::Optimistic => Arc::new(OptimisticLedger),
    }
}

/// Pessimistic store: `SELECT ... FOR UPDATE` pins the row while the check
/// and the write happen, so concurrent writers queue on the row lock
pub struct RowLockLedger;

#[async_trait]
impl LedgerStore for RowLockLedger {
    async fn get(
        &self,
        conn: &mut PgConnection,
        product_id: Uuid,
        location_id: Uuid,
    ) -> AppResult<Option<InventoryRecord>> {
        let record = sqlx::query_as::<_, InventoryRecord>(
            r#"
            SELECT id, product_id, location_id, quantity, version, created_at, updated_at
            FROM inventory
            WHERE product_id = $1 AND location_id = $2
            "#,
        )
        .bind(product_id)
        .bind(location_id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(record)
    }

    async fn ensure(
        &self,
        conn: &mut PgConnection,
        product_id: Uuid,
        location_id: Uuid,
        initial_quantity: i64,
    ) -> AppResult<InventoryRecord> {
        if initial_quantity < 0 {
            return Err(AppError::ValidationError(
                "Initial quantity cannot be negative".to_string(),
            ));
        }

        // Losing a concurrent create is not an error: the winner's row is
        // re-read below and the loser's opening quantity is discarded
        sqlx::query(
            r#"
            INSERT INTO inventory (product_id, location_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (product_id, location_id) DO NOTHING
            "#,
        )
        .bind(product_id)
        .bind(location_id)
        .bind(initial_quantity)
        .execute(&mut *conn)
        .await?;

        self.get(&mut *conn, product_id, location_id)
            .await?
            .ok_or_else(|| AppError::Internal("inventory row missing after ensure".to_string()))
    }

    async fn increment(
        &self,
        conn: &mut PgConnection,
        product_id: Uuid,
        location_id: Uuid,
        delta: i64,
    ) -> AppResult<InventoryRecord> {
        if delta <= 0 {
            return Err(AppError::ValidationError(
                "Quantity must be greater than zero".to_string(),
            ));
        }

        // Single-statement upsert: the first receipt creates the record and
        // later receipts add to it atomically
        let record = sqlx::query_as::<_, InventoryRecord>(
            r#"
            INSERT INTO inventory (product_id, location_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (product_id, location_id)
            DO UPDATE SET quantity = inventory.quantity + EXCLUDED.quantity,
                          version = inventory.version + 1,
                          updated_at = NOW()
            RETURNING id, product_id, location_id, quantity, version, created_at, updated_at
            "#,
        )
        .bind(product_id)
        .bind(location_id)
        .bind(delta)
        .fetch_one(&mut *conn)
        .await?;

        Ok(record)
    }

    async fn decrement_if_sufficient(
        &self,
        conn: &mut PgConnection,
        product_id: Uuid,
        location_id: Uuid,
        delta: i64,
    ) -> AppResult<InventoryRecord> {
        if delta <= 0 {
            return Err(AppError::ValidationError(
                "Quantity must be greater than zero".to_string(),
            ));
        }

        // Lock the row, check under the lock, then write
        let current = sqlx::query_as::<_, InventoryRecord>(
            r#"
            SELECT id, product_id, location_id, quantity, version, created_at, updated_at
            FROM inventory
            WHERE product_id = $1 AND location_id = $2
            FOR UPDATE
            "#,
        )
        .bind(product_id)
        .bind(location_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Inventory record".to_string()))?;

        if current.quantity < delta {
            return Err(AppError::InsufficientStock {
                product_id,
                location_id,
                requested: delta,
                available: current.quantity,
            });
        }

        let record = sqlx::query_as::<_, InventoryRecord>(
            r#"
            UPDATE inventory
            SET quantity = quantity - $2, version = version + 1, updated_at = NOW()
            WHERE id = $1
            RETURNING id, product_id, location_id, quantity, version, created_at, updated_at
            "#,
        )
        .bind(current.id)
        .bind(delta)
        .fetch_one(&mut *conn)
        .await?;

        Ok(record)
    }

    async fn set_absolute(
        &self,
        conn: &mut PgConnection,
        record_id: Uuid,
        new_quantity: i64,
    ) -> AppResult<InventoryRecord> {
        if new_quantity < 0 {
            return Err(AppError::ValidationError(
                "Quantity cannot be negative".to_string(),
            ));
        }

        sqlx::query_as::<_, InventoryRecord>(
            r#"
            UPDATE inventory
            SET quantity = $2, version = version + 1, updated_at = NOW()
            WHERE id = $1
            RETURNING id, product_id, location_id, quantity, version, created_at, updated_at
            "#,
        )
        .bind(record_id)
        .bind(new_quantity)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Inventory record".to_string()))
    }
}

/// Optimistic store: read without a lock, then compare-and-swap on the
/// version column; a lost race re-reads and retries a bounded number of
/// times before reporting the operation as retryable
pub struct OptimisticLedger;

/// CAS attempts before giving up and asking the client to retry
const MAX_CAS_ATTEMPTS: u32 = 5;

#[async_trait]
impl LedgerStore for OptimisticLedger {
    async fn get(
        &self,
        conn: &mut PgConnection,
        product_id: Uuid,
        location_id: Uuid,
    ) -> AppResult<Option<InventoryRecord>> {
        let record = sqlx::query_as::<_, InventoryRecord>(
            r#"
            SELECT id, product_id, location_id, quantity, version, created_at, updated_at
            FROM inventory
            WHERE product_id = $1 AND location_id = $2
            "#,
        )
        .bind(product_id)
        .bind(location_id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(record)
    }

    async fn ensure(
        &self,
        conn: &mut PgConnection,
        product_id: Uuid,
        location_id: Uuid,
        initial_quantity: i64,
    ) -> AppResult<InventoryRecord> {
        if initial_quantity < 0 {
            return Err(AppError::ValidationError(
                "Initial quantity cannot be negative".to_string(),
            ));
        }

        // Creation contention does not benefit from versioning; the same
        // insert-or-reread as the pessimistic store resolves the race
        sqlx::query(
            r#"
            INSERT INTO inventory (product_id, location_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (product_id, location_id) DO NOTHING
            "#,
        )
        .bind(product_id)
        .bind(location_id)
        .bind(initial_quantity)
        .execute(&mut *conn)
        .await?;

        self.get(&mut *conn, product_id, location_id)
            .await?
            .ok_or_else(|| AppError::Internal("inventory row missing after ensure".to_string()))
    }

    async fn increment(
        &self,
        conn: &mut PgConnection,
        product_id: Uuid,
        location_id: Uuid,
        delta: i64,
    ) -> AppResult<InventoryRecord> {
        if delta <= 0 {
            return Err(AppError::ValidationError(
                "Quantity must be greater than zero".to_string(),
            ));
        }

        for _ in 0..MAX_CAS_ATTEMPTS {
            let current = match self.get(&mut *conn, product_id, location_id).await? {
                Some(record) => record,
                None => {
                    // First receipt for the pair; when a concurrent creator
                    // wins, the insert returns nothing and the loop re-reads
                    let created = sqlx::query_as::<_, InventoryRecord>(
                        r#"
                        INSERT INTO inventory (product_id, location_id, quantity)
                        VALUES ($1, $2, $3)
                        ON CONFLICT (product_id, location_id) DO NOTHING
                        RETURNING id, product_id, location_id, quantity, version, created_at, updated_at
                        "#,
                    )
                    .bind(product_id)
                    .bind(location_id)
                    .bind(delta)
                    .fetch_optional(&mut *conn)
                    .await?;

                    match created {
                        Some(record) => return Ok(record),
                        None => continue,
                    }
                }
            };

            let updated = sqlx::query_as::<_, InventoryRecord>(
                r#"
                UPDATE inventory
                SET quantity = quantity + $3, version = version + 1, updated_at = NOW()
                WHERE id = $1 AND version = $2
                RETURNING id, product_id, location_id, quantity, version, created_at, updated_at
                "#,
            )
            .bind(current.id)
            .bind(current.version)
            .bind(delta)
            .fetch_optional(&mut *conn)
            .await?;

            if let Some(record) = updated {
                return Ok(record);
            }
        }

        Err(AppError::TransactionFailed)
    }

    async fn decrement_if_sufficient(
        &self,
        conn: &mut PgConnection,
        product_id: Uuid,
        location_id: Uuid,
        delta: i64,
    ) -> AppResult<InventoryRecord> {
        if delta <= 0 {
            return Err(AppError::ValidationError(
                "Quantity must be greater than zero".to_string(),
            ));
        }

        for _ in 0..MAX_CAS_ATTEMPTS {
            let current = self
                .get(&mut *conn, product_id, location_id)
                .await?
                .ok_or_else(|| AppError::NotFound("Inventory record".to_string()))?;

            if current.quantity < delta {
                return Err(AppError::InsufficientStock {
                    product_id,
                    location_id,
                    requested: delta,
                    available: current.quantity,
                });
            }

            let updated = sqlx::query_as::<_, InventoryRecord>(
                r#"
                UPDATE inventory
                SET quantity = quantity - $3, version = version + 1, updated_at = NOW()
                WHERE id = $1 AND version = $2
                RETURNING id, product_id, location_id, quantity, version, created_at, updated_at
                "#,
            )
            .bind(current.id)
            .bind(current.version)
            .bind(delta)
            .fetch_optional(&mut *conn)
            .await?;

            if let Some(record) = updated {
                return Ok(record);
            }
        }

        Err(AppError::TransactionFailed)
    }

    async fn set_absolute(
        &self,
        conn: &mut PgConnection,
        record_id: Uuid,
        new_quantity: i64,
    ) -> AppResult<InventoryRecord> {
        if new_quantity < 0 {
            return Err(AppError::ValidationError(
                "Quantity cannot be negative".to_string(),
            ));
        }

        for _ in 0..MAX_CAS_ATTEMPTS {
            let current = sqlx::query_as::<_, InventoryRecord>(
                r#"
                SELECT id, product_id, location_id, quantity, version, created_at, updated_at
                FROM inventory
                WHERE id = $1
                "#,
            )
            .bind(record_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::NotFound("Inventory record".to_string()))?;

            let updated = sqlx::query_as::<_, InventoryRecord>(
                r#"
                UPDATE inventory
                SET quantity = $3, version = version + 1, updated_at = NOW()
                WHERE id = $1 AND version = $2
                RETURNING id, product_id, location_id, quantity, version, created_at, updated_at
                "#,
            )
            .bind(record_id)
            .bind(current.version)
            .bind(new_quantity)
            .fetch_optional(&mut *conn)
            .await?;

            if let Some(record) = updated {
                return Ok(record);
            }
        }

        Err(AppError::TransactionFailed)
    }
}
