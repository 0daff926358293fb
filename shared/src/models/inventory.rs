//! Inventory ledger models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The quantity of one product at one location
///
/// At most one record exists per `(product_id, location_id)` pair and
/// `quantity` is never negative; both invariants are enforced by the
/// backend ledger, with database constraints as a backstop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub id: Uuid,
    pub product_id: Uuid,
    pub location_id: Uuid,
    pub quantity: i64,
    /// Optimistic-locking counter, bumped on every mutation
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Audit row for a manual stock deduction (damage, loss, shrinkage)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockAdjustment {
    pub id: Uuid,
    pub inventory_id: Uuid,
    pub location_id: Uuid,
    pub quantity: i64,
    pub reason: Option<String>,
    pub observations: Option<String>,
    pub performed_by: Uuid,
    pub created_at: DateTime<Utc>,
}
