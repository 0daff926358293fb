//! Stock receipt models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A goods receipt registered at one location
///
/// Receipts are immutable once created; correcting a mistaken receipt is
/// done with a manual adjustment, never by editing the event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockInEvent {
    pub id: Uuid,
    pub location_id: Uuid,
    pub performed_by: Uuid,
    pub created_at: DateTime<Utc>,
}

/// One product line inside a stock receipt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockInLine {
    pub id: Uuid,
    pub stock_in_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i64,
    pub unit_cost: Decimal,
}

/// Client-supplied line when registering a receipt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockInLineInput {
    pub product_id: Uuid,
    pub quantity: i64,
    pub unit_cost: Decimal,
}
