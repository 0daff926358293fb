//! Sale models shared between backend and front-end bindings

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A recorded sale at one branch location
///
/// `active` starts true and flips to false exactly once when the sale is
/// voided; voided sales keep their lines for audit and are never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sale {
    pub id: Uuid,
    pub location_id: Uuid,
    pub performed_by: Uuid,
    pub vehicle_id: Option<Uuid>,
    pub delivery_date: Option<DateTime<Utc>>,
    pub description: Option<String>,
    /// Sum of quantity x unit_price over the lines, fixed at creation
    pub total: Decimal,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One product line inside a sale
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleLine {
    pub id: Uuid,
    pub sale_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i64,
    pub unit_price: Decimal,
}

/// Client-supplied line when registering a sale
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleLineInput {
    pub product_id: Uuid,
    pub quantity: i64,
    pub unit_price: Decimal,
}
