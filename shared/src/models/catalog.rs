//! Catalog display models
//!
//! Read-only summaries of the catalog entities the ledger references by id.
//! The surrounding CRUD for these lives outside this system; the core only
//! resolves identities and display data.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A sellable product
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductSummary {
    pub id: Uuid,
    pub name: String,
    pub code: String,
}

/// A branch or warehouse holding its own inventory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationSummary {
    pub id: Uuid,
    pub name: String,
    pub address: Option<String>,
}

/// An operator who performs sales, receipts, and adjustments
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    pub full_name: String,
}

/// A delivery vehicle optionally attached to a sale
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleSummary {
    pub id: Uuid,
    pub plate: String,
    pub description: Option<String>,
}
