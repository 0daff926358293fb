//! HTTP handlers for inventory endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use shared::models::StockAdjustment;
use shared::types::{PaginatedResponse, Pagination};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::inventory::{
    DeductStockInput, InventoryService, InventoryView, RegisterInventoryInput, SetQuantityInput,
};
use crate::AppState;

fn inventory_service(state: AppState) -> InventoryService {
    let threshold = state.config.inventory.low_stock_threshold;
    InventoryService::new(state.db, state.ledger, threshold)
}

/// Register an inventory record for a product at a location
pub async fn register_inventory(
    State(state): State<AppState>,
    Json(input): Json<RegisterInventoryInput>,
) -> AppResult<(StatusCode, Json<InventoryView>)> {
    let service = inventory_service(state);
    let record = service.register(input).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// List all inventory records, paginated
pub async fn list_inventory(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<PaginatedResponse<InventoryView>>> {
    let service = inventory_service(state);
    let records = service.list_all(pagination).await?;
    Ok(Json(records))
}

/// Get an inventory record by id
pub async fn get_inventory(
    State(state): State<AppState>,
    Path(record_id): Path<Uuid>,
) -> AppResult<Json<InventoryView>> {
    let service = inventory_service(state);
    let record = service.get_record(record_id).await?;
    Ok(Json(record))
}

/// Get the record for a product at a location
pub async fn get_inventory_by_product_and_location(
    State(state): State<AppState>,
    Path((product_id, location_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<InventoryView>> {
    let service = inventory_service(state);
    let record = service
        .get_by_product_and_location(product_id, location_id)
        .await?;
    Ok(Json(record))
}

/// List the inventory of one location
pub async fn list_inventory_by_location(
    State(state): State<AppState>,
    Path(location_id): Path<Uuid>,
) -> AppResult<Json<Vec<InventoryView>>> {
    let service = inventory_service(state);
    let records = service.list_by_location(location_id).await?;
    Ok(Json(records))
}

/// List the records of one product across locations
pub async fn list_inventory_by_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<Vec<InventoryView>>> {
    let service = inventory_service(state);
    let records = service.list_by_product(product_id).await?;
    Ok(Json(records))
}

/// Query parameters for low-stock listings
#[derive(Debug, Deserialize)]
pub struct ThresholdQuery {
    pub threshold: Option<i64>,
}

/// List records at or below the threshold
pub async fn list_low_stock(
    State(state): State<AppState>,
    Query(query): Query<ThresholdQuery>,
) -> AppResult<Json<Vec<InventoryView>>> {
    let service = inventory_service(state);
    let records = service.list_low_stock(query.threshold).await?;
    Ok(Json(records))
}

/// List low-stock records at one location
pub async fn list_low_stock_by_location(
    State(state): State<AppState>,
    Path(location_id): Path<Uuid>,
    Query(query): Query<ThresholdQuery>,
) -> AppResult<Json<Vec<InventoryView>>> {
    let service = inventory_service(state);
    let records = service
        .list_low_stock_by_location(location_id, query.threshold)
        .await?;
    Ok(Json(records))
}

/// Overwrite a record's quantity
pub async fn set_inventory_quantity(
    State(state): State<AppState>,
    Path(record_id): Path<Uuid>,
    Json(input): Json<SetQuantityInput>,
) -> AppResult<Json<InventoryView>> {
    let service = inventory_service(state);
    let record = service.set_absolute_quantity(record_id, input).await?;
    Ok(Json(record))
}

/// Deduct stock from a record with an audit trail entry
pub async fn deduct_stock(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(record_id): Path<Uuid>,
    Json(input): Json<DeductStockInput>,
) -> AppResult<Json<InventoryView>> {
    let service = inventory_service(state);
    let record = service
        .deduct_stock(record_id, input, current_user.0.user_id)
        .await?;
    Ok(Json(record))
}

/// List the adjustment audit trail of a record
pub async fn list_adjustments(
    State(state): State<AppState>,
    Path(record_id): Path<Uuid>,
) -> AppResult<Json<Vec<StockAdjustment>>> {
    let service = inventory_service(state);
    let adjustments = service.list_adjustments(record_id).await?;
    Ok(Json(adjustments))
}
