//! HTTP handlers for stock-in endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use shared::types::{DateRange, PaginatedResponse, Pagination};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::stock_in::{ReceiveStockInput, StockInService, StockInSummary, StockInView};
use crate::AppState;

/// Query parameters for a required datetime window
#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl RangeQuery {
    fn into_range(self) -> DateRange {
        DateRange {
            start: self.start,
            end: self.end,
        }
    }
}

/// Record a shipment and increment stock per line
pub async fn receive_stock(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<ReceiveStockInput>,
) -> AppResult<(StatusCode, Json<StockInView>)> {
    let service = StockInService::new(state.db, state.ledger);
    let receipt = service.receive(current_user.0.user_id, input).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

/// List receipts, paginated
pub async fn list_stock_in(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<PaginatedResponse<StockInSummary>>> {
    let service = StockInService::new(state.db, state.ledger);
    let receipts = service.list(pagination).await?;
    Ok(Json(receipts))
}

/// Get a receipt by id
pub async fn get_stock_in(
    State(state): State<AppState>,
    Path(stock_in_id): Path<Uuid>,
) -> AppResult<Json<StockInView>> {
    let service = StockInService::new(state.db, state.ledger);
    let receipt = service.get(stock_in_id).await?;
    Ok(Json(receipt))
}

/// List the receipts of one location
pub async fn list_stock_in_by_location(
    State(state): State<AppState>,
    Path(location_id): Path<Uuid>,
) -> AppResult<Json<Vec<StockInSummary>>> {
    let service = StockInService::new(state.db, state.ledger);
    let receipts = service.list_by_location(location_id).await?;
    Ok(Json(receipts))
}

/// List the receipts recorded by one user
pub async fn list_stock_in_by_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<Vec<StockInSummary>>> {
    let service = StockInService::new(state.db, state.ledger);
    let receipts = service.list_by_user(user_id).await?;
    Ok(Json(receipts))
}

/// List receipts in a datetime window
pub async fn list_stock_in_by_date_range(
    State(state): State<AppState>,
    Query(query): Query<RangeQuery>,
) -> AppResult<Json<Vec<StockInSummary>>> {
    let service = StockInService::new(state.db, state.ledger);
    let receipts = service.list_by_date_range(query.into_range()).await?;
    Ok(Json(receipts))
}

/// List the receipts of one location in a datetime window
pub async fn list_stock_in_by_location_and_date_range(
    State(state): State<AppState>,
    Path(location_id): Path<Uuid>,
    Query(query): Query<RangeQuery>,
) -> AppResult<Json<Vec<StockInSummary>>> {
    let service = StockInService::new(state.db, state.ledger);
    let receipts = service
        .list_by_location_and_date_range(location_id, query.into_range())
        .await?;
    Ok(Json(receipts))
}
