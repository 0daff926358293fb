//! HTTP handlers for sale endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use shared::types::{DateRange, PaginatedResponse, Pagination};

use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::services::sale::{
    CreateSaleInput, SaleService, SaleSummary, SaleView, UpdateDeliveryDateInput,
    UpdateDescriptionInput,
};
use crate::AppState;

/// Query parameters for an optional datetime window
#[derive(Debug, Deserialize)]
pub struct SaleRangeQuery {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl SaleRangeQuery {
    fn into_range(self) -> AppResult<Option<DateRange>> {
        match (self.start, self.end) {
            (Some(start), Some(end)) => Ok(Some(DateRange { start, end })),
            (None, None) => Ok(None),
            _ => Err(AppError::Validation {
                field: "start".to_string(),
                message: "Both start and end must be provided together".to_string(),
                message_es: "Debe proporcionar las fechas de inicio y fin juntas".to_string(),
            }),
        }
    }
}

/// Create a sale
pub async fn create_sale(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateSaleInput>,
) -> AppResult<(StatusCode, Json<SaleView>)> {
    let service = SaleService::new(state.db, state.ledger);
    let sale = service.create_sale(current_user.0.user_id, input).await?;
    Ok((StatusCode::CREATED, Json(sale)))
}

/// List sales, paginated, optionally within a datetime window
pub async fn list_sales(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
    Query(range): Query<SaleRangeQuery>,
) -> AppResult<Json<PaginatedResponse<SaleSummary>>> {
    let service = SaleService::new(state.db, state.ledger);
    let sales = service.list(pagination, range.into_range()?).await?;
    Ok(Json(sales))
}

/// Get a sale by id
pub async fn get_sale(
    State(state): State<AppState>,
    Path(sale_id): Path<Uuid>,
) -> AppResult<Json<SaleView>> {
    let service = SaleService::new(state.db, state.ledger);
    let sale = service.get(sale_id).await?;
    Ok(Json(sale))
}

/// List the sales of one location, paginated
pub async fn list_sales_by_location(
    State(state): State<AppState>,
    Path(location_id): Path<Uuid>,
    Query(pagination): Query<Pagination>,
    Query(range): Query<SaleRangeQuery>,
) -> AppResult<Json<PaginatedResponse<SaleSummary>>> {
    let service = SaleService::new(state.db, state.ledger);
    let sales = service
        .list_by_location(location_id, pagination, range.into_range()?)
        .await?;
    Ok(Json(sales))
}

/// Today's sales for a location
pub async fn list_today_sales(
    State(state): State<AppState>,
    Path(location_id): Path<Uuid>,
) -> AppResult<Json<Vec<SaleSummary>>> {
    let service = SaleService::new(state.db, state.ledger);
    let sales = service.list_today_by_location(location_id).await?;
    Ok(Json(sales))
}

/// List the sales recorded by one user, paginated
pub async fn list_sales_by_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<PaginatedResponse<SaleSummary>>> {
    let service = SaleService::new(state.db, state.ledger);
    let sales = service.list_by_user(user_id, pagination).await?;
    Ok(Json(sales))
}

/// List active sales with a future delivery date, paginated
pub async fn list_pending_deliveries(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<PaginatedResponse<SaleSummary>>> {
    let service = SaleService::new(state.db, state.ledger);
    let sales = service.list_pending_deliveries(pagination).await?;
    Ok(Json(sales))
}

/// Pending deliveries for one location, paginated
pub async fn list_pending_deliveries_by_location(
    State(state): State<AppState>,
    Path(location_id): Path<Uuid>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<PaginatedResponse<SaleSummary>>> {
    let service = SaleService::new(state.db, state.ledger);
    let sales = service
        .list_pending_deliveries_by_location(location_id, pagination)
        .await?;
    Ok(Json(sales))
}

/// Void a sale, restoring the stock of every line
pub async fn void_sale(
    State(state): State<AppState>,
    Path(sale_id): Path<Uuid>,
) -> AppResult<Json<SaleView>> {
    let service = SaleService::new(state.db, state.ledger);
    let sale = service.void_sale(sale_id).await?;
    Ok(Json(sale))
}

/// Reschedule a sale's delivery
pub async fn update_delivery_date(
    State(state): State<AppState>,
    Path(sale_id): Path<Uuid>,
    Json(input): Json<UpdateDeliveryDateInput>,
) -> AppResult<Json<SaleView>> {
    let service = SaleService::new(state.db, state.ledger);
    let sale = service.update_delivery_date(sale_id, input).await?;
    Ok(Json(sale))
}

/// Replace a sale's description
pub async fn update_description(
    State(state): State<AppState>,
    Path(sale_id): Path<Uuid>,
    Json(input): Json<UpdateDescriptionInput>,
) -> AppResult<Json<SaleView>> {
    let service = SaleService::new(state.db, state.ledger);
    let sale = service.update_description(sale_id, input).await?;
    Ok(Json(sale))
}
