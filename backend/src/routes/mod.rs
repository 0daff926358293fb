//! Route definitions for the Branch Inventory Management Platform

use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Protected routes - inventory ledger
        .nest("/inventory", inventory_routes())
        // Protected routes - sales
        .nest("/sales", sale_routes())
        // Protected routes - stock receipts
        .nest("/stock-in", stock_in_routes())
}

/// Inventory routes (protected)
fn inventory_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_inventory).post(handlers::register_inventory),
        )
        .route("/low-stock", get(handlers::list_low_stock))
        .route(
            "/product/:product_id",
            get(handlers::list_inventory_by_product),
        )
        .route(
            "/product/:product_id/location/:location_id",
            get(handlers::get_inventory_by_product_and_location),
        )
        .route(
            "/location/:location_id",
            get(handlers::list_inventory_by_location),
        )
        .route(
            "/location/:location_id/low-stock",
            get(handlers::list_low_stock_by_location),
        )
        .route(
            "/:record_id",
            get(handlers::get_inventory).put(handlers::set_inventory_quantity),
        )
        .route("/:record_id/deduct", post(handlers::deduct_stock))
        .route("/:record_id/adjustments", get(handlers::list_adjustments))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Sale routes (protected)
fn sale_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_sales).post(handlers::create_sale))
        .route("/pending-delivery", get(handlers::list_pending_deliveries))
        .route(
            "/location/:location_id",
            get(handlers::list_sales_by_location),
        )
        .route(
            "/location/:location_id/today",
            get(handlers::list_today_sales),
        )
        .route(
            "/location/:location_id/pending-delivery",
            get(handlers::list_pending_deliveries_by_location),
        )
        .route("/user/:user_id", get(handlers::list_sales_by_user))
        .route(
            "/:sale_id",
            get(handlers::get_sale).delete(handlers::void_sale),
        )
        .route(
            "/:sale_id/delivery-date",
            patch(handlers::update_delivery_date),
        )
        .route(
            "/:sale_id/description",
            patch(handlers::update_description),
        )
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Stock-in routes (protected)
fn stock_in_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_stock_in).post(handlers::receive_stock))
        .route("/date-range", get(handlers::list_stock_in_by_date_range))
        .route(
            "/location/:location_id",
            get(handlers::list_stock_in_by_location),
        )
        .route(
            "/location/:location_id/date-range",
            get(handlers::list_stock_in_by_location_and_date_range),
        )
        .route("/user/:user_id", get(handlers::list_stock_in_by_user))
        .route("/:stock_in_id", get(handlers::get_stock_in))
        .route_layer(middleware::from_fn(auth_middleware))
}
