//! Error handling for the Branch Inventory Management Platform
//!
//! Provides consistent error responses in English and Spanish

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation error: {message}")]
    Validation {
        field: String,
        message: String,
        message_es: String,
    },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Conflict: {message}")]
    Conflict {
        resource: String,
        message: String,
        message_es: String,
    },

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Ledger errors
    #[error("Insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: Uuid,
        location_id: Uuid,
        requested: i64,
        available: i64,
    },

    #[error("Inventory record {inventory_id} belongs to location {actual}, not {expected}")]
    LocationMismatch {
        inventory_id: Uuid,
        expected: Uuid,
        actual: Uuid,
    },

    #[error("Sale {0} is already voided")]
    AlreadyVoided(Uuid),

    // Database errors
    #[error("Transaction could not be completed")]
    TransactionFailed,

    #[error("Database error: {0}")]
    DatabaseError(sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message_en: String,
    pub message_es: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_detail) = match &self {
            AppError::Validation { field, message, message_es } => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    code: "VALIDATION_ERROR".to_string(),
                    message_en: message.clone(),
                    message_es: message_es.clone(),
                    field: Some(field.clone()),
                },
            ),
            AppError::ValidationError(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    code: "VALIDATION_ERROR".to_string(),
                    message_en: msg.clone(),
                    message_es: format!("Datos inválidos: {}", msg),
                    field: None,
                },
            ),
            AppError::Conflict { resource, message, message_es } => (
                StatusCode::CONFLICT,
                ErrorDetail {
                    code: "CONFLICT".to_string(),
                    message_en: message.clone(),
                    message_es: message_es.clone(),
                    field: Some(resource.clone()),
                },
            ),
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                ErrorDetail {
                    code: "NOT_FOUND".to_string(),
                    message_en: format!("{} not found", resource),
                    message_es: format!("No se encontró: {}", resource),
                    field: None,
                },
            ),
            AppError::InsufficientStock { product_id, requested, available, .. } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail {
                    code: "INSUFFICIENT_STOCK".to_string(),
                    message_en: format!(
                        "Insufficient stock for product {}: requested {}, available {}",
                        product_id, requested, available
                    ),
                    message_es: format!(
                        "Stock insuficiente para el producto {}: solicitado {}, disponible {}",
                        product_id, requested, available
                    ),
                    field: None,
                },
            ),
            AppError::LocationMismatch { inventory_id, .. } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail {
                    code: "LOCATION_MISMATCH".to_string(),
                    message_en: format!(
                        "Inventory record {} belongs to a different location",
                        inventory_id
                    ),
                    message_es: format!(
                        "El inventario {} pertenece a otra sede",
                        inventory_id
                    ),
                    field: None,
                },
            ),
            AppError::AlreadyVoided(sale_id) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail {
                    code: "SALE_ALREADY_VOIDED".to_string(),
                    message_en: format!("Sale {} is already voided", sale_id),
                    message_es: "La venta ya está anulada".to_string(),
                    field: None,
                },
            ),
            AppError::TransactionFailed => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorDetail {
                    code: "TRANSACTION_FAILED".to_string(),
                    message_en: "The operation conflicted with concurrent activity, please retry"
                        .to_string(),
                    message_es: "La operación entró en conflicto con actividad concurrente, intente nuevamente"
                        .to_string(),
                    field: None,
                },
            ),
            AppError::DatabaseError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "DATABASE_ERROR".to_string(),
                    message_en: "A database error occurred".to_string(),
                    message_es: "Ocurrió un error en la base de datos".to_string(),
                    field: None,
                },
            ),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "INTERNAL_ERROR".to_string(),
                    message_en: msg.clone(),
                    message_es: "Error interno del servidor".to_string(),
                    field: None,
                },
            ),
            AppError::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "INTERNAL_ERROR".to_string(),
                    message_en: "An internal server error occurred".to_string(),
                    message_es: "Error interno del servidor".to_string(),
                    field: None,
                },
            ),
        };

        // Log the error for debugging
        tracing::error!("Error: {:?}", self);

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            // Serialization failures and deadlocks are retryable by the client
            if let Some(code) = db_err.code() {
                if code == "40001" || code == "40P01" {
                    return AppError::TransactionFailed;
                }
            }
        }
        AppError::DatabaseError(err)
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
