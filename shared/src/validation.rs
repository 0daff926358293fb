//! Validation helpers for the Branch Inventory Management Platform
//!
//! Pure stock and money decisions shared by the backend and the WASM
//! bindings, so a POS frontend can pre-check a cart with exactly the rules
//! the server enforces.

use rust_decimal::Decimal;

use crate::models::{SaleLineInput, StockInLineInput};

/// Default low-stock threshold when none is configured or supplied
pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 5;

// ============================================================================
// Stock Level Decisions
// ============================================================================

/// A record is low on stock when its quantity is at or below the threshold
pub fn is_low_stock(quantity: i64, threshold: i64) -> bool {
    quantity <= threshold
}

/// Whether `available` covers a requested deduction
pub fn can_cover(available: i64, requested: i64) -> bool {
    available >= requested
}

/// How many units short `available` is of `requested` (zero when covered)
pub fn stock_shortfall(available: i64, requested: i64) -> i64 {
    (requested - available).max(0)
}

// ============================================================================
// Quantity Validations
// ============================================================================

/// Validate the opening quantity of a newly registered record
pub fn validate_initial_quantity(quantity: i64) -> Result<(), &'static str> {
    if quantity < 0 {
        return Err("Initial quantity cannot be negative");
    }
    Ok(())
}

/// Validate the target of an absolute quantity correction
pub fn validate_absolute_quantity(quantity: i64) -> Result<(), &'static str> {
    if quantity < 0 {
        return Err("Quantity cannot be negative");
    }
    Ok(())
}

/// Validate a delta applied by a receipt, a deduction, or a sale line
pub fn validate_movement_quantity(quantity: i64) -> Result<(), &'static str> {
    if quantity <= 0 {
        return Err("Quantity must be greater than zero");
    }
    Ok(())
}

// ============================================================================
// Line Validations
// ============================================================================

/// Validate the line items of a sale before any stock is touched
pub fn validate_sale_lines(lines: &[SaleLineInput]) -> Result<(), &'static str> {
    if lines.is_empty() {
        return Err("A sale must contain at least one line");
    }
    for line in lines {
        validate_movement_quantity(line.quantity)?;
        if line.unit_price < Decimal::ZERO {
            return Err("Unit price cannot be negative");
        }
    }
    Ok(())
}

/// Validate the line items of a stock receipt
pub fn validate_stock_in_lines(lines: &[StockInLineInput]) -> Result<(), &'static str> {
    if lines.is_empty() {
        return Err("A receipt must contain at least one line");
    }
    for line in lines {
        validate_movement_quantity(line.quantity)?;
        if line.unit_cost < Decimal::ZERO {
            return Err("Unit cost cannot be negative");
        }
    }
    Ok(())
}

// ============================================================================
// Money Computations
// ============================================================================

/// Subtotal of one line (quantity x unit price)
pub fn line_subtotal(quantity: i64, unit_price: Decimal) -> Decimal {
    unit_price * Decimal::from(quantity)
}

/// Total of a sale, fixed at creation and never recomputed afterwards
pub fn sale_total(lines: &[SaleLineInput]) -> Decimal {
    lines
        .iter()
        .map(|line| line_subtotal(line.quantity, line.unit_price))
        .sum()
}

/// Total cost of a stock receipt
pub fn stock_in_total(lines: &[StockInLineInput]) -> Decimal {
    lines
        .iter()
        .map(|line| line_subtotal(line.quantity, line.unit_cost))
        .sum()
}
