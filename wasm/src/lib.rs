//! WebAssembly module for the Branch Inventory Management Platform
//!
//! Provides client-side computation for POS frontends:
//! - Cart totals and line subtotals
//! - Cart validation with the same rules the server enforces
//! - Low-stock and shortfall checks
//! - Pending-delivery classification

use rust_decimal::Decimal;
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::models::*;
pub use shared::types::*;
pub use shared::validation::*;

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    // Set up panic hook for better error messages in browser console
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();

    web_sys::console::log_1(&"Branch inventory WASM module loaded".into());
}

/// Calculate the total of a cart from a JSON array of sale lines
///
/// Returns the total as a decimal string so no precision is lost
/// crossing the JS boundary.
#[wasm_bindgen]
pub fn calculate_sale_total(lines_json: &str) -> Result<String, JsValue> {
    let lines: Vec<SaleLineInput> = serde_json::from_str(lines_json)
        .map_err(|e| JsValue::from_str(&format!("Invalid lines JSON: {}", e)))?;

    Ok(sale_total(&lines).to_string())
}

/// Calculate the total cost of a stock receipt from a JSON array of lines
#[wasm_bindgen]
pub fn calculate_receipt_total(lines_json: &str) -> Result<String, JsValue> {
    let lines: Vec<StockInLineInput> = serde_json::from_str(lines_json)
        .map_err(|e| JsValue::from_str(&format!("Invalid lines JSON: {}", e)))?;

    Ok(stock_in_total(&lines).to_string())
}

/// Calculate one line's subtotal from a quantity and a unit price string
#[wasm_bindgen]
pub fn calculate_line_subtotal(quantity: i64, unit_price: &str) -> Result<String, JsValue> {
    let unit_price: Decimal = unit_price
        .parse()
        .map_err(|_| JsValue::from_str("Invalid unit price"))?;

    Ok(line_subtotal(quantity, unit_price).to_string())
}

/// Validate a cart before submitting it as a sale
///
/// Returns `null` when the cart passes, otherwise the first violation message.
#[wasm_bindgen]
pub fn validate_cart(lines_json: &str) -> Result<Option<String>, JsValue> {
    let lines: Vec<SaleLineInput> = serde_json::from_str(lines_json)
        .map_err(|e| JsValue::from_str(&format!("Invalid lines JSON: {}", e)))?;

    Ok(validate_sale_lines(&lines).err().map(String::from))
}

/// Validate the lines of a stock receipt before submitting it
///
/// Returns `null` when the lines pass, otherwise the first violation message.
#[wasm_bindgen]
pub fn validate_receipt(lines_json: &str) -> Result<Option<String>, JsValue> {
    let lines: Vec<StockInLineInput> = serde_json::from_str(lines_json)
        .map_err(|e| JsValue::from_str(&format!("Invalid lines JSON: {}", e)))?;

    Ok(validate_stock_in_lines(&lines).err().map(String::from))
}

/// Check whether a quantity sits at or below the low-stock threshold
#[wasm_bindgen]
pub fn check_low_stock(quantity: i64, threshold: i64) -> bool {
    is_low_stock(quantity, threshold)
}

/// Calculate how many units are missing to cover a requested quantity
///
/// Returns zero when the available stock already covers the request.
#[wasm_bindgen]
pub fn calculate_shortfall(available: i64, requested: i64) -> i64 {
    stock_shortfall(available, requested)
}

/// Check whether a sale still counts as a pending delivery
///
/// Pending means the sale is active and its delivery date lies in the future.
#[wasm_bindgen]
pub fn is_pending_delivery(active: bool, delivery_date_iso: &str) -> Result<bool, JsValue> {
    let delivery_ms = js_sys::Date::parse(delivery_date_iso);
    if delivery_ms.is_nan() {
        return Err(JsValue::from_str("Invalid delivery date"));
    }

    Ok(active && delivery_ms > js_sys::Date::now())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRODUCT: &str = "11111111-1111-1111-1111-111111111111";

    #[test]
    fn test_calculate_sale_total() {
        let json = format!(
            r#"[{{"product_id":"{PRODUCT}","quantity":2,"unit_price":"10.50"}},
                {{"product_id":"{PRODUCT}","quantity":3,"unit_price":"1.00"}}]"#
        );
        assert_eq!(calculate_sale_total(&json).unwrap(), "24.00");
    }

    #[test]
    fn test_calculate_sale_total_rejects_bad_json() {
        assert!(calculate_sale_total("not json").is_err());
    }

    #[test]
    fn test_calculate_receipt_total() {
        let json = format!(
            r#"[{{"product_id":"{PRODUCT}","quantity":4,"unit_cost":"2.25"}}]"#
        );
        assert_eq!(calculate_receipt_total(&json).unwrap(), "9.00");
    }

    #[test]
    fn test_calculate_line_subtotal() {
        assert_eq!(calculate_line_subtotal(3, "2.50").unwrap(), "7.50");
        assert!(calculate_line_subtotal(3, "not a price").is_err());
    }

    #[test]
    fn test_validate_cart() {
        let valid = format!(
            r#"[{{"product_id":"{PRODUCT}","quantity":1,"unit_price":"5.00"}}]"#
        );
        assert_eq!(validate_cart(&valid).unwrap(), None);

        assert_eq!(
            validate_cart("[]").unwrap(),
            Some("A sale must contain at least one line".to_string())
        );

        let zero_quantity = format!(
            r#"[{{"product_id":"{PRODUCT}","quantity":0,"unit_price":"5.00"}}]"#
        );
        assert_eq!(
            validate_cart(&zero_quantity).unwrap(),
            Some("Quantity must be greater than zero".to_string())
        );

        let negative_price = format!(
            r#"[{{"product_id":"{PRODUCT}","quantity":1,"unit_price":"-5.00"}}]"#
        );
        assert_eq!(
            validate_cart(&negative_price).unwrap(),
            Some("Unit price cannot be negative".to_string())
        );
    }

    #[test]
    fn test_validate_receipt() {
        assert_eq!(
            validate_receipt("[]").unwrap(),
            Some("A receipt must contain at least one line".to_string())
        );

        let valid = format!(
            r#"[{{"product_id":"{PRODUCT}","quantity":10,"unit_cost":"0"}}]"#
        );
        assert_eq!(validate_receipt(&valid).unwrap(), None);
    }

    #[test]
    fn test_check_low_stock() {
        assert!(check_low_stock(5, 5));
        assert!(check_low_stock(0, 5));
        assert!(!check_low_stock(6, 5));
    }

    #[test]
    fn test_calculate_shortfall() {
        assert_eq!(calculate_shortfall(10, 4), 0);
        assert_eq!(calculate_shortfall(4, 10), 6);
    }
}
