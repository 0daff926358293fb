//! Sale transaction tests
//!
//! Covers cart validation, totals, atomic multi-line deduction, and
//! void behavior:
//! - A sale deducts every line or none of them
//! - The first uncovered line aborts the whole cart
//! - Voiding restores exactly the sold quantities, once
//! - A voided sale is frozen: metadata updates are refused
//! - Totals equal the sum of line subtotals

use chrono::{DateTime, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{line_subtotal, sale_total, validate_sale_lines, SaleLineInput};
use std::collections::HashMap;
use std::str::FromStr;
use uuid::Uuid;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

/// Apply a multi-line sale against per-product stock, all-or-nothing
///
/// Deducts in submitted order against a staged copy and commits only when
/// every line is covered, mirroring transaction rollback. Returns the
/// first product whose stock fell short.
fn apply_sale(stock: &mut HashMap<Uuid, i64>, lines: &[(Uuid, i64)]) -> Result<(), Uuid> {
    let mut staged = stock.clone();
    for (product, quantity) in lines {
        let available = staged.entry(*product).or_insert(0);
        if *available < *quantity {
            return Err(*product);
        }
        *available -= quantity;
    }
    *stock = staged;
    Ok(())
}

/// A committed sale awaiting possible metadata updates and a void
struct RecordedSale {
    lines: Vec<(Uuid, i64)>,
    delivery_date: Option<DateTime<Utc>>,
    description: Option<String>,
    active: bool,
}

impl RecordedSale {
    fn new(lines: Vec<(Uuid, i64)>) -> Self {
        Self {
            lines,
            delivery_date: None,
            description: None,
            active: true,
        }
    }
}

/// Void a sale: restore every line by delta and flip the activity flag
fn void_sale(stock: &mut HashMap<Uuid, i64>, sale: &mut RecordedSale) -> Result<(), &'static str> {
    if !sale.active {
        return Err("Sale already voided");
    }
    for (product, quantity) in &sale.lines {
        *stock.entry(*product).or_insert(0) += quantity;
    }
    sale.active = false;
    Ok(())
}

/// Reschedule a sale's delivery; a void freezes the sale
fn update_delivery_date(
    sale: &mut RecordedSale,
    new_date: DateTime<Utc>,
) -> Result<(), &'static str> {
    if !sale.active {
        return Err("Sale already voided");
    }
    sale.delivery_date = Some(new_date);
    Ok(())
}

/// Replace a sale's description; a void freezes the sale
fn update_description(sale: &mut RecordedSale, text: &str) -> Result<(), &'static str> {
    if !sale.active {
        return Err("Sale already voided");
    }
    sale.description = Some(text.to_string());
    Ok(())
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;
    use chrono::Duration;
    use shared::DateRange;

    fn is_pending(active: bool, delivery_date: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        active && delivery_date.is_some_and(|d| d > now)
    }

    /// A covered multi-line sale deducts every line
    #[test]
    fn test_sale_deducts_every_line() {
        let (p1, p2) = (Uuid::new_v4(), Uuid::new_v4());
        let mut stock = HashMap::from([(p1, 10), (p2, 8)]);

        apply_sale(&mut stock, &[(p1, 4), (p2, 3)]).unwrap();

        assert_eq!(stock[&p1], 6);
        assert_eq!(stock[&p2], 5);
    }

    /// One uncovered line aborts the whole cart, leaving earlier lines
    /// untouched
    #[test]
    fn test_insufficient_line_aborts_whole_sale() {
        let (p1, p2) = (Uuid::new_v4(), Uuid::new_v4());
        let mut stock = HashMap::from([(p1, 5), (p2, 2)]);

        let result = apply_sale(&mut stock, &[(p1, 5), (p2, 3)]);

        assert_eq!(result, Err(p2));
        assert_eq!(stock[&p1], 5);
        assert_eq!(stock[&p2], 2);
    }

    /// Line order changes which product the error names, never the outcome
    #[test]
    fn test_line_order_never_changes_outcome() {
        let (p1, p2) = (Uuid::new_v4(), Uuid::new_v4());
        let stock = HashMap::from([(p1, 4), (p2, 2)]);

        let mut forward = stock.clone();
        let mut reversed = stock.clone();

        assert_eq!(apply_sale(&mut forward, &[(p1, 5), (p2, 2)]), Err(p1));
        assert_eq!(apply_sale(&mut reversed, &[(p2, 2), (p1, 5)]), Err(p1));
        assert_eq!(forward, stock);
        assert_eq!(reversed, stock);
    }

    /// Voiding restores the exact sold quantities
    #[test]
    fn test_void_restores_sold_quantities() {
        let (p1, p2) = (Uuid::new_v4(), Uuid::new_v4());
        let mut stock = HashMap::from([(p1, 10), (p2, 8)]);
        let lines = vec![(p1, 4), (p2, 3)];

        apply_sale(&mut stock, &lines).unwrap();
        let mut sale = RecordedSale::new(lines);
        void_sale(&mut stock, &mut sale).unwrap();

        assert_eq!(stock[&p1], 10);
        assert_eq!(stock[&p2], 8);
    }

    /// A second void fails and credits nothing
    #[test]
    fn test_double_void_is_rejected() {
        let p1 = Uuid::new_v4();
        let mut stock = HashMap::from([(p1, 10)]);
        let mut sale = RecordedSale::new(vec![(p1, 4)]);

        apply_sale(&mut stock, &sale.lines.clone()).unwrap();
        void_sale(&mut stock, &mut sale).unwrap();

        assert_eq!(void_sale(&mut stock, &mut sale), Err("Sale already voided"));
        assert_eq!(stock[&p1], 10);
    }

    /// Metadata updates are refused once the sale is voided, leaving stock
    /// and metadata unchanged
    #[test]
    fn test_update_after_void_is_rejected() {
        let p1 = Uuid::new_v4();
        let mut stock = HashMap::from([(p1, 10)]);
        let mut sale = RecordedSale::new(vec![(p1, 4)]);
        let scheduled = Utc::now() + Duration::days(2);

        apply_sale(&mut stock, &sale.lines.clone()).unwrap();
        update_delivery_date(&mut sale, scheduled).unwrap();
        update_description(&mut sale, "deliver to the back entrance").unwrap();
        void_sale(&mut stock, &mut sale).unwrap();

        assert_eq!(
            update_delivery_date(&mut sale, scheduled + Duration::days(1)),
            Err("Sale already voided")
        );
        assert_eq!(
            update_description(&mut sale, "changed after the void"),
            Err("Sale already voided")
        );
        assert_eq!(sale.delivery_date, Some(scheduled));
        assert_eq!(
            sale.description.as_deref(),
            Some("deliver to the back entrance")
        );
        assert_eq!(stock[&p1], 10);
    }

    /// Restoring by delta stays correct when other movements interleave
    #[test]
    fn test_void_restores_by_delta() {
        let p1 = Uuid::new_v4();
        let mut stock = HashMap::from([(p1, 10)]);
        let mut sale = RecordedSale::new(vec![(p1, 4)]);

        apply_sale(&mut stock, &sale.lines.clone()).unwrap();
        // A stock receipt lands between the sale and its void
        *stock.get_mut(&p1).unwrap() += 5;
        void_sale(&mut stock, &mut sale).unwrap();

        assert_eq!(stock[&p1], 15);
    }

    /// Receive, sell, void round-trips the quantity
    #[test]
    fn test_receive_sell_void_round_trip() {
        let p1 = Uuid::new_v4();
        let mut stock = HashMap::new();

        *stock.entry(p1).or_insert(0) += 10;
        let mut sale = RecordedSale::new(vec![(p1, 4)]);
        apply_sale(&mut stock, &sale.lines.clone()).unwrap();
        assert_eq!(stock[&p1], 6);

        void_sale(&mut stock, &mut sale).unwrap();
        assert_eq!(stock[&p1], 10);
    }

    /// The sale total is the sum of quantity times unit price over the lines
    #[test]
    fn test_sale_total_sums_line_subtotals() {
        let lines = vec![
            SaleLineInput {
                product_id: Uuid::new_v4(),
                quantity: 2,
                unit_price: dec("10.50"),
            },
            SaleLineInput {
                product_id: Uuid::new_v4(),
                quantity: 3,
                unit_price: dec("1.00"),
            },
        ];

        assert_eq!(sale_total(&lines), dec("24.00"));
        assert_eq!(line_subtotal(2, dec("10.50")), dec("21.00"));
    }

    /// Cart validation rejects empty, non-positive, and negatively priced
    /// lines
    #[test]
    fn test_cart_validation_rules() {
        assert_eq!(
            validate_sale_lines(&[]),
            Err("A sale must contain at least one line")
        );

        let zero_quantity = vec![SaleLineInput {
            product_id: Uuid::new_v4(),
            quantity: 0,
            unit_price: dec("5.00"),
        }];
        assert_eq!(
            validate_sale_lines(&zero_quantity),
            Err("Quantity must be greater than zero")
        );

        let negative_price = vec![SaleLineInput {
            product_id: Uuid::new_v4(),
            quantity: 1,
            unit_price: dec("-5.00"),
        }];
        assert_eq!(
            validate_sale_lines(&negative_price),
            Err("Unit price cannot be negative")
        );

        let valid = vec![SaleLineInput {
            product_id: Uuid::new_v4(),
            quantity: 1,
            unit_price: Decimal::ZERO,
        }];
        assert!(validate_sale_lines(&valid).is_ok());
    }

    /// Pending means active with a delivery date in the future
    #[test]
    fn test_pending_delivery_classification() {
        let now = Utc::now();
        let future = Some(now + Duration::days(2));
        let past = Some(now - Duration::days(2));

        assert!(is_pending(true, future, now));
        assert!(!is_pending(true, past, now));
        assert!(!is_pending(true, None, now));
        assert!(!is_pending(false, future, now));
    }

    /// Date ranges accept equal endpoints and reject reversed ones
    #[test]
    fn test_date_range_ordering() {
        let now = Utc::now();

        let ordered = DateRange {
            start: now,
            end: now + Duration::days(1),
        };
        assert!(ordered.is_ordered());

        let point = DateRange { start: now, end: now };
        assert!(point.is_ordered());

        let reversed = DateRange {
            start: now + Duration::days(1),
            end: now,
        };
        assert!(!reversed.is_ordered());
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    /// Strategy for cart lines as (product pool index, quantity)
    fn line_strategy() -> impl Strategy<Value = (usize, i64)> {
        (0usize..4, 1i64..=50)
    }

    /// Strategy for priced sale lines
    fn priced_line_strategy() -> impl Strategy<Value = SaleLineInput> {
        (1i64..=100, 0i64..=100_000).prop_map(|(quantity, cents)| SaleLineInput {
            product_id: Uuid::new_v4(),
            quantity,
            unit_price: Decimal::new(cents, 2),
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Property: a sale either deducts every line or leaves the stock
        /// exactly as it was
        #[test]
        fn prop_sale_is_all_or_nothing(
            seeds in prop::collection::vec(0i64..=100, 4),
            lines in prop::collection::vec(line_strategy(), 1..8)
        ) {
            let products: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
            let mut stock: HashMap<Uuid, i64> = products
                .iter()
                .copied()
                .zip(seeds.iter().copied())
                .collect();
            let lines: Vec<(Uuid, i64)> = lines
                .into_iter()
                .map(|(idx, quantity)| (products[idx], quantity))
                .collect();

            let before = stock.clone();
            match apply_sale(&mut stock, &lines) {
                Err(_) => prop_assert_eq!(stock, before),
                Ok(()) => {
                    for (idx, product) in products.iter().enumerate() {
                        let demanded: i64 = lines
                            .iter()
                            .filter(|(p, _)| p == product)
                            .map(|(_, q)| q)
                            .sum();
                        prop_assert_eq!(stock[product], seeds[idx] - demanded);
                    }
                }
            }
        }

        /// Property: no sale ever drives a quantity negative
        #[test]
        fn prop_sale_never_goes_negative(
            seeds in prop::collection::vec(0i64..=100, 4),
            lines in prop::collection::vec(line_strategy(), 1..8)
        ) {
            let products: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
            let mut stock: HashMap<Uuid, i64> = products
                .iter()
                .copied()
                .zip(seeds.iter().copied())
                .collect();
            let lines: Vec<(Uuid, i64)> = lines
                .into_iter()
                .map(|(idx, quantity)| (products[idx], quantity))
                .collect();

            let _ = apply_sale(&mut stock, &lines);
            for quantity in stock.values() {
                prop_assert!(*quantity >= 0);
            }
        }

        /// Property: selling then voiding restores the starting stock
        #[test]
        fn prop_sale_then_void_round_trips(
            lines in prop::collection::vec(line_strategy(), 1..8)
        ) {
            let products: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
            let mut stock: HashMap<Uuid, i64> =
                products.iter().map(|p| (*p, 10_000)).collect();
            let lines: Vec<(Uuid, i64)> = lines
                .into_iter()
                .map(|(idx, quantity)| (products[idx], quantity))
                .collect();

            let before = stock.clone();
            apply_sale(&mut stock, &lines).unwrap();
            let mut sale = RecordedSale::new(lines);
            void_sale(&mut stock, &mut sale).unwrap();

            prop_assert_eq!(stock, before);
        }

        /// Property: the total equals the sum of the line subtotals
        #[test]
        fn prop_total_equals_sum_of_subtotals(
            lines in prop::collection::vec(priced_line_strategy(), 1..10)
        ) {
            let subtotal_sum: Decimal = lines
                .iter()
                .map(|line| line_subtotal(line.quantity, line.unit_price))
                .sum();

            prop_assert_eq!(sale_total(&lines), subtotal_sum);
            prop_assert!(subtotal_sum >= Decimal::ZERO);
        }

        /// Property: validation accepts a line exactly when the quantity is
        /// positive and the price non-negative
        #[test]
        fn prop_validation_matches_line_rules(
            quantity in -10i64..=10,
            cents in -100i64..=100
        ) {
            let lines = vec![SaleLineInput {
                product_id: Uuid::new_v4(),
                quantity,
                unit_price: Decimal::new(cents, 2),
            }];

            let expected_ok = quantity > 0 && cents >= 0;
            prop_assert_eq!(validate_sale_lines(&lines).is_ok(), expected_ok);
        }
    }
}
