//! Stock ledger tests
//!
//! Exercises the check-and-subtract contract of the inventory ledger:
//! - Quantities never go negative after any committed operation
//! - Deductions fail rather than oversell
//! - One record per (product, location) pair
//! - Concurrent deductions against the same record serialize

use proptest::prelude::*;
use std::collections::HashMap;
use uuid::Uuid;

/// In-memory stand-in for the stock ledger
///
/// Mirrors the store contract: ensure keeps the first write, increment
/// creates missing records at zero, and decrement refuses to go below
/// zero while reporting the available quantity.
#[derive(Debug, Default, Clone)]
struct MemoryLedger {
    records: HashMap<(Uuid, Uuid), i64>,
}

impl MemoryLedger {
    fn ensure(&mut self, product: Uuid, location: Uuid, initial: i64) -> i64 {
        *self.records.entry((product, location)).or_insert(initial)
    }

    fn increment(&mut self, product: Uuid, location: Uuid, delta: i64) -> i64 {
        let quantity = self.records.entry((product, location)).or_insert(0);
        *quantity += delta;
        *quantity
    }

    fn decrement_if_sufficient(
        &mut self,
        product: Uuid,
        location: Uuid,
        delta: i64,
    ) -> Result<i64, i64> {
        let quantity = self.records.entry((product, location)).or_insert(0);
        if *quantity < delta {
            return Err(*quantity);
        }
        *quantity -= delta;
        Ok(*quantity)
    }

    fn set_absolute(&mut self, product: Uuid, location: Uuid, new_quantity: i64) -> i64 {
        self.records.insert((product, location), new_quantity);
        new_quantity
    }

    fn quantity(&self, product: Uuid, location: Uuid) -> i64 {
        self.records.get(&(product, location)).copied().unwrap_or(0)
    }

    fn record_count(&self) -> usize {
        self.records.len()
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Ensure keeps the winner's record instead of duplicating the pair
    #[test]
    fn test_ensure_returns_existing_record() {
        let mut ledger = MemoryLedger::default();
        let (product, location) = (Uuid::new_v4(), Uuid::new_v4());

        assert_eq!(ledger.ensure(product, location, 10), 10);
        assert_eq!(ledger.ensure(product, location, 99), 10);
        assert_eq!(ledger.record_count(), 1);
    }

    /// Increment creates the record at zero before adding
    #[test]
    fn test_increment_creates_missing_record() {
        let mut ledger = MemoryLedger::default();
        let (product, location) = (Uuid::new_v4(), Uuid::new_v4());

        assert_eq!(ledger.increment(product, location, 7), 7);
        assert_eq!(ledger.quantity(product, location), 7);
    }

    /// Increments accumulate on the same record
    #[test]
    fn test_increment_accumulates() {
        let mut ledger = MemoryLedger::default();
        let (product, location) = (Uuid::new_v4(), Uuid::new_v4());

        ledger.increment(product, location, 5);
        ledger.increment(product, location, 3);

        assert_eq!(ledger.quantity(product, location), 8);
        assert_eq!(ledger.record_count(), 1);
    }

    /// A covered deduction subtracts and reports the remainder
    #[test]
    fn test_decrement_when_sufficient() {
        let mut ledger = MemoryLedger::default();
        let (product, location) = (Uuid::new_v4(), Uuid::new_v4());
        ledger.ensure(product, location, 10);

        assert_eq!(ledger.decrement_if_sufficient(product, location, 4), Ok(6));
        assert_eq!(ledger.quantity(product, location), 6);
    }

    /// Deducting the full balance is allowed and leaves zero
    #[test]
    fn test_decrement_exact_balance() {
        let mut ledger = MemoryLedger::default();
        let (product, location) = (Uuid::new_v4(), Uuid::new_v4());
        ledger.ensure(product, location, 10);

        assert_eq!(ledger.decrement_if_sufficient(product, location, 10), Ok(0));
        assert_eq!(ledger.quantity(product, location), 0);
    }

    /// An uncovered deduction fails and leaves the quantity alone
    #[test]
    fn test_decrement_insufficient_is_rejected() {
        let mut ledger = MemoryLedger::default();
        let (product, location) = (Uuid::new_v4(), Uuid::new_v4());
        ledger.ensure(product, location, 5);

        assert_eq!(ledger.decrement_if_sufficient(product, location, 6), Err(5));
        assert_eq!(ledger.quantity(product, location), 5);
    }

    /// Deducting from a record that never existed reports zero available
    #[test]
    fn test_decrement_missing_record_reports_zero() {
        let mut ledger = MemoryLedger::default();
        let (product, location) = (Uuid::new_v4(), Uuid::new_v4());

        assert_eq!(ledger.decrement_if_sufficient(product, location, 1), Err(0));
    }

    /// Absolute correction overwrites whatever was there
    #[test]
    fn test_set_absolute_overwrites() {
        let mut ledger = MemoryLedger::default();
        let (product, location) = (Uuid::new_v4(), Uuid::new_v4());
        ledger.ensure(product, location, 10);

        assert_eq!(ledger.set_absolute(product, location, 3), 3);
        assert_eq!(ledger.quantity(product, location), 3);
    }

    /// The same product at two locations moves independently
    #[test]
    fn test_pairs_are_independent() {
        let mut ledger = MemoryLedger::default();
        let product = Uuid::new_v4();
        let (north, south) = (Uuid::new_v4(), Uuid::new_v4());

        ledger.ensure(product, north, 10);
        ledger.ensure(product, south, 20);
        ledger.decrement_if_sufficient(product, north, 10).unwrap();

        assert_eq!(ledger.quantity(product, north), 0);
        assert_eq!(ledger.quantity(product, south), 20);
        assert_eq!(ledger.record_count(), 2);
    }
}

// ============================================================================
// Concurrency Tests
// ============================================================================

#[cfg(test)]
mod concurrency_tests {
    use super::*;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    /// Two concurrent unit sales against one unit of stock: exactly one
    /// succeeds and the final quantity is zero
    #[tokio::test]
    async fn test_concurrent_unit_sales_produce_one_winner() {
        let ledger = Arc::new(Mutex::new(MemoryLedger::default()));
        let (product, location) = (Uuid::new_v4(), Uuid::new_v4());
        ledger.lock().await.ensure(product, location, 1);

        let mut handles = Vec::new();
        for _ in 0..2 {
            let ledger = Arc::clone(&ledger);
            handles.push(tokio::spawn(async move {
                // Lock held across check and subtract, like the row lock
                let mut guard = ledger.lock().await;
                guard.decrement_if_sufficient(product, location, 1).is_ok()
            }));
        }

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap() {
                successes += 1;
            }
        }

        assert_eq!(successes, 1);
        assert_eq!(ledger.lock().await.quantity(product, location), 0);
    }

    /// Many concurrent deductions drain the stock without overselling
    #[tokio::test]
    async fn test_concurrent_deductions_never_oversell() {
        let ledger = Arc::new(Mutex::new(MemoryLedger::default()));
        let (product, location) = (Uuid::new_v4(), Uuid::new_v4());
        ledger.lock().await.ensure(product, location, 10);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let ledger = Arc::clone(&ledger);
            handles.push(tokio::spawn(async move {
                let mut guard = ledger.lock().await;
                guard.decrement_if_sufficient(product, location, 3).is_ok()
            }));
        }

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap() {
                successes += 1;
            }
        }

        // 10 units cover exactly three deductions of 3
        assert_eq!(successes, 3);
        assert_eq!(ledger.lock().await.quantity(product, location), 1);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    /// Strategy for movement quantities
    fn delta_strategy() -> impl Strategy<Value = i64> {
        1i64..=1000
    }

    /// Strategy for mixed ledger operations; true increments, false deducts
    fn op_strategy() -> impl Strategy<Value = (bool, i64)> {
        (any::<bool>(), delta_strategy())
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Property: the quantity never goes negative, whatever the
        /// operation sequence
        #[test]
        fn prop_quantity_never_negative(
            initial in 0i64..=5000,
            ops in prop::collection::vec(op_strategy(), 1..50)
        ) {
            let mut ledger = MemoryLedger::default();
            let (product, location) = (Uuid::new_v4(), Uuid::new_v4());
            ledger.ensure(product, location, initial);

            for (is_increment, delta) in ops {
                if is_increment {
                    ledger.increment(product, location, delta);
                } else {
                    let _ = ledger.decrement_if_sufficient(product, location, delta);
                }
                prop_assert!(ledger.quantity(product, location) >= 0);
            }
        }

        /// Property: the final quantity equals the initial plus every
        /// increment minus every successful deduction
        #[test]
        fn prop_quantity_is_conserved(
            initial in 0i64..=5000,
            ops in prop::collection::vec(op_strategy(), 1..50)
        ) {
            let mut ledger = MemoryLedger::default();
            let (product, location) = (Uuid::new_v4(), Uuid::new_v4());
            ledger.ensure(product, location, initial);

            let mut expected = initial;
            for (is_increment, delta) in ops {
                if is_increment {
                    ledger.increment(product, location, delta);
                    expected += delta;
                } else if ledger.decrement_if_sufficient(product, location, delta).is_ok() {
                    expected -= delta;
                }
            }

            prop_assert_eq!(ledger.quantity(product, location), expected);
        }

        /// Property: a deduction larger than the balance always fails and
        /// reports the available quantity
        #[test]
        fn prop_oversell_never_succeeds(
            available in 0i64..=100,
            requested in 1i64..=200
        ) {
            let mut ledger = MemoryLedger::default();
            let (product, location) = (Uuid::new_v4(), Uuid::new_v4());
            ledger.ensure(product, location, available);

            let result = ledger.decrement_if_sufficient(product, location, requested);
            if requested > available {
                prop_assert_eq!(result, Err(available));
                prop_assert_eq!(ledger.quantity(product, location), available);
            } else {
                prop_assert_eq!(result, Ok(available - requested));
            }
        }

        /// Property: repeated ensure calls never create a second record or
        /// change the quantity
        #[test]
        fn prop_ensure_keeps_first_write(
            first in 0i64..=1000,
            second in 0i64..=1000
        ) {
            let mut ledger = MemoryLedger::default();
            let (product, location) = (Uuid::new_v4(), Uuid::new_v4());

            ledger.ensure(product, location, first);
            ledger.ensure(product, location, second);

            prop_assert_eq!(ledger.quantity(product, location), first);
            prop_assert_eq!(ledger.record_count(), 1);
        }

        /// Property: an absolute correction is read back verbatim
        #[test]
        fn prop_set_absolute_round_trips(
            initial in 0i64..=1000,
            corrected in 0i64..=1000
        ) {
            let mut ledger = MemoryLedger::default();
            let (product, location) = (Uuid::new_v4(), Uuid::new_v4());
            ledger.ensure(product, location, initial);

            ledger.set_absolute(product, location, corrected);
            prop_assert_eq!(ledger.quantity(product, location), corrected);
        }
    }
}
