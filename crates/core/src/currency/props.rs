//! Property-based tests for native/display conversion.
//!
//! - Truncation never lets a converted request exceed what was entered
//! - A "withdraw all" quote never converts back to more than its ceiling

use chrono::Utc;
use proptest::prelude::*;
use rust_decimal::Decimal;

use fundrelease_shared::types::Currency;

use super::conversion::{CurrencyConverter, NATIVE_DECIMALS};
use super::exchange::ExchangeRate;

/// Strategy to generate display amounts (0.00 to 1,000,000.00).
fn display_amount() -> impl Strategy<Value = Decimal> {
    (0i64..100_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy to generate native amounts (0 to 10,000 with 18 fractional digits).
fn native_amount() -> impl Strategy<Value = Decimal> {
    (0i64..10_000_000_000i64, 0u32..=18).prop_map(|(v, scale)| Decimal::new(v, scale))
}

/// Strategy to generate positive rates (0.0001 to 100,000.0000).
fn positive_rate() -> impl Strategy<Value = ExchangeRate> {
    (1i64..1_000_000_000i64).prop_map(|v| ExchangeRate {
        currency: Currency::Myr,
        rate: Decimal::new(v, 4),
        observed_at: Utc::now(),
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Converting a display amount never yields more than 6 native fractional digits.
    #[test]
    fn prop_to_native_has_native_precision(
        amount in display_amount(),
        rate in positive_rate(),
    ) {
        let native = CurrencyConverter::to_native(amount, Some(&rate)).unwrap();
        prop_assert!(native.scale() <= NATIVE_DECIMALS);
    }

    /// The native result, valued back at the same rate, never exceeds the input.
    #[test]
    fn prop_to_native_never_rounds_up(
        amount in display_amount(),
        rate in positive_rate(),
    ) {
        let native = CurrencyConverter::to_native(amount, Some(&rate)).unwrap();
        prop_assert!(native * rate.rate <= amount);
        prop_assert!(native >= Decimal::ZERO);
    }

    /// A withdraw-all quote stays within the ceiling in both directions.
    #[test]
    fn prop_withdraw_all_never_exceeds_ceiling(
        ceiling in native_amount(),
        rate in positive_rate(),
    ) {
        let quote = CurrencyConverter::withdraw_all(ceiling, Some(&rate)).unwrap();
        prop_assert!(quote.native <= ceiling);

        let back = CurrencyConverter::to_native(quote.display, Some(&rate)).unwrap();
        prop_assert!(back <= quote.native);
    }

    /// Conversion is deterministic.
    #[test]
    fn prop_to_display_is_deterministic(
        amount in native_amount(),
        rate in positive_rate(),
    ) {
        let first = CurrencyConverter::to_display(amount, Some(&rate)).unwrap();
        let second = CurrencyConverter::to_display(amount, Some(&rate)).unwrap();
        prop_assert_eq!(first, second);
    }
}
