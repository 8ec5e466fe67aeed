//! Properties of the decimal <-> base-unit conversion.

use proptest::prelude::*;
use vault_multiply::domain::amount::MAX_PRECISION;
use vault_multiply::domain::ConversionError;
use vault_multiply::{from_base_units, to_base_units, BaseUnits, Decimal};

fn d(s: &str) -> Decimal {
    Decimal::from_str_canonical(s).unwrap()
}

/// Non-negative decimals with up to 10 integer and 12 fractional digits.
fn amount() -> impl Strategy<Value = Decimal> {
    (0i128..10_000_000_000, 0i128..1_000_000_000_000).prop_map(|(whole, frac)| {
        Decimal::try_from_scaled(whole * 1_000_000_000_000 + frac, 12).unwrap()
    })
}

proptest! {
    #[test]
    fn prop_round_trip_is_half_up_rounding(value in amount(), precision in 0u32..=18) {
        let raw = to_base_units(&value, precision).unwrap();
        let back = from_base_units(raw, precision).unwrap();
        prop_assert_eq!(back, value.round_half_up(precision));
    }

    #[test]
    fn prop_base_units_are_identity(raw in any::<u64>(), precision in 0u32..=MAX_PRECISION) {
        let units = BaseUnits::new(raw as u128);
        prop_assert_eq!(to_base_units(&units, precision).unwrap(), units);
    }

    #[test]
    fn prop_conversion_is_monotonic(a in amount(), b in amount(), precision in 0u32..=18) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(to_base_units(&lo, precision).unwrap() <= to_base_units(&hi, precision).unwrap());
    }
}

#[test]
fn test_known_values() {
    assert_eq!(
        to_base_units(&d("38921.23514"), 18).unwrap().to_string(),
        "38921235140000000000000"
    );
    let one_eth = BaseUnits::new(1_000_000_000_000_000_000);
    assert_eq!(
        to_base_units(&one_eth, 18).unwrap().to_string(),
        "1000000000000000000"
    );
    assert_eq!(to_base_units(&d("0.5"), 0).unwrap(), BaseUnits::new(1));
    assert_eq!(to_base_units(&d("0.49"), 0).unwrap(), BaseUnits::new(0));
}

#[test]
fn test_rejections() {
    assert!(matches!(
        to_base_units(&d("-1"), 6),
        Err(ConversionError::NegativeAmount { .. })
    ));
    assert!(matches!(
        to_base_units(&d("1"), MAX_PRECISION + 1),
        Err(ConversionError::InvalidPrecision { .. })
    ));
    assert!(matches!(
        from_base_units(BaseUnits::new(1), MAX_PRECISION + 1),
        Err(ConversionError::InvalidPrecision { .. })
    ));
}
