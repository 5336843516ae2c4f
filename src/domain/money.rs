//! Monetary types for price and volume representation.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

/// Price represented as a Decimal for precision.
pub type Price = Decimal;

/// Volume represented as a Decimal for precision.
pub type Volume = Decimal;

/// Amount of US dollars.
pub type Usd = Decimal;

/// Convert a decimal to `f64` for indicator math.
#[must_use]
pub fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

/// Convert an indicator result back to a decimal.
///
/// Non-finite values (NaN, infinity) have no decimal form and yield `None`.
#[must_use]
pub fn from_f64(value: f64) -> Option<Decimal> {
    if value.is_finite() {
        Decimal::from_f64(value)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn price_and_volume_are_decimal() {
        let price: Price = dec!(1.50);
        let volume: Volume = dec!(100.0);

        assert_eq!(price + volume, dec!(101.50));
    }

    #[test]
    fn non_finite_values_have_no_decimal() {
        assert!(from_f64(f64::NAN).is_none());
        assert!(from_f64(f64::INFINITY).is_none());
        assert_eq!(from_f64(2.5), Some(dec!(2.5)));
    }

    #[test]
    fn decimal_converts_to_float() {
        assert!((to_f64(dec!(0.25)) - 0.25).abs() < f64::EPSILON);
    }
}
