use std::fmt;
use std::iter::Sum;

use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};

const DECIMAL_PLACES: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Decimal", into = "Decimal")]
pub struct MoneyValue(Decimal);

impl MoneyValue {
    pub const ZERO: MoneyValue = MoneyValue(Decimal::from_parts(0, 0, 0, false, DECIMAL_PLACES));
    /// Upper bound for any single menu price.
    pub const MAX_PRICE: MoneyValue =
        MoneyValue(Decimal::from_parts(100_000_000, 0, 0, false, DECIMAL_PLACES));

    /// Round an arbitrary decimal to the cent, half-up (away from zero).
    pub fn round(amount: Decimal) -> Self {
        let mut rounded =
            amount.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero);
        rounded.rescale(DECIMAL_PLACES);
        Self(rounded)
    }

    pub fn from_cents(cents: i64) -> Self {
        Self(Decimal::new(cents, DECIMAL_PLACES))
    }

    pub fn amount(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    pub fn exceeds_max_price(&self) -> bool {
        self.0 > Self::MAX_PRICE.0
    }

    pub fn checked_add(self, other: MoneyValue) -> Option<Self> {
        self.0.checked_add(other.0).map(Self::round)
    }

    pub fn checked_mul(self, quantity: u32) -> Option<Self> {
        self.0.checked_mul(Decimal::from(quantity)).map(Self::round)
    }

    pub fn checked_scale(self, factor: Decimal) -> Option<Self> {
        self.0.checked_mul(factor).map(Self::round)
    }

    /// Keep `100 - percent` percent of the amount, rounded. `percent` is in (0, 100].
    pub fn less_percent(self, percent: Decimal) -> Self {
        let keep = ((Decimal::ONE_HUNDRED - percent) / Decimal::ONE_HUNDRED).clamp(Decimal::ZERO, Decimal::ONE);
        Self::round(self.0 * keep).clamp_non_negative()
    }

    /// Subtract, never going below zero.
    pub fn saturating_sub(self, other: MoneyValue) -> Self {
        Self::round(self.0 - other.0).clamp_non_negative()
    }

    pub fn clamp_non_negative(self) -> Self {
        if self.0.is_sign_negative() {
            Self::ZERO
        } else {
            self
        }
    }
}

impl Sum for MoneyValue {
    fn sum<I: Iterator<Item = MoneyValue>>(iter: I) -> MoneyValue {
        iter.fold(MoneyValue::ZERO, |acc, value| {
            MoneyValue::round(acc.0.saturating_add(value.0))
        })
    }
}

impl From<Decimal> for MoneyValue {
    fn from(value: Decimal) -> Self {
        MoneyValue::round(value)
    }
}

impl From<MoneyValue> for Decimal {
    fn from(value: MoneyValue) -> Self {
        value.0
    }
}

impl fmt::Display for MoneyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::MoneyValue;

    #[test]
    fn rounds_half_up_to_the_cent() {
        assert_eq!(MoneyValue::round(Decimal::new(5, 3)), MoneyValue::from_cents(1));
        assert_eq!(MoneyValue::round(Decimal::new(4, 3)), MoneyValue::ZERO);
        assert_eq!(MoneyValue::round(Decimal::new(19995, 3)), MoneyValue::from_cents(2000));
    }

    #[test]
    fn rounding_happens_before_the_percentage_step() {
        let subtotal = MoneyValue::round(Decimal::new(19995, 3));
        let discounted = subtotal.less_percent(Decimal::from(10));

        assert_eq!(discounted, MoneyValue::from_cents(1800));
        assert_eq!(discounted.amount().scale(), 2);
    }

    #[test]
    fn stepwise_rounding_differs_from_end_rounding() {
        // 0.15 -> 10% off -> 0.135 -> 0.14 -> 10% off -> 0.126 -> 0.13
        let stepwise = MoneyValue::from_cents(15)
            .less_percent(Decimal::from(10))
            .less_percent(Decimal::from(10));
        // 0.15 * 0.81 = 0.1215 -> 0.12
        let at_end = MoneyValue::round(Decimal::new(15, 2) * Decimal::new(81, 2));

        assert_eq!(stepwise, MoneyValue::from_cents(13));
        assert_ne!(stepwise, at_end);
    }

    #[test]
    fn overflowing_arithmetic_is_reported() {
        let huge = MoneyValue::round(Decimal::MAX);

        assert_eq!(huge.checked_mul(2), None);
        assert_eq!(huge.checked_add(huge), None);
        assert_eq!(huge.checked_scale(Decimal::new(140, 2)), None);
        assert_eq!(
            MoneyValue::from_cents(250).checked_mul(3),
            Some(MoneyValue::from_cents(750))
        );
        assert!(huge.exceeds_max_price());
        assert!(!MoneyValue::MAX_PRICE.exceeds_max_price());
    }

    #[test]
    fn subtraction_clamps_to_zero() {
        let result = MoneyValue::from_cents(500).saturating_sub(MoneyValue::from_cents(800));
        assert_eq!(result, MoneyValue::ZERO);
        assert!(!result.is_negative());
    }

    #[test]
    fn display_always_has_two_digits() {
        assert_eq!(MoneyValue::from_cents(810).to_string(), "8.10");
        assert_eq!(MoneyValue::round(Decimal::from(18)).to_string(), "18.00");
    }
}
