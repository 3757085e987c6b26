//! Type-safe price representation using decimal arithmetic.
//!
//! The backend sends prices as JSON numbers in the shop's currency (euros).
//! Floating point is never used for sums: line totals and cart totals are
//! computed on [`Decimal`] and rounded to two places only for display.
//! Arithmetic is checked, since the amounts come from outside.

use core::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (e.g., euros, not cents).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// A price in euros, the shop currency.
    #[must_use]
    pub const fn eur(amount: Decimal) -> Self {
        Self::new(amount, CurrencyCode::EUR)
    }

    /// A zero amount in the given currency.
    #[must_use]
    pub const fn zero(currency_code: CurrencyCode) -> Self {
        Self::new(Decimal::ZERO, currency_code)
    }

    /// The price of `quantity` units, or `None` on overflow.
    #[must_use]
    pub fn checked_times(self, quantity: u32) -> Option<Self> {
        let amount = self.amount.checked_mul(Decimal::from(quantity))?;
        Some(Self::new(amount, self.currency_code))
    }

    /// Sum of two prices, or `None` on overflow.
    #[must_use]
    pub fn checked_add(self, other: Self) -> Option<Self> {
        let amount = self.amount.checked_add(other.amount)?;
        Some(Self::new(amount, self.currency_code))
    }

    /// Sums prices, keeping the currency of the first one.
    ///
    /// An empty iterator yields zero in the default currency; an overflowing
    /// sum yields `None`.
    pub fn checked_sum<I: IntoIterator<Item = Self>>(prices: I) -> Option<Self> {
        let mut prices = prices.into_iter();
        let Some(first) = prices.next() else {
            return Some(Self::default());
        };
        prices.try_fold(first, Self::checked_add)
    }

    /// Amount rounded half-away-from-zero to two decimal places.
    #[must_use]
    pub fn rounded(&self) -> Decimal {
        self.amount
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    }
}

impl Default for Price {
    fn default() -> Self {
        Self::zero(CurrencyCode::default())
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let amount = self.rounded();
        let symbol = self.currency_code.symbol();
        if self.currency_code.symbol_after_amount() {
            write!(f, "{amount:.2} {symbol}")
        } else {
            write!(f, "{symbol}{amount:.2}")
        }
    }
}

/// ISO 4217 currency codes the shop trades in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    EUR,
}

impl CurrencyCode {
    /// Display symbol for the currency.
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::EUR => "€",
        }
    }

    /// Whether the symbol is written after the amount (`12.50 €`).
    #[must_use]
    pub const fn symbol_after_amount(&self) -> bool {
        matches!(self, Self::EUR)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap_or_default()
    }

    #[test]
    fn test_display_euro_after_amount() {
        assert_eq!(Price::eur(dec("12.5")).to_string(), "12.50 €");
        assert_eq!(Price::eur(dec("0")).to_string(), "0.00 €");
    }

    #[test]
    fn test_display_rounds_half_away_from_zero() {
        assert_eq!(Price::eur(dec("1.005")).to_string(), "1.01 €");
    }

    #[test]
    fn test_times_and_sum_are_exact() {
        // 0.1 * 3 + 0.2 would drift with f64
        let three = Price::eur(dec("0.1")).checked_times(3).unwrap();
        let total = Price::checked_sum([three, Price::eur(dec("0.2"))]).unwrap();
        assert_eq!(total.amount, dec("0.5"));
    }

    #[test]
    fn test_sum_of_nothing_is_zero_euros() {
        assert_eq!(
            Price::checked_sum(std::iter::empty()),
            Some(Price::zero(CurrencyCode::EUR))
        );
    }

    #[test]
    fn test_overflow_is_none() {
        let huge = Price::eur(dec("50000000000000000000000000000"));
        assert_eq!(huge.checked_times(3), None);
        assert_eq!(Price::checked_sum([huge, huge]), None);
        assert_eq!(huge.checked_times(1), Some(huge));
    }
}
