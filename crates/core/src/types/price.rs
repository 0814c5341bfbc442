//! Type-safe price representation using decimal arithmetic.
//!
//! Catalog prices and order totals live in whole currency units as
//! [`Decimal`]. The payment processor wants integer minor units (cents), so
//! conversion happens only at that boundary through
//! [`Price::to_minor_units`] and [`Price::from_minor_units`].

use core::fmt;

use rust_decimal::prelude::ToPrimitive;
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

    /// Build a price from an integer amount of minor units.
    ///
    /// ```
    /// use aerox_core::{CurrencyCode, Price};
    /// use rust_decimal::Decimal;
    ///
    /// let price = Price::from_minor_units(11_100, CurrencyCode::EUR);
    /// assert_eq!(price.amount, Decimal::new(111, 0));
    /// ```
    #[must_use]
    pub fn from_minor_units(minor: i64, currency_code: CurrencyCode) -> Self {
        Self {
            amount: Decimal::new(minor, 2),
            currency_code,
        }
    }

    /// Convert to integer minor units, rounding half away from zero.
    ///
    /// Returns `None` if the amount does not fit in an `i64`.
    #[must_use]
    pub fn to_minor_units(&self) -> Option<i64> {
        (self.amount * Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{:.2}",
            self.currency_code.symbol(),
            self.amount.round_dp(2)
        )
    }
}

/// ISO 4217 currency codes accepted by the checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    EUR,
    USD,
    GBP,
}

impl CurrencyCode {
    /// Lowercase code as the payment processor expects it.
    #[must_use]
    pub const fn as_processor_code(self) -> &'static str {
        match self {
            Self::EUR => "eur",
            Self::USD => "usd",
            Self::GBP => "gbp",
        }
    }

    /// Display symbol.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::EUR => "€",
            Self::USD => "$",
            Self::GBP => "£",
        }
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_processor_code())
    }
}

impl std::str::FromStr for CurrencyCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "eur" => Ok(Self::EUR),
            "usd" => Ok(Self::USD),
            "gbp" => Ok(Self::GBP),
            other => Err(format!("unsupported currency: {other}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_to_minor_units_whole_amount() {
        let price = Price::new(Decimal::new(111, 0), CurrencyCode::EUR);
        assert_eq!(price.to_minor_units(), Some(11_100));
    }

    #[test]
    fn test_to_minor_units_rounds_half_away_from_zero() {
        let price = Price::new(Decimal::new(10_005, 3), CurrencyCode::EUR);
        assert_eq!(price.to_minor_units(), Some(1001));
    }

    #[test]
    fn test_from_minor_units() {
        let price = Price::from_minor_units(3700, CurrencyCode::EUR);
        assert_eq!(price.amount, Decimal::new(37, 0));
        assert_eq!(price.to_string(), "€37.00");
    }

    #[test]
    fn test_currency_parse_is_case_insensitive() {
        assert_eq!("EUR".parse::<CurrencyCode>().unwrap(), CurrencyCode::EUR);
        assert_eq!("usd".parse::<CurrencyCode>().unwrap(), CurrencyCode::USD);
        assert!("xyz".parse::<CurrencyCode>().is_err());
    }
}
