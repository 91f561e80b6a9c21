//! Type-safe price representation using decimal arithmetic.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (e.g., lekë, not qindarka).
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

    /// Format for display (e.g., "199.50 LEK").
    #[must_use]
    pub fn display(&self) -> String {
        format!("{:.2} {}", self.amount, self.currency_code.code())
    }
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    /// Albanian lek.
    #[default]
    ALL,
    EUR,
    USD,
}

impl CurrencyCode {
    /// The ISO 4217 code as displayed to shoppers.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            // Storefront convention: the lek is shown as "LEK", not "ALL"
            Self::ALL => "LEK",
            Self::EUR => "EUR",
            Self::USD => "USD",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_display() {
        let price = Price::new(Decimal::new(19950, 2), CurrencyCode::ALL);
        assert_eq!(price.display(), "199.50 LEK");
    }

    #[test]
    fn test_price_display_pads_to_two_decimals() {
        let price = Price::new(Decimal::new(120, 0), CurrencyCode::EUR);
        assert_eq!(price.display(), "120.00 EUR");
    }
}
