//! Type-safe price representation using decimal arithmetic.
//!
//! Amounts are `rust_decimal::Decimal` everywhere. The order backend and the
//! checkout storage exchange JSON numbers, so wire-facing fields opt into
//! `rust_decimal::serde::float` explicitly.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (e.g., rupees, not paise).
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

    /// Create a price in the store's default currency.
    #[must_use]
    pub fn inr(amount: Decimal) -> Self {
        Self::new(amount, CurrencyCode::INR)
    }

    /// Format for display (e.g., "₹1299.00").
    #[must_use]
    pub fn display(&self) -> String {
        format!(
            "{}{:.2}",
            self.currency_code.symbol(),
            self.amount.round_dp(2)
        )
    }
}

impl std::fmt::Display for Price {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.display())
    }
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    INR,
}

impl CurrencyCode {
    /// Display symbol for the currency.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::INR => "₹",
        }
    }
}

/// Price of a cart line: unit price times quantity. `None` on overflow.
#[must_use]
pub fn line_total(unit_price: Decimal, quantity: u32) -> Option<Decimal> {
    unit_price.checked_mul(Decimal::from(quantity))
}

/// Parse an amount from the loosely typed values found in checkout storage.
///
/// Accepts plain decimals (`"499"`, `"12.50"`) and scientific notation.
#[must_use]
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim().trim_matches('"');
    trimmed
        .parse::<Decimal>()
        .ok()
        .or_else(|| Decimal::from_scientific(trimmed).ok())
}

/// Serde adapter for wire amounts: written as JSON numbers, read from
/// numbers or numeric strings.
pub mod amount {
    use rust_decimal::Decimal;
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize as a JSON number.
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    pub fn serialize<S: Serializer>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error> {
        rust_decimal::serde::float::serialize(value, serializer)
    }

    /// Deserialize from a JSON number or a numeric string.
    ///
    /// # Errors
    ///
    /// Fails for any other JSON type or an unparseable string.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Decimal, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        from_value(&value)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid amount: {value}")))
    }

    pub(crate) fn from_value(value: &serde_json::Value) -> Option<Decimal> {
        match value {
            serde_json::Value::Number(n) => super::parse_amount(&n.to_string()),
            serde_json::Value::String(s) => super::parse_amount(s),
            _ => None,
        }
    }
}

/// Optional variant of [`amount`]; `null` and absent fields become `None`.
pub mod amount_option {
    use rust_decimal::Decimal;
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize as a JSON number or `null`.
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    pub fn serialize<S: Serializer>(
        value: &Option<Decimal>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        rust_decimal::serde::float_option::serialize(value, serializer)
    }

    /// Deserialize from a JSON number, numeric string, or `null`.
    ///
    /// # Errors
    ///
    /// Fails for any other JSON type or an unparseable string.
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Decimal>, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        if value.is_null() {
            return Ok(None);
        }
        super::amount::from_value(&value)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid amount: {value}")))
    }
}
