//! Value objects for the order domain.

use std::hash::{Hash, Hasher};

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize, de};

use super::OrderError;

/// Currencies the order domain accepts, with their minor-unit scale.
const KNOWN_CURRENCIES: &[(&str, u32)] = &[
    ("USD", 2),
    ("EUR", 2),
    ("GBP", 2),
    ("JPY", 0),
    ("UAH", 2),
];

/// An ISO currency from the closed registry.
///
/// Only [`Currency::from_code`] (and the associated constants) can produce a
/// value, so every `Currency` is known to be valid. Equality is by code.
/// Serialized as its code string.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(into = "String")]
pub struct Currency {
    code: &'static str,
    decimal_scale: u32,
}

impl Currency {
    pub const USD: Currency = Currency::registered("USD", 2);
    pub const EUR: Currency = Currency::registered("EUR", 2);
    pub const GBP: Currency = Currency::registered("GBP", 2);
    pub const JPY: Currency = Currency::registered("JPY", 0);
    pub const UAH: Currency = Currency::registered("UAH", 2);

    const fn registered(code: &'static str, decimal_scale: u32) -> Currency {
        Currency {
            code,
            decimal_scale,
        }
    }

    /// Looks up a currency by code.
    ///
    /// The code is trimmed and upper-cased first, so `"usd"` and `" USD "`
    /// resolve to the same currency.
    pub fn from_code(code: &str) -> Result<Self, OrderError> {
        let trimmed = code.trim();
        if trimmed.is_empty() {
            return Err(OrderError::CurrencyCodeRequired);
        }

        let normalized = trimmed.to_ascii_uppercase();
        KNOWN_CURRENCIES
            .iter()
            .find(|(known, _)| *known == normalized)
            .map(|&(code, decimal_scale)| Currency::registered(code, decimal_scale))
            .ok_or_else(|| OrderError::UnknownCurrency {
                code: trimmed.to_string(),
            })
    }

    /// Returns every registered currency.
    pub fn known() -> impl Iterator<Item = Currency> {
        KNOWN_CURRENCIES
            .iter()
            .map(|&(code, decimal_scale)| Currency::registered(code, decimal_scale))
    }

    /// Returns the upper-case ISO code.
    pub fn code(&self) -> &'static str {
        self.code
    }

    /// Returns the number of decimal places amounts are rounded to.
    pub fn decimal_scale(&self) -> u32 {
        self.decimal_scale
    }
}

impl PartialEq for Currency {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code
    }
}

impl Eq for Currency {}

impl Hash for Currency {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.code.hash(state);
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code)
    }
}

impl TryFrom<String> for Currency {
    type Error = OrderError;

    fn try_from(code: String) -> Result<Self, Self::Error> {
        Currency::from_code(&code)
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.code.to_string()
    }
}

// The code is resolved against the registry, so nothing borrows from the input.
impl<'de> Deserialize<'de> for Currency {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let code = String::deserialize(deserializer)?;
        Currency::from_code(&code).map_err(de::Error::custom)
    }
}

/// A non-negative amount of money in a single currency.
///
/// Amounts are rounded to the currency's scale on construction using
/// half-away-from-zero rounding. Arithmetic is checked: combining two
/// currencies fails instead of converting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "MoneyRecord")]
pub struct Money {
    amount: Decimal,
    currency: Currency,
}

#[derive(Deserialize)]
struct MoneyRecord {
    amount: Decimal,
    currency: Currency,
}

impl TryFrom<MoneyRecord> for Money {
    type Error = OrderError;

    fn try_from(record: MoneyRecord) -> Result<Self, Self::Error> {
        Money::new(record.amount, record.currency)
    }
}

impl Money {
    /// Creates a new amount, rounded to the currency's scale.
    pub fn new(amount: Decimal, currency: Currency) -> Result<Self, OrderError> {
        if amount < Decimal::ZERO {
            return Err(OrderError::NegativeAmount { amount });
        }

        Ok(Self {
            amount: amount.round_dp_with_strategy(
                currency.decimal_scale(),
                RoundingStrategy::MidpointAwayFromZero,
            ),
            currency,
        })
    }

    /// Returns zero in the given currency.
    pub fn zero(currency: Currency) -> Self {
        Self {
            amount: Decimal::ZERO,
            currency,
        }
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// Returns true if both amounts are in the same currency.
    pub fn same_currency(&self, other: &Money) -> bool {
        self.currency
            .code()
            .eq_ignore_ascii_case(other.currency.code())
    }

    /// Fails with `CurrencyMismatch` unless both amounts share a currency.
    pub fn ensure_same_currency(&self, other: &Money) -> Result<(), OrderError> {
        if self.same_currency(other) {
            Ok(())
        } else {
            Err(OrderError::CurrencyMismatch {
                expected: self.currency.code(),
                actual: other.currency.code(),
            })
        }
    }

    /// Adds another amount in the same currency.
    pub fn add(&self, other: Money) -> Result<Money, OrderError> {
        self.ensure_same_currency(&other)?;
        let sum = self
            .amount
            .checked_add(other.amount)
            .ok_or(OrderError::AmountOverflow)?;
        Money::new(sum, self.currency)
    }

    /// Multiplies by a non-negative factor.
    pub fn multiply(&self, multiplier: i64) -> Result<Money, OrderError> {
        if multiplier < 0 {
            return Err(OrderError::NegativeMultiplier { multiplier });
        }
        let product = self
            .amount
            .checked_mul(Decimal::from(multiplier))
            .ok_or(OrderError::AmountOverflow)?;
        Money::new(product, self.currency)
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let scale = self.currency.decimal_scale() as usize;
        write!(f, "{:.*} {}", scale, self.amount, self.currency)
    }
}
