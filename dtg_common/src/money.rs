use std::{fmt::Display, str::FromStr};

use rust_decimal::{prelude::ToPrimitive, Decimal};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The currency Datatrans insists on when a form carries no amount at all (alias registration).
pub const PLACEHOLDER_CURRENCY: CurrencyCode = CurrencyCode(*b"CHF");

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyError {
    #[error("Invalid currency code '{0}'. Expected three ASCII letters.")]
    InvalidCurrencyCode(String),
    #[error("Invalid minor-unit amount '{0}'. Expected an integer.")]
    InvalidMinorUnits(String),
    #[error("{0} cannot be represented in minor units")]
    Overflow(Decimal),
}

//--------------------------------------    CurrencyCode     ---------------------------------------------------------
/// A three-letter currency code. Codes are case-insensitive on input and always kept in uppercase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode([u8; 3]);

impl CurrencyCode {
    pub fn as_str(&self) -> &str {
        // Only ASCII letters ever make it in here
        std::str::from_utf8(&self.0).unwrap_or("???")
    }
}

impl FromStr for CurrencyCode {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        if bytes.len() != 3 || !bytes.iter().all(u8::is_ascii_alphabetic) {
            return Err(MoneyError::InvalidCurrencyCode(s.to_string()));
        }
        Ok(Self([bytes[0].to_ascii_uppercase(), bytes[1].to_ascii_uppercase(), bytes[2].to_ascii_uppercase()]))
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = MoneyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.as_str().to_string()
    }
}

impl Display for CurrencyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

//--------------------------------------        Money        ---------------------------------------------------------
/// An exact decimal amount together with its currency.
///
/// On the wire Datatrans only ever sees integer minor units (`amount × 100`) and a currency code. Going to the wire
/// truncates towards zero, so `8.505 CHF` becomes `850`. Coming back is exact: `850` is `8.50`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    amount: Decimal,
    currency: CurrencyCode,
}

impl Money {
    pub fn new(amount: Decimal, currency: CurrencyCode) -> Self {
        Self { amount, currency }
    }

    pub fn parse(amount: Decimal, currency: &str) -> Result<Self, MoneyError> {
        Ok(Self::new(amount, currency.parse()?))
    }

    pub fn zero(currency: CurrencyCode) -> Self {
        Self::new(Decimal::ZERO, currency)
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn currency(&self) -> CurrencyCode {
        self.currency
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.amount > Decimal::ZERO
    }

    /// Converts the amount into integer minor units, truncating anything below hundredths.
    pub fn to_wire(&self) -> Result<(i64, CurrencyCode), MoneyError> {
        let minor_units = self
            .amount
            .checked_mul(Decimal::ONE_HUNDRED)
            .and_then(|v| v.trunc().to_i64())
            .ok_or(MoneyError::Overflow(self.amount))?;
        Ok((minor_units, self.currency))
    }

    /// Builds a `Money` value from the text of sibling `amount` and `currency` wire elements.
    pub fn from_wire(minor_units: &str, currency: &str) -> Result<Self, MoneyError> {
        let units = minor_units
            .trim()
            .parse::<i64>()
            .map_err(|_| MoneyError::InvalidMinorUnits(minor_units.to_string()))?;
        let currency = currency.trim().parse::<CurrencyCode>()?;
        Ok(Self::new(Decimal::new(units, 2), currency))
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.amount, self.currency)
    }
}
