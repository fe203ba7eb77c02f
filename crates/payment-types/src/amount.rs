use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::Display;
use std::str::FromStr;

/// A strictly positive, finite payment amount.
///
/// Backed by a [`Decimal`] so that reporting is stable regardless of how the
/// value arrived (JSON float, query string, test literal). Always displayed with
/// exactly two fractional digits: `100` → `100.00`, `1.5` → `1.50`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(Decimal);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("Invalid number format")]
    InvalidFormat,
    #[error("Amount must be a finite number")]
    NotFinite,
    #[error("Amount must be greater than zero")]
    NotPositive,
    #[error("Amount is below representable precision")]
    BelowPrecision,
}

impl Amount {
    /// Number of fractional digits used whenever an amount is reported.
    pub const REPORT_SCALE: u32 = 2;

    pub fn new(value: Decimal) -> Result<Self, AmountError> {
        if value.is_sign_negative() || value.is_zero() {
            return Err(AmountError::NotPositive);
        }
        Ok(Amount(value))
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// Lossy conversion back to a float, for wire formats that want a JSON number.
    pub fn to_f64(&self) -> f64 {
        self.0.to_f64().unwrap_or_default()
    }
}

impl TryFrom<f64> for Amount {
    type Error = AmountError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if !value.is_finite() {
            return Err(AmountError::NotFinite);
        }
        let decimal = Decimal::from_f64(value).ok_or(AmountError::NotFinite)?;
        if value > 0.0 && decimal.is_zero() {
            return Err(AmountError::BelowPrecision);
        }
        Amount::new(decimal)
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let decimal = Decimal::from_str(s.trim()).map_err(|_| AmountError::InvalidFormat)?;
        Amount::new(decimal)
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rounded = self.0.round_dp(Self::REPORT_SCALE);
        write!(f, "{:.2}", rounded)
    }
}

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(f64),
            Text(String),
        }
        match Raw::deserialize(deserializer)? {
            Raw::Number(value) => Amount::try_from(value).map_err(serde::de::Error::custom),
            Raw::Text(value) => Amount::from_str(&value).map_err(serde::de::Error::custom),
        }
    }
}
