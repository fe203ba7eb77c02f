//! Request and outcome types exchanged with the dispatcher.
//!
//! A [`PaymentRequest`] is transient: built per call from whatever boundary
//! received it (HTTP body, WebSocket message) and dropped once the
//! [`PaymentOutcome`] is produced. Nothing here is persisted.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::amount::Amount;
use crate::error::PaymentError;

/// Built-in payment methods accepted at the request boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    CreditCard,
    #[serde(rename = "paypal")]
    PayPal,
    Crypto,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 3] = [
        PaymentMethod::CreditCard,
        PaymentMethod::PayPal,
        PaymentMethod::Crypto,
    ];

    /// Identifier under which the method's strategy is registered.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::CreditCard => "credit_card",
            PaymentMethod::PayPal => "paypal",
            PaymentMethod::Crypto => "crypto",
        }
    }
}

impl Display for PaymentMethod {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown payment method: {0}")]
pub struct PaymentMethodParseError(String);

impl FromStr for PaymentMethod {
    type Err = PaymentMethodParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        PaymentMethod::ALL
            .into_iter()
            .find(|method| method.as_str() == normalized)
            .ok_or_else(|| PaymentMethodParseError(s.to_string()))
    }
}

/// Short currency code such as `USD`, `EUR` or `BTC`.
///
/// Codes are stored upper-cased. A blank code is not a currency: boundaries
/// treat it as "not provided" and let the dispatcher fall back to its default.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Currency(String);

impl Currency {
    pub const DEFAULT_CODE: &'static str = "USD";

    /// Returns `None` for blank input.
    pub fn parse(code: &str) -> Option<Self> {
        let code = code.trim();
        if code.is_empty() {
            None
        } else {
            Some(Currency(code.to_uppercase()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Currency {
    fn default() -> Self {
        Currency(Self::DEFAULT_CODE.to_string())
    }
}

impl Display for Currency {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Currency {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Currency::parse(&s).ok_or_else(|| serde::de::Error::custom("currency code is blank"))
    }
}

/// One inbound payment request.
///
/// `currency` is optional: absent or blank means "use the dispatcher default".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub method: PaymentMethod,
    pub amount: Amount,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub currency: Option<Currency>,
    pub credential: String,
}

fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<Currency>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(Currency::parse))
}

/// What a strategy hands back after processing a payment.
#[derive(Debug, Clone, PartialEq)]
pub struct Settlement {
    pub label: &'static str,
    pub amount: Amount,
    pub currency: Currency,
}

impl Settlement {
    /// Human-readable line reported for a successful payment.
    pub fn summary(&self) -> String {
        format!(
            "{} payment of {} {} success.",
            self.label, self.amount, self.currency
        )
    }
}

/// Result of a single dispatch call. Always produced, never thrown.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PaymentOutcome {
    Success {
        method: String,
        amount: Amount,
        currency: Currency,
    },
    Failure {
        reason: PaymentError,
    },
}

impl PaymentOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, PaymentOutcome::Success { .. })
    }

    pub fn failure(&self) -> Option<&PaymentError> {
        match self {
            PaymentOutcome::Success { .. } => None,
            PaymentOutcome::Failure { reason } => Some(reason),
        }
    }
}
