//! Payment strategies and the registry that selects between them.
//!
//! A strategy is a stateless implementation of "process this amount in this
//! currency". The [`StrategyRegistry`] maps a method identifier to a strategy;
//! identifiers are normalized to lower case on both registration and lookup.
//!
//! New methods are added by registering another [`PaymentStrategy`]; the
//! dispatcher does not change.
//!
//! ```
//! use payment_types::strategy::StrategyRegistry;
//!
//! let registry = StrategyRegistry::builtin();
//! assert!(registry.resolve("Credit_Card").is_ok());
//! assert!(registry.resolve("cash").is_err());
//! ```

use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::ops::Deref;

use crate::amount::Amount;
use crate::error::{RegistryError, StrategyError};
use crate::payment::{Currency, PaymentMethod, Settlement};

pub trait PaymentStrategy: Send + Sync {
    /// Display name used in reports, e.g. `"Credit Card"`.
    fn label(&self) -> &'static str;

    fn process(&self, amount: &Amount, currency: &Currency) -> Result<Settlement, StrategyError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CreditCard;

impl PaymentStrategy for CreditCard {
    fn label(&self) -> &'static str {
        "Credit Card"
    }

    fn process(&self, amount: &Amount, currency: &Currency) -> Result<Settlement, StrategyError> {
        Ok(Settlement {
            label: self.label(),
            amount: *amount,
            currency: currency.clone(),
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PayPal;

impl PaymentStrategy for PayPal {
    fn label(&self) -> &'static str {
        "PayPal"
    }

    fn process(&self, amount: &Amount, currency: &Currency) -> Result<Settlement, StrategyError> {
        Ok(Settlement {
            label: self.label(),
            amount: *amount,
            currency: currency.clone(),
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Crypto;

impl PaymentStrategy for Crypto {
    fn label(&self) -> &'static str {
        "Crypto"
    }

    fn process(&self, amount: &Amount, currency: &Currency) -> Result<Settlement, StrategyError> {
        Ok(Settlement {
            label: self.label(),
            amount: *amount,
            currency: currency.clone(),
        })
    }
}

#[derive(Default)]
pub struct StrategyRegistry(HashMap<String, Box<dyn PaymentStrategy>>);

impl Debug for StrategyRegistry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("StrategyRegistry")
            .field(&self.identifiers())
            .finish()
    }
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding exactly the built-in credit card, PayPal and crypto strategies.
    pub fn builtin() -> Self {
        Self::new()
            .and_register(PaymentMethod::CreditCard.as_str(), CreditCard)
            .and_register(PaymentMethod::PayPal.as_str(), PayPal)
            .and_register(PaymentMethod::Crypto.as_str(), Crypto)
    }

    pub fn and_register<S: PaymentStrategy + 'static>(
        mut self,
        identifier: &str,
        strategy: S,
    ) -> Self {
        self.register(identifier, strategy);
        self
    }

    /// Stores `strategy` under the lower-cased `identifier`, replacing any previous entry.
    pub fn register<S: PaymentStrategy + 'static>(&mut self, identifier: &str, strategy: S) {
        self.0.insert(normalize(identifier), Box::new(strategy));
    }

    pub fn resolve(&self, identifier: &str) -> Result<&dyn PaymentStrategy, RegistryError> {
        self.0
            .get(&normalize(identifier))
            .map(|v| v.deref())
            .ok_or_else(|| RegistryError::NotFound(identifier.to_string()))
    }

    /// Registered identifiers, sorted.
    pub fn identifiers(&self) -> Vec<String> {
        let mut identifiers: Vec<String> = self.0.keys().cloned().collect();
        identifiers.sort();
        identifiers
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

pub(crate) fn normalize(identifier: &str) -> String {
    identifier.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Declining;

    impl PaymentStrategy for Declining {
        fn label(&self) -> &'static str {
            "Declining"
        }

        fn process(&self, _: &Amount, _: &Currency) -> Result<Settlement, StrategyError> {
            Err(StrategyError::new("declined"))
        }
    }

    #[test]
    fn test_builtin_registers_three_methods() {
        let registry = StrategyRegistry::builtin();
        assert_eq!(
            registry.identifiers(),
            vec!["credit_card", "crypto", "paypal"]
        );
        assert_eq!(registry.resolve("paypal").unwrap().label(), "PayPal");
        assert_eq!(registry.resolve("CRYPTO").unwrap().label(), "Crypto");
    }

    #[test]
    fn test_resolve_unknown_is_not_found() {
        let registry = StrategyRegistry::builtin();
        assert_eq!(
            registry.resolve("invalid_method").err(),
            Some(RegistryError::NotFound("invalid_method".to_string()))
        );
    }

    #[test]
    fn test_register_overwrites_existing_identifier() {
        let registry = StrategyRegistry::builtin().and_register("PayPal", Declining);
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.resolve("paypal").unwrap().label(), "Declining");
    }

    #[test]
    fn test_strategy_echoes_amount_and_currency() {
        let amount = Amount::try_from(42.0).unwrap();
        let currency = Currency::parse("EUR").unwrap();
        let settlement = CreditCard.process(&amount, &currency).unwrap();
        assert_eq!(settlement.summary(), "Credit Card payment of 42.00 EUR success.");
    }
}
