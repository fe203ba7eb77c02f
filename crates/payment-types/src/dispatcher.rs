//! Credential-gated routing of payments to strategies.
//!
//! [`PaymentDispatcher`] runs the full decision sequence for one credential:
//!
//! 1. Verify the credential with the injected [`CredentialVerifier`].
//! 2. Resolve the currency, falling back to the configured default.
//! 3. Resolve the strategy from the shared [`StrategyRegistry`].
//! 4. Run the strategy, normalizing any failure (including a panic) into
//!    [`PaymentError::ProcessingFailed`].
//!
//! Each call emits exactly one [`Report`](crate::report::Report) and returns a
//! [`PaymentOutcome`]; nothing escapes the dispatcher as an error or a panic.
//!
//! [`PaymentService`] owns the collaborators that are shared across requests and
//! mints a dispatcher per credential.

use std::any::Any;
use std::fmt::{Debug, Formatter};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use crate::amount::Amount;
use crate::credential::CredentialVerifier;
use crate::error::PaymentError;
use crate::payment::{Currency, PaymentOutcome, PaymentRequest};
use crate::report::{Reporter, TracingReporter};
use crate::strategy::{StrategyRegistry, normalize};

pub struct PaymentDispatcher {
    credential: String,
    default_currency: Currency,
    verifier: Arc<dyn CredentialVerifier>,
    registry: Arc<StrategyRegistry>,
    reporter: Arc<dyn Reporter>,
}

impl Debug for PaymentDispatcher {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentDispatcher")
            .field("default_currency", &self.default_currency)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl PaymentDispatcher {
    /// Creates a dispatcher for `credential` backed by the built-in strategies
    /// and a `tracing` reporter.
    pub fn new<C, V>(credential: C, default_currency: Currency, verifier: V) -> Self
    where
        C: Into<String>,
        V: CredentialVerifier + 'static,
    {
        Self {
            credential: credential.into(),
            default_currency,
            verifier: Arc::new(verifier),
            registry: Arc::new(StrategyRegistry::builtin()),
            reporter: Arc::new(TracingReporter),
        }
    }

    pub fn with_registry(mut self, registry: Arc<StrategyRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn default_currency(&self) -> &Currency {
        &self.default_currency
    }

    /// Dispatches one payment. `currency` of `None` or blank uses the default.
    pub fn process_payment(
        &self,
        method: &str,
        amount: Amount,
        currency: Option<&str>,
    ) -> PaymentOutcome {
        match self.try_process(method, amount, currency) {
            Ok(outcome) => outcome,
            Err(error) => {
                self.reporter.error(&error.to_string());
                PaymentOutcome::Failure { reason: error }
            }
        }
    }

    fn try_process(
        &self,
        method: &str,
        amount: Amount,
        currency: Option<&str>,
    ) -> Result<PaymentOutcome, PaymentError> {
        if !self.verifier.verify(&self.credential) {
            return Err(PaymentError::Unauthorized);
        }
        let currency = currency
            .and_then(Currency::parse)
            .unwrap_or_else(|| self.default_currency.clone());
        let strategy = self.registry.resolve(method)?;

        let settlement = catch_unwind(AssertUnwindSafe(|| strategy.process(&amount, &currency)))
            .map_err(|panic| PaymentError::ProcessingFailed(panic_message(panic.as_ref())))??;

        self.reporter.info(&settlement.summary());
        Ok(PaymentOutcome::Success {
            method: normalize(method),
            amount: settlement.amount,
            currency: settlement.currency,
        })
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "payment strategy panicked".to_string()
    }
}

/// Collaborators shared by every request: verifier, registry, reporter and the
/// default currency.
#[derive(Clone)]
pub struct PaymentService {
    default_currency: Currency,
    verifier: Arc<dyn CredentialVerifier>,
    registry: Arc<StrategyRegistry>,
    reporter: Arc<dyn Reporter>,
}

impl Debug for PaymentService {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentService")
            .field("default_currency", &self.default_currency)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl PaymentService {
    pub fn new<V: CredentialVerifier + 'static>(verifier: V, default_currency: Currency) -> Self {
        Self {
            default_currency,
            verifier: Arc::new(verifier),
            registry: Arc::new(StrategyRegistry::builtin()),
            reporter: Arc::new(TracingReporter),
        }
    }

    pub fn with_registry(mut self, registry: StrategyRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    pub fn default_currency(&self) -> &Currency {
        &self.default_currency
    }

    /// Dispatcher bound to `credential`, sharing this service's collaborators.
    pub fn dispatcher<C: Into<String>>(&self, credential: C) -> PaymentDispatcher {
        PaymentDispatcher {
            credential: credential.into(),
            default_currency: self.default_currency.clone(),
            verifier: Arc::clone(&self.verifier),
            registry: Arc::clone(&self.registry),
            reporter: Arc::clone(&self.reporter),
        }
    }

    pub fn process(&self, request: &PaymentRequest) -> PaymentOutcome {
        self.dispatcher(request.credential.as_str()).process_payment(
            request.method.as_str(),
            request.amount,
            request.currency.as_ref().map(Currency::as_str),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::StaticCredential;
    use crate::error::StrategyError;
    use crate::payment::{PaymentMethod, Settlement};
    use crate::report::{MemoryReporter, ReportLevel};
    use crate::strategy::PaymentStrategy;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const VALID_KEY: &str = "valid_api_key";

    fn amount(value: f64) -> Amount {
        Amount::try_from(value).unwrap()
    }

    fn dispatcher(credential: &str, reporter: &Arc<MemoryReporter>) -> PaymentDispatcher {
        PaymentDispatcher::new(
            credential,
            Currency::default(),
            StaticCredential::new(VALID_KEY),
        )
        .with_reporter(reporter.clone())
    }

    /// Counts invocations and fails with a fixed message.
    #[derive(Default)]
    struct Counting {
        calls: Arc<AtomicUsize>,
        fail_with: Option<&'static str>,
    }

    impl PaymentStrategy for Counting {
        fn label(&self) -> &'static str {
            "Counting"
        }

        fn process(&self, amount: &Amount, currency: &Currency) -> Result<Settlement, StrategyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.fail_with {
                Some(message) => Err(StrategyError::new(message)),
                None => Ok(Settlement {
                    label: self.label(),
                    amount: *amount,
                    currency: currency.clone(),
                }),
            }
        }
    }

    struct Panicking;

    impl PaymentStrategy for Panicking {
        fn label(&self) -> &'static str {
            "Panicking"
        }

        fn process(&self, _: &Amount, _: &Currency) -> Result<Settlement, StrategyError> {
            panic!("card reader exploded")
        }
    }

    #[test]
    fn test_successful_credit_card_payment() {
        let reporter = Arc::new(MemoryReporter::new());
        let outcome = dispatcher(VALID_KEY, &reporter).process_payment(
            "credit_card",
            amount(100.0),
            Some("USD"),
        );
        assert!(outcome.is_success());
        assert_eq!(
            reporter.lines(),
            vec!["INFO:Credit Card payment of 100.00 USD success."]
        );
    }

    #[test]
    fn test_successful_paypal_payment() {
        let reporter = Arc::new(MemoryReporter::new());
        dispatcher(VALID_KEY, &reporter).process_payment("paypal", amount(50.0), Some("EUR"));
        assert!(reporter.contains(ReportLevel::Info, "PayPal payment of 50.00 EUR success."));
    }

    #[test]
    fn test_successful_crypto_payment() {
        let reporter = Arc::new(MemoryReporter::new());
        let outcome =
            dispatcher(VALID_KEY, &reporter).process_payment("crypto", amount(1.5), Some("BTC"));
        assert_eq!(
            outcome,
            PaymentOutcome::Success {
                method: "crypto".to_string(),
                amount: amount(1.5),
                currency: Currency::parse("BTC").unwrap(),
            }
        );
        assert!(reporter.contains(ReportLevel::Info, "Crypto payment of 1.50 BTC success."));
    }

    #[test]
    fn test_outcome_reports_the_identifier_that_was_resolved() {
        let reporter = Arc::new(MemoryReporter::new());
        let outcome =
            dispatcher(VALID_KEY, &reporter).process_payment(" PayPal ", amount(20.0), None);
        assert_eq!(
            outcome,
            PaymentOutcome::Success {
                method: "paypal".to_string(),
                amount: amount(20.0),
                currency: Currency::default(),
            }
        );
    }

    #[test]
    fn test_every_registered_method_succeeds() {
        for method in PaymentMethod::ALL {
            let reporter = Arc::new(MemoryReporter::new());
            let outcome = dispatcher(VALID_KEY, &reporter).process_payment(
                &method.as_str().to_uppercase(),
                amount(12.346),
                Some("EUR"),
            );
            assert!(outcome.is_success(), "{method} failed: {outcome:?}");
            assert_eq!(reporter.len(), 1);
            assert!(reporter.entries()[0].message.ends_with("of 12.35 EUR success."));
        }
    }

    #[test]
    fn test_invalid_payment_method() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = StrategyRegistry::new().and_register(
            "credit_card",
            Counting {
                calls: calls.clone(),
                fail_with: None,
            },
        );
        let reporter = Arc::new(MemoryReporter::new());
        let outcome = dispatcher(VALID_KEY, &reporter)
            .with_registry(Arc::new(registry))
            .process_payment("invalid_method", amount(100.0), Some("USD"));
        assert_eq!(
            outcome.failure(),
            Some(&PaymentError::UnknownMethod("invalid_method".to_string()))
        );
        assert_eq!(reporter.lines(), vec!["ERROR:Invalid payment method: invalid_method"]);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_invalid_api_key_short_circuits() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = StrategyRegistry::new().and_register(
            "credit_card",
            Counting {
                calls: calls.clone(),
                fail_with: None,
            },
        );
        let reporter = Arc::new(MemoryReporter::new());
        let outcome = dispatcher("invalid_key", &reporter)
            .with_registry(Arc::new(registry))
            .process_payment("credit_card", amount(100.0), Some("USD"));
        assert_eq!(outcome.failure(), Some(&PaymentError::Unauthorized));
        assert_eq!(
            reporter.lines(),
            vec!["ERROR:Invalid API key. Cannot process payment."]
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        // Unknown methods are still unauthorized: the credential check comes first.
        let outcome = dispatcher("invalid_key", &reporter).process_payment(
            "nope",
            amount(1.0),
            None,
        );
        assert_eq!(outcome.failure(), Some(&PaymentError::Unauthorized));
    }

    #[test]
    fn test_default_currency() {
        let reporter = Arc::new(MemoryReporter::new());
        let dispatcher = PaymentDispatcher::new(
            VALID_KEY,
            Currency::parse("GBP").unwrap(),
            StaticCredential::new(VALID_KEY),
        )
        .with_reporter(reporter.clone());
        dispatcher.process_payment("paypal", amount(100.0), None);
        dispatcher.process_payment("paypal", amount(100.0), Some("  "));
        assert_eq!(
            reporter.lines(),
            vec![
                "INFO:PayPal payment of 100.00 GBP success.",
                "INFO:PayPal payment of 100.00 GBP success."
            ]
        );
    }

    #[test]
    fn test_payment_fails_due_to_strategy_error() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = StrategyRegistry::builtin().and_register(
            "credit_card",
            Counting {
                calls: calls.clone(),
                fail_with: Some("Credit Card payment failed due to network error."),
            },
        );
        let reporter = Arc::new(MemoryReporter::new());
        let outcome = dispatcher(VALID_KEY, &reporter)
            .with_registry(Arc::new(registry))
            .process_payment("credit_card", amount(100.0), Some("USD"));
        assert_eq!(
            outcome.failure(),
            Some(&PaymentError::ProcessingFailed(
                "Credit Card payment failed due to network error.".to_string()
            ))
        );
        assert_eq!(
            reporter.lines(),
            vec!["ERROR:Credit Card payment failed due to network error."]
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_panicking_strategy_becomes_processing_failure() {
        let registry = StrategyRegistry::new().and_register("crypto", Panicking);
        let reporter = Arc::new(MemoryReporter::new());
        let outcome = dispatcher(VALID_KEY, &reporter)
            .with_registry(Arc::new(registry))
            .process_payment("crypto", amount(3.0), None);
        assert_eq!(
            outcome.failure(),
            Some(&PaymentError::ProcessingFailed("card reader exploded".to_string()))
        );
        assert_eq!(reporter.len(), 1);
    }

    #[test]
    fn test_service_mints_dispatchers_per_credential() {
        let reporter = Arc::new(MemoryReporter::new());
        let service = PaymentService::new(
            StaticCredential::new(VALID_KEY),
            Currency::parse("EUR").unwrap(),
        )
        .with_reporter(reporter.clone());

        let request = PaymentRequest {
            method: PaymentMethod::CreditCard,
            amount: amount(9.99),
            currency: None,
            credential: VALID_KEY.to_string(),
        };
        assert!(service.process(&request).is_success());

        let rejected = PaymentRequest {
            credential: "wrong".to_string(),
            ..request
        };
        assert_eq!(
            service.process(&rejected).failure(),
            Some(&PaymentError::Unauthorized)
        );
        assert_eq!(
            reporter.lines(),
            vec![
                "INFO:Credit Card payment of 9.99 EUR success.",
                "ERROR:Invalid API key. Cannot process payment."
            ]
        );
    }
}
