use serde::Serialize;

/// Every way a single dispatch can fail.
///
/// These are terminal per call: the dispatcher reports them and wraps them in a
/// [`PaymentOutcome::Failure`](crate::payment::PaymentOutcome::Failure). None of
/// them is retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaymentError {
    /// The credential was rejected by the configured verifier.
    #[error("Invalid API key. Cannot process payment.")]
    Unauthorized,
    /// No strategy is registered under the requested identifier.
    #[error("Invalid payment method: {0}")]
    UnknownMethod(String),
    /// The strategy ran and failed; carries the strategy's own message.
    #[error("{0}")]
    ProcessingFailed(String),
}

impl Serialize for PaymentError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

/// Failure raised from inside a [`PaymentStrategy`](crate::strategy::PaymentStrategy).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct StrategyError {
    message: String,
}

impl StrategyError {
    pub fn new<M: Into<String>>(message: M) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("no strategy registered for {0}")]
    NotFound(String),
}

impl From<RegistryError> for PaymentError {
    fn from(value: RegistryError) -> Self {
        match value {
            RegistryError::NotFound(method) => PaymentError::UnknownMethod(method),
        }
    }
}

impl From<StrategyError> for PaymentError {
    fn from(value: StrategyError) -> Self {
        PaymentError::ProcessingFailed(value.message)
    }
}
