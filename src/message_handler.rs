//! Dispatches payment requests that arrive over the reconnecting client.
//!
//! Inbound text shaped like a payment request is processed through the shared
//! [`PaymentService`] and answered on the same session with the serialized
//! [`PaymentOutcome`](payment_types::payment::PaymentOutcome). The method is
//! kept as free text so that an unregistered one is answered with a failure.
//! Anything else is logged and ignored.

use payment_types::amount::Amount;
use payment_types::dispatcher::PaymentService;
use payment_ws::{MessageHandler, SessionSender};
use serde::Deserialize;

/// Wire form of a payment request received over the client.
#[derive(Debug, Deserialize)]
struct InboundPayment {
    method: String,
    amount: Amount,
    #[serde(default)]
    currency: Option<String>,
    credential: String,
}

#[derive(Debug, Clone)]
pub struct PaymentMessageHandler {
    service: PaymentService,
}

impl PaymentMessageHandler {
    pub fn new(service: PaymentService) -> Self {
        Self { service }
    }
}

#[async_trait::async_trait]
impl MessageHandler for PaymentMessageHandler {
    async fn handle(&self, message: String, reply: &SessionSender) {
        let request = match serde_json::from_str::<InboundPayment>(&message) {
            Ok(request) => request,
            Err(e) => {
                tracing::info!(reason = %e, "Handling message: {}", message);
                return;
            }
        };

        let outcome = self
            .service
            .dispatcher(request.credential)
            .process_payment(&request.method, request.amount, request.currency.as_deref());
        let body = match serde_json::to_string(&outcome) {
            Ok(body) => body,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize payment outcome");
                return;
            }
        };
        if let Err(e) = reply.send(body).await {
            tracing::warn!(error = %e, "Could not deliver payment outcome");
        }
    }
}
