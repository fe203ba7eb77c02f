//! HTTP endpoints of the payment server.
//!
//! - `POST /api/v1/pay/` - dispatch one payment, credential in `Authorization`
//! - `GET /api/v1/pay/` - description of the pay endpoint
//! - `GET /api/v1/methods` - registered payment method identifiers
//! - `GET /health` - liveness check
//!
//! Dispatch outcomes map to status codes: success `200`, bad credential `401`,
//! unknown method or malformed body `400`, strategy failure `502`.

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use payment_types::amount::Amount;
use payment_types::dispatcher::PaymentService;
use payment_types::error::PaymentError;
use payment_types::payment::{PaymentMethod, PaymentOutcome};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

/// Currency codes accepted on the HTTP boundary. A blank code means "use the default".
pub const ACCEPTED_CURRENCIES: [&str; 3] = ["USD", "EUR", "BTC"];

pub const PAYMENT_ACCEPTED: &str = "Payment processed successfully.";

pub fn routes() -> Router<PaymentService> {
    Router::new()
        .route("/api/v1/pay/", get(get_pay_info).post(post_pay))
        .route("/api/v1/methods", get(get_methods))
        .route("/health", get(get_health))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    fn reply(status: StatusCode, error: impl Into<String>) -> Response {
        (
            status,
            Json(ErrorResponse {
                error: error.into(),
            }),
        )
            .into_response()
    }
}

/// Body of `POST /api/v1/pay/`.
#[derive(Debug, Clone, Deserialize)]
pub struct PayRequest {
    pub method: PaymentMethod,
    pub amount: Amount,
    #[serde(default)]
    pub currency: String,
}

impl PayRequest {
    /// Upper-cased currency, `None` when blank. Rejects codes outside [`ACCEPTED_CURRENCIES`].
    fn currency(&self) -> Result<Option<String>, String> {
        let code = self.currency.trim().to_ascii_uppercase();
        if code.is_empty() {
            Ok(None)
        } else if ACCEPTED_CURRENCIES.contains(&code.as_str()) {
            Ok(Some(code))
        } else {
            Err(format!(
                "Unsupported currency: {}. Expected one of {}",
                self.currency,
                ACCEPTED_CURRENCIES.join(", ")
            ))
        }
    }
}

/// Credential from the `Authorization` header, with an optional `Bearer ` prefix.
fn credential(headers: &HeaderMap) -> String {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.strip_prefix("Bearer ").unwrap_or(value).trim())
        .unwrap_or_default()
        .to_string()
}

/// `GET /api/v1/pay/`: machine-readable description of the pay endpoint.
#[instrument(skip_all)]
pub async fn get_pay_info(State(service): State<PaymentService>) -> impl IntoResponse {
    Json(json!({
        "endpoint": "/api/v1/pay/",
        "description": "POST to process a payment",
        "headers": {
            "Authorization": "API key",
        },
        "body": {
            "method": service.registry().identifiers(),
            "amount": "positive number",
            "currency": ACCEPTED_CURRENCIES,
        },
        "defaultCurrency": service.default_currency().as_str(),
    }))
}

#[instrument(skip_all)]
pub async fn get_methods(State(service): State<PaymentService>) -> impl IntoResponse {
    Json(json!({ "methods": service.registry().identifiers() }))
}

pub async fn get_health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// `POST /api/v1/pay/`: validates the body, dispatches and maps the outcome.
#[instrument(skip_all)]
pub async fn post_pay(
    State(service): State<PaymentService>,
    headers: HeaderMap,
    body: Result<Json<PayRequest>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => {
            tracing::warn!(error = %rejection.body_text(), "Rejected payment request body");
            return ErrorResponse::reply(StatusCode::BAD_REQUEST, rejection.body_text());
        }
    };
    let currency = match body.currency() {
        Ok(currency) => currency,
        Err(error) => return ErrorResponse::reply(StatusCode::BAD_REQUEST, error),
    };

    let dispatcher = service.dispatcher(credential(&headers));
    let outcome = dispatcher.process_payment(body.method.as_str(), body.amount, currency.as_deref());
    match outcome {
        PaymentOutcome::Success { .. } => {
            (StatusCode::OK, Json(json!({ "status": PAYMENT_ACCEPTED }))).into_response()
        }
        PaymentOutcome::Failure { reason } => {
            let status = match reason {
                PaymentError::Unauthorized => StatusCode::UNAUTHORIZED,
                PaymentError::UnknownMethod(_) => StatusCode::BAD_REQUEST,
                PaymentError::ProcessingFailed(_) => StatusCode::BAD_GATEWAY,
            };
            ErrorResponse::reply(status, reason.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use payment_types::credential::StaticCredential;
    use payment_types::error::StrategyError;
    use payment_types::payment::{Currency, Settlement};
    use payment_types::report::{MemoryReporter, ReportLevel};
    use payment_types::strategy::{PaymentStrategy, StrategyRegistry};
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;

    const API_KEY: &str = "valid_api_key";

    fn service(reporter: Arc<MemoryReporter>) -> PaymentService {
        PaymentService::new(StaticCredential::new(API_KEY), Currency::default())
            .with_reporter(reporter)
    }

    async fn call(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn pay(key: Option<&str>, body: &str) -> Request<Body> {
        let builder = Request::builder()
            .method("POST")
            .uri("/api/v1/pay/")
            .header(header::CONTENT_TYPE, "application/json");
        let builder = match key {
            Some(key) => builder.header(header::AUTHORIZATION, key),
            None => builder,
        };
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn test_pay_success() {
        let reporter = Arc::new(MemoryReporter::new());
        let app = routes().with_state(service(reporter.clone()));
        let (status, body) = call(
            app,
            pay(Some(API_KEY), r#"{"method":"credit_card","amount":100,"currency":"USD"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "Payment processed successfully." }));
        assert_eq!(
            reporter.lines(),
            vec!["INFO:Credit Card payment of 100.00 USD success."]
        );
    }

    #[tokio::test]
    async fn test_pay_bearer_prefix_and_blank_currency_uses_default() {
        let reporter = Arc::new(MemoryReporter::new());
        let service = PaymentService::new(StaticCredential::new(API_KEY), Currency::parse("eur").unwrap())
            .with_reporter(reporter.clone());
        let app = routes().with_state(service);
        let (status, _) = call(
            app,
            pay(
                Some("Bearer valid_api_key"),
                r#"{"method":"paypal","amount":50,"currency":""}"#,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(reporter.contains(ReportLevel::Info, "PayPal payment of 50.00 EUR success."));
    }

    #[tokio::test]
    async fn test_pay_bad_key_is_unauthorized() {
        let reporter = Arc::new(MemoryReporter::new());
        let app = routes().with_state(service(reporter.clone()));
        let (status, body) = call(
            app,
            pay(Some("invalid_key"), r#"{"method":"crypto","amount":0.5,"currency":"BTC"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid API key. Cannot process payment.");
        assert_eq!(
            reporter.lines(),
            vec!["ERROR:Invalid API key. Cannot process payment."]
        );

        let app = routes().with_state(service(reporter));
        let (status, _) = call(app, pay(None, r#"{"method":"crypto","amount":1}"#)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_pay_invalid_body_is_bad_request() {
        let reporter = Arc::new(MemoryReporter::new());
        for body in [
            r#"{"method":"cash","amount":10}"#,
            r#"{"method":"paypal","amount":-5}"#,
            r#"{"method":"paypal"}"#,
            r#"not json"#,
            r#"{"method":"paypal","amount":5,"currency":"JPY"}"#,
        ] {
            let app = routes().with_state(service(reporter.clone()));
            let (status, response) = call(app, pay(Some(API_KEY), body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "body: {body}");
            assert!(response["error"].is_string(), "body: {body}");
        }
        // Nothing reached the dispatcher.
        assert!(reporter.is_empty());
    }

    struct Declining;

    impl PaymentStrategy for Declining {
        fn label(&self) -> &'static str {
            "Declining"
        }

        fn process(&self, _amount: &Amount, _currency: &Currency) -> Result<Settlement, StrategyError> {
            Err(StrategyError::new("card declined"))
        }
    }

    #[tokio::test]
    async fn test_pay_strategy_failure_is_bad_gateway() {
        let reporter = Arc::new(MemoryReporter::new());
        let registry = StrategyRegistry::builtin().and_register("credit_card", Declining);
        let service = service(reporter.clone()).with_registry(registry);
        let app = routes().with_state(service);
        let (status, body) = call(
            app,
            pay(Some(API_KEY), r#"{"method":"credit_card","amount":10}"#),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], "card declined");
        assert_eq!(reporter.lines(), vec!["ERROR:card declined"]);
    }

    #[tokio::test]
    async fn test_discovery_endpoints() {
        let reporter = Arc::new(MemoryReporter::new());
        let request = |uri: &str| Request::builder().uri(uri).body(Body::empty()).unwrap();

        let (status, body) = call(routes().with_state(service(reporter.clone())), request("/api/v1/methods")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "methods": ["credit_card", "crypto", "paypal"] }));

        let (status, body) = call(routes().with_state(service(reporter.clone())), request("/api/v1/pay/")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["endpoint"], "/api/v1/pay/");
        assert_eq!(body["defaultCurrency"], "USD");

        let (status, body) = call(routes().with_state(service(reporter)), request("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "ok" }));
    }
}
