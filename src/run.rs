use axum::Router;
use axum::http::Method;
use dotenvy::dotenv;
use payment_types::credential::StaticCredential;
use payment_types::dispatcher::PaymentService;
use payment_ws::ReconnectingClient;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors;

use crate::config::Config;
use crate::handlers;
use crate::message_handler::PaymentMessageHandler;
use crate::util::{SigDown, Telemetry};

/// Runs the payment server until SIGINT or SIGTERM.
///
/// - Loads `.env` variables and initializes logging.
/// - Serves the payment endpoints on `HOST:PORT`.
/// - If a `connection` is configured, keeps a reconnecting client attached to it
///   that dispatches inbound payment requests through the same service.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize rustls crypto provider (ring) for wss:// connections
    if rustls::crypto::CryptoProvider::install_default(rustls::crypto::ring::default_provider())
        .is_err()
    {
        tracing::debug!("rustls crypto provider already installed");
    }

    dotenv().ok();

    let telemetry = Telemetry::new()
        .with_name(env!("CARGO_PKG_NAME"))
        .with_version(env!("CARGO_PKG_VERSION"))
        .register();

    let config = Config::load()?;
    if config.api_key().is_empty() {
        tracing::warn!("No API key configured: every payment request will be rejected");
    }

    let service = PaymentService::new(
        StaticCredential::new(config.api_key()),
        config.default_currency().clone(),
    );
    tracing::info!(
        methods = ?service.registry().identifiers(),
        default_currency = %service.default_currency(),
        "Payment service ready"
    );

    let sig_down = SigDown::try_new()?;

    if let Some(connection) = config.connection() {
        let client = Arc::new(
            ReconnectingClient::new(connection.uri().clone())
                .with_policy(connection.policy())
                .with_handler(PaymentMessageHandler::new(service.clone())),
        );
        let cancel = sig_down.cancellation_token();
        sig_down.spawn(async move {
            if let Err(e) = client.connect(cancel).await {
                tracing::error!("Reconnecting client stopped: {e}");
            }
        });
    }

    let http_endpoints = Router::new()
        .merge(handlers::routes().with_state(service))
        .layer(telemetry.http_tracing())
        .layer(
            cors::CorsLayer::new()
                .allow_origin(cors::Any)
                .allow_methods([Method::GET, Method::POST])
                .allow_headers(cors::Any),
        );

    let addr = SocketAddr::new(config.host(), config.port());
    tracing::info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .inspect_err(|e| tracing::error!("Failed to bind to {}: {}", addr, e))?;

    let axum_cancellation_token = sig_down.cancellation_token();
    let axum_graceful_shutdown = async move { axum_cancellation_token.cancelled().await };
    let served = axum::serve(listener, http_endpoints)
        .with_graceful_shutdown(axum_graceful_shutdown)
        .await;

    // Stop the client as well if the server exited on its own.
    sig_down.trigger();
    sig_down.wait().await;
    served?;

    Ok(())
}
