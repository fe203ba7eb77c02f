//! payment-sdk HTTP entrypoint.
//!
//! Serves payment dispatch over HTTP and, when configured, keeps a reconnecting
//! WebSocket client attached to a remote endpoint.
//!
//! Endpoints:
//! - `POST /api/v1/pay/` – Dispatch a payment (credential in `Authorization`)
//! - `GET /api/v1/pay/` – Description of the pay endpoint
//! - `GET /api/v1/methods` – Registered payment methods
//! - `GET /health` – Liveness check
//!
//! Environment:
//! - `.env` values loaded at startup
//! - `CONFIG` path to the JSON config (default `config.json`)
//! - `HOST`, `PORT` control binding address
//! - `PAYMENT_API_KEY` default credential
//! - `RUST_LOG` log filter; `OTEL_*` enable OTLP export with the `telemetry` feature

use std::process;

use payment_sdk::run;

#[tokio::main]
async fn main() {
    let result = run().await;
    if let Err(e) = result {
        eprintln!("{e}");
        process::exit(1)
    }
}
