//! Payment routing server.
//!
//! Routes payment requests to interchangeable processing strategies behind a
//! credential check, over HTTP and over a self-healing WebSocket connection.
//! The building blocks live in two library crates:
//!
//! - `payment-types` - amounts, requests, outcomes, the strategy registry and the dispatcher
//! - `payment-ws` - the reconnecting WebSocket client
//!
//! # Modules
//!
//! - [`config`] - JSON configuration with environment fallbacks
//! - [`handlers`] - HTTP endpoints (`/api/v1/pay/`, `/api/v1/methods`, `/health`)
//! - [`message_handler`] - Payment dispatch for messages received by the client
//! - [`util`] - Signal handling and telemetry
//!
//! [`run()`] wires everything together and is what the binary calls.

pub mod config;
pub mod handlers;
pub mod message_handler;
pub mod util;

mod run;

pub use run::run;
