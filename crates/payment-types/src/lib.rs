//! Core types for payment-sdk.
//!
//! This crate holds everything needed to route a payment to a processing
//! strategy without any I/O: validated amounts and currencies, the request and
//! outcome types, the strategy registry, the credential check and the
//! dispatcher that ties them together.
//!
//! # Modules
//!
//! - [`amount`] - Strictly positive decimal amounts, reported with two decimals
//! - [`credential`] - Pass/fail credential verification
//! - [`dispatcher`] - [`PaymentDispatcher`](dispatcher::PaymentDispatcher) and the shared [`PaymentService`](dispatcher::PaymentService)
//! - [`error`] - Dispatch, strategy and registry errors
//! - [`payment`] - Methods, currencies, requests and outcomes
//! - [`report`] - Injected report sink used instead of a global logger
//! - [`strategy`] - Strategy trait, built-in strategies and the registry
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use payment_types::amount::Amount;
//! use payment_types::credential::StaticCredential;
//! use payment_types::dispatcher::PaymentDispatcher;
//! use payment_types::payment::Currency;
//! use payment_types::report::MemoryReporter;
//!
//! let reporter = Arc::new(MemoryReporter::new());
//! let dispatcher = PaymentDispatcher::new("secret", Currency::default(), StaticCredential::new("secret"))
//!     .with_reporter(reporter.clone());
//! let outcome = dispatcher.process_payment("paypal", Amount::try_from(5.0).unwrap(), None);
//! assert!(outcome.is_success());
//! assert_eq!(reporter.lines(), vec!["INFO:PayPal payment of 5.00 USD success."]);
//! ```

pub mod amount;
pub mod credential;
pub mod dispatcher;
pub mod error;
pub mod payment;
pub mod report;
pub mod strategy;
