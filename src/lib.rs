#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

// Compile-time check: the bundled HTTP metering client needs a TLS backend.
#[cfg(all(feature = "http-csp", not(any(feature = "rustls-tls", feature = "native-tls"))))]
compile_error!(
    "feature \"http-csp\" requires a TLS backend. \
     Enable either 'rustls-tls' (recommended) or 'native-tls'. \
     Example: cargo build --features http-csp,rustls-tls"
);

pub mod aggregator;
pub mod biller;
pub mod bootstrap;
pub mod cli;
pub mod clock;
pub mod collector;
pub mod config;
pub mod dimension;
pub mod error;
pub mod heart;
pub mod hooks;
pub mod ledger;
pub mod model;
pub mod retry;
pub mod storage;

pub use config::Config;
pub use error::{AdapterError, Result};
pub use heart::Heart;

/// Tracing target for configuration loading and validation.
pub const TRACING_TARGET_CONFIG: &str = "csp_billing_adapter::config";

/// Tracing target for the control loop (the "heart") and its state transitions.
pub const TRACING_TARGET_HEART: &str = "csp_billing_adapter::heart";

/// Tracing target for usage collection.
pub const TRACING_TARGET_COLLECTOR: &str = "csp_billing_adapter::collector";

/// Tracing target for metering/billing calls.
pub const TRACING_TARGET_BILLER: &str = "csp_billing_adapter::biller";

/// Tracing target for storage reads and writes.
pub const TRACING_TARGET_STORAGE: &str = "csp_billing_adapter::storage";
