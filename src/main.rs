//! Binary entry point: wires one [`Storage`], one [`MeteringClient`], and one
//! [`AdapterHooks`] implementation together and runs the control loop (spec.md §6).
//!
//! Exit codes: `0` clean shutdown, `1` config error, `2` CSP access failure at boot, `3`
//! fatal runtime error.

use std::process::ExitCode;

use clap::Parser;
use csp_billing_adapter::biller::http::HttpMeteringClient;
use csp_billing_adapter::clock::{Clock, SystemClock};
use csp_billing_adapter::cli::Cli;
use csp_billing_adapter::config::Config;
use csp_billing_adapter::error::AdapterError;
use csp_billing_adapter::hooks::HttpAdapterHooks;
use csp_billing_adapter::retry::RetryPolicy;
use csp_billing_adapter::storage::file::FileStorage;
use csp_billing_adapter::{bootstrap, heart::Heart};

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .json()
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(target: csp_billing_adapter::TRACING_TARGET_CONFIG, error = %e, "configuration error");
            return ExitCode::from(1);
        }
    };

    let clock = SystemClock;
    let hooks = HttpAdapterHooks::new(
        std::env::var("CSP_ADAPTER_USAGE_ENDPOINT").unwrap_or_default(),
        env!("CARGO_PKG_VERSION"),
    );
    let metering = HttpMeteringClient::new(
        std::env::var("CSP_ADAPTER_METERING_URL").unwrap_or_default(),
        std::env::var("CSP_ADAPTER_METERING_API_KEY").unwrap_or_default(),
    );
    let storage = FileStorage::new(std::env::var("CSP_ADAPTER_STATE_DIR").unwrap_or_else(|_| "/var/lib/csp-billing-adapter".into()));

    let now = clock.now();
    let (cache, customer_csp_data) = match bootstrap::bootstrap(&config, &hooks, &metering, RetryPolicy::default(), now).await {
        Ok(seeded) => seeded,
        Err(e @ AdapterError::BootCspAccess(_)) => {
            tracing::error!(target: "csp_billing_adapter::bootstrap", error = %e, "CSP access check failed at boot");
            return ExitCode::from(2);
        }
        Err(e) => {
            tracing::error!(target: "csp_billing_adapter::bootstrap", error = %e, "boot failed");
            return ExitCode::from(1);
        }
    };

    if cli.dry_run_only {
        return ExitCode::SUCCESS;
    }

    let heart = Heart::new(&config, &clock, &hooks, &storage, &metering);
    match heart.run(cache, customer_csp_data, cli.once).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(_) => ExitCode::from(3),
    }
}
