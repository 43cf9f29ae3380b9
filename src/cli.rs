//! Command-line surface (spec.md §6): a single binary, no subcommands.

use std::path::PathBuf;

use clap::Parser;

/// Default configuration path, used when neither `--config` nor
/// `CSP_ADAPTER_CONFIG_FILE` is set.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/csp_billing_adapter/config.yaml";

#[derive(Debug, Parser)]
#[command(name = "csp-billing-adapter", about = "CSP metered-billing adapter daemon")]
pub struct Cli {
    /// Path to the adapter's YAML configuration file.
    #[arg(long, env = "CSP_ADAPTER_CONFIG_FILE", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Run a single control-loop cycle and exit, instead of looping forever.
    #[arg(long)]
    pub once: bool,

    /// Run bootstrap's dry-run CSP access check and exit without entering the loop.
    #[arg(long)]
    pub dry_run_only: bool,
}
