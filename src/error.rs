//! Error types for the CSP billing adapter.
//!
//! This module defines [`AdapterError`], the single error type threaded through
//! bootstrap and the control loop. Most runtime failures never reach this type directly —
//! they are classified and folded into the [`crate::ledger::ErrorLedger`] instead, per the
//! error-handling design (spec.md §7). Only configuration errors and the boot-time CSP
//! dry-run failure propagate as a fatal `Result::Err` out of `main`.

use thiserror::Error;

/// Error type for adapter operations.
///
/// This enum represents the error kinds enumerated in spec.md §7. Most variants are
/// recoverable at the control-loop level (the loop logs them into the error ledger and
/// continues); [`AdapterError::Config`] and [`AdapterError::BootCspAccess`] are fatal and
/// only ever surface during [`crate::bootstrap::bootstrap`].
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Missing or invalid configuration field, or an incompatible `version`. Fatal at
    /// boot; never recurs mid-run.
    #[error("configuration error: {0}")]
    Config(String),

    /// The boot-time dry-run meter call failed after exhausting retries. Fatal.
    #[error("CSP access check failed: {0}")]
    BootCspAccess(String),

    /// Usage collection failed after exhausting retries. Recoverable: the cycle proceeds
    /// without a new sample.
    #[error("usage data retrieval failed: {0}")]
    Usage(String),

    /// A metering call failed. Recoverable: usage records are retained for the next
    /// attempt.
    #[error("metering call failed: {0}")]
    Metering(String),

    /// Failed to persist the cache document. Recoverable: in-memory state continues.
    #[error("cache storage error: {0}")]
    StorageCache(String),

    /// Failed to persist the csp-config document. Logged only — csp-config cannot report
    /// its own write failure.
    #[error("csp-config storage error: {0}")]
    StorageCspConfig(String),

    /// Failed to read a persisted document.
    #[error("storage read error: {0}")]
    StorageRead(String),

    /// An exception that does not fit any other classification. Ledger is updated, a
    /// best-effort persist is attempted, then the process exits.
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

/// Result type for adapter operations.
pub type Result<T, E = AdapterError> = std::result::Result<T, E>;
