//! The storage facade (spec.md §4.3): atomic get/put over three persisted documents.
//!
//! `Storage` is the extension point the bundled [`file::FileStorage`] implements;
//! production deployments plug in whatever medium they prefer (blob store,
//! config-map-like store) behind the same trait, mirroring the capability-trait
//! discipline in spec.md §9's Design Notes.

#[cfg(feature = "file-storage")]
pub mod file;

use std::future::Future;

use crate::error::AdapterError;
use crate::model::{Archive, Cache, CspConfig};

/// Persists the three documents the control loop owns.
///
/// A document is never observed partially written. Failure to save `cache` is
/// recoverable (spec.md §4.3: in-memory state continues); failure to save `csp_config`
/// is logged only, since csp-config cannot report its own write failure.
pub trait Storage: Send + Sync {
    fn get_cache(&self) -> impl Future<Output = Result<Option<Cache>, AdapterError>> + Send;
    fn save_cache(&self, cache: &Cache) -> impl Future<Output = Result<(), AdapterError>> + Send;

    fn get_csp_config(&self) -> impl Future<Output = Result<Option<CspConfig>, AdapterError>> + Send;
    fn save_csp_config(&self, config: &CspConfig) -> impl Future<Output = Result<(), AdapterError>> + Send;

    fn get_archive(&self) -> impl Future<Output = Result<Archive, AdapterError>> + Send;
    fn save_archive(&self, archive: &Archive) -> impl Future<Output = Result<(), AdapterError>> + Send;
}
