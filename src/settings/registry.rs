//! The settings registry and the process-wide instance.
//!
//! A [`SettingsRegistry`] owns a [`SettingsLoader`] and the current
//! [`Settings`] snapshot. Re-initialization builds a complete new snapshot
//! and swaps it in, so readers holding an `Arc<Settings>` never see a
//! half-merged state.
//!
//! Initialization is not coordinated: two concurrent calls to
//! [`SettingsRegistry::initialize`] both run, and whichever finishes last
//! wins. Initialize before handing the registry to concurrent readers.

use std::sync::{Arc, LazyLock, PoisonError, RwLock};

use super::loader::{Settings, SettingsLoader};
use crate::env::Env;

static INSTANCE: LazyLock<SettingsRegistry> =
    LazyLock::new(|| SettingsRegistry::new(SettingsLoader::standard()));

/// The process-wide registry, initialized on first access.
pub fn instance() -> &'static SettingsRegistry {
    &INSTANCE
}

/// Snapshot of the process-wide settings.
pub fn current() -> Arc<Settings> {
    instance().current()
}

/// Holds the merged settings for one loader.
#[derive(Debug)]
pub struct SettingsRegistry {
    loader: SettingsLoader,
    current: RwLock<Arc<Settings>>,
}

impl SettingsRegistry {
    /// Create a registry and run the first initialization.
    pub fn new(loader: SettingsLoader) -> Self {
        let settings = loader.load_or_defaults();
        Self {
            loader,
            current: RwLock::new(Arc::new(settings)),
        }
    }

    /// Re-merge the defaults and the override source.
    ///
    /// Never fails: a missing or broken source is logged and leaves the
    /// registry holding the defaults only.
    pub fn initialize(&self) {
        tracing::debug!(env_var = self.loader.env_var(), "re-initializing settings");
        let settings = Arc::new(self.loader.load_or_defaults());
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = settings;
    }

    /// The current settings snapshot.
    pub fn current(&self) -> Arc<Settings> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Shorthand for `current().is_properly_configured()`.
    pub fn is_properly_configured(&self) -> bool {
        self.current().is_properly_configured()
    }

    /// Environment the registry reads its source name from.
    pub fn env(&self) -> &Env {
        self.loader.env()
    }

    /// Name of the variable designating the override source.
    pub fn env_var(&self) -> &str {
        self.loader.env_var()
    }
}
