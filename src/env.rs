//! Environment variable abstraction for testability.
//!
//! Production code uses [`Env::real()`] which delegates to [`std::env::var`].
//! Tests use [`Env::mock()`] backed by a `HashMap`, eliminating the need for
//! `unsafe` calls to [`std::env::set_var`] / [`std::env::remove_var`].
//!
//! Both flavours carry an overlay that [`Env::set`] and [`Env::unset`]
//! write to. Lookups consult the overlay first, so a variable can be
//! substituted or hidden for the whole process without touching the real
//! environment. Clones share the same overlay.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Environment variable reader.
///
/// Wraps lookups so that production code hits `std::env` while tests
/// can supply a controlled set of values.
#[derive(Clone, Debug)]
pub struct Env {
    vars: Option<HashMap<String, String>>,
    overlay: Arc<RwLock<HashMap<String, Option<String>>>>,
}

impl Env {
    /// Create an `Env` that reads from the real process environment.
    pub fn real() -> Self {
        Self {
            vars: None,
            overlay: Arc::default(),
        }
    }

    /// Create an `Env` backed by explicit key-value pairs.
    pub fn mock(vars: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>) -> Self {
        Self {
            vars: Some(
                vars.into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
            overlay: Arc::default(),
        }
    }

    /// Look up an environment variable by name.
    pub fn var(&self, name: &str) -> Result<String, std::env::VarError> {
        let overlay = self.overlay.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = overlay.get(name) {
            return entry.clone().ok_or(std::env::VarError::NotPresent);
        }
        drop(overlay);

        match &self.vars {
            Some(map) => map.get(name).cloned().ok_or(std::env::VarError::NotPresent),
            None => std::env::var(name),
        }
    }

    /// Returns `true` if the variable is present.
    pub fn is_set(&self, name: &str) -> bool {
        self.var(name).is_ok()
    }

    /// Substitute a value for `name`, shadowing the underlying environment.
    pub fn set(&self, name: impl Into<String>, value: impl Into<String>) {
        self.overlay
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), Some(value.into()));
    }

    /// Hide `name`, making it read as unset regardless of the underlying
    /// environment.
    pub fn unset(&self, name: impl Into<String>) {
        self.overlay
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), None);
    }

    /// Drop any substitution for `name` so reads fall through to the
    /// underlying environment again.
    pub fn clear(&self, name: &str) {
        self.overlay
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name);
    }

    /// Current overlay entry for `name`: `None` if not substituted,
    /// `Some(None)` if hidden, `Some(Some(v))` if set to `v`.
    pub fn overlay_entry(&self, name: &str) -> Option<Option<String>> {
        self.overlay
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Put back an entry previously returned by
    /// [`overlay_entry`](Self::overlay_entry).
    pub fn restore(&self, name: impl Into<String>, entry: Option<Option<String>>) {
        let name = name.into();
        match entry {
            Some(value) => {
                self.overlay
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(name, value);
            }
            None => self.clear(&name),
        }
    }
}

impl Default for Env {
    fn default() -> Self {
        Self::real()
    }
}
