//! Test hooks that point a registry at the built-in test settings.
//!
//! [`ScopedOverride::enter`] remembers the current source name, substitutes
//! [`TEST_SETTINGS_SOURCE`] and re-initializes. Leaving the scope (through
//! [`ScopedOverride::exit`] or by dropping the guard) removes the
//! substitution and re-initializes again, so the variable reads exactly as
//! it did before: the prior name, unset, or whatever the real environment
//! holds by then.
//!
//! The substitution goes through the registry's [`Env`](crate::env::Env)
//! overlay, not the process environment. It is still process-wide for the
//! global registry: do not run scoped overrides concurrently with other
//! initialization.

use super::registry::{self, SettingsRegistry};
use crate::constants::TEST_SETTINGS_SOURCE;

/// Guard holding a registry on the test settings source.
#[must_use = "the override is reverted as soon as the guard is dropped"]
#[derive(Debug)]
pub struct ScopedOverride<'a> {
    registry: &'a SettingsRegistry,
    prior: Option<String>,
    prior_entry: Option<Option<String>>,
    active: bool,
}

impl<'a> ScopedOverride<'a> {
    /// Switch `registry` to the test settings source.
    pub fn enter(registry: &'a SettingsRegistry) -> Self {
        Self::enter_with(registry, TEST_SETTINGS_SOURCE)
    }

    /// Switch `registry` to an arbitrary source for the guard's lifetime.
    pub fn enter_with(registry: &'a SettingsRegistry, source: &str) -> Self {
        let env = registry.env();
        let prior = env.var(registry.env_var()).ok();
        let prior_entry = env.overlay_entry(registry.env_var());
        env.set(registry.env_var(), source);
        registry.initialize();
        tracing::debug!(source, prior = prior.as_deref(), "entered scoped settings override");

        Self {
            registry,
            prior,
            prior_entry,
            active: true,
        }
    }

    /// Source name in effect before the override.
    pub fn prior(&self) -> Option<&str> {
        self.prior.as_deref()
    }

    /// Restore the prior source and re-initialize.
    pub fn exit(mut self) {
        self.restore();
    }

    fn restore(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;

        self.registry
            .env()
            .restore(self.registry.env_var(), self.prior_entry.take());
        self.registry.initialize();
        tracing::debug!("exited scoped settings override");
    }
}

impl ScopedOverride<'static> {
    /// Switch the process-wide registry to the test settings source.
    pub fn global() -> Self {
        Self::enter(registry::instance())
    }
}

impl Drop for ScopedOverride<'_> {
    fn drop(&mut self) {
        self.restore();
    }
}
