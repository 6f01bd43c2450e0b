//! Settings snapshot and merge logic.
//!
//! Layering (highest to lowest):
//! 1. The override source named by `KALE_SETTINGS_MODULE`
//! 2. The default catalog
//!
//! Every load builds a fresh [`Settings`] from scratch, so a key supplied by
//! a previous override source never survives into a later snapshot.

use std::sync::Arc;

use indexmap::IndexMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use super::catalog::Catalog;
use super::defaults;
use super::resolver::{ChainResolver, OverrideResolver, ResolveError};
use crate::constants::{ENV_SETTINGS_MODULE, PROPERLY_CONFIGURED};
use crate::env::Env;

/// Errors while loading or reading settings.
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("settings cannot be loaded because environment variable {var} is undefined")]
    MissingDesignator { var: String },

    #[error("could not load settings \"{name}\": {source}")]
    Unresolvable {
        name: String,
        source: ResolveError,
    },

    #[error("setting {key} is not configured")]
    MissingSetting { key: String },

    #[error("setting {key} has an unexpected type: {source}")]
    InvalidValue {
        key: String,
        source: serde_json::Error,
    },
}

/// A merged, immutable settings snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Settings {
    #[serde(flatten)]
    values: IndexMap<String, Value>,
    #[serde(rename = "PROPERLY_CONFIGURED", skip_serializing_if = "std::ops::Not::not")]
    properly_configured: bool,
    #[serde(skip)]
    source: Option<String>,
}

impl Settings {
    /// Look up a setting. `PROPERLY_CONFIGURED` reads as `true` once an
    /// override source has been applied and is absent otherwise.
    pub fn get(&self, key: &str) -> Option<&Value> {
        if key == PROPERLY_CONFIGURED {
            static CONFIGURED: Value = Value::Bool(true);
            return self.properly_configured.then_some(&CONFIGURED);
        }
        self.values.get(key)
    }

    /// Look up a setting that must be present.
    pub fn require(&self, key: &str) -> Result<&Value, SettingsError> {
        self.get(key).ok_or_else(|| SettingsError::MissingSetting {
            key: key.to_string(),
        })
    }

    /// Deserialize a setting into `T`.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<T, SettingsError> {
        let value = self.require(key)?.clone();
        serde_json::from_value(value).map_err(|e| SettingsError::InvalidValue {
            key: key.to_string(),
            source: e,
        })
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Whether an override source was resolved and applied.
    pub fn is_properly_configured(&self) -> bool {
        self.properly_configured
    }

    /// Name of the override source applied, if any.
    pub fn source_name(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// Merged settings in layering order. The marker is not included.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Copy the merged settings out as a catalog.
    pub fn to_catalog(&self) -> Catalog {
        self.values.clone().into()
    }

    /// Layer every setting in `catalog` over the current values.
    fn layer(&mut self, catalog: &Catalog) {
        for (key, value) in catalog.settings() {
            if key == PROPERLY_CONFIGURED {
                tracing::debug!(key, "ignoring reserved setting name in catalog");
                continue;
            }
            self.values.insert(key.to_string(), value.clone());
        }
    }
}

/// Builds [`Settings`] from a default catalog, an override resolver and
/// the environment variable naming the override source.
pub struct SettingsLoader {
    defaults: Catalog,
    resolver: Arc<dyn OverrideResolver>,
    env: Env,
    env_var: String,
}

impl SettingsLoader {
    /// Create a loader over explicit collaborators, reading the source
    /// name from `KALE_SETTINGS_MODULE`.
    pub fn new(defaults: Catalog, resolver: impl OverrideResolver + 'static, env: Env) -> Self {
        Self {
            defaults,
            resolver: Arc::new(resolver),
            env,
            env_var: ENV_SETTINGS_MODULE.to_string(),
        }
    }

    /// The loader used by the process-wide registry.
    pub fn standard() -> Self {
        let env = Env::real();
        let resolver = ChainResolver::standard(&env);
        Self::new(defaults::catalog().clone(), resolver, env)
    }

    /// Read the source name from `var` instead of `KALE_SETTINGS_MODULE`.
    pub fn with_env_var(mut self, var: impl Into<String>) -> Self {
        self.env_var = var.into();
        self
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    pub fn env_var(&self) -> &str {
        &self.env_var
    }

    /// Settings containing only the defaults.
    pub fn defaults_only(&self) -> Settings {
        let mut settings = Settings::default();
        settings.layer(&self.defaults);
        settings
    }

    /// Merge the defaults with the override source, failing if the source
    /// is not designated or cannot be resolved.
    pub fn load(&self) -> Result<Settings, SettingsError> {
        let mut settings = self.defaults_only();

        let name = match self.env.var(&self.env_var) {
            Ok(name) if !name.is_empty() => name,
            _ => {
                return Err(SettingsError::MissingDesignator {
                    var: self.env_var.clone(),
                });
            }
        };

        let overrides = self
            .resolver
            .resolve(&name)
            .map_err(|e| SettingsError::Unresolvable {
                name: name.clone(),
                source: e,
            })?;

        settings.layer(&overrides);
        settings.properly_configured = true;
        settings.source = Some(name);
        Ok(settings)
    }

    /// Like [`load`](Self::load), but logs failures and falls back to the
    /// defaults instead of returning them.
    pub fn load_or_defaults(&self) -> Settings {
        match self.load() {
            Ok(settings) => {
                tracing::info!(
                    source = settings.source_name().unwrap_or_default(),
                    settings = settings.len(),
                    "settings loaded"
                );
                settings
            }
            Err(e @ SettingsError::MissingDesignator { .. }) => {
                tracing::error!(var = %self.env_var, "{e}");
                self.defaults_only()
            }
            Err(e) => {
                tracing::error!(error = %e, "falling back to default settings");
                self.defaults_only()
            }
        }
    }
}

impl std::fmt::Debug for SettingsLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsLoader")
            .field("defaults", &self.defaults.len())
            .field("env_var", &self.env_var)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::resolver::StaticResolver;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn ab_defaults() -> Catalog {
        Catalog::new().with("A", 1).with("B", 2)
    }

    fn loader(env: Env) -> SettingsLoader {
        let resolver =
            StaticResolver::new().with_source("prod", Catalog::new().with("B", 99).with("C", 3));
        SettingsLoader::new(ab_defaults(), resolver, env)
    }

    fn no_env() -> Env {
        Env::mock(Vec::<(&str, &str)>::new())
    }

    #[test]
    fn unset_designator_yields_defaults_only() {
        let settings = loader(no_env()).load_or_defaults();
        assert_eq!(settings.to_catalog(), ab_defaults());
        assert!(!settings.is_properly_configured());
        assert!(settings.get(PROPERLY_CONFIGURED).is_none());
        assert!(settings.source_name().is_none());
    }

    #[test]
    fn unset_designator_is_an_error_for_strict_load() {
        let err = loader(no_env()).load().unwrap_err();
        assert!(matches!(err, SettingsError::MissingDesignator { ref var } if var == ENV_SETTINGS_MODULE));
        assert!(err.to_string().contains(ENV_SETTINGS_MODULE));
    }

    #[test]
    fn empty_designator_counts_as_unset() {
        let env = Env::mock([(ENV_SETTINGS_MODULE, "")]);
        assert!(matches!(
            loader(env).load(),
            Err(SettingsError::MissingDesignator { .. })
        ));
    }

    #[test]
    fn override_layers_over_defaults() {
        let env = Env::mock([(ENV_SETTINGS_MODULE, "prod")]);
        let settings = loader(env).load_or_defaults();

        let expected = Catalog::new().with("A", 1).with("B", 99).with("C", 3);
        assert_eq!(settings.to_catalog(), expected);
        assert!(settings.is_properly_configured());
        assert_eq!(settings.get(PROPERLY_CONFIGURED), Some(&json!(true)));
        assert_eq!(settings.source_name(), Some("prod"));
    }

    #[test]
    fn unresolvable_source_falls_back_to_defaults() {
        let env = Env::mock([(ENV_SETTINGS_MODULE, "nowhere")]);
        let loader = loader(env);

        let err = loader.load().unwrap_err();
        assert!(matches!(err, SettingsError::Unresolvable { ref name, .. } if name == "nowhere"));
        assert!(err.to_string().contains("could not load settings \"nowhere\""));

        assert_eq!(loader.load_or_defaults(), loader.defaults_only());
    }

    #[test]
    fn non_setting_names_are_skipped() {
        let defaults = ab_defaults().with("lowercase", 0);
        let resolver = StaticResolver::new().with_source(
            "mixed",
            Catalog::new().with("__doc__", "x").with("D", 4).with("Camel", 5),
        );
        let env = Env::mock([(ENV_SETTINGS_MODULE, "mixed")]);
        let settings = SettingsLoader::new(defaults, resolver, env).load().unwrap();

        let keys: Vec<_> = settings.keys().collect();
        assert_eq!(keys, vec!["A", "B", "D"]);
    }

    #[test]
    fn catalog_cannot_fake_the_marker() {
        let defaults = ab_defaults().with(PROPERLY_CONFIGURED, true);
        let settings = SettingsLoader::new(defaults, StaticResolver::new(), no_env()).load_or_defaults();
        assert!(!settings.is_properly_configured());
        assert!(!settings.contains(PROPERLY_CONFIGURED));
    }

    #[test]
    fn loading_is_idempotent() {
        let loader = loader(Env::mock([(ENV_SETTINGS_MODULE, "prod")]));
        assert_eq!(loader.load_or_defaults(), loader.load_or_defaults());
    }

    #[test]
    fn custom_env_var() {
        let env = Env::mock([("MYAPP_SETTINGS", "prod")]);
        let settings = loader(env).with_env_var("MYAPP_SETTINGS").load().unwrap();
        assert_eq!(settings.get("C"), Some(&json!(3)));
    }

    #[test]
    fn require_reports_missing_key() {
        let settings = loader(no_env()).load_or_defaults();
        assert_eq!(settings.require("A").unwrap(), &json!(1));

        let err = settings.require("C").unwrap_err();
        assert_eq!(err.to_string(), "setting C is not configured");
    }

    #[test]
    fn get_as_deserializes_values() {
        let settings = loader(no_env()).load_or_defaults();
        let a: u32 = settings.get_as("A").unwrap();
        assert_eq!(a, 1);

        let err = settings.get_as::<String>("B").unwrap_err();
        assert!(matches!(err, SettingsError::InvalidValue { ref key, .. } if key == "B"));
    }

    #[test]
    fn serializes_with_marker() {
        let env = Env::mock([(ENV_SETTINGS_MODULE, "prod")]);
        let settings = loader(env).load().unwrap();
        let dumped = serde_json::to_value(&settings).unwrap();
        assert_eq!(
            dumped,
            json!({"A": 1, "B": 99, "C": 3, "PROPERLY_CONFIGURED": true})
        );
    }

    #[test]
    fn defaults_only_dump_has_no_marker() {
        let settings = loader(no_env()).load_or_defaults();
        let dumped = serde_json::to_string(&settings).unwrap();
        assert_eq!(dumped, r#"{"A":1,"B":2}"#);
    }
}
