//! App-wide constants.
//!
//! Centralises the environment variable names, the test source name and
//! the marker setting so a rename only requires changing this file.

/// Directory name under the user config dir searched for settings files.
pub const CONFIG_DIR: &str = "kale";

/// Pseudo-setting reporting whether an override source was applied.
pub const PROPERLY_CONFIGURED: &str = "PROPERLY_CONFIGURED";

/// Source name substituted by the scoped test override.
pub const TEST_SETTINGS_SOURCE: &str = "kale.tests.test_settings";

// ── Environment variable names ──────────────────────────────────────

/// Names the override source layered over the defaults.
pub const ENV_SETTINGS_MODULE: &str = "KALE_SETTINGS_MODULE";

/// Search roots for file-backed settings sources.
pub const ENV_SETTINGS_PATH: &str = "KALE_SETTINGS_PATH";
