//! kale-settings — process-wide layered settings for Kale task workers.
//!
//! Settings start from a built-in default catalog and take overrides from a
//! source named by the `KALE_SETTINGS_MODULE` environment variable. A
//! missing or broken source is logged and the defaults are used, so a
//! worker always starts; check
//! [`Settings::is_properly_configured`](settings::Settings::is_properly_configured)
//! before relying on site-specific values.
//!
//! ```no_run
//! let settings = kale_settings::settings::current();
//! if settings.is_properly_configured() {
//!     let prefix: String = settings.get_as("QUEUE_PREFIX")?;
//!     println!("queue prefix: {prefix}");
//! }
//! # Ok::<(), kale_settings::settings::SettingsError>(())
//! ```

pub mod constants;
pub mod env;
pub mod settings;
