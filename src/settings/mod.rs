//! Layered process-wide settings.
//!
//! Settings are the default catalog with the override source named by
//! `KALE_SETTINGS_MODULE` layered on top. The process-wide registry is
//! reached through [`instance()`]; components that want an isolated
//! registry build their own from a [`SettingsLoader`].

pub mod catalog;
pub mod defaults;
pub mod loader;
pub mod registry;
pub mod resolver;
pub mod testing;

pub use catalog::{Catalog, is_setting_name};
pub use loader::{Settings, SettingsError, SettingsLoader};
pub use registry::{SettingsRegistry, current, instance};
pub use resolver::{ChainResolver, FileResolver, OverrideResolver, ResolveError, StaticResolver};
pub use testing::ScopedOverride;
