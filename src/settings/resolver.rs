//! Override resolution: turning a source name into a [`Catalog`].
//!
//! The registry only knows the [`OverrideResolver`] trait. Three resolvers
//! ship with the crate:
//!
//! - [`StaticResolver`] serves catalogs registered in memory.
//! - [`FileResolver`] maps dotted names such as `myapp.settings.prod` to
//!   `myapp/settings/prod.toml` (or `.json`) under a list of search roots.
//! - [`ChainResolver`] tries several resolvers in order.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde_json::Value;
use thiserror::Error;

use super::catalog::Catalog;
use super::defaults;
use crate::constants::{CONFIG_DIR, ENV_SETTINGS_PATH, TEST_SETTINGS_SOURCE};
use crate::env::Env;

/// Errors while resolving an override source.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("settings source '{name}' not found (searched: {})", display_paths(.searched))]
    NotFound { name: String, searched: Vec<PathBuf> },

    #[error("failed to read settings file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse settings file {path}: {source}")]
    ParseToml {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("failed to parse settings file {path}: {source}")]
    ParseJson {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("settings file {path} must contain a flat table of settings")]
    NotATable { path: PathBuf },
}

impl ResolveError {
    /// Returns `true` if the source simply does not exist, as opposed to
    /// existing but failing to load.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ResolveError::NotFound { .. })
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return "nothing".to_string();
    }
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Capability that turns a source name into a catalog.
pub trait OverrideResolver: Send + Sync {
    fn resolve(&self, name: &str) -> Result<Catalog, ResolveError>;
}

impl<R: OverrideResolver + ?Sized> OverrideResolver for Box<R> {
    fn resolve(&self, name: &str) -> Result<Catalog, ResolveError> {
        (**self).resolve(name)
    }
}

/// In-memory resolver over a fixed set of named catalogs.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    sources: HashMap<String, Catalog>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `catalog` under `name`, replacing any previous entry.
    pub fn with_source(mut self, name: impl Into<String>, catalog: Catalog) -> Self {
        self.sources.insert(name.into(), catalog);
        self
    }

    /// Resolver serving the built-in test settings.
    pub fn builtin() -> Self {
        Self::new().with_source(TEST_SETTINGS_SOURCE, defaults::test_catalog().clone())
    }
}

impl OverrideResolver for StaticResolver {
    fn resolve(&self, name: &str) -> Result<Catalog, ResolveError> {
        self.sources
            .get(name)
            .cloned()
            .ok_or_else(|| ResolveError::NotFound {
                name: name.to_string(),
                searched: Vec::new(),
            })
    }
}

/// Supported settings file formats, in lookup preference order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Toml,
    Json,
}

impl SourceFormat {
    pub const ALL: [SourceFormat; 2] = [SourceFormat::Toml, SourceFormat::Json];

    pub fn extension(self) -> &'static str {
        match self {
            SourceFormat::Toml => "toml",
            SourceFormat::Json => "json",
        }
    }

    /// Detect the format from a path's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        Self::ALL.into_iter().find(|f| f.extension() == ext)
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Resolves source names to settings files under a list of search roots.
#[derive(Debug, Clone)]
pub struct FileResolver {
    roots: SearchRoots,
}

#[derive(Debug, Clone)]
enum SearchRoots {
    Fixed(Vec<PathBuf>),
    /// Read from `KALE_SETTINGS_PATH` on every lookup.
    FromEnv(Env),
}

impl FileResolver {
    /// Create a resolver searching `roots` in order.
    pub fn new(roots: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            roots: SearchRoots::Fixed(roots.into_iter().map(Into::into).collect()),
        }
    }

    /// Take the search roots from `KALE_SETTINGS_PATH` at lookup time,
    /// falling back to the current directory and the user config directory.
    pub fn from_env(env: &Env) -> Self {
        Self {
            roots: SearchRoots::FromEnv(env.clone()),
        }
    }

    /// Search roots in effect right now.
    pub fn roots(&self) -> Vec<PathBuf> {
        let env = match &self.roots {
            SearchRoots::Fixed(roots) => return roots.clone(),
            SearchRoots::FromEnv(env) => env,
        };

        if let Ok(paths) = env.var(ENV_SETTINGS_PATH) {
            if !paths.is_empty() {
                return std::env::split_paths(&paths).collect();
            }
        }

        let mut roots = vec![PathBuf::from(".")];
        if let Some(dir) = dirs::config_dir() {
            roots.push(dir.join(CONFIG_DIR));
        }
        roots
    }

    /// Candidate files for `name`, in lookup order.
    fn candidates(&self, name: &str) -> Vec<PathBuf> {
        // A literal path to a settings file.
        let literal = Path::new(name);
        if SourceFormat::from_path(literal).is_some() {
            if literal.is_absolute() {
                return vec![literal.to_path_buf()];
            }
            return self.roots().iter().map(|root| root.join(literal)).collect();
        }

        let relative: PathBuf = name.split('.').collect();
        let relative = &relative;
        self.roots()
            .iter()
            .flat_map(|root| {
                SourceFormat::ALL
                    .into_iter()
                    .map(move |format| root.join(relative).with_extension(format.extension()))
            })
            .collect()
    }
}

impl OverrideResolver for FileResolver {
    fn resolve(&self, name: &str) -> Result<Catalog, ResolveError> {
        let candidates = self.candidates(name);
        if let Some(path) = candidates.iter().find(|p| p.is_file()) {
            return load_file(path);
        }
        Err(ResolveError::NotFound {
            name: name.to_string(),
            searched: candidates,
        })
    }
}

/// Load a flat settings file, choosing the parser by extension.
pub fn load_file(path: &Path) -> Result<Catalog, ResolveError> {
    let content = std::fs::read_to_string(path).map_err(|e| ResolveError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;

    let value: Value = match SourceFormat::from_path(path) {
        Some(SourceFormat::Json) => {
            serde_json::from_str(&content).map_err(|e| ResolveError::ParseJson {
                path: path.to_path_buf(),
                source: e,
            })?
        }
        // Anything without a recognised extension is read as TOML.
        Some(SourceFormat::Toml) | None => {
            let table: toml::Table =
                toml::from_str(&content).map_err(|e| ResolveError::ParseToml {
                    path: path.to_path_buf(),
                    source: e,
                })?;
            toml_to_json(toml::Value::Table(table))
        }
    };

    match value {
        Value::Object(map) => Ok(map.into_iter().collect::<IndexMap<_, _>>().into()),
        _ => Err(ResolveError::NotATable {
            path: path.to_path_buf(),
        }),
    }
}

/// Convert a TOML value to JSON. Datetimes become their TOML string form.
fn toml_to_json(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::from(i),
        // Non-finite floats have no JSON form and become null.
        toml::Value::Float(f) => Value::from(f),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::Array(items.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}

/// Tries resolvers in order until one finds the source.
///
/// A [`ResolveError::NotFound`] falls through to the next resolver; any
/// other error means the source exists but is broken and stops the chain.
#[derive(Default)]
pub struct ChainResolver {
    resolvers: Vec<Box<dyn OverrideResolver>>,
}

impl ChainResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, resolver: impl OverrideResolver + 'static) -> Self {
        self.resolvers.push(Box::new(resolver));
        self
    }

    /// The resolver used by the process-wide registry: the built-in test
    /// source, then settings files found through `env`.
    pub fn standard(env: &Env) -> Self {
        Self::new()
            .with(StaticResolver::builtin())
            .with(FileResolver::from_env(env))
    }
}

impl OverrideResolver for ChainResolver {
    fn resolve(&self, name: &str) -> Result<Catalog, ResolveError> {
        let mut searched = Vec::new();
        for resolver in &self.resolvers {
            match resolver.resolve(name) {
                Ok(catalog) => return Ok(catalog),
                Err(ResolveError::NotFound { searched: paths, .. }) => searched.extend(paths),
                Err(e) => return Err(e),
            }
        }
        Err(ResolveError::NotFound {
            name: name.to_string(),
            searched,
        })
    }
}

impl fmt::Debug for ChainResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainResolver")
            .field("resolvers", &self.resolvers.len())
            .finish()
    }
}
