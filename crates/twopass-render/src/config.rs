//! Configuration for template discovery and the render service.
//!
//! Both structs deserialize from YAML with every field optional; missing
//! fields take the defaults below.
//!
//! ```yaml
//! pool_size: 32
//! parse_always: true
//! lookup:
//!   root: site/templates
//!   ext: .html
//!   includes: includes
//!   layouts: layouts
//!   pages: pages
//! ```
//!
//! | Field | Default | Meaning |
//! |-------|---------|---------|
//! | `root` | `tmpl/` | Templates root path |
//! | `ext` | `.tmpl` | Template filename extension |
//! | `includes` | `inc/` | Includes directory (prefix mode) or suffix (suffix mode) |
//! | `layouts` | `layout/` | Layouts directory (prefix mode) or suffix (suffix mode) |
//! | `pages` | `page/` | Pages directory (prefix mode only) |
//! | `use_suffix` | `false` | Template kind is defined by a name suffix |
//! | `index` | `index` | Index page name |
//! | `def_layout` | `default` | Default layout template |
//! | `hide_prefix` | `.` | Pages with this prefix are hidden from listings |

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::LookupError;

/// How discovered files are sorted into includes, layouts and pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryMode {
    /// Three sibling directories under the root, one per namespace.
    Prefix,
    /// One tree; the namespace is chosen by a name suffix before the extension.
    Suffix,
}

/// Template lookup configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LookupConfig {
    /// Templates root path.
    pub root: PathBuf,
    /// Template filename extension, including the dot.
    pub ext: String,
    /// Includes subdirectory (prefix mode) or name suffix (suffix mode).
    pub includes: String,
    /// Layouts subdirectory (prefix mode) or name suffix (suffix mode).
    pub layouts: String,
    /// Pages subdirectory. Unused in suffix mode.
    pub pages: String,
    /// Select suffix mode instead of prefix mode.
    pub use_suffix: bool,
    /// Index page name, collapsed to its directory.
    pub index: String,
    /// Name of the layout used when a requested one is missing.
    pub def_layout: String,
    /// Pages whose name (or any path segment) starts with this are hidden.
    pub hide_prefix: String,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("tmpl/"),
            ext: ".tmpl".to_string(),
            includes: "inc/".to_string(),
            layouts: "layout/".to_string(),
            pages: "page/".to_string(),
            use_suffix: false,
            index: "index".to_string(),
            def_layout: "default".to_string(),
            hide_prefix: ".".to_string(),
        }
    }
}

impl LookupConfig {
    /// Returns the discovery mode selected by `use_suffix`.
    pub fn mode(&self) -> DiscoveryMode {
        if self.use_suffix {
            DiscoveryMode::Suffix
        } else {
            DiscoveryMode::Prefix
        }
    }

    /// Parses a lookup configuration from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Loads a lookup configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LookupError> {
        load_yaml(path.as_ref())
    }
}

/// Render service configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    /// Number of idle render buffers kept for reuse.
    pub pool_size: usize,
    /// Recompile the requested page and layout on every render.
    pub parse_always: bool,
    /// HTML-escape every template's output expressions.
    pub auto_escape: bool,
    /// Template discovery settings.
    pub lookup: LookupConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            pool_size: 64,
            parse_always: false,
            auto_escape: false,
            lookup: LookupConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Parses a service configuration from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Loads a service configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LookupError> {
        load_yaml(path.as_ref())
    }
}

fn load_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, LookupError> {
    let content = std::fs::read_to_string(path).map_err(|e| LookupError::Config {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    serde_yaml::from_str(&content).map_err(|e| LookupError::Config {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
