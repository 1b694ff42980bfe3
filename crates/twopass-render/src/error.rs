//! Error types for discovery, compilation and rendering.
//!
//! Two enums cover the whole crate:
//!
//! - [`LookupError`]: failures while walking the template tree or reading a
//!   template file. These are fatal to initialization.
//! - [`RenderError`]: everything the [`TemplateService`](crate::TemplateService)
//!   can report. Discovery and compile errors come back from `parse()`;
//!   content-phase errors are recorded on the page metadata; layout-phase
//!   errors are returned from `render()`.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Error raised while discovering or reading template files.
#[derive(Debug, Error)]
pub enum LookupError {
    /// Walking a namespace root failed (missing directory, unreadable entry).
    #[error("{what} walk failed ({}): {source}", root.display())]
    Walk {
        /// Which namespace was being walked (`includes`, `layouts`, `pages`
        /// or `templates` in suffix mode).
        what: &'static str,
        /// The directory the walk started from.
        root: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Reading a discovered file failed.
    #[error("read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A template file is not valid UTF-8.
    #[error("read {}: template is not valid UTF-8", path.display())]
    InvalidUtf8 { path: PathBuf },

    /// The configured default layout was not among the discovered layouts.
    #[error("default layout ({0}) does not exist")]
    MissingDefaultLayout(String),

    /// A configuration file could not be loaded.
    #[error("config {}: {message}", path.display())]
    Config { path: PathBuf, message: String },
}

/// Error type for template compilation and rendering.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Template discovery or file access failed.
    #[error(transparent)]
    Lookup(#[from] LookupError),

    /// Template syntax error in an include, layout or page.
    #[error("parse template {name}: {source}")]
    Parse {
        name: String,
        #[source]
        source: minijinja::Error,
    },

    /// The requested page is not among the discovered pages.
    #[error("The page {0} does not exist.")]
    PageNotFound(String),

    /// The requested layout is not among the discovered layouts.
    #[error("layout {0} does not exist")]
    LayoutNotFound(String),

    /// Page execution failed during the content phase.
    #[error("exec page {name}: {source}")]
    Exec {
        name: String,
        #[source]
        source: minijinja::Error,
    },

    /// Layout execution failed during the layout phase.
    #[error("exec layout: {source}")]
    ExecLayout {
        name: String,
        #[source]
        source: minijinja::Error,
    },

    /// Error raised from template code through the page metadata.
    #[error("{0}")]
    Raised(String),

    /// Writing the rendered output failed.
    #[error("write output: {0}")]
    Io(#[from] io::Error),
}

impl RenderError {
    /// Returns the name of the template the error belongs to, if any.
    pub fn template_name(&self) -> Option<&str> {
        match self {
            RenderError::Parse { name, .. }
            | RenderError::Exec { name, .. }
            | RenderError::ExecLayout { name, .. }
            | RenderError::PageNotFound(name)
            | RenderError::LayoutNotFound(name) => Some(name),
            _ => None,
        }
    }
}
