//! # Twopass Render - Two-Phase Page Rendering
//!
//! `twopass-render` discovers page, layout and include templates from a
//! directory tree (or an embedded one), compiles them with MiniJinja, and
//! renders each request in two passes: the page body first, then the layout
//! that wraps it.
//!
//! ## Core Concepts
//!
//! - [`LookupFileSystem`]: maps a template tree onto includes, layouts and
//!   pages by naming convention (see [`lookup`])
//! - [`TemplateService`]: compiles everything once and renders pages into
//!   layouts, reusing buffers from a [`BufferPool`]
//! - [`MetaData`]: per-request state shared with templates as `page`;
//!   [`PageMeta`] is a ready-made implementation
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use twopass_render::{FuncMap, PageMeta, ServiceConfig, TemplateService};
//!
//! let service = TemplateService::from_config(&ServiceConfig::default()).parse()?;
//!
//! for name in service.page_names(true) {
//!     println!("route: /{}", name.trim_start_matches('/'));
//! }
//!
//! let meta = PageMeta::new();
//! let mut out = Vec::new();
//! service.execute(&mut out, "/", &FuncMap::new(), &meta)?;
//! # Ok::<(), twopass_render::RenderError>(())
//! ```
//!
//! ## Errors
//!
//! Initialization errors (discovery, compilation) come back from
//! [`TemplateService::parse`]. A missing page or a failing page is recorded
//! on the metadata so the layout can render an error page. Only layout
//! failures are returned from a render.

pub mod config;
mod error;
pub mod fs;
pub mod lookup;
pub mod meta;
pub mod template;

pub use config::{DiscoveryMode, LookupConfig, ServiceConfig};
pub use error::{LookupError, RenderError};
pub use lookup::{LookupFileSystem, Namespace, TemplateFile};
pub use meta::{HttpMetaData, MetaData, PageMeta};
pub use template::{BufferPool, FuncMap, PooledBuffer, TemplateService};

pub use minijinja::Value;
