//! Template compilation and two-phase rendering.
//!
//! ## Phases
//!
//! **Content**: the requested page is executed on its own. The page may
//! change the metadata (`{{ page.set_title("Home") }}`, `{{ page.set_layout("") }}`),
//! and any failure is recorded there rather than returned.
//!
//! **Layout**: the layout named by the metadata wraps the page body, which it
//! reads through `{{ content() }}`. A layout failure is returned to the
//! caller, since no later stage could display it.
//!
//! ```text
//! page:   {{ page.set_title("T") }}page-body
//! layout: <title>{{ page.title }}</title>{{ content() }}
//! output: <title>T</title>page-body
//! ```
//!
//! ## Functions
//!
//! | Source | Scope | Precedence |
//! |--------|-------|------------|
//! | [`TemplateService::funcs`] | every render, installed at compile time | low |
//! | `funcs` argument of a render call | that call only | high |
//!
//! Registering a base function named `content` disables automatic content
//! injection.

mod compiled;
pub mod funcs;
pub mod pool;
mod service;

pub use compiled::CompiledTemplate;
pub use funcs::{FuncMap, FunctionEnv, CONTENT_FUNC, PAGE_VAR};
pub use pool::{BufferPool, PooledBuffer};
pub use service::TemplateService;
