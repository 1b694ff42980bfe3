//! The two-phase render service.
//!
//! [`TemplateService`] compiles every discovered layout and page once, then
//! renders a request in two passes:
//!
//! 1. **Content**: [`render_content`](TemplateService::render_content)
//!    executes the page into a pooled buffer. Failures are recorded on the
//!    page metadata instead of being returned.
//! 2. **Layout**: [`render`](TemplateService::render) executes the layout the
//!    metadata names, with the page body available as `{{ content() }}`, and
//!    writes the result. An empty layout name writes the content as is.
//!
//! [`execute`](TemplateService::execute) runs both passes.
//!
//! # Example
//!
//! ```rust
//! use twopass_render::fs::EmbeddedFileSystem;
//! use twopass_render::meta::PageMeta;
//! use twopass_render::{FuncMap, LookupConfig, LookupFileSystem, TemplateService};
//!
//! let fs = EmbeddedFileSystem::from_entries(&[
//!     ("tmpl/inc/footer.tmpl", "(c) twopass"),
//!     ("tmpl/layout/default.tmpl",
//!      "<title>{{ page.title }}</title>{{ content() }}{% include \"footer\" %}"),
//!     ("tmpl/page/index.tmpl", "{{ page.set_title(\"Home\") }}<p>hi</p>"),
//! ]);
//!
//! let lookup = LookupFileSystem::new(LookupConfig::default()).file_system(fs);
//! let service = TemplateService::new(16).lookup_fs(lookup).parse().unwrap();
//!
//! let meta = PageMeta::new();
//! let mut out = Vec::new();
//! service.execute(&mut out, "/", &FuncMap::new(), &meta).unwrap();
//! assert_eq!(
//!     String::from_utf8(out).unwrap(),
//!     "<title>Home</title><p>hi</p>(c) twopass"
//! );
//! ```

use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;

use minijinja::{AutoEscape, Environment};
use tracing::{debug, info, warn};

use super::compiled::CompiledTemplate;
use super::funcs::{FuncMap, FunctionEnv};
use super::pool::{BufferPool, PooledBuffer};
use crate::config::ServiceConfig;
use crate::error::{LookupError, RenderError};
use crate::lookup::{LookupFileSystem, Namespace};
use crate::meta::MetaData;

/// Compiles discovered templates and renders pages into layouts.
///
/// After [`parse`](Self::parse) the compiled maps are read-only, so one
/// service can be shared across threads (`&TemplateService` or `Arc`).
/// The buffer pool is the only state mutated by renders.
#[derive(Debug)]
pub struct TemplateService {
    lookup: LookupFileSystem,
    funcs: FunctionEnv,
    pool: Arc<BufferPool>,
    parse_always: bool,
    auto_escape: bool,
    layouts: HashMap<String, CompiledTemplate>,
    pages: HashMap<String, CompiledTemplate>,
}

impl TemplateService {
    /// Creates a service whose buffer pool keeps up to `pool_size` buffers.
    ///
    /// Templates are looked up with the default [`LookupConfig`](crate::LookupConfig)
    /// until [`lookup_fs`](Self::lookup_fs) replaces it.
    pub fn new(pool_size: usize) -> Self {
        Self {
            lookup: LookupFileSystem::new(Default::default()),
            funcs: FunctionEnv::new(),
            pool: BufferPool::new(pool_size),
            parse_always: false,
            auto_escape: false,
            layouts: HashMap::new(),
            pages: HashMap::new(),
        }
    }

    /// Creates an unparsed service from configuration.
    pub fn from_config(config: &ServiceConfig) -> Self {
        Self::new(config.pool_size)
            .lookup_fs(LookupFileSystem::new(config.lookup.clone()))
            .parse_always(config.parse_always)
            .auto_escape(config.auto_escape)
    }

    /// Sets the template lookup.
    pub fn lookup_fs(mut self, lookup: LookupFileSystem) -> Self {
        self.lookup = lookup;
        self
    }

    /// Adds base functions, available to every template.
    pub fn funcs(mut self, funcs: FuncMap) -> Self {
        self.funcs.extend(funcs);
        self
    }

    /// Recompile the requested page and layout on every render.
    pub fn parse_always(mut self, flag: bool) -> Self {
        self.parse_always = flag;
        self
    }

    /// HTML-escape output expressions in every template.
    pub fn auto_escape(mut self, flag: bool) -> Self {
        self.auto_escape = flag;
        self
    }

    /// Discovers and compiles all templates.
    ///
    /// Includes are compiled into one base environment; every layout and page
    /// is compiled into its own clone of it. The first failure aborts.
    ///
    /// # Errors
    ///
    /// - [`RenderError::Lookup`] if discovery or reading a file fails
    /// - [`RenderError::Parse`] naming the first template that fails to compile
    pub fn parse(mut self) -> Result<Self, RenderError> {
        self.lookup.lookup_all()?;

        let base = self.compile_includes()?;
        let layouts = self.compile_namespace(&base, Namespace::Layouts)?;
        let pages = self.compile_namespace(&base, Namespace::Pages)?;

        info!(
            includes = self.lookup.includes().len(),
            layouts = layouts.len(),
            pages = pages.len(),
            parse_always = self.parse_always,
            "templates parsed"
        );
        self.layouts = layouts;
        self.pages = pages;
        Ok(self)
    }

    /// Sorted page names, optionally without hidden pages.
    pub fn page_names(&self, hide: bool) -> Vec<String> {
        self.lookup.page_names(hide)
    }

    pub fn layout_names(&self) -> Vec<String> {
        self.lookup.layout_names()
    }

    pub fn include_names(&self) -> Vec<String> {
        self.lookup.include_names()
    }

    pub fn lookup(&self) -> &LookupFileSystem {
        &self.lookup
    }

    pub fn pool(&self) -> &Arc<BufferPool> {
        &self.pool
    }

    /// Renders the page content and wraps it into the layout.
    pub fn execute<W, M>(
        &self,
        out: W,
        name: &str,
        funcs: &FuncMap,
        meta: &Arc<M>,
    ) -> Result<(), RenderError>
    where
        W: Write,
        M: MetaData,
    {
        let content = self.render_content(name, funcs, meta);
        self.render(out, funcs, meta, content)
    }

    /// Content phase: executes page `name` into a pooled buffer.
    ///
    /// Returns `None` when the page is unknown or fails to execute; the
    /// error is recorded on `meta`.
    pub fn render_content<M: MetaData>(
        &self,
        name: &str,
        funcs: &FuncMap,
        meta: &Arc<M>,
    ) -> Option<PooledBuffer> {
        let compiled;
        let tmpl = if self.parse_always {
            match self.compile_fresh(Namespace::Pages, name) {
                Ok(tmpl) => {
                    compiled = tmpl;
                    &compiled
                }
                Err(err) => {
                    warn!(page = name, error = %err, "page compile failed");
                    meta.set_error(err);
                    return None;
                }
            }
        } else {
            match self.pages.get(name) {
                Some(tmpl) => tmpl,
                None => {
                    warn!(page = name, "page not found");
                    meta.set_error(RenderError::PageNotFound(name.to_string()));
                    return None;
                }
            }
        };

        let ctx = self.funcs.context(meta, funcs, None);
        let mut buf = self.pool.get();
        match tmpl.render_to(&ctx, &mut *buf) {
            Ok(()) => Some(buf),
            Err(source) => {
                warn!(page = name, error = %source, "page execution failed");
                buf.release();
                meta.set_error(RenderError::Exec {
                    name: name.to_string(),
                    source,
                });
                None
            }
        }
    }

    /// Layout phase: wraps `content` into the layout named by `meta` and
    /// writes the result to `out`.
    ///
    /// With an empty layout name, `content` is written unchanged. An unknown
    /// layout is recorded on `meta` and the default layout is used instead.
    /// The content buffer is returned to the pool in every case.
    ///
    /// # Errors
    ///
    /// - [`RenderError::ExecLayout`] if the layout fails to execute
    /// - [`RenderError::Io`] if writing to `out` fails
    pub fn render<W, M>(
        &self,
        mut out: W,
        funcs: &FuncMap,
        meta: &Arc<M>,
        content: Option<PooledBuffer>,
    ) -> Result<(), RenderError>
    where
        W: Write,
        M: MetaData,
    {
        let name = meta.layout();
        if name.is_empty() {
            if let Some(buf) = content {
                out.write_all(&buf)?;
            }
            return Ok(());
        }

        let compiled;
        let tmpl = if self.parse_always {
            compiled = self.fresh_layout(&name, meta)?;
            &compiled
        } else {
            self.cached_layout(&name, meta)?
        };

        let body = content.map(|buf| buf.as_str().into_owned());
        let ctx = self.funcs.context(meta, funcs, body);
        let mut buf = self.pool.get();
        tmpl.render_to(&ctx, &mut *buf)
            .map_err(|source| RenderError::ExecLayout {
                name: tmpl.name().to_string(),
                source,
            })?;
        out.write_all(&buf)?;
        Ok(())
    }

    fn cached_layout<M: MetaData>(
        &self,
        name: &str,
        meta: &Arc<M>,
    ) -> Result<&CompiledTemplate, RenderError> {
        if let Some(tmpl) = self.layouts.get(name) {
            return Ok(tmpl);
        }
        let default = self.lookup.default_layout();
        warn!(layout = name, fallback = default, "layout not found");
        meta.set_error(RenderError::LayoutNotFound(name.to_string()));
        self.layouts
            .get(default)
            .ok_or_else(|| LookupError::MissingDefaultLayout(default.to_string()).into())
    }

    fn fresh_layout<M: MetaData>(
        &self,
        name: &str,
        meta: &Arc<M>,
    ) -> Result<CompiledTemplate, RenderError> {
        match self.compile_fresh(Namespace::Layouts, name) {
            Ok(tmpl) => Ok(tmpl),
            Err(err) => {
                let default = self.lookup.default_layout();
                warn!(layout = name, fallback = default, error = %err, "layout compile failed");
                meta.set_error(err);
                self.compile_fresh(Namespace::Layouts, default)
            }
        }
    }

    /// Compiles one page or layout from current file content, bypassing the
    /// compiled maps.
    fn compile_fresh(&self, namespace: Namespace, name: &str) -> Result<CompiledTemplate, RenderError> {
        let base = self.compile_includes()?;
        let file = self.lookup.namespace(namespace).get(name).ok_or_else(|| {
            match namespace {
                Namespace::Layouts => RenderError::LayoutNotFound(name.to_string()),
                _ => RenderError::PageNotFound(name.to_string()),
            }
        })?;
        let source = self.lookup.read_file(&file.path)?;
        CompiledTemplate::compile(&base, name, source)
    }

    fn base_env(&self) -> Environment<'static> {
        let mut env = Environment::new();
        env.set_keep_trailing_newline(true);
        let escape = if self.auto_escape {
            AutoEscape::Html
        } else {
            AutoEscape::None
        };
        env.set_auto_escape_callback(move |_| escape.clone());
        self.funcs.install(&mut env);
        env
    }

    fn compile_includes(&self) -> Result<Environment<'static>, RenderError> {
        let mut env = self.base_env();
        for (name, file) in self.lookup.includes() {
            let source = self.lookup.read_file(&file.path)?;
            env.add_template_owned(name.clone(), source)
                .map_err(|source| RenderError::Parse {
                    name: name.clone(),
                    source,
                })?;
            debug!(include = name.as_str(), "compiled include");
        }
        Ok(env)
    }

    fn compile_namespace(
        &self,
        base: &Environment<'static>,
        namespace: Namespace,
    ) -> Result<HashMap<String, CompiledTemplate>, RenderError> {
        let mut compiled = HashMap::new();
        for (name, file) in self.lookup.namespace(namespace) {
            let source = self.lookup.read_file(&file.path)?;
            compiled.insert(name.clone(), CompiledTemplate::compile(base, name, source)?);
        }
        Ok(compiled)
    }
}
