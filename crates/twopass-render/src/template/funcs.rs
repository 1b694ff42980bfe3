//! Template functions and per-call render context.
//!
//! Base functions are registered once on the builder and installed as
//! environment globals when templates are compiled. Request functions are
//! passed to each render call and layered over the base as context values,
//! so they win on name clashes without touching shared state.

use std::collections::BTreeMap;
use std::sync::Arc;

use minijinja::{Environment, Value};

use crate::meta::MetaData;

/// Functions by name. Values are usually built with [`Value::from_function`].
pub type FuncMap = BTreeMap<String, Value>;

/// Name of the function a layout calls to obtain the rendered page body.
pub const CONTENT_FUNC: &str = "content";

/// Context variable holding the page metadata.
pub const PAGE_VAR: &str = "page";

/// The base function set of a service.
#[derive(Debug, Clone)]
pub struct FunctionEnv {
    base: FuncMap,
    custom_content: bool,
}

impl Default for FunctionEnv {
    fn default() -> Self {
        let mut base = FuncMap::new();
        base.insert(
            CONTENT_FUNC.to_string(),
            Value::from_function(String::new),
        );
        Self {
            base,
            custom_content: false,
        }
    }
}

impl FunctionEnv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces base functions.
    ///
    /// Supplying a `content` function turns off automatic content injection;
    /// the caller then exposes page content itself.
    pub fn extend(&mut self, funcs: FuncMap) {
        if funcs.contains_key(CONTENT_FUNC) {
            self.custom_content = true;
        }
        self.base.extend(funcs);
    }

    /// Whether a custom `content` function was registered.
    pub fn custom_content(&self) -> bool {
        self.custom_content
    }

    /// Installs the base functions as globals of `env`.
    pub fn install(&self, env: &mut Environment<'static>) {
        for (name, func) in &self.base {
            env.add_global(name.clone(), func.clone());
        }
    }

    /// Builds the context for one render pass.
    ///
    /// `content` is the rendered page body for the layout phase; it is
    /// ignored when a custom `content` function is registered.
    pub fn context<M: MetaData>(
        &self,
        meta: &Arc<M>,
        request: &FuncMap,
        content: Option<String>,
    ) -> Value {
        let mut ctx: BTreeMap<String, Value> = request.clone();
        if let Some(body) = content.filter(|_| !self.custom_content) {
            ctx.insert(
                CONTENT_FUNC.to_string(),
                Value::from_function(move || Value::from_safe_string(body.clone())),
            );
        }
        ctx.insert(PAGE_VAR.to_string(), Value::from_dyn_object(Arc::clone(meta)));
        Value::from_iter(ctx)
    }
}
