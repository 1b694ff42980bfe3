//! Compiled template artifacts.

use std::io;

use minijinja::{Environment, Value};
use tracing::debug;

use crate::error::RenderError;

/// One compiled page or layout.
///
/// Each artifact owns a clone of the includes environment plus its own
/// template, so it can include any include by name but never sees its
/// sibling pages or layouts.
#[derive(Debug, Clone)]
pub struct CompiledTemplate {
    env: Environment<'static>,
    name: String,
}

impl CompiledTemplate {
    /// Compiles `source` as `name` on top of a clone of `base`.
    pub fn compile(
        base: &Environment<'static>,
        name: &str,
        source: String,
    ) -> Result<Self, RenderError> {
        let mut env = base.clone();
        env.add_template_owned(name.to_string(), source)
            .map_err(|source| RenderError::Parse {
                name: name.to_string(),
                source,
            })?;
        debug!(template = name, "compiled template");
        Ok(Self {
            env,
            name: name.to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Executes the template with `ctx`, appending output to `out`.
    pub fn render_to<W: io::Write>(&self, ctx: &Value, out: W) -> Result<(), minijinja::Error> {
        let tmpl = self.env.get_template(&self.name)?;
        tmpl.render_to_write(ctx, out)?;
        Ok(())
    }
}
