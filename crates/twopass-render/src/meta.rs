//! Per-request page metadata.
//!
//! The metadata object is the only mutable state threaded through a render.
//! Templates see it as `page` and may change it (`{{ page.set_title("T") }}`);
//! the service reads the chosen layout from it and records content-phase
//! failures on it, so a layout can turn them into an error page.
//!
//! [`MetaData`] is the minimal contract the service needs. [`HttpMetaData`]
//! adds what web adapters use to build a response. [`PageMeta`] implements
//! both.

use std::sync::Arc;

use minijinja::value::{from_args, Enumerator, Object, Value};
use minijinja::{Error, ErrorKind, State};
use parking_lot::Mutex;

use crate::error::RenderError;

/// Capabilities the render service requires from page metadata.
///
/// Implementors are MiniJinja objects with interior mutability: the service
/// shares one `Arc` with the templates, and the caller inspects the same
/// `Arc` afterwards.
pub trait MetaData: Object + 'static {
    /// The recorded error, if any.
    fn error(&self) -> Option<Arc<RenderError>>;

    /// Records an error. A later error replaces an earlier one.
    fn set_error(&self, err: RenderError);

    /// The layout to wrap the content with. Empty means no layout.
    fn layout(&self) -> String;

    fn has_error(&self) -> bool {
        self.error().is_some()
    }
}

/// Response attributes used by HTTP adapters.
pub trait HttpMetaData: MetaData {
    fn status(&self) -> u16;

    fn content_type(&self) -> String;

    /// Redirect target, if a redirect was requested.
    fn location(&self) -> Option<String>;

    fn is_redirect(&self) -> bool {
        matches!(self.status(), 301 | 302) && self.location().is_some()
    }
}

const DEFAULT_CONTENT_TYPE: &str = "text/html; charset=utf-8";

#[derive(Debug)]
struct PageState {
    title: String,
    layout: String,
    status: u16,
    content_type: String,
    location: Option<String>,
    error: Option<Arc<RenderError>>,
}

/// Ready-made page metadata.
///
/// Template-visible fields: `title`, `layout`, `status`, `content_type`,
/// `location`, `error` (the error message, or none).
///
/// Template methods: `set_title(title)`, `set_layout(name)`,
/// `set_status(code)`, `redirect(code, url)`, `raise(message)`. Each returns
/// an empty string so it can be called from an output expression.
///
/// ```rust
/// use twopass_render::meta::{MetaData, PageMeta};
///
/// let meta = PageMeta::new();
/// assert_eq!(meta.layout(), "default");
/// meta.set_layout("");
/// assert_eq!(meta.layout(), "");
/// ```
#[derive(Debug)]
pub struct PageMeta {
    state: Mutex<PageState>,
}

impl Default for PageMeta {
    fn default() -> Self {
        Self {
            state: Mutex::new(PageState {
                title: String::new(),
                layout: "default".to_string(),
                status: 200,
                content_type: DEFAULT_CONTENT_TYPE.to_string(),
                location: None,
                error: None,
            }),
        }
    }
}

impl PageMeta {
    /// Creates metadata with the default layout and status 200.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Creates metadata that renders with the given layout.
    pub fn with_layout(layout: impl Into<String>) -> Arc<Self> {
        let meta = Self::default();
        meta.set_layout(layout);
        Arc::new(meta)
    }

    pub fn title(&self) -> String {
        self.state.lock().title.clone()
    }

    pub fn set_title(&self, title: impl Into<String>) {
        self.state.lock().title = title.into();
    }

    pub fn set_layout(&self, layout: impl Into<String>) {
        self.state.lock().layout = layout.into();
    }

    pub fn set_status(&self, status: u16) {
        self.state.lock().status = status;
    }

    pub fn set_content_type(&self, content_type: impl Into<String>) {
        self.state.lock().content_type = content_type.into();
    }

    /// Requests a redirect to `url` with the given status.
    pub fn redirect(&self, status: u16, url: impl Into<String>) {
        let mut state = self.state.lock();
        state.status = status;
        state.location = Some(url.into());
    }

    /// Removes and returns the recorded error.
    pub fn take_error(&self) -> Option<Arc<RenderError>> {
        self.state.lock().error.take()
    }
}

impl MetaData for PageMeta {
    fn error(&self) -> Option<Arc<RenderError>> {
        self.state.lock().error.clone()
    }

    fn set_error(&self, err: RenderError) {
        self.state.lock().error = Some(Arc::new(err));
    }

    fn layout(&self) -> String {
        self.state.lock().layout.clone()
    }
}

impl HttpMetaData for PageMeta {
    fn status(&self) -> u16 {
        self.state.lock().status
    }

    fn content_type(&self) -> String {
        self.state.lock().content_type.clone()
    }

    fn location(&self) -> Option<String> {
        self.state.lock().location.clone()
    }
}

impl Object for PageMeta {
    fn get_value(self: &Arc<Self>, key: &Value) -> Option<Value> {
        let state = self.state.lock();
        let value = match key.as_str()? {
            "title" => Value::from(state.title.clone()),
            "layout" => Value::from(state.layout.clone()),
            "status" => Value::from(state.status),
            "content_type" => Value::from(state.content_type.clone()),
            "location" => Value::from(state.location.clone()),
            "error" => Value::from(state.error.as_ref().map(|e| e.to_string())),
            _ => return None,
        };
        Some(value)
    }

    fn enumerate(self: &Arc<Self>) -> Enumerator {
        Enumerator::Str(&[
            "title",
            "layout",
            "status",
            "content_type",
            "location",
            "error",
        ])
    }

    fn call_method(
        self: &Arc<Self>,
        _state: &State,
        name: &str,
        args: &[Value],
    ) -> Result<Value, Error> {
        match name {
            "set_title" => {
                let (title,): (String,) = from_args(args)?;
                self.set_title(title);
            }
            "set_layout" => {
                let (layout,): (String,) = from_args(args)?;
                self.set_layout(layout);
            }
            "set_status" => {
                let (status,): (u16,) = from_args(args)?;
                self.set_status(status);
            }
            "redirect" => {
                let (status, url): (u16, String) = from_args(args)?;
                self.redirect(status, url);
            }
            "raise" => {
                let (message,): (String,) = from_args(args)?;
                self.set_error(RenderError::Raised(message));
            }
            _ => {
                return Err(Error::new(
                    ErrorKind::UnknownMethod,
                    format!("page has no method named {}", name),
                ))
            }
        }
        Ok(Value::from(""))
    }
}
