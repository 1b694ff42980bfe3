//! Convention-driven template discovery.
//!
//! [`LookupFileSystem`] maps a template tree onto three namespaces (includes,
//! layouts and pages), each keyed by a URI-like logical name.
//!
//! # Directory Layouts
//!
//! In prefix mode (the default) each namespace has its own subdirectory:
//!
//! ```text
//! tmpl/
//! ├── inc/
//! │   └── header.tmpl          → include "header"
//! ├── layout/
//! │   └── default.tmpl         → layout  "default"
//! └── page/
//!     ├── index.tmpl           → page    "/"
//!     ├── admin/index.tmpl     → page    "admin/"
//!     ├── user/__id.tmpl       → page    "user/:id"
//!     └── .partial.tmpl        → page    ".partial" (hidden)
//! ```
//!
//! In suffix mode a single tree is walked and the namespace is picked from a
//! suffix in front of the extension: with suffixes `.inc` and `.layout`,
//! `header.inc.tmpl` is an include, `default.layout.tmpl` a layout and every
//! other file a page.
//!
//! # Name Resolution
//!
//! | File (relative to namespace root) | Logical name |
//! |-----------------------------------|--------------|
//! | `page.tmpl` | `page` |
//! | `subdir/page.tmpl` | `subdir/page` |
//! | `index.tmpl` | `/` |
//! | `subdir/index.tmpl` | `subdir/` |
//! | `__id/page.tmpl` | `:id/page` |
//!
//! `__param` segments are rewritten to `:param` so routers can register
//! page names as path patterns directly.
//!
//! Files without the configured extension are ignored. Two files that map to
//! the same logical name overwrite each other in walk order (last wins).
//!
//! # Example
//!
//! ```rust
//! use twopass_render::fs::EmbeddedFileSystem;
//! use twopass_render::{LookupConfig, LookupFileSystem};
//!
//! let fs = EmbeddedFileSystem::from_entries(&[
//!     ("tmpl/layout/default.tmpl", "{{ content() }}"),
//!     ("tmpl/page/index.tmpl", "home"),
//!     ("tmpl/page/user/__id.tmpl", "user"),
//!     ("tmpl/page/.draft.tmpl", "draft"),
//! ]);
//!
//! let config = LookupConfig { includes: String::new(), ..Default::default() };
//! let mut lookup = LookupFileSystem::new(config).file_system(fs);
//! lookup.lookup_all().unwrap();
//!
//! assert_eq!(lookup.page_names(true), vec!["/", "user/:id"]);
//! assert_eq!(lookup.page_names(false), vec![".draft", "/", "user/:id"]);
//! ```

mod discovery;

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use tracing::debug;

pub use discovery::{logical_name, Discovery, Namespaces, PrefixDiscovery, SuffixDiscovery};

use crate::config::LookupConfig;
use crate::error::LookupError;
use crate::fs::{FileSystem, OsFileSystem, WalkEntry};

/// The three template namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Includes,
    Layouts,
    Pages,
}

impl Namespace {
    /// All namespaces in discovery order.
    pub const ALL: [Namespace; 3] = [Namespace::Includes, Namespace::Layouts, Namespace::Pages];

    pub fn as_str(self) -> &'static str {
        match self {
            Namespace::Includes => "includes",
            Namespace::Layouts => "layouts",
            Namespace::Pages => "pages",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A discovered template file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateFile {
    /// Path in the backing filesystem.
    pub path: PathBuf,
    /// Modification time at discovery, if known.
    pub modified: Option<SystemTime>,
}

impl From<&WalkEntry> for TemplateFile {
    fn from(entry: &WalkEntry) -> Self {
        Self {
            path: entry.path.clone(),
            modified: entry.modified,
        }
    }
}

/// Template discovery over a [`FileSystem`].
#[derive(Debug, Clone)]
pub struct LookupFileSystem {
    config: LookupConfig,
    fs: Arc<dyn FileSystem>,
    found: Namespaces,
}

impl LookupFileSystem {
    /// Creates a lookup over the native filesystem.
    pub fn new(config: LookupConfig) -> Self {
        Self {
            config,
            fs: Arc::new(OsFileSystem),
            found: Namespaces::default(),
        }
    }

    /// Replaces the backing filesystem (e.g. with an embedded one).
    pub fn file_system(mut self, fs: impl FileSystem + 'static) -> Self {
        self.fs = Arc::new(fs);
        self
    }

    /// Returns the lookup configuration.
    pub fn config(&self) -> &LookupConfig {
        &self.config
    }

    /// Returns the default layout name.
    ///
    /// After a successful [`lookup_all`](Self::lookup_all) this name is
    /// guaranteed to be among the layouts.
    pub fn default_layout(&self) -> &str {
        &self.config.def_layout
    }

    /// Scans the filesystem for includes, layouts and pages.
    ///
    /// Previously discovered entries are replaced, so calling this again
    /// picks up added and removed files.
    ///
    /// # Errors
    ///
    /// - [`LookupError::Walk`] if a namespace root is missing or unreadable
    /// - [`LookupError::MissingDefaultLayout`] if the configured default
    ///   layout was not found
    pub fn lookup_all(&mut self) -> Result<(), LookupError> {
        let found = discovery::strategy(&self.config).discover(self.fs.as_ref(), &self.config)?;

        if !found.layouts.contains_key(&self.config.def_layout) {
            return Err(LookupError::MissingDefaultLayout(
                self.config.def_layout.clone(),
            ));
        }

        debug!(
            includes = found.includes.len(),
            layouts = found.layouts.len(),
            pages = found.pages.len(),
            "template lookup complete"
        );
        self.found = found;
        Ok(())
    }

    /// Discovered includes by name.
    pub fn includes(&self) -> &BTreeMap<String, TemplateFile> {
        &self.found.includes
    }

    /// Discovered layouts by name.
    pub fn layouts(&self) -> &BTreeMap<String, TemplateFile> {
        &self.found.layouts
    }

    /// Discovered pages by name.
    pub fn pages(&self) -> &BTreeMap<String, TemplateFile> {
        &self.found.pages
    }

    /// Discovered files of one namespace by name.
    pub fn namespace(&self, namespace: Namespace) -> &BTreeMap<String, TemplateFile> {
        self.found.get(namespace)
    }

    /// Sorted include names.
    pub fn include_names(&self) -> Vec<String> {
        self.found.includes.keys().cloned().collect()
    }

    /// Sorted layout names.
    pub fn layout_names(&self) -> Vec<String> {
        self.found.layouts.keys().cloned().collect()
    }

    /// Sorted page names.
    ///
    /// With `hide` set, pages whose name starts with the hide prefix, or has
    /// a path segment starting with it, are left out. Hidden pages can still
    /// be rendered by name.
    pub fn page_names(&self, hide: bool) -> Vec<String> {
        let prefix = self.config.hide_prefix.as_str();
        self.found
            .pages
            .keys()
            .filter(|name| !(hide && is_hidden(name, prefix)))
            .cloned()
            .collect()
    }

    /// Reads a template file as text.
    pub fn read_file(&self, path: &Path) -> Result<String, LookupError> {
        let bytes = self.fs.read(path).map_err(|source| LookupError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        String::from_utf8(bytes).map_err(|_| LookupError::InvalidUtf8 {
            path: path.to_path_buf(),
        })
    }
}

fn is_hidden(name: &str, prefix: &str) -> bool {
    if prefix.is_empty() {
        return false;
    }
    name.starts_with(prefix) || name.contains(&format!("/{}", prefix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::EmbeddedFileSystem;
    use proptest::prelude::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn create_file(dir: &Path, relative_path: &str, content: &str) {
        let full_path = dir.join(relative_path);
        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        let mut file = std::fs::File::create(&full_path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
    }

    fn prefix_config(root: &Path) -> LookupConfig {
        LookupConfig {
            root: root.to_path_buf(),
            ext: ".html".into(),
            includes: "includes".into(),
            layouts: "layouts".into(),
            pages: "pages".into(),
            def_layout: "lay".into(),
            ..Default::default()
        }
    }

    fn populated_dir() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "includes/inc.html", "inc1 here");
        create_file(temp_dir.path(), "includes/subdir1/inc.html", "inc2 here");
        create_file(temp_dir.path(), "layouts/lay.html", "lay1 here");
        create_file(temp_dir.path(), "layouts/subdir2/lay.html", "lay2 here");
        create_file(temp_dir.path(), "pages/page.html", "page1 here");
        create_file(temp_dir.path(), "pages/subdir3/page.html", "page2 here");
        temp_dir
    }

    // =========================================================================
    // Prefix mode
    // =========================================================================

    #[test]
    fn test_lookup_by_prefix() {
        let temp_dir = populated_dir();
        let mut lookup = LookupFileSystem::new(prefix_config(temp_dir.path()));
        lookup.lookup_all().unwrap();

        assert_eq!(lookup.include_names(), vec!["inc", "subdir1/inc"]);
        assert_eq!(lookup.layout_names(), vec!["lay", "subdir2/lay"]);
        assert_eq!(lookup.page_names(false), vec!["page", "subdir3/page"]);
    }

    #[test]
    fn test_lookup_records_path_and_mtime() {
        let temp_dir = populated_dir();
        let mut lookup = LookupFileSystem::new(prefix_config(temp_dir.path()));
        lookup.lookup_all().unwrap();

        let file = &lookup.pages()["subdir3/page"];
        assert!(file.path.ends_with("pages/subdir3/page.html"));
        assert!(file.modified.is_some());
        assert_eq!(lookup.read_file(&file.path).unwrap(), "page2 here");
    }

    #[test]
    fn test_index_and_param_pages() {
        let temp_dir = populated_dir();
        create_file(temp_dir.path(), "pages/index.html", "home");
        create_file(temp_dir.path(), "pages/subdir/index.html", "sub home");
        create_file(temp_dir.path(), "pages/__id/page.html", "by id");

        let mut lookup = LookupFileSystem::new(prefix_config(temp_dir.path()));
        lookup.lookup_all().unwrap();

        let names = lookup.page_names(false);
        assert!(names.contains(&"/".to_string()));
        assert!(names.contains(&"subdir/".to_string()));
        assert!(names.contains(&":id/page".to_string()));
    }

    #[test]
    fn test_hidden_pages() {
        let temp_dir = populated_dir();
        create_file(temp_dir.path(), "pages/.page.html", "hidden page");
        create_file(temp_dir.path(), "pages/admin/.partial.html", "hidden partial");

        let mut lookup = LookupFileSystem::new(prefix_config(temp_dir.path()));
        lookup.lookup_all().unwrap();

        assert_eq!(lookup.page_names(true), vec!["page", "subdir3/page"]);
        assert_eq!(
            lookup.page_names(false),
            vec![".page", "admin/.partial", "page", "subdir3/page"]
        );

        let hidden = &lookup.pages()[".page"];
        assert_eq!(lookup.read_file(&hidden.path).unwrap(), "hidden page");
    }

    #[test]
    fn test_empty_hide_prefix_hides_nothing() {
        let temp_dir = populated_dir();
        let config = LookupConfig {
            hide_prefix: String::new(),
            ..prefix_config(temp_dir.path())
        };
        let mut lookup = LookupFileSystem::new(config);
        lookup.lookup_all().unwrap();
        assert_eq!(lookup.page_names(true), lookup.page_names(false));
    }

    #[test]
    fn test_missing_namespace_dirs() {
        let temp_dir = populated_dir();
        let cases = [
            ("404", "layouts", "pages", "includes walk failed"),
            ("includes", "404", "pages", "layouts walk failed"),
            ("includes", "layouts", "404", "pages walk failed"),
        ];
        for (includes, layouts, pages, expected) in cases {
            let config = LookupConfig {
                includes: includes.into(),
                layouts: layouts.into(),
                pages: pages.into(),
                ..prefix_config(temp_dir.path())
            };
            let err = LookupFileSystem::new(config).lookup_all().unwrap_err();
            assert!(matches!(err, LookupError::Walk { .. }));
            assert!(err.to_string().starts_with(expected), "{}", err);
        }
    }

    #[test]
    fn test_empty_includes_dir_skips_walk() {
        let temp_dir = populated_dir();
        let config = LookupConfig {
            includes: String::new(),
            ..prefix_config(temp_dir.path())
        };
        let mut lookup = LookupFileSystem::new(config);
        lookup.lookup_all().unwrap();
        assert!(lookup.include_names().is_empty());
    }

    #[test]
    fn test_missing_default_layout() {
        let temp_dir = populated_dir();
        let config = LookupConfig {
            def_layout: "default".into(),
            ..prefix_config(temp_dir.path())
        };
        let err = LookupFileSystem::new(config).lookup_all().unwrap_err();
        assert!(matches!(err, LookupError::MissingDefaultLayout(ref name) if name == "default"));
        assert_eq!(err.to_string(), "default layout (default) does not exist");
    }

    #[test]
    fn test_lookup_all_again_reflects_removed_files() {
        let temp_dir = populated_dir();
        let mut lookup = LookupFileSystem::new(prefix_config(temp_dir.path()));
        lookup.lookup_all().unwrap();
        assert_eq!(lookup.page_names(false).len(), 2);

        std::fs::remove_file(temp_dir.path().join("pages/page.html")).unwrap();
        lookup.lookup_all().unwrap();
        assert_eq!(lookup.page_names(false), vec!["subdir3/page"]);
    }

    #[test]
    fn test_read_file_rejects_invalid_utf8() {
        let fs = EmbeddedFileSystem::new().with_file("bad.html", vec![0xffu8, 0xfe]);
        let lookup = LookupFileSystem::new(LookupConfig::default()).file_system(fs);
        let err = lookup.read_file(Path::new("bad.html")).unwrap_err();
        assert!(matches!(err, LookupError::InvalidUtf8 { .. }));
    }

    // =========================================================================
    // Suffix mode
    // =========================================================================

    fn suffix_config(root: &Path) -> LookupConfig {
        LookupConfig {
            root: root.to_path_buf(),
            ext: ".html".into(),
            includes: ".includes".into(),
            layouts: ".layouts".into(),
            pages: "not_used".into(),
            use_suffix: true,
            def_layout: "lay".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_lookup_by_suffix() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "inc.includes.html", "inc1 here");
        create_file(temp_dir.path(), "subdir1/inc.includes.html", "inc2 here");
        create_file(temp_dir.path(), "lay.layouts.html", "lay1 here");
        create_file(temp_dir.path(), "subdir2/lay.layouts.html", "lay2 here");
        create_file(temp_dir.path(), "page.html", "page1 here");
        create_file(temp_dir.path(), "subdir3/page.html", "page2 here");

        let mut lookup = LookupFileSystem::new(suffix_config(temp_dir.path()));
        lookup.lookup_all().unwrap();

        assert_eq!(lookup.include_names(), vec!["inc", "subdir1/inc"]);
        assert_eq!(lookup.layout_names(), vec!["lay", "subdir2/lay"]);
        assert_eq!(lookup.page_names(false), vec!["page", "subdir3/page"]);
    }

    #[test]
    fn test_suffix_missing_root() {
        let temp_dir = TempDir::new().unwrap();
        let config = suffix_config(&temp_dir.path().join("404"));
        let err = LookupFileSystem::new(config).lookup_all().unwrap_err();
        assert!(err.to_string().starts_with("templates walk failed"), "{}", err);
    }

    #[test]
    fn test_suffix_checks_default_layout() {
        let fs = EmbeddedFileSystem::from_entries(&[("t/page.html", "x")]);
        let config = LookupConfig {
            root: "t".into(),
            ..suffix_config(Path::new("t"))
        };
        let err = LookupFileSystem::new(config)
            .file_system(fs)
            .lookup_all()
            .unwrap_err();
        assert!(matches!(err, LookupError::MissingDefaultLayout(_)));
    }

    // =========================================================================
    // Embedded filesystem
    // =========================================================================

    #[test]
    fn test_lookup_over_embedded_fs() {
        let fs = EmbeddedFileSystem::from_entries(&[
            ("tmpl/inc/header.tmpl", "header"),
            ("tmpl/layout/default.tmpl", "{{ content() }}"),
            ("tmpl/page/index.tmpl", "home"),
        ]);
        let mut lookup = LookupFileSystem::new(LookupConfig::default()).file_system(fs);
        lookup.lookup_all().unwrap();

        assert_eq!(lookup.include_names(), vec!["header"]);
        assert_eq!(lookup.page_names(true), vec!["/"]);
        let index = &lookup.pages()["/"];
        assert_eq!(lookup.read_file(&index.path).unwrap(), "home");
    }

    // =========================================================================
    // Listing properties
    // =========================================================================

    proptest! {
        #[test]
        fn prop_page_names_sorted_and_hidden_filtered(
            names in proptest::collection::btree_set("[a-z_.]{1,6}(/[a-z_.]{1,6}){0,2}", 1..12)
        ) {
            let mut fs = EmbeddedFileSystem::new().with_file("t/layouts/default.html", "x");
            for name in &names {
                fs.insert(format!("t/pages/{}.html", name), "x");
            }
            let config = LookupConfig {
                root: "t".into(),
                ext: ".html".into(),
                includes: String::new(),
                layouts: "layouts".into(),
                pages: "pages".into(),
                index: String::new(),
                ..Default::default()
            };
            let mut lookup = LookupFileSystem::new(config).file_system(fs);
            lookup.lookup_all().unwrap();

            let all = lookup.page_names(false);
            let mut sorted = all.clone();
            sorted.sort();
            prop_assert_eq!(&all, &sorted);

            let visible = lookup.page_names(true);
            for name in &all {
                let hidden = name.starts_with('.') || name.contains("/.");
                prop_assert_eq!(visible.contains(name), !hidden);
            }
        }
    }
}
