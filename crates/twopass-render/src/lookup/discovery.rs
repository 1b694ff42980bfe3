//! Discovery strategies: how a walked tree becomes three name maps.
//!
//! [`PrefixDiscovery`] walks one subdirectory per namespace;
//! [`SuffixDiscovery`] walks the root once and sorts files by a name suffix.
//! Both share [`logical_name`] for turning a relative path into a page name.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::debug;

use super::{Namespace, TemplateFile};
use crate::config::{DiscoveryMode, LookupConfig};
use crate::error::LookupError;
use crate::fs::{FileSystem, WalkEntry};

/// The three disjoint name maps produced by one discovery pass.
#[derive(Debug, Default, Clone)]
pub struct Namespaces {
    pub includes: BTreeMap<String, TemplateFile>,
    pub layouts: BTreeMap<String, TemplateFile>,
    pub pages: BTreeMap<String, TemplateFile>,
}

impl Namespaces {
    pub fn get(&self, namespace: Namespace) -> &BTreeMap<String, TemplateFile> {
        match namespace {
            Namespace::Includes => &self.includes,
            Namespace::Layouts => &self.layouts,
            Namespace::Pages => &self.pages,
        }
    }

    fn get_mut(&mut self, namespace: Namespace) -> &mut BTreeMap<String, TemplateFile> {
        match namespace {
            Namespace::Includes => &mut self.includes,
            Namespace::Layouts => &mut self.layouts,
            Namespace::Pages => &mut self.pages,
        }
    }
}

/// A way of mapping a template tree onto namespaces.
pub trait Discovery {
    fn discover(&self, fs: &dyn FileSystem, config: &LookupConfig)
        -> Result<Namespaces, LookupError>;
}

/// Returns the strategy selected by the configuration.
pub fn strategy(config: &LookupConfig) -> Box<dyn Discovery> {
    match config.mode() {
        DiscoveryMode::Prefix => Box::new(PrefixDiscovery),
        DiscoveryMode::Suffix => Box::new(SuffixDiscovery),
    }
}

/// One subdirectory per namespace: `<root>/<includes>`, `<root>/<layouts>`,
/// `<root>/<pages>`.
#[derive(Debug, Clone, Copy)]
pub struct PrefixDiscovery;

impl Discovery for PrefixDiscovery {
    fn discover(
        &self,
        fs: &dyn FileSystem,
        config: &LookupConfig,
    ) -> Result<Namespaces, LookupError> {
        let mut found = Namespaces::default();

        for namespace in Namespace::ALL {
            let subdir = match namespace {
                Namespace::Includes => &config.includes,
                Namespace::Layouts => &config.layouts,
                Namespace::Pages => &config.pages,
            };
            // Includes are optional
            if namespace == Namespace::Includes && subdir.is_empty() {
                continue;
            }

            let root = config.root.join(subdir);
            let entries = fs.walk(&root).map_err(|source| LookupError::Walk {
                what: namespace.as_str(),
                root: root.clone(),
                source,
            })?;

            let files = found.get_mut(namespace);
            for (relative, entry) in template_files(&entries, &root, &config.ext) {
                let name = logical_name(&relative, &config.index);
                files.insert(name, TemplateFile::from(entry));
            }
            debug!(
                namespace = namespace.as_str(),
                root = %root.display(),
                count = files.len(),
                "walked template namespace"
            );
        }

        Ok(found)
    }
}

/// A single tree; `name<includes><ext>` is an include, `name<layouts><ext>`
/// a layout, anything else a page.
#[derive(Debug, Clone, Copy)]
pub struct SuffixDiscovery;

impl Discovery for SuffixDiscovery {
    fn discover(
        &self,
        fs: &dyn FileSystem,
        config: &LookupConfig,
    ) -> Result<Namespaces, LookupError> {
        let root = config.root.as_path();
        let entries = fs.walk(root).map_err(|source| LookupError::Walk {
            what: "templates",
            root: root.to_path_buf(),
            source,
        })?;

        let mut found = Namespaces::default();
        for (relative, entry) in template_files(&entries, root, &config.ext) {
            let (namespace, stripped) = classify(&relative, config);
            let name = logical_name(stripped, &config.index);
            found
                .get_mut(namespace)
                .insert(name, TemplateFile::from(entry));
        }
        debug!(
            root = %root.display(),
            includes = found.includes.len(),
            layouts = found.layouts.len(),
            pages = found.pages.len(),
            "walked template tree"
        );

        Ok(found)
    }
}

/// Picks the namespace for a suffix-mode name and strips the matched suffix.
fn classify<'a>(name: &'a str, config: &LookupConfig) -> (Namespace, &'a str) {
    let suffixes = [
        (Namespace::Includes, config.includes.as_str()),
        (Namespace::Layouts, config.layouts.as_str()),
    ];
    for (namespace, suffix) in suffixes {
        if suffix.is_empty() {
            continue;
        }
        if let Some(stripped) = name.strip_suffix(suffix) {
            return (namespace, stripped);
        }
    }
    (Namespace::Pages, name)
}

/// Yields `(relative name without extension, entry)` for every template file
/// under `root`. Directories and files without the extension are skipped.
fn template_files<'a>(
    entries: &'a [WalkEntry],
    root: &'a Path,
    ext: &'a str,
) -> impl Iterator<Item = (String, &'a WalkEntry)> + 'a {
    entries.iter().filter(|e| !e.is_dir).filter_map(move |entry| {
        let relative = entry.path.strip_prefix(root).ok()?;
        let relative = relative
            .to_string_lossy()
            .replace(std::path::MAIN_SEPARATOR, "/");
        let name = relative.strip_suffix(ext)?;
        Some((name.to_string(), entry))
    })
}

/// Turns a root-relative, extension-less, slash-separated path into the name
/// a page is addressed by.
///
/// - a trailing index segment collapses to its directory (`admin/index` → `admin/`)
/// - `__param` segments become `:param` (`user/__id` → `user/:id`)
/// - there is no leading slash, except for the root index which is `/`
pub fn logical_name(relative: &str, index: &str) -> String {
    let mut name = format!("/{}", relative);

    if !index.is_empty() {
        let dir_len = name
            .strip_suffix(index)
            .filter(|dir| dir.ends_with('/'))
            .map(str::len);
        if let Some(len) = dir_len {
            name.truncate(len);
        }
    }

    let name = name.replace("/__", "/:");

    if name == "/" {
        return name;
    }
    match name.strip_prefix('/') {
        Some(stripped) => stripped.to_string(),
        None => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::EmbeddedFileSystem;

    // =========================================================================
    // logical_name
    // =========================================================================

    #[test]
    fn test_logical_name_plain() {
        assert_eq!(logical_name("page", "index"), "page");
        assert_eq!(logical_name("subdir/page", "index"), "subdir/page");
    }

    #[test]
    fn test_logical_name_index_collapses() {
        assert_eq!(logical_name("admin/index", "index"), "admin/");
        assert_eq!(logical_name("index", "index"), "/");
    }

    #[test]
    fn test_logical_name_index_whole_segment_only() {
        assert_eq!(logical_name("myindex", "index"), "myindex");
        assert_eq!(logical_name("docs/reindex", "index"), "docs/reindex");
    }

    #[test]
    fn test_logical_name_empty_index_is_ignored() {
        assert_eq!(logical_name("admin/index", ""), "admin/index");
    }

    #[test]
    fn test_logical_name_param_rewrite() {
        assert_eq!(logical_name("__id/page", "index"), ":id/page");
        assert_eq!(logical_name("user/__id/edit", "index"), "user/:id/edit");
        assert_eq!(logical_name("user/__id/index", "index"), "user/:id/");
    }

    #[test]
    fn test_logical_name_inner_underscores_untouched() {
        assert_eq!(logical_name("my__page", "index"), "my__page");
    }

    // =========================================================================
    // classify
    // =========================================================================

    #[test]
    fn test_classify_by_suffix() {
        let config = LookupConfig {
            includes: ".includes".into(),
            layouts: ".layouts".into(),
            use_suffix: true,
            ..Default::default()
        };
        assert_eq!(
            classify("sub/inc.includes", &config),
            (Namespace::Includes, "sub/inc")
        );
        assert_eq!(classify("lay.layouts", &config), (Namespace::Layouts, "lay"));
        assert_eq!(classify("page", &config), (Namespace::Pages, "page"));
    }

    #[test]
    fn test_classify_empty_suffix_never_matches() {
        let config = LookupConfig {
            includes: String::new(),
            layouts: "_layout".into(),
            ..Default::default()
        };
        assert_eq!(classify("page", &config), (Namespace::Pages, "page"));
    }

    // =========================================================================
    // strategies
    // =========================================================================

    #[test]
    fn test_prefix_skips_foreign_extensions() {
        let fs = EmbeddedFileSystem::from_entries(&[
            ("t/layouts/default.html", "x"),
            ("t/pages/page.html", "x"),
            ("t/pages/README.md", "x"),
            ("t/pages/page.html~", "x"),
        ]);
        let config = LookupConfig {
            root: "t".into(),
            ext: ".html".into(),
            includes: String::new(),
            layouts: "layouts".into(),
            pages: "pages".into(),
            ..Default::default()
        };
        let found = PrefixDiscovery.discover(&fs, &config).unwrap();
        assert_eq!(found.pages.keys().collect::<Vec<_>>(), vec!["page"]);
        assert!(found.includes.is_empty());
    }

    #[test]
    fn test_suffix_applies_shared_normalization() {
        let fs = EmbeddedFileSystem::from_entries(&[
            ("t/index.html", "home"),
            ("t/user/__id.html", "user"),
            ("t/main.layout.html", "layout"),
        ]);
        let config = LookupConfig {
            root: "t".into(),
            ext: ".html".into(),
            includes: ".inc".into(),
            layouts: ".layout".into(),
            use_suffix: true,
            ..Default::default()
        };
        let found = SuffixDiscovery.discover(&fs, &config).unwrap();
        assert_eq!(
            found.pages.keys().collect::<Vec<_>>(),
            vec!["/", "user/:id"]
        );
        assert_eq!(found.layouts.keys().collect::<Vec<_>>(), vec!["main"]);
    }
}
