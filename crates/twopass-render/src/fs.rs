//! Filesystem access for template discovery.
//!
//! Discovery only needs two things from storage: a recursive walk and a way
//! to read a file's bytes. [`FileSystem`] captures exactly that, so the same
//! lookup rules work against a real directory tree ([`OsFileSystem`]) or
//! content baked into the binary ([`EmbeddedFileSystem`]).
//!
//! ## Walk Contract
//!
//! - Entries come depth-first in lexical order, the root itself first.
//! - Every entry carries its path (prefixed by the root as given), whether it
//!   is a directory, and its modification time when known.
//! - A missing or unreadable root is an error, not an empty walk.
//!
//! ## Embedding
//!
//! ```rust
//! use twopass_render::fs::{EmbeddedFileSystem, FileSystem};
//! use std::path::Path;
//!
//! let fs = EmbeddedFileSystem::from_entries(&[
//!     ("tmpl/layouts/default.html", "{{ content() }}"),
//!     ("tmpl/pages/index.html", "home"),
//! ]);
//!
//! let files: Vec<_> = fs
//!     .walk(Path::new("tmpl/pages"))
//!     .unwrap()
//!     .into_iter()
//!     .filter(|e| !e.is_dir)
//!     .collect();
//! assert_eq!(files.len(), 1);
//! assert_eq!(fs.read(&files[0].path).unwrap(), b"home");
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

use walkdir::WalkDir;

/// One entry yielded by [`FileSystem::walk`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEntry {
    /// Entry path, prefixed by the walk root.
    pub path: PathBuf,
    /// Whether the entry is a directory.
    pub is_dir: bool,
    /// Last modification time, if the backing store records one.
    pub modified: Option<SystemTime>,
}

/// Storage backend used by template discovery.
pub trait FileSystem: Send + Sync + fmt::Debug {
    /// Walks `root` recursively, depth-first.
    fn walk(&self, root: &Path) -> io::Result<Vec<WalkEntry>>;

    /// Reads the whole content of the file at `path`.
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;
}

/// The native filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn walk(&self, root: &Path) -> io::Result<Vec<WalkEntry>> {
        let mut entries = Vec::new();
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry?;
            let modified = entry.metadata().ok().and_then(|m| m.modified().ok());
            entries.push(WalkEntry {
                path: entry.path().to_path_buf(),
                is_dir: entry.file_type().is_dir(),
                modified,
            });
        }
        Ok(entries)
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }
}

/// An in-memory file tree, typically filled from `include_str!`/`include_bytes!`.
///
/// Directories are implied by file paths. `.` components are ignored, so
/// `./tmpl/page.html` and `tmpl/page.html` name the same file.
#[derive(Clone)]
pub struct EmbeddedFileSystem {
    files: BTreeMap<PathBuf, Vec<u8>>,
    modified: SystemTime,
}

impl fmt::Debug for EmbeddedFileSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbeddedFileSystem")
            .field("files", &self.files.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for EmbeddedFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl EmbeddedFileSystem {
    /// Creates an empty embedded filesystem.
    pub fn new() -> Self {
        Self {
            files: BTreeMap::new(),
            modified: SystemTime::now(),
        }
    }

    /// Creates an embedded filesystem from `(path, content)` pairs.
    pub fn from_entries(entries: &[(&str, &str)]) -> Self {
        let mut fs = Self::new();
        for (path, content) in entries {
            fs.insert(path, content.as_bytes().to_vec());
        }
        fs
    }

    /// Adds (or replaces) a file.
    pub fn insert(&mut self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        self.files.insert(normalize(path.as_ref()), content.into());
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with_file(mut self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) -> Self {
        self.insert(path, content);
        self
    }

    /// Number of files stored.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Returns true if no files are stored.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FileSystem for EmbeddedFileSystem {
    fn walk(&self, root: &Path) -> io::Result<Vec<WalkEntry>> {
        let root = normalize(root);

        if self.files.contains_key(&root) {
            return Ok(vec![self.entry(root, false)]);
        }

        let mut entries = vec![self.entry(root.clone(), true)];
        let mut seen_dirs = BTreeSet::new();
        let mut found = false;

        for path in self.files.keys() {
            let Ok(relative) = path.strip_prefix(&root) else {
                continue;
            };
            if relative.as_os_str().is_empty() {
                continue;
            }
            found = true;

            // Emit implied directories between the root and the file.
            let mut dir = root.clone();
            let components: Vec<_> = relative.components().collect();
            for component in &components[..components.len() - 1] {
                dir.push(component);
                if seen_dirs.insert(dir.clone()) {
                    entries.push(self.entry(dir.clone(), true));
                }
            }
            entries.push(self.entry(path.clone(), false));
        }

        if !found {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{}: no such directory", root.display()),
            ));
        }
        Ok(entries)
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.files.get(&normalize(path)).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("{}: no such file", path.display()),
            )
        })
    }
}

impl EmbeddedFileSystem {
    fn entry(&self, path: PathBuf, is_dir: bool) -> WalkEntry {
        WalkEntry {
            path,
            is_dir,
            modified: Some(self.modified),
        }
    }
}

fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}
