//! Input directory scan.
//!
//! Produces candidate files in lexicographic path order so that every later stage (and the merged
//! dataset) is independent of the order the OS happens to list directory entries in.

use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{IngestionError, IngestionResult};

/// Default extension filter.
pub const DEFAULT_EXTENSION: &str = "csv";

/// Enumerates candidate source files in an input directory.
#[derive(Debug, Clone)]
pub struct FileDiscovery {
    root: PathBuf,
    extension: String,
    recursive: bool,
}

impl FileDiscovery {
    /// Scan `root` for `*.csv` files (non-recursive).
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            extension: DEFAULT_EXTENSION.to_string(),
            recursive: false,
        }
    }

    /// Match files with this extension instead (case-insensitive, leading `.` optional).
    pub fn with_extension(mut self, extension: impl AsRef<str>) -> Self {
        self.extension = extension.as_ref().trim_start_matches('.').to_string();
        self
    }

    /// Also descend into subdirectories.
    ///
    /// Symlinks are followed. Subdirectories that cannot be read and symlink loops are logged and
    /// skipped; the rest of the tree is still scanned.
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Directory being scanned.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// List matching files, sorted by path.
    ///
    /// The whole listing is collected before it is returned, since sorting needs every entry.
    /// Symlinks whose name matches are listed even when their target is missing, so the failure
    /// shows up in the report as an unreadable file rather than as a silent omission.
    ///
    /// Fails with [`IngestionError::InputDirectoryNotFound`] if `root` is missing or not a
    /// directory. An empty match set is returned as an empty list.
    pub fn discover(&self) -> IngestionResult<Vec<PathBuf>> {
        if !self.root.is_dir() {
            return Err(IngestionError::InputDirectoryNotFound {
                path: self.root.clone(),
            });
        }
        if self.extension.is_empty() {
            return Err(IngestionError::Configuration {
                message: "extension filter must not be empty".to_string(),
            });
        }

        let mut files = if self.recursive {
            self.walk()?
        } else {
            self.glob()?
        };
        files.sort();

        debug!(
            "discovered {} '.{}' file(s) in {}",
            files.len(),
            self.extension,
            self.root.display()
        );
        Ok(files)
    }

    fn glob(&self) -> IngestionResult<Vec<PathBuf>> {
        let pattern = format!(
            "{}/*.{}",
            Pattern::escape(&self.root.to_string_lossy()),
            Pattern::escape(&self.extension)
        );
        let opts = MatchOptions {
            case_sensitive: false,
            require_literal_separator: true,
            require_literal_leading_dot: true,
        };

        let mut out = Vec::new();
        for entry in glob::glob_with(&pattern, opts)? {
            let path = entry.map_err(|e| IngestionError::Io(e.into()))?;
            if path.is_file() || (is_symlink(&path) && !path.is_dir()) {
                out.push(path);
            }
        }
        Ok(out)
    }

    fn walk(&self) -> IngestionResult<Vec<PathBuf>> {
        let mut out = Vec::new();
        let walker = WalkDir::new(&self.root)
            .follow_links(true)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name()));
        for entry in walker {
            match entry {
                Ok(entry) => {
                    if entry.file_type().is_file() && self.matches_extension(entry.path()) {
                        out.push(entry.into_path());
                    }
                }
                Err(err) => match err.path() {
                    Some(path)
                        if is_symlink(path)
                            && self.matches_extension(path)
                            && !path.file_name().is_some_and(is_hidden) =>
                    {
                        out.push(path.to_path_buf());
                    }
                    _ => warn!("skipping entry under {}: {err}", self.root.display()),
                },
            }
        }
        Ok(out)
    }

    fn matches_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(&self.extension))
    }
}

fn is_symlink(path: &Path) -> bool {
    path.symlink_metadata().is_ok_and(|m| m.file_type().is_symlink())
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().is_some_and(|s| s.starts_with('.'))
}
