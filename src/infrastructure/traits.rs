//! I/O boundary traits for testability
//!
//! These traits abstract the filesystem and template rendering, allowing the
//! generator to be tested with substitute implementations.

use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use glob::Pattern;
use walkdir::WalkDir;

use crate::domain::rule::filename_match_options;
use crate::domain::Bindings;
use crate::infrastructure::error::RenderError;

/// Filesystem abstraction for testability.
pub trait FileSystem: Send + Sync {
    /// Read file contents to string.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Write string content to file.
    fn write(&self, path: &Path, content: &str) -> io::Result<()>;

    /// Check if path exists.
    fn exists(&self, path: &Path) -> bool;

    /// Check if path is a file.
    fn is_file(&self, path: &Path) -> bool;

    /// Check if path is a directory.
    fn is_dir(&self, path: &Path) -> bool;

    /// Remove a file.
    fn remove_file(&self, path: &Path) -> io::Result<()>;

    /// Canonicalize path (resolve symlinks, make absolute).
    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf>;

    /// Last modification time.
    fn modified(&self, path: &Path) -> io::Result<SystemTime>;

    /// Files below `dir` whose name matches `pattern`.
    ///
    /// Returns `(containing directory, file name)` pairs sorted by path.
    /// Without `recursive` only the top level of `dir` is listed.
    fn find_files(
        &self,
        dir: &Path,
        pattern: &Pattern,
        recursive: bool,
    ) -> io::Result<Vec<(PathBuf, String)>>;
}

/// Template rendering collaborator.
pub trait TemplateRenderer: Send + Sync {
    /// Render the template at `template` (absolute path) with `bindings`.
    fn render(&self, template: &Path, bindings: &Bindings) -> Result<String, RenderError>;
}

// ============================================================
// REAL IMPLEMENTATIONS
// ============================================================

/// Real filesystem implementation.
#[derive(Debug, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn write(&self, path: &Path, content: &str) -> io::Result<()> {
        std::fs::write(path, content)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(path)
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        std::fs::canonicalize(path)
    }

    fn modified(&self, path: &Path) -> io::Result<SystemTime> {
        std::fs::metadata(path)?.modified()
    }

    fn find_files(
        &self,
        dir: &Path,
        pattern: &Pattern,
        recursive: bool,
    ) -> io::Result<Vec<(PathBuf, String)>> {
        if !dir.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("not a directory: {}", dir.display()),
            ));
        }

        let max_depth = if recursive { usize::MAX } else { 1 };
        let mut found = Vec::new();
        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(max_depth)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            // Symlinked files count, symlinked directories are not followed
            let is_file = entry.file_type().is_file()
                || (entry.path_is_symlink() && entry.path().is_file());
            if !is_file {
                continue;
            }
            let Some(name) = entry.file_name().to_str() else {
                continue;
            };
            if !pattern.matches_with(name, filename_match_options()) {
                continue;
            }
            let parent = entry.path().parent().unwrap_or(dir).to_path_buf();
            found.push((parent, name.to_string()));
        }
        Ok(found)
    }
}
