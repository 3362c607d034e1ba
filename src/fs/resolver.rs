//! URL path to filesystem path resolution.
//!
//! The rules run in a fixed order: percent-decode, cut the query string at the
//! first `?`, append `index.html` to directory URLs, drop one leading `/`, and
//! join the result onto the document root.
//!
//! The traversal check is deliberately blunt: any joined path containing
//! `/..` is refused, even when it would normalise back inside the root.

use std::fs;
use std::path::{Path, PathBuf};

use percent_encoding::percent_decode_str;

use crate::error::HandlerError;

const INDEX_FILE: &str = "index.html";
const TRAVERSAL_MARKER: &str = "/..";
const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Result of resolving one request resource against the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    pub path: PathBuf,
    /// A regular file exists at `path`
    pub exists: bool,
    pub outside_root: bool,
    /// File size in bytes; 0 unless `exists`
    pub len: u64,
}

impl ResolvedPath {
    /// Classifies the path: escaping the root wins over absence.
    pub fn check(&self) -> Result<&Self, HandlerError> {
        if self.outside_root {
            return Err(HandlerError::PathEscapesRoot(self.path.clone()));
        }
        if !self.exists {
            return Err(HandlerError::ResourceAbsent(self.path.clone()));
        }
        Ok(self)
    }

    /// MIME type guessed from the file extension.
    pub fn content_type(&self) -> String {
        mime_guess::from_path(&self.path)
            .first_raw()
            .unwrap_or(FALLBACK_CONTENT_TYPE)
            .to_string()
    }
}

/// Applies the decoding, query, index and leading-slash rules, yielding the
/// path relative to the root.
///
/// # Example
///
/// ```
/// # use static_httpd::fs::resolver::document_path;
/// assert_eq!(document_path("/docs/?page=2"), "docs/index.html");
/// assert_eq!(document_path("/a%20b.txt"), "a b.txt");
/// ```
pub fn document_path(resource: &str) -> String {
    let decoded = percent_decode_str(resource).decode_utf8_lossy();

    let mut path = match decoded.split_once('?') {
        Some((path, _query)) => path.to_string(),
        None => decoded.into_owned(),
    };

    if path.ends_with('/') {
        path.push_str(INDEX_FILE);
    }

    match path.strip_prefix('/') {
        Some(rest) => rest.to_string(),
        None => path,
    }
}

/// Maps request resources onto files below a fixed document root.
#[derive(Debug, Clone)]
pub struct Resolver {
    root: PathBuf,
}

impl Resolver {
    /// `root` is expected to be absolute; configuration canonicalises it.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The joined absolute path for `resource`, without touching the
    /// filesystem.
    pub fn candidate(&self, resource: &str) -> PathBuf {
        self.root.join(document_path(resource))
    }

    /// Whether `path` must be refused as escaping the root.
    ///
    /// Besides the `/..` marker, a path that no longer starts with the root
    /// is refused too; joining an absolute component (`GET //etc/passwd`)
    /// replaces the root entirely.
    pub fn is_outside_root(&self, path: &Path) -> bool {
        path.to_string_lossy().contains(TRAVERSAL_MARKER) || !path.starts_with(&self.root)
    }

    pub fn resolve(&self, resource: &str) -> ResolvedPath {
        let path = self.candidate(resource);
        let outside_root = self.is_outside_root(&path);

        // Directories (no trailing slash) and unreadable entries count as absent
        let len = if outside_root {
            None
        } else {
            fs::metadata(&path).ok().filter(|m| m.is_file()).map(|m| m.len())
        };

        ResolvedPath {
            exists: len.is_some(),
            len: len.unwrap_or(0),
            outside_root,
            path,
        }
    }
}
