//! Shared catalog state: root directories, the write lock, and the error
//! taxonomy.
//!
//! A [`Catalog`] is the pair of directories everything else operates on —
//! the originals root (the authoritative folder/unit tree) and the
//! thumbnails root (a mirrored cache of derived images) — plus the single
//! process-wide mutual-exclusion lock that serializes mutations.
//!
//! ## Locking
//!
//! The lock is owned here and injected by reference into the store and the
//! thumbnail cache; its lifetime is the process lifetime. It serializes
//! thumbnail write sections, unit create/update/delete, and folder rename,
//! because a rename racing a thumbnail regeneration could read a source
//! mid-move. Read paths (listing, tree building, search, freshness probes)
//! never take it: a reader that loses a race with a delete simply reports
//! `NotFound`.
//!
//! ## Path resolution
//!
//! [`Catalog::resolve`] is the traversal guard. It is purely lexical —
//! `..` components are folded without touching the filesystem — so a
//! hostile path is rejected before any disk access.

use std::path::{Component, Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;

/// Extensions a unit image may carry, lowercase.
pub const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "bmp", "gif"];

/// True if `path` has an extension from the unit allow-set.
pub fn has_allowed_extension(path: &Path) -> bool {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    ALLOWED_EXTENSIONS.contains(&ext.as_str())
}

/// Typed failures for every catalog operation.
///
/// Each variant maps to a stable machine-readable kind (see
/// [`CatalogError::kind`]); the routing layer turns them into HTTP statuses.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("invalid path: {0:?}")]
    InvalidPath(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("already exists: {0}")]
    Conflict(String),
    #[error("failed to decode {path}: {reason}")]
    Decode { path: String, reason: String },
    #[error("thumbnail generation failed for {path}: {reason}")]
    Generation { path: String, reason: String },
    #[error("filesystem error: {0}")]
    Write(#[from] std::io::Error),
}

impl CatalogError {
    /// Stable identifier carried in error responses.
    pub fn kind(&self) -> &'static str {
        match self {
            CatalogError::InvalidPath(_) => "invalid_path",
            CatalogError::NotFound(_) => "not_found",
            CatalogError::Conflict(_) => "conflict",
            CatalogError::Decode { .. } => "decode_error",
            CatalogError::Generation { .. } => "generation_failed",
            CatalogError::Write(_) => "write_failure",
        }
    }
}

/// The originals/thumbnails root pair and the process-wide write lock.
#[derive(Debug)]
pub struct Catalog {
    originals: PathBuf,
    thumbs: PathBuf,
    write_lock: Mutex<()>,
}

impl Catalog {
    pub fn new(originals: impl Into<PathBuf>, thumbs: impl Into<PathBuf>) -> Self {
        Self {
            originals: originals.into(),
            thumbs: thumbs.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn originals_root(&self) -> &Path {
        &self.originals
    }

    pub fn thumbs_root(&self) -> &Path {
        &self.thumbs
    }

    /// Create both roots if missing. Called once at startup.
    pub fn ensure_roots(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.originals)?;
        std::fs::create_dir_all(&self.thumbs)
    }

    /// Acquire the process-wide write lock.
    ///
    /// A poisoned lock is recovered rather than propagated: the guarded
    /// sections leave no in-memory state behind, so a panicking holder
    /// cannot corrupt anything a later holder would see.
    pub fn lock_writes(&self) -> MutexGuard<'_, ()> {
        self.write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Normalize a request-supplied relative path, rejecting escapes.
    ///
    /// Accepts `/`-separated input with optional surrounding slashes;
    /// backslashes are treated as separators too, so a Windows-style
    /// traversal cannot hide inside a single component. `.` components are
    /// dropped and `..` components are folded lexically; anything that
    /// would climb above the root — as well as absolute paths and drive
    /// prefixes — is a [`CatalogError::InvalidPath`]. No filesystem access
    /// happens here.
    pub fn clean_rel(&self, rel: &str) -> Result<PathBuf, CatalogError> {
        let normalized = rel.replace('\\', "/");
        let trimmed = normalized.trim_matches('/');
        let mut clean = PathBuf::new();
        let mut depth = 0usize;

        for comp in Path::new(trimmed).components() {
            match comp {
                Component::Normal(part) => {
                    clean.push(part);
                    depth += 1;
                }
                Component::CurDir => {}
                Component::ParentDir => {
                    if depth == 0 {
                        return Err(CatalogError::InvalidPath(rel.to_string()));
                    }
                    clean.pop();
                    depth -= 1;
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(CatalogError::InvalidPath(rel.to_string()));
                }
            }
        }

        Ok(clean)
    }

    /// Resolve a request-supplied relative path against the originals root.
    pub fn resolve(&self, rel: &str) -> Result<PathBuf, CatalogError> {
        Ok(self.originals.join(self.clean_rel(rel)?))
    }
}

/// Slash-separated form of a root-relative path, as used in wire shapes
/// and as the stable unit identifier.
pub(crate) fn rel_str(rel: &Path) -> String {
    rel.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Modification time of `path` as unix seconds, 0 when unreadable.
///
/// Listing and search decorate entries with mtimes; an entry whose mtime
/// cannot be read still lists, it just sorts as epoch.
pub(crate) fn mtime_secs(path: &Path) -> u64 {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn catalog() -> (TempDir, Catalog) {
        let tmp = TempDir::new().unwrap();
        let catalog = Catalog::new(tmp.path().join("images"), tmp.path().join("thumbnails"));
        catalog.ensure_roots().unwrap();
        (tmp, catalog)
    }

    #[test]
    fn allowed_extensions_case_insensitive() {
        assert!(has_allowed_extension(Path::new("a/b.PNG")));
        assert!(has_allowed_extension(Path::new("a/b.jpeg")));
        assert!(!has_allowed_extension(Path::new("a/b.txt")));
        assert!(!has_allowed_extension(Path::new("a/noext")));
    }

    #[test]
    fn resolve_plain_nested_path() {
        let (_tmp, c) = catalog();
        let p = c.resolve("heroes/blaze.png").unwrap();
        assert_eq!(p, c.originals_root().join("heroes/blaze.png"));
    }

    #[test]
    fn resolve_trims_surrounding_slashes() {
        let (_tmp, c) = catalog();
        assert_eq!(
            c.resolve("/heroes/").unwrap(),
            c.originals_root().join("heroes")
        );
    }

    #[test]
    fn resolve_folds_interior_parent_components() {
        let (_tmp, c) = catalog();
        assert_eq!(
            c.resolve("heroes/../villains/doom.png").unwrap(),
            c.originals_root().join("villains/doom.png")
        );
    }

    #[test]
    fn resolve_rejects_escape_above_root() {
        let (_tmp, c) = catalog();
        assert!(matches!(
            c.resolve("../outside.png"),
            Err(CatalogError::InvalidPath(_))
        ));
        assert!(matches!(
            c.resolve("heroes/../../outside.png"),
            Err(CatalogError::InvalidPath(_))
        ));
    }

    #[test]
    fn backslashes_are_separators() {
        let (_tmp, c) = catalog();
        assert_eq!(
            c.resolve("heroes\\blaze.png").unwrap(),
            c.originals_root().join("heroes/blaze.png")
        );
        assert!(matches!(
            c.resolve("..\\outside.png"),
            Err(CatalogError::InvalidPath(_))
        ));
    }

    #[test]
    fn leading_slash_treated_as_relative() {
        // Clients sometimes send rooted-looking paths; they stay inside the
        // catalog rather than escaping to the real filesystem root.
        let (_tmp, c) = catalog();
        assert_eq!(
            c.resolve("/etc/passwd").unwrap(),
            c.originals_root().join("etc/passwd")
        );
    }

    #[test]
    fn empty_path_resolves_to_root() {
        let (_tmp, c) = catalog();
        assert_eq!(c.resolve("").unwrap(), c.originals_root());
    }

    #[test]
    fn error_kinds_are_stable() {
        assert_eq!(CatalogError::InvalidPath("x".into()).kind(), "invalid_path");
        assert_eq!(CatalogError::NotFound("x".into()).kind(), "not_found");
        assert_eq!(CatalogError::Conflict("x".into()).kind(), "conflict");
        assert_eq!(
            CatalogError::Write(std::io::Error::other("boom")).kind(),
            "write_failure"
        );
    }

    #[test]
    fn mtime_secs_zero_for_missing_file() {
        assert_eq!(mtime_secs(Path::new("/definitely/not/here")), 0);
    }
}
