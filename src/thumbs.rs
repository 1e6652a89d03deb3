//! Thumbnail cache: mtime-invalidated, lazily filled, mirrored on disk.
//!
//! The thumbnails root mirrors the originals tree; a unit's cache entry is
//! its sanitized relative path with the extension swapped to `.jpg`. An
//! entry is valid iff it exists and its mtime is at or after the source's —
//! anything else is stale and regenerated before being served.
//!
//! # Locking
//!
//! The common case — entry exists and is fresh — is served from an
//! unlocked read path. Only the regeneration section takes the catalog
//! write lock, and re-checks freshness after acquiring it: a caller that
//! waited on the lock usually finds the entry already regenerated by
//! whoever held it. Writes go through a temp file in the target directory
//! and a rename, so a half-written entry is never observable.
//!
//! This module owns thumbnail artifacts exclusively. The store never writes
//! them; it only instructs [`remove_entry`] / [`mirror_dir`] during its
//! rename and delete cascades.

use crate::catalog::{Catalog, CatalogError, has_allowed_extension};
use crate::imaging::{self, THUMB_QUALITY};
use crate::naming;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Extension of every cache entry; thumbnails are always JPEG.
pub const THUMB_EXT: &str = "jpg";

/// Cache-entry path for a unit, relative to the thumbnails root.
///
/// Each component is sanitized and the extension is replaced by
/// [`THUMB_EXT`]. Folder and unit names are sanitized at creation time, so
/// for catalog-created content this mirrors the originals tree exactly.
pub(crate) fn entry_rel(rel: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for comp in rel.components() {
        if let Component::Normal(part) = comp {
            out.push(naming::sanitize(&part.to_string_lossy()));
        }
    }
    out.set_extension(THUMB_EXT);
    out
}

/// Thumbnails-root mirror of a folder path (sanitized, no extension swap).
///
/// Used by the store when renaming a folder to move the cached subtree
/// along with the originals.
pub(crate) fn mirror_dir(catalog: &Catalog, rel: &Path) -> PathBuf {
    let mut out = catalog.thumbs_root().to_path_buf();
    for comp in rel.components() {
        if let Component::Normal(part) = comp {
            out.push(naming::sanitize(&part.to_string_lossy()));
        }
    }
    out
}

/// Delete the cache entry for a unit, if present.
///
/// Store-driven cascades only (unit rename/delete); missing entries are not
/// an error.
pub(crate) fn remove_entry(catalog: &Catalog, rel: &Path) -> std::io::Result<()> {
    let entry = catalog.thumbs_root().join(entry_rel(rel));
    match fs::remove_file(&entry) {
        Ok(()) => {
            debug!(entry = %entry.display(), "removed cached thumbnail");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// True if `entry` exists and is at least as new as `source`.
fn is_fresh(entry: &Path, source: &Path) -> bool {
    let Ok(entry_mtime) = fs::metadata(entry).and_then(|m| m.modified()) else {
        return false;
    };
    let Ok(source_mtime) = fs::metadata(source).and_then(|m| m.modified()) else {
        return false;
    };
    entry_mtime >= source_mtime
}

/// Return the on-disk path of a fresh thumbnail for `unit_path`,
/// regenerating it first if missing or stale.
///
/// The freshness probe runs without the lock; regeneration takes it and
/// re-checks before doing any work (double-checked locking). Errors:
/// [`CatalogError::InvalidPath`] before any filesystem access for paths
/// escaping the root, [`CatalogError::NotFound`] for a missing source,
/// [`CatalogError::Decode`]/[`CatalogError::Generation`] for a source or
/// encode failure — in which case no partial cache file is left behind.
pub fn get_or_create(catalog: &Catalog, unit_path: &str) -> Result<PathBuf, CatalogError> {
    let rel = catalog.clean_rel(unit_path)?;
    let source = catalog.originals_root().join(&rel);
    if !source.is_file() {
        return Err(CatalogError::NotFound(unit_path.to_string()));
    }

    let entry = catalog.thumbs_root().join(entry_rel(&rel));
    let entry_dir = entry
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| catalog.thumbs_root().to_path_buf());
    fs::create_dir_all(&entry_dir)?;

    // Fast path: no lock for the common already-fresh case.
    if is_fresh(&entry, &source) {
        return Ok(entry);
    }

    let _guard = catalog.lock_writes();
    // Another caller may have regenerated while this one waited.
    if is_fresh(&entry, &source) {
        return Ok(entry);
    }

    let img = imaging::render_thumbnail(&source)?;
    persist_atomic(&img, &entry, &entry_dir)?;
    debug!(entry = %entry.display(), "thumbnail regenerated");
    Ok(entry)
}

/// Encode and move into place; the entry path never holds partial output.
fn persist_atomic(
    img: &image::DynamicImage,
    entry: &Path,
    entry_dir: &Path,
) -> Result<(), CatalogError> {
    let gen_err = |reason: String| CatalogError::Generation {
        path: entry.display().to_string(),
        reason,
    };

    let mut buf = Vec::new();
    imaging::encode_jpeg(img, &mut buf, THUMB_QUALITY).map_err(|e| gen_err(e.to_string()))?;

    let mut tmp = NamedTempFile::new_in(entry_dir).map_err(|e| gen_err(e.to_string()))?;
    tmp.write_all(&buf).map_err(|e| gen_err(e.to_string()))?;
    tmp.persist(entry).map_err(|e| gen_err(e.to_string()))?;
    Ok(())
}

/// Counters from a [`warm_up`] pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WarmupStats {
    pub generated: u32,
    pub fresh: u32,
    pub failed: u32,
}

impl fmt::Display for WarmupStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} generated, {} fresh, {} failed",
            self.generated, self.fresh, self.failed
        )
    }
}

/// Pre-populate the cache for every eligible image under the originals root.
///
/// Runs once at startup on a background task, concurrently with request
/// handling — the lock is acquired per file inside [`get_or_create`], never
/// for the whole walk. Per-file failures are logged and counted; nothing
/// halts the walk.
pub fn warm_up(catalog: &Catalog) -> WarmupStats {
    let root = catalog.originals_root().to_path_buf();
    info!(root = %root.display(), "thumbnail warm-up started");

    let mut stats = WarmupStats::default();
    for entry in WalkDir::new(&root) {
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                warn!(error = %err, "warm-up walk error, subtree skipped");
                continue;
            }
        };
        if !entry.file_type().is_file() || !has_allowed_extension(entry.path()) {
            continue;
        }
        let Ok(rel) = entry.path().strip_prefix(&root) else {
            continue;
        };
        let rel_str = rel.to_string_lossy().replace('\\', "/");

        let already_fresh = is_fresh(&catalog.thumbs_root().join(entry_rel(rel)), entry.path());
        match get_or_create(catalog, &rel_str) {
            Ok(_) if already_fresh => stats.fresh += 1,
            Ok(_) => {
                stats.generated += 1;
                if stats.generated % 50 == 0 {
                    info!(generated = stats.generated, "thumbnail warm-up progress");
                }
            }
            Err(err) => {
                stats.failed += 1;
                warn!(path = %rel_str, error = %err, "thumbnail warm-up failed for file");
            }
        }
    }

    info!(%stats, "thumbnail warm-up finished");
    stats
}
