//! Catalog store: CRUD on units and folders.
//!
//! A unit on disk is an image file plus an optional same-stem `.txt` label
//! in the same directory. The store owns creation, rename and deletion of
//! both artifacts, and drives the thumbnail-cache cascades (old entries are
//! removed on rename/delete; the new path refills lazily).
//!
//! Mutations hold the catalog write lock so they cannot race thumbnail
//! regeneration reading source mtimes. Multi-artifact writes are
//! best-effort, not transactional: `create_unit` compensates by deleting
//! the image when the label write fails, but `update_unit` and
//! `delete_unit` can surface an error after some artifacts have already
//! moved — callers retry rather than roll back.

use crate::catalog::{Catalog, CatalogError, rel_str};
use crate::naming;
use crate::thumbs;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A unit as returned by [`get_unit`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitDetails {
    pub name: String,
    pub path: String,
    pub label: String,
}

/// Sibling label artifact for an image path.
fn label_path(image: &Path) -> PathBuf {
    image.with_extension("txt")
}

/// Read a label file, tolerating absence and unreadable content.
pub(crate) fn read_label(image: &Path) -> String {
    let txt = label_path(image);
    if !txt.exists() {
        return String::new();
    }
    match fs::read_to_string(&txt) {
        Ok(content) => content.trim().to_string(),
        Err(err) => {
            warn!(path = %txt.display(), error = %err, "label file unreadable");
            String::new()
        }
    }
}

/// Fetch a unit by its relative path.
pub fn get_unit(catalog: &Catalog, path: &str) -> Result<UnitDetails, CatalogError> {
    let rel = catalog.clean_rel(path)?;
    let full = catalog.originals_root().join(&rel);
    if !full.is_file() {
        return Err(CatalogError::NotFound(path.to_string()));
    }

    let name = full
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();

    Ok(UnitDetails {
        name,
        path: rel_str(&rel),
        label: read_label(&full),
    })
}

/// Create a unit: image artifact plus label artifact.
///
/// The name is sanitized and the image is always persisted as
/// `<name>.png`. Fails with `Conflict` when an image already exists at the
/// target path. If the label write fails after the image succeeded, the
/// image is deleted again (compensating rollback) so no half-created unit
/// remains. Returns the new unit's relative path.
pub fn create_unit(
    catalog: &Catalog,
    folder_path: &str,
    name: &str,
    label: &str,
    image_bytes: &[u8],
) -> Result<String, CatalogError> {
    let dir_rel = catalog.clean_rel(folder_path)?;
    let dir = catalog.originals_root().join(&dir_rel);
    fs::create_dir_all(&dir)?;

    let name = naming::sanitize(name);
    let image = dir.join(format!("{name}.png"));
    let unit_rel = rel_str(&dir_rel.join(format!("{name}.png")));

    if image.exists() {
        return Err(CatalogError::Conflict(unit_rel));
    }

    let _guard = catalog.lock_writes();
    fs::write(&image, image_bytes)?;

    if let Err(err) = fs::write(label_path(&image), label) {
        // Roll the image back rather than leaving an orphaned half-unit.
        if let Err(cleanup) = fs::remove_file(&image) {
            warn!(path = %image.display(), error = %cleanup, "rollback of image artifact failed");
        }
        return Err(err.into());
    }

    debug!(path = %unit_rel, "unit created");
    Ok(unit_rel)
}

/// Rename and/or relabel a unit.
///
/// A same-name update is not a rename: only the label file is rewritten.
/// An actual rename moves the image, moves the label if present, and drops
/// the stale thumbnail entry for the old path (the new path regenerates
/// lazily). Rename and label write are not atomic as a pair; an error
/// between them means "renamed but label may be unwritten" and the caller
/// should retry. Returns the unit's (possibly new) relative path.
pub fn update_unit(
    catalog: &Catalog,
    old_path: &str,
    new_name: &str,
    new_label: &str,
) -> Result<String, CatalogError> {
    let old_rel = catalog.clean_rel(old_path)?;
    let old_full = catalog.originals_root().join(&old_rel);
    if !old_full.is_file() {
        return Err(CatalogError::NotFound(old_path.to_string()));
    }

    let dir = old_full
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| catalog.originals_root().to_path_buf());
    let old_stem = old_full
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();

    let new_name = naming::sanitize(new_name);
    let new_filename = match old_full.extension() {
        Some(ext) => format!("{new_name}.{}", ext.to_string_lossy()),
        None => new_name.clone(),
    };
    let new_full = dir.join(&new_filename);

    let renaming = new_name != old_stem;
    if renaming && new_full.exists() && new_full != old_full {
        return Err(CatalogError::Conflict(new_filename));
    }

    let _guard = catalog.lock_writes();

    if renaming {
        fs::rename(&old_full, &new_full)?;

        let old_txt = label_path(&old_full);
        if old_txt.exists() {
            fs::rename(&old_txt, label_path(&new_full))?;
        }

        // The old cache entry can never become valid again.
        thumbs::remove_entry(catalog, &old_rel)?;
        debug!(from = %rel_str(&old_rel), to = %new_filename, "unit renamed");
    }

    let target = if renaming { &new_full } else { &old_full };
    fs::write(label_path(target), new_label)?;

    let mut new_rel = old_rel.clone();
    new_rel.set_file_name(&new_filename);
    Ok(rel_str(&new_rel))
}

/// Delete a unit: image, then label, then cached thumbnail.
///
/// Not transactional — a failure mid-sequence surfaces after earlier
/// artifacts are already gone.
pub fn delete_unit(catalog: &Catalog, path: &str) -> Result<(), CatalogError> {
    let rel = catalog.clean_rel(path)?;
    let full = catalog.originals_root().join(&rel);
    if !full.is_file() {
        return Err(CatalogError::NotFound(path.to_string()));
    }

    let _guard = catalog.lock_writes();
    fs::remove_file(&full)?;

    let txt = label_path(&full);
    if txt.exists() {
        fs::remove_file(&txt)?;
    }

    thumbs::remove_entry(catalog, &rel)?;
    debug!(path = %rel_str(&rel), "unit deleted");
    Ok(())
}

/// Create a folder (and any missing ancestors of the parent path).
///
/// Returns the new folder's relative path.
pub fn create_folder(catalog: &Catalog, parent_path: &str, name: &str) -> Result<String, CatalogError> {
    let parent_rel = catalog.clean_rel(parent_path)?;
    let name = naming::sanitize(name);
    let folder_rel = parent_rel.join(&name);
    let full = catalog.originals_root().join(&folder_rel);

    if full.exists() {
        return Err(CatalogError::Conflict(rel_str(&folder_rel)));
    }

    fs::create_dir_all(&full)?;
    debug!(path = %rel_str(&folder_rel), "folder created");
    Ok(rel_str(&folder_rel))
}

/// Rename a folder, moving the mirrored thumbnail subtree best-effort.
pub fn rename_folder(catalog: &Catalog, old_path: &str, new_path: &str) -> Result<(), CatalogError> {
    let old_rel = catalog.clean_rel(old_path)?;
    let new_rel = catalog.clean_rel(new_path)?;
    // Renaming the root itself is never meaningful.
    if old_rel.as_os_str().is_empty() || new_rel.as_os_str().is_empty() {
        return Err(CatalogError::InvalidPath(format!("{old_path} -> {new_path}")));
    }

    let old_full = catalog.originals_root().join(&old_rel);
    let new_full = catalog.originals_root().join(&new_rel);

    if !old_full.is_dir() {
        return Err(CatalogError::NotFound(old_path.to_string()));
    }
    if new_full.exists() {
        return Err(CatalogError::Conflict(new_path.to_string()));
    }

    let _guard = catalog.lock_writes();
    fs::rename(&old_full, &new_full)?;

    // Cached thumbnails just regenerate if this fails; don't fail the op.
    let old_mirror = thumbs::mirror_dir(catalog, &old_rel);
    if old_mirror.is_dir() {
        let new_mirror = thumbs::mirror_dir(catalog, &new_rel);
        let moved = new_mirror
            .parent()
            .map(fs::create_dir_all)
            .unwrap_or(Ok(()))
            .and_then(|_| fs::rename(&old_mirror, &new_mirror));
        if let Err(err) = moved {
            warn!(
                from = %old_mirror.display(),
                to = %new_mirror.display(),
                error = %err,
                "thumbnail subtree rename failed; entries will regenerate"
            );
        }
    }

    debug!(from = %rel_str(&old_rel), to = %rel_str(&new_rel), "folder renamed");
    Ok(())
}
