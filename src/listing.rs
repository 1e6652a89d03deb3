//! Folder-tree building and per-folder unit listing.
//!
//! Read-only views over the originals root. Neither operation takes the
//! write lock: a listing racing a concurrent rename may observe a unit
//! mid-move, which surfaces as the unit missing from one of the two
//! listings — accepted, the next request sees the settled state.

use crate::catalog::{Catalog, CatalogError, has_allowed_extension, mtime_secs, rel_str};
use crate::store;
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::warn;

/// Default page size for unit listings.
pub const DEFAULT_PER_PAGE: usize = 50;

/// Hard cap on the page size.
pub const MAX_PER_PAGE: usize = 100;

/// A directory node in the catalog tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Folder {
    pub name: String,
    pub path: String,
    pub children: Vec<Folder>,
}

/// A unit decorated for listing: label and image mtime included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Unit {
    pub name: String,
    pub path: String,
    pub label: String,
    pub modified: u64,
}

/// Offset/limit pagination summary, as returned next to a unit page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: usize,
    pub per_page: usize,
    pub total: usize,
    pub has_more: bool,
}

/// Build the folder forest under the originals root.
///
/// Directories only, sorted by name at every level. A missing root yields
/// an empty forest; an unreadable directory is logged and its subtree
/// treated as empty rather than aborting the traversal.
pub fn build_tree(catalog: &Catalog) -> Vec<Folder> {
    build_subtree(catalog.originals_root(), catalog.originals_root())
}

fn build_subtree(dir: &Path, root: &Path) -> Vec<Folder> {
    if !dir.exists() {
        return Vec::new();
    }

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!(path = %dir.display(), error = %err, "directory unreadable, subtree skipped");
            return Vec::new();
        }
    };

    let mut subdirs: Vec<_> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    subdirs.sort_by_key(|p| p.file_name().map(|n| n.to_os_string()));

    subdirs
        .into_iter()
        .map(|p| {
            let name = p
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let path = p.strip_prefix(root).map(rel_str).unwrap_or_default();
            Folder {
                name,
                path,
                children: build_subtree(&p, root),
            }
        })
        .collect()
}

/// All units directly inside `dir` (non-recursive), sorted by filename.
///
/// Shared by the folder listing and the search expansion phase.
pub(crate) fn units_in_dir(catalog: &Catalog, dir: &Path) -> Vec<Unit> {
    if !dir.exists() {
        return Vec::new();
    }

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!(path = %dir.display(), error = %err, "directory unreadable, listing empty");
            return Vec::new();
        }
    };

    let mut images: Vec<_> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && has_allowed_extension(p))
        .collect();
    images.sort_by_key(|p| p.file_name().map(|n| n.to_os_string()));

    images
        .into_iter()
        .map(|p| {
            let name = p
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default();
            let path = p
                .strip_prefix(catalog.originals_root())
                .map(rel_str)
                .unwrap_or_default();
            let label = store::read_label(&p);
            let modified = mtime_secs(&p);
            Unit {
                name,
                path,
                label,
                modified,
            }
        })
        .collect()
}

/// List the units of one folder with offset/limit pagination.
///
/// `page` defaults to 1, `per_page` to [`DEFAULT_PER_PAGE`], capped at
/// [`MAX_PER_PAGE`]. A missing folder lists as empty.
pub fn list_units(
    catalog: &Catalog,
    folder_path: &str,
    page: Option<usize>,
    per_page: Option<usize>,
) -> Result<(Vec<Unit>, Pagination), CatalogError> {
    let rel = catalog.clean_rel(folder_path)?;
    let dir = catalog.originals_root().join(&rel);

    let all = units_in_dir(catalog, &dir);
    let total = all.len();

    let page = page.unwrap_or(1).max(1);
    let per_page = per_page.unwrap_or(DEFAULT_PER_PAGE).min(MAX_PER_PAGE);

    let start = (page - 1).saturating_mul(per_page).min(total);
    let end = start.saturating_add(per_page).min(total);
    let units = all[start..end].to_vec();

    Ok((
        units,
        Pagination {
            page,
            per_page,
            total,
            has_more: end < total,
        },
    ))
}
