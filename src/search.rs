//! Staged search across unit names, folder names, and folder contents.
//!
//! One recursive walk of the originals root feeds three ordered phases:
//!
//! 1. **Name phase** — units whose name contains the query
//!    (case-insensitive substring) become unit hits.
//! 2. **Folder phase** — folders whose name matches become folder hits
//!    (sentinel label, mtime 0) and are recorded as matched.
//! 3. **Expansion phase** — every eligible image directly inside a matched
//!    folder becomes a unit hit, unless phase 1 already emitted its path.
//!
//! Final order: folder hits before unit hits, then descending mtime. Folder
//! hits all carry mtime 0, so the stable sort preserves their emission
//! order relative to each other.
//!
//! Search never takes the write lock; results racing a mutation may miss
//! or double-see an entry mid-rename, which the next query corrects.

use crate::catalog::{Catalog, has_allowed_extension, mtime_secs, rel_str};
use crate::listing;
use crate::store;
use serde::Serialize;
use std::collections::HashSet;
use tracing::warn;
use walkdir::WalkDir;

/// Label carried by folder hits, marking them as folder matches.
pub const FOLDER_MATCH_LABEL: &str = "📁 folder match";

/// One search result: either a unit hit or a folder hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub name: String,
    pub path: String,
    pub label: String,
    pub modified: u64,
    pub is_dir: bool,
}

/// Run the staged search. An empty (or whitespace-only) query is an empty
/// result, not an error.
pub fn search(catalog: &Catalog, query: &str) -> Vec<SearchHit> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }

    let root = catalog.originals_root().to_path_buf();
    let entries: Vec<walkdir::DirEntry> = WalkDir::new(&root)
        .min_depth(1)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(err) => {
                warn!(error = %err, "search walk error, entry skipped");
                None
            }
        })
        .collect();

    let mut hits = Vec::new();
    let mut seen = HashSet::new();

    // Phase 1: unit names.
    for entry in &entries {
        let path = entry.path();
        if !entry.file_type().is_file() || !has_allowed_extension(path) {
            continue;
        }
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        if !name.to_lowercase().contains(&needle) {
            continue;
        }
        let rel = path.strip_prefix(&root).map(rel_str).unwrap_or_default();
        seen.insert(rel.clone());
        hits.push(SearchHit {
            name,
            path: rel,
            label: store::read_label(path),
            modified: mtime_secs(path),
            is_dir: false,
        });
    }

    // Phase 2: folder names.
    let mut matched_folders = Vec::new();
    for entry in &entries {
        let path = entry.path();
        if !entry.file_type().is_dir() {
            continue;
        }
        let name = path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        if !name.to_lowercase().contains(&needle) {
            continue;
        }
        matched_folders.push(path.to_path_buf());
        hits.push(SearchHit {
            name,
            path: path.strip_prefix(&root).map(rel_str).unwrap_or_default(),
            label: FOLDER_MATCH_LABEL.to_string(),
            modified: 0,
            is_dir: true,
        });
    }

    // Phase 3: expand matched folders, dedup by path.
    for folder in &matched_folders {
        for unit in listing::units_in_dir(catalog, folder) {
            if !seen.insert(unit.path.clone()) {
                continue;
            }
            hits.push(SearchHit {
                name: unit.name,
                path: unit.path,
                label: unit.label,
                modified: unit.modified,
                is_dir: false,
            });
        }
    }

    // Folder hits first, then newest units; the sort is stable so equal
    // keys keep their phase-emission order.
    hits.sort_by(|a, b| b.is_dir.cmp(&a.is_dir).then(b.modified.cmp(&a.modified)));
    hits
}
