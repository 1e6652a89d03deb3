//! # picshelf
//!
//! A local catalog server for labeled image sets. Your filesystem is the
//! data source: directories under the originals root are folders, each unit
//! is an image file plus an optional same-named `.txt` label beside it, and
//! a mirrored thumbnails directory caches derived previews.
//!
//! # Architecture
//!
//! Everything operates on one shared root pair:
//!
//! ```text
//! request ──► api ──► store / listing / search / thumbs ──► filesystem
//!                         │                        │
//!                         └── naming, imaging ◄────┘
//! ```
//!
//! There is no database and no index: the tree on disk is the catalog, and
//! every read rebuilds its answer from the filesystem. That keeps the
//! system trivially inspectable (point a file manager at the roots) and
//! means external edits — dropping a folder of images in place — are picked
//! up on the next request with no import step.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`catalog`] | Shared root pair, process-wide write lock, path-traversal guard, error taxonomy |
//! | [`naming`] | Filename sanitizer applied to all user-supplied names |
//! | [`imaging`] | Thumbnail rendering: decode, flatten onto white, bounded Lanczos3 resize, JPEG encode |
//! | [`thumbs`] | On-disk thumbnail cache: mtime freshness, double-checked locking, warm-up walk |
//! | [`store`] | Unit and folder CRUD with rename/delete cascades across image, label, and thumbnail |
//! | [`listing`] | Folder tree and per-folder paginated unit listing |
//! | [`search`] | Staged search: unit names, folder names, matched-folder expansion |
//! | [`api`] | HTTP routing layer mapping URLs onto catalog operations |
//!
//! # Design Decisions
//!
//! ## One Write Lock, Unlocked Reads
//!
//! A single process-wide mutex serializes every mutation: thumbnail
//! regeneration, unit create/update/delete, folder rename. Reads never take
//! it. A listing racing a rename can observe an in-between state and a
//! request can lose a benign race with a delete and report `NotFound` —
//! accepted in exchange for reads that never queue behind image encoding.
//! The thumbnail path double-checks freshness after acquiring the lock, so
//! the common already-fresh case stays entirely lock-free.
//!
//! ## Mtime-Invalidated Thumbnail Cache
//!
//! A cache entry is valid iff it exists and is at least as new as its
//! source. No manifest, no hashes: the invalidation input is the same
//! filesystem metadata the catalog already lives on, and deleting the
//! thumbnails root is always safe (everything regenerates lazily, or
//! eagerly via the startup warm-up walk).
//!
//! ## Best-Effort Multi-Artifact Writes
//!
//! A unit spans up to three files (image, label, thumbnail). Writes are
//! ordered and compensating rather than transactional: create rolls back
//! the image when the label write fails; update and delete surface errors
//! mid-cascade and leave the remainder to a retry. The failure windows are
//! documented on each store operation.

pub mod api;
pub mod catalog;
pub mod imaging;
pub mod listing;
pub mod naming;
pub mod search;
pub mod store;
pub mod thumbs;

#[cfg(test)]
pub(crate) mod test_helpers;
