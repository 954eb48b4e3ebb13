//! CLI-side helpers for directory enumeration and output-directory
//! creation — both named as external-collaborator concerns by
//! spec.md §1, carried here (not in the library modules) because the
//! bundled binary needs them, following
//! `KAPKEPOT-PIXIE/src/batch.rs::collect_image_paths`'s use of
//! `walkdir`.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::registry::CodecFormat;

/// Enumerate every file directly under `dir` (non-recursive — spec.md
/// §6's `batch` command has no `--recursive` flag) whose extension the
/// codec registry recognizes, in directory-entry order.
pub fn collect_image_paths(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut paths: Vec<PathBuf> = WalkDir::new(dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| CodecFormat::from_path(entry.path()).is_some())
        .map(|entry| entry.into_path())
        .collect();
    paths.sort();
    Ok(paths)
}

/// Create `dir` (and any missing parents) if it doesn't already
/// exist. Output directory creation is the CLI's responsibility per
/// spec.md §6, not the core's.
pub fn ensure_output_dir(dir: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)
}
