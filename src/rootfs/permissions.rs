//! Permission normalization for staged trees.
//!
//! Base images sometimes ship files without the execute bits hook scripts
//! need. Every regular file gets `0755`, except anything below a directory
//! named `dev`, `proc` or `sys`, which is never descended into.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use walkdir::{DirEntry, WalkDir};

use crate::error::{BuildError, Result};

/// Mode applied to every regular file.
pub const NORMALIZED_MODE: u32 = 0o755;

/// Directory names whose subtrees are left untouched.
pub const PSEUDO_FS_DIRS: [&str; 3] = ["dev", "proc", "sys"];

fn is_pseudo_fs(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| PSEUDO_FS_DIRS.contains(&name))
}

/// Set every regular file under `root` to [`NORMALIZED_MODE`].
///
/// Returns the number of files updated.
pub fn normalize_permissions(root: &Path) -> Result<usize> {
    let mut updated = 0;
    for entry in WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| !is_pseudo_fs(e))
    {
        let entry = entry.map_err(|e| BuildError::Staging(format!("walking tree: {}", e)))?;
        if !entry.file_type().is_file() {
            continue;
        }
        fs::set_permissions(entry.path(), fs::Permissions::from_mode(NORMALIZED_MODE)).map_err(
            |e| BuildError::Staging(format!("chmod {}: {}", entry.path().display(), e)),
        )?;
        updated += 1;
    }
    tracing::debug!(updated, root = %root.display(), "normalized permissions");
    Ok(updated)
}
