//! Directory traversal.

use anyhow::{bail, Context, Result};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::paths::has_library_extension;

/// Owner, group and other execute bits.
const EXECUTABLE_BITS: u32 = 0o111;

/// A regular file that may be a Mach-O binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub path: PathBuf,
    /// Any execute bit is set.
    pub executable: bool,
}

/// Visit every candidate file under `root`, depth first in file name order.
///
/// Candidates are regular files with an execute bit or a dynamic library
/// extension. Symbolic links are skipped, whatever they point to.
///
/// # Errors
///
/// Returns an error if `root` is not a directory, if part of the tree cannot
/// be read, or as soon as `callback` fails.
pub fn walk_tree<F>(root: &Path, mut callback: F) -> Result<()>
where
    F: FnMut(&Candidate) -> Result<()>,
{
    if !root.is_dir() {
        bail!("Not a directory: {}", root.display());
    }

    for entry in WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = entry.with_context(|| format!("Failed to walk {}", root.display()))?;
        let file_type = entry.file_type();
        if file_type.is_symlink() || !file_type.is_file() {
            continue;
        }

        let metadata = entry
            .metadata()
            .with_context(|| format!("Failed to read metadata: {}", entry.path().display()))?;
        let executable = metadata.permissions().mode() & EXECUTABLE_BITS != 0;

        if executable || has_library_extension(&entry.file_name().to_string_lossy()) {
            callback(&Candidate {
                path: entry.into_path(),
                executable,
            })?;
        }
    }

    Ok(())
}
