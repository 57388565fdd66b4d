//! Clobbering of SCons build output.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

/// Remove every `scons-out*` build tree under the checkout root.
///
/// Missing directories are fine; a fresh checkout has nothing to clobber.
pub fn remove_build_directories(checkout_root: &Path) -> Result<usize> {
    if !checkout_root.is_dir() {
        return Ok(0);
    }

    let mut removed = 0usize;
    for entry in fs::read_dir(checkout_root)
        .with_context(|| format!("reading checkout root '{}'", checkout_root.display()))?
    {
        let entry = entry.with_context(|| {
            format!("iterating checkout root '{}'", checkout_root.display())
        })?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|part| part.to_str()) else {
            continue;
        };
        if !name.starts_with("scons-out") {
            continue;
        }
        fs::remove_dir_all(&path)
            .with_context(|| format!("removing build directory '{}'", path.display()))?;
        removed += 1;
    }
    Ok(removed)
}
