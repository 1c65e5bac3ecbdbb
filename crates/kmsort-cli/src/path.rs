//! Input discovery and mirrored output paths.

use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// Lists the files to process: `root` itself, or every file below it.
pub fn collect_inputs(root: &Path) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    let metadata = std::fs::metadata(root)
        .map_err(|e| format!("Cannot open path {}: {}", root.display(), e))?;
    if !metadata.is_dir() {
        return Ok(vec![root.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Location of `input` inside `out_dir`, keeping only the normal components
/// so absolute or `..` paths cannot escape the output tree.
pub fn mirrored_path(out_dir: &Path, input: &Path) -> PathBuf {
    let mut target = out_dir.to_path_buf();
    for component in input.components() {
        if let Component::Normal(part) = component {
            target.push(part);
        }
    }
    target
}
