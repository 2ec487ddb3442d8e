use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

/// Regular files in `dir` with the given extension, sorted by file name.
///
/// Non-UTF-8 file names are skipped.
pub fn files_with_extension(dir: &Utf8Path, extension: &str) -> Result<Vec<Utf8PathBuf>> {
    let mut files = Vec::new();

    for entry in fs::read_dir(dir).with_context(|| format!("Failed to list directory: {}", dir))? {
        let entry = entry.with_context(|| format!("Failed to read entry in {}", dir))?;
        let Ok(path) = Utf8PathBuf::try_from(entry.path()) else {
            tracing::debug!("Skipping non UTF-8 path: {:?}", entry.path());
            continue;
        };
        if path.is_file() && path.extension() == Some(extension) {
            files.push(path);
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}
