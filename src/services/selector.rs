//! Stage 1: copy the allow-listed sources into a fresh output directory.

use anyhow::{Context, Result};
use camino::Utf8Path;
use std::fs;

/// Outcome of copying the allow-list into an output directory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionReport {
    /// File names copied, in allow-list order
    pub copied: Vec<String>,
    /// Allow-listed names absent from the input directory
    pub missing: Vec<String>,
}

/// Delete `output_dir` if it exists and recreate it empty, parents included.
pub fn recreate_dir(output_dir: &Utf8Path) -> Result<()> {
    if output_dir.exists() {
        fs::remove_dir_all(output_dir)
            .with_context(|| format!("Failed to remove output directory: {}", output_dir))?;
        tracing::debug!("Removed existing output directory: {}", output_dir);
    }

    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory: {}", output_dir))?;

    Ok(())
}

/// Recreate `output_dir` and copy every allow-listed file from `input_dir`.
///
/// A missing source is logged and skipped. A failed copy aborts the selection.
pub fn select_files<S: AsRef<str>>(
    input_dir: &Utf8Path,
    output_dir: &Utf8Path,
    allow_list: &[S],
) -> Result<SelectionReport> {
    recreate_dir(output_dir)?;

    tracing::info!("copying relevant help content files");
    let mut report = SelectionReport::default();

    for file_name in allow_list {
        let file_name = file_name.as_ref();
        let origin = input_dir.join(file_name);
        let destination = output_dir.join(file_name);

        if !origin.is_file() {
            tracing::warn!("required file {} is missing", origin);
            report.missing.push(file_name.to_string());
            continue;
        }

        fs::copy(&origin, &destination)
            .with_context(|| format!("Failed to copy {} to {}", origin, destination))?;
        tracing::debug!("copied {}", file_name);
        report.copied.push(file_name.to_string());
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use tempfile::TempDir;

    fn utf8_dir(temp_dir: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap()
    }

    #[test]
    fn test_recreate_dir_empties_existing_output() {
        let temp_dir = TempDir::new().unwrap();
        let output = utf8_dir(&temp_dir).join("out/en-US");
        fs::create_dir_all(&output).unwrap();
        fs::write(output.join("stale.xml"), "<old/>").unwrap();

        recreate_dir(&output).unwrap();

        assert!(output.is_dir());
        assert_eq!(fs::read_dir(&output).unwrap().count(), 0);
    }

    #[test]
    fn test_only_allow_listed_files_are_copied() {
        let temp_dir = TempDir::new().unwrap();
        let root = utf8_dir(&temp_dir);
        let input = root.join("in");
        let output = root.join("out");
        fs::create_dir_all(&input).unwrap();
        fs::write(input.join("A.xml"), "<a/>").unwrap();
        fs::write(input.join("Unlisted.xml"), "<u/>").unwrap();

        let report = select_files(&input, &output, &["A.xml"]).unwrap();

        assert_eq!(report.copied, vec!["A.xml".to_string()]);
        assert!(output.join("A.xml").exists());
        assert!(!output.join("Unlisted.xml").exists());
    }
}
