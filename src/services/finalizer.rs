//! Stage 5: replace outside-link markers, resolve again, drop the entity file,
//! and add the placeholder pages.

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

use super::entities::{EntityResolver, resolve_directory};
use super::normalize::TextSubstitution;

/// What the finalizer did to one bundle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FinalizeReport {
    pub markers_replaced: usize,
    pub resolve_failures: Vec<Utf8PathBuf>,
    pub entity_file_removed: bool,
    pub placeholders_copied: Vec<String>,
    pub placeholders_missing: Vec<String>,
}

/// Substitution turning every empty `<tag/>` marker into `template`.
pub fn marker_substitution(tag: &str, template: &str) -> Result<TextSubstitution> {
    TextSubstitution::regex(&format!(r"<{}\s*/>", regex::escape(tag)), template)
}

/// Replace the empty markers left for outside links in every `.xml` file.
pub fn replace_markers(output_dir: &Utf8Path, tag: &str, template: &str) -> Result<usize> {
    tracing::info!("removing obsolete <{}/> tags", tag);
    marker_substitution(tag, template)?.apply_to_dir(output_dir, "xml")
}

/// Remove the entity-definition file. Returns whether a file was removed.
pub fn remove_entity_file(output_dir: &Utf8Path, entity_file: &str) -> Result<bool> {
    let path = output_dir.join(entity_file);
    if !path.exists() {
        tracing::debug!("entity file {} already absent", path);
        return Ok(false);
    }
    tracing::info!("removing the entity file");
    fs::remove_file(&path).with_context(|| format!("Failed to remove {}", path))?;
    Ok(true)
}

/// Copy static placeholder pages from `input_dir` into `output_dir`.
///
/// Returns the copied and the missing names.
pub fn copy_placeholders<S: AsRef<str>>(
    input_dir: &Utf8Path,
    output_dir: &Utf8Path,
    placeholders: &[S],
) -> Result<(Vec<String>, Vec<String>)> {
    tracing::info!("adding placeholders:");
    let mut copied = Vec::new();
    let mut missing = Vec::new();

    for name in placeholders {
        let name = name.as_ref();
        let origin = input_dir.join(name);
        if !origin.is_file() {
            tracing::warn!("placeholder {} is missing", origin);
            missing.push(name.to_string());
            continue;
        }
        let destination = output_dir.join(name);
        fs::copy(&origin, &destination)
            .with_context(|| format!("Failed to copy {} to {}", origin, destination))?;
        tracing::info!("{}", name);
        copied.push(name.to_string());
    }

    Ok((copied, missing))
}

/// Settings for one finalizer run
#[derive(Debug, Clone)]
pub struct Finalizer<'a> {
    pub input_dir: &'a Utf8Path,
    pub marker_tag: &'a str,
    pub template: &'a str,
    pub entity_file: &'a str,
    pub placeholders: &'a [String],
}

impl Finalizer<'_> {
    /// Run every finalization step on `output_dir`, in order.
    pub async fn run<R: EntityResolver>(
        &self,
        resolver: &R,
        output_dir: &Utf8Path,
    ) -> Result<FinalizeReport> {
        let markers_replaced = replace_markers(output_dir, self.marker_tag, self.template)?;

        tracing::info!("running the entity resolver to resolve any newly added entities");
        let resolve_failures = resolve_directory(resolver, output_dir).await?;

        let entity_file_removed = remove_entity_file(output_dir, self.entity_file)?;
        let (placeholders_copied, placeholders_missing) =
            copy_placeholders(self.input_dir, output_dir, self.placeholders)?;

        Ok(FinalizeReport {
            markers_replaced,
            resolve_failures,
            entity_file_removed,
            placeholders_copied,
            placeholders_missing,
        })
    }
}
