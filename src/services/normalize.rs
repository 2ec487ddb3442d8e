//! Stage 2: in-place text substitution over bundle files.

use anyhow::{Context, Result};
use camino::Utf8Path;
use regex::{NoExpand, Regex};
use std::fs;

use super::files::files_with_extension;

/// Non-breaking space entity stripped from every bundle file
pub const NBSP_ENTITY: &str = "&nbsp;";

/// A pattern and its replacement, applied to whole files in place.
#[derive(Debug, Clone)]
pub struct TextSubstitution {
    pattern: Regex,
    replacement: String,
}

impl TextSubstitution {
    /// Replace a literal string.
    pub fn literal(pattern: &str, replacement: &str) -> Self {
        Self {
            // an escaped literal is always a valid regex
            pattern: Regex::new(&regex::escape(pattern)).expect("escaped literal regex"),
            replacement: replacement.to_string(),
        }
    }

    /// Replace every match of a regular expression. `$` in the replacement is literal.
    pub fn regex(pattern: &str, replacement: &str) -> Result<Self> {
        let pattern =
            Regex::new(pattern).with_context(|| format!("Invalid substitution pattern: {}", pattern))?;
        Ok(Self {
            pattern,
            replacement: replacement.to_string(),
        })
    }

    /// Apply to a string, returning the new text and the number of replacements.
    pub fn apply(&self, text: &str) -> (String, usize) {
        let count = self.pattern.find_iter(text).count();
        if count == 0 {
            return (text.to_string(), 0);
        }
        let replaced = self
            .pattern
            .replace_all(text, NoExpand(&self.replacement))
            .into_owned();
        (replaced, count)
    }

    /// Apply to a file in place. The file is only rewritten when something matched.
    pub fn apply_to_file(&self, path: &Utf8Path) -> Result<usize> {
        let content =
            fs::read_to_string(path).with_context(|| format!("Failed to read {}", path))?;
        let (replaced, count) = self.apply(&content);
        if count > 0 {
            fs::write(path, replaced).with_context(|| format!("Failed to write {}", path))?;
            tracing::debug!("{} replacement(s) of {} in {}", count, self.pattern, path);
        }
        Ok(count)
    }

    /// Apply to every file of `dir` with the given extension.
    ///
    /// A file that cannot be read or written is logged and skipped.
    pub fn apply_to_dir(&self, dir: &Utf8Path, extension: &str) -> Result<usize> {
        let mut total = 0;
        for path in files_with_extension(dir, extension)? {
            match self.apply_to_file(&path) {
                Ok(count) => total += count,
                Err(e) => tracing::warn!("text substitution failed on {}: {:#}", path, e),
            }
        }
        Ok(total)
    }
}

/// Counts from the normalization stage
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeReport {
    pub nbsp_replaced: usize,
    pub product_names_replaced: usize,
}

/// Strip `&nbsp;` from every `.ent` and `.xml` file and, when `product_name` is set,
/// rebrand the entity file.
pub fn normalize_bundle(
    output_dir: &Utf8Path,
    entity_file: &str,
    default_product_name: &str,
    product_name: Option<&str>,
) -> Result<NormalizeReport> {
    let mut report = NormalizeReport::default();

    tracing::info!("removing non breakable spaces");
    let nbsp = TextSubstitution::literal(NBSP_ENTITY, " ");
    report.nbsp_replaced += nbsp.apply_to_dir(output_dir, "ent")?;
    report.nbsp_replaced += nbsp.apply_to_dir(output_dir, "xml")?;

    if let Some(product_name) = product_name {
        tracing::info!("using non-default product name: {}", product_name);
        let entity_path = output_dir.join(entity_file);
        let branding = TextSubstitution::literal(default_product_name, product_name);
        match branding.apply_to_file(&entity_path) {
            Ok(count) => report.product_names_replaced = count,
            Err(e) => tracing::warn!("could not rebrand {}: {:#}", entity_path, e),
        }
    }

    Ok(report)
}
