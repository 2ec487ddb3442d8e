use anyhow::Result;
use camino::Utf8PathBuf;
use std::time::{Duration, Instant};
use thiserror::Error;

use super::engine::{EngineReport, RewriteEngine};
use super::entities::{EntityResolver, resolve_directory};
use super::finalizer::{FinalizeReport, Finalizer};
use super::normalize::{NormalizeReport, normalize_bundle};
use super::selector::{SelectionReport, select_files};
use crate::models::{BundleConfig, VariantConfig};

/// Errors that stop a bundle run
#[derive(Error, Debug)]
pub enum BundleError {
    #[error("input folder does not exist: {0}")]
    InputDirectoryMissing(Utf8PathBuf),

    #[error("unknown variant: {0}")]
    UnknownVariant(String),
}

/// Everything that happened while building one variant
#[derive(Debug, Clone)]
pub struct VariantReport {
    pub name: String,
    pub output_dir: Utf8PathBuf,
    pub selection: SelectionReport,
    pub normalize: NormalizeReport,
    pub resolve_failures: Vec<Utf8PathBuf>,
    pub engine: EngineReport,
    pub finalize: FinalizeReport,
    pub duration: Duration,
}

impl VariantReport {
    /// Number of recoverable problems met during the run
    pub fn warning_count(&self) -> usize {
        self.selection.missing.len()
            + self.resolve_failures.len()
            + self.engine.parse_failures.len()
            + self.engine.stats.missing_targets
            + self.finalize.resolve_failures.len()
            + self.finalize.placeholders_missing.len()
    }
}

/// Builds help bundles: selector, normalizer, resolver, rewrite engine, finalizer.
///
/// Every stage finishes for the whole directory before the next begins.
pub struct HelpBundleBuilder<R> {
    config: BundleConfig,
    resolver: R,
    engine: RewriteEngine,
}

impl<R: EntityResolver> HelpBundleBuilder<R> {
    pub fn new(config: BundleConfig, resolver: R) -> Self {
        let engine = RewriteEngine::new(config.rules.clone());
        Self {
            config,
            resolver,
            engine,
        }
    }

    fn check_input_dir(&self) -> Result<(), BundleError> {
        if !self.config.input_dir.is_dir() {
            return Err(BundleError::InputDirectoryMissing(
                self.config.input_dir.clone(),
            ));
        }
        Ok(())
    }

    /// Build every configured variant, in order.
    pub async fn build_all(&self) -> Result<Vec<VariantReport>> {
        self.check_input_dir()?;

        let mut reports = Vec::with_capacity(self.config.variants.len());
        for variant in &self.config.variants {
            reports.push(self.build_variant(variant).await?);
        }
        Ok(reports)
    }

    /// Build only the named variants, in the order given.
    pub async fn build_named(&self, names: &[String]) -> Result<Vec<VariantReport>> {
        self.check_input_dir()?;

        let variants = names
            .iter()
            .map(|name| {
                self.config
                    .variant(name)
                    .ok_or_else(|| BundleError::UnknownVariant(name.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut reports = Vec::with_capacity(variants.len());
        for variant in variants {
            reports.push(self.build_variant(variant).await?);
        }
        Ok(reports)
    }

    /// Run all five stages for one variant.
    pub async fn build_variant(&self, variant: &VariantConfig) -> Result<VariantReport> {
        let start = Instant::now();
        let config = &self.config;
        let output_dir = &variant.output_dir;

        tracing::info!(
            "Generating help content files for {} into {}",
            variant.display_product(&config.default_product_name),
            output_dir
        );

        let selection = select_files(&config.input_dir, output_dir, &config.help_files)?;

        let normalize = normalize_bundle(
            output_dir,
            &config.entity_file,
            &config.default_product_name,
            variant.product_name.as_deref(),
        )?;

        tracing::info!("running the entity resolver to resolve entities");
        let resolve_failures = resolve_directory(&self.resolver, output_dir).await?;

        let engine = self.engine.process_directory(output_dir)?;

        let finalizer = Finalizer {
            input_dir: &config.input_dir,
            marker_tag: &config.rules.xref_element,
            template: &config.outside_link_template,
            entity_file: &config.entity_file,
            placeholders: &config.placeholders,
        };
        let finalize = finalizer.run(&self.resolver, output_dir).await?;

        let report = VariantReport {
            name: variant.name.clone(),
            output_dir: output_dir.clone(),
            selection,
            normalize,
            resolve_failures,
            engine,
            finalize,
            duration: start.elapsed(),
        };

        tracing::info!(
            "variant {} done in {:.2}s: {} files, {} ({} warnings)",
            report.name,
            report.duration.as_secs_f32(),
            report.engine.documents.len(),
            report.engine.stats.summary(),
            report.warning_count()
        );

        Ok(report)
    }
}
