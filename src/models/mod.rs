//! Data models for helpbundle.
//!
//! - [`BundleConfig`]: input directory, allow-list, variants, resolver settings and
//!   rewrite rules, loaded from `help_bundle.yaml`
//! - [`VariantConfig`]: one product-branded output bundle
//! - [`RewriteRules`]: element and attribute names used by the rewrite engine
//!
//! All structs derive `Serialize`/`Deserialize` and default every field, so a
//! configuration file only needs to list what it changes.

pub mod config;

pub use config::{
    BundleConfig, DEFAULT_PRODUCT_NAME, MAIN_ENTITY_FILE, ResolverSettings, RewriteRules,
    VariantConfig,
};
