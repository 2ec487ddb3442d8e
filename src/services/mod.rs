//! Services module - the help bundle pipeline.
//!
//! Each stage takes a directory of files in and leaves a directory of files out,
//! so it can be run and tested on its own:
//!
//! 1. [`selector`]: recreate the output directory and copy the allow-listed sources
//! 2. [`normalize`]: strip `&nbsp;` and apply product branding to the entity file
//! 3. [`entities`]: expand entities through an [`EntityResolver`] (`xmllint --noent`)
//! 4. [`engine`]: index identifiers across all files, then remove figures and
//!    remarks and rewrite cross-references
//! 5. [`finalizer`]: substitute outside-link markers, resolve again, drop the
//!    entity file and copy the placeholder pages
//!
//! [`HelpBundleBuilder`] runs the stages for every configured variant.
//!
//! # Usage Example
//!
//! ```ignore
//! use helpbundle::services::{CommandResolver, HelpBundleBuilder};
//!
//! let config = ConfigManager::new("help_bundle.yaml").load_config()?;
//! let resolver = CommandResolver::from_settings(&config.resolver);
//! let builder = HelpBundleBuilder::new(config, resolver);
//! let reports = builder.build_all().await?;
//! ```

pub mod engine;
pub mod entities;
pub mod files;
pub mod finalizer;
pub mod normalize;
pub mod pipeline;
pub mod selector;

pub use engine::{
    DocumentSet, EngineReport, IdentifierIndex, IndexEntry, RewriteEngine, RewriteStats,
};
pub use entities::{CommandResolver, EntityError, EntityResolver, resolve_directory};
pub use finalizer::{FinalizeReport, Finalizer};
pub use normalize::{NormalizeReport, TextSubstitution, normalize_bundle};
pub use pipeline::{BundleError, HelpBundleBuilder, VariantReport};
pub use selector::{SelectionReport, select_files};
