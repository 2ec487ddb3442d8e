// helpbundle - Prepare installer help bundles from DocBook installation guide sources
//
// This is the library crate containing the pipeline stages and the XML model.
// The binary crate (main.rs) provides the command-line entry point.

pub mod config;
pub mod logging;
pub mod models;
pub mod services;
pub mod xml;

// Re-export commonly used types for convenience
pub use config::ConfigManager;
pub use models::{BundleConfig, RewriteRules, VariantConfig};
pub use services::{CommandResolver, EntityResolver, HelpBundleBuilder, RewriteEngine};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
