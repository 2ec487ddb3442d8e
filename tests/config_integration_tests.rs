//! Integration tests for ConfigManager
//!
//! These tests verify:
//! - A partial YAML file keeps the defaults for every key it omits
//! - Custom rewrite rules and variants load from YAML
//! - The written default configuration loads back unchanged

use camino::Utf8PathBuf;
use helpbundle::ConfigManager;
use helpbundle::models::config::DEFAULT_HELP_FILES;
use helpbundle::models::{BundleConfig, RewriteRules};
use std::fs;
use tempfile::TempDir;

fn config_path(temp_dir: &TempDir) -> Utf8PathBuf {
    temp_root(temp_dir).join("help_bundle.yaml")
}

fn temp_root(temp_dir: &TempDir) -> Utf8PathBuf {
    Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap()
}

#[test]
fn test_partial_file_keeps_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = config_path(&temp_dir);
    fs::write(&path, "input_dir: docs/en-US\n").unwrap();

    let config = ConfigManager::new(&path).load_config().unwrap();

    assert_eq!(config.input_dir, Utf8PathBuf::from("docs/en-US"));
    assert_eq!(config.help_files.len(), DEFAULT_HELP_FILES.len());
    assert_eq!(config.rules, RewriteRules::default());
    assert_eq!(config.resolver.program, "xmllint");
}

#[test]
fn test_custom_rules_and_variants() {
    let temp_dir = TempDir::new().unwrap();
    let path = config_path(&temp_dir);
    fs::write(
        &path,
        concat!(
            "rules:\n",
            "  removable_elements: [remark]\n",
            "variants:\n",
            "  - name: fedora\n",
            "    output_dir: out/fedora\n",
            "    product_name: Fedora\n",
        ),
    )
    .unwrap();

    let config = ConfigManager::new(&path).load_config().unwrap();

    assert_eq!(config.rules.removable_elements, vec!["remark".to_string()]);
    assert_eq!(config.rules.xref_element, "xref");
    assert_eq!(config.variants.len(), 1);
    let fedora = config.variant("fedora").unwrap();
    assert_eq!(fedora.output_dir, Utf8PathBuf::from("out/fedora"));
    assert_eq!(fedora.product_name.as_deref(), Some("Fedora"));
}

#[test]
fn test_written_defaults_load_back() {
    let temp_dir = TempDir::new().unwrap();
    // the parent directory is created on save
    let manager = ConfigManager::new(temp_root(&temp_dir).join("conf/help_bundle.yaml"));

    manager.save_config(&BundleConfig::default()).unwrap();
    let loaded = manager.load_config().unwrap();

    let defaults = BundleConfig::default();
    assert_eq!(loaded.help_files, defaults.help_files);
    assert_eq!(loaded.placeholders, defaults.placeholders);
    assert_eq!(loaded.variants, defaults.variants);
    assert_eq!(loaded.outside_link_template, defaults.outside_link_template);
}
