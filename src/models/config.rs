use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

/// Default product name found in the shared entity file.
pub const DEFAULT_PRODUCT_NAME: &str = "Red Hat Enterprise Linux";

/// Shared entity-definition file copied with the XML sources.
pub const MAIN_ENTITY_FILE: &str = "Installation_Guide.ent";

/// Replacement for cross-references that point outside the bundle.
pub const DEFAULT_OUTSIDE_LINK_TEMPLATE: &str =
    "the full <citetitle>&PRODUCT; Installation Guide</citetitle>, available at &IGURL;";

/// Help content and supporting files the installer currently uses.
pub const DEFAULT_HELP_FILES: &[&str] = &[
    "Graphical_Installation-x86.xml",
    "WelcomeSpoke-x86.xml",
    "SummaryHub-x86.xml",
    "DateTimeSpoke-x86.xml",
    "LangSupportSpoke-x86.xml",
    "KeyboardSpoke-x86.xml",
    "SecurityPolicySpoke-x86.xml",
    "SourceSpoke-x86.xml",
    "NetworkSpoke-x86.xml",
    "SoftwareSpoke-x86.xml",
    "StorageSpoke-x86.xml",
    "CustomSpoke-x86.xml",
    "FilterSpoke-x86.xml",
    "KdumpSpoke-x86.xml",
    "Write_changes_to_disk_x86.xml",
    "ProgressHub-x86.xml",
    "PasswordSpoke-x86.xml",
    "UserSpoke-x86.xml",
    "Complete-x86.xml",
    "Graphical_Installation-ppc.xml",
    "WelcomeSpoke-ppc64.xml",
    "SummaryHub-ppc64.xml",
    "DateTimeSpoke-ppc64.xml",
    "LangSupportSpoke-ppc64.xml",
    "KeyboardSpoke-ppc64.xml",
    "SecurityPolicySpoke-ppc64.xml",
    "SourceSpoke-ppc64.xml",
    "NetworkSpoke-ppc64.xml",
    "SoftwareSpoke-ppc64.xml",
    "StorageSpoke-ppc64.xml",
    "CustomSpoke-ppc64.xml",
    "FilterSpoke-ppc64.xml",
    "KdumpSpoke-ppc64.xml",
    "Write_changes_to_disk_ppc.xml",
    "ProgressHub-ppc64.xml",
    "PasswordSpoke-ppc64.xml",
    "UserSpoke-ppc64.xml",
    "Complete-ppc.xml",
    "Graphical_Installation-s390.xml",
    "WelcomeSpoke-s390.xml",
    "SummaryHub-s390.xml",
    "DateTimeSpoke-s390.xml",
    "LangSupportSpoke-s390.xml",
    "KeyboardSpoke-s390.xml",
    "SecurityPolicySpoke-s390.xml",
    "SourceSpoke-s390.xml",
    "NetworkSpoke-s390.xml",
    "SoftwareSpoke-s390.xml",
    "StorageSpoke-s390.xml",
    "CustomSpoke-s390.xml",
    "FilterSpoke-s390.xml",
    "KdumpSpoke-s390.xml",
    "Write_changes_to_disk_s390.xml",
    "ProgressHub-s390.xml",
    "PasswordSpoke-s390.xml",
    "UserSpoke-s390.xml",
    "Complete-s390.xml",
    "InitialSetupHub-common.xml",
    "SubscriptionManagerSpoke-common.xml",
    "InitialSetup-text.xml",
    MAIN_ENTITY_FILE,
];

/// Static pages copied verbatim into every bundle.
pub const DEFAULT_PLACEHOLDERS: &[&str] =
    &["RHEL7PlaceholderWithLinks.html", "RHEL7Placeholder.html"];

/// Complete bundle configuration, usually loaded from `help_bundle.yaml`.
///
/// Every field has a default, so a partial (or missing) file is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BundleConfig {
    /// Directory holding the DocBook sources, placeholders and entity file
    pub input_dir: Utf8PathBuf,

    /// Entity-definition file name inside the input directory
    pub entity_file: String,

    /// Product name replaced by a variant's `product_name`
    pub default_product_name: String,

    /// Ordered allow-list of files copied into each bundle
    pub help_files: Vec<String>,

    /// Static pages copied after processing
    pub placeholders: Vec<String>,

    /// Output bundles, built in order
    pub variants: Vec<VariantConfig>,

    pub resolver: ResolverSettings,

    pub rules: RewriteRules,

    /// Text substituted for every cross-reference leaving the bundle
    pub outside_link_template: String,
}

impl Default for BundleConfig {
    fn default() -> Self {
        Self {
            input_dir: Utf8PathBuf::from("en-US"),
            entity_file: MAIN_ENTITY_FILE.to_string(),
            default_product_name: DEFAULT_PRODUCT_NAME.to_string(),
            help_files: DEFAULT_HELP_FILES.iter().map(|s| s.to_string()).collect(),
            placeholders: DEFAULT_PLACEHOLDERS.iter().map(|s| s.to_string()).collect(),
            variants: vec![
                VariantConfig {
                    name: "rhel".to_string(),
                    output_dir: Utf8PathBuf::from("anaconda_help_content/rhel/en-US"),
                    product_name: None,
                },
                VariantConfig {
                    name: "rhv".to_string(),
                    output_dir: Utf8PathBuf::from("anaconda_help_content/rhv/en-US"),
                    product_name: Some("Red Hat Virtualization".to_string()),
                },
            ],
            resolver: ResolverSettings::default(),
            rules: RewriteRules::default(),
            outside_link_template: DEFAULT_OUTSIDE_LINK_TEMPLATE.to_string(),
        }
    }
}

impl BundleConfig {
    /// Look up a variant by name
    pub fn variant(&self, name: &str) -> Option<&VariantConfig> {
        self.variants.iter().find(|v| v.name == name)
    }
}

/// One product-branded output bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantConfig {
    pub name: String,

    /// Recreated from scratch on every run
    pub output_dir: Utf8PathBuf,

    /// Replaces the default product name when set
    #[serde(default)]
    pub product_name: Option<String>,
}

impl VariantConfig {
    /// Product name shown in logs for this variant
    pub fn display_product<'a>(&'a self, default_product: &'a str) -> &'a str {
        self.product_name.as_deref().unwrap_or(default_product)
    }
}

/// External entity resolver invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverSettings {
    pub program: String,
    /// Arguments placed before the file path
    pub args: Vec<String>,
    pub timeout_secs: u64,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            program: "xmllint".to_string(),
            args: vec!["--noent".to_string()],
            timeout_secs: default_resolver_timeout(),
        }
    }
}

fn default_resolver_timeout() -> u64 {
    60
}

/// Element and attribute names the rewrite engine works with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewriteRules {
    pub id_attribute: String,
    pub title_element: String,
    /// Authoring-only elements dropped from the output
    pub removable_elements: Vec<String>,
    pub xref_element: String,
    pub xref_target_attribute: String,
    pub link_element: String,
    pub link_address_attribute: String,
}

impl Default for RewriteRules {
    fn default() -> Self {
        Self {
            id_attribute: "id".to_string(),
            title_element: "title".to_string(),
            removable_elements: vec!["figure".to_string(), "remark".to_string()],
            xref_element: "xref".to_string(),
            xref_target_attribute: "linkend".to_string(),
            link_element: "ulink".to_string(),
            link_address_attribute: "url".to_string(),
        }
    }
}
