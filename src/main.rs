//! helpbundle - prepare installer help bundles from DocBook sources.
//!
//! # Execution Flow
//!
//! 1. Parse the command line
//! 2. Load `help_bundle.yaml` (defaults if absent, `HELPBUNDLE_*` overrides)
//! 3. Initialize logging → `logs/helpbundle.<date>` plus console output
//! 4. Create a single-threaded tokio runtime for the entity resolver subprocess
//! 5. Build every variant (or the ones named with `--variant`), one after another
//!
//! The run fails when the input directory does not exist. Per-file problems are
//! logged as warnings and do not change the exit status.

use anyhow::Result;
use camino::Utf8PathBuf;
use clap::Parser;
use helpbundle::{APP_NAME, BundleConfig, CommandResolver, ConfigManager, HelpBundleBuilder, VERSION};

#[derive(Parser)]
#[command(name = "helpbundle")]
#[command(version, about = "Prepare installer help bundles from DocBook sources", long_about = None)]
#[command(after_help = "EXAMPLES:
    helpbundle                        Build every configured variant
    helpbundle --variant rhv          Build only the rhv bundle
    helpbundle --write-default-config Write help_bundle.yaml with the defaults")]
struct Cli {
    /// Configuration file (YAML)
    #[arg(short, long, value_name = "FILE", default_value = "help_bundle.yaml")]
    config: Utf8PathBuf,

    /// Override the input directory from the configuration
    #[arg(short, long, value_name = "DIR")]
    input_dir: Option<Utf8PathBuf>,

    /// Build only this variant (repeatable)
    #[arg(long = "variant", value_name = "NAME")]
    variants: Vec<String>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Directory for the rotating log file
    #[arg(long, value_name = "DIR", default_value = "logs")]
    log_dir: Utf8PathBuf,

    /// Log to the file only
    #[arg(short, long)]
    quiet: bool,

    /// Write the default configuration to --config and exit
    #[arg(long)]
    write_default_config: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let _guard =
        helpbundle::logging::setup_logging(&cli.log_dir, APP_NAME, cli.debug, !cli.quiet)?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    let config_manager = ConfigManager::new(&cli.config);

    if cli.write_default_config {
        config_manager.save_config(&BundleConfig::default())?;
        return Ok(());
    }

    let mut config = config_manager.load_config()?;
    if let Some(input_dir) = cli.input_dir {
        config.input_dir = input_dir;
    }

    tracing::info!(
        "Loaded configuration - input: {}, files: {}, variants: {}",
        config.input_dir,
        config.help_files.len(),
        config.variants.len()
    );

    // The resolver subprocess is the only async work; stages run one at a time
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let resolver = CommandResolver::from_settings(&config.resolver);
    let builder = HelpBundleBuilder::new(config, resolver);

    let result = runtime.block_on(async {
        if cli.variants.is_empty() {
            builder.build_all().await
        } else {
            builder.build_named(&cli.variants).await
        }
    });

    match result {
        Ok(reports) => {
            for report in &reports {
                tracing::info!(
                    "{}: {} files in {} ({} warnings)",
                    report.name,
                    report.engine.documents.len(),
                    report.output_dir,
                    report.warning_count()
                );
            }
            tracing::info!("done!");
            Ok(())
        }
        Err(e) => {
            tracing::error!("{:#}", e);
            Err(e)
        }
    }
}
