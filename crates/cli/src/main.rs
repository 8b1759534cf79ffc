//! payara-harness CLI - Main Entry Point

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use payara_harness_cli::commands::{self, run, validate, version};
use payara_harness_cli::{logging, output};

/// Drive Payara Micro and remote Payara Server test sessions
#[derive(Parser)]
#[command(name = "payara-harness")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// TOML file with a [properties] table of setting overrides
    #[arg(long, default_value = "payara-harness.toml", global = true)]
    config: PathBuf,

    /// Override a setting, e.g. --set payara.debug=true
    #[arg(long = "set", value_name = "KEY=VALUE", global = true)]
    set: Vec<String>,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the resolved configuration
    Validate,

    /// Show the version of the Payara Micro artifact
    Version(version::VersionArgs),

    /// Start the runtime, deploy archives, then tear everything down
    Run(run::RunArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging before settings are read, so loading is traced
    let log_handle = logging::init(cli.verbose)?;
    let config = commands::load_configuration(&cli.config, &cli.set)?;
    if config.debug {
        log_handle.enable_debug()?;
    }

    let result = match cli.command {
        Commands::Validate => validate::execute(config, cli.format),
        Commands::Version(args) => version::execute(args, config, cli.format),
        Commands::Run(args) => run::execute(args, config, cli.format).await,
    };

    if let Err(e) = result {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}
