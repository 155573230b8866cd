//! debintake - publish Debian package uploads through the aptly REST API

use clap::{Parser, Subcommand};
use debintake_core::IntakeSettings;
use std::path::PathBuf;
use std::process::ExitCode;

mod commands;
mod error;
mod exit_codes;
mod logging;

use error::{CliError, Result};

#[derive(Parser)]
#[command(name = "debintake")]
#[command(version)]
#[command(about = "Publish Debian package uploads through the aptly REST API", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Settings file (default: ~/.config/debintake/settings.yaml)
    #[arg(long, global = true, env = "DEBINTAKE_CONFIG")]
    config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload, include and publish the files listed in a .changes file
    Import {
        /// Changes file; its directory name is the channel
        changes: PathBuf,
    },

    /// Snapshot every channel repository and switch its publish
    Republish,

    /// Remove old package versions and unpublished snapshots
    Clean {
        /// Versions to keep per package and architecture (default: keep_versions)
        #[arg(short, long)]
        keep: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    miette::set_panic_hook();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() {
                exit_codes::USAGE_ERROR
            } else {
                exit_codes::SUCCESS
            };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    logging::init(cli.debug);

    match run(cli).await {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS),
        Err(err) => {
            let code = err.exit_code();
            eprintln!("{:?}", miette::Report::new(err));
            ExitCode::from(code)
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let settings = load_settings(cli.config.as_deref())?;

    match cli.command {
        Commands::Import { changes } => commands::import::run(settings, &changes).await,
        Commands::Republish => commands::republish::run(settings).await,
        Commands::Clean { keep } => commands::clean::run(settings, keep).await,
    }
}

fn load_settings(path: Option<&std::path::Path>) -> Result<IntakeSettings> {
    let settings = match path {
        Some(path) => IntakeSettings::load_from(path),
        None => IntakeSettings::load(),
    }
    .map_err(CliError::from)?;
    tracing::debug!(api_url = %settings.api_url, "settings loaded");
    Ok(settings)
}
