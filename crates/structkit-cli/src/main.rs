mod cli;
mod commands;
mod config;
mod error;
mod logging;
mod utils;

use crate::cli::{Cli, Commands};
use crate::commands::Context;
use crate::config::PartialConfig;
use crate::error::{CliError, Result};
use clap::Parser;
use tracing::{debug, error, info};

fn main() {
    if let Err(e) = run_app() {
        eprintln!("\n❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn run_app() -> Result<()> {
    let cli = Cli::parse();
    logging::setup_logging(cli.verbose, cli.quiet, cli.log_file.as_deref())?;

    let (panic_hook, eyre_hook) = color_eyre::config::HookBuilder::default().into_hooks();
    eyre_hook.install().map_err(|e| CliError::Other(e.into()))?;
    std::panic::set_hook(Box::new(move |pi| {
        error!("{}", panic_hook.panic_report(pi));
    }));

    info!("structkit CLI v{} starting up.", env!("CARGO_PKG_VERSION"));
    debug!("Full CLI arguments parsed: {:?}", &cli);

    if let Some(num_threads) = cli.threads {
        info!(
            "Setting Rayon global thread pool to {} threads.",
            num_threads
        );
        rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build_global()
            .map_err(|e| {
                CliError::Other(anyhow::anyhow!("Failed to build global thread pool: {}", e))
            })?;
    }

    let config = PartialConfig::load(cli.config.as_deref(), &cli.set_values)?;
    let ctx = Context { quiet: cli.quiet };

    let command_result = match cli.command {
        Commands::Info(args) => {
            info!("Dispatching to 'info' command.");
            commands::info::run(args)
        }
        Commands::Convert(args) => {
            info!("Dispatching to 'convert' command.");
            commands::convert::run(args)
        }
        Commands::Superimpose(args) => {
            info!("Dispatching to 'superimpose' command.");
            commands::superimpose::run(args, &config, &ctx)
        }
        Commands::Rmsd(args) => {
            info!("Dispatching to 'rmsd' command.");
            commands::rmsd::run(args)
        }
        Commands::Displacement(args) => {
            info!("Dispatching to 'displacement' command.");
            commands::displacement::run(args, &ctx)
        }
        Commands::Pca(args) => {
            info!("Dispatching to 'pca' command.");
            commands::pca::run(args, &config, &ctx)
        }
        Commands::Pivot(args) => {
            info!("Dispatching to 'pivot' command.");
            commands::pivot::run(args, &config, &ctx)
        }
        Commands::Mean(args) => {
            info!("Dispatching to 'mean' command.");
            commands::mean::run(args)
        }
    };

    match &command_result {
        Ok(_) => info!("✅ Command completed successfully."),
        Err(e) => error!("❌ Command failed: {}", e),
    }

    command_result
}
