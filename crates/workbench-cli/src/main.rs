mod cli;
mod commands;
mod error;
mod logging;
mod utils;

use crate::cli::{Cli, Commands};
use crate::error::Result;
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
    logging::setup_logging(cli.verbose, cli.quiet, cli.log_file.clone())?;

    info!(
        "🚀 Protein workbench CLI v{} starting up.",
        env!("CARGO_PKG_VERSION")
    );
    debug!("Full CLI arguments parsed: {:?}", &cli);

    let quiet = cli.quiet;
    let command_result = match cli.command {
        Commands::Compose(args) => {
            info!("Dispatching to 'compose' command.");
            commands::compose::run(args)
        }
        Commands::Batch(args) => {
            info!("Dispatching to 'batch' command.");
            commands::batch::run(args)
        }
        Commands::Transform(args) => {
            info!("Dispatching to 'transform' command.");
            commands::transform::run(args, quiet)
        }
    };

    match command_result {
        Ok(output) => {
            println!("{}", output.trim_end());
            info!("✅ Command completed successfully.");
            Ok(())
        }
        Err(e) => {
            error!("❌ Command failed: {}", e);
            Err(e)
        }
    }
}
