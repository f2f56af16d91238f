use clap::Parser;
use tracing::error;
use tracing_subscriber::FmtSubscriber;

use tlr_cli::cli::{Cli, Commands};
use tlr_cli::commands;

fn main() {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let result = match &cli.command {
        Commands::Run(args) => commands::run::execute(args),
        Commands::Ampacity(args) => commands::ampacity::execute(args),
        Commands::Validate(args) => commands::validate::execute(args),
    };

    if let Err(err) = result {
        error!("{err:#}");
        std::process::exit(1);
    }
}
