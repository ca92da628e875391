mod cli;
mod commands;
mod logging;

use clap::Parser;
use cli::{Cli, Commands};
use commands::CliContext;
use repairdesk_pipeline::MoveRequest;
use std::process;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::configure_logging(cli.verbose, cli.debug, cli.quiet);

    if let Err(e) = run(cli).await {
        tracing::debug!("command failed: {e:?}");
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let context = CliContext::from_cli(&cli)?;

    match cli.command {
        Commands::Board { stage } => commands::board::execute_board_command(&context, stage).await,
        Commands::Stages => commands::stages::execute_stages_command(&context),
        Commands::Stats { local } => commands::stats::execute_stats_command(&context, local).await,
        Commands::Move {
            lead,
            from,
            from_index,
            to,
            to_index,
        } => {
            let request = MoveRequest::new(lead, from, from_index, to, to_index);
            commands::mv::execute_move_command(&context, request).await
        }
    }
}
