use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Yaml,
}

#[derive(Parser, Debug)]
#[command(name = "pipeline")]
#[command(version)]
#[command(about = "Inspect and rearrange the RepairDesk sales pipeline")]
#[command(long_about = "
Inspect and rearrange the RepairDesk sales pipeline from the terminal.

Leads move through the stages new, contacted, qualified, proposal,
negotiation, won and lost. Moves are applied locally first and rolled
back if the server refuses them.

Configuration is read from repairdesk.{toml,yaml,json} in the current
directory (or --config) and REPAIRDESK_* environment variables, e.g.
REPAIRDESK_BACKEND__BASE_URL.

Example usage:
  pipeline board                                  # Show every stage
  pipeline board --stage won                      # Show one stage
  pipeline --format=json stats                    # Server statistics as JSON
  pipeline move 42 new 0 contacted 1              # Drag lead 42
  pipeline --offline board                        # Use built-in demo data
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file to load instead of searching the current directory
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, global = true, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// Work against built-in demo data instead of the server
    #[arg(long, global = true)]
    pub offline: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show leads grouped by stage
    Board {
        /// Only show this stage
        #[arg(long)]
        stage: Option<String>,
    },

    /// List the pipeline stages
    Stages,

    /// Show pipeline statistics
    Stats {
        /// Compute totals from the board instead of asking the server
        #[arg(long)]
        local: bool,
    },

    /// Move a lead to a stage and position
    #[command(long_about = "
Move a lead the way a drag on the board would.

The source stage and index describe where the lead is now; the destination
index is counted after the lead has been taken out of its column, and an
index past the end puts the lead last.
")]
    Move {
        /// Lead identifier
        lead: String,
        /// Current stage
        from: String,
        /// Current position within the stage
        from_index: usize,
        /// Target stage
        to: String,
        /// Target position within the stage
        to_index: usize,
    },
}
