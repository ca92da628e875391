//! Subcommand implementations

pub mod board;
pub mod demo;
pub mod mv;
pub mod stages;
pub mod stats;

use crate::cli::{Cli, OutputFormat};
use anyhow::{Context, Result};
use repairdesk_pipeline::{
    HttpLeadBackend, InMemoryBackend, LeadBackend, PipelineConfig, SyncCoordinator,
};
use serde::Serialize;
use std::sync::Arc;

/// Settings every command needs
pub struct CliContext {
    pub config: PipelineConfig,
    pub format: OutputFormat,
    pub offline: bool,
}

impl CliContext {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let config = match &cli.config {
            Some(path) => PipelineConfig::load_file(path)
                .with_context(|| format!("failed to load {}", path.display()))?,
            None => PipelineConfig::load().context("failed to load configuration")?,
        };
        tracing::debug!(base_url = %config.backend.base_url, offline = cli.offline, "configuration loaded");

        Ok(Self {
            config,
            format: cli.format,
            offline: cli.offline,
        })
    }

    /// Start a coordinator holding the current board
    pub async fn connect(&self) -> Result<SyncCoordinator> {
        let backend: Arc<dyn LeadBackend> = if self.offline {
            Arc::new(InMemoryBackend::new(demo::demo_board()?))
        } else {
            Arc::new(HttpLeadBackend::new(&self.config.backend)?)
        };

        SyncCoordinator::connect(backend, &self.config.sync)
            .await
            .with_context(|| {
                format!(
                    "could not load the pipeline from {}",
                    self.config.backend.base_url
                )
            })
    }
}

/// Print a serializable value as YAML, or JSON for any other format
pub fn print_structured<T: Serialize + ?Sized>(value: &T, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Yaml => print!("{}", serde_yaml_ng::to_string(value)?),
        OutputFormat::Json | OutputFormat::Table => {
            println!("{}", serde_json::to_string_pretty(value)?)
        }
    }
    Ok(())
}

/// Format a monetary value the way the board footer shows it
pub fn money(value: f64) -> String {
    format!("{value:.2}")
}
