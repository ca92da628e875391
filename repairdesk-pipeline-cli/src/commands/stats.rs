//! Stats command implementation

use super::{money, print_structured, CliContext};
use crate::cli::OutputFormat;
use anyhow::Result;
use comfy_table::{presets::UTF8_FULL, Table};
use repairdesk_pipeline::{PipelineStatistics, PipelineTotals, StageRegistry};

pub async fn execute_stats_command(context: &CliContext, local: bool) -> Result<()> {
    let coordinator = context.connect().await?;

    if local {
        let totals = coordinator.totals();
        if context.format != OutputFormat::Table {
            return print_structured(&totals, context.format);
        }
        print_totals(&totals);
        return Ok(());
    }

    let stats = coordinator.statistics().await?;
    if context.format != OutputFormat::Table {
        return print_structured(&stats, context.format);
    }
    print_statistics(&stats);
    Ok(())
}

fn print_totals(totals: &PipelineTotals) {
    let registry = StageRegistry::global();
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Stage", "Leads", "Value"]);
    for summary in &totals.stages {
        table.add_row(vec![
            registry.get(summary.stage).label.to_string(),
            summary.count.to_string(),
            money(summary.total_value),
        ]);
    }
    println!("{table}");
    println!(
        "{} leads, open value {}, won value {}",
        totals.lead_count,
        money(totals.open_value),
        money(totals.won_value)
    );
}

fn print_statistics(stats: &PipelineStatistics) {
    let registry = StageRegistry::global();
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Stage", "Leads", "Value"]);
    for (stage, row) in &stats.by_stage {
        table.add_row(vec![
            registry.get(*stage).label.to_string(),
            row.count.to_string(),
            money(row.value),
        ]);
    }
    println!("{table}");
    println!(
        "{} leads, total value {}, conversion rate {:.1}%",
        stats.total_leads,
        money(stats.total_value),
        stats.conversion_rate * 100.0
    );
}
