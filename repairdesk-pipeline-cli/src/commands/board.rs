//! Board command implementation

use super::{money, print_structured, CliContext};
use crate::cli::OutputFormat;
use anyhow::Result;
use comfy_table::{presets::UTF8_FULL, Cell, Color, Table};
use repairdesk_pipeline::{PipelineBoard, StageId, StageRegistry};
use serde::Serialize;

/// One card as printed
#[derive(Debug, Serialize)]
pub struct BoardRow {
    pub stage: StageId,
    pub position: u32,
    pub id: String,
    pub customer: String,
    pub company: String,
    pub value: f64,
    pub owner: String,
}

pub fn board_rows(board: &PipelineBoard, only: Option<StageId>) -> Vec<BoardRow> {
    board
        .stages()
        .filter(|(stage, _)| only.is_none_or(|wanted| wanted == *stage))
        .flat_map(|(stage, leads)| {
            leads.iter().map(move |lead| BoardRow {
                stage,
                position: lead.pipeline_position,
                id: lead.id.to_string(),
                customer: lead.customer_name.clone(),
                company: lead.company_name.clone().unwrap_or_default(),
                value: lead.potential_value,
                owner: lead
                    .assigned_to
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_default(),
            })
        })
        .collect()
}

pub async fn execute_board_command(context: &CliContext, stage: Option<String>) -> Result<()> {
    let registry = StageRegistry::global();
    let only = stage.as_deref().map(|s| registry.resolve(s)).transpose()?;

    let coordinator = context.connect().await?;
    let board = coordinator.board();
    let rows = board_rows(&board, only);

    if context.format != OutputFormat::Table {
        return print_structured(&rows, context.format);
    }

    if rows.is_empty() {
        println!("No leads");
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Stage", "#", "Id", "Customer", "Company", "Value", "Owner"]);
    for row in &rows {
        let descriptor = registry.get(row.stage);
        table.add_row(vec![
            Cell::new(descriptor.label).fg(stage_color(row.stage)),
            Cell::new(row.position),
            Cell::new(&row.id),
            Cell::new(&row.customer),
            Cell::new(&row.company),
            Cell::new(money(row.value)),
            Cell::new(&row.owner),
        ]);
    }
    println!("{table}");

    let totals = coordinator.totals();
    println!(
        "{} leads, open value {}, won value {}",
        totals.lead_count,
        money(totals.open_value),
        money(totals.won_value)
    );
    Ok(())
}

/// Terminal color for a stage label, from the registry's hex color
pub fn stage_color(stage: StageId) -> Color {
    let hex = StageRegistry::global().get(stage).display_color;
    let channel = |range: std::ops::Range<usize>| {
        hex.get(range)
            .and_then(|h| u8::from_str_radix(h, 16).ok())
            .unwrap_or(255)
    };
    Color::Rgb {
        r: channel(0..2),
        g: channel(2..4),
        b: channel(4..6),
    }
}
