//! Stages command implementation

use super::board::stage_color;
use super::{print_structured, CliContext};
use crate::cli::OutputFormat;
use anyhow::Result;
use comfy_table::{presets::UTF8_FULL, Cell, Table};
use repairdesk_pipeline::StageRegistry;

/// List the stage registry. Needs no backend.
pub fn execute_stages_command(context: &CliContext) -> Result<()> {
    let stages = StageRegistry::global().stages();

    if context.format != OutputFormat::Table {
        return print_structured(stages, context.format);
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Rank", "Id", "Label", "Color"]);
    for stage in stages {
        table.add_row(vec![
            Cell::new(stage.rank),
            Cell::new(stage.id),
            Cell::new(stage.label).fg(stage_color(stage.id)),
            Cell::new(format!("#{}", stage.display_color)),
        ]);
    }
    println!("{table}");
    Ok(())
}
