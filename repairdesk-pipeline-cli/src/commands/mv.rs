//! Move command implementation

use super::{print_structured, CliContext};
use crate::cli::OutputFormat;
use anyhow::{bail, Result};
use repairdesk_pipeline::{MoveOutcome, MoveRequest, StageId};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct MoveReport {
    lead: String,
    stage: StageId,
    position: usize,
    changed: bool,
}

pub async fn execute_move_command(context: &CliContext, request: MoveRequest) -> Result<()> {
    let coordinator = context.connect().await?;
    let lead = request.lead_id.clone();

    let outcome = coordinator.request_move(request).outcome().await;
    tracing::debug!(?outcome, "move finished");

    let changed = match outcome {
        MoveOutcome::Committed { .. } => true,
        MoveOutcome::Unchanged { .. } => false,
        MoveOutcome::RolledBack { error, .. } => {
            bail!("server refused the move, board left unchanged: {error}")
        }
        MoveOutcome::Rejected { error, .. } => bail!("move rejected: {error}"),
        MoveOutcome::Cancelled { .. } => bail!("move cancelled before the server answered"),
    };

    let Some((stage, position)) = coordinator.board().locate(&lead) else {
        bail!("lead {lead} disappeared from the board");
    };
    let report = MoveReport {
        lead: lead.to_string(),
        stage,
        position,
        changed,
    };

    if context.format != OutputFormat::Table {
        return print_structured(&report, context.format);
    }

    if changed {
        println!("Moved lead {} to {} at position {}", report.lead, stage, position);
    } else {
        println!("Lead {} is already at {} position {}", report.lead, stage, position);
    }
    Ok(())
}
