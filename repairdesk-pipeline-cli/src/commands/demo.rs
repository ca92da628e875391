//! Built-in board for `--offline`

use repairdesk_pipeline::{Lead, LeadQuality, PipelineBoard, Result, StageId};

pub fn demo_board() -> Result<PipelineBoard> {
    PipelineBoard::from_leads(vec![
        Lead::with_id("1", "Maria Lopez")
            .with_company("Lopez Phone Fix")
            .with_source("walk-in")
            .with_value(1200.0),
        Lead::with_id("2", "Tom Becker")
            .with_email("tom@example.com")
            .with_value(350.0),
        Lead::with_id("3", "Aisha Khan")
            .with_company("Khan Logistics")
            .with_stage(StageId::Contacted)
            .with_quality(LeadQuality::High)
            .with_value(4800.0),
        Lead::with_id("4", "Peter Novak")
            .with_stage(StageId::Qualified)
            .with_value(900.0),
        Lead::with_id("5", "Sunita Rao")
            .with_company("Rao Schools")
            .with_stage(StageId::Proposal)
            .with_quality(LeadQuality::High)
            .with_value(15000.0),
        Lead::with_id("6", "Jonas Berg")
            .with_stage(StageId::Negotiation)
            .with_value(2600.0),
        Lead::with_id("7", "Lena Fischer")
            .with_stage(StageId::Won)
            .with_value(3100.0),
        Lead::with_id("8", "Omar Haddad")
            .with_stage(StageId::Lost)
            .with_quality(LeadQuality::Low)
            .with_value(700.0),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_board_is_consistent() {
        let board = demo_board().unwrap();
        board.check_invariants().unwrap();
        assert_eq!(board.len(), 8);
        for stage in StageId::ALL {
            assert!(!board.get_stage(stage).is_empty(), "{stage} is empty");
        }
    }
}
