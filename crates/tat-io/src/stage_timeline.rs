use tat_core::PoResult;

/// One PO's four time points for a single stage (supplemented feature,
/// grounded on `original_source/example_stage_level_export.py`: a
/// stage-indexed view alongside the PO×Stage matrices of spec §6).
#[derive(Debug, Clone, PartialEq)]
pub struct StageTimelineRow {
    pub po_id: String,
    pub target_timestamp: Option<chrono::NaiveDate>,
    pub actual_timestamp: Option<chrono::NaiveDate>,
    pub final_timestamp: Option<chrono::NaiveDate>,
    pub delay: Option<i64>,
}

/// Every PO's timeline for one stage id: pure re-projection of
/// already-computed [`PoResult`]s, sharing the matrix exporter's
/// pivoting logic rather than recomputing anything.
#[derive(Debug, Clone, PartialEq)]
pub struct StageTimeline {
    pub stage_id: String,
    pub rows: Vec<StageTimelineRow>,
}

pub fn stage_timeline(stage_id: &str, results: &[PoResult]) -> StageTimeline {
    let rows = results
        .iter()
        .filter_map(|result| {
            result.stages.get(stage_id).map(|stage| StageTimelineRow {
                po_id: result.po_id.clone(),
                target_timestamp: stage.target_timestamp,
                actual_timestamp: stage.actual_timestamp,
                final_timestamp: stage.final_timestamp,
                delay: stage.delay,
            })
        })
        .collect();
    StageTimeline {
        stage_id: stage_id.to_string(),
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use chrono::NaiveDate;
    use tat_common::Scalar;
    use tat_config::ConfigLoader;
    use tat_core::Processor;
    use tat_resolver::MapRow;

    #[test]
    fn timeline_collects_one_stage_across_pos() {
        let catalog = ConfigLoader::load_from_str(
            r#"{"stages": {"1": {"name": "A", "actual_timestamp": "a", "process_flow": {"critical_path": false, "team_owner": "x", "process_type": "y"}, "fallback_calculation": {"expression": "c"}, "lead_time": 0}}}"#,
        )
        .unwrap();
        let row = MapRow(HashMap::from([(
            "c".to_string(),
            Scalar::Instant(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()),
        )]));
        let processor = Processor::new(&catalog);
        let date = NaiveDate::from_ymd_opt(2025, 6, 20).unwrap();
        let results = vec![processor.process("PO-1", &row, date), processor.process("PO-2", &row, date)];
        let timeline = stage_timeline("1", &results);
        assert_eq!(timeline.rows.len(), 2);
        assert_eq!(timeline.rows[0].po_id, "PO-1");
    }
}
