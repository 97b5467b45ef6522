use std::collections::BTreeMap;

use chrono::NaiveDate;
use tat_config::StageCatalog;
use tat_eval::RowContext;
use tat_resolver::{Resolver, StageResult};

use crate::summary::Summary;

/// The full result of processing one PO row (spec §3 "Per-PO result",
/// §6 "Per-PO result document").
#[derive(Debug, Clone, PartialEq)]
pub struct PoResult {
    pub po_id: String,
    pub calculation_date: NaiveDate,
    pub stages: BTreeMap<String, StageResult>,
    pub summary: Summary,
}

/// Drives the resolver across one PO's stage catalog (spec §4.4). A
/// fresh [`Resolver`] (and therefore a fresh cache) is built per call,
/// matching "Reset the resolver cache" at the start of each row.
pub struct Processor<'a> {
    catalog: &'a StageCatalog,
}

impl<'a> Processor<'a> {
    pub fn new(catalog: &'a StageCatalog) -> Self {
        Self { catalog }
    }

    /// Processes one row, returning the full per-PO result.
    /// `calculation_date` is supplied by the caller rather than read
    /// from the system clock, so the core stays free of wall-clock
    /// I/O (spec §5: "the core performs no I/O").
    pub fn process(&self, po_id: impl Into<String>, row: &dyn RowContext, calculation_date: NaiveDate) -> PoResult {
        let resolver = Resolver::new(self.catalog, row);
        let mut stages = BTreeMap::new();
        let mut summary = Summary {
            total_stages: self.catalog.len() as u32,
            ..Summary::default()
        };

        for stage_id in self.catalog.stage_ids() {
            let result = resolver.resolve(stage_id);
            self.accumulate(&mut summary, stage_id, &result);
            stages.insert(stage_id.to_string(), result);
        }

        PoResult {
            po_id: po_id.into(),
            calculation_date,
            stages,
            summary,
        }
    }

    fn accumulate(&self, summary: &mut Summary, stage_id: &str, result: &StageResult) {
        *summary.methods_used.entry(result.method).or_insert(0) += 1;

        if result.final_timestamp.is_some() {
            summary.calculated_stages += 1;
        }

        if let Some(delay) = result.delay {
            summary.stages_with_delays += 1;
            summary.total_delay_days += delay;

            let is_critical = self
                .catalog
                .get(stage_id)
                .map(|d| d.process_flow.critical_path)
                .unwrap_or(false);
            if is_critical && result.method.is_actual_or_adjusted() && delay > 0 {
                summary.critical_path_delays += 1;
            }
        }

        for diag in &result.diagnostics {
            tracing::warn!(stage_id, message = %diag.message, "stage diagnostic");
        }
    }
}
