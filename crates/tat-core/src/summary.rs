use std::collections::HashMap;

use tat_resolver::Method;

/// Per-PO aggregate counters (spec §3 "Per-PO result", §4.4 step 3-4).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Summary {
    pub methods_used: HashMap<Method, u32>,
    pub calculated_stages: u32,
    pub stages_with_delays: u32,
    pub total_delay_days: i64,
    pub critical_path_delays: u32,
    pub total_stages: u32,
}

impl Summary {
    /// `calculated_stages / total_stages` (spec §4.4 step 4). `0.0`
    /// for an empty catalog rather than a division-by-zero panic.
    pub fn completion_rate(&self) -> f64 {
        if self.total_stages == 0 {
            0.0
        } else {
            self.calculated_stages as f64 / self.total_stages as f64
        }
    }

    /// `total_delay_days / stages_with_delays`, present only "if any
    /// delays" (spec §4.4 step 4).
    pub fn average_delay_days(&self) -> Option<f64> {
        if self.stages_with_delays == 0 {
            None
        } else {
            Some(self.total_delay_days as f64 / self.stages_with_delays as f64)
        }
    }
}
