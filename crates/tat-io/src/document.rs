use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tat_core::PoResult;
use tat_resolver::{Method, PrecedenceMethod, StageResult};

/// Serializable view of [`Method`] (spec §3, §6: "instants are
/// serialized as ISO-8601 date-times").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodDoc {
    Projected,
    Actual,
    Adjusted,
    Error,
}

impl From<Method> for MethodDoc {
    fn from(m: Method) -> Self {
        match m {
            Method::Projected => MethodDoc::Projected,
            Method::Actual => MethodDoc::Actual,
            Method::Adjusted => MethodDoc::Adjusted,
            Method::Error => MethodDoc::Error,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrecedenceMethodDoc {
    Projected,
    #[serde(rename = "actual_or_adjusted")]
    ActualOrAdjusted,
}

impl From<PrecedenceMethod> for PrecedenceMethodDoc {
    fn from(m: PrecedenceMethod) -> Self {
        match m {
            PrecedenceMethod::Projected => PrecedenceMethodDoc::Projected,
            PrecedenceMethod::ActualOrAdjusted => PrecedenceMethodDoc::ActualOrAdjusted,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyDoc {
    pub stage_id: String,
    pub name: String,
    pub final_timestamp: NaiveDate,
    pub method: MethodDoc,
}

/// Wire shape of one stage's result (spec §6 "Stage entries carry the
/// fields of §3's *stage result*").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageResultDoc {
    pub method: MethodDoc,
    pub target_timestamp: Option<NaiveDate>,
    pub actual_timestamp: Option<NaiveDate>,
    pub final_timestamp: Option<NaiveDate>,
    pub delay: Option<i64>,
    pub precedence_method: PrecedenceMethodDoc,
    pub calculation_source: String,
    pub dependencies: Vec<DependencyDoc>,
}

impl From<&StageResult> for StageResultDoc {
    fn from(r: &StageResult) -> Self {
        StageResultDoc {
            method: r.method.into(),
            target_timestamp: r.target_timestamp,
            actual_timestamp: r.actual_timestamp,
            final_timestamp: r.final_timestamp,
            delay: r.delay,
            precedence_method: r.precedence_method.into(),
            calculation_source: r.calculation_source.clone(),
            dependencies: r
                .dependencies
                .iter()
                .map(|d| DependencyDoc {
                    stage_id: d.stage_id.clone(),
                    name: d.name.clone(),
                    final_timestamp: d.final_timestamp,
                    method: d.method.into(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryDoc {
    pub methods_used: BTreeMap<String, u32>,
    pub calculated_stages: u32,
    pub stages_with_delays: u32,
    pub total_delay_days: i64,
    pub critical_path_delays: u32,
    pub completion_rate: f64,
    pub average_delay_days: Option<f64>,
}

/// Wire shape of the per-PO result document (spec §6). Produced from
/// (never stored alongside) a [`PoResult`] — the core's in-memory
/// type stays free of `serde`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoResultDoc {
    pub po_id: String,
    pub calculation_date: NaiveDate,
    pub summary: SummaryDoc,
    pub stages: BTreeMap<String, StageResultDoc>,
}

impl From<&PoResult> for PoResultDoc {
    fn from(result: &PoResult) -> Self {
        let methods_used = result
            .summary
            .methods_used
            .iter()
            .map(|(method, count)| (method_label(*method).to_string(), *count))
            .collect();

        PoResultDoc {
            po_id: result.po_id.clone(),
            calculation_date: result.calculation_date,
            summary: SummaryDoc {
                methods_used,
                calculated_stages: result.summary.calculated_stages,
                stages_with_delays: result.summary.stages_with_delays,
                total_delay_days: result.summary.total_delay_days,
                critical_path_delays: result.summary.critical_path_delays,
                completion_rate: result.summary.completion_rate(),
                average_delay_days: result.summary.average_delay_days(),
            },
            stages: result
                .stages
                .iter()
                .map(|(id, stage)| (id.clone(), StageResultDoc::from(stage)))
                .collect(),
        }
    }
}

fn method_label(method: Method) -> &'static str {
    match method {
        Method::Projected => "projected",
        Method::Actual => "actual",
        Method::Adjusted => "adjusted",
        Method::Error => "error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tat_common::Scalar;
    use tat_config::ConfigLoader;
    use tat_core::Processor;
    use tat_resolver::MapRow;

    #[test]
    fn round_trips_through_json() {
        let catalog = ConfigLoader::load_from_str(
            r#"{"stages": {"1": {"name": "A", "actual_timestamp": "a", "process_flow": {"critical_path": true, "team_owner": "x", "process_type": "y"}, "fallback_calculation": {"expression": "c"}, "lead_time": 1}}}"#,
        )
        .unwrap();
        let row = MapRow(HashMap::from([
            ("c".to_string(), Scalar::Instant(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap())),
            ("a".to_string(), Scalar::Instant(NaiveDate::from_ymd_opt(2025, 6, 2).unwrap())),
        ]));
        let result = Processor::new(&catalog).process("PO-1", &row, NaiveDate::from_ymd_opt(2025, 6, 20).unwrap());
        let doc = PoResultDoc::from(&result);
        let json = serde_json::to_string(&doc).unwrap();
        let back: PoResultDoc = serde_json::from_str(&json).unwrap();
        assert_eq!(back.po_id, "PO-1");
        assert_eq!(back.stages["1"].method, MethodDoc::Actual);
    }
}
