use chrono::NaiveDate;
use tat_common::Diagnostic;

/// How `final_timestamp` was derived (spec GLOSSARY, §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Projected,
    Actual,
    Adjusted,
    Error,
}

impl Method {
    pub fn is_actual_or_adjusted(self) -> bool {
        matches!(self, Method::Actual | Method::Adjusted)
    }
}

/// Whether *any* predecessor was Projected (spec §3, §4.3 step 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrecedenceMethod {
    Projected,
    ActualOrAdjusted,
}

/// One predecessor actually used in computing a stage's target/delay
/// (spec §3: "dependencies… actually used").
#[derive(Debug, Clone, PartialEq)]
pub struct Dependency {
    pub stage_id: String,
    pub name: String,
    pub final_timestamp: NaiveDate,
    pub method: Method,
}

/// The full, explained result of resolving one stage for one PO
/// (spec §3 "Stage result").
#[derive(Debug, Clone, PartialEq)]
pub struct StageResult {
    pub method: Method,
    pub target_timestamp: Option<NaiveDate>,
    pub actual_timestamp: Option<NaiveDate>,
    pub final_timestamp: Option<NaiveDate>,
    pub delay: Option<i64>,
    pub precedence_method: PrecedenceMethod,
    pub calculation_source: String,
    pub dependencies: Vec<Dependency>,
    pub diagnostics: Vec<Diagnostic>,
}

impl StageResult {
    pub(crate) fn error(message: impl Into<String>) -> Self {
        StageResult {
            method: Method::Error,
            target_timestamp: None,
            actual_timestamp: None,
            final_timestamp: None,
            delay: None,
            precedence_method: PrecedenceMethod::ActualOrAdjusted,
            calculation_source: "error".to_string(),
            dependencies: Vec::new(),
            diagnostics: vec![Diagnostic::new(message)],
        }
    }
}
