use tat_config::StageCatalog;
use tat_core::PoResult;
use tat_resolver::{Method, PrecedenceMethod, StageResult};

/// One of the seven facets a [`MatrixExport`] pivots per-PO results
/// into (spec §4.5, §6 "Matrix export").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facet {
    Method,
    ActualTimestamps,
    TargetTimestamps,
    FinalTimestamps,
    Delay,
    PrecedenceMethod,
    CalculationSource,
}

impl Facet {
    pub const ALL: [Facet; 7] = [
        Facet::Method,
        Facet::ActualTimestamps,
        Facet::TargetTimestamps,
        Facet::FinalTimestamps,
        Facet::Delay,
        Facet::PrecedenceMethod,
        Facet::CalculationSource,
    ];

    /// The sheet name spec §6 names for this facet.
    pub fn sheet_name(self) -> &'static str {
        match self {
            Facet::Method => "Method",
            Facet::ActualTimestamps => "Actual_Timestamps",
            Facet::TargetTimestamps => "Target_Timestamps",
            Facet::FinalTimestamps => "Final_Timestamps",
            Facet::Delay => "Delay",
            Facet::PrecedenceMethod => "Precedence_Method",
            Facet::CalculationSource => "Calculation_Source",
        }
    }

    fn cell(self, stage: Option<&StageResult>) -> String {
        let Some(stage) = stage else { return String::new() };
        match self {
            Facet::Method => method_label(stage.method).to_string(),
            Facet::ActualTimestamps => stage.actual_timestamp.map(|d| d.to_string()).unwrap_or_default(),
            Facet::TargetTimestamps => stage.target_timestamp.map(|d| d.to_string()).unwrap_or_default(),
            Facet::FinalTimestamps => stage.final_timestamp.map(|d| d.to_string()).unwrap_or_default(),
            Facet::Delay => stage.delay.map(|d| d.to_string()).unwrap_or_default(),
            Facet::PrecedenceMethod => precedence_label(stage.precedence_method).to_string(),
            Facet::CalculationSource => stage.calculation_source.clone(),
        }
    }
}

fn method_label(method: Method) -> &'static str {
    match method {
        Method::Projected => "Projected",
        Method::Actual => "Actual",
        Method::Adjusted => "Adjusted",
        Method::Error => "Error",
    }
}

fn precedence_label(method: PrecedenceMethod) -> &'static str {
    match method {
        PrecedenceMethod::Projected => "Projected",
        PrecedenceMethod::ActualOrAdjusted => "Actual/Adjusted",
    }
}

/// One sheet: a leading `PO_ID` column followed by one column per
/// stage, ordered by catalog position (spec §6).
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: &'static str,
    pub stage_columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// The workbook-like container of seven named sheets (spec §6).
#[derive(Debug, Clone, Default)]
pub struct MatrixExport {
    pub sheets: Vec<Sheet>,
}

/// Pivots a collection of [`PoResult`]s into the seven PO×Stage
/// matrices (spec §4.5). Missing cells are empty strings, per spec §6.
pub fn export_matrices(catalog: &StageCatalog, results: &[PoResult]) -> MatrixExport {
    let stage_columns: Vec<String> = catalog
        .stage_ids()
        .map(|id| catalog.get(id).map(|d| d.name.clone()).unwrap_or_else(|| id.to_string()))
        .collect();
    let stage_ids: Vec<&str> = catalog.stage_ids().collect();

    let sheets = Facet::ALL
        .into_iter()
        .map(|facet| Sheet {
            name: facet.sheet_name(),
            stage_columns: stage_columns.clone(),
            rows: results
                .iter()
                .map(|result| {
                    let mut row = Vec::with_capacity(stage_ids.len() + 1);
                    row.push(result.po_id.clone());
                    row.extend(stage_ids.iter().map(|id| facet.cell(result.stages.get(*id))));
                    row
                })
                .collect(),
        })
        .collect();

    MatrixExport { sheets }
}
