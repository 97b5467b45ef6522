use tat_common::ConfigError;

use crate::model::{RawCatalogDocument, RawStageDescriptor, StageDescriptor};

/// A single structural problem found while validating a stage
/// descriptor. Unlike [`ConfigError`], which fails fast on the first
/// problem (spec §4.1: "the load phase fails loudly"),
/// [`validate_catalog`] collects every issue so a caller can show a
/// complete report before fixing anything — grounded on the richer,
/// multi-issue report the prototype's stage config validator produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigIssue {
    pub stage_id: String,
    pub message: String,
}

/// Collects every structural problem in the raw document without
/// stopping at the first one.
pub fn validate_catalog(doc: &RawCatalogDocument) -> Vec<ConfigIssue> {
    let mut issues = Vec::new();
    for (stage_id, raw) in &doc.stages.0 {
        if stage_id.trim().is_empty() {
            issues.push(ConfigIssue {
                stage_id: stage_id.clone(),
                message: "stage id is empty".to_string(),
            });
        }
        if raw.name.is_none() {
            issues.push(ConfigIssue {
                stage_id: stage_id.clone(),
                message: "missing required field 'name'".to_string(),
            });
        }
        if raw.process_flow.is_none() {
            issues.push(ConfigIssue {
                stage_id: stage_id.clone(),
                message: "missing required field 'process_flow'".to_string(),
            });
        }
        if raw.fallback_calculation.is_none() {
            issues.push(ConfigIssue {
                stage_id: stage_id.clone(),
                message: "missing required field 'fallback_calculation'".to_string(),
            });
        } else if raw
            .fallback_calculation
            .as_ref()
            .is_some_and(|f| f.expression.trim().is_empty())
        {
            issues.push(ConfigIssue {
                stage_id: stage_id.clone(),
                message: "'fallback_calculation.expression' is empty".to_string(),
            });
        }
        match raw.lead_time {
            None => issues.push(ConfigIssue {
                stage_id: stage_id.clone(),
                message: "missing required field 'lead_time'".to_string(),
            }),
            Some(lt) if lt < 0 => issues.push(ConfigIssue {
                stage_id: stage_id.clone(),
                message: format!("'lead_time' must be >= 0, got {lt}"),
            }),
            Some(_) => {}
        }
        if let Some(expr) = &raw.preceding_stage {
            if tat_parse::parse(expr).is_err() {
                issues.push(ConfigIssue {
                    stage_id: stage_id.clone(),
                    message: format!("'preceding_stage' does not parse: {expr}"),
                });
            }
        }
        if let Some(expr) = &raw.actual_timestamp {
            if tat_parse::parse(expr).is_err() {
                issues.push(ConfigIssue {
                    stage_id: stage_id.clone(),
                    message: format!("'actual_timestamp' does not parse: {expr}"),
                });
            }
        }
    }
    issues
}

/// Converts one `RawStageDescriptor` into a validated [`StageDescriptor`],
/// failing fast on the first problem (spec §4.1 structural validation).
pub fn into_stage_descriptor(
    stage_id: &str,
    raw: RawStageDescriptor,
) -> Result<StageDescriptor, ConfigError> {
    if stage_id.trim().is_empty() {
        return Err(ConfigError::EmptyStageId);
    }
    let name = raw.name.ok_or_else(|| ConfigError::MissingField {
        stage_id: stage_id.to_string(),
        field: "name",
    })?;
    let process_flow = raw.process_flow.ok_or_else(|| ConfigError::MissingField {
        stage_id: stage_id.to_string(),
        field: "process_flow",
    })?;
    let fallback_calculation = raw
        .fallback_calculation
        .ok_or_else(|| ConfigError::MissingField {
            stage_id: stage_id.to_string(),
            field: "fallback_calculation.expression",
        })?;
    let lead_time = raw.lead_time.ok_or_else(|| ConfigError::MissingField {
        stage_id: stage_id.to_string(),
        field: "lead_time",
    })?;
    if lead_time < 0 {
        return Err(ConfigError::BadValue {
            stage_id: stage_id.to_string(),
            field: "lead_time",
            reason: format!("must be >= 0, got {lead_time}"),
        });
    }
    if let Some(expr) = &raw.preceding_stage {
        if tat_parse::parse(expr).is_err() {
            return Err(ConfigError::BadValue {
                stage_id: stage_id.to_string(),
                field: "preceding_stage",
                reason: format!("does not parse: {expr}"),
            });
        }
    }
    if let Some(expr) = &raw.actual_timestamp {
        if tat_parse::parse(expr).is_err() {
            return Err(ConfigError::BadValue {
                stage_id: stage_id.to_string(),
                field: "actual_timestamp",
                reason: format!("does not parse: {expr}"),
            });
        }
    }

    Ok(StageDescriptor {
        name,
        actual_timestamp: raw.actual_timestamp,
        preceding_stage: raw.preceding_stage,
        process_flow,
        fallback_calculation,
        lead_time,
    })
}
