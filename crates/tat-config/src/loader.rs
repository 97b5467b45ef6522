use std::collections::HashMap;
use std::path::Path;

use tat_common::ConfigError;

use crate::cycle::detect_static_cycle;
use crate::model::{RawCatalogDocument, StageCatalog};
use crate::validate::{into_stage_descriptor, validate_catalog, ConfigIssue};

/// Loads and validates a stage catalog from a JSON document (spec §4.1,
/// §6). Fails fast and loudly: the first structural problem or the
/// first detected cycle aborts the load.
pub struct ConfigLoader;

impl ConfigLoader {
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<StageCatalog, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::NotFound(format!("{}: {e}", path.display())))?;
        Self::load_from_str(&text)
    }

    pub fn load_from_str(text: &str) -> Result<StageCatalog, ConfigError> {
        let doc: RawCatalogDocument =
            serde_json::from_str(text).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        Self::load_from_document(doc)
    }

    pub fn load_from_document(doc: RawCatalogDocument) -> Result<StageCatalog, ConfigError> {
        let mut stages = Vec::with_capacity(doc.stages.0.len());
        let mut index = HashMap::with_capacity(doc.stages.0.len());
        for (stage_id, raw) in doc.stages.0 {
            let descriptor = into_stage_descriptor(&stage_id, raw)?;
            if index.contains_key(&stage_id) {
                return Err(ConfigError::DuplicateStageId(stage_id));
            }
            index.insert(stage_id.clone(), stages.len());
            stages.push((stage_id, descriptor));
        }
        let catalog = StageCatalog { stages, index };
        detect_static_cycle(&catalog)?;
        Ok(catalog)
    }

    /// Like [`ConfigLoader::load_from_str`], but runs the richer,
    /// multi-issue [`validate_catalog`] report first and surfaces every
    /// structural problem rather than only the first one encountered
    /// during deserialization — a caller that wants to show a complete
    /// report before fixing anything should use this over
    /// `load_from_str`. Still fails loudly on the first issue (spec
    /// §4.1 "the load phase fails loudly"): a non-empty report is
    /// reported via the first issue's stage id and message.
    pub fn load_and_validate(text: &str) -> Result<(StageCatalog, Vec<ConfigIssue>), ConfigError> {
        let doc: RawCatalogDocument =
            serde_json::from_str(text).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        let issues = validate_catalog(&doc);
        if let Some(first) = issues.first() {
            return Err(ConfigError::BadValue {
                stage_id: first.stage_id.clone(),
                field: "(see full report)",
                reason: first.message.clone(),
            });
        }
        let catalog = Self::load_from_document(doc)?;
        Ok((catalog, issues))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
    {
      "stages": {
        "1": {
          "name": "Approval",
          "actual_timestamp": "po_approval_date",
          "process_flow": {"critical_path": true, "team_owner": "Ops", "process_type": "approval"},
          "fallback_calculation": {"expression": "po_created_date"},
          "lead_time": 1
        },
        "8": {
          "name": "Invoice Approval",
          "actual_timestamp": "pi_invoice_approval_date",
          "preceding_stage": "iff(pi_applicable==1,[5],[2])",
          "process_flow": {"critical_path": true, "team_owner": "Finance", "process_type": "approval"},
          "fallback_calculation": {"expression": "po_created_date"},
          "lead_time": 3
        }
      }
    }
    "#;

    #[test]
    fn loads_valid_catalog() {
        let catalog = ConfigLoader::load_from_str(SAMPLE).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get("1").unwrap().name, "Approval");
    }

    #[test]
    fn rejects_missing_required_field() {
        let bad = r#"{"stages": {"1": {"process_flow": {"critical_path": true, "team_owner": "Ops", "process_type": "approval"}, "fallback_calculation": {"expression": "x"}, "lead_time": 0}}}"#;
        let err = ConfigLoader::load_from_str(bad).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField { field: "name", .. }));
    }

    #[test]
    fn rejects_negative_lead_time() {
        let bad = r#"{"stages": {"1": {"name": "x", "process_flow": {"critical_path": true, "team_owner": "Ops", "process_type": "approval"}, "fallback_calculation": {"expression": "x"}, "lead_time": -1}}}"#;
        let err = ConfigLoader::load_from_str(bad).unwrap_err();
        assert!(matches!(err, ConfigError::BadValue { field: "lead_time", .. }));
    }

    #[test]
    fn detects_static_cycle() {
        let cyclic = r#"
        {
          "stages": {
            "a": {"name": "A", "preceding_stage": "[\"b\"]", "process_flow": {"critical_path": false, "team_owner": "x", "process_type": "y"}, "fallback_calculation": {"expression": "f"}, "lead_time": 0},
            "b": {"name": "B", "preceding_stage": "[\"a\"]", "process_flow": {"critical_path": false, "team_owner": "x", "process_type": "y"}, "fallback_calculation": {"expression": "f"}, "lead_time": 0}
          }
        }
        "#;
        let err = ConfigLoader::load_from_str(cyclic).unwrap_err();
        match err {
            ConfigError::Cycle { cycle } => {
                assert_eq!(cycle.len(), 2);
            }
            other => panic!("expected cycle error, got {other:?}"),
        }
    }

    #[test]
    fn conditional_predecessor_does_not_trip_static_cycle_detection() {
        // stage 8 -> iff(...) guards a reference back to a stage that
        // could, on another branch, reference 8 — the static check
        // must not see through the conditional (spec §4.1).
        let guarded = r#"
        {
          "stages": {
            "5": {"name": "Five", "preceding_stage": "iff(x==1,[8],[])", "process_flow": {"critical_path": false, "team_owner": "x", "process_type": "y"}, "fallback_calculation": {"expression": "f"}, "lead_time": 0},
            "8": {"name": "Eight", "preceding_stage": "[\"5\"]", "process_flow": {"critical_path": false, "team_owner": "x", "process_type": "y"}, "fallback_calculation": {"expression": "f"}, "lead_time": 0}
          }
        }
        "#;
        assert!(ConfigLoader::load_from_str(guarded).is_ok());
    }

    #[test]
    fn file_not_found_is_reported() {
        let err = ConfigLoader::load_from_path("/nonexistent/path/catalog.json").unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn loads_valid_catalog_from_a_file_on_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, SAMPLE.as_bytes()).unwrap();
        let catalog = ConfigLoader::load_from_path(file.path()).unwrap();
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn load_and_validate_returns_an_empty_report_for_a_clean_catalog() {
        let (catalog, issues) = ConfigLoader::load_and_validate(SAMPLE).unwrap();
        assert_eq!(catalog.len(), 2);
        assert!(issues.is_empty());
    }

    #[test]
    fn load_and_validate_surfaces_the_first_structural_issue() {
        let bad = r#"{"stages": {"1": {"process_flow": {"critical_path": true, "team_owner": "Ops", "process_type": "approval"}, "fallback_calculation": {"expression": "x"}, "lead_time": -1}}}"#;
        let err = ConfigLoader::load_and_validate(bad).unwrap_err();
        assert!(matches!(err, ConfigError::BadValue { stage_id, .. } if stage_id == "1"));
    }
}
