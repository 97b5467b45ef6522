use std::collections::HashMap;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

/// Descriptive metadata that the engine threads through to the result
/// document but never interprets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessFlow {
    pub critical_path: bool,
    #[serde(default)]
    pub parallel_processes: Vec<String>,
    #[serde(default)]
    pub handoff_points: Vec<String>,
    pub process_type: String,
    pub team_owner: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackCalculation {
    pub expression: String,
}

/// Raw, as-deserialized shape of one stage entry. Field
/// presence is checked by [`crate::validate::validate_catalog`]; this
/// struct only enforces shape.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawStageDescriptor {
    pub name: Option<String>,
    #[serde(default)]
    pub actual_timestamp: Option<String>,
    #[serde(default)]
    pub preceding_stage: Option<String>,
    pub process_flow: Option<ProcessFlow>,
    pub fallback_calculation: Option<FallbackCalculation>,
    pub lead_time: Option<i64>,
}

/// `stage-id → raw descriptor` entries in the order they appeared in
/// the source document. A plain `serde(Deserialize)` onto a
/// `BTreeMap`/`HashMap` would re-sort or scramble that order; this
/// hand-rolled `Visitor` walks the `MapAccess` in document order and
/// collects it into a `Vec`, matching `original_source/models_config.py`'s
/// `StagesConfig.stages: Dict[str, StageConfig]` (a plain Python dict,
/// which preserves insertion order and is never re-sorted).
#[derive(Debug, Clone, Default)]
pub struct StageMap(pub Vec<(String, RawStageDescriptor)>);

impl<'de> Deserialize<'de> for StageMap {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct StageMapVisitor;

        impl<'de> Visitor<'de> for StageMapVisitor {
            type Value = StageMap;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of stage id to stage descriptor")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry::<String, RawStageDescriptor>()? {
                    entries.push(entry);
                }
                Ok(StageMap(entries))
            }
        }

        deserializer.deserialize_map(StageMapVisitor)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawCatalogDocument {
    pub stages: StageMap,
}

/// A validated stage descriptor (spec §3).
#[derive(Debug, Clone, PartialEq)]
pub struct StageDescriptor {
    pub name: String,
    pub actual_timestamp: Option<String>,
    pub preceding_stage: Option<String>,
    pub process_flow: ProcessFlow,
    pub fallback_calculation: FallbackCalculation,
    pub lead_time: i64,
}

/// A validated, load-time-checked stage catalog (spec §3, §4.1).
/// Stages are kept in a `Vec` in the order the source document
/// declared them, with a side `HashMap` for `O(1)` lookup — spec §6
/// "Matrix export… columns indexed by stage name in catalog position"
/// and §4.4's "catalog order… used for reproducible output" both mean
/// the document's declared order, not a re-sorted one (spec §8,
/// "Sorting the catalog's stage-id order does not change per-stage
/// outputs" only says *results* are order-invariant, not that the
/// *catalog* may reorder itself).
#[derive(Debug, Clone)]
pub struct StageCatalog {
    pub(crate) stages: Vec<(String, StageDescriptor)>,
    pub(crate) index: HashMap<String, usize>,
}

impl StageCatalog {
    pub fn get(&self, stage_id: &str) -> Option<&StageDescriptor> {
        self.index.get(stage_id).map(|&i| &self.stages[i].1)
    }

    pub fn contains(&self, stage_id: &str) -> bool {
        self.index.contains_key(stage_id)
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Stage ids in catalog (document declaration) order, for
    /// reproducible output (spec §4.4).
    pub fn stage_ids(&self) -> impl Iterator<Item = &str> {
        self.stages.iter().map(|(id, _)| id.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &StageDescriptor)> {
        self.stages.iter().map(|(k, v)| (k.as_str(), v))
    }
}
