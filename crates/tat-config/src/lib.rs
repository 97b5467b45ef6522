//! Stage catalog model, JSON loader, and static cycle detection
//! (spec §4.1).

mod cycle;
mod loader;
mod model;
mod validate;

pub use cycle::{detect_static_cycle, static_predecessors};
pub use loader::ConfigLoader;
pub use model::{
    FallbackCalculation, ProcessFlow, RawCatalogDocument, RawStageDescriptor, StageCatalog,
    StageDescriptor, StageMap,
};
pub use validate::{into_stage_descriptor, validate_catalog, ConfigIssue};
