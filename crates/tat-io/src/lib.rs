//! Row source adapters, per-PO result document serialization, the
//! batch driver, and the matrix exporter (spec §4.5, §6) — the
//! external-interface boundary around the core resolver/processor.

mod batch;
mod document;
mod export;
mod row_source;
mod stage_timeline;

pub use batch::{BatchDriver, BatchResult, CancellationToken, ErrorRecord};
pub use document::{DependencyDoc, MethodDoc, PoResultDoc, PrecedenceMethodDoc, StageResultDoc, SummaryDoc};
pub use export::{export_matrices, Facet, MatrixExport, Sheet};
pub use row_source::{CsvRowSource, JsonRowSource, Row, RowSource, VecRowSource, PO_ID_COLUMN};
pub use stage_timeline::{stage_timeline, StageTimeline, StageTimelineRow};
