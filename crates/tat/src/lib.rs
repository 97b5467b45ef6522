//! Facade crate wiring the TAT timeline engine's layers — value types,
//! expression parser/evaluator, stage catalog, resolver, PO processor,
//! and the I/O boundary — into one public API, feature-gated the way
//! the teacher's top-level crate lets downstream users opt into only
//! the layers they need.

#[cfg(feature = "common")]
pub use tat_common as common;

#[cfg(feature = "parse")]
pub use tat_parse as parse;

#[cfg(feature = "eval")]
pub use tat_eval as eval;

#[cfg(feature = "config")]
pub use tat_config as config;

#[cfg(feature = "resolver")]
pub use tat_resolver as resolver;

#[cfg(feature = "core")]
pub use tat_core as core;

#[cfg(feature = "io")]
pub use tat_io as io;

#[cfg(feature = "config")]
pub use tat_config::{ConfigLoader, StageCatalog};

#[cfg(feature = "resolver")]
pub use tat_resolver::{Method, PrecedenceMethod, Resolver, StageResult};

#[cfg(feature = "core")]
pub use tat_core::{PoResult, Processor, Summary};

#[cfg(feature = "io")]
pub use tat_io::{export_matrices, BatchDriver, BatchResult, CancellationToken, MatrixExport, Row, RowSource};
