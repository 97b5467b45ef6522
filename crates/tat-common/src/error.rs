//! Error taxonomy for the TAT timeline engine.
//!
//! - **`ConfigError`** — fatal, raised while loading the stage catalog.
//! - **`ExpressionErrorKind`** — scoped to a single expression evaluation;
//!   never escapes past the evaluator. Coercion failures yield null
//!   plus a diagnostic, never an exception that escapes.
//! - **`RowError`** — captured into a batch error report; never aborts
//!   the batch.

use std::fmt;
use thiserror::Error;

/// Fatal configuration load/validation failures.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("configuration not found: {0}")]
    NotFound(String),

    #[error("configuration parse error: {0}")]
    ParseError(String),

    #[error("configuration invalid: cycle through stages {cycle:?}")]
    Cycle { cycle: Vec<String> },

    #[error("configuration invalid: stage '{stage_id}' missing required field '{field}'")]
    MissingField { stage_id: String, field: &'static str },

    #[error("configuration invalid: stage '{stage_id}' field '{field}' has an invalid value: {reason}")]
    BadValue {
        stage_id: String,
        field: &'static str,
        reason: String,
    },

    #[error("configuration invalid: stage id is empty")]
    EmptyStageId,

    #[error("configuration invalid: duplicate stage id '{0}'")]
    DuplicateStageId(String),
}

/// The narrow set of failure kinds a single expression evaluation can
/// surface. Always scoped — the caller turns any of these into a null
/// result plus a diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpressionErrorKind {
    ParseError,
    UnknownFunction,
    TypeMismatch,
    DivisionByZero,
    UnknownStageId,
}

impl fmt::Display for ExpressionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ParseError => "ParseError",
            Self::UnknownFunction => "UnknownFunction",
            Self::TypeMismatch => "TypeMismatch",
            Self::DivisionByZero => "DivisionByZero",
            Self::UnknownStageId => "UnknownStageId",
        })
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
#[error("expression error [{kind}] evaluating `{expression}`: {message}")]
pub struct ExpressionError {
    pub kind: ExpressionErrorKind,
    pub expression: String,
    pub message: String,
}

impl ExpressionError {
    pub fn new(kind: ExpressionErrorKind, expression: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            expression: expression.into(),
            message: message.into(),
        }
    }
}

/// An uncaught failure while processing one PO. Carries enough context
/// to land in the batch error report without aborting the rest of the
/// batch.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("row processing error for PO '{po_id}': {message}")]
pub struct RowError {
    pub po_id: String,
    pub message: String,
    /// The panic location captured from the fault boundary, if any
    /// (spec §6 error-report `stack` field). `None` when the failure
    /// carries no panic location (not yet observed, or captured
    /// outside a panic hook).
    pub stack: Option<String>,
}

impl RowError {
    pub fn new(po_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            po_id: po_id.into(),
            message: message.into(),
            stack: None,
        }
    }

    pub fn with_stack(mut self, stack: Option<String>) -> Self {
        self.stack = stack;
        self
    }
}
