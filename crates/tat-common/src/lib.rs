//! Core value, error, and date-arithmetic types shared across the TAT
//! timeline engine's parser, evaluator, resolver, and exporter crates.

mod date;
mod diagnostic;
mod error;
mod value;

pub use date::{add_days, days_between};
pub use diagnostic::Diagnostic;
pub use error::{ConfigError, ExpressionError, ExpressionErrorKind, RowError};
pub use value::Scalar;
