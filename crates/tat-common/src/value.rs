use chrono::NaiveDate;
use std::fmt::{self, Display};
use std::hash::{Hash, Hasher};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A PO row scalar, or the result of evaluating an expression against one.
///
/// `Instant` is a calendar day — time zones and time-of-day arithmetic
/// are out of scope, so there is no time-of-day component.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    Instant(NaiveDate),
}

impl Scalar {
    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    pub fn as_instant(&self) -> Option<NaiveDate> {
        match self {
            Scalar::Instant(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Scalar::Number(n) => Some(*n),
            Scalar::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Scalar::Bool(b) => Some(*b),
            Scalar::Number(n) => Some(*n != 0.0),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Scalar::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Coerce a numeric-looking stage-id scalar (e.g. `8` or `"8"`) to its
    /// string form, as required when a predecessor list is built from a
    /// data-dependent expression.
    pub fn to_stage_id(&self) -> Option<String> {
        match self {
            Scalar::Text(s) => Some(s.clone()),
            Scalar::Number(n) if n.fract() == 0.0 => Some(format!("{}", *n as i64)),
            _ => None,
        }
    }
}

impl Eq for Scalar {}

impl Hash for Scalar {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Scalar::Null => state.write_u8(0),
            Scalar::Bool(b) => b.hash(state),
            Scalar::Number(n) => n.to_bits().hash(state),
            Scalar::Text(s) => s.hash(state),
            Scalar::Instant(d) => d.hash(state),
        }
    }
}

impl Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => write!(f, ""),
            Scalar::Bool(b) => write!(f, "{b}"),
            Scalar::Number(n) => write!(f, "{n}"),
            Scalar::Text(s) => write!(f, "{s}"),
            Scalar::Instant(d) => write!(f, "{d}"),
        }
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Scalar::Bool(b)
    }
}

impl From<f64> for Scalar {
    fn from(n: f64) -> Self {
        Scalar::Number(n)
    }
}

impl From<i64> for Scalar {
    fn from(n: i64) -> Self {
        Scalar::Number(n as f64)
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::Text(s)
    }
}

impl From<NaiveDate> for Scalar {
    fn from(d: NaiveDate) -> Self {
        Scalar::Instant(d)
    }
}

impl From<Option<NaiveDate>> for Scalar {
    fn from(d: Option<NaiveDate>) -> Self {
        match d {
            Some(d) => Scalar::Instant(d),
            None => Scalar::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_stage_id_coerces_to_string() {
        assert_eq!(Scalar::Number(8.0).to_stage_id(), Some("8".to_string()));
        assert_eq!(Scalar::Text("8".into()).to_stage_id(), Some("8".to_string()));
        assert_eq!(Scalar::Number(8.5).to_stage_id(), None);
        assert_eq!(Scalar::Null.to_stage_id(), None);
    }

    #[test]
    fn bool_is_truthy_number() {
        assert_eq!(Scalar::Bool(true).as_number(), Some(1.0));
        assert_eq!(Scalar::Bool(false).as_number(), Some(0.0));
        assert_eq!(Scalar::Number(3.0).as_bool(), Some(true));
        assert_eq!(Scalar::Number(0.0).as_bool(), Some(false));
    }

    #[test]
    fn null_has_no_instant_or_number() {
        assert_eq!(Scalar::Null.as_instant(), None);
        assert_eq!(Scalar::Null.as_number(), None);
    }
}
