use tat_common::Scalar;

/// The interpreter's internal working value. Distinct from [`Scalar`]
/// only in that a `List` literal or a list-producing `iff` branch needs
/// somewhere to live before the caller coerces it into one of the
/// three return modes.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(Scalar),
    List(Vec<Value>),
}

impl Value {
    pub fn null() -> Self {
        Value::Scalar(Scalar::Null)
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Value::Scalar(s) => Some(s),
            Value::List(_) => None,
        }
    }
}

impl From<Scalar> for Value {
    fn from(s: Scalar) -> Self {
        Value::Scalar(s)
    }
}
