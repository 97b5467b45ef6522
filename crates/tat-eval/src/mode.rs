use chrono::NaiveDate;
use tat_common::Scalar;

use crate::value::Value;

/// How the caller intends to interpret an expression's result (spec
/// §4.2, "Return-type discipline").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalMode {
    /// Coerce a non-list scalar to a singleton list; coerce numeric
    /// stage-ids to strings.
    StageList,
    /// Expect an instant, or null.
    Instant,
    /// Value unchanged.
    Raw,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ModeValue {
    StageList(Vec<String>),
    Instant(Option<NaiveDate>),
    Raw(Scalar),
}

/// Coerce an evaluated [`Value`] into the shape `mode` expects.
/// Coercion failures yield the mode's "empty" value, never a panic or
/// propagated error.
pub fn coerce(value: Value, mode: EvalMode) -> ModeValue {
    match mode {
        EvalMode::StageList => ModeValue::StageList(coerce_stage_list(value)),
        EvalMode::Instant => ModeValue::Instant(coerce_instant(value)),
        EvalMode::Raw => ModeValue::Raw(coerce_raw(value)),
    }
}

fn coerce_stage_list(value: Value) -> Vec<String> {
    match value {
        Value::List(items) => items
            .into_iter()
            .filter_map(|v| v.as_scalar().and_then(Scalar::to_stage_id))
            .collect(),
        Value::Scalar(Scalar::Null) => Vec::new(),
        Value::Scalar(s) => s.to_stage_id().into_iter().collect(),
    }
}

fn coerce_instant(value: Value) -> Option<NaiveDate> {
    match value {
        Value::Scalar(s) => s.as_instant(),
        Value::List(_) => None,
    }
}

fn coerce_raw(value: Value) -> Scalar {
    match value {
        Value::Scalar(s) => s,
        Value::List(_) => Scalar::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_list_coerces_singleton_scalar() {
        let v = Value::Scalar(Scalar::Number(5.0));
        assert_eq!(coerce(v, EvalMode::StageList), ModeValue::StageList(vec!["5".into()]));
    }

    #[test]
    fn stage_list_of_null_is_empty() {
        let v = Value::Scalar(Scalar::Null);
        assert_eq!(coerce(v, EvalMode::StageList), ModeValue::StageList(vec![]));
    }

    #[test]
    fn stage_list_passes_through_list() {
        let v = Value::List(vec![Value::Scalar(Scalar::Number(5.0)), Value::Scalar(Scalar::Text("2".into()))]);
        assert_eq!(
            coerce(v, EvalMode::StageList),
            ModeValue::StageList(vec!["5".into(), "2".into()])
        );
    }
}
