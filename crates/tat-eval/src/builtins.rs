use chrono::NaiveDate;
use tat_common::{add_days as add_days_impl, ExpressionError, ExpressionErrorKind, Scalar};

use crate::value::Value;

/// `max(instant, …) → instant?` — maximum of all non-null instant
/// arguments; null if none.
pub fn max(args: &[Value], expr_src: &str) -> Result<Value, ExpressionError> {
    let mut best: Option<NaiveDate> = None;
    for a in args {
        match a.as_scalar() {
            Some(Scalar::Null) | None => continue,
            Some(Scalar::Instant(d)) => best = Some(best.map_or(*d, |b| b.max(*d))),
            Some(_) => {
                return Err(ExpressionError::new(
                    ExpressionErrorKind::TypeMismatch,
                    expr_src,
                    "max() expects instant arguments",
                ))
            }
        }
    }
    Ok(Value::Scalar(best.into()))
}

/// `add_days(instant, number) → instant`; null if either arg null.
pub fn add_days(args: &[Value], expr_src: &str) -> Result<Value, ExpressionError> {
    if args.len() != 2 {
        return Err(ExpressionError::new(
            ExpressionErrorKind::TypeMismatch,
            expr_src,
            "add_days() expects exactly 2 arguments",
        ));
    }
    let (instant, days) = (&args[0], &args[1]);
    match (instant.as_scalar(), days.as_scalar()) {
        (Some(Scalar::Null), _) | (_, Some(Scalar::Null)) => Ok(Value::null()),
        (Some(Scalar::Instant(d)), Some(n)) => match n.as_number() {
            Some(n) => Ok(Value::Scalar(Scalar::Instant(add_days_impl(*d, n)))),
            None => Err(ExpressionError::new(
                ExpressionErrorKind::TypeMismatch,
                expr_src,
                "add_days() second argument must be numeric",
            )),
        },
        _ => Err(ExpressionError::new(
            ExpressionErrorKind::TypeMismatch,
            expr_src,
            "add_days() first argument must be an instant",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> Scalar {
        Scalar::Instant(NaiveDate::from_ymd_opt(y, m, day).unwrap())
    }

    #[test]
    fn max_ignores_nulls() {
        let args = vec![Value::Scalar(d(2025, 6, 1)), Value::null(), Value::Scalar(d(2025, 6, 3))];
        let got = max(&args, "max(...)").unwrap();
        assert_eq!(got, Value::Scalar(d(2025, 6, 3)));
    }

    #[test]
    fn max_of_all_null_is_null() {
        let args = vec![Value::null(), Value::null()];
        assert_eq!(max(&args, "max(...)").unwrap(), Value::null());
    }

    #[test]
    fn add_days_with_null_instant_is_null() {
        let args = vec![Value::null(), Value::Scalar(Scalar::Number(3.0))];
        assert_eq!(add_days(&args, "add_days(...)").unwrap(), Value::null());
    }

    #[test]
    fn add_days_offsets_instant() {
        let args = vec![Value::Scalar(d(2025, 6, 1)), Value::Scalar(Scalar::Number(3.0))];
        assert_eq!(add_days(&args, "add_days(...)").unwrap(), Value::Scalar(d(2025, 6, 4)));
    }
}
