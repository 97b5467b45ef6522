use std::cell::RefCell;

use tat_common::{Diagnostic, ExpressionError, ExpressionErrorKind, Scalar};
use tat_parse::{BinOpKind, CompareKind, Expr};

use crate::builtins;
use crate::mode::{coerce, EvalMode, ModeValue};
use crate::traits::{RowContext, StageContext};
use crate::value::Value;

const STAGE_PREFIX: &str = "stage_";

/// Evaluates one [`Expr`] against a PO row and the resolver's
/// memoized stage table. Never panics and never lets an
/// expression-internal failure escape past [`Evaluator::eval`] except
/// for [`ExpressionErrorKind::UnknownFunction`], which aborts the
/// single expression evaluation.
pub struct Evaluator<'a> {
    row: &'a dyn RowContext,
    stages: &'a dyn StageContext,
    expr_src: &'a str,
    diagnostics: RefCell<Vec<Diagnostic>>,
}

impl<'a> Evaluator<'a> {
    pub fn new(row: &'a dyn RowContext, stages: &'a dyn StageContext, expr_src: &'a str) -> Self {
        Self {
            row,
            stages,
            expr_src,
            diagnostics: RefCell::new(Vec::new()),
        }
    }

    fn warn(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!(expr = self.expr_src, %message, "expression diagnostic");
        self.diagnostics.borrow_mut().push(Diagnostic::new(message));
    }

    pub fn eval(&self, expr: &Expr) -> Result<Value, ExpressionError> {
        match expr {
            Expr::Literal(s) => Ok(Value::Scalar(s.clone())),
            Expr::Name(name) => Ok(Value::Scalar(self.resolve_name(name))),
            Expr::List(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(self.eval(item)?);
                }
                Ok(Value::List(out))
            }
            Expr::BinOp { op, lhs, rhs } => {
                let l = self.eval(lhs)?;
                let r = self.eval(rhs)?;
                Ok(Value::Scalar(self.eval_binop(*op, l, r)))
            }
            Expr::Compare { op, lhs, rhs } => {
                let l = self.eval(lhs)?;
                let r = self.eval(rhs)?;
                Ok(Value::Scalar(Scalar::Bool(self.eval_compare(*op, l, r))))
            }
            Expr::Call { name, args } => self.eval_call(name, args),
        }
    }

    fn resolve_name(&self, name: &str) -> Scalar {
        if let Some(stage_id) = name.strip_prefix(STAGE_PREFIX) {
            return self
                .stages
                .final_timestamp(stage_id)
                .map(Scalar::Instant)
                .unwrap_or(Scalar::Null);
        }
        match self.row.get(name) {
            Some(value) => value,
            None => {
                self.warn(format!("field '{name}' not present in row"));
                Scalar::Null
            }
        }
    }

    fn eval_binop(&self, op: BinOpKind, lhs: Value, rhs: Value) -> Scalar {
        let (lhs, rhs) = match (lhs.as_scalar(), rhs.as_scalar()) {
            (Some(l), Some(r)) => (l.clone(), r.clone()),
            _ => {
                self.warn("binary operator applied to a list value");
                return Scalar::Null;
            }
        };
        if lhs.is_null() || rhs.is_null() {
            return Scalar::Null;
        }
        use BinOpKind::*;
        match (op, lhs, rhs) {
            (Add, Scalar::Instant(d), Scalar::Number(n)) | (Add, Scalar::Number(n), Scalar::Instant(d)) => {
                Scalar::Instant(tat_common::add_days(d, n))
            }
            (Add, l, r) => self.numeric_binop(l, r, |a, b| Some(a + b)),
            (Sub, Scalar::Instant(d), Scalar::Number(n)) => Scalar::Instant(tat_common::add_days(d, -n)),
            (Sub, Scalar::Instant(a), Scalar::Instant(b)) => {
                Scalar::Number(tat_common::days_between(a, b) as f64)
            }
            (Sub, l, r) => self.numeric_binop(l, r, |a, b| Some(a - b)),
            (Mul, l, r) => self.numeric_binop(l, r, |a, b| Some(a * b)),
            (Div, l, r) => self.numeric_div(l, r),
        }
    }

    fn numeric_binop(&self, lhs: Scalar, rhs: Scalar, f: impl Fn(f64, f64) -> Option<f64>) -> Scalar {
        match (lhs.as_number(), rhs.as_number()) {
            (Some(a), Some(b)) => match f(a, b) {
                Some(v) => Scalar::Number(v),
                None => Scalar::Null,
            },
            _ => {
                self.warn("arithmetic operator applied to non-numeric operands");
                Scalar::Null
            }
        }
    }

    fn numeric_div(&self, lhs: Scalar, rhs: Scalar) -> Scalar {
        match (lhs.as_number(), rhs.as_number()) {
            (Some(_), Some(b)) if b == 0.0 => {
                let err = ExpressionError::new(
                    ExpressionErrorKind::DivisionByZero,
                    self.expr_src,
                    "division by zero".to_string(),
                );
                self.warn(err.message.clone());
                Scalar::Null
            }
            (Some(a), Some(b)) => Scalar::Number(a / b),
            _ => {
                self.warn("arithmetic operator applied to non-numeric operands");
                Scalar::Null
            }
        }
    }

    fn eval_compare(&self, op: CompareKind, lhs: Value, rhs: Value) -> bool {
        let (lhs, rhs) = match (lhs.as_scalar(), rhs.as_scalar()) {
            (Some(l), Some(r)) => (l.clone(), r.clone()),
            _ => return false,
        };
        if lhs.is_null() || rhs.is_null() {
            return false;
        }
        use CompareKind::*;
        let ordering = if let (Some(a), Some(b)) = (lhs.as_number(), rhs.as_number()) {
            a.partial_cmp(&b)
        } else if let (Scalar::Instant(a), Scalar::Instant(b)) = (&lhs, &rhs) {
            Some(a.cmp(b))
        } else if let (Scalar::Text(a), Scalar::Text(b)) = (&lhs, &rhs) {
            Some(a.cmp(b))
        } else {
            self.warn("comparison between incompatible value kinds");
            None
        };
        let Some(ordering) = ordering else { return false };
        match op {
            Eq => ordering.is_eq(),
            Ne => !ordering.is_eq(),
            Lt => ordering.is_lt(),
            Le => ordering.is_le(),
            Gt => ordering.is_gt(),
            Ge => ordering.is_ge(),
        }
    }

    fn eval_call(&self, name: &str, args: &[Expr]) -> Result<Value, ExpressionError> {
        match name {
            "iff" | "cond" => self.eval_iff(args),
            "max" => {
                let evaluated = self.eval_args(args)?;
                self.catch_non_fatal(builtins::max(&evaluated, self.expr_src))
            }
            "add_days" => {
                let evaluated = self.eval_args(args)?;
                self.catch_non_fatal(builtins::add_days(&evaluated, self.expr_src))
            }
            other => {
                let err = ExpressionError::new(
                    ExpressionErrorKind::UnknownFunction,
                    self.expr_src,
                    format!("unknown function '{other}'"),
                );
                self.warn(err.message.clone());
                Err(err)
            }
        }
    }

    fn eval_args(&self, args: &[Expr]) -> Result<Vec<Value>, ExpressionError> {
        args.iter().map(|a| self.eval(a)).collect()
    }

    /// Functions only ever fail with `TypeMismatch`/`DivisionByZero`-
    /// shaped errors (arity, coercion); those degrade to null rather
    /// than aborting the expression.
    fn catch_non_fatal(&self, result: Result<Value, ExpressionError>) -> Result<Value, ExpressionError> {
        match result {
            Ok(v) => Ok(v),
            Err(e) => {
                self.warn(e.message.clone());
                Ok(Value::null())
            }
        }
    }

    fn eval_iff(&self, args: &[Expr]) -> Result<Value, ExpressionError> {
        if args.len() != 3 {
            self.warn("iff()/cond() expects exactly 3 arguments");
            return Ok(Value::null());
        }
        let cond = self.eval(&args[0])?;
        let truthy = cond.as_scalar().and_then(Scalar::as_bool).unwrap_or(false);
        if truthy {
            self.eval(&args[1])
        } else {
            self.eval(&args[2])
        }
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics.into_inner()
    }
}

/// Parses and evaluates `src`, coercing the result into `mode`.
/// Returns the diagnostics collected along the way; this never panics
/// and never returns a propagated error.
pub fn evaluate(
    src: &str,
    mode: EvalMode,
    row: &dyn RowContext,
    stages: &dyn StageContext,
) -> (ModeValue, Vec<Diagnostic>) {
    let expr = match tat_parse::parse(src) {
        Ok(expr) => expr,
        Err(e) => {
            let err = ExpressionError::new(ExpressionErrorKind::ParseError, src, e.to_string());
            let diag = Diagnostic::new(format!("parse error in '{src}': {}", err.message));
            tracing::warn!(expr = src, error = %err, "expression parse error");
            let empty = match mode {
                EvalMode::StageList => ModeValue::StageList(Vec::new()),
                EvalMode::Instant => ModeValue::Instant(None),
                EvalMode::Raw => ModeValue::Raw(Scalar::Null),
            };
            return (empty, vec![diag]);
        }
    };
    let evaluator = Evaluator::new(row, stages, src);
    let value = evaluator.eval(&expr).unwrap_or_else(|_| Value::null());
    let diagnostics = evaluator.into_diagnostics();
    (coerce(value, mode), diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::EmptyStageContext;
    use chrono::NaiveDate;
    use std::collections::HashMap;

    struct MapRow(HashMap<String, Scalar>);
    impl RowContext for MapRow {
        fn get(&self, key: &str) -> Option<Scalar> {
            self.0.get(key).cloned()
        }
    }

    fn d(y: i32, m: u32, day: u32) -> Scalar {
        Scalar::Instant(NaiveDate::from_ymd_opt(y, m, day).unwrap())
    }

    #[test]
    fn resolves_bare_field_name() {
        let row = MapRow(HashMap::from([("po_created_date".to_string(), d(2025, 6, 1))]));
        let (value, diags) = evaluate("po_created_date", EvalMode::Instant, &row, &EmptyStageContext);
        assert_eq!(value, ModeValue::Instant(Some(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap())));
        assert!(diags.is_empty());
    }

    #[test]
    fn missing_field_is_null_with_diagnostic() {
        let row = MapRow(HashMap::new());
        let (value, diags) = evaluate("missing_field", EvalMode::Instant, &row, &EmptyStageContext);
        assert_eq!(value, ModeValue::Instant(None));
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn iff_only_evaluates_selected_branch() {
        let row = MapRow(HashMap::from([("pi_applicable".to_string(), Scalar::Number(1.0))]));
        let (value, _) = evaluate(
            "iff(pi_applicable==1,[5],[2])",
            EvalMode::StageList,
            &row,
            &EmptyStageContext,
        );
        assert_eq!(value, ModeValue::StageList(vec!["5".to_string()]));
    }

    #[test]
    fn iff_does_not_evaluate_the_losing_branch() {
        let row = MapRow(HashMap::from([("x".to_string(), Scalar::Number(0.0))]));
        // `missing_field` would raise a diagnostic if touched; it must
        // not be, since the condition selects the `42` branch.
        let (value, diags) = evaluate(
            "iff(x==1, missing_field, 42)",
            EvalMode::Raw,
            &row,
            &EmptyStageContext,
        );
        assert_eq!(value, ModeValue::Raw(Scalar::Number(42.0)));
        assert!(diags.is_empty());
    }

    #[test]
    fn unknown_function_yields_null() {
        let row = MapRow(HashMap::new());
        let (value, diags) = evaluate("nope(1,2)", EvalMode::Raw, &row, &EmptyStageContext);
        assert_eq!(value, ModeValue::Raw(Scalar::Null));
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn division_by_zero_is_null_not_fault() {
        let row = MapRow(HashMap::new());
        let (value, _) = evaluate("1/0", EvalMode::Raw, &row, &EmptyStageContext);
        assert_eq!(value, ModeValue::Raw(Scalar::Null));
    }

    #[test]
    fn instant_minus_instant_is_integer_days() {
        let row = MapRow(HashMap::from([
            ("a".to_string(), d(2025, 6, 12)),
            ("b".to_string(), d(2025, 6, 1)),
        ]));
        let (value, _) = evaluate("a - b", EvalMode::Raw, &row, &EmptyStageContext);
        assert_eq!(value, ModeValue::Raw(Scalar::Number(11.0)));
    }

    #[test]
    fn comparison_with_null_is_false() {
        let row = MapRow(HashMap::new());
        let (value, _) = evaluate("missing == 1", EvalMode::Raw, &row, &EmptyStageContext);
        assert_eq!(value, ModeValue::Raw(Scalar::Bool(false)));
    }

    struct FixedStages(HashMap<String, NaiveDate>);
    impl StageContext for FixedStages {
        fn final_timestamp(&self, stage_id: &str) -> Option<NaiveDate> {
            self.0.get(stage_id).copied()
        }
    }

    #[test]
    fn stage_backreference_reads_cache_without_recursing() {
        let row = MapRow(HashMap::new());
        let stages = FixedStages(HashMap::from([("5".to_string(), NaiveDate::from_ymd_opt(2025, 6, 8).unwrap())]));
        let (value, _) = evaluate("stage_5", EvalMode::Instant, &row, &stages);
        assert_eq!(value, ModeValue::Instant(Some(NaiveDate::from_ymd_opt(2025, 6, 8).unwrap())));
    }
}
