use tat_common::Scalar;

/// A PO row's named scalar values. `get` returns `None` only for a
/// column that is truly absent — an explicit null value already
/// present under the key is `Some(Scalar::Null)` and does not warrant
/// a "missing field" diagnostic.
pub trait RowContext {
    fn get(&self, key: &str) -> Option<Scalar>;
}

/// Read-only view the evaluator uses to resolve `stage_<id>` back-
/// references. Backed by the resolver's per-PO memoization cache;
/// never triggers recursion from inside an expression.
pub trait StageContext {
    /// `None` both when the stage has not been resolved yet and when
    /// it resolved to a null final timestamp — the evaluator cannot
    /// and need not distinguish the two.
    fn final_timestamp(&self, stage_id: &str) -> Option<chrono::NaiveDate>;
}

/// A [`StageContext`] with no stages resolved yet — useful for
/// evaluating a fallback expression, which by definition never
/// references `stage_<id>` meaningfully (no predecessor exists).
pub struct EmptyStageContext;

impl StageContext for EmptyStageContext {
    fn final_timestamp(&self, _stage_id: &str) -> Option<chrono::NaiveDate> {
        None
    }
}
