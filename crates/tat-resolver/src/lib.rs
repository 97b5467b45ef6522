//! Memoized, cycle-safe per-PO stage resolver (spec §4.3): the heart of
//! the system. [`Resolver::resolve`] walks the stage catalog in
//! dependency order, recursing into predecessors on demand and caching
//! every stage's result for the lifetime of one PO.

mod result;

use std::cell::RefCell;
use std::collections::HashMap;

use chrono::NaiveDate;
use rustc_hash::{FxHashMap, FxHashSet};
use tat_common::{Diagnostic, ExpressionError, ExpressionErrorKind, Scalar};
use tat_config::StageCatalog;
use tat_eval::{EvalMode, ModeValue, RowContext, StageContext};

pub use result::{Dependency, Method, PrecedenceMethod, StageResult};

/// Per-PO memoized resolver (spec §4.3, §4.4: "Reset the resolver
/// cache" at the start of each row). Not `Send`/`Sync` by design — the
/// cache is strictly owned by the evaluating worker (spec §5).
pub struct Resolver<'a> {
    catalog: &'a StageCatalog,
    row: &'a dyn RowContext,
    cache: RefCell<FxHashMap<String, StageResult>>,
    /// Stage ids currently on the call stack, used to turn a
    /// data-dependent (runtime) cycle into a non-propagating `Error`
    /// stub instead of unbounded recursion (spec §4.3 "stage_<id>
    /// back-references… must not trigger recursion"; spec §9 "a
    /// runtime guard (visiting-set) catches data-dependent cycles").
    visiting: RefCell<FxHashSet<String>>,
}

/// Adapts the resolver's own cache as a [`StageContext`] for the
/// evaluator, so `stage_<id>` back-references in an expression read
/// already-committed finals without re-entering [`Resolver::resolve`]
/// (spec §4.3 step 3, §9).
struct CacheView<'a>(&'a RefCell<FxHashMap<String, StageResult>>);

impl<'a> StageContext for CacheView<'a> {
    fn final_timestamp(&self, stage_id: &str) -> Option<NaiveDate> {
        self.0.borrow().get(stage_id).and_then(|r| r.final_timestamp)
    }
}

impl<'a> Resolver<'a> {
    pub fn new(catalog: &'a StageCatalog, row: &'a dyn RowContext) -> Self {
        Self {
            catalog,
            row,
            cache: RefCell::new(FxHashMap::default()),
            visiting: RefCell::new(FxHashSet::default()),
        }
    }

    /// Resolves one stage for this resolver's PO, returning the cached
    /// result on a repeat call (spec §4.3 step 1). Stages are keyed by
    /// id across the whole recursion, so two predecessors sharing a
    /// common ancestor only evaluate it once.
    pub fn resolve(&self, stage_id: &str) -> StageResult {
        if let Some(cached) = self.cache.borrow().get(stage_id) {
            return cached.clone();
        }

        let Some(stage) = self.catalog.get(stage_id) else {
            let err = ExpressionError::new(
                ExpressionErrorKind::UnknownStageId,
                stage_id,
                format!("unknown stage id '{stage_id}'"),
            );
            tracing::warn!(stage_id, error = %err, "resolve called with unknown stage id");
            let result = StageResult::error(err.message.clone());
            self.cache.borrow_mut().insert(stage_id.to_string(), result.clone());
            return result;
        };

        if self.visiting.borrow().contains(stage_id) {
            // Data-dependent cycle: a conditional predecessor chain
            // looped back here while we were still resolving it.
            return StageResult::error(format!("cycle detected at stage '{stage_id}'"));
        }
        self.visiting.borrow_mut().insert(stage_id.to_string());

        let mut diagnostics = Vec::new();

        // Step 2: resolve predecessors.
        let mut dependencies = Vec::new();
        let mut pred_finals = Vec::new();
        let mut pred_actuals = Vec::new();
        let mut any_pred_projected = false;

        if let Some(expr_src) = &stage.preceding_stage {
            let stages = CacheView(&self.cache);
            let (value, diags) = tat_eval::evaluate(expr_src, EvalMode::StageList, self.row, &stages);
            diagnostics.extend(diags);
            let pred_ids = match value {
                ModeValue::StageList(ids) => ids,
                _ => Vec::new(),
            };
            for pred_id in pred_ids {
                if !self.catalog.contains(&pred_id) {
                    let err = ExpressionError::new(
                        ExpressionErrorKind::UnknownStageId,
                        stage_id,
                        format!("predecessor '{pred_id}' does not exist in the catalog"),
                    );
                    tracing::debug!(stage_id, pred_id, error = %err, "dead predecessor reference");
                    diagnostics.push(Diagnostic::for_stage(stage_id, err.message));
                    continue;
                }
                let pred_result = self.resolve(&pred_id);
                if pred_result.method == Method::Error {
                    diagnostics.push(Diagnostic::for_stage(
                        stage_id,
                        format!("predecessor '{pred_id}' could not be resolved (likely a data-dependent cycle)"),
                    ));
                }
                if pred_result.method == Method::Projected {
                    any_pred_projected = true;
                }
                if let Some(final_ts) = pred_result.final_timestamp {
                    pred_finals.push(final_ts);
                    let pred_name = self
                        .catalog
                        .get(&pred_id)
                        .map(|d| d.name.clone())
                        .unwrap_or_default();
                    dependencies.push(Dependency {
                        stage_id: pred_id.clone(),
                        name: pred_name,
                        final_timestamp: final_ts,
                        method: pred_result.method,
                    });
                }
                if let Some(actual_ts) = pred_result.actual_timestamp {
                    pred_actuals.push(actual_ts);
                }
            }
        }

        // Step 3: compute target.
        let (target, calculation_source) = if let Some(base) = pred_finals.iter().copied().max() {
            (
                Some(tat_common::add_days(base, stage.lead_time as f64)),
                "precedence_based".to_string(),
            )
        } else {
            let (value, diags) =
                tat_eval::evaluate(&stage.fallback_calculation.expression, EvalMode::Instant, self.row, &CacheView(&self.cache));
            diagnostics.extend(diags);
            match value {
                ModeValue::Instant(Some(fallback)) => (
                    Some(tat_common::add_days(fallback, stage.lead_time as f64)),
                    "fallback_based".to_string(),
                ),
                _ => (None, "fallback_based".to_string()),
            }
        };

        // Step 4: classify precedence_method.
        let precedence_method = if any_pred_projected {
            PrecedenceMethod::Projected
        } else {
            PrecedenceMethod::ActualOrAdjusted
        };

        // Step 5: read current actual.
        let current_actual = match &stage.actual_timestamp {
            Some(expr_src) => {
                let (value, diags) = tat_eval::evaluate(expr_src, EvalMode::Instant, self.row, &CacheView(&self.cache));
                diagnostics.extend(diags);
                match value {
                    ModeValue::Instant(instant) => instant,
                    _ => None,
                }
            }
            None => None,
        };

        // Step 6: select method and final.
        let max_pred_actual = pred_actuals.iter().copied().max();
        let (method, actual, final_timestamp, calculation_source) = match current_actual {
            Some(current) => match max_pred_actual {
                Some(pred_actual) if pred_actual > current => (
                    Method::Adjusted,
                    Some(pred_actual),
                    Some(pred_actual),
                    "actual_from_precedence".to_string(),
                ),
                _ => (Method::Actual, Some(current), Some(current), "actual_from_field".to_string()),
            },
            None => (
                Method::Projected,
                max_pred_actual,
                target,
                format!("{calculation_source}_target"),
            ),
        };

        // Step 7: delay.
        let delay = if method.is_actual_or_adjusted() {
            match (target, actual) {
                (Some(t), Some(a)) => Some(tat_common::days_between(a, t)),
                _ => None,
            }
        } else {
            None
        };

        let result = StageResult {
            method,
            target_timestamp: target,
            actual_timestamp: actual,
            final_timestamp,
            delay,
            precedence_method,
            calculation_source,
            dependencies,
            diagnostics,
        };

        self.visiting.borrow_mut().remove(stage_id);
        self.cache.borrow_mut().insert(stage_id.to_string(), result.clone());
        result
    }

    /// The PO row scalar lookup this resolver was built with, exposed
    /// so a caller (e.g. the PO Processor) can read fields directly
    /// without going through an expression (used to find the PO id
    /// column, spec §6).
    pub fn row(&self) -> &dyn RowContext {
        self.row
    }
}

/// A `RowContext` over an owned `HashMap<String, Scalar>`, the simplest
/// row shape a caller can hand the resolver (spec §3 "finite mapping
/// from column-name to scalar").
pub struct MapRow(pub HashMap<String, Scalar>);

impl RowContext for MapRow {
    fn get(&self, key: &str) -> Option<Scalar> {
        self.0.get(key).cloned()
    }
}
