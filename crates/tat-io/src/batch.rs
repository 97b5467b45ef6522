use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Once;

use chrono::NaiveDate;
use tat_common::RowError;
use tat_config::StageCatalog;
use tat_core::{PoResult, Processor};

use crate::row_source::{Row, RowSource};

/// One row the batch driver could not complete (spec §6 "Error report",
/// §7 "`RowProcessingError`").
#[derive(Debug, Clone)]
pub struct ErrorRecord {
    pub index: usize,
    pub po_id: String,
    pub error_message: String,
    pub stack: Option<String>,
}

impl ErrorRecord {
    fn from_row_error(index: usize, error: RowError) -> Self {
        Self {
            index,
            po_id: error.po_id,
            error_message: error.message,
            stack: error.stack,
        }
    }
}

/// Outcome of running the batch driver over a row source (spec §4.5).
/// Ordering matches input row order (spec §5); a caller who processed
/// rows out of order must restore this ordering before populating this
/// struct — [`BatchDriver::run`] always does, since it is serial.
#[derive(Debug, Default)]
pub struct BatchResult {
    pub results: Vec<PoResult>,
    pub errors: Vec<ErrorRecord>,
}

/// A caller-provided cancellation flag, checked between POs (spec §5
/// "a long batch should honor a caller-provided cancellation signal
/// checked between POs"). Cheaply shareable across a worker pool.
#[derive(Debug, Default)]
pub struct CancellationToken(AtomicBool);

impl CancellationToken {
    pub fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Iterates many PO rows, invoking [`Processor::process`] inside a
/// fault boundary per row so that one bad row never halts the batch
/// (spec §4.5).
pub struct BatchDriver<'a> {
    catalog: &'a StageCatalog,
}

impl<'a> BatchDriver<'a> {
    pub fn new(catalog: &'a StageCatalog) -> Self {
        Self { catalog }
    }

    /// Runs the batch serially over `source`, stamping every row with
    /// `calculation_date`. Stops early (without losing already
    /// collected results) if `cancel` becomes signalled between rows.
    pub fn run(&self, source: &dyn RowSource, calculation_date: NaiveDate, cancel: &CancellationToken) -> BatchResult {
        let processor = Processor::new(self.catalog);
        let mut out = BatchResult::default();

        for (index, row) in source.rows().enumerate() {
            if cancel.is_cancelled() {
                tracing::info!(index, "batch cancelled between rows");
                break;
            }
            self.process_one(&processor, index, &row, calculation_date, &mut out);
        }
        out
    }

    /// Runs the batch over a bounded worker pool (spec §5: "Batch
    /// processing over many POs is embarrassingly parallel — each PO
    /// owns a private resolver instance and cache… Implementations may
    /// process rows concurrently with a bounded worker pool"). Rows are
    /// split into `worker_count` contiguous chunks, each chunk driven by
    /// its own [`Processor`] (and therefore its own resolver cache) on
    /// a scoped thread; results are re-sorted by input index before
    /// returning, since "under parallel execution, implementations must
    /// re-sort by input index before exporting" (spec §5).
    ///
    /// `worker_count` is clamped to at least 1 and to the row count, so
    /// this never spawns more threads than there is work to do.
    pub fn run_parallel(
        &self,
        source: &dyn RowSource,
        calculation_date: NaiveDate,
        cancel: &CancellationToken,
        worker_count: usize,
    ) -> BatchResult {
        let rows: Vec<Row> = source.rows().collect();
        if rows.is_empty() {
            return BatchResult::default();
        }
        let worker_count = worker_count.clamp(1, rows.len());
        let chunk_size = rows.len().div_ceil(worker_count);

        let mut indexed: Vec<(usize, Result<PoResult, ErrorRecord>)> = Vec::with_capacity(rows.len());
        std::thread::scope(|scope| {
            let handles: Vec<_> = rows
                .chunks(chunk_size)
                .enumerate()
                .map(|(chunk_idx, chunk)| {
                    let base = chunk_idx * chunk_size;
                    let catalog = self.catalog;
                    scope.spawn(move || {
                        let processor = Processor::new(catalog);
                        let mut chunk_out = Vec::with_capacity(chunk.len());
                        for (offset, row) in chunk.iter().enumerate() {
                            let index = base + offset;
                            if cancel.is_cancelled() {
                                break;
                            }
                            chunk_out.push((index, Self::process_outcome(&processor, index, row, calculation_date)));
                        }
                        chunk_out
                    })
                })
                .collect();

            for handle in handles {
                match handle.join() {
                    Ok(chunk_out) => indexed.extend(chunk_out),
                    Err(_) => tracing::error!("worker thread panicked outside the per-row fault boundary"),
                }
            }
        });

        indexed.sort_by_key(|(index, _)| *index);

        let mut out = BatchResult::default();
        for (_, outcome) in indexed {
            match outcome {
                Ok(result) => out.results.push(result),
                Err(error) => out.errors.push(error),
            }
        }
        out
    }

    fn process_outcome(
        processor: &Processor<'_>,
        index: usize,
        row: &Row,
        calculation_date: NaiveDate,
    ) -> Result<PoResult, ErrorRecord> {
        install_panic_location_hook();
        let po_id = row.po_id(index);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| processor.process(po_id.clone(), row, calculation_date)));
        outcome.map_err(|panic_payload| {
            let message = panic_message(&panic_payload);
            let stack = LAST_PANIC_LOCATION.with(|cell| cell.borrow_mut().take());
            tracing::error!(index, po_id, message, stack = stack.as_deref().unwrap_or("<unavailable>"), "row processing failed");
            let error = RowError::new(po_id.clone(), message).with_stack(stack);
            ErrorRecord::from_row_error(index, error)
        })
    }

    // `Processor::process` does not itself panic in practice, but the
    // fault boundary spec §4.5 describes ("any uncaught failure during
    // one PO") is honored structurally here too: a panic inside one
    // row's processing is caught and degrades to an error record
    // instead of aborting the whole batch.
    fn process_one(&self, processor: &Processor<'_>, index: usize, row: &Row, calculation_date: NaiveDate, out: &mut BatchResult) {
        match Self::process_outcome(processor, index, row, calculation_date) {
            Ok(result) => out.results.push(result),
            Err(error) => out.errors.push(error),
        }
    }
}

thread_local! {
    /// The panic location captured by [`install_panic_location_hook`]'s
    /// hook, read and cleared immediately after `catch_unwind` returns
    /// on the same thread.
    static LAST_PANIC_LOCATION: RefCell<Option<String>> = RefCell::new(None);
}

static PANIC_LOCATION_HOOK: Once = Once::new();

/// Installs, once per process, a panic hook that stashes the panic's
/// `Location` into a thread-local before chaining to the previous hook.
/// Installed once (not per call) so concurrent workers in
/// [`BatchDriver::run_parallel`] never race on `panic::set_hook`/
/// `take_hook`; the thread-local itself stays correctly separated per
/// worker thread regardless.
fn install_panic_location_hook() {
    PANIC_LOCATION_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let location = info.location().map(|l| l.to_string());
            LAST_PANIC_LOCATION.with(|cell| *cell.borrow_mut() = location);
            previous(info);
        }));
    });
}

fn panic_message(payload: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "row processing panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row_source::VecRowSource;
    use std::collections::HashMap;
    use tat_common::Scalar;
    use tat_config::ConfigLoader;

    const CATALOG: &str = r#"
    {
      "stages": {
        "1": {
          "name": "Approval",
          "actual_timestamp": "po_approval_date",
          "process_flow": {"critical_path": true, "team_owner": "Ops", "process_type": "approval"},
          "fallback_calculation": {"expression": "po_created_date"},
          "lead_time": 1
        }
      }
    }
    "#;

    #[test]
    fn one_bad_row_does_not_halt_the_batch() {
        let catalog = ConfigLoader::load_from_str(CATALOG).unwrap();
        let good = Row::new(HashMap::from([
            ("po_razin_id".to_string(), Scalar::Text("PO-1".into())),
            ("po_created_date".to_string(), Scalar::Instant(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap())),
        ]));
        let source = VecRowSource(vec![good.clone(), good]);
        let driver = BatchDriver::new(&catalog);
        let cancel = CancellationToken::new();
        let result = driver.run(&source, NaiveDate::from_ymd_opt(2025, 6, 20).unwrap(), &cancel);
        assert_eq!(result.results.len(), 2);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn parallel_run_matches_serial_run_and_preserves_input_order() {
        let catalog = ConfigLoader::load_from_str(CATALOG).unwrap();
        let rows: Vec<Row> = (0..9)
            .map(|i| {
                Row::new(HashMap::from([
                    ("po_razin_id".to_string(), Scalar::Text(format!("PO-{i}"))),
                    (
                        "po_created_date".to_string(),
                        Scalar::Instant(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap() + chrono::Duration::days(i)),
                    ),
                ]))
            })
            .collect();
        let source = VecRowSource(rows);
        let driver = BatchDriver::new(&catalog);
        let cancel = CancellationToken::new();
        let date = NaiveDate::from_ymd_opt(2025, 6, 20).unwrap();

        let serial = driver.run(&source, date, &cancel);
        let parallel = driver.run_parallel(&source, date, &cancel, 4);

        assert_eq!(parallel.results.len(), serial.results.len());
        let serial_ids: Vec<&str> = serial.results.iter().map(|r| r.po_id.as_str()).collect();
        let parallel_ids: Vec<&str> = parallel.results.iter().map(|r| r.po_id.as_str()).collect();
        assert_eq!(serial_ids, parallel_ids);
        assert_eq!(serial.results, parallel.results);
    }

    #[test]
    fn parallel_run_clamps_worker_count_to_row_count() {
        let catalog = ConfigLoader::load_from_str(CATALOG).unwrap();
        let row = Row::new(HashMap::from([(
            "po_created_date".to_string(),
            Scalar::Instant(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()),
        )]));
        let source = VecRowSource(vec![row]);
        let driver = BatchDriver::new(&catalog);
        let cancel = CancellationToken::new();
        let result = driver.run_parallel(&source, NaiveDate::from_ymd_opt(2025, 6, 20).unwrap(), &cancel, 64);
        assert_eq!(result.results.len(), 1);
    }

    #[test]
    fn cancellation_stops_before_remaining_rows() {
        let catalog = ConfigLoader::load_from_str(CATALOG).unwrap();
        let row = Row::new(HashMap::from([(
            "po_created_date".to_string(),
            Scalar::Instant(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()),
        )]));
        let source = VecRowSource(vec![row.clone(), row.clone(), row]);
        let driver = BatchDriver::new(&catalog);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = driver.run(&source, NaiveDate::from_ymd_opt(2025, 6, 20).unwrap(), &cancel);
        assert!(result.results.is_empty());
    }

    #[test]
    fn panic_location_hook_captures_a_stack_for_the_fault_boundary() {
        // Chains to whatever hook was previously installed, so this
        // still prints the panic to stderr like any uncaught panic
        // would; it only adds a side channel into `LAST_PANIC_LOCATION`.
        install_panic_location_hook();
        let _ = panic::catch_unwind(|| panic!("synthetic fault boundary test"));
        let stack = LAST_PANIC_LOCATION.with(|cell| cell.borrow_mut().take());
        assert!(stack.is_some());
    }
}
