//! CLI driver: load a stage catalog, read a CSV/JSON row source, run
//! the batch driver, and write the per-PO result documents, matrix
//! export, and error report to disk (spec §6).

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use tat_config::ConfigLoader;
use tat_io::{BatchDriver, CancellationToken, CsvRowSource, JsonRowSource, PoResultDoc, RowSource, export_matrices};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum RowFormat {
    Csv,
    Json,
}

/// Compute stage-level turnaround-time timelines for a batch of
/// purchase orders.
#[derive(Debug, Parser)]
#[command(name = "tat", version, about)]
struct Cli {
    /// Path to the stage catalog JSON document (spec §6).
    #[arg(long)]
    config: PathBuf,

    /// Path to the row source file.
    #[arg(long)]
    rows: PathBuf,

    /// Row source format.
    #[arg(long, value_enum, default_value_t = RowFormat::Csv)]
    format: RowFormat,

    /// Directory to write `results.json`, `matrix/<sheet>.csv`, and
    /// `errors.json` into.
    #[arg(long, default_value = "out")]
    out_dir: PathBuf,

    /// Calculation date stamped on every result, `YYYY-MM-DD`. Defaults
    /// to today's date read once at startup (the core itself performs
    /// no wall-clock I/O; only this CLI boundary does).
    #[arg(long)]
    calculation_date: Option<String>,

    /// Number of worker threads to process rows with (spec §5: batch
    /// processing is embarrassingly parallel, each PO owning a private
    /// resolver cache). `1` (the default) runs the plain serial driver;
    /// anything higher runs the bounded worker-pool path and re-sorts
    /// by input index before writing output.
    #[arg(long, default_value_t = 1)]
    workers: usize,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    run(cli)
}

fn run(cli: Cli) -> Result<()> {
    let catalog = ConfigLoader::load_from_path(&cli.config)
        .with_context(|| format!("loading stage catalog from {}", cli.config.display()))?;

    let calculation_date = match &cli.calculation_date {
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .with_context(|| format!("parsing --calculation-date '{s}'"))?,
        None => chrono::Local::now().date_naive(),
    };

    let source: Box<dyn RowSource> = match cli.format {
        RowFormat::Csv => Box::new(
            CsvRowSource::from_path(&cli.rows).with_context(|| format!("reading CSV rows from {}", cli.rows.display()))?,
        ),
        RowFormat::Json => Box::new(
            JsonRowSource::from_path(&cli.rows).with_context(|| format!("reading JSON rows from {}", cli.rows.display()))?,
        ),
    };

    let driver = BatchDriver::new(&catalog);
    let cancel = CancellationToken::new();
    let batch = if cli.workers > 1 {
        driver.run_parallel(source.as_ref(), calculation_date, &cancel, cli.workers)
    } else {
        driver.run(source.as_ref(), calculation_date, &cancel)
    };

    fs::create_dir_all(&cli.out_dir).with_context(|| format!("creating {}", cli.out_dir.display()))?;

    let docs: Vec<PoResultDoc> = batch.results.iter().map(PoResultDoc::from).collect();
    let results_path = cli.out_dir.join("results.json");
    fs::write(&results_path, serde_json::to_string_pretty(&docs)?)
        .with_context(|| format!("writing {}", results_path.display()))?;

    let errors_path = cli.out_dir.join("errors.json");
    fs::write(&errors_path, serde_json::to_string_pretty(&batch.errors.iter().map(error_to_json).collect::<Vec<_>>())?)
        .with_context(|| format!("writing {}", errors_path.display()))?;

    let matrix_dir = cli.out_dir.join("matrix");
    fs::create_dir_all(&matrix_dir)?;
    let export = export_matrices(&catalog, &batch.results);
    for sheet in &export.sheets {
        let path = matrix_dir.join(format!("{}.csv", sheet.name));
        write_sheet_csv(&path, &sheet.stage_columns, &sheet.rows)?;
    }

    tracing::info!(
        processed = batch.results.len(),
        failed = batch.errors.len(),
        out_dir = %cli.out_dir.display(),
        "batch complete"
    );
    Ok(())
}

fn error_to_json(record: &tat_io::ErrorRecord) -> serde_json::Value {
    serde_json::json!({
        "index": record.index,
        "po_id": record.po_id,
        "error_message": record.error_message,
        "stack": record.stack,
    })
}

fn write_sheet_csv(path: &std::path::Path, stage_columns: &[String], rows: &[Vec<String>]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).with_context(|| format!("writing {}", path.display()))?;
    let mut header = vec!["PO_ID".to_string()];
    header.extend(stage_columns.iter().cloned());
    writer.write_record(&header)?;
    for row in rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}
