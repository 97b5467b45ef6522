use std::collections::HashMap;
use std::path::Path;

use chrono::NaiveDate;
use tat_common::Scalar;
use tat_eval::RowContext;

/// Column-name the Row source looks for when assigning a PO id (spec
/// §6 "Row source… A row must carry a `po_razin_id` (or equivalent id
/// column)").
pub const PO_ID_COLUMN: &str = "po_razin_id";

/// One PO row: a finite mapping from column-name to scalar, with
/// absence tolerated identically to an explicit null (spec §3).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    fields: HashMap<String, Scalar>,
}

impl Row {
    pub fn new(fields: HashMap<String, Scalar>) -> Self {
        Self { fields }
    }

    /// Reads `po_razin_id` (or `po_id` as a convenience alias), falling
    /// back to `Row_<index>` when neither is present (spec §6).
    pub fn po_id(&self, index: usize) -> String {
        for key in [PO_ID_COLUMN, "po_id"] {
            match self.fields.get(key) {
                Some(Scalar::Text(s)) if !s.is_empty() => return s.clone(),
                Some(Scalar::Number(n)) => return format!("{n}"),
                _ => {}
            }
        }
        format!("Row_{index}")
    }
}

impl RowContext for Row {
    fn get(&self, key: &str) -> Option<Scalar> {
        self.fields.get(key).cloned()
    }
}

/// Abstract source of [`Row`]s (spec §6 "Row source: an iterable of
/// rows"). Implementations live at the I/O boundary; the core engine
/// never depends on this trait directly.
pub trait RowSource {
    fn rows(&self) -> Box<dyn Iterator<Item = Row> + '_>;
}

/// An in-memory row source, mostly useful for tests and for callers
/// who already have rows in hand.
pub struct VecRowSource(pub Vec<Row>);

impl RowSource for VecRowSource {
    fn rows(&self) -> Box<dyn Iterator<Item = Row> + '_> {
        Box::new(self.0.iter().cloned())
    }
}

/// Reads rows from a JSON document: a top-level array of objects,
/// one JSON object per record. String values that parse as
/// `YYYY-MM-DD` are coerced to [`Scalar::Instant`], matching the
/// CSV adapter's date inference so both boundary adapters agree on
/// what counts as an instant.
pub struct JsonRowSource {
    rows: Vec<Row>,
}

impl JsonRowSource {
    pub fn from_str(text: &str) -> Result<Self, serde_json::Error> {
        let records: Vec<serde_json::Map<String, serde_json::Value>> = serde_json::from_str(text)?;
        let rows = records.into_iter().map(row_from_json_object).collect();
        Ok(Self { rows })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, std::io::Error> {
        let text = std::fs::read_to_string(path)?;
        Self::from_str(&text).map_err(std::io::Error::other)
    }
}

impl RowSource for JsonRowSource {
    fn rows(&self) -> Box<dyn Iterator<Item = Row> + '_> {
        Box::new(self.rows.iter().cloned())
    }
}

fn row_from_json_object(obj: serde_json::Map<String, serde_json::Value>) -> Row {
    let fields = obj
        .into_iter()
        .map(|(k, v)| (k, scalar_from_json(&v)))
        .collect();
    Row::new(fields)
}

fn scalar_from_json(value: &serde_json::Value) -> Scalar {
    match value {
        serde_json::Value::Null => Scalar::Null,
        serde_json::Value::Bool(b) => Scalar::Bool(*b),
        serde_json::Value::Number(n) => Scalar::Number(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => parse_scalar_text(s),
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => Scalar::Null,
    }
}

/// Reads rows from a CSV/TSV document: a header row followed by one
/// record per line, with basic type inference on each field (spec
/// §6, §9).
pub struct CsvRowSource {
    rows: Vec<Row>,
}

impl CsvRowSource {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, csv::Error> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(path)?;
        Self::from_reader(&mut reader)
    }

    pub fn from_str(text: &str) -> Result<Self, csv::Error> {
        let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(text.as_bytes());
        Self::from_reader(&mut reader)
    }

    fn from_reader<R: std::io::Read>(reader: &mut csv::Reader<R>) -> Result<Self, csv::Error> {
        let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let fields = headers
                .iter()
                .zip(record.iter())
                .map(|(header, field)| (header.clone(), infer_csv_scalar(field)))
                .collect();
            rows.push(Row::new(fields));
        }
        Ok(Self { rows })
    }
}

impl RowSource for CsvRowSource {
    fn rows(&self) -> Box<dyn Iterator<Item = Row> + '_> {
        Box::new(self.rows.iter().cloned())
    }
}

fn infer_csv_scalar(field: &str) -> Scalar {
    if field.is_empty() {
        return Scalar::Null;
    }
    parse_scalar_text(field)
}

fn parse_scalar_text(text: &str) -> Scalar {
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Scalar::Instant(date);
    }
    if let Ok(n) = text.parse::<f64>() {
        return Scalar::Number(n);
    }
    match text {
        "true" | "TRUE" | "True" => Scalar::Bool(true),
        "false" | "FALSE" | "False" => Scalar::Bool(false),
        _ => Scalar::Text(text.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_falls_back_to_index_when_id_missing() {
        let row = Row::new(HashMap::new());
        assert_eq!(row.po_id(7), "Row_7");
    }

    #[test]
    fn row_reads_po_razin_id() {
        let row = Row::new(HashMap::from([(PO_ID_COLUMN.to_string(), Scalar::Text("PO-42".into()))]));
        assert_eq!(row.po_id(0), "PO-42");
    }

    #[test]
    fn csv_infers_dates_numbers_and_bools() {
        let csv = "po_razin_id,po_created_date,lead_time,pi_applicable\nPO-1,2025-06-01,3,true\n";
        let source = CsvRowSource::from_str(csv).unwrap();
        let rows: Vec<_> = source.rows().collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(
            rows[0].get("po_created_date"),
            Some(Scalar::Instant(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()))
        );
        assert_eq!(rows[0].get("lead_time"), Some(Scalar::Number(3.0)));
        assert_eq!(rows[0].get("pi_applicable"), Some(Scalar::Bool(true)));
    }

    #[test]
    fn json_row_source_reads_array_of_objects() {
        let json = r#"[{"po_razin_id": "PO-1", "po_created_date": "2025-06-01", "lead_time": 3}]"#;
        let source = JsonRowSource::from_str(json).unwrap();
        let rows: Vec<_> = source.rows().collect();
        assert_eq!(rows[0].po_id(0), "PO-1");
        assert_eq!(
            rows[0].get("po_created_date"),
            Some(Scalar::Instant(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()))
        );
    }

    #[test]
    fn csv_row_source_reads_from_a_file_on_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"po_razin_id,po_created_date\nPO-1,2025-06-01\n").unwrap();
        let source = CsvRowSource::from_path(file.path()).unwrap();
        let rows: Vec<_> = source.rows().collect();
        assert_eq!(rows[0].po_id(0), "PO-1");
    }
}
