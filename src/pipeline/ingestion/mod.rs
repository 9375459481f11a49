//! Raw input loading: startup rows from a CSV, JSON array or JSON-lines file.

use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::error::{PipelineError, Result};
use crate::pipeline::storage::Document;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    /// Comma-separated rows under a header line
    Csv,
    /// A single top-level JSON array of objects
    JsonArray,
    /// One JSON object per line (`.jsonl`, `.ndjson`)
    JsonLines,
}

impl InputFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match extension.as_str() {
            "csv" => Ok(InputFormat::Csv),
            "json" => Ok(InputFormat::JsonArray),
            "jsonl" | "ndjson" => Ok(InputFormat::JsonLines),
            _ => Err(PipelineError::UnsupportedFormat(format!(
                "{} (expected .csv, .json, .jsonl or .ndjson)",
                path.display()
            ))),
        }
    }
}

/// Rows read from an input file
#[derive(Debug, Clone, Default)]
pub struct LoadedFile {
    pub documents: Vec<Document>,
    /// Lines, CSV records or array items that could not be read as a row
    pub skipped: usize,
    /// Distinct field names across all loaded rows
    pub columns: usize,
}

/// Load every row of `path`. Malformed rows are skipped with a warning; a
/// file that cannot be read, a malformed JSON array or an unreadable CSV
/// header is an error.
pub fn load_raw_file(path: &Path) -> Result<LoadedFile> {
    let format = InputFormat::from_path(path)?;
    info!("Loading data from {}", path.display());
    let content = fs::read_to_string(path)?;

    let mut loaded = match format {
        InputFormat::Csv => parse_csv(&content)?,
        InputFormat::JsonArray => parse_json_array(&content)?,
        InputFormat::JsonLines => parse_json_lines(&content),
    };
    loaded.columns = count_columns(&loaded.documents);

    info!(
        "Loaded {} rows and {} columns ({} skipped)",
        loaded.documents.len(),
        loaded.columns,
        loaded.skipped
    );
    Ok(loaded)
}

/// Each record becomes a document keyed by the header. Empty cells are left
/// out so they read as absent fields.
fn parse_csv(content: &str) -> Result<LoadedFile> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(content.as_bytes());
    let headers = reader.headers()?.clone();

    let mut loaded = LoadedFile::default();
    for (index, record) in reader.records().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                warn!("Skipping unreadable CSV record {}: {}", index + 1, e);
                loaded.skipped += 1;
                continue;
            }
        };
        let document: Document = headers
            .iter()
            .zip(record.iter())
            .filter(|(_, cell)| !cell.trim().is_empty())
            .map(|(header, cell)| (header.to_string(), Value::String(cell.to_string())))
            .collect();
        loaded.documents.push(document);
    }
    Ok(loaded)
}

fn parse_json_array(content: &str) -> Result<LoadedFile> {
    let items: Vec<Value> = serde_json::from_str(content)?;
    let mut loaded = LoadedFile::default();
    for (index, item) in items.into_iter().enumerate() {
        match item {
            Value::Object(document) => loaded.documents.push(document),
            other => {
                warn!("Skipping array item {}: expected an object, got {}", index, type_name(&other));
                loaded.skipped += 1;
            }
        }
    }
    Ok(loaded)
}

fn parse_json_lines(content: &str) -> LoadedFile {
    let mut loaded = LoadedFile::default();
    for (index, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(line) {
            Ok(Value::Object(document)) => loaded.documents.push(document),
            Ok(other) => {
                warn!("Skipping line {}: expected an object, got {}", index + 1, type_name(&other));
                loaded.skipped += 1;
            }
            Err(e) => {
                warn!("Skipping invalid JSON on line {}: {}", index + 1, e);
                loaded.skipped += 1;
            }
        }
    }
    loaded
}

fn count_columns(documents: &[Document]) -> usize {
    let mut columns: std::collections::HashSet<&str> = std::collections::HashSet::new();
    for document in documents {
        columns.extend(document.keys().map(String::as_str));
    }
    columns.len()
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(InputFormat::from_path(Path::new("a.json")).unwrap(), InputFormat::JsonArray);
        assert_eq!(InputFormat::from_path(Path::new("a.NDJSON")).unwrap(), InputFormat::JsonLines);
        assert_eq!(InputFormat::from_path(Path::new("a.csv")).unwrap(), InputFormat::Csv);
        assert!(matches!(
            InputFormat::from_path(Path::new("a.xlsx")),
            Err(PipelineError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_load_json_lines_skips_bad_rows() {
        let file = write_file(
            ".jsonl",
            "{\"name\": \"A\", \"sector\": \"fintech\"}\n\nnot json\n[1, 2]\n{\"name\": \"B\", \"city\": \"Paris\"}\n",
        );
        let loaded = load_raw_file(file.path()).unwrap();
        assert_eq!(loaded.documents.len(), 2);
        assert_eq!(loaded.skipped, 2);
        assert_eq!(loaded.columns, 3);
    }

    #[test]
    fn test_load_csv_rows_with_empty_cells_absent() {
        let file = write_file(
            ".csv",
            "name,sector,founded_year,total_funding\nLedgerly,fintech,2018,2000000\nPaynest,fintech,,\n",
        );
        let loaded = load_raw_file(file.path()).unwrap();
        assert_eq!(loaded.documents.len(), 2);
        assert_eq!(loaded.skipped, 0);
        assert_eq!(loaded.columns, 4);

        let first = &loaded.documents[0];
        assert_eq!(first.get("founded_year"), Some(&Value::String("2018".to_string())));
        let second = &loaded.documents[1];
        assert_eq!(second.get("name"), Some(&Value::String("Paynest".to_string())));
        assert!(!second.contains_key("founded_year"));
        assert!(!second.contains_key("total_funding"));
    }

    #[test]
    fn test_csv_rows_normalize_like_json_rows() {
        use crate::pipeline::processing::normalize::{DefaultNormalizer, Normalized, Normalizer};

        let file = write_file(".csv", "name,sector,founded_year,employee_count\nTutorly, edtech ,2020,\n");
        let loaded = load_raw_file(file.path()).unwrap();
        let raw: crate::domain::RawRecord = serde_json::from_value(Value::Object(loaded.documents[0].clone())).unwrap();
        match DefaultNormalizer::new().normalize(&raw) {
            Normalized::Accepted(record) => {
                assert_eq!(record.sector, "Edtech");
                assert_eq!(record.founded_year, Some(2020));
                assert_eq!(record.employee_count, None);
            }
            Normalized::Rejected(err) => panic!("expected acceptance, got {err:?}"),
        }
    }

    #[test]
    fn test_load_json_array() {
        let file = write_file(".json", r#"[{"name": "A"}, 3, {"name": "B"}]"#);
        let loaded = load_raw_file(file.path()).unwrap();
        assert_eq!(loaded.documents.len(), 2);
        assert_eq!(loaded.skipped, 1);
    }

    #[test]
    fn test_malformed_array_is_an_error() {
        let file = write_file(".json", "[{\"name\": ");
        assert!(matches!(load_raw_file(file.path()), Err(PipelineError::Json(_))));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_raw_file(Path::new("/nonexistent/startups.jsonl")).unwrap_err();
        assert!(matches!(err, PipelineError::Io(_)));
    }
}
