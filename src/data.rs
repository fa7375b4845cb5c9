//! Tabular row ingestion for command generation.

use indexmap::IndexMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// One cell of tabular input.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(text) => f.write_str(text),
            // Integral values substitute without a fractional part
            CellValue::Number(n) if n.is_finite() && n.fract() == 0.0 => {
                write!(f, "{}", *n as i64)
            }
            CellValue::Number(n) => write!(f, "{}", n),
        }
    }
}

/// One record of input data. Column order follows the source file.
pub type Row = IndexMap<String, CellValue>;

#[derive(Debug)]
pub enum DataError {
    UnsupportedFormat(PathBuf),
    InvalidData(String),
    IoError(std::io::Error),
}

impl fmt::Display for DataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataError::UnsupportedFormat(path) => write!(
                f,
                "Not a supported data format: {} (expected .csv or .tsv)",
                path.display()
            ),
            DataError::InvalidData(msg) => write!(f, "Invalid data file: {}", msg),
            DataError::IoError(e) => write!(f, "IO error reading data: {}", e),
        }
    }
}

impl std::error::Error for DataError {}

impl From<std::io::Error> for DataError {
    fn from(e: std::io::Error) -> Self {
        DataError::IoError(e)
    }
}

/// Load rows from a file path, choosing the delimiter from the extension.
///
/// `.csv` and `.tsv` are supported; anything else fails before the file is
/// opened.
pub fn load_rows(path: &Path) -> Result<Vec<Row>, DataError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    let delimiter = match extension.as_deref() {
        Some("csv") => b',',
        Some("tsv") => b'\t',
        _ => return Err(DataError::UnsupportedFormat(path.to_path_buf())),
    };

    let content = fs::read_to_string(path)?;
    parse_rows(&content, delimiter)
}

/// Parse delimited text already in memory. The first record is the header
/// row; every following record becomes one `Row` in source order.
pub fn parse_rows(content: &str, delimiter: u8) -> Result<Vec<Row>, DataError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .from_reader(content.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| DataError::InvalidData(e.to_string()))?
        .clone();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| DataError::InvalidData(e.to_string()))?;
        let mut row = Row::new();
        for (name, field) in headers.iter().zip(record.iter()) {
            row.insert(name.to_string(), CellValue::Text(field.to_string()));
        }
        rows.push(row);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rows_basic() {
        let content = "Name,Port\nalpha,8080\nbeta,9090\n";
        let rows = parse_rows(content, b',').unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0].get("Name"),
            Some(&CellValue::Text("alpha".to_string()))
        );
        assert_eq!(
            rows[1].get("Port"),
            Some(&CellValue::Text("9090".to_string()))
        );
    }

    #[test]
    fn parse_rows_preserves_column_order() {
        let content = "Zeta,Alpha,Mid\n1,2,3\n";
        let rows = parse_rows(content, b',').unwrap();
        let columns: Vec<_> = rows[0].keys().cloned().collect();
        assert_eq!(columns, vec!["Zeta", "Alpha", "Mid"]);
    }

    #[test]
    fn parse_rows_header_only() {
        let rows = parse_rows("Name,Port\n", b',').unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn parse_rows_empty_input() {
        let rows = parse_rows("", b',').unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn parse_rows_tab_delimiter() {
        let rows = parse_rows("A\tB\nx\ty\n", b'\t').unwrap();
        assert_eq!(rows[0].get("B"), Some(&CellValue::Text("y".to_string())));
    }

    #[test]
    fn load_rows_rejects_unknown_extension() {
        let err = load_rows(Path::new("data.xlsx")).unwrap_err();
        assert!(matches!(err, DataError::UnsupportedFormat(_)));

        let err = load_rows(Path::new("no_extension")).unwrap_err();
        assert!(matches!(err, DataError::UnsupportedFormat(_)));
    }

    #[test]
    fn load_rows_reads_csv_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.csv");
        fs::write(&path, "Name,CMD\nalpha,deploy\n").unwrap();

        let rows = load_rows(&path).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(
            rows[0].get("CMD"),
            Some(&CellValue::Text("deploy".to_string()))
        );
    }

    #[test]
    fn load_rows_reads_tsv_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.tsv");
        fs::write(&path, "Name\tCMD\nalpha\tdeploy\n").unwrap();

        let rows = load_rows(&path).unwrap();
        assert_eq!(
            rows[0].get("Name"),
            Some(&CellValue::Text("alpha".to_string()))
        );
    }

    #[test]
    fn cell_value_display() {
        assert_eq!(CellValue::Text("abc".to_string()).to_string(), "abc");
        assert_eq!(CellValue::Number(5.0).to_string(), "5");
        assert_eq!(CellValue::Number(2.5).to_string(), "2.5");
    }
}
