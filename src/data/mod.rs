//! Tabular inputs: CSV files loaded into an immutable `Frame`.

pub mod selection;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// One parsed CSV field. Empty fields and `NaN` become `Null`.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Num(f64),
    Text(String),
    Null,
}

impl Cell {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Cell::Null;
        }
        match trimmed.parse::<f64>() {
            Ok(v) if v.is_nan() => Cell::Null,
            Ok(v) => Cell::Num(v),
            Err(_) => Cell::Text(trimmed.to_string()),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Num(v) => Some(*v),
            _ => None,
        }
    }

    /// Integral numbers only; `3.0` is `Some(3)`, `3.5` is `None`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Cell::Num(v) if v.fract() == 0.0 && v.is_finite() => Some(*v as i64),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cell::Num(v) => write!(f, "{}", v),
            Cell::Text(s) => write!(f, "{}", s),
            Cell::Null => Ok(()),
        }
    }
}

/// Column-named table. Chart code only ever borrows frames; anything that
/// needs a different order sorts its own copy of the values.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Frame {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Result<Self> {
        for (i, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(anyhow!(
                    "row {} has {} fields, header has {}",
                    i + 1,
                    row.len(),
                    columns.len()
                ));
            }
        }
        Ok(Self { columns, rows })
    }

    pub fn from_csv_path(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
        Self::from_reader(file).with_context(|| format!("cannot parse {}", path.display()))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let columns: Vec<String> = rdr.headers()?.iter().map(|s| s.to_string()).collect();
        if columns.iter().all(|c| c.is_empty()) {
            return Err(anyhow!("missing header row"));
        }
        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record?;
            rows.push(record.iter().map(Cell::parse).collect());
        }
        Self::new(columns, rows)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| anyhow!("missing column '{}' (have {:?})", name, self.columns))
    }

    /// Indices of the columns whose name starts with `prefix`, in table order.
    pub fn columns_with_prefix(&self, prefix: &str) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.starts_with(prefix))
            .map(|(i, _)| i)
            .collect()
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.rows.get(row).and_then(|r| r.get(col))
    }

    pub fn num(&self, row: usize, col: usize) -> Option<f64> {
        self.cell(row, col).and_then(Cell::as_f64)
    }

    pub fn int(&self, row: usize, col: usize) -> Option<i64> {
        self.cell(row, col).and_then(Cell::as_i64)
    }

    pub fn text(&self, row: usize, col: usize) -> Option<String> {
        self.cell(row, col).filter(|c| !c.is_null()).map(|c| c.to_string())
    }

    /// Every value of a numeric column; a non-numeric, non-empty cell is an
    /// error, an empty one is `None`.
    pub fn numeric_column(&self, name: &str) -> Result<Vec<Option<f64>>> {
        let col = self.require_column(name)?;
        self.rows
            .iter()
            .enumerate()
            .map(|(i, row)| match &row[col] {
                Cell::Num(v) => Ok(Some(*v)),
                Cell::Null => Ok(None),
                Cell::Text(t) => Err(anyhow!(
                    "column '{}' row {}: '{}' is not numeric",
                    name,
                    i + 1,
                    t
                )),
            })
            .collect()
    }

    /// Row indices where the integer in `col` equals `value`.
    pub fn rows_matching_int(&self, col: usize, value: i64) -> Vec<usize> {
        (0..self.rows.len())
            .filter(|&i| self.int(i, col) == Some(value))
            .collect()
    }
}

/// Fingerprint of a loaded input file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableManifest {
    pub path: String,
    pub hash_sha256: String,
    pub row_count: u64,
    pub columns: Vec<String>,
}

/// Load a CSV table and describe what was read.
pub fn load_table(path: &Path) -> Result<(Frame, TableManifest)> {
    let hash = file_sha256(path)?;
    let frame = Frame::from_csv_path(path)?;
    let manifest = TableManifest {
        path: path.display().to_string(),
        hash_sha256: hash,
        row_count: frame.len() as u64,
        columns: frame.columns().to_vec(),
    };
    Ok((frame, manifest))
}

pub fn file_sha256(path: &Path) -> Result<String> {
    let mut file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
pub(crate) fn frame_from_str(csv: &str) -> Frame {
    Frame::from_reader(csv.as_bytes()).expect("test csv")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_cells() {
        assert_eq!(Cell::parse(" 3 "), Cell::Num(3.0));
        assert_eq!(Cell::parse(""), Cell::Null);
        assert_eq!(Cell::parse("NaN"), Cell::Null);
        assert_eq!(Cell::parse("NPV"), Cell::Text("NPV".to_string()));
        assert_eq!(Cell::parse("4.0").as_i64(), Some(4));
        assert_eq!(Cell::parse("4.5").as_i64(), None);
    }

    #[test]
    fn reads_csv_with_header() {
        let f = frame_from_str("solution_id,of_value,RM1,RM2\n1,10.5,3,4\n2,,5,\n");
        assert_eq!(f.columns(), &["solution_id", "of_value", "RM1", "RM2"]);
        assert_eq!(f.len(), 2);
        assert_eq!(f.num(0, 1), Some(10.5));
        assert_eq!(f.num(1, 1), None);
        assert_eq!(f.columns_with_prefix("RM"), vec![2, 3]);
        assert_eq!(f.rows_matching_int(0, 2), vec![1]);
    }

    #[test]
    fn hash_prefixed_fields_are_data() {
        let f = frame_from_str("Variable,SOLUTION_ID\n#PERM,1\nPORO,1\n");
        assert_eq!(f.len(), 2);
        assert_eq!(f.text(0, 0).as_deref(), Some("#PERM"));
        assert_eq!(f.rows_matching_int(1, 1), vec![0, 1]);
    }

    #[test]
    fn numeric_column_rejects_text() {
        let f = frame_from_str("a,b\n1,x\n2,3\n");
        assert!(f.numeric_column("a").is_ok());
        let err = f.numeric_column("b").unwrap_err().to_string();
        assert!(err.contains("not numeric"), "{}", err);
        assert!(f.numeric_column("c").is_err());
    }

    #[test]
    fn ragged_rows_are_rejected() {
        assert!(Frame::from_reader("a,b\n1,2,3\n".as_bytes()).is_err());
    }

    #[test]
    fn manifest_hashes_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("t.csv");
        std::fs::write(&path, "a,b\n1,2\n").unwrap();
        let (frame, manifest) = load_table(&path).unwrap();
        assert_eq!(frame.len(), 1);
        assert_eq!(manifest.row_count, 1);
        assert_eq!(manifest.hash_sha256.len(), 64);
        assert_eq!(manifest.hash_sha256, file_sha256(&path).unwrap());
    }
}
