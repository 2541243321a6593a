// 📒 Workbook Sources
// Named sheets from a spreadsheet file (calamine) or from memory.
//
// The ingestion pipeline only sees `WorkbookSource`, so the spreadsheet
// reader can be swapped out (or faked in tests) without touching parsing.

use crate::error::{IngestionError, Result};
use calamine::{open_workbook_auto, Data, Reader, Sheets};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

// ============================================================================
// CELLS & SHEETS
// ============================================================================

/// CellValue - a spreadsheet cell reduced to what the parsers care about
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::Number(_) => false,
        }
    }

    /// Text view of the cell; whole numbers print without a fraction
    pub fn as_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.trim().to_string(),
            CellValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    n.to_string()
                }
            }
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<&Data> for CellValue {
    fn from(d: &Data) -> Self {
        match d {
            Data::Empty => CellValue::Empty,
            Data::String(s) => CellValue::Text(s.clone()),
            Data::Float(f) => CellValue::Number(*f),
            Data::Int(i) => CellValue::Number(*i as f64),
            Data::Bool(b) => CellValue::Text(b.to_string()),
            Data::Error(e) => CellValue::Text(e.to_string()),
            Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
            Data::DateTimeIso(s) => CellValue::Text(s.clone()),
            Data::DurationIso(s) => CellValue::Text(s.clone()),
        }
    }
}

/// RawSheet - header row plus data rows, untyped
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSheet {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl RawSheet {
    /// First row becomes the header (trimmed), the rest are data
    pub fn from_rows(mut rows: Vec<Vec<CellValue>>) -> Self {
        if rows.is_empty() {
            return RawSheet::default();
        }
        let header = rows.remove(0);
        RawSheet {
            headers: header.iter().map(|c| c.as_text()).collect(),
            rows,
        }
    }

    pub fn column_index(&self, header: &str) -> Option<usize> {
        let wanted = header.trim();
        self.headers.iter().position(|h| h.trim() == wanted)
    }
}

// ============================================================================
// SOURCE TRAIT
// ============================================================================

/// WorkbookSource - anything that can hand out sheets by name
pub trait WorkbookSource {
    /// Sheet names in workbook order
    fn sheet_names(&self) -> Vec<String>;

    /// Read one sheet. `Ok(None)` means the sheet does not exist.
    fn read_sheet(&mut self, name: &str) -> Result<Option<RawSheet>>;

    /// Read a sheet that must exist
    fn require_sheet(&mut self, name: &str) -> Result<RawSheet> {
        self.read_sheet(name)?
            .ok_or_else(|| IngestionError::missing(format!("sheet '{}'", name)))
    }
}

// ============================================================================
// CALAMINE (xlsx / xls / ods)
// ============================================================================

pub struct CalamineWorkbook {
    sheets: Sheets<BufReader<File>>,
    source: String,
}

impl CalamineWorkbook {
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(IngestionError::missing(path.display().to_string()));
        }
        let sheets = open_workbook_auto(path).map_err(|e| {
            IngestionError::unexpected(format!("cannot open workbook {}: {}", path.display(), e))
        })?;
        Ok(CalamineWorkbook {
            sheets,
            source: path.display().to_string(),
        })
    }
}

impl WorkbookSource for CalamineWorkbook {
    fn sheet_names(&self) -> Vec<String> {
        self.sheets.sheet_names().to_owned()
    }

    fn read_sheet(&mut self, name: &str) -> Result<Option<RawSheet>> {
        if !self.sheet_names().iter().any(|s| s == name) {
            return Ok(None);
        }
        let range = self.sheets.worksheet_range(name).map_err(|e| {
            IngestionError::unexpected(format!(
                "cannot read sheet '{}' from {}: {}",
                name, self.source, e
            ))
        })?;

        let rows: Vec<Vec<CellValue>> = range
            .rows()
            .map(|row| row.iter().map(CellValue::from).collect())
            .collect();
        Ok(Some(RawSheet::from_rows(rows)))
    }
}

// ============================================================================
// IN-MEMORY
// ============================================================================

/// InMemoryWorkbook - sheets assembled in code
#[derive(Debug, Clone, Default)]
pub struct InMemoryWorkbook {
    sheets: Vec<(String, RawSheet)>,
}

impl InMemoryWorkbook {
    pub fn new() -> Self {
        InMemoryWorkbook::default()
    }

    /// Builder: add a sheet with a header row and data rows
    pub fn with_sheet(mut self, name: &str, headers: &[&str], rows: Vec<Vec<CellValue>>) -> Self {
        self.sheets.push((
            name.to_string(),
            RawSheet {
                headers: headers.iter().map(|h| h.to_string()).collect(),
                rows,
            },
        ));
        self
    }
}

impl WorkbookSource for InMemoryWorkbook {
    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|(name, _)| name.clone()).collect()
    }

    fn read_sheet(&mut self, name: &str) -> Result<Option<RawSheet>> {
        Ok(self
            .sheets
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, sheet)| sheet.clone()))
    }
}

// ============================================================================
// TESTS
// ============================================================================
