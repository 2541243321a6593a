// 📑 Sheet Tables
// The seven categorical sheets of the workbook, each parsed into typed rows.
// Every sheet shares a municipality column; joins happen only by exact name.

use crate::config::{ColumnNames, DashboardConfig, SheetNames};
use crate::error::{IngestionError, Result};
use crate::parser::{validate_measure, NumericRule};
use crate::scope::ScopeSelection;
use crate::workbook::{CellValue, WorkbookSource};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

// ============================================================================
// SHEET KINDS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SheetKind {
    GeoZones,
    EmploymentBySector,
    EmploymentByAge,
    Companies,
    Schools,
    EducationIndex,
    Institutions,
}

impl SheetKind {
    pub const ALL: [SheetKind; 7] = [
        SheetKind::GeoZones,
        SheetKind::EmploymentBySector,
        SheetKind::EmploymentByAge,
        SheetKind::Companies,
        SheetKind::Schools,
        SheetKind::EducationIndex,
        SheetKind::Institutions,
    ];

    /// Human-readable name for logs and reports
    pub fn name(&self) -> &str {
        match self {
            SheetKind::GeoZones => "geographic zones",
            SheetKind::EmploymentBySector => "employment by sector",
            SheetKind::EmploymentByAge => "employment by age bracket",
            SheetKind::Companies => "companies by size",
            SheetKind::Schools => "schools",
            SheetKind::EducationIndex => "education index",
            SheetKind::Institutions => "institutions",
        }
    }

    /// Sheet name inside the workbook, from configuration
    pub fn sheet_name<'a>(&self, sheets: &'a SheetNames) -> &'a str {
        match self {
            SheetKind::GeoZones => &sheets.geo_zones,
            SheetKind::EmploymentBySector => &sheets.employment_by_sector,
            SheetKind::EmploymentByAge => &sheets.employment_by_age,
            SheetKind::Companies => &sheets.companies,
            SheetKind::Schools => &sheets.schools,
            SheetKind::EducationIndex => &sheets.education_index,
            SheetKind::Institutions => &sheets.institutions,
        }
    }
}

// ============================================================================
// ROW ACCESS
// ============================================================================

/// SheetRow - one data row with its columns already resolved
///
/// Position 0 is always the municipality column; the rest follow the order
/// returned by `SheetRecord::columns`.
pub struct SheetRow<'a> {
    sheet: &'a str,
    line: usize,
    headers: Vec<&'a str>,
    cells: Vec<&'a CellValue>,
}

impl<'a> SheetRow<'a> {
    fn identifier(&self, pos: usize) -> String {
        format!(
            "sheet '{}' column '{}' row {}",
            self.sheet,
            self.headers.get(pos).copied().unwrap_or("?"),
            self.line
        )
    }

    /// Required, non-empty text
    pub fn text(&self, pos: usize) -> Result<String> {
        match self.optional_text(pos) {
            Some(value) => Ok(value),
            None => Err(IngestionError::malformed(self.identifier(pos), "empty value")),
        }
    }

    pub fn optional_text(&self, pos: usize) -> Option<String> {
        self.cells
            .get(pos)
            .filter(|cell| !cell.is_empty())
            .map(|cell| cell.as_text())
    }

    /// Numeric measure; text cells go through the locale repair `rule`
    pub fn measure(&self, pos: usize, rule: NumericRule) -> Result<f64> {
        let parsed = match self.cells.get(pos) {
            Some(CellValue::Number(n)) => validate_measure(rule, *n),
            Some(CellValue::Text(s)) if !s.trim().is_empty() => rule.parse_measure(s),
            _ => return Err(IngestionError::malformed(self.identifier(pos), "empty value")),
        };
        parsed.map_err(|e| IngestionError::malformed(self.identifier(pos), e.to_string()))
    }

    pub fn municipality(&self) -> Result<String> {
        self.text(0)
    }
}

/// SheetRecord - a typed row of one sheet
pub trait SheetRecord: Sized + Clone {
    const KIND: SheetKind;

    /// Headers read after the municipality column, in `from_row` order
    fn columns(columns: &ColumnNames) -> Vec<&str>;

    fn from_row(row: &SheetRow<'_>) -> Result<Self>;

    fn municipality(&self) -> &str;
}

// ============================================================================
// ROW TYPES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoZoneRow {
    pub municipality: String,
    pub zone: String,
    pub percentage: f64,
}

impl SheetRecord for GeoZoneRow {
    const KIND: SheetKind = SheetKind::GeoZones;

    fn columns(columns: &ColumnNames) -> Vec<&str> {
        vec![columns.zone.as_str(), columns.zone_percentage.as_str()]
    }

    fn from_row(row: &SheetRow<'_>) -> Result<Self> {
        Ok(GeoZoneRow {
            municipality: row.municipality()?,
            zone: row.text(1)?,
            percentage: row.measure(2, NumericRule::Rate)?,
        })
    }

    fn municipality(&self) -> &str {
        &self.municipality
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorEmploymentRow {
    pub municipality: String,
    pub sector: String,
    pub employees: f64,
}

impl SheetRecord for SectorEmploymentRow {
    const KIND: SheetKind = SheetKind::EmploymentBySector;

    fn columns(columns: &ColumnNames) -> Vec<&str> {
        vec![columns.sector.as_str(), columns.sector_employees.as_str()]
    }

    fn from_row(row: &SheetRow<'_>) -> Result<Self> {
        Ok(SectorEmploymentRow {
            municipality: row.municipality()?,
            sector: row.text(1)?,
            employees: row.measure(2, NumericRule::Population)?,
        })
    }

    fn municipality(&self) -> &str {
        &self.municipality
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgeBracketEmploymentRow {
    pub municipality: String,
    pub bracket: String,
    pub employees: f64,
}

impl SheetRecord for AgeBracketEmploymentRow {
    const KIND: SheetKind = SheetKind::EmploymentByAge;

    fn columns(columns: &ColumnNames) -> Vec<&str> {
        vec![columns.age_bracket.as_str(), columns.age_bracket_employees.as_str()]
    }

    fn from_row(row: &SheetRow<'_>) -> Result<Self> {
        Ok(AgeBracketEmploymentRow {
            municipality: row.municipality()?,
            bracket: row.text(1)?,
            employees: row.measure(2, NumericRule::Population)?,
        })
    }

    fn municipality(&self) -> &str {
        &self.municipality
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyRow {
    pub municipality: String,
    pub size: String,
    pub quantity: f64,
}

impl SheetRecord for CompanyRow {
    const KIND: SheetKind = SheetKind::Companies;

    fn columns(columns: &ColumnNames) -> Vec<&str> {
        vec![columns.company_size.as_str(), columns.company_quantity.as_str()]
    }

    fn from_row(row: &SheetRow<'_>) -> Result<Self> {
        Ok(CompanyRow {
            municipality: row.municipality()?,
            size: row.text(1)?,
            quantity: row.measure(2, NumericRule::Population)?,
        })
    }

    fn municipality(&self) -> &str {
        &self.municipality
    }
}

/// One school; counted, not summed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchoolRow {
    pub municipality: String,
    pub network: String,
    pub level: String,
}

impl SheetRecord for SchoolRow {
    const KIND: SheetKind = SheetKind::Schools;

    fn columns(columns: &ColumnNames) -> Vec<&str> {
        vec![columns.school_network.as_str(), columns.school_level.as_str()]
    }

    fn from_row(row: &SheetRow<'_>) -> Result<Self> {
        Ok(SchoolRow {
            municipality: row.municipality()?,
            network: row.text(1)?,
            level: row.text(2)?,
        })
    }

    fn municipality(&self) -> &str {
        &self.municipality
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EducationIndexRow {
    pub municipality: String,
    pub stage: String,
    pub index: f64,
}

impl SheetRecord for EducationIndexRow {
    const KIND: SheetKind = SheetKind::EducationIndex;

    fn columns(columns: &ColumnNames) -> Vec<&str> {
        vec![columns.education_stage.as_str(), columns.education_index.as_str()]
    }

    fn from_row(row: &SheetRow<'_>) -> Result<Self> {
        Ok(EducationIndexRow {
            municipality: row.municipality()?,
            stage: row.text(1)?,
            index: row.measure(2, NumericRule::Income)?,
        })
    }

    fn municipality(&self) -> &str {
        &self.municipality
    }
}

/// One institution; counted by category, subcategory feeds the
/// entrepreneurship counters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstitutionRow {
    pub municipality: String,
    pub category: String,
    pub subcategory: Option<String>,
}

impl SheetRecord for InstitutionRow {
    const KIND: SheetKind = SheetKind::Institutions;

    fn columns(columns: &ColumnNames) -> Vec<&str> {
        vec![columns.institution_category.as_str(), columns.institution_subcategory.as_str()]
    }

    fn from_row(row: &SheetRow<'_>) -> Result<Self> {
        Ok(InstitutionRow {
            municipality: row.municipality()?,
            category: row.text(1)?,
            subcategory: row.optional_text(2),
        })
    }

    fn municipality(&self) -> &str {
        &self.municipality
    }
}

// ============================================================================
// TABLES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetTable<T> {
    rows: Vec<T>,
}

impl<T: SheetRecord> SheetTable<T> {
    pub fn new(rows: Vec<T>) -> Self {
        SheetTable { rows }
    }

    pub fn rows(&self) -> &[T] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn kind(&self) -> SheetKind {
        T::KIND
    }

    /// Rows visible under `scope`
    pub fn scoped<'a>(&'a self, scope: &'a ScopeSelection) -> impl Iterator<Item = &'a T> + 'a {
        self.rows.iter().filter(move |row| scope.includes(row.municipality()))
    }

    /// Distinct municipality names referenced by this sheet
    pub fn municipalities(&self) -> BTreeSet<&str> {
        self.rows.iter().map(|row| row.municipality()).collect()
    }
}

impl<T> Default for SheetTable<T> {
    fn default() -> Self {
        SheetTable { rows: Vec::new() }
    }
}

/// Parse the sheet configured for `T` into typed rows. Fully blank rows are
/// skipped.
pub fn load_sheet<T, W>(workbook: &mut W, config: &DashboardConfig) -> Result<SheetTable<T>>
where
    T: SheetRecord,
    W: WorkbookSource + ?Sized,
{
    let sheet_name = T::KIND.sheet_name(&config.sheets);
    let columns = &config.columns;
    let raw = workbook.require_sheet(sheet_name)?;

    let mut wanted: Vec<&str> = vec![columns.sheet_municipality.as_str()];
    wanted.extend(T::columns(columns));

    let mut positions = Vec::with_capacity(wanted.len());
    for header in &wanted {
        let pos = raw.column_index(header).ok_or_else(|| {
            IngestionError::malformed(
                format!("sheet '{}'", sheet_name),
                format!("missing column '{}'", header),
            )
        })?;
        positions.push(pos);
    }

    let empty = CellValue::Empty;
    let mut rows = Vec::with_capacity(raw.rows.len());
    for (idx, cells) in raw.rows.iter().enumerate() {
        if cells.iter().all(|c| c.is_empty()) {
            continue;
        }
        let row = SheetRow {
            sheet: sheet_name,
            // +2: 1-indexed plus header row
            line: idx + 2,
            headers: wanted.clone(),
            cells: positions.iter().map(|&p| cells.get(p).unwrap_or(&empty)).collect(),
        };
        rows.push(T::from_row(&row)?);
    }

    debug!(sheet = sheet_name, kind = T::KIND.name(), rows = rows.len(), "sheet parsed");
    Ok(SheetTable::new(rows))
}

/// SheetSet - all seven sheets of one workbook
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SheetSet {
    pub geo_zones: SheetTable<GeoZoneRow>,
    pub employment_by_sector: SheetTable<SectorEmploymentRow>,
    pub employment_by_age: SheetTable<AgeBracketEmploymentRow>,
    pub companies: SheetTable<CompanyRow>,
    pub schools: SheetTable<SchoolRow>,
    pub education_index: SheetTable<EducationIndexRow>,
    pub institutions: SheetTable<InstitutionRow>,
}

impl SheetSet {
    /// Load every sheet; the first missing or malformed one aborts the load
    pub fn load<W: WorkbookSource + ?Sized>(workbook: &mut W, config: &DashboardConfig) -> Result<Self> {
        Ok(SheetSet {
            geo_zones: load_sheet(workbook, config)?,
            employment_by_sector: load_sheet(workbook, config)?,
            employment_by_age: load_sheet(workbook, config)?,
            companies: load_sheet(workbook, config)?,
            schools: load_sheet(workbook, config)?,
            education_index: load_sheet(workbook, config)?,
            institutions: load_sheet(workbook, config)?,
        })
    }

    /// (kind, row count, referenced municipalities) for every sheet
    pub fn summaries(&self) -> Vec<(SheetKind, usize, BTreeSet<&str>)> {
        fn summary<T: SheetRecord>(table: &SheetTable<T>) -> (SheetKind, usize, BTreeSet<&str>) {
            (table.kind(), table.len(), table.municipalities())
        }
        vec![
            summary(&self.geo_zones),
            summary(&self.employment_by_sector),
            summary(&self.employment_by_age),
            summary(&self.companies),
            summary(&self.schools),
            summary(&self.education_index),
            summary(&self.institutions),
        ]
    }
}

// ============================================================================
// TESTS
// ============================================================================
