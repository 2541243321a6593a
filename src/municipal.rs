// 🏙️ Municipal Records
// One row per municipality from the indicators CSV, every numeric column
// repaired with its locale rule.

use crate::config::ColumnNames;
use crate::error::{IngestionError, Result};
use crate::parser::NumericRule;
use csv::{ReaderBuilder, StringRecord};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::io::Read;
use tracing::debug;

// ============================================================================
// CORE TYPES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MunicipalRecord {
    pub municipality: String,
    pub hdi: f64,
    pub gdp_per_capita: f64,
    pub estimated_population: f64,
    pub census_population: f64,
    pub working_age_population: f64,
    /// Percentage, 0-100
    pub employed_rate: f64,
    /// Per-capita income in minimum-wage units
    pub income_min_wages: f64,
}

/// MunicipalField - semantic field a CSV column feeds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MunicipalField {
    Hdi,
    GdpPerCapita,
    EstimatedPopulation,
    CensusPopulation,
    WorkingAgePopulation,
    EmployedRate,
    IncomeMinWages,
}

impl MunicipalField {
    pub fn rule(&self) -> NumericRule {
        match self {
            MunicipalField::Hdi => NumericRule::Hdi,
            MunicipalField::GdpPerCapita => NumericRule::Currency,
            MunicipalField::EstimatedPopulation
            | MunicipalField::CensusPopulation
            | MunicipalField::WorkingAgePopulation => NumericRule::Population,
            MunicipalField::EmployedRate => NumericRule::Rate,
            MunicipalField::IncomeMinWages => NumericRule::Income,
        }
    }

    /// Column header this field is read from
    pub fn header<'a>(&self, columns: &'a ColumnNames) -> &'a str {
        match self {
            MunicipalField::Hdi => &columns.hdi,
            MunicipalField::GdpPerCapita => &columns.gdp_per_capita,
            MunicipalField::EstimatedPopulation => &columns.estimated_population,
            MunicipalField::CensusPopulation => &columns.census_population,
            MunicipalField::WorkingAgePopulation => &columns.working_age_population,
            MunicipalField::EmployedRate => &columns.employed_rate,
            MunicipalField::IncomeMinWages => &columns.income_min_wages,
        }
    }
}

// ============================================================================
// CSV LOADER
// ============================================================================

/// Column positions resolved from the header row
struct HeaderIndex {
    municipality: usize,
    hdi: usize,
    gdp_per_capita: usize,
    estimated_population: usize,
    census_population: usize,
    working_age_population: usize,
    employed_rate: usize,
    income_min_wages: usize,
}

impl HeaderIndex {
    fn resolve(headers: &StringRecord, columns: &ColumnNames, source: &str) -> Result<Self> {
        let positions: HashMap<&str, usize> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.trim(), i))
            .collect();

        let find = |header: &str| -> Result<usize> {
            positions.get(header.trim()).copied().ok_or_else(|| {
                IngestionError::malformed(source, format!("missing column '{}'", header))
            })
        };

        let column = |field: MunicipalField| find(field.header(columns));

        Ok(HeaderIndex {
            municipality: find(columns.csv_municipality.as_str())?,
            hdi: column(MunicipalField::Hdi)?,
            gdp_per_capita: column(MunicipalField::GdpPerCapita)?,
            estimated_population: column(MunicipalField::EstimatedPopulation)?,
            census_population: column(MunicipalField::CensusPopulation)?,
            working_age_population: column(MunicipalField::WorkingAgePopulation)?,
            employed_rate: column(MunicipalField::EmployedRate)?,
            income_min_wages: column(MunicipalField::IncomeMinWages)?,
        })
    }
}

/// Load the municipal indicators table.
///
/// `source` names the file in error messages. Fails on the first value that
/// cannot be repaired, on duplicate municipality names, and on missing
/// columns; never returns a partially parsed table.
pub fn load_municipal_csv<R: Read>(
    reader: R,
    columns: &ColumnNames,
    source: &str,
) -> Result<Vec<MunicipalRecord>> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(reader);

    let headers = rdr.headers()?.clone();
    let index = HeaderIndex::resolve(&headers, columns, source)?;

    let mut records = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for (row_num, result) in rdr.records().enumerate() {
        // +2: 1-indexed plus header row
        let line = row_num + 2;
        let row = result.map_err(|e| {
            IngestionError::malformed(format!("{} line {}", source, line), e.to_string())
        })?;

        let municipality = row.get(index.municipality).unwrap_or("").trim().to_string();
        if municipality.is_empty() {
            return Err(IngestionError::malformed(
                format!("{}:{} line {}", source, columns.csv_municipality, line),
                "municipality name is empty",
            ));
        }
        if !seen.insert(municipality.clone()) {
            return Err(IngestionError::malformed(
                format!("{}:{} line {}", source, columns.csv_municipality, line),
                format!("duplicate municipality '{}'", municipality),
            ));
        }

        let parse = |field: MunicipalField, pos: usize| -> Result<f64> {
            let raw = row.get(pos).unwrap_or("");
            field.rule().parse_measure(raw).map_err(|e| {
                IngestionError::malformed(
                    format!(
                        "{}:{} line {} ({})",
                        source,
                        field.header(columns),
                        line,
                        municipality
                    ),
                    e.to_string(),
                )
            })
        };

        let hdi = parse(MunicipalField::Hdi, index.hdi)?;
        let gdp_per_capita = parse(MunicipalField::GdpPerCapita, index.gdp_per_capita)?;
        let estimated_population = parse(MunicipalField::EstimatedPopulation, index.estimated_population)?;
        let census_population = parse(MunicipalField::CensusPopulation, index.census_population)?;
        let working_age_population =
            parse(MunicipalField::WorkingAgePopulation, index.working_age_population)?;
        let employed_rate = parse(MunicipalField::EmployedRate, index.employed_rate)?;
        let income_min_wages = parse(MunicipalField::IncomeMinWages, index.income_min_wages)?;

        records.push(MunicipalRecord {
            municipality,
            hdi,
            gdp_per_capita,
            estimated_population,
            census_population,
            working_age_population,
            employed_rate,
            income_min_wages,
        });
    }

    debug!(source, rows = records.len(), "municipal table parsed");
    Ok(records)
}

// ============================================================================
// TESTS
// ============================================================================
