// ✅ Data Quality Engine
// Soft checks over an ingested dataset. Nothing here fails ingestion; the
// report is logged and served alongside the data.

use crate::dataset::Dataset;
use crate::sheets::SheetKind;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// ============================================================================
// QUALITY REPORT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Critical, // Dataset cannot back a meaningful dashboard
    Warning,  // Value or join is questionable
    Info,     // Worth a look, usually harmless
}

impl Severity {
    pub fn name(&self) -> &str {
        match self {
            Severity::Critical => "critical",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityIssue {
    pub severity: Severity,
    pub field: String,
    pub issue: String,
    pub recommendation: String,
}

impl QualityIssue {
    fn new(
        severity: Severity,
        field: impl Into<String>,
        issue: impl Into<String>,
        recommendation: impl Into<String>,
    ) -> Self {
        QualityIssue {
            severity,
            field: field.into(),
            issue: issue.into(),
            recommendation: recommendation.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub municipalities_checked: usize,
    pub checks_run: usize,
    pub issues: Vec<QualityIssue>,
}

impl QualityReport {
    pub fn summary(&self) -> String {
        format!(
            "Municipalities: {}, Checks: {}, Issues: {} ({} critical, {} warnings)",
            self.municipalities_checked,
            self.checks_run,
            self.issues.len(),
            self.count(Severity::Critical),
            self.count(Severity::Warning),
        )
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }

    pub fn has_critical_issues(&self) -> bool {
        self.count(Severity::Critical) > 0
    }

    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// Issues grouped by severity, most severe first
    pub fn by_severity(&self) -> BTreeMap<Severity, Vec<&QualityIssue>> {
        let mut grouped: BTreeMap<Severity, Vec<&QualityIssue>> = BTreeMap::new();
        for issue in &self.issues {
            grouped.entry(issue.severity).or_default().push(issue);
        }
        grouped
    }
}

// ============================================================================
// DATA QUALITY ENGINE
// ============================================================================

pub struct DataQualityEngine {
    /// Allowed distance of a municipality's zone percentages from 100
    zone_tolerance: f64,
}

impl DataQualityEngine {
    pub fn new() -> Self {
        DataQualityEngine { zone_tolerance: 1.0 }
    }

    pub fn with_zone_tolerance(mut self, tolerance: f64) -> Self {
        self.zone_tolerance = tolerance;
        self
    }

    /// Run every check against `dataset`
    pub fn assess(&self, dataset: &Dataset) -> QualityReport {
        let mut report = QualityReport {
            municipalities_checked: dataset.municipalities().len(),
            ..QualityReport::default()
        };

        // Rule 1: municipal table has rows
        self.run(&mut report, self.check_municipal_table(dataset));
        // Rule 2: per-record value ranges
        self.run(&mut report, self.check_record_ranges(dataset));
        // Rule 3: geometry join, both directions
        self.run(&mut report, self.check_geometry_join(dataset));
        // Rule 4: sheets reference known municipalities and are not empty
        self.run(&mut report, self.check_sheet_references(dataset));
        // Rule 5: zone percentages add up
        self.run(&mut report, self.check_zone_totals(dataset));

        report
    }

    fn run(&self, report: &mut QualityReport, issues: Vec<QualityIssue>) {
        report.checks_run += 1;
        report.issues.extend(issues);
    }

    // ========================================================================
    // CHECKS
    // ========================================================================

    fn check_municipal_table(&self, dataset: &Dataset) -> Vec<QualityIssue> {
        if dataset.municipalities().is_empty() {
            return vec![QualityIssue::new(
                Severity::Critical,
                "municipal table",
                "No municipalities were loaded",
                "Check that the municipal CSV has data rows",
            )];
        }
        Vec::new()
    }

    fn check_record_ranges(&self, dataset: &Dataset) -> Vec<QualityIssue> {
        let mut issues = Vec::new();
        for record in dataset.municipalities() {
            let name = &record.municipality;

            if record.working_age_population > record.census_population {
                issues.push(QualityIssue::new(
                    Severity::Warning,
                    format!("{}: working-age population", name),
                    format!(
                        "Working-age population {} exceeds census population {}",
                        record.working_age_population, record.census_population
                    ),
                    "Verify both columns come from the same census year",
                ));
            }

            if !(0.0..=1.0).contains(&record.hdi) {
                issues.push(QualityIssue::new(
                    Severity::Warning,
                    format!("{}: HDI", name),
                    format!("HDI {} is outside 0-1", record.hdi),
                    "HDI is a ratio; check for a misplaced decimal separator",
                ));
            }

            if record.employed_rate > 100.0 {
                issues.push(QualityIssue::new(
                    Severity::Warning,
                    format!("{}: employed rate", name),
                    format!("Employed rate {}% is above 100%", record.employed_rate),
                    "Check for a misplaced decimal separator",
                ));
            }
        }
        issues
    }

    fn check_geometry_join(&self, dataset: &Dataset) -> Vec<QualityIssue> {
        let geometry = dataset.geometry();
        let mut issues = Vec::new();

        for record in dataset.municipalities() {
            if geometry.get(&record.municipality).is_none() {
                issues.push(QualityIssue::new(
                    Severity::Warning,
                    format!("{}: geometry", record.municipality),
                    "Municipality has no boundary feature",
                    "Names must match the geometry name property exactly, accents included",
                ));
            }
        }

        for name in geometry.names() {
            if dataset.municipality(name).is_none() {
                issues.push(QualityIssue::new(
                    Severity::Info,
                    format!("{}: geometry", name),
                    "Boundary feature has no municipal record",
                    "The map will draw it without indicators",
                ));
            }
        }
        issues
    }

    fn check_sheet_references(&self, dataset: &Dataset) -> Vec<QualityIssue> {
        let known: BTreeSet<&str> = dataset
            .municipalities()
            .iter()
            .map(|r| r.municipality.as_str())
            .collect();

        let mut issues = Vec::new();
        for (kind, rows, referenced) in dataset.sheets().summaries() {
            if rows == 0 {
                issues.push(QualityIssue::new(
                    Severity::Warning,
                    sheet_field(kind),
                    "Sheet has no data rows",
                    "The matching dashboard section will always be empty",
                ));
                continue;
            }

            let unknown: Vec<&str> = referenced.difference(&known).copied().collect();
            if !unknown.is_empty() {
                issues.push(QualityIssue::new(
                    Severity::Warning,
                    sheet_field(kind),
                    format!("Rows name unknown municipalities: {}", unknown.join(", ")),
                    "Those rows count toward the regional view only; their own scope stays empty",
                ));
            }
        }
        issues
    }

    fn check_zone_totals(&self, dataset: &Dataset) -> Vec<QualityIssue> {
        let mut totals: BTreeMap<&str, f64> = BTreeMap::new();
        for row in dataset.sheets().geo_zones.rows() {
            *totals.entry(row.municipality.as_str()).or_insert(0.0) += row.percentage;
        }

        totals
            .into_iter()
            .filter(|(_, total)| (total - 100.0).abs() > self.zone_tolerance)
            .map(|(name, total)| {
                QualityIssue::new(
                    Severity::Info,
                    format!("{}: zone percentages", name),
                    format!("Zone percentages sum to {:.1}", total),
                    "Urban and rural shares are expected to cover the whole population",
                )
            })
            .collect()
    }
}

impl Default for DataQualityEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn sheet_field(kind: SheetKind) -> String {
    format!("sheet: {}", kind.name())
}

// ============================================================================
// TESTS
// ============================================================================
