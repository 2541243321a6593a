// 📦 Dataset & Ingestion
// Load the CSV, workbook and geometry into one immutable Dataset.
// All-or-nothing: the first missing or malformed source aborts the load.

use crate::config::{DashboardConfig, LabelConfig};
use crate::data_quality::{DataQualityEngine, QualityReport, Severity};
use crate::error::{IngestionError, Result};
use crate::geometry::GeometryCollection;
use crate::municipal::{load_municipal_csv, MunicipalRecord};
use crate::scope::ScopeSelection;
use crate::sheets::SheetSet;
use crate::view::ScopedView;
use crate::workbook::{CalamineWorkbook, WorkbookSource};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read};
use tracing::{info, warn};

// ============================================================================
// DATASET
// ============================================================================

/// Where and when a dataset was loaded from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub loaded_at: DateTime<Utc>,
    pub sources: Vec<String>,
    /// SHA-256 over the source files, set by the cache
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
}

/// Dataset - the normalized tables, never mutated after load
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dataset {
    municipalities: Vec<MunicipalRecord>,
    sheets: SheetSet,
    geometry: GeometryCollection,
    labels: LabelConfig,
    provenance: Provenance,
}

impl Dataset {
    pub fn new(
        municipalities: Vec<MunicipalRecord>,
        sheets: SheetSet,
        geometry: GeometryCollection,
        labels: LabelConfig,
    ) -> Self {
        Dataset {
            municipalities,
            sheets,
            geometry,
            labels,
            provenance: Provenance {
                loaded_at: Utc::now(),
                sources: Vec::new(),
                fingerprint: None,
            },
        }
    }

    pub fn with_sources(mut self, sources: Vec<String>) -> Self {
        self.provenance.sources = sources;
        self
    }

    pub fn with_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.provenance.fingerprint = Some(fingerprint.into());
        self
    }

    pub fn municipalities(&self) -> &[MunicipalRecord] {
        &self.municipalities
    }

    pub fn municipality(&self, name: &str) -> Option<&MunicipalRecord> {
        self.municipalities.iter().find(|r| r.municipality == name)
    }

    pub fn sheets(&self) -> &SheetSet {
        &self.sheets
    }

    pub fn geometry(&self) -> &GeometryCollection {
        &self.geometry
    }

    pub fn labels(&self) -> &LabelConfig {
        &self.labels
    }

    pub fn provenance(&self) -> &Provenance {
        &self.provenance
    }

    /// Regional first, then every municipality by name
    pub fn scope_options(&self) -> Vec<ScopeSelection> {
        ScopeSelection::options(self.municipalities.iter().map(|r| r.municipality.as_str()))
    }

    /// Derived tables for `scope`; a fresh value on every call
    pub fn view(&self, scope: &ScopeSelection) -> ScopedView {
        ScopedView::build(scope, &self.municipalities, &self.sheets, &self.labels)
    }

    pub fn quality(&self) -> QualityReport {
        DataQualityEngine::new().assess(self)
    }
}

// ============================================================================
// INGESTION
// ============================================================================

/// Build a dataset from already-open sources
pub fn ingest_sources<C, W, G>(
    config: &DashboardConfig,
    municipal_csv: C,
    workbook: &mut W,
    geometry: G,
) -> Result<Dataset>
where
    C: Read,
    W: WorkbookSource + ?Sized,
    G: Read,
{
    let sources = &config.sources;

    let municipalities = load_municipal_csv(municipal_csv, &config.columns, &sources.municipal_csv)?;
    let sheets = SheetSet::load(workbook, config)?;
    let geometry =
        GeometryCollection::from_reader(geometry, &config.geometry.name_property, &sources.geometry)?;

    info!(
        municipalities = municipalities.len(),
        geometry_features = geometry.len(),
        "dataset loaded"
    );

    let dataset = Dataset::new(municipalities, sheets, geometry, config.labels.clone());
    log_quality(&dataset.quality());
    Ok(dataset)
}

fn log_quality(report: &QualityReport) {
    for issue in &report.issues {
        match issue.severity {
            Severity::Critical | Severity::Warning => warn!(
                severity = issue.severity.name(),
                field = %issue.field,
                "{}", issue.issue
            ),
            Severity::Info => info!(field = %issue.field, "{}", issue.issue),
        }
    }
    info!("{}", report.summary());
}

/// Ingestor - path-based loading driven by configuration
#[derive(Debug, Clone)]
pub struct Ingestor {
    config: DashboardConfig,
}

impl Ingestor {
    pub fn new(config: DashboardConfig) -> Self {
        Ingestor { config }
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    /// Check every source exists, then load them all
    pub fn ingest(&self) -> Result<Dataset> {
        let paths = self.config.sources.all_paths();
        if let Some(missing) = paths.iter().find(|p| !p.exists()) {
            return Err(IngestionError::missing(missing.display().to_string()));
        }

        let csv = BufReader::new(File::open(self.config.sources.municipal_csv_path())?);
        let mut workbook = CalamineWorkbook::open(&self.config.sources.workbook_path())?;
        let geometry = BufReader::new(File::open(self.config.sources.geometry_path())?);

        let dataset = ingest_sources(&self.config, csv, &mut workbook, geometry)?;
        Ok(dataset.with_sources(paths.iter().map(|p| p.display().to_string()).collect()))
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::ErrorCategory;
    use crate::geometry::tests::{collection, feature};
    use crate::municipal::tests::HEADER;
    use crate::sheets::tests::sample_workbook;
    use crate::workbook::tests::write_xlsx;
    use crate::workbook::InMemoryWorkbook;
    use std::path::Path;

    fn municipal_csv() -> String {
        format!(
            "{}\n{}\n{}\n{}",
            HEADER,
            r#"A,0.721,"R$ 25.432,10","10.500","10.000","6.000","31,5%","1,85""#,
            r#"B,0.690,"R$ 18.000,00","5.100","5.000","2.000","28%","1,5""#,
            r#"C,0.650,"1234.56","1.000","1.000","900","20,0%","1""#,
        )
    }

    fn geojson() -> String {
        collection(vec![feature("A", -41.5, -20.8), feature("B", -41.6, -20.4), feature("C", -41.7, -20.6)])
    }

    /// Write the CSV, workbook and GeoJSON fixtures into `dir`
    pub(crate) fn write_sources(dir: &Path) -> DashboardConfig {
        let config = DashboardConfig::default().with_data_dir(dir);
        std::fs::write(config.sources.municipal_csv_path(), municipal_csv()).unwrap();
        std::fs::write(config.sources.geometry_path(), geojson()).unwrap();
        write_xlsx(&config.sources.workbook_path(), &mut sample_workbook());
        config
    }

    fn ingest() -> Dataset {
        let mut wb = sample_workbook();
        ingest_sources(
            &DashboardConfig::default(),
            municipal_csv().as_bytes(),
            &mut wb,
            geojson().as_bytes(),
        )
        .unwrap()
    }

    #[test]
    fn test_ingest_sources_builds_dataset() {
        let ds = ingest();
        assert_eq!(ds.municipalities().len(), 3);
        assert_eq!(ds.municipality("C").unwrap().gdp_per_capita, 1234.56);
        assert_eq!(ds.sheets().companies.len(), 3);
        assert_eq!(ds.geometry().len(), 3);
        assert!(ds.provenance().fingerprint.is_none());
    }

    #[test]
    fn test_view_for_municipality() {
        let ds = ingest();
        let view = ds.view(&ScopeSelection::municipality("A"));
        assert_eq!(view.municipalities.len(), 1);
        assert_eq!(view.indicators.unwrap().pct_active, 60.0);
    }

    #[test]
    fn test_scope_options() {
        let ds = ingest();
        let options = ds.scope_options();
        assert_eq!(options.len(), 4);
        assert_eq!(options[0], ScopeSelection::Regional);
        assert_eq!(options[3], ScopeSelection::municipality("C"));
    }

    #[test]
    fn test_missing_sheet_aborts() {
        let mut wb = InMemoryWorkbook::new();
        let err = ingest_sources(
            &DashboardConfig::default(),
            municipal_csv().as_bytes(),
            &mut wb,
            geojson().as_bytes(),
        )
        .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::MissingSource);
    }

    #[test]
    fn test_invalid_geometry_aborts() {
        let mut wb = sample_workbook();
        let err = ingest_sources(
            &DashboardConfig::default(),
            municipal_csv().as_bytes(),
            &mut wb,
            "[]".as_bytes(),
        )
        .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::UnexpectedIngestion);
    }

    #[test]
    fn test_ingestor_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = DashboardConfig::default().with_data_dir(dir.path());
        let err = Ingestor::new(config).ingest().unwrap_err();

        assert_eq!(err.category(), ErrorCategory::MissingSource);
        assert!(err.to_string().contains("cidades.csv"));
    }

    #[test]
    fn test_ingestor_loads_files_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_sources(dir.path());
        let ds = Ingestor::new(config).ingest().unwrap();

        assert_eq!(ds.municipalities().len(), 3);
        assert_eq!(ds.sheets().geo_zones.len(), 5);
        assert_eq!(ds.sheets().geo_zones.rows()[2].percentage, 80.5);
        assert_eq!(ds.sheets().employment_by_age.rows()[3].employees, 1020.0);
        assert_eq!(ds.sheets().institutions.rows()[2].subcategory, None);
        assert_eq!(ds.provenance().sources.len(), 3);
        assert!(ds.provenance().sources[1].ends_with("base_de_dados.xlsx"));

        let memory = ingest();
        assert_eq!(ds.sheets(), memory.sheets());
        assert_eq!(
            ds.view(&ScopeSelection::Regional).employment_by_sector,
            memory.view(&ScopeSelection::Regional).employment_by_sector
        );
    }

    #[test]
    fn test_provenance_builders() {
        let ds = ingest()
            .with_sources(vec!["a.csv".to_string()])
            .with_fingerprint("abc123");
        assert_eq!(ds.provenance().sources, vec!["a.csv"]);
        assert_eq!(ds.provenance().fingerprint.as_deref(), Some("abc123"));
    }
}
