// Regional Statistics - Core Library
// Ingestion, normalization and scoped views; used by the CLI, the API server
// and tests

pub mod error;
pub mod config;
pub mod parser;         // Locale numeric repair
pub mod workbook;       // Spreadsheet sources (calamine / in-memory)
pub mod municipal;      // Municipal indicators CSV
pub mod sheets;         // Seven categorical sheets
pub mod geometry;       // GeoJSON boundaries
pub mod scope;
pub mod aggregation;
pub mod view;           // Scoped views
pub mod dataset;        // Immutable dataset + ingestion entry points
pub mod data_quality;
pub mod cache;
pub mod logging;

// Re-export commonly used types
pub use error::{ErrorCategory, IngestionError, Result};
pub use config::{
    ColumnNames, DashboardConfig, GeometryConfig, LabelConfig, SheetNames, SourceConfig,
};
pub use parser::{
    parse_gdp, parse_hdi, parse_income, parse_population, parse_rate,
    NumericParseError, NumericRule,
};
pub use workbook::{CalamineWorkbook, CellValue, InMemoryWorkbook, RawSheet, WorkbookSource};
pub use municipal::{load_municipal_csv, MunicipalField, MunicipalRecord};
pub use sheets::{
    AgeBracketEmploymentRow, CompanyRow, EducationIndexRow, GeoZoneRow, InstitutionRow,
    SchoolRow, SectorEmploymentRow, SheetKind, SheetSet, SheetTable,
};
pub use geometry::{BoundingBox, GeometryCollection, MunicipalityShape};
pub use scope::ScopeSelection;
pub use aggregation::{GroupedMeasure, Reducer};
pub use view::{pct_active, EntrepreneurshipCounts, Indicators, ScopedView, Section, ZoneShares};
pub use dataset::{ingest_sources, Dataset, Ingestor, Provenance};
pub use data_quality::{DataQualityEngine, QualityIssue, QualityReport, Severity};
pub use cache::{source_fingerprint, DatasetCache};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
