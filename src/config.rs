// ⚙️ Dashboard Configuration
// File locations, sheet names, column headers and presentation labels.
// Spreadsheet labels change often; nothing in the pipeline hardcodes them.

use crate::error::{IngestionError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

// ============================================================================
// TOP LEVEL
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub sources: SourceConfig,
    pub sheets: SheetNames,
    pub columns: ColumnNames,
    pub geometry: GeometryConfig,
    pub labels: LabelConfig,
}

impl DashboardConfig {
    /// Load from a TOML file. Missing keys fall back to the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(IngestionError::missing(path.display().to_string()));
        }
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
            .map_err(|e| IngestionError::malformed(path.display().to_string(), e.to_string()))
    }

    pub fn from_toml_str(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Same configuration with sources resolved against another directory
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.sources.data_dir = dir.into();
        self
    }
}

// ============================================================================
// SOURCES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub data_dir: PathBuf,
    pub municipal_csv: String,
    pub workbook: String,
    pub geometry: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig {
            data_dir: PathBuf::from("."),
            municipal_csv: "cidades.csv".to_string(),
            workbook: "base_de_dados.xlsx".to_string(),
            geometry: "municipios_caparao.geojson".to_string(),
        }
    }
}

impl SourceConfig {
    pub fn municipal_csv_path(&self) -> PathBuf {
        self.data_dir.join(&self.municipal_csv)
    }

    pub fn workbook_path(&self) -> PathBuf {
        self.data_dir.join(&self.workbook)
    }

    pub fn geometry_path(&self) -> PathBuf {
        self.data_dir.join(&self.geometry)
    }

    /// All three source paths, in load order
    pub fn all_paths(&self) -> Vec<PathBuf> {
        vec![
            self.municipal_csv_path(),
            self.workbook_path(),
            self.geometry_path(),
        ]
    }
}

// ============================================================================
// SHEETS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetNames {
    pub geo_zones: String,
    pub employment_by_sector: String,
    pub employment_by_age: String,
    pub companies: String,
    pub schools: String,
    pub education_index: String,
    pub institutions: String,
}

impl Default for SheetNames {
    fn default() -> Self {
        SheetNames {
            geo_zones: "Dados geográficos".to_string(),
            employment_by_sector: "Empregados por setor".to_string(),
            employment_by_age: "Empregados por faixa etária".to_string(),
            companies: "Empresas por segmento".to_string(),
            schools: "Instituições de ensino".to_string(),
            education_index: "Índices educacionais (IDEB)".to_string(),
            institutions: "Instituições".to_string(),
        }
    }
}

// ============================================================================
// COLUMNS
// ============================================================================

/// Column headers as they appear in the source files, mapped to the
/// semantic field each one feeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnNames {
    // Municipal CSV
    pub csv_municipality: String,
    pub hdi: String,
    pub gdp_per_capita: String,
    pub estimated_population: String,
    pub census_population: String,
    pub working_age_population: String,
    pub employed_rate: String,
    pub income_min_wages: String,

    // Shared by every sheet
    pub sheet_municipality: String,

    // Dados geográficos
    pub zone: String,
    pub zone_percentage: String,

    // Empregados por setor
    pub sector: String,
    pub sector_employees: String,

    // Empregados por faixa etária
    pub age_bracket: String,
    pub age_bracket_employees: String,

    // Empresas por segmento
    pub company_size: String,
    pub company_quantity: String,

    // Instituições de ensino
    pub school_network: String,
    pub school_level: String,

    // Índices educacionais
    pub education_stage: String,
    pub education_index: String,

    // Instituições
    pub institution_category: String,
    pub institution_subcategory: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        ColumnNames {
            csv_municipality: "MUNICIPIO".to_string(),
            hdi: "IDH (IBGE/2010)".to_string(),
            gdp_per_capita: "PIB / RENDA PER CAPITA (IBGE/2021)".to_string(),
            estimated_population: "POPUL. ESTIMADA (IBGE/2024)".to_string(),
            census_population: "HABITANTES (IJSN/2022)".to_string(),
            working_age_population: "POPUL. COM IDADE ATIVA (IJSN/2022)".to_string(),
            employed_rate: "ÍNDICE DE POPUL. OCUPADA (IBGE/2022)".to_string(),
            income_min_wages: "MÉDIA DE RENDA PER CAPITA EM Nº DE SALÁRIOS MÍNIMOS (IBGE/2022)"
                .to_string(),
            sheet_municipality: "Município".to_string(),
            zone: "Zona".to_string(),
            zone_percentage: "Percentual".to_string(),
            sector: "Setor de Atuação".to_string(),
            sector_employees: "Total Empregados".to_string(),
            age_bracket: "Faixa Etária".to_string(),
            age_bracket_employees: "Total Empregados".to_string(),
            company_size: "Porte".to_string(),
            company_quantity: "Quantidade".to_string(),
            school_network: "Rede de Ensino".to_string(),
            school_level: "Nível de Ensino".to_string(),
            education_stage: "Etapa de Ensino".to_string(),
            education_index: "IDEB".to_string(),
            institution_category: "Categoria".to_string(),
            institution_subcategory: "Subcategoria".to_string(),
        }
    }
}

// ============================================================================
// GEOMETRY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryConfig {
    /// Feature property holding the municipality name
    pub name_property: String,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        GeometryConfig {
            name_property: "NM_MUN".to_string(),
        }
    }
}

// ============================================================================
// LABELS
// ============================================================================

/// Data labels the view layer matches on exactly
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    pub urban_zone: String,
    pub rural_zone: String,
    pub accelerator: String,
    pub coworking: String,
    pub incubator: String,
    pub age_bracket_order: Vec<String>,
}

impl Default for LabelConfig {
    fn default() -> Self {
        LabelConfig {
            urban_zone: "Urbana".to_string(),
            rural_zone: "Rural".to_string(),
            accelerator: "Aceleradora".to_string(),
            coworking: "Coworking".to_string(),
            incubator: "Incubadora".to_string(),
            age_bracket_order: ["15-17", "18-24", "25-29", "30-39", "40-49", "50-64", "65-mais"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
