// 🗺️ Scoped Views
// Filter every table by the active scope, then run one aggregation per sheet.
//
// Regional and municipal scopes share the same path: the scope is only a row
// predicate, so a municipal view of a one-row-per-key sheet aggregates as an
// identity.

use crate::aggregation::{
    count_by, group_by, mean, order_by_sequence, sort_by_value_desc, value_of, GroupedMeasure, Reducer,
};
use crate::config::LabelConfig;
use crate::municipal::MunicipalRecord;
use crate::scope::ScopeSelection;
use crate::sheets::{InstitutionRow, SheetSet};
use serde::{Deserialize, Serialize};

// ============================================================================
// INDICATORS
// ============================================================================

/// Share of the census population that is of working age, in percent.
/// Defined as 0 when the census population is not positive.
pub fn pct_active(working_age: f64, census: f64) -> f64 {
    if census > 0.0 {
        working_age / census * 100.0
    } else {
        0.0
    }
}

/// KPI card figures for the active scope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Indicators {
    pub municipality_count: usize,
    pub mean_hdi: f64,
    pub mean_gdp_per_capita: f64,
    pub estimated_population: f64,
    pub census_population: f64,
    pub working_age_population: f64,
    pub mean_employed_rate: f64,
    pub mean_income_min_wages: f64,
    pub pct_active: f64,
}

impl Indicators {
    /// `None` for an empty table; every mean needs at least one row
    pub fn from_records(records: &[&MunicipalRecord]) -> Option<Self> {
        let mean_of = |f: fn(&MunicipalRecord) -> f64| mean(records.iter().map(|r| f(r)));
        let sum_of = |f: fn(&MunicipalRecord) -> f64| records.iter().map(|r| f(r)).sum::<f64>();

        let census_population = sum_of(|r| r.census_population);
        let working_age_population = sum_of(|r| r.working_age_population);

        Some(Indicators {
            municipality_count: records.len(),
            mean_hdi: mean_of(|r| r.hdi)?,
            mean_gdp_per_capita: mean_of(|r| r.gdp_per_capita)?,
            estimated_population: sum_of(|r| r.estimated_population),
            census_population,
            working_age_population,
            mean_employed_rate: mean_of(|r| r.employed_rate)?,
            mean_income_min_wages: mean_of(|r| r.income_min_wages)?,
            pct_active: pct_active(working_age_population, census_population),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoneShares {
    pub urban: f64,
    pub rural: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntrepreneurshipCounts {
    pub accelerators: usize,
    pub coworkings: usize,
    pub incubators: usize,
}

impl EntrepreneurshipCounts {
    /// Exact subcategory label match
    pub fn count<'a>(rows: impl IntoIterator<Item = &'a InstitutionRow>, labels: &LabelConfig) -> Self {
        let mut counts = EntrepreneurshipCounts::default();
        for row in rows {
            match row.subcategory.as_deref() {
                Some(s) if s == labels.accelerator => counts.accelerators += 1,
                Some(s) if s == labels.coworking => counts.coworkings += 1,
                Some(s) if s == labels.incubator => counts.incubators += 1,
                _ => {}
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.accelerators + self.coworkings + self.incubators
    }
}

// ============================================================================
// SECTIONS
// ============================================================================

/// Dashboard sections, each of which may render an empty-state notice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Section {
    Indicators,
    GeoZones,
    EmploymentBySector,
    EmploymentByAge,
    Companies,
    SchoolsByNetwork,
    SchoolsByLevel,
    EducationIndex,
    Institutions,
}

impl Section {
    pub fn name(&self) -> &str {
        match self {
            Section::Indicators => "indicators",
            Section::GeoZones => "geographic zones",
            Section::EmploymentBySector => "employment by sector",
            Section::EmploymentByAge => "employment by age bracket",
            Section::Companies => "companies by size",
            Section::SchoolsByNetwork => "schools by network",
            Section::SchoolsByLevel => "schools by level",
            Section::EducationIndex => "education index",
            Section::Institutions => "institutions",
        }
    }
}

// ============================================================================
// VIEW
// ============================================================================

/// ScopedView - everything a renderer needs for one scope
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScopedView {
    pub scope: ScopeSelection,
    pub municipalities: Vec<MunicipalRecord>,
    pub indicators: Option<Indicators>,
    pub geo_zones: Vec<GroupedMeasure>,
    pub zone_shares: Option<ZoneShares>,
    pub employment_by_sector: Vec<GroupedMeasure>,
    pub employment_by_age: Vec<GroupedMeasure>,
    pub companies_by_size: Vec<GroupedMeasure>,
    pub schools_by_network: Vec<GroupedMeasure>,
    pub schools_by_level: Vec<GroupedMeasure>,
    pub education_index: Vec<GroupedMeasure>,
    pub institutions_by_category: Vec<GroupedMeasure>,
    pub institutions: Vec<InstitutionRow>,
    pub entrepreneurship: EntrepreneurshipCounts,
}

impl ScopedView {
    /// A view with every section empty
    pub fn empty(scope: &ScopeSelection) -> Self {
        ScopedView {
            scope: scope.clone(),
            municipalities: Vec::new(),
            indicators: None,
            geo_zones: Vec::new(),
            zone_shares: None,
            employment_by_sector: Vec::new(),
            employment_by_age: Vec::new(),
            companies_by_size: Vec::new(),
            schools_by_network: Vec::new(),
            schools_by_level: Vec::new(),
            education_index: Vec::new(),
            institutions_by_category: Vec::new(),
            institutions: Vec::new(),
            entrepreneurship: EntrepreneurshipCounts::default(),
        }
    }

    /// Filter, then aggregate. Never fails; unknown names yield empty sections.
    ///
    /// When no municipal row falls in the scope, every sheet is treated as
    /// empty too, even if it holds rows under that name.
    pub fn build(
        scope: &ScopeSelection,
        records: &[MunicipalRecord],
        sheets: &SheetSet,
        labels: &LabelConfig,
    ) -> Self {
        let scoped_records: Vec<&MunicipalRecord> = records
            .iter()
            .filter(|r| scope.includes(&r.municipality))
            .collect();
        let indicators = match Indicators::from_records(&scoped_records) {
            Some(indicators) => indicators,
            None => return ScopedView::empty(scope),
        };

        let geo_zones = group_by(
            sheets.geo_zones.scoped(scope),
            |r| r.zone.as_str(),
            |r| r.percentage,
            Reducer::Mean,
        );
        let zone_shares = if geo_zones.is_empty() {
            None
        } else {
            Some(ZoneShares {
                urban: value_of(&geo_zones, &labels.urban_zone),
                rural: value_of(&geo_zones, &labels.rural_zone),
            })
        };

        let employment_by_sector = sort_by_value_desc(group_by(
            sheets.employment_by_sector.scoped(scope),
            |r| r.sector.as_str(),
            |r| r.employees,
            Reducer::Sum,
        ));

        let employment_by_age = order_by_sequence(
            group_by(
                sheets.employment_by_age.scoped(scope),
                |r| r.bracket.as_str(),
                |r| r.employees,
                Reducer::Sum,
            ),
            &labels.age_bracket_order,
        );

        let companies_by_size = group_by(
            sheets.companies.scoped(scope),
            |r| r.size.as_str(),
            |r| r.quantity,
            Reducer::Sum,
        );

        // bar charts: tallest bar first
        let schools_by_network = sort_by_value_desc(count_by(sheets.schools.scoped(scope), |r| r.network.as_str()));
        let schools_by_level = sort_by_value_desc(count_by(sheets.schools.scoped(scope), |r| r.level.as_str()));

        let education_index = group_by(
            sheets.education_index.scoped(scope),
            |r| r.stage.as_str(),
            |r| r.index,
            Reducer::Mean,
        );

        let institutions: Vec<InstitutionRow> = sheets.institutions.scoped(scope).cloned().collect();
        let institutions_by_category = sort_by_value_desc(count_by(&institutions, |r| r.category.as_str()));
        let entrepreneurship = EntrepreneurshipCounts::count(&institutions, labels);

        ScopedView {
            scope: scope.clone(),
            municipalities: scoped_records.into_iter().cloned().collect(),
            indicators: Some(indicators),
            geo_zones,
            zone_shares,
            employment_by_sector,
            employment_by_age,
            companies_by_size,
            schools_by_network,
            schools_by_level,
            education_index,
            institutions_by_category,
            institutions,
            entrepreneurship,
        }
    }

    /// Sections with nothing to show
    pub fn empty_sections(&self) -> Vec<Section> {
        let checks = [
            (Section::Indicators, self.indicators.is_none()),
            (Section::GeoZones, self.geo_zones.is_empty()),
            (Section::EmploymentBySector, self.employment_by_sector.is_empty()),
            (Section::EmploymentByAge, self.employment_by_age.is_empty()),
            (Section::Companies, self.companies_by_size.is_empty()),
            (Section::SchoolsByNetwork, self.schools_by_network.is_empty()),
            (Section::SchoolsByLevel, self.schools_by_level.is_empty()),
            (Section::EducationIndex, self.education_index.is_empty()),
            (Section::Institutions, self.institutions.is_empty()),
        ];
        checks
            .into_iter()
            .filter(|(_, empty)| *empty)
            .map(|(section, _)| section)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.empty_sections().len() == 9
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DashboardConfig;
    use crate::sheets::tests::sample_workbook;
    use crate::sheets::{GeoZoneRow, SheetTable};

    fn record(name: &str, census: f64, working_age: f64) -> MunicipalRecord {
        MunicipalRecord {
            municipality: name.to_string(),
            hdi: 0.7,
            gdp_per_capita: 20000.0,
            estimated_population: census,
            census_population: census,
            working_age_population: working_age,
            employed_rate: 30.0,
            income_min_wages: 1.5,
        }
    }

    fn fixture() -> (Vec<MunicipalRecord>, SheetSet, LabelConfig) {
        let records = vec![
            record("A", 10000.0, 6000.0),
            record("B", 5000.0, 2000.0),
            record("C", 1000.0, 900.0),
        ];
        let mut wb = sample_workbook();
        let sheets = SheetSet::load(&mut wb, &DashboardConfig::default()).unwrap();
        (records, sheets, LabelConfig::default())
    }

    #[test]
    fn test_pct_active() {
        assert_eq!(pct_active(0.0, 0.0), 0.0);
        assert_eq!(pct_active(6000.0, 10000.0), 60.0);
        assert_eq!(pct_active(5.0, -1.0), 0.0);
    }

    #[test]
    fn test_municipal_scope_single_row() {
        let (records, sheets, labels) = fixture();
        let view = ScopedView::build(&ScopeSelection::municipality("A"), &records, &sheets, &labels);

        assert_eq!(view.municipalities.len(), 1);
        let indicators = view.indicators.unwrap();
        assert_eq!(indicators.pct_active, 60.0);
        assert_eq!(indicators.municipality_count, 1);
    }

    #[test]
    fn test_regional_sector_sums() {
        let (records, sheets, labels) = fixture();
        let view = ScopedView::build(&ScopeSelection::Regional, &records, &sheets, &labels);

        assert_eq!(
            view.employment_by_sector,
            vec![
                GroupedMeasure::new("Industry", 200.0),
                GroupedMeasure::new("Agriculture", 150.0),
            ]
        );
    }

    #[test]
    fn test_regional_sums_equal_sum_of_municipal_sums() {
        let (records, sheets, labels) = fixture();
        let regional = ScopedView::build(&ScopeSelection::Regional, &records, &sheets, &labels);

        for group in &regional.employment_by_sector {
            let municipal_total: f64 = ["A", "B", "C"]
                .iter()
                .map(|name| {
                    let view = ScopedView::build(&ScopeSelection::municipality(*name), &records, &sheets, &labels);
                    value_of(&view.employment_by_sector, &group.label)
                })
                .sum();
            assert_eq!(group.value, municipal_total);
        }

        let total_regional: f64 = regional.companies_by_size.iter().map(|g| g.value).sum();
        assert_eq!(total_regional, 120.0);
    }

    #[test]
    fn test_unknown_municipality_is_empty_not_error() {
        let (records, sheets, labels) = fixture();
        let view = ScopedView::build(&ScopeSelection::municipality("Z"), &records, &sheets, &labels);

        assert!(view.municipalities.is_empty());
        assert!(view.indicators.is_none());
        assert!(view.zone_shares.is_none());
        assert_eq!(view.entrepreneurship, EntrepreneurshipCounts::default());
        assert!(view.is_empty());
    }

    #[test]
    fn test_missing_rural_row_is_zero() {
        let (records, sheets, labels) = fixture();
        let view = ScopedView::build(&ScopeSelection::municipality("C"), &records, &sheets, &labels);
        assert_eq!(view.zone_shares, Some(ZoneShares { urban: 100.0, rural: 0.0 }));

        let only_urban = SheetSet {
            geo_zones: SheetTable::new(vec![GeoZoneRow {
                municipality: "A".to_string(),
                zone: "Urbana".to_string(),
                percentage: 100.0,
            }]),
            ..SheetSet::default()
        };
        let view = ScopedView::build(&ScopeSelection::Regional, &records, &only_urban, &labels);
        assert_eq!(view.zone_shares.map(|z| z.rural), Some(0.0));
    }

    #[test]
    fn test_regional_zone_means() {
        let (records, sheets, labels) = fixture();
        let view = ScopedView::build(&ScopeSelection::Regional, &records, &sheets, &labels);
        let shares = view.zone_shares.unwrap();
        assert_eq!(shares.rural, 29.75);
        assert!((shares.urban - 240.5 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_age_brackets_follow_fixed_order() {
        let (records, sheets, labels) = fixture();
        let view = ScopedView::build(&ScopeSelection::Regional, &records, &sheets, &labels);
        let labels: Vec<&str> = view.employment_by_age.iter().map(|g| g.label.as_str()).collect();
        assert_eq!(labels, vec!["15-17", "18-24", "65-mais"]);
        assert_eq!(view.employment_by_age[1].value, 1060.0);
    }

    #[test]
    fn test_schools_and_institutions_counted() {
        let (records, sheets, labels) = fixture();
        let view = ScopedView::build(&ScopeSelection::municipality("A"), &records, &sheets, &labels);

        assert_eq!(value_of(&view.schools_by_network, "Municipal"), 2.0);
        assert_eq!(value_of(&view.schools_by_level, "Medio"), 1.0);
        assert_eq!(value_of(&view.institutions_by_category, "EMPREENDEDORISMO"), 2.0);
        assert_eq!(
            view.entrepreneurship,
            EntrepreneurshipCounts { accelerators: 0, coworkings: 1, incubators: 1 }
        );

        let regional = ScopedView::build(&ScopeSelection::Regional, &records, &sheets, &labels);
        assert_eq!(regional.entrepreneurship.incubators, 2);
        assert_eq!(regional.entrepreneurship.total(), 4);
    }

    #[test]
    fn test_education_index_mean() {
        let (records, sheets, labels) = fixture();
        let view = ScopedView::build(&ScopeSelection::Regional, &records, &sheets, &labels);
        assert_eq!(value_of(&view.education_index, "Anos Iniciais"), 5.5);
    }

    #[test]
    fn test_sheet_rows_without_municipal_row_are_not_shown() {
        let (records, sheets, labels) = fixture();
        let only_a: Vec<MunicipalRecord> = records.into_iter().filter(|r| r.municipality == "A").collect();

        let view = ScopedView::build(&ScopeSelection::municipality("B"), &only_a, &sheets, &labels);
        assert!(view.municipalities.is_empty());
        assert!(view.indicators.is_none());
        assert!(view.employment_by_sector.is_empty());
        assert!(view.geo_zones.is_empty());
        assert!(view.zone_shares.is_none());
        assert!(view.institutions.is_empty());
        assert_eq!(view.entrepreneurship, EntrepreneurshipCounts::default());
        assert!(view.is_empty());
        assert_eq!(view, ScopedView::empty(&ScopeSelection::municipality("B")));
    }

    #[test]
    fn test_regional_over_empty_table_is_empty() {
        let (_, sheets, labels) = fixture();
        let view = ScopedView::build(&ScopeSelection::Regional, &[], &sheets, &labels);

        assert!(view.indicators.is_none());
        assert!(view.companies_by_size.is_empty());
        assert!(view.schools_by_network.is_empty());
        assert_eq!(view.empty_sections().len(), 9);
    }

    #[test]
    fn test_bar_sections_sorted_by_value() {
        let (records, sheets, labels) = fixture();
        let view = ScopedView::build(&ScopeSelection::Regional, &records, &sheets, &labels);

        let networks: Vec<&str> = view.schools_by_network.iter().map(|g| g.label.as_str()).collect();
        assert_eq!(networks, vec!["Municipal", "Estadual"]);
        assert_eq!(view.institutions_by_category[0].label, "EMPREENDEDORISMO");
        // pie slices stay in label order
        assert_eq!(view.companies_by_size[0].label, "ME");
    }

    #[test]
    fn test_empty_sections_for_sparse_municipality() {
        let (records, sheets, labels) = fixture();
        let view = ScopedView::build(&ScopeSelection::municipality("C"), &records, &sheets, &labels);
        let empty = view.empty_sections();

        assert!(!empty.contains(&Section::Indicators));
        assert!(!empty.contains(&Section::GeoZones));
        assert!(empty.contains(&Section::EmploymentBySector));
        assert!(empty.contains(&Section::Institutions));
    }
}
