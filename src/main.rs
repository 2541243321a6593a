// Regional Statistics - Command Line
// Prints scope summaries, JSON exports and the data quality report

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use regional_stats::logging::init_logging;
use regional_stats::{
    DashboardConfig, Dataset, GroupedMeasure, IngestionError, Ingestor, ScopeSelection, ScopedView,
};
use std::path::{Path, PathBuf};
use tracing::debug;

const DEFAULT_CONFIG: &str = "dashboard.toml";

#[derive(Parser)]
#[command(name = "regional-stats")]
#[command(about = "Regional statistics: load municipal indicators and print scoped views")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to ./dashboard.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the source files, overrides the configuration
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the municipalities available as scopes
    Municipalities,
    /// Print the KPI figures and charts of one scope
    Summary {
        /// Municipality name (exact); regional when omitted
        #[arg(long)]
        municipality: Option<String>,
    },
    /// Print the scoped view as JSON
    Export {
        #[arg(long)]
        municipality: Option<String>,
    },
    /// Print the data quality report
    Quality,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.json_logs);

    if let Err(err) = run(cli) {
        match err.downcast_ref::<IngestionError>() {
            Some(ingestion) => {
                eprintln!("❌ {}", ingestion.category().name());
                eprintln!("   {}", ingestion.user_message());
            }
            None => eprintln!("❌ {:#}", err),
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = load_config(cli.config.as_deref())?;
    if let Some(dir) = cli.data_dir {
        config = config.with_data_dir(dir);
    }

    let dataset = Ingestor::new(config).ingest()?;

    match cli.command {
        Commands::Municipalities => print_municipalities(&dataset),
        Commands::Summary { municipality } => print_summary(&dataset.view(&scope_from(municipality))),
        Commands::Export { municipality } => {
            let view = dataset.view(&scope_from(municipality));
            let json = serde_json::to_string_pretty(&view).context("serializing view")?;
            println!("{}", json);
        }
        Commands::Quality => print_quality(&dataset),
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<DashboardConfig> {
    match path {
        Some(path) => Ok(DashboardConfig::load(path)?),
        None if Path::new(DEFAULT_CONFIG).exists() => Ok(DashboardConfig::load(Path::new(DEFAULT_CONFIG))?),
        None => {
            debug!("no configuration file, using defaults");
            Ok(DashboardConfig::default())
        }
    }
}

fn scope_from(municipality: Option<String>) -> ScopeSelection {
    municipality.map(ScopeSelection::Municipality).unwrap_or_default()
}

// ============================================================================
// OUTPUT
// ============================================================================

fn print_municipalities(dataset: &Dataset) {
    println!("🏙️  Scopes");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    for scope in dataset.scope_options() {
        println!("  {}", scope);
    }
}

fn print_summary(view: &ScopedView) {
    println!("📊 {}", view.scope.title());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    match &view.indicators {
        Some(kpi) => {
            println!("  Municipalities:          {}", kpi.municipality_count);
            println!("  HDI (mean):              {:.3}", kpi.mean_hdi);
            println!("  GDP per capita (mean):   R$ {:.2}", kpi.mean_gdp_per_capita);
            println!("  Estimated population:    {:.0}", kpi.estimated_population);
            println!("  Census population:       {:.0}", kpi.census_population);
            println!("  Working-age population:  {:.0} ({:.1}%)", kpi.working_age_population, kpi.pct_active);
            println!("  Employed rate (mean):    {:.1}%", kpi.mean_employed_rate);
            println!("  Income (min. wages):     {:.2}", kpi.mean_income_min_wages);
        }
        None => println!("  No municipal data for this scope"),
    }

    if let Some(shares) = &view.zone_shares {
        println!("\n  Urban {:.1}% / Rural {:.1}%", shares.urban, shares.rural);
    }

    print_groups("Employment by sector", &view.employment_by_sector);
    print_groups("Employment by age bracket", &view.employment_by_age);
    print_groups("Companies by size", &view.companies_by_size);
    print_groups("Schools by network", &view.schools_by_network);
    print_groups("Schools by level", &view.schools_by_level);
    print_groups("Education index", &view.education_index);
    print_groups("Institutions by category", &view.institutions_by_category);

    let e = &view.entrepreneurship;
    println!(
        "\n  Accelerators: {}  Coworkings: {}  Incubators: {}",
        e.accelerators, e.coworkings, e.incubators
    );

    let empty = view.empty_sections();
    if !empty.is_empty() {
        let names: Vec<&str> = empty.iter().map(|s| s.name()).collect();
        println!("\n⚠️  No data for: {}", names.join(", "));
    }
}

fn print_groups(title: &str, groups: &[GroupedMeasure]) {
    if groups.is_empty() {
        return;
    }
    println!("\n  {}", title);
    for group in groups {
        println!("    {:<32} {:>12.2}", group.label, group.value);
    }
}

fn print_quality(dataset: &Dataset) {
    let report = dataset.quality();
    println!("✅ Data quality");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("  {}", report.summary());

    for (severity, issues) in report.by_severity() {
        println!("\n  [{}]", severity.name());
        for issue in issues {
            println!("    {}: {}", issue.field, issue.issue);
            println!("      → {}", issue.recommendation);
        }
    }
}
