//! Persona Revenue - rule-based persona revenue lookup
//!
//! Builds the persona table from a transactions CSV, prints segment
//! statistics, and optionally answers lookups or writes a report.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (config, unreadable data, malformed key, etc.)
//!   2 - `--persona` key is well-formed but no such persona exists

use anyhow::{Context, Result};
use persona_revenue::analysis::{compare_platforms, BatchProfile};
use persona_revenue::cli::Args;
use persona_revenue::config::{Config, DEFAULT_CONFIG_FILE};
use persona_revenue::report::{write_report, TableReport};
use persona_revenue::{
    load_records, CategoricalDomain, LookupService, PersonaError, PersonaTable, Record,
    SessionOutcome,
};
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args);

    info!("Persona Revenue v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args) {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            error!("Run failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .persona.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", DEFAULT_CONFIG_FILE);
    println!("   Edit it to customize columns, age boundaries and segment labels.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Build the table and run the requested mode. Returns the exit code.
fn run(args: Args) -> Result<i32> {
    let start_time = Instant::now();

    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    config.validate().context("Invalid configuration")?;

    let buckets = config.age_buckets()?;
    let segmenter = config.segmenter()?;

    // Step 1: Load the batch
    let records = load_records(&config.data.path, &config.data)?;

    if args.explore {
        print_profile(&records, args.compare_country.as_deref());
    }

    // Step 2: Aggregate and segment
    let table = PersonaTable::build(&records, &buckets, &segmenter)
        .context("Failed to build persona table")?;

    print_summary(&table, records.len());
    info!("Table ready in {:.2}s", start_time.elapsed().as_secs_f64());

    // Step 3: Optional report
    if let Some(ref path) = args.report {
        let report = TableReport::from_table(
            &table,
            config.data.path.display().to_string(),
            records.len(),
            config.report.include_personas,
        );
        write_report(&report, config.report.format, path)?;
        println!("\n📝 Report saved to: {}", path.display());
    }

    // Step 4: Lookups
    if let Some(ref key) = args.persona {
        return lookup_once(&table, key);
    }

    if args.interactive {
        let service = LookupService::new(
            &table,
            CategoricalDomain::from_records(&records),
            config.lookup.clone(),
        );
        let stdin = std::io::stdin();
        let stdout = std::io::stdout();
        let outcome = service.run_session(&mut stdin.lock(), &mut stdout.lock())?;
        if let SessionOutcome::Abandoned { field } = outcome {
            warn!("Lookup abandoned while reading {}", field);
        }
    }

    Ok(0)
}

/// Look up a single key. Exit code 2 when the persona does not exist.
fn lookup_once(table: &PersonaTable, key: &str) -> Result<i32> {
    match table.lookup_str(key) {
        Ok((key, entry)) => {
            println!(
                "\n✅ {}: expected revenue {:.2}, segment {} ({} customers)",
                key, entry.mean_price, entry.segment, entry.count
            );
            Ok(0)
        }
        Err(PersonaError::PersonaNotFound { key }) => {
            println!("\n⛔ No such persona exists: {}", key);
            Ok(2)
        }
        Err(e) => Err(e.into()),
    }
}

fn print_summary(table: &PersonaTable, records: usize) {
    println!("\n📊 Persona Table:");
    println!("   Records: {}", records);
    if table.dropped_records() > 0 {
        println!("   Dropped (age out of range): {}", table.dropped_records());
    }
    println!("   Personas: {}", table.len());
    println!("\n   Segment | Personas | Mean    | Max     | Sum");
    for stats in table.segment_stats().iter().rev() {
        println!(
            "   {:<7} | {:>8} | {:>7.2} | {:>7.2} | {:>8.2}",
            stats.segment.label, stats.personas, stats.mean, stats.max, stats.sum
        );
    }
}

fn print_profile(records: &[Record], compare_country: Option<&str>) {
    let profile = BatchProfile::from_records(records);

    println!("\n🔍 Batch Profile ({} records):", profile.records);
    println!("   Platforms: {:?}", profile.platforms);
    println!("   Sexes: {:?}", profile.sexes);
    println!("   Price levels: {:?}", profile.price_levels);
    println!("\n   Country | Customers % | Revenue    | Mean");
    for country in &profile.revenue_by_country {
        println!(
            "   {:<7} | {:>10.1}% | {:>10.2} | {:>6.2}",
            country.country, country.customer_share, country.revenue, country.mean_price
        );
    }
    println!("\n   Mean by platform: {:?}", profile.mean_by_platform);
    println!("   Mean by country/platform: {:?}", profile.mean_by_country_platform);

    let Some(country) = compare_country else {
        return;
    };
    let domain = CategoricalDomain::from_records(records);
    let platforms: Vec<&str> = domain.platforms().collect();
    if platforms.len() < 2 {
        warn!("Need at least two platforms to compare, found {}", platforms.len());
        return;
    }

    let result = compare_platforms(records, country, platforms[0], platforms[1]);
    println!(
        "\n   Mann-Whitney U ({} {} n={} vs {} n={}): U={:.1}, p={:.4}{}",
        country.to_uppercase(),
        platforms[0],
        result.n1,
        platforms[1],
        result.n2,
        result.u,
        result.p_value,
        if result.is_significant(0.05) {
            " (significant at 0.05)"
        } else {
            ""
        }
    );
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", DEFAULT_CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
