use clap::Parser;
use onus_rateio::core::terms_csv::read_terms;
use onus_rateio::core::{ConfigProvider, Storage};
use onus_rateio::utils::error::{ErrorSeverity, OnusError};
use onus_rateio::utils::{logger, validation::Validate};
use onus_rateio::{
    LocalStorage, OnusCalculator, OnusEngine, OnusPipeline, ReferenceData, TermExpander, TomlConfig,
};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "onus-batch")]
#[command(about = "Runs every [[calculation]] of a TOML file against one terms table")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "onus.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    /// Override monitoring setting from config
    #[arg(long)]
    monitor: Option<bool>,

    /// Expand terms and check calculations without writing anything
    #[arg(long)]
    dry_run: bool,
}

fn exit_code(e: &OnusError) -> i32 {
    match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    }
}

fn fail(stage: &str, e: &OnusError) -> ! {
    tracing::error!(
        "❌ {} failed: {} (Category: {:?}, Severity: {:?})",
        stage,
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
    std::process::exit(exit_code(e).max(1));
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = match TomlConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    if args.json_logs || config.json_logs() {
        logger::init_json_logger(args.verbose);
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("🚀 Starting batch ônus apportionment");
    tracing::info!("📁 Configuration loaded from: {}", args.config);

    if let Err(e) = config.validate() {
        fail("Configuration validation", &e);
    }

    display_config_summary(&config, &args);

    let storage = LocalStorage::default();
    let reference = match ReferenceData::load(&storage, config.area_file(), config.population_file()).await {
        Ok(reference) => Arc::new(reference),
        Err(e) => fail("Loading reference tables", &e),
    };

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No output will be written");
        if let Err(e) = perform_dry_run(&storage, &config, &reference).await {
            fail("Dry run", &e);
        }
        return Ok(());
    }

    let monitor_enabled = args.monitor.unwrap_or_else(|| config.monitoring_enabled());
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let pipeline = OnusPipeline::new(storage, config, reference);
    let engine = OnusEngine::new_with_monitoring(pipeline, monitor_enabled);

    match engine.run().await {
        Ok(output_path) => {
            tracing::info!("✅ Batch completed successfully!");
            println!("✅ Batch completed successfully!");
            println!("📁 Output saved to: {}", output_path);
        }
        Err(e) => {
            if exit_code(&e) > 0 {
                fail("Batch run", &e);
            }
            tracing::warn!("⚠️ Batch finished with a warning: {}", e);
        }
    }

    Ok(())
}

fn display_config_summary(config: &TomlConfig, args: &Args) {
    println!("📋 Configuration Summary:");
    println!("  Run: {}", config.run.name);
    if let Some(description) = &config.run.description {
        println!("  Description: {}", description);
    }
    println!("  Area table: {}", config.area_file());
    println!("  Population table: {}", config.population_file());
    println!("  Terms: {}", config.terms_file());
    println!("  Output: {}", config.output_path());
    println!("  Formats: {}", config.output_formats().join(", "));
    if let Some(archive) = config.archive_name() {
        println!("  Compression: {} (ZIP)", archive);
    }
    println!("  Calculations: {}", config.calculations.len());

    if args.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }

    println!();
}

async fn perform_dry_run(
    storage: &LocalStorage,
    config: &TomlConfig,
    reference: &ReferenceData,
) -> onus_rateio::Result<()> {
    println!("🔍 Dry Run Analysis:");
    println!();

    let years = reference.year_range();
    println!("📚 Reference Data:");
    println!("  Memberships: {}", reference.memberships().len());
    match (years.first(), years.last()) {
        (Some(first), Some(last)) => println!("  Population years: {}-{}", first, last),
        _ => println!("  Population years: none"),
    }

    let data = storage.read_file(config.terms_file()).await?;
    let terms = read_terms(data.as_slice())?;
    let expander = TermExpander::new(reference);
    let report = expander.expand_all(&terms);

    println!();
    println!("📄 Terms:");
    println!("  Read: {}", terms.len());
    println!("  Expanded rows: {}", report.rows.len());
    for rejected in &report.rejected {
        println!("  ❌ #{} {}: {}", rejected.index + 1, rejected.term, rejected.reason);
    }

    println!();
    println!("🧮 Calculations:");
    let calculator = OnusCalculator::new();
    for request in config.calculations() {
        match calculator.validate_inputs(&request) {
            Ok(()) => println!("  ✅ {}", request.label()),
            Err(e) => println!("  ❌ {}: {}", request.label(), e.user_friendly_message()),
        }
    }

    println!();
    println!("✅ Dry run analysis complete. Use --verbose for more details during actual run.");

    Ok(())
}
