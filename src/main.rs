use clap::Parser;
use onus_rateio::core::ConfigProvider;
use onus_rateio::utils::error::{ErrorSeverity, OnusError};
use onus_rateio::utils::{logger, validation::Validate};
use onus_rateio::{CliConfig, LocalStorage, OnusEngine, OnusPipeline, ReferenceData};
use std::sync::Arc;

fn exit_code(e: &OnusError) -> i32 {
    match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    }
}

fn report_failure(stage: &str, e: &OnusError) {
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

    let code = exit_code(e);
    if code > 0 {
        std::process::exit(code);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CliConfig::parse();

    logger::init_cli_logger(config.verbose);

    tracing::info!("Starting onus CLI");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(exit_code(&e).max(1));
    }

    let monitor_enabled = config.monitor;
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let storage = LocalStorage::default();
    let reference = match ReferenceData::load(&storage, config.area_file(), config.population_file()).await {
        Ok(reference) => Arc::new(reference),
        Err(e) => {
            report_failure("Loading reference tables", &e);
            return Ok(());
        }
    };

    let pipeline = OnusPipeline::new(storage, config, reference);
    let engine = OnusEngine::new_with_monitoring(pipeline, monitor_enabled);

    match engine.run().await {
        Ok(output_path) => {
            tracing::info!("✅ Apportionment completed successfully!");
            println!("✅ Apportionment completed successfully!");
            println!("📁 Output saved to: {}", output_path);
        }
        Err(e) => report_failure("Apportionment run", &e),
    }

    Ok(())
}
