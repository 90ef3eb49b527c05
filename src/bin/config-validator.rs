//! # Disaster Recovery Configuration Validator
//!
//! Command-line tool for validating disaster recovery configuration files before deploying
//! them. Prints the runbook in execution order and flags dependencies that can never be
//! satisfied.

use clap::{Parser, ValueEnum};
use recovery_core::config::{ConfigManager, DisasterRecoveryConfig, LoadOptions};
use recovery_core::constants::system;
use recovery_core::models::execution_order;
use std::path::PathBuf;
use std::process;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "recovery-config-validator")]
#[command(about = "Validate disaster recovery configuration files")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Base configuration file
    #[arg(short, long, default_value = system::DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Environment whose override file is layered on top (defaults to DR_ENV / APP_ENV)
    #[arg(short, long)]
    environment: Option<String>,

    /// Prefix for environment variable overrides
    #[arg(long, default_value = system::CONFIG_ENV_PREFIX)]
    env_prefix: String,

    /// Verbose output level (use multiple times for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    /// Treat dependency ordering hazards as errors
    #[arg(long)]
    strict: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let _subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .try_init();

    match validate(&cli) {
        Ok(()) => {
            info!("Configuration validation completed successfully");
            process::exit(0);
        }
        Err(e) => {
            error!("Configuration validation failed: {}", e);
            eprintln!("❌ {e}");
            process::exit(1);
        }
    }
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let options = LoadOptions {
        environment: cli
            .environment
            .clone()
            .unwrap_or_else(ConfigManager::detect_environment),
        env_prefix: cli.env_prefix.clone(),
    };

    let manager = ConfigManager::load_with_options(&cli.config, &options)?;
    let config = manager.config();
    let hazards = config.ordering_hazards();

    match cli.format {
        OutputFormat::Table => print_table(&manager, config),
        OutputFormat::Json => print_json(config)?,
    }

    if cli.strict && !hazards.is_empty() {
        return Err(format!("{} dependency ordering hazard(s) found", hazards.len()).into());
    }

    Ok(())
}

fn print_table(manager: &ConfigManager, config: &DisasterRecoveryConfig) {
    println!("🔧 Validating Disaster Recovery Configuration");
    println!("Config File: {}", manager.config_path().display());
    println!("Environment: {}", manager.environment());
    println!();
    println!("✅ Configuration loaded and validated successfully");
    println!();

    println!("📋 Settings:");
    println!("   enabled: {}", config.enabled);
    println!("   auto_failover: {}", config.auto_failover);
    println!("   health_check_interval: {}s", config.health_check_interval);
    println!("   failure_threshold: {}", config.failure_threshold);
    println!("   probe_timeout: {}s", config.probe_timeout().as_secs());
    println!(
        "   retry backoff: {}ms per retry, capped at {}ms",
        config.retry_backoff_base_ms, config.max_retry_backoff_ms
    );
    println!(
        "   RTO / RPO: {} / {} minutes",
        config.recovery_time_objective, config.recovery_point_objective
    );
    println!(
        "   notification channels: {}",
        if config.notifications.channels.is_empty() {
            "none".to_string()
        } else {
            config
                .notifications
                .channels
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        }
    );
    println!();

    println!("🧭 Runbook ({} step(s), execution order):", config.recovery_steps.len());
    for (position, step) in execution_order(&config.recovery_steps).iter().enumerate() {
        let timeout = match step.timeout {
            0 => "unbounded".to_string(),
            minutes => format!("{minutes}m"),
        };
        println!(
            "   {:>2}. {:<24} type={:<12} order={:<4} timeout={:<9} retries={}{}{}",
            position + 1,
            step.id,
            step.step_type.to_string(),
            step.order,
            timeout,
            step.retries,
            if step.critical { " critical" } else { "" },
            if step.dependencies.is_empty() {
                String::new()
            } else {
                format!(" after=[{}]", step.dependencies.join(", "))
            }
        );
    }
    println!();

    let hazards = config.ordering_hazards();
    if hazards.is_empty() {
        println!("✅ No dependency ordering hazards");
    } else {
        println!("⚠️  Dependency ordering hazards:");
        for hazard in &hazards {
            println!("   - {hazard}");
        }
    }
}

fn print_json(config: &DisasterRecoveryConfig) -> Result<(), serde_json::Error> {
    let plan: Vec<&str> = execution_order(&config.recovery_steps)
        .iter()
        .map(|step| step.id.as_str())
        .collect();
    let hazards: Vec<String> = config
        .ordering_hazards()
        .iter()
        .map(ToString::to_string)
        .collect();

    let report = serde_json::json!({
        "valid": true,
        "config": config.sanitized_for_logging(),
        "execution_order": plan,
        "ordering_hazards": hazards,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
