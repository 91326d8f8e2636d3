//! orgcap - operator CLI for org-unit capability policies
//!
//! - Inspect the capability registry
//! - Dry-run rollout plans (draft / activate / rollback) against a fresh
//!   in-process runtime
//! - Compute effective policy versions and check cached client versions

use anyhow::{Context, Result};
use chrono::{NaiveDate, TimeZone, Utc};
use clap::{Parser, Subcommand};
use orgcap_runtime::{CapabilityRegistry, PolicyActivationRuntime, SystemClock};
use serde::Serialize;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod plan;

use config::CliConfig;
use plan::EffectiveVersionReport;

/// orgcap CLI application
#[derive(Parser)]
#[command(name = "orgcap")]
#[command(about = "Org-unit capability policy tool", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "ORGCAP_CONFIG", global = true)]
    config: Option<String>,

    /// Log level (overrides the config file)
    #[arg(long, env = "ORGCAP_LOG_LEVEL", global = true)]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Print the capability registry
    Registry,

    /// Apply the configured rollout plan and print the resulting states
    Rollout,

    /// Print the effective policy version of a capability
    EffectiveVersion {
        #[arg(long)]
        tenant: String,

        #[arg(long)]
        capability: String,
    },

    /// Check a cached policy version; exits 1 when it is rejected
    CheckVersion {
        #[arg(long)]
        tenant: String,

        #[arg(long)]
        capability: String,

        #[arg(long)]
        version: String,

        /// Evaluate as of this UTC date (YYYY-MM-DD) instead of now
        #[arg(long)]
        at: Option<NaiveDate>,
    },
}

#[derive(Debug, Serialize)]
struct CheckReport {
    accepted: bool,
    requested: String,
    #[serde(flatten)]
    current: EffectiveVersionReport,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = CliConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    init_tracing(
        cli.log_level.as_deref().unwrap_or(&config.logging.level),
        cli.json_logs || config.logging.json,
    );

    let runtime = PolicyActivationRuntime::new(CapabilityRegistry::builtin(), Arc::new(SystemClock));

    match cli.command {
        Commands::Registry => print_json(&runtime.registry().definitions()),
        Commands::Rollout => {
            let report = plan::rollout(&runtime, &config.plan)?;
            print_json(&report)
        }
        Commands::EffectiveVersion { tenant, capability } => {
            plan::apply(&runtime, &config.plan)?;
            print_json(&EffectiveVersionReport::resolve(&runtime, &tenant, &capability))
        }
        Commands::CheckVersion {
            tenant,
            capability,
            version,
            at,
        } => {
            plan::apply(&runtime, &config.plan)?;
            let now = at.map(|date| Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN)));
            let accepted = runtime.accepts_policy_version(&version, &tenant, &capability, now);
            print_json(&CheckReport {
                accepted,
                requested: version.trim().to_string(),
                current: EffectiveVersionReport::resolve(&runtime, &tenant, &capability),
            })?;
            if !accepted {
                std::process::exit(1);
            }
            Ok(())
        }
    }
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing(level: &str, json: bool) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| level.to_string().into());

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
