use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use modernizr::config::Config;
use modernizr::simulate::{self, PhasePlan, SimulationReport};
use modernizr_core::migration::{
    FeatureFlags, FlagName, MigrationPhase, RepositoryPlan, StoreKind, WritePlan, WritePolicy,
};

/// Modernizr - Phased live migration from a relational store to a distributed store
#[derive(Parser, Debug)]
#[command(name = "modernizr")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Pretty, global = true)]
    format: OutputFormat,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the feature flags for a migration phase
    Flags {
        /// Phase to inspect (1-5); defaults to MIGRATION_PHASE
        #[arg(long)]
        phase: Option<u8>,
    },
    /// Print the routing strategy for every phase
    Plan {
        /// Store used for phase 1 reads and writes
        #[arg(long, env = "DEFAULT_STORE")]
        default_store: Option<StoreKind>,
    },
    /// Run a write/read scenario for every entity against in-memory stores
    Simulate {
        /// Phase to simulate (1-5); defaults to MIGRATION_PHASE
        #[arg(long)]
        phase: Option<u8>,

        /// Secondary write policy: synchronous, best-effort or queued
        #[arg(long)]
        policy: Option<WritePolicy>,

        /// Store written first during dual writes
        #[arg(long)]
        authoritative: Option<StoreKind>,

        /// Store used for phase 1 reads and writes
        #[arg(long)]
        default_store: Option<StoreKind>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    Pretty,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so JSON output stays clean on stdout.
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "modernizr=debug".into());
    let registry = tracing_subscriber::registry().with(filter);
    if cli.log_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    let mut config = Config::from_env();

    match cli.command {
        Command::Flags { phase } => {
            if let Some(phase) = phase {
                config.migration_phase = MigrationPhase::try_from(phase)?;
            }
            let flags = FeatureFlags::for_phase(config.migration_phase);
            emit(cli.format, &flags, print_flags)?;
        }
        Command::Plan { default_store } => {
            if let Some(store) = default_store {
                config.default_store = store;
            }
            let table = simulate::phase_table(config.dual_store_settings());
            emit(cli.format, table.as_slice(), print_plan)?;
        }
        Command::Simulate {
            phase,
            policy,
            authoritative,
            default_store,
        } => {
            if let Some(phase) = phase {
                config.migration_phase = MigrationPhase::try_from(phase)?;
            }
            if let Some(policy) = policy {
                config.write_policy = policy;
            }
            if let Some(store) = authoritative {
                config.authoritative_store = store;
            }
            if let Some(store) = default_store {
                config.default_store = store;
            }
            let report = simulate::run(&config).await?;
            emit(cli.format, &report, print_report)?;
        }
    }

    Ok(())
}

fn emit<T: Serialize + ?Sized>(
    format: OutputFormat,
    value: &T,
    pretty: impl FnOnce(&T),
) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Pretty => pretty(value),
    }
    Ok(())
}

fn print_flags(flags: &FeatureFlags) {
    let phase = flags.migration_phase;
    println!("phase {} ({})", phase, phase.description());
    for flag in FlagName::ALL {
        println!("  {:<24} {}", flag.as_str(), flags.get(flag));
    }
}

fn print_plan(table: &[PhasePlan]) {
    println!(
        "{:<6} {:<14} {:<12} {:<12} {:<30}",
        "phase", "factory", "reads", "shadow", "writes"
    );
    for row in table {
        let factory = match row.plan {
            RepositoryPlan::SingleStore(store) => store.to_string(),
            RepositoryPlan::DualStore => "dual-write".to_string(),
        };
        let shadow = row
            .read
            .shadow
            .map_or_else(|| "-".to_string(), |store| store.to_string());
        let writes = match row.write {
            WritePlan::Single { store } => store.to_string(),
            WritePlan::Dual {
                authoritative,
                secondary,
            } => format!("{authoritative} then {secondary}"),
        };
        println!(
            "{:<6} {:<14} {:<12} {:<12} {:<30}",
            row.phase.number(),
            factory,
            row.read.primary,
            shadow,
            writes
        );
    }
}

fn print_report(report: &SimulationReport) {
    println!(
        "phase {} ({}), policy {}",
        report.phase,
        report.phase.description(),
        report.policy
    );
    println!();
    println!("{:<14} {:>4} {:>11} {:>12}", "entity", "id", "relational", "distributed");
    for p in &report.placements {
        println!(
            "{:<14} {:>4} {:>11} {:>12}",
            p.entity, p.id, p.relational, p.distributed
        );
    }
    println!();
    let j = &report.journal;
    println!("secondary writes:       {}", j.secondary_writes);
    println!("secondary failures:     {}", j.secondary_failures);
    println!("shadow reads:           {}", j.shadow_reads);
    println!("shadow read failures:   {}", j.shadow_failures);
    println!("validation mismatches:  {}", j.validation_mismatches);
    for failed in &report.failed_writes {
        println!(
            "  failed {} {} ({}) on {}: {}",
            failed.entity, failed.operation, failed.key, failed.store, failed.error
        );
    }
}
