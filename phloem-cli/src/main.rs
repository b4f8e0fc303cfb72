use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use phloem_core::run_benchmark;
use phloem_transport::{tcp_endpoint, zmq, ZmqPull, ZmqPush};
use schemars::schema_for;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use phloem_cli::config::ProfileConfig;
use phloem_cli::lists;
use phloem_cli::output::ExperimentResults;

/// Phloem: round-trip latency benchmark for push/pull decision endpoints
///
/// Phloem binds a PUSH socket for requests and a PULL socket for replies,
/// sends synthetic `[id][domain][ip]` requests at a fixed rate, matches each
/// `[id][score][category]` reply to its request and reports percentiles.
///
/// Example usage:
///   phloem run -P profiles/local.toml
///   phloem run -P profiles/local.toml --set workload.rate=500 --set experiment.duration=30s
///   phloem completions bash > ~/.local/share/bash-completion/completions/phloem
#[derive(Parser)]
#[command(name = "phloem")]
#[command(version, about = "Round-trip latency benchmark over push/pull sockets", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, default_value = "info", global = true)]
    log_level: String,

    /// Verbose output (same as --log-level debug)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a latency measurement
    Run {
        /// Path to TOML profile configuration file
        #[arg(short = 'P', long, required = true)]
        profile: PathBuf,

        /// Override any configuration value using dot notation (repeatable)
        ///
        /// Examples:
        ///   --set target.send_port=6000
        ///   --set workload.rate=250
        ///   --set experiment.seed=7
        ///   --set drain.timeout=5s
        #[arg(long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,
    },

    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Generate JSON Schema for profile files
    Schema,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug".to_string() } else { cli.log_level.clone() };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| level.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "phloem", &mut io::stdout());
            Ok(())
        }
        Commands::Schema => {
            let schema = schema_for!(ProfileConfig);
            println!("{}", serde_json::to_string_pretty(&schema)?);
            Ok(())
        }
        Commands::Run { profile, set } => run_experiment(profile, set),
    }
}

fn run_experiment(profile: PathBuf, set: Vec<String>) -> anyhow::Result<()> {
    tracing::info!("Loading profile: {}", profile.display());

    let config = if set.is_empty() {
        let config = ProfileConfig::from_file(&profile)?;
        config.validate()?;
        config
    } else {
        ProfileConfig::from_file_with_overrides(&profile, &set)?
    };

    tracing::info!("=== Experiment Configuration ===");
    tracing::info!("Name: {}", config.experiment.name);
    if let Some(desc) = &config.experiment.description {
        tracing::info!("Description: {}", desc);
    }
    if let Some(seed) = config.experiment.seed {
        tracing::info!("Seed: {} (reproducible mode)", seed);
    }
    tracing::info!("Duration: {:?}", config.experiment.duration);
    tracing::info!("Rate: {} req/s", config.workload.rate);
    tracing::info!("Drain timeout: {:?}", config.drain.timeout);
    tracing::info!("================================");

    // Lists and sockets are prerequisites; any failure here is fatal
    let pool = lists::load_pool(&config.workload.domains, &config.workload.ips)?;

    let ctx = zmq::Context::new();
    let options = config.channel_options();
    let push = ZmqPush::bind(
        &ctx,
        &tcp_endpoint(&config.target.address, config.target.send_port),
        &options,
    )
    .context("Cannot bind request socket")?;
    let pull = ZmqPull::bind(
        &ctx,
        &tcp_endpoint(&config.target.address, config.target.receive_port),
        &options,
    )
    .context("Cannot bind reply socket")?;

    let send_endpoint = push.bound_endpoint().to_string();
    let receive_endpoint = pull.bound_endpoint().to_string();
    tracing::info!("Requests on {}, replies on {}", send_endpoint, receive_endpoint);

    let outcome = run_benchmark(&config.benchmark_config(), pool, push, pull)?;

    let results = ExperimentResults::from_outcome(
        config.experiment.name.clone(),
        send_endpoint,
        receive_endpoint,
        config.workload.rate,
        &outcome,
    );
    results.print_human();

    if config.output.format == "json" {
        if let Some(file) = &config.output.file {
            results.write_json(file)?;
            tracing::info!("Results written to: {}", file.display());
        }
    }

    Ok(())
}
