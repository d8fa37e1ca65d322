//! Readyprobe - enterprise readiness assessment of a running web service.

mod render;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use readyprobe_engine::compliance::{builtin_controls, ComplianceCheck, RULESET_VERSION};
use readyprobe_engine::vuln::{builtin_catalog, ExecutionFailurePolicy, SecurityProbe};
use readyprobe_engine::{Orchestrator, ReportStore, RunStatus, SuiteConfig, Verification};
use render::{render_history, render_report, render_stress, ReportFormat};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "readyprobe")]
#[command(
    author,
    version,
    about = "Load, penetration and compliance assessment of a web service"
)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Settings shared by the commands that talk to a target.
#[derive(Args)]
struct SuiteArgs {
    /// Suite configuration file (YAML)
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Base URL of the service under test
    #[arg(long)]
    target: Option<String>,

    /// Comma-separated endpoints for the load phase
    #[arg(long, value_delimiter = ',')]
    endpoints: Option<Vec<String>>,

    /// Virtual users per endpoint
    #[arg(long)]
    concurrency: Option<u32>,

    /// Sequential requests per virtual user
    #[arg(long)]
    requests_per_user: Option<u32>,

    /// Source tree inspected by the compliance phase
    #[arg(long)]
    source: Option<PathBuf>,

    /// Directory for report artifacts
    #[arg(long)]
    reports_dir: Option<PathBuf>,

    /// Score probes that fail to execute as findings
    #[arg(long)]
    fail_closed: bool,
}

impl SuiteArgs {
    fn resolve(self) -> anyhow::Result<SuiteConfig> {
        let mut config = match &self.config {
            Some(path) => SuiteConfig::load(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => SuiteConfig::default(),
        };
        if let Some(target) = self.target {
            config.target = target;
        }
        if let Some(endpoints) = self.endpoints {
            config.load.endpoints = endpoints;
        }
        if let Some(concurrency) = self.concurrency {
            config.load.concurrency = concurrency;
        }
        if let Some(requests) = self.requests_per_user {
            config.load.requests_per_user = requests;
        }
        if let Some(source) = self.source {
            config.compliance.source_root = source;
        }
        if let Some(dir) = self.reports_dir {
            config.reports_dir = dir;
        }
        if self.fail_closed {
            config.failure_policy = ExecutionFailurePolicy::FailClosed;
        }
        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run the load, penetration and compliance phases and persist a report
    Run {
        #[command(flatten)]
        suite: SuiteArgs,

        /// Summary format printed after the run
        #[arg(long, value_enum, default_value = "text")]
        format: ReportFormat,
    },

    /// Repeat the load phase at escalating concurrency tiers
    Stress {
        #[command(flatten)]
        suite: SuiteArgs,

        /// Comma-separated virtual-user tiers
        #[arg(long, value_delimiter = ',')]
        tiers: Option<Vec<u32>>,

        /// Mean error rate (percent) that stops the profile
        #[arg(long)]
        threshold: Option<f64>,

        /// Print the stress report as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the built-in probes and controls
    Catalog,

    /// List persisted runs
    History {
        /// Directory holding report artifacts
        #[arg(long, default_value = "reports")]
        reports_dir: PathBuf,
    },

    /// Render a persisted report
    Show {
        /// Run id, or "latest"
        #[arg(default_value = "latest")]
        run_id: String,

        /// Directory holding report artifacts
        #[arg(long, default_value = "reports")]
        reports_dir: PathBuf,

        #[arg(long, value_enum, default_value = "text")]
        format: ReportFormat,
    },

    /// Check a persisted report against its recorded checksum
    Verify {
        /// Run id, or "latest"
        #[arg(default_value = "latest")]
        run_id: String,

        /// Directory holding report artifacts
        #[arg(long, default_value = "reports")]
        reports_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    match cli.command {
        Commands::Run { suite, format } => {
            let config = suite.resolve()?;
            let mut orchestrator =
                Orchestrator::new(config).context("Failed to create probe client")?;
            let outcome = orchestrator.run_full_suite().await;

            println!("{}", render_report(&outcome.report, format)?);
            match outcome.status {
                RunStatus::Persisted { path } => info!("Report saved to {}", path.display()),
                RunStatus::PersistFailed { error } => {
                    error!("Report was not saved: {}", error);
                    std::process::exit(1);
                }
            }
        }

        Commands::Stress {
            suite,
            tiers,
            threshold,
            json,
        } => {
            let mut config = suite.resolve()?;
            if let Some(tiers) = tiers {
                config.stress.tiers = tiers;
            }
            if let Some(threshold) = threshold {
                config.stress.error_rate_threshold = threshold;
            }
            config.validate().context("Invalid stress profile")?;

            let orchestrator =
                Orchestrator::new(config).context("Failed to create probe client")?;
            let report = orchestrator
                .run_stress_profile()
                .await
                .context("Stress profile failed")?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", render_stress(&report)?);
            }
        }

        Commands::Catalog => {
            let config = SuiteConfig::default();
            println!("Security probes:");
            for probe in builtin_catalog(&config.probes) {
                let definition = probe.definition();
                println!(
                    "  {:<28} {:<15} {:<9} {}",
                    definition.name,
                    definition.category.to_string(),
                    definition.severity.to_string(),
                    definition.description
                );
            }
            println!("\nCompliance controls (ruleset {}):", RULESET_VERSION);
            for control in builtin_controls() {
                let definition = control.definition();
                println!(
                    "  {:<14} {:<6} {}",
                    definition.id,
                    definition.framework.to_string(),
                    definition.name
                );
            }
        }

        Commands::History { reports_dir } => {
            let store = ReportStore::open(&reports_dir)
                .with_context(|| format!("Failed to open {}", reports_dir.display()))?;
            print!("{}", render_history(&store.history()?)?);
        }

        Commands::Show {
            run_id,
            reports_dir,
            format,
        } => {
            let store = ReportStore::open(&reports_dir)
                .with_context(|| format!("Failed to open {}", reports_dir.display()))?;
            let report = store
                .load(&run_id)
                .with_context(|| format!("Failed to load report {}", run_id))?;
            println!("{}", render_report(&report, format)?);
        }

        Commands::Verify {
            run_id,
            reports_dir,
        } => {
            let store = ReportStore::open(&reports_dir)
                .with_context(|| format!("Failed to open {}", reports_dir.display()))?;
            match store.verify(&run_id)? {
                Verification::Intact => println!("{}: intact", run_id),
                Verification::Modified { expected, actual } => {
                    error!(
                        "{} was modified: expected sha256 {}, found {}",
                        run_id, expected, actual
                    );
                    std::process::exit(1);
                }
                Verification::Missing => {
                    error!("{}: artifact is missing", run_id);
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}
