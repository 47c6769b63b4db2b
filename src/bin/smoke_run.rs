use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use smoke_run::engine::{EXIT_FATAL, EXIT_STEP_FAILED};
use smoke_run::prelude::*;
use tracing_subscriber::EnvFilter;
#[cfg(feature = "otel")]
use tracing_subscriber::layer::SubscriberExt;
#[cfg(feature = "otel")]
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "smoke-run")]
#[command(about = "Smoke-test every operation of the instantly CLI", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the smoke plan against the live backend
    Run(RunArgs),

    /// Print the smoke plan without running anything
    Plan {
        /// Only show stages whose name starts with this prefix
        #[arg(short = 'F', long)]
        filter: Option<String>,

        /// Print the plan as YAML
        #[arg(long)]
        yaml: bool,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Target CLI binary (overrides BIN)
    #[arg(short, long)]
    bin: Option<String>,

    /// Report destination (overrides SMOKE_REPORT)
    #[arg(short, long)]
    report: Option<PathBuf>,

    /// Per-invocation timeout in seconds
    #[arg(short, long)]
    timeout: Option<u64>,

    /// Path to a YAML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Only run stages whose name starts with this prefix
    #[arg(short = 'F', long)]
    filter: Option<String>,
}

#[cfg(feature = "otel")]
fn init_otel_tracing(verbose: bool) -> anyhow::Result<()> {
    use opentelemetry::trace::TracerProvider as _;
    use opentelemetry_otlp::WithExportConfig;
    use opentelemetry_sdk::runtime::Tokio;
    use opentelemetry_sdk::trace::TracerProvider;

    let otlp_endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
        .unwrap_or_else(|_| "http://localhost:4317".to_string());

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&otlp_endpoint)
        .build()?;

    let provider = TracerProvider::builder()
        .with_batch_exporter(exporter, Tokio)
        .build();

    let tracer = provider.tracer("smoke-run");
    let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);

    tracing_subscriber::registry()
        .with(EnvFilter::new(log_filter(verbose)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(otel_layer)
        .init();

    opentelemetry::global::set_tracer_provider(provider);
    Ok(())
}

fn log_filter(verbose: bool) -> &'static str {
    if verbose {
        "smoke_run=debug"
    } else {
        "smoke_run=info"
    }
}

/// Logs go to stderr; stdout carries only the summary line.
fn init_tracing(verbose: bool) {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(log_filter(verbose)))
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    #[cfg(feature = "otel")]
    if let Err(e) = init_otel_tracing(cli.verbose) {
        eprintln!("OTLP exporter unavailable, logging locally: {}", e);
        init_tracing(cli.verbose);
    }

    #[cfg(not(feature = "otel"))]
    init_tracing(cli.verbose);

    let result = run(cli).await;

    #[cfg(feature = "otel")]
    opentelemetry::global::shutdown_tracer_provider();

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!(error = %e, "Smoke run aborted");
            let code = e
                .downcast_ref::<HarnessError>()
                .map(HarnessError::exit_code)
                .unwrap_or(EXIT_FATAL);
            ExitCode::from(code)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<u8> {
    match cli.command {
        Commands::Run(args) => run_smoke(args).await,
        Commands::Plan { filter, yaml } => print_plan(filter.as_deref(), yaml),
    }
}

async fn run_smoke(args: RunArgs) -> anyhow::Result<u8> {
    let env = process_env();
    let overrides = Overrides {
        bin: args.bin,
        report_path: args.report,
        timeout_secs: args.timeout,
        filter: args.filter,
    };
    let config = HarnessConfig::resolve(args.config.as_deref(), &env, overrides)?;

    precheck(&config, &env)?;
    let binary = config.resolve_binary()?;

    let runner = ProcessRunner::new(&binary)
        .env(config.child_env_os(std::env::vars_os()))
        .timeout(config.timeout());

    let report = execute(&config, &env, runner, catalog::instantly()).await?;
    println!("{}", report.summary_line(&config.report_path)?);

    if report.exit_code() == EXIT_STEP_FAILED {
        tracing::warn!(
            failed = report.counts.failed,
            report = %config.report_path.display(),
            "Some steps failed"
        );
    }
    Ok(report.exit_code())
}

fn print_plan(filter: Option<&str>, yaml: bool) -> anyhow::Result<u8> {
    let plan = catalog::instantly();
    plan.validate()
        .map_err(HarnessError::from)?;

    let selected = Plan::new(
        plan.stages
            .into_iter()
            .filter(|stage| stage.matches(filter))
            .collect(),
    );

    if yaml {
        print!("{}", serde_yaml::to_string(&selected)?);
        return Ok(0);
    }

    for (stage, step) in selected.steps() {
        let marker = if step.deferred { " (deferred)" } else { "" };
        println!(
            "{}\t{}\t{}{}\t{}",
            stage.name,
            step.name(),
            step.operation.mode().as_str(),
            marker,
            step.operation.argv.join(" ")
        );
    }
    Ok(0)
}

/// Process environment for config and credential lookups.
///
/// Entries that are not valid UTF-8 are left out here; the child receives
/// the raw environment through [`HarnessConfig::child_env_os`].
fn process_env() -> BTreeMap<String, String> {
    std::env::vars_os()
        .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
        .collect()
}
