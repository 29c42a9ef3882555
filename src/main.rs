use anyhow::{Context, Result};
use biomed_screen::config::{load_or_default, Config};
use biomed_screen::input::read_identifiers;
use biomed_screen::models::normalize;
use biomed_screen::output::write_report;
use biomed_screen::ui::{self, ScreeningProgress, Status};
use biomed_screen::utils::HttpClient;
use biomed_screen::{Classifier, Pipeline, SourceSet};
use clap::{Parser, Subcommand, ValueEnum};
use std::collections::HashSet;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// biomed-screen - Screen biomedical papers for original research and animal studies
#[derive(Parser, Debug)]
#[command(name = "biomed-screen")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Screen biomedical papers by DOI using OpenAlex, Crossref and PubMed metadata", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (-v for debug, -vv for trace)
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for printed records
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Table if stdout is a terminal, JSON otherwise
    Auto,
    /// Table format (human-readable)
    Table,
    /// JSON format (machine-readable)
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Screen every identifier in a file and write the report
    Run {
        /// Text file with one DOI per line, or a CSV file
        input: PathBuf,

        /// CSV column holding the DOIs
        #[arg(long, default_value = biomed_screen::input::DEFAULT_COLUMN)]
        column: String,

        /// Directory for the report files
        #[arg(long, short, default_value = "screening-results")]
        output: PathBuf,

        /// Only screen the first N identifiers
        #[arg(long)]
        limit: Option<usize>,

        /// Contact email sent to the APIs (polite pool)
        #[arg(long)]
        email: Option<String>,

        /// Papers processed at the same time
        #[arg(long)]
        concurrency: Option<usize>,

        /// Also write the full records as records.json
        #[arg(long)]
        json: bool,
    },

    /// Screen DOIs given on the command line and print the results
    Classify {
        /// One or more DOIs
        #[arg(required = true)]
        dois: Vec<String>,

        /// Contact email sent to the APIs (polite pool)
        #[arg(long)]
        email: Option<String>,

        /// Output format
        #[arg(long, short, value_enum, default_value_t = OutputFormat::Auto)]
        format: OutputFormat,
    },

    /// Validate the identifiers in a file without any network access
    Check {
        /// Text file with one DOI per line, or a CSV file
        input: PathBuf,

        /// CSV column holding the DOIs
        #[arg(long, default_value = biomed_screen::input::DEFAULT_COLUMN)]
        column: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = load_or_default(cli.config.as_deref()).context("Failed to load configuration")?;
    init_tracing(&cli, &config)?;

    match cli.command {
        Commands::Run {
            input,
            column,
            output,
            limit,
            email,
            concurrency,
            json,
        } => {
            apply_overrides(&mut config, email, concurrency)?;
            let mut ids = read_identifiers(&input, Some(&column))
                .with_context(|| format!("Failed to read identifiers from {}", input.display()))?;
            if let Some(limit) = limit {
                ids.truncate(limit);
                tracing::info!(limit, "Sample mode: screening the first {} identifiers", ids.len());
            }
            run(&config, &ids, &output, json, cli.quiet).await
        }
        Commands::Classify {
            dois,
            email,
            format,
        } => {
            apply_overrides(&mut config, email, None)?;
            classify(&config, &dois, format).await
        }
        Commands::Check { input, column } => check(&input, &column, cli.quiet),
    }
}

fn init_tracing(cli: &Cli, config: &Config) -> Result<()> {
    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let env_filter = if cli.quiet { "error" } else { log_level };

    let file_layer = match &config.logging.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("biomed_screen={}", env_filter)),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();
    Ok(())
}

fn apply_overrides(config: &mut Config, email: Option<String>, concurrency: Option<usize>) -> Result<()> {
    if email.is_some() {
        config.http.contact_email = email;
    }
    if let Some(concurrency) = concurrency {
        config.pipeline.concurrency = concurrency;
    }
    config.validate().context("Invalid command-line options")?;
    Ok(())
}

/// Build the pipeline with one cancellation token shared by the HTTP client
/// and the scheduler, cancelled on Ctrl-C
fn build_pipeline(config: &Config) -> Result<Pipeline> {
    let cancel = CancellationToken::new();
    let client = HttpClient::with_cancellation(config.http_client_config(), cancel.clone())
        .context("Failed to create HTTP client")?;
    let sources = SourceSet::standard(Arc::new(client), config);

    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted; stopping new requests and keeping completed papers");
            signal_token.cancel();
        }
    });

    Ok(Pipeline::new(sources, Classifier::default(), &config.pipeline).with_cancellation(cancel))
}

async fn run(config: &Config, ids: &[String], output: &Path, json: bool, quiet: bool) -> Result<()> {
    let pipeline = build_pipeline(config)?;

    let progress = ScreeningProgress::new(ids.len());
    let records = pipeline
        .run_with_progress(ids, |record| {
            if !quiet {
                progress.record(record);
            }
        })
        .await;
    let cancelled = pipeline.cancellation().is_cancelled();
    progress.finish(if cancelled { "Interrupted" } else { "Done" });

    let summary = write_report(&records, output, json)
        .with_context(|| format!("Failed to write report to {}", output.display()))?;

    if !quiet {
        ui::print_section("Summary");
        println!("{}", ui::summary_table(&summary));
        if cancelled {
            ui::print_status(
                Status::Warning,
                &format!("Run interrupted: {} of {} papers screened", records.len(), ids.len()),
            );
        }
        ui::print_status(
            Status::Success,
            &format!("Report written to {}", output.display()),
        );
    }
    Ok(())
}

async fn classify(config: &Config, dois: &[String], format: OutputFormat) -> Result<()> {
    let pipeline = build_pipeline(config)?;
    let records = pipeline.run(dois).await;

    let format = match format {
        OutputFormat::Auto if ui::is_terminal() => OutputFormat::Table,
        OutputFormat::Auto => OutputFormat::Json,
        other => other,
    };

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else {
        println!("{}", ui::records_table(&records));
        for record in &records {
            println!();
            ui::print_evidence(record);
        }
    }
    Ok(())
}

fn check(input: &Path, column: &str, quiet: bool) -> Result<()> {
    let ids = read_identifiers(input, Some(column))
        .with_context(|| format!("Failed to read identifiers from {}", input.display()))?;

    let mut seen = HashSet::new();
    let mut duplicates = 0;
    let mut invalid = Vec::new();
    for (line, raw) in ids.iter().enumerate() {
        match normalize(raw) {
            Ok(id) => {
                if !seen.insert(id) {
                    duplicates += 1;
                }
            }
            Err(err) => invalid.push((line + 1, err)),
        }
    }

    if !quiet {
        for (entry, err) in &invalid {
            ui::print_status(Status::Error, &format!("#{}: {}", entry, err));
        }
        ui::print_status(
            Status::Info,
            &format!(
                "{} identifiers: {} unique valid, {} duplicates, {} invalid",
                ids.len(),
                seen.len(),
                duplicates,
                invalid.len()
            ),
        );
        if invalid.is_empty() {
            ui::print_status(Status::Success, "All identifiers are valid DOIs");
        }
    }
    Ok(())
}
