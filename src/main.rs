//! FinSight - multi-agent financial document analysis
//!
//! A CLI tool that runs six specialised AI agents concurrently over a
//! financial document, aggregates their findings into a risk-rated report,
//! and generates narrative financial reports from structured data.
//!
//! Exit codes:
//!   0 - Success (risk below threshold, or no --fail-on set)
//!   1 - Runtime error (connection, config, unreadable input, etc.)
//!   2 - A document's overall risk reached the --fail-on threshold

mod agent;
mod analysis;
mod cli;
mod config;
mod error;
mod llm;
mod models;
mod report;

use agent::{Orchestrator, SourceDocument};
use analysis::{failed_agents, severity_breakdown};
use anyhow::{bail, Context, Result};
use chrono::Utc;
use cli::{AnalyzeArgs, Args, Command, OutputFormat, ReportArgs};
use config::{Config, CONFIG_FILE_NAME};
use indicatif::{ProgressBar, ProgressStyle};
use models::{DocumentReport, ReportMetadata};
use report::ReportGenerator;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // No logging needed to write a config file
    if let Command::InitConfig = args.command {
        return handle_init_config();
    }

    // Config comes first so its verbose setting reaches the subscriber
    let (mut config, source) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    init_logging(config.log_level(args.quiet));

    info!("FinSight v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    source.log();

    match run(args, config).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Run failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle `init-config`: generate a default .finsight.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to choose the model provider, agent limits and report format.");
    Ok(())
}

/// Initialize logging. `RUST_LOG` overrides the verbosity flags.
fn init_logging(level: tracing::Level) {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

async fn run(args: Args, config: Config) -> Result<i32> {
    match args.command {
        Command::Analyze(ref analyze) => run_analysis(&config, analyze, args.quiet).await,
        Command::Report(ref report) => run_report(&config, report, args.quiet).await,
        Command::InitConfig => Ok(0),
    }
}

/// Run every agent over each document and write the reports. Returns exit code (0 or 2).
async fn run_analysis(config: &Config, args: &AnalyzeArgs, quiet: bool) -> Result<i32> {
    let start_time = Instant::now();

    let documents = args
        .documents
        .iter()
        .map(|path| read_document(path))
        .collect::<Result<Vec<_>>>()?;

    let output = config.output_path(documents.len());
    prepare_output(&output, documents.len())?;
    let paths = output_paths(&output, &documents, config.report.format);

    let client = llm::build_client(&config.client_config())?;
    let orchestrator = Orchestrator::new(client, config.orchestrator_config());

    println!("🤖 Running financial analysis agents...");
    println!("   Model: {}", orchestrator.model_name());
    println!("   Documents: {}", documents.len());
    if let Some(timeout) = config.agents.timeout_seconds {
        println!("   Agent timeout: {}s", timeout);
    }

    let spinner = spinner(
        quiet,
        format!("Analysing {} document(s) with 6 agents", documents.len()),
    );
    let results = orchestrator
        .orchestrate_many(&documents, config.general.concurrency)
        .await;
    spinner.finish_and_clear();

    let mut reports = Vec::with_capacity(documents.len());
    let mut failures = 0;

    for ((document, result), path) in documents.iter().zip(results).zip(paths) {
        let analysis = match result {
            Ok(analysis) => analysis,
            Err(e) => {
                error!("Analysis of {} failed: {}", document.file_name, e);
                eprintln!("\n❌ {}: {}", document.file_name, e);
                failures += 1;
                continue;
            }
        };

        let report = DocumentReport {
            metadata: ReportMetadata {
                file_name: document.file_name.clone(),
                analysis_date: Utc::now(),
                model_used: orchestrator.model_name().to_string(),
                agents_failed: failed_agents(&analysis.agent_results).len(),
            },
            analysis,
        };

        let rendered = match config.report.format {
            OutputFormat::Json => report::generate_json_report(&report)?,
            OutputFormat::Markdown => {
                report::generate_markdown_report(&report, config.report.include_agent_details)
            }
        };

        std::fs::write(&path, &rendered)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;

        print_summary(&report, &path);
        reports.push(report);
    }

    println!("\n   Duration: {:.1}s", start_time.elapsed().as_secs_f64());

    if failures > 0 {
        bail!("{} of {} document analyses failed", failures, documents.len());
    }

    println!("\n✅ Analysis complete!");

    if let Some(fail_level) = args.fail_on {
        let threshold = fail_level.threshold();
        if reports.iter().any(|r| r.analysis.overall_risk >= threshold) {
            eprintln!(
                "\n⛔ Overall risk at or above {}. Failing (exit code 2).",
                threshold
            );
            return Ok(2);
        }
    }

    Ok(0)
}

/// Generate one narrative report.
async fn run_report(config: &Config, args: &ReportArgs, quiet: bool) -> Result<i32> {
    let raw = std::fs::read_to_string(&args.data)
        .with_context(|| format!("Failed to read report data {}", args.data.display()))?;
    let data: serde_json::Value = serde_json::from_str(&raw)
        .with_context(|| format!("Report data is not valid JSON: {}", args.data.display()))?;

    let client = llm::build_client(&config.client_config())?;
    let generator = ReportGenerator::new(client);

    let spinner = spinner(quiet, format!("Writing {}", args.report_type));
    let result = generator.generate(&args.report_type, &data).await;
    spinner.finish_and_clear();
    let generated = result?;

    match args.output {
        Some(ref path) => {
            std::fs::write(path, &generated.content)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            println!(
                "✅ {} generated at {} and saved to: {}",
                generated.report_type,
                generated.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
                path.display()
            );
        }
        None => println!("{}", generated.content),
    }

    Ok(0)
}

fn read_document(path: &Path) -> Result<SourceDocument> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read document {}", path.display()))?;

    if content.trim().is_empty() {
        warn!("Document {} is empty", path.display());
    }

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    Ok(SourceDocument { file_name, content })
}

/// Make sure reports can be written to `output` before any model call.
///
/// Batches need `output` to be a directory; a single report needs it to be
/// a file path whose parent exists.
fn prepare_output(output: &Path, document_count: usize) -> Result<()> {
    if document_count > 1 {
        if output.is_file() {
            bail!(
                "Output path {} is a file; several documents need a directory",
                output.display()
            );
        }
        std::fs::create_dir_all(output)
            .with_context(|| format!("Failed to create output directory {}", output.display()))?;
        return Ok(());
    }

    if output.is_dir() {
        bail!("Output path {} is a directory; expected a report file", output.display());
    }
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory {}", parent.display()))?;
    }

    Ok(())
}

/// Where each document's report goes: `output` itself for a single
/// document, else `<output>/<stem>.<ext>` with clashing stems numbered.
fn output_paths(output: &Path, documents: &[SourceDocument], format: OutputFormat) -> Vec<PathBuf> {
    if documents.len() == 1 {
        return vec![output.to_path_buf()];
    }

    let mut used = HashSet::new();
    documents
        .iter()
        .map(|doc| {
            let stem = Path::new(&doc.file_name)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "document".to_string());

            let mut name = stem.clone();
            let mut n = 2;
            while !used.insert(name.clone()) {
                name = format!("{}-{}", stem, n);
                n += 1;
            }

            output.join(format!("{}.{}", name, format.extension()))
        })
        .collect()
}

fn spinner(quiet: bool, message: String) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

fn print_summary(report: &DocumentReport, path: &Path) {
    let analysis = &report.analysis;
    let breakdown = severity_breakdown(&analysis.agent_results);

    println!("\n📊 {}:", report.metadata.file_name);
    println!(
        "   Overall risk: {} {}",
        analysis.overall_risk.emoji(),
        analysis.overall_risk
    );
    println!(
        "   Findings: {} (🔴 {} | 🟠 {} | 🟡 {} | 🟢 {})",
        breakdown.total, breakdown.critical, breakdown.high, breakdown.medium, breakdown.low
    );
    if report.metadata.agents_failed > 0 {
        println!("   ⚠️  {} agent(s) failed", report.metadata.agents_failed);
    }
    println!("   Report saved to: {}", path.display());
}

/// Where the configuration came from, logged once the subscriber is up.
enum ConfigSource {
    Explicit(PathBuf),
    Default,
    BuiltIn,
    Invalid(anyhow::Error),
}

impl ConfigSource {
    fn log(&self) {
        match self {
            ConfigSource::Explicit(path) => info!("Loaded config from: {}", path.display()),
            ConfigSource::Default => info!("Loaded default config from {}", CONFIG_FILE_NAME),
            ConfigSource::BuiltIn => debug!("No config file found, using defaults"),
            ConfigSource::Invalid(e) => warn!("Failed to load config: {:#}", e),
        }
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<(Config, ConfigSource)> {
    if let Some(ref config_path) = args.config {
        let config = Config::load(config_path)?;
        return Ok((config, ConfigSource::Explicit(config_path.clone())));
    }

    Ok(match Config::load_default() {
        Ok(Some(config)) => (config, ConfigSource::Default),
        Ok(None) => (Config::default(), ConfigSource::BuiltIn),
        Err(e) => (Config::default(), ConfigSource::Invalid(e)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(name: &str) -> SourceDocument {
        SourceDocument {
            file_name: name.to_string(),
            content: String::new(),
        }
    }

    #[test]
    fn test_single_document_uses_output_file() {
        let paths = output_paths(Path::new("out.md"), &[doc("q3.txt")], OutputFormat::Markdown);
        assert_eq!(paths, vec![PathBuf::from("out.md")]);
    }

    #[test]
    fn test_many_documents_go_into_directory() {
        let paths = output_paths(
            Path::new("reports"),
            &[doc("q1.txt"), doc("q2.txt"), doc("q1.csv")],
            OutputFormat::Json,
        );
        assert_eq!(
            paths,
            vec![
                PathBuf::from("reports/q1.json"),
                PathBuf::from("reports/q2.json"),
                PathBuf::from("reports/q1-2.json"),
            ]
        );
    }

    #[test]
    fn test_batch_default_output_is_a_directory() {
        let config = Config::default();
        let documents = [doc("q1.txt"), doc("q2.txt")];

        let paths = output_paths(
            &config.output_path(documents.len()),
            &documents,
            config.report.format,
        );
        assert_eq!(
            paths,
            vec![
                PathBuf::from("finsight_reports/q1.md"),
                PathBuf::from("finsight_reports/q2.md"),
            ]
        );
    }

    #[test]
    fn test_prepare_output_checks_location() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("existing.md");
        std::fs::write(&file, "old report").unwrap();

        assert!(prepare_output(&file, 2).is_err());
        assert!(prepare_output(dir.path(), 1).is_err());

        let batch_dir = dir.path().join("reports");
        prepare_output(&batch_dir, 2).unwrap();
        assert!(batch_dir.is_dir());

        let nested = dir.path().join("out").join("q3.json");
        prepare_output(&nested, 1).unwrap();
        assert!(nested.parent().unwrap().is_dir());
        assert!(!nested.exists());
    }

    #[tokio::test]
    async fn test_unknown_report_type_fails_before_generation() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("data.json");
        std::fs::write(&data, "{}").unwrap();
        let output = dir.path().join("memo.md");

        let args = ReportArgs {
            report_type: "quarterly_letter".to_string(),
            data,
            output: Some(output.clone()),
        };

        let err = run_report(&Config::default(), &args, true).await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<error::ReportError>(),
            Some(error::ReportError::InvalidReportType(t)) if t == "quarterly_letter"
        ));
        assert!(!output.exists());
    }

    #[test]
    fn test_read_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("statement.txt");
        std::fs::write(&path, "Revenue: $1.2M").unwrap();

        let document = read_document(&path).unwrap();
        assert_eq!(document.file_name, "statement.txt");
        assert_eq!(document.content, "Revenue: $1.2M");

        assert!(read_document(&dir.path().join("missing.txt")).is_err());
    }
}
