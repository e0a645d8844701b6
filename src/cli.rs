//! Command-line interface argument parsing.
//!
//! Global flags configure the model backend and logging; subcommands
//! select what to run.

use crate::llm::Provider;
use crate::models::RiskLevel;
use clap::{Args as ClapArgs, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// FinSight - multi-agent financial document analysis
///
/// Runs six specialised AI agents over a financial document and combines
/// their findings into a risk-rated report, or writes narrative financial
/// reports from structured data.
///
/// Examples:
///   finsight analyze statements/q3.txt
///   finsight analyze q1.txt q2.txt --output reports/ --format json
///   finsight --provider openai --model gpt-4o-mini analyze filing.txt --fail-on high
///   finsight report --type investor_memo --data acme.json --output memo.md
///   finsight init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Path to configuration file
    ///
    /// If not specified, looks for .finsight.toml in the current directory
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Model backend
    #[arg(long, value_name = "PROVIDER", global = true)]
    pub provider: Option<Provider>,

    /// Model to use for generation
    #[arg(short, long, env = "FINSIGHT_MODEL", global = true)]
    pub model: Option<String>,

    /// Model API base URL
    #[arg(long, value_name = "URL", env = "FINSIGHT_BASE_URL", global = true)]
    pub base_url: Option<String>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS", global = true)]
    pub timeout: Option<u64>,

    /// API key for the OpenAI-compatible backend
    #[arg(long, value_name = "KEY", env = "FINSIGHT_API_KEY", hide_env_values = true, global = true)]
    pub api_key: Option<String>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Analyse one or more financial documents with all agents
    Analyze(AnalyzeArgs),

    /// Generate a narrative financial report from JSON data
    Report(ReportArgs),

    /// Generate a default .finsight.toml configuration file
    InitConfig,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct AnalyzeArgs {
    /// Text documents to analyse
    #[arg(required = true, value_name = "DOCUMENT")]
    pub documents: Vec<PathBuf>,

    /// Report file, or output directory when several documents are given
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Fail if any document's overall risk is at or above this level
    ///
    /// Useful for CI pipelines. Exit code 2 when the threshold is reached.
    #[arg(long, value_name = "LEVEL")]
    pub fail_on: Option<FailOnLevel>,

    /// Number of documents analysed at once
    #[arg(long, value_name = "NUM")]
    pub concurrency: Option<usize>,

    /// Characters of document content given to each agent
    #[arg(long, value_name = "CHARS")]
    pub content_limit: Option<usize>,

    /// Per-agent timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub agent_timeout: Option<u64>,

    /// Leave per-agent sections out of the Markdown report
    #[arg(long)]
    pub no_agent_details: bool,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ReportArgs {
    /// Report type: investor_memo, audit_summary, board_deck,
    /// compliance_report, risk_report, tax_filing, sec_filing
    #[arg(short = 't', long = "type", value_name = "TYPE")]
    pub report_type: String,

    /// JSON file holding the report data object
    #[arg(short, long, value_name = "FILE")]
    pub data: PathBuf,

    /// Output file (prints to stdout when omitted)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

/// Output format for the analysis report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Markdown => "md",
            OutputFormat::Json => "json",
        }
    }
}

/// Risk level for --fail-on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, clap::ValueEnum)]
pub enum FailOnLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl FailOnLevel {
    pub fn threshold(&self) -> RiskLevel {
        match self {
            FailOnLevel::Low => RiskLevel::Low,
            FailOnLevel::Medium => RiskLevel::Medium,
            FailOnLevel::High => RiskLevel::High,
            FailOnLevel::Critical => RiskLevel::Critical,
        }
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref url) = self.base_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Base URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be at least 1 second".to_string());
        }

        match &self.command {
            Command::Analyze(analyze) => analyze.validate(),
            Command::Report(report) => {
                if !report.data.is_file() {
                    return Err(format!(
                        "Report data file does not exist: {}",
                        report.data.display()
                    ));
                }
                Ok(())
            }
            Command::InitConfig => Ok(()),
        }
    }
}

impl AnalyzeArgs {
    fn validate(&self) -> Result<(), String> {
        if self.concurrency == Some(0) {
            return Err("Concurrency must be at least 1".to_string());
        }
        if self.content_limit == Some(0) {
            return Err("Content limit must be at least 1 character".to_string());
        }
        if self.agent_timeout == Some(0) {
            return Err("Agent timeout must be at least 1 second".to_string());
        }

        for document in &self.documents {
            if !document.is_file() {
                return Err(format!("Document does not exist: {}", document.display()));
            }
        }

        Ok(())
    }
}
