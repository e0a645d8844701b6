//! Configuration file handling.
//!
//! This module handles loading `.finsight.toml` files and merging them
//! with command-line arguments.

use crate::agent::OrchestratorConfig;
use crate::cli::{Args, Command, OutputFormat};
use crate::llm::{ClientConfig, Provider};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".finsight.toml";

/// Report file stem used when no output path is configured.
pub const DEFAULT_REPORT_STEM: &str = "finsight_report";

/// Directory for batch reports when no output path is configured.
pub const DEFAULT_BATCH_DIR: &str = "finsight_reports";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Model backend settings.
    #[serde(default)]
    pub model: ModelConfig,

    /// Agent execution settings.
    #[serde(default)]
    pub agents: AgentsConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Report file, or directory for batches. Derived from the run when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,

    /// Number of documents analysed at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: None,
            verbose: false,
            concurrency: default_concurrency(),
        }
    }
}

fn default_concurrency() -> usize {
    2
}

/// Model backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub provider: Provider,

    /// Model name; the provider's default when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// API base URL; the provider's default when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Environment variable holding the OpenAI API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Key given on the command line; never written to disk.
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            name: None,
            base_url: None,
            timeout_seconds: default_timeout(),
            api_key_env: default_api_key_env(),
            api_key: None,
        }
    }
}

fn default_timeout() -> u64 {
    120
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

impl ModelConfig {
    pub fn model_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| self.provider.default_model().to_string())
    }

    pub fn base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| self.provider.default_base_url().to_string())
    }
}

/// Agent execution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentsConfig {
    /// Characters of document content given to each agent.
    #[serde(default = "default_content_limit")]
    pub content_limit: usize,

    /// Per-agent timeout in seconds. Unbounded when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            content_limit: default_content_limit(),
            timeout_seconds: None,
        }
    }
}

fn default_content_limit() -> usize {
    crate::agent::roles::DEFAULT_CONTENT_LIMIT
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default)]
    pub format: OutputFormat,

    /// Include per-agent sections in Markdown reports.
    #[serde(default = "default_true")]
    pub include_agent_details: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            include_agent_details: true,
        }
    }
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load `.finsight.toml` from `dir`.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let path = dir.join(CONFIG_FILE_NAME);

        if path.exists() {
            Ok(Some(Self::load(&path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// Only values the user actually supplied override the file.
    pub fn merge_with_args(&mut self, args: &Args) {
        if let Some(provider) = args.provider {
            self.model.provider = provider;
        }
        if let Some(ref model) = args.model {
            self.model.name = Some(model.clone());
        }
        if let Some(ref base_url) = args.base_url {
            self.model.base_url = Some(base_url.clone());
        }
        if let Some(timeout) = args.timeout {
            self.model.timeout_seconds = timeout;
        }
        if args.api_key.is_some() {
            self.model.api_key = args.api_key.clone();
        }

        if args.verbose {
            self.general.verbose = true;
        }

        if let Command::Analyze(ref analyze) = args.command {
            if let Some(ref output) = analyze.output {
                self.general.output = Some(output.display().to_string());
            }
            if let Some(concurrency) = analyze.concurrency {
                self.general.concurrency = concurrency;
            }
            if let Some(format) = analyze.format {
                self.report.format = format;
            }
            if let Some(limit) = analyze.content_limit {
                self.agents.content_limit = limit;
            }
            if let Some(timeout) = analyze.agent_timeout {
                self.agents.timeout_seconds = Some(timeout);
            }
            if analyze.no_agent_details {
                self.report.include_agent_details = false;
            }
        }
    }

    /// Where reports for `document_count` documents go.
    ///
    /// Unset output means `finsight_report.<ext>` for one document and the
    /// `finsight_reports` directory for several.
    pub fn output_path(&self, document_count: usize) -> PathBuf {
        match self.general.output {
            Some(ref output) => PathBuf::from(output),
            None if document_count > 1 => PathBuf::from(DEFAULT_BATCH_DIR),
            None => PathBuf::from(format!(
                "{}.{}",
                DEFAULT_REPORT_STEM,
                self.report.format.extension()
            )),
        }
    }

    /// Effective log level. `quiet` wins over a configured or requested verbose mode.
    pub fn log_level(&self, quiet: bool) -> tracing::Level {
        if quiet {
            tracing::Level::ERROR
        } else if self.general.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// Settings for the model client.
    ///
    /// The API key comes from the command line, else from `api_key_env`.
    pub fn client_config(&self) -> ClientConfig {
        let api_key = self
            .model
            .api_key
            .clone()
            .or_else(|| std::env::var(&self.model.api_key_env).ok())
            .filter(|key| !key.is_empty());

        ClientConfig {
            provider: self.model.provider,
            model: self.model.model_name(),
            base_url: self.model.base_url(),
            timeout_seconds: self.model.timeout_seconds,
            api_key,
        }
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            content_limit: self.agents.content_limit,
            agent_timeout: self.agents.timeout_seconds.map(Duration::from_secs),
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
