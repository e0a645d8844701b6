//! Data models for the document analysis pipeline.
//!
//! This module contains the core data structures shared by the agents,
//! the orchestrator, the aggregator and the report renderers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use uuid::Uuid;

/// The six fixed analysis agents, in registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentType {
    Parser,
    Analyzer,
    Compliance,
    Fraud,
    Alert,
    Insight,
}

impl AgentType {
    /// All agents in the order their results appear in a report.
    pub const ALL: [AgentType; 6] = [
        AgentType::Parser,
        AgentType::Analyzer,
        AgentType::Compliance,
        AgentType::Fraud,
        AgentType::Alert,
        AgentType::Insight,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentType::Parser => "parser",
            AgentType::Analyzer => "analyzer",
            AgentType::Compliance => "compliance",
            AgentType::Fraud => "fraud",
            AgentType::Alert => "alert",
            AgentType::Insight => "insight",
        }
    }

    /// Human-readable role name, used in prompts and report headings.
    pub fn title(&self) -> &'static str {
        match self {
            AgentType::Parser => "Document Parser Agent",
            AgentType::Analyzer => "Financial Analyzer Agent",
            AgentType::Compliance => "Compliance Agent",
            AgentType::Fraud => "Fraud Detection Agent",
            AgentType::Alert => "Alert Agent",
            AgentType::Insight => "Insight Agent",
        }
    }
}

impl fmt::Display for AgentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Severity attached to a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational, no risk contribution
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "Info"),
            Severity::Low => write!(f, "Low"),
            Severity::Medium => write!(f, "Medium"),
            Severity::High => write!(f, "High"),
            Severity::Critical => write!(f, "Critical"),
        }
    }
}

impl Severity {
    /// Parse a model-provided label, ignoring case and surrounding whitespace.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "info" => Some(Severity::Info),
            "low" => Some(Severity::Low),
            "medium" => Some(Severity::Medium),
            "high" => Some(Severity::High),
            "critical" => Some(Severity::Critical),
            _ => None,
        }
    }

    /// Numeric contribution to the overall risk average.
    pub fn score(&self) -> u32 {
        match self {
            Severity::Info => 0,
            Severity::Low => 25,
            Severity::Medium => 50,
            Severity::High => 75,
            Severity::Critical => 100,
        }
    }

    /// Returns an emoji representation of the severity.
    pub fn emoji(&self) -> &'static str {
        match self {
            Severity::Info => "🔵",
            Severity::Low => "🟢",
            Severity::Medium => "🟡",
            Severity::High => "🟠",
            Severity::Critical => "🔴",
        }
    }
}

/// Overall risk classification of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    #[serde(rename = "Low Risk")]
    Low,
    #[serde(rename = "Medium Risk")]
    Medium,
    #[serde(rename = "High Risk")]
    High,
    #[serde(rename = "Critical Risk")]
    Critical,
}

impl RiskLevel {
    /// Bucket an average severity score. Lower bounds are inclusive.
    pub fn from_average(avg: f64) -> Self {
        if avg >= 75.0 {
            RiskLevel::Critical
        } else if avg >= 50.0 {
            RiskLevel::High
        } else if avg >= 25.0 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low Risk",
            RiskLevel::Medium => "Medium Risk",
            RiskLevel::High => "High Risk",
            RiskLevel::Critical => "Critical Risk",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            RiskLevel::Low => "🟢",
            RiskLevel::Medium => "🟡",
            RiskLevel::High => "🟠",
            RiskLevel::Critical => "🔴",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Lenient field decoders for model-generated payloads.
mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    /// Strings pass through, `null` is absent, anything else is kept as compact JSON.
    pub fn text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::Null => None,
            Value::String(s) => Some(s),
            other => Some(other.to_string()),
        })
    }

    /// Numbers or numeric strings, clamped to [0, 1]. Anything else is 0.
    pub fn confidence<'de, D>(deserializer: D) -> Result<f64, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(super::clamp_confidence(&Value::deserialize(deserializer)?))
    }
}

/// Read a confidence value the way the models tend to emit it.
pub fn clamp_confidence(value: &Value) -> f64 {
    let raw = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    if raw.is_finite() {
        raw.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Fields shared by every finding regardless of which agent produced it.
#[derive(Debug, Deserialize)]
struct FindingBase {
    #[serde(rename = "type", default, deserialize_with = "lenient::text")]
    kind: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    content: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    description: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    insight: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    severity: Option<String>,
    #[serde(default, deserialize_with = "lenient::confidence")]
    confidence: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParserDetail {}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerDetail {
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub metric: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    /// up, down or stable
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub trend: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComplianceDetail {
    /// One of IFRS, GAAP, SOX, SEBI, ESG.
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub regulation: Option<String>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FraudDetail {
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertDetail {
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub action_required: Option<String>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub deadline: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InsightDetail {
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
}

/// Role-specific fields of a finding, keyed by the agent that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FindingDetail {
    Parser(ParserDetail),
    Analyzer(AnalyzerDetail),
    Compliance(ComplianceDetail),
    Fraud(FraudDetail),
    Alert(AlertDetail),
    Insight(InsightDetail),
}

impl FindingDetail {
    fn from_value(agent_type: AgentType, value: &Value) -> Result<Self, serde_json::Error> {
        Ok(match agent_type {
            AgentType::Parser => FindingDetail::Parser(ParserDetail::default()),
            AgentType::Analyzer => FindingDetail::Analyzer(AnalyzerDetail::deserialize(value)?),
            AgentType::Compliance => {
                FindingDetail::Compliance(ComplianceDetail::deserialize(value)?)
            }
            AgentType::Fraud => FindingDetail::Fraud(FraudDetail::deserialize(value)?),
            AgentType::Alert => FindingDetail::Alert(AlertDetail::deserialize(value)?),
            AgentType::Insight => FindingDetail::Insight(InsightDetail::deserialize(value)?),
        })
    }
}

/// One atomic observation produced by an agent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentFinding {
    /// Free-form category label (`type` on the wire).
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insight: Option<String>,
    /// Raw severity label as the model produced it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    pub confidence: f64,
    #[serde(flatten)]
    pub detail: FindingDetail,
}

impl AgentFinding {
    /// Decode one finding object emitted by `agent_type`.
    pub fn from_value(agent_type: AgentType, value: &Value) -> Result<Self, serde_json::Error> {
        let base = FindingBase::deserialize(value)?;
        let detail = FindingDetail::from_value(agent_type, value)?;

        Ok(Self {
            kind: base.kind,
            content: base.content,
            description: base.description,
            insight: base.insight,
            severity: base.severity,
            confidence: base.confidence,
            detail,
        })
    }

    /// Risk weight of this finding.
    ///
    /// A missing severity counts as info; an unrecognised label yields `None`
    /// and is left out of the risk average entirely.
    pub fn risk_score(&self) -> Option<u32> {
        match self.severity.as_deref() {
            None => Some(Severity::Info.score()),
            Some(label) => Severity::from_label(label).map(|s| s.score()),
        }
    }

    /// Parsed severity, if the label is one we know.
    pub fn severity_level(&self) -> Option<Severity> {
        self.severity.as_deref().and_then(Severity::from_label)
    }

    /// Text to show for this finding: `content`, then `description`, then `insight`.
    pub fn display_text(&self) -> Option<&str> {
        [
            self.content.as_deref(),
            self.description.as_deref(),
            self.insight.as_deref(),
        ]
        .into_iter()
        .flatten()
        .find(|text| !text.is_empty())
    }

    /// Whether the insight agent tagged this finding as a recommendation.
    pub fn is_recommendation(&self) -> bool {
        self.kind.as_deref() == Some("recommendation")
    }
}

/// Normalized envelope returned by every agent execution, win or fail.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentResult {
    pub agent_type: AgentType,
    pub findings: Vec<AgentFinding>,
    pub confidence: f64,
    pub processing_time_ms: u64,
    pub metadata: Map<String, Value>,
}

impl AgentResult {
    /// Placeholder recorded when an agent fails.
    pub fn degraded(agent_type: AgentType, error: impl Into<String>, processing_time_ms: u64) -> Self {
        let mut metadata = Map::new();
        metadata.insert("error".to_string(), Value::String(error.into()));

        Self {
            agent_type,
            findings: Vec::new(),
            confidence: 0.0,
            processing_time_ms,
            metadata,
        }
    }

    /// Failure message, present only on degraded results.
    pub fn error(&self) -> Option<&str> {
        self.metadata.get("error").and_then(Value::as_str)
    }

    pub fn is_degraded(&self) -> bool {
        self.metadata.contains_key("error")
    }
}

/// The orchestrator's final output for one document.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub task_id: Uuid,
    pub agent_results: Vec<AgentResult>,
    pub overall_risk: RiskLevel,
    pub key_findings: Vec<String>,
    pub recommendations: Vec<String>,
    pub execution_time_ms: u64,
}

/// Counts of findings per severity bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeverityBreakdown {
    pub total: usize,
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    /// Includes findings without a severity label.
    pub info: usize,
    /// Findings whose severity label was not recognised.
    pub unrated: usize,
}

impl SeverityBreakdown {
    pub fn record(&mut self, finding: &AgentFinding) {
        self.total += 1;
        match (finding.severity.as_deref(), finding.severity_level()) {
            (None, _) | (_, Some(Severity::Info)) => self.info += 1,
            (_, Some(Severity::Low)) => self.low += 1,
            (_, Some(Severity::Medium)) => self.medium += 1,
            (_, Some(Severity::High)) => self.high += 1,
            (_, Some(Severity::Critical)) => self.critical += 1,
            (Some(_), None) => self.unrated += 1,
        }
    }
}

/// Context about a single document run, used when rendering reports.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMetadata {
    pub file_name: String,
    pub analysis_date: DateTime<Utc>,
    pub model_used: String,
    pub agents_failed: usize,
}

/// A rendered-ready analysis of one document.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentReport {
    pub metadata: ReportMetadata,
    pub analysis: AnalysisReport,
}
