//! Narrative financial report generation.
//!
//! Each report type is one templated, single-shot generation call with a
//! fixed system role and temperature. The type is validated before any call
//! is made.

use crate::error::ReportError;
use crate::llm::{GenerationRequest, TextGenerator};
use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

/// The seven supported narrative report types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportType {
    InvestorMemo,
    AuditSummary,
    BoardDeck,
    ComplianceReport,
    RiskReport,
    TaxFiling,
    SecFiling,
}

impl ReportType {
    pub const ALL: [ReportType; 7] = [
        ReportType::InvestorMemo,
        ReportType::AuditSummary,
        ReportType::BoardDeck,
        ReportType::ComplianceReport,
        ReportType::RiskReport,
        ReportType::TaxFiling,
        ReportType::SecFiling,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportType::InvestorMemo => "investor_memo",
            ReportType::AuditSummary => "audit_summary",
            ReportType::BoardDeck => "board_deck",
            ReportType::ComplianceReport => "compliance_report",
            ReportType::RiskReport => "risk_report",
            ReportType::TaxFiling => "tax_filing",
            ReportType::SecFiling => "sec_filing",
        }
    }

    /// System message describing who writes this report.
    pub fn system_role(&self) -> &'static str {
        match self {
            ReportType::InvestorMemo => {
                "You are a financial analyst writing professional investor memos."
            }
            ReportType::AuditSummary => {
                "You are an audit professional writing formal, government-compliant audit reports."
            }
            ReportType::BoardDeck => "You are a senior executive preparing board presentations.",
            ReportType::ComplianceReport => {
                "You are a compliance officer writing regulatory compliance reports."
            }
            ReportType::RiskReport => {
                "You are a risk management expert writing detailed risk assessment reports."
            }
            ReportType::TaxFiling => {
                "You are a certified tax professional preparing government-compliant tax filing documents."
            }
            ReportType::SecFiling => {
                "You are a securities lawyer preparing SEC-compliant filing documents."
            }
        }
    }

    /// Filings stay close to the facts; memos and decks get more latitude.
    pub fn temperature(&self) -> f32 {
        match self {
            ReportType::InvestorMemo | ReportType::BoardDeck => 0.3,
            ReportType::AuditSummary | ReportType::ComplianceReport | ReportType::RiskReport => {
                0.2
            }
            ReportType::TaxFiling | ReportType::SecFiling => 0.1,
        }
    }

    /// Render the user prompt from the caller's data.
    pub fn build_prompt(&self, data: &Map<String, Value>, current_year: i32) -> String {
        let mut prompt = String::new();

        match self {
            ReportType::InvestorMemo => {
                let company = data
                    .get("companyData")
                    .and_then(|c| c.get("name"))
                    .and_then(Value::as_str)
                    .unwrap_or("Company");
                prompt.push_str(&format!("Write a professional investor memo for {company}.\n\n"));
                push_json(&mut prompt, "Financial Data", data, "financialData", Value::Object(Map::new()));
                push_json(&mut prompt, "Analysis Results", data, "analysisFindings", Value::Object(Map::new()));
            }
            ReportType::AuditSummary => {
                prompt.push_str("Write a government-compliant audit summary report.\n\n");
                push_json(&mut prompt, "Compliance Status", data, "complianceStatus", Value::Object(Map::new()));
                push_json(&mut prompt, "Audit Findings", data, "auditFindings", Value::Object(Map::new()));
            }
            ReportType::BoardDeck => {
                prompt.push_str("Write a professional board deck presentation.\n\n");
                prompt.push_str(&format!(
                    "Executive Summary:\n{}\n\n",
                    text_field(data, "executiveSummary", "")
                ));
                push_json(&mut prompt, "Key Metrics", data, "keyMetrics", Value::Object(Map::new()));
                push_json(&mut prompt, "Strategic Initiatives", data, "strategicInitiatives", Value::Array(Vec::new()));
            }
            ReportType::ComplianceReport => {
                prompt.push_str("Write a regulatory compliance report covering IFRS, GAAP, SOX and SEBI.\n\n");
                push_json(&mut prompt, "Compliance Status", data, "complianceStatus", Value::Object(Map::new()));
                push_json(&mut prompt, "Audit Findings", data, "auditFindings", Value::Object(Map::new()));
            }
            ReportType::RiskReport => {
                prompt.push_str("Write a comprehensive risk assessment report with predictive analytics.\n\n");
                push_json(&mut prompt, "Risk Analysis", data, "riskAnalysis", Value::Object(Map::new()));
                push_json(&mut prompt, "Predictions", data, "predictions", Value::Object(Map::new()));
                push_json(&mut prompt, "Monte Carlo Simulation Results", data, "monteCarloResults", Value::Object(Map::new()));
            }
            ReportType::TaxFiling => {
                prompt.push_str("Write an IRS/government-compliant tax filing report.\n\n");
                prompt.push_str(&format!(
                    "Tax Year: {}\n",
                    text_field(data, "taxYear", &current_year.to_string())
                ));
                push_json(&mut prompt, "Financial Data", data, "financialData", Value::Object(Map::new()));
            }
            ReportType::SecFiling => {
                let filing_type = text_field(data, "filingType", "10-K");
                prompt.push_str(&format!("Write an SEC filing ({filing_type}) compliant report.\n\n"));
                push_json(&mut prompt, "Company Data", data, "companyData", Value::Object(Map::new()));
                prompt.push_str(&format!("Filing Type: {filing_type}\n"));
                prompt.push_str(&format!(
                    "Fiscal Period: {}\n\n",
                    text_field(data, "fiscalPeriod", "")
                ));
            }
        }

        prompt.push_str("Include the following sections:\n");
        for (i, section) in self.sections().iter().enumerate() {
            prompt.push_str(&format!("{}. {}\n", i + 1, section));
        }
        prompt.push_str(&format!("\n{} Format the document in markdown.", self.style_note()));
        prompt
    }

    fn sections(&self) -> &'static [&'static str] {
        match self {
            ReportType::InvestorMemo => &[
                "Executive Summary",
                "Financial Performance Analysis",
                "Key Metrics & Ratios",
                "Risk Assessment",
                "Investment Recommendation",
            ],
            ReportType::AuditSummary => &[
                "Executive Summary",
                "Compliance Status (IFRS, GAAP, SOX, SEBI)",
                "Fraud Risk Assessment",
                "Key Findings & Issues",
                "Recommendations",
                "Required Actions",
            ],
            ReportType::BoardDeck => &[
                "Executive Summary",
                "Financial Performance Dashboard",
                "Key Metrics & KPIs",
                "Strategic Initiatives",
                "Risks & Opportunities",
                "Recommendations",
            ],
            ReportType::ComplianceReport => &[
                "Regulatory Compliance Summary",
                "IFRS/GAAP Compliance Status",
                "SOX Compliance Review",
                "SEBI Requirements",
                "ESG Disclosure Review",
                "Audit Findings & Recommendations",
            ],
            ReportType::RiskReport => &[
                "Executive Summary",
                "Risk Category Analysis (Credit, Market, Operational, Liquidity)",
                "Predictive Scenarios",
                "Monte Carlo Simulation Results",
                "Value at Risk (VaR) Analysis",
                "Stress Test Results",
                "Risk Mitigation Recommendations",
            ],
            ReportType::TaxFiling => &[
                "Tax Summary Overview",
                "Income Statement for Tax Purposes",
                "Deductions and Credits",
                "Tax Liability Calculation",
                "Payment Schedule",
                "Supporting Documentation Requirements",
            ],
            ReportType::SecFiling => &[
                "Cover Page and Filing Information",
                "Business Overview",
                "Risk Factors",
                "Financial Statements (Balance Sheet, Income Statement, Cash Flow)",
                "Management Discussion & Analysis (MD&A)",
                "Controls and Procedures",
                "Certifications",
            ],
        }
    }

    fn style_note(&self) -> &'static str {
        match self {
            ReportType::InvestorMemo => "Write it as a professional business document.",
            ReportType::AuditSummary => "Follow current government audit standards.",
            ReportType::BoardDeck => "Lay it out as presentation slides.",
            ReportType::ComplianceReport => "Write it as a professional compliance report.",
            ReportType::RiskReport => "Write it as a professional risk assessment.",
            ReportType::TaxFiling => "Follow IRS and government tax filing standards.",
            ReportType::SecFiling => "Follow SEC EDGAR filing standards.",
        }
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ReportType {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReportType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ReportError::InvalidReportType(s.to_string()))
    }
}

fn push_json(prompt: &mut String, heading: &str, data: &Map<String, Value>, key: &str, empty: Value) {
    let value = data.get(key).unwrap_or(&empty);
    let rendered = serde_json::to_string_pretty(value).unwrap_or_default();
    prompt.push_str(&format!("{heading}:\n{rendered}\n\n"));
}

fn text_field(data: &Map<String, Value>, key: &str, default: &str) -> String {
    match data.get(key) {
        None | Some(Value::Null) => default.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// A generated narrative report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedReport {
    pub report_type: ReportType,
    pub content: String,
    pub generated_at: DateTime<Utc>,
    pub format: &'static str,
}

/// Generates narrative reports over the shared text-generation client.
pub struct ReportGenerator {
    client: Arc<dyn TextGenerator>,
}

impl ReportGenerator {
    pub fn new(client: Arc<dyn TextGenerator>) -> Self {
        Self { client }
    }

    /// Generate a report by type identifier.
    ///
    /// Unknown identifiers and non-object data fail before any model call.
    pub async fn generate(&self, report_type: &str, data: &Value) -> Result<GeneratedReport, ReportError> {
        let report_type: ReportType = report_type.parse()?;
        self.generate_typed(report_type, data).await
    }

    pub async fn generate_typed(
        &self,
        report_type: ReportType,
        data: &Value,
    ) -> Result<GeneratedReport, ReportError> {
        let Value::Object(fields) = data else {
            return Err(ReportError::InvalidData(
                "report data must be a JSON object".to_string(),
            ));
        };

        info!("Generating report: {}", report_type);

        let generated_at = Utc::now();
        let request = GenerationRequest::text(
            report_type.as_str(),
            report_type.system_role(),
            report_type.build_prompt(fields, generated_at.year()),
            report_type.temperature(),
        );

        let content = self.client.generate(&request).await?;

        Ok(GeneratedReport {
            report_type,
            content,
            generated_at,
            format: "markdown",
        })
    }
}
