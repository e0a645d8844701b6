//! The six analysis roles.
//!
//! Each role owns a prompt template, a sampling temperature and the decoding
//! of its JSON payload into typed findings.

use crate::error::LlmError;
use crate::llm::{GenerationRequest, TextGenerator};
use crate::models::{clamp_confidence, AgentFinding, AgentType};
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Characters of document content sent to each agent.
pub const DEFAULT_CONTENT_LIMIT: usize = 4000;

/// Decoded payload of one successful agent call.
#[derive(Debug, Clone, Default)]
pub struct AgentOutput {
    pub findings: Vec<AgentFinding>,
    pub confidence: f64,
    pub metadata: Map<String, Value>,
}

/// A single unit of work: one role applied to one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgentTask {
    agent_type: AgentType,
    content_limit: usize,
}

/// The fixed set of tasks, in registration order.
pub fn registered_tasks(content_limit: usize) -> Vec<AgentTask> {
    AgentType::ALL
        .iter()
        .map(|agent_type| AgentTask::new(*agent_type, content_limit))
        .collect()
}

impl AgentTask {
    pub fn new(agent_type: AgentType, content_limit: usize) -> Self {
        Self {
            agent_type,
            content_limit,
        }
    }

    pub fn agent_type(&self) -> AgentType {
        self.agent_type
    }

    /// Extraction and compliance roles run cold; narrative roles get some latitude.
    pub fn temperature(&self) -> f32 {
        match self.agent_type {
            AgentType::Parser | AgentType::Analyzer | AgentType::Compliance | AgentType::Fraud => {
                0.1
            }
            AgentType::Alert => 0.2,
            AgentType::Insight => 0.3,
        }
    }

    /// Render the role prompt for a document.
    pub fn build_prompt(&self, content: &str, file_name: &str) -> String {
        let template = template_for(self.agent_type);
        let excerpt = truncate_chars(content, self.content_limit);

        let mut prompt = String::new();
        prompt.push_str(&format!(
            "You are a {} {}.\n\n",
            self.agent_type.title(),
            template.mission
        ));
        prompt.push_str(&format!("Document: {}\nContent: {}\n\n", file_name, excerpt));
        prompt.push_str(template.task_heading);
        prompt.push('\n');
        for (i, item) in template.tasks.iter().enumerate() {
            prompt.push_str(&format!("{}. {}\n", i + 1, item));
        }
        prompt.push_str("\nRespond with a single JSON object of this shape:\n");
        prompt.push_str(template.schema);
        prompt
    }

    /// The generation request for a document.
    pub fn request(&self, content: &str, file_name: &str) -> GenerationRequest {
        GenerationRequest::json(
            self.agent_type.as_str(),
            self.build_prompt(content, file_name),
            self.temperature(),
        )
    }

    /// Call the model and decode its payload.
    ///
    /// A payload that is not a JSON object is a hard failure.
    pub async fn run(
        &self,
        client: &dyn TextGenerator,
        content: &str,
        file_name: &str,
    ) -> Result<AgentOutput, LlmError> {
        let request = self.request(content, file_name);
        let raw = client.generate(&request).await?;
        debug!("{} agent returned {} bytes", self.agent_type, raw.len());
        parse_agent_output(self.agent_type, &raw)
    }
}

/// Decode the JSON payload produced by `agent_type`.
pub fn parse_agent_output(agent_type: AgentType, raw: &str) -> Result<AgentOutput, LlmError> {
    let value: Value = serde_json::from_str(raw).map_err(|e| {
        LlmError::MalformedResponse(format!("{agent_type} agent returned invalid JSON: {e}"))
    })?;

    let Value::Object(mut object) = value else {
        return Err(LlmError::MalformedResponse(format!(
            "{agent_type} agent returned a non-object payload"
        )));
    };

    let findings = match object.remove("findings") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| decode_finding(agent_type, item))
            .collect(),
        None | Some(Value::Null) => Vec::new(),
        Some(_) => {
            warn!("{} agent returned non-array findings; ignoring", agent_type);
            Vec::new()
        }
    };

    let confidence = object.get("confidence").map(clamp_confidence).unwrap_or(0.0);

    let metadata = match object.remove("metadata") {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    };

    Ok(AgentOutput {
        findings,
        confidence,
        metadata,
    })
}

fn decode_finding(agent_type: AgentType, item: &Value) -> Option<AgentFinding> {
    if !item.is_object() {
        warn!("Skipping non-object finding from {} agent", agent_type);
        return None;
    }

    match AgentFinding::from_value(agent_type, item) {
        Ok(finding) => Some(finding),
        Err(e) => {
            warn!("Skipping undecodable finding from {} agent: {}", agent_type, e);
            None
        }
    }
}

/// First `limit` characters of `text`, never splitting a character.
pub fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

struct PromptTemplate {
    mission: &'static str,
    task_heading: &'static str,
    tasks: &'static [&'static str],
    schema: &'static str,
}

fn template_for(agent_type: AgentType) -> &'static PromptTemplate {
    match agent_type {
        AgentType::Parser => &PARSER_TEMPLATE,
        AgentType::Analyzer => &ANALYZER_TEMPLATE,
        AgentType::Compliance => &COMPLIANCE_TEMPLATE,
        AgentType::Fraud => &FRAUD_TEMPLATE,
        AgentType::Alert => &ALERT_TEMPLATE,
        AgentType::Insight => &INSIGHT_TEMPLATE,
    }
}

static PARSER_TEMPLATE: PromptTemplate = PromptTemplate {
    mission: "that pulls structured data out of financial documents",
    task_heading: "Extract:",
    tasks: &[
        "Document metadata (type, reporting date, company)",
        "Financial tables and headline figures",
        "Section structure",
        "Named entities (companies, accounts, amounts)",
    ],
    schema: r#"{
  "findings": [
    {"type": "metadata|table|entity|section", "content": "extracted content", "confidence": 0.0-1.0}
  ],
  "confidence": 0.0-1.0,
  "metadata": {"tablesFound": number, "entitiesFound": number}
}"#,
};

static ANALYZER_TEMPLATE: PromptTemplate = PromptTemplate {
    mission: "that computes KPIs and analyses financial trends",
    task_heading: "Calculate and interpret:",
    tasks: &[
        "Key financial ratios (ROE, ROI, debt-to-equity, current ratio and similar)",
        "Year-over-year trends",
        "Operating performance metrics",
        "Risk indicators visible in the numbers",
    ],
    schema: r#"{
  "findings": [
    {"metric": "metric name", "value": number, "trend": "up|down|stable", "insight": "interpretation", "severity": "info|low|medium|high|critical", "confidence": 0.0-1.0}
  ],
  "confidence": 0.0-1.0,
  "metadata": {"metricsCalculated": number, "trendsIdentified": number}
}"#,
};

static COMPLIANCE_TEMPLATE: PromptTemplate = PromptTemplate {
    mission: "that checks adherence to financial regulations",
    task_heading: "Assess compliance with:",
    tasks: &[
        "IFRS (International Financial Reporting Standards)",
        "GAAP (Generally Accepted Accounting Principles)",
        "SOX (Sarbanes-Oxley Act)",
        "SEBI (Securities and Exchange Board of India)",
        "ESG (Environmental, Social, Governance) disclosure",
    ],
    schema: r#"{
  "findings": [
    {"regulation": "IFRS|GAAP|SOX|SEBI|ESG", "status": "compliant|non-compliant|unclear", "details": "explanation", "description": "one-line summary", "severity": "low|medium|high|critical", "confidence": 0.0-1.0}
  ],
  "confidence": 0.0-1.0,
  "metadata": {"regulationsChecked": number, "violationsFound": number}
}"#,
};

static FRAUD_TEMPLATE: PromptTemplate = PromptTemplate {
    mission: "that looks for financial irregularities",
    task_heading: "Look for:",
    tasks: &[
        "Revenue manipulation patterns",
        "Expense misclassification",
        "Hidden liabilities",
        "Undisclosed related-party transactions",
        "Round-number bias",
        "Duplicate entries",
        "Other unusual financial patterns",
    ],
    schema: r#"{
  "findings": [
    {"type": "fraud indicator type", "description": "detailed description", "severity": "low|medium|high|critical", "evidence": "supporting evidence", "confidence": 0.0-1.0}
  ],
  "confidence": 0.0-1.0,
  "metadata": {"redFlagsFound": number, "riskScore": 0-100}
}"#,
};

static ALERT_TEMPLATE: PromptTemplate = PromptTemplate {
    mission: "that raises actionable notifications for critical issues",
    task_heading: "Raise alerts for:",
    tasks: &[
        "Critical compliance violations",
        "High-risk fraud indicators",
        "Significant financial anomalies",
        "Urgent action items",
        "Regulatory deadlines",
    ],
    schema: r#"{
  "findings": [
    {"title": "alert title", "message": "detailed message", "description": "one-line summary", "severity": "info|low|medium|high|critical", "actionRequired": "action to take", "deadline": "optional deadline", "confidence": 0.0-1.0}
  ],
  "confidence": 0.0-1.0,
  "metadata": {"alertsGenerated": number, "criticalAlerts": number}
}"#,
};

static INSIGHT_TEMPLATE: PromptTemplate = PromptTemplate {
    mission: "that writes plain-language summaries and recommendations",
    task_heading: "Provide:",
    tasks: &[
        "An executive summary of two or three sentences",
        "Key insights in plain language",
        "Strategic recommendations",
        "Risk notes",
        "Opportunities",
    ],
    schema: r#"{
  "findings": [
    {"type": "summary|insight|recommendation|risk|opportunity", "content": "plain language content", "priority": "low|medium|high", "confidence": 0.0-1.0}
  ],
  "confidence": 0.0-1.0,
  "metadata": {"insightsGenerated": number, "recommendationsCount": number}
}"#,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::ScriptedGenerator;
    use crate::llm::client::ResponseShape;
    use crate::models::{FindingDetail, Severity};
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_registered_tasks_order() {
        let tasks = registered_tasks(DEFAULT_CONTENT_LIMIT);
        let order: Vec<AgentType> = tasks.iter().map(|t| t.agent_type()).collect();
        assert_eq!(order, AgentType::ALL.to_vec());
    }

    #[test]
    fn test_temperatures() {
        let temp = |agent_type| AgentTask::new(agent_type, 10).temperature();
        assert_eq!(temp(AgentType::Parser), 0.1);
        assert_eq!(temp(AgentType::Compliance), 0.1);
        assert_eq!(temp(AgentType::Fraud), 0.1);
        assert_eq!(temp(AgentType::Alert), 0.2);
        assert_eq!(temp(AgentType::Insight), 0.3);
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("abcdef", 3), "abc");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("€€€€", 2), "€€");
        assert_eq!(truncate_chars("", 5), "");
    }

    #[test]
    fn test_prompt_truncates_content() {
        let content = "x".repeat(DEFAULT_CONTENT_LIMIT + 500);
        let task = AgentTask::new(AgentType::Fraud, DEFAULT_CONTENT_LIMIT);
        let prompt = task.build_prompt(&content, "10-K.txt");

        assert!(prompt.starts_with("You are a Fraud Detection Agent"));
        assert!(prompt.contains("Document: 10-K.txt"));
        assert!(prompt.contains(&"x".repeat(DEFAULT_CONTENT_LIMIT)));
        assert!(!prompt.contains(&"x".repeat(DEFAULT_CONTENT_LIMIT + 1)));
        assert!(prompt.contains("Round-number bias"));
    }

    #[test]
    fn test_compliance_prompt_lists_regulations() {
        let prompt = AgentTask::new(AgentType::Compliance, 100).build_prompt("doc", "a.txt");
        for regulation in ["IFRS", "GAAP", "SOX", "SEBI", "ESG"] {
            assert!(prompt.contains(regulation), "missing {regulation}");
        }
    }

    #[test]
    fn test_request_is_json_shaped() {
        let request = AgentTask::new(AgentType::Insight, 100).request("doc", "a.txt");
        assert_eq!(request.label, "insight");
        assert_eq!(request.shape, ResponseShape::Json);
        assert_eq!(request.temperature, 0.3);
    }

    #[test]
    fn test_parse_agent_output() {
        let raw = r#"{
            "findings": [
                {"regulation": "SOX", "status": "non-compliant", "details": "No ICFR attestation", "severity": "high", "confidence": 0.9},
                "stray string",
                {"regulation": "ESG", "status": "unclear", "confidence": 0.4}
            ],
            "confidence": 0.8,
            "metadata": {"regulationsChecked": 5, "violationsFound": 1}
        }"#;

        let output = assert_ok!(parse_agent_output(AgentType::Compliance, raw));
        assert_eq!(output.findings.len(), 2);
        assert_eq!(output.confidence, 0.8);
        assert_eq!(output.metadata["violationsFound"], 1);
        assert_eq!(output.findings[0].severity_level(), Some(Severity::High));
        match &output.findings[0].detail {
            FindingDetail::Compliance(detail) => {
                assert_eq!(detail.regulation.as_deref(), Some("SOX"));
                assert_eq!(detail.status.as_deref(), Some("non-compliant"));
            }
            other => panic!("unexpected detail: {other:?}"),
        }
    }

    #[test]
    fn test_parse_agent_output_defaults() {
        let output = assert_ok!(parse_agent_output(AgentType::Parser, "{}"));
        assert!(output.findings.is_empty());
        assert_eq!(output.confidence, 0.0);
        assert!(output.metadata.is_empty());

        let output = assert_ok!(parse_agent_output(
            AgentType::Parser,
            r#"{"findings": "none", "metadata": []}"#
        ));
        assert!(output.findings.is_empty());
        assert!(output.metadata.is_empty());
    }

    #[test]
    fn test_parse_agent_output_rejects_malformed() {
        let err = assert_err!(parse_agent_output(AgentType::Fraud, "not json at all"));
        assert!(matches!(err, LlmError::MalformedResponse(_)));

        let err = assert_err!(parse_agent_output(AgentType::Fraud, "[1, 2, 3]"));
        assert!(matches!(err, LlmError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_run_sends_role_request() {
        let client = ScriptedGenerator::new().reply(
            "alert",
            r#"{"findings": [{"title": "Filing overdue", "severity": "critical", "deadline": "2025-03-31", "confidence": 0.95}], "confidence": 0.9}"#,
        );
        let task = AgentTask::new(AgentType::Alert, DEFAULT_CONTENT_LIMIT);

        let output = task.run(&client, "Quarterly report", "q3.txt").await.unwrap();
        assert_eq!(output.findings.len(), 1);
        assert_eq!(client.call_count(), 1);

        let requests = client.requests();
        assert_eq!(requests[0].temperature, 0.2);
        assert!(requests[0].prompt.contains("Quarterly report"));
    }

    #[tokio::test]
    async fn test_run_propagates_client_error() {
        let client = ScriptedGenerator::new().fail("parser", "connection reset");
        let task = AgentTask::new(AgentType::Parser, DEFAULT_CONTENT_LIMIT);

        let err = task.run(&client, "doc", "a.txt").await.unwrap_err();
        assert!(matches!(err, LlmError::Request(_)));
    }
}
