//! Markdown and JSON rendering of document analyses.

use crate::analysis::{average_confidence, failed_agents, severity_breakdown};
use crate::models::{
    AgentFinding, AgentResult, DocumentReport, FindingDetail, ReportMetadata, Severity,
};
use anyhow::Result;

/// Generate a complete Markdown report.
///
/// With `include_agent_details` off, the per-agent sections are left out and
/// only the summary, key findings and recommendations remain.
pub fn generate_markdown_report(report: &DocumentReport, include_agent_details: bool) -> String {
    let mut output = String::new();

    output.push_str("# FinSight Analysis Report\n\n");

    output.push_str(&generate_metadata_section(report));
    output.push_str(&generate_table_of_contents(report, include_agent_details));
    output.push_str(&generate_risk_section(report));
    output.push_str(&generate_key_findings_section(&report.analysis.key_findings));

    if include_agent_details {
        output.push_str(&generate_agents_section(&report.analysis.agent_results));
    }

    output.push_str(&generate_recommendations_section(&report.analysis.recommendations));
    output.push_str(&generate_footer());

    output
}

fn generate_metadata_section(report: &DocumentReport) -> String {
    let ReportMetadata {
        file_name,
        analysis_date,
        model_used,
        agents_failed,
    } = &report.metadata;

    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Document:** `{}`\n", file_name));
    section.push_str(&format!("- **Task ID:** `{}`\n", report.analysis.task_id));
    section.push_str(&format!(
        "- **Analysis Date:** {}\n",
        analysis_date.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Model Used:** `{}`\n", model_used));
    section.push_str(&format!(
        "- **Agents Run:** {}\n",
        report.analysis.agent_results.len()
    ));
    if *agents_failed > 0 {
        section.push_str(&format!("- **Agents Failed:** {}\n", agents_failed));
    }
    section.push_str(&format!(
        "- **Analysis Duration:** {:.1}s\n",
        report.analysis.execution_time_ms as f64 / 1000.0
    ));
    section.push('\n');

    section
}

fn generate_table_of_contents(report: &DocumentReport, include_agent_details: bool) -> String {
    let mut toc = String::new();

    toc.push_str("## Table of Contents\n\n");
    toc.push_str("- [Metadata](#metadata)\n");
    toc.push_str("- [Risk Summary](#risk-summary)\n");
    toc.push_str("- [Key Findings](#key-findings)\n");

    if include_agent_details {
        toc.push_str("- [Agent Results](#agent-results)\n");
        for result in &report.analysis.agent_results {
            toc.push_str(&format!(
                "  - [{}](#{})\n",
                result.agent_type.title(),
                anchor(result.agent_type.title())
            ));
        }
    }

    if !report.analysis.recommendations.is_empty() {
        toc.push_str("- [Recommendations](#recommendations)\n");
    }

    toc.push('\n');
    toc
}

fn generate_risk_section(report: &DocumentReport) -> String {
    let results = &report.analysis.agent_results;
    let breakdown = severity_breakdown(results);
    let risk = report.analysis.overall_risk;

    let mut section = String::new();

    section.push_str("## Risk Summary\n\n");
    section.push_str(&format!("**Overall Risk:** {} {}\n\n", risk.emoji(), risk));
    section.push_str(&format!(
        "**Average Agent Confidence:** {:.0}%\n\n",
        average_confidence(results) * 100.0
    ));

    section.push_str("### Finding Severity Breakdown\n\n");
    section.push_str(&format!(
        "| {} Critical | {} High | {} Medium | {} Low | {} Info | **Total** |\n",
        Severity::Critical.emoji(),
        Severity::High.emoji(),
        Severity::Medium.emoji(),
        Severity::Low.emoji(),
        Severity::Info.emoji(),
    ));
    section.push_str("|:---:|:---:|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} | {} | {} | {} | {} | **{}** |\n\n",
        breakdown.critical,
        breakdown.high,
        breakdown.medium,
        breakdown.low,
        breakdown.info,
        breakdown.total
    ));

    if breakdown.unrated > 0 {
        section.push_str(&format!(
            "*{} finding(s) carried an unrecognised severity and were not scored.*\n\n",
            breakdown.unrated
        ));
    }

    let failed = failed_agents(results);
    if !failed.is_empty() {
        let names: Vec<&str> = failed.iter().map(|a| a.title()).collect();
        section.push_str(&format!(
            "> ⚠️ **Degraded analysis:** {} did not complete.\n\n",
            names.join(", ")
        ));
    }

    section
}

fn generate_key_findings_section(key_findings: &[String]) -> String {
    let mut section = String::new();

    section.push_str("## Key Findings\n\n");

    if key_findings.is_empty() {
        section.push_str("No high-confidence findings were reported.\n\n");
        return section;
    }

    for finding in key_findings {
        section.push_str(&format!("- {}\n", finding));
    }
    section.push('\n');

    section
}

fn generate_agents_section(results: &[AgentResult]) -> String {
    let mut section = String::new();

    section.push_str("## Agent Results\n\n");

    for result in results {
        section.push_str(&generate_agent_block(result));
    }

    section
}

fn generate_agent_block(result: &AgentResult) -> String {
    let mut block = String::new();

    block.push_str(&format!("### {}\n\n", result.agent_type.title()));

    if let Some(error) = result.error() {
        block.push_str(&format!(
            "*Status: ❌ Failed | Time: {}ms*\n\n",
            result.processing_time_ms
        ));
        block.push_str(&format!("> **Error:** {}\n\n", error));
        return block;
    }

    block.push_str(&format!(
        "*Status: ✅ Completed | Confidence: {:.0}% | Time: {}ms | Findings: {}*\n\n",
        result.confidence * 100.0,
        result.processing_time_ms,
        result.findings.len()
    ));

    if result.findings.is_empty() {
        block.push_str("No findings reported.\n\n");
        return block;
    }

    let mut findings: Vec<&AgentFinding> = result.findings.iter().collect();
    findings.sort_by(|a, b| b.severity_level().cmp(&a.severity_level()));

    for finding in findings {
        block.push_str(&generate_finding_block(finding));
    }
    block.push('\n');

    block
}

fn severity_badge(finding: &AgentFinding) -> String {
    match (finding.severity_level(), finding.severity.as_deref()) {
        (Some(level), _) => format!("{} **{}**", level.emoji(), level.to_string().to_uppercase()),
        (None, Some(raw)) => format!("⚪ **{}**", raw.to_uppercase()),
        (None, None) => format!("{} **INFO**", Severity::Info.emoji()),
    }
}

fn generate_finding_block(finding: &AgentFinding) -> String {
    let mut block = String::new();

    let kind = finding.kind.as_deref().unwrap_or("finding");
    let text = finding.display_text().unwrap_or("(no description)");

    block.push_str(&format!(
        "- {} `{}` {} *(confidence {:.0}%)*\n",
        severity_badge(finding),
        kind,
        text,
        finding.confidence * 100.0
    ));

    for line in detail_lines(&finding.detail) {
        block.push_str(&format!("  - {}\n", line));
    }

    block
}

fn detail_lines(detail: &FindingDetail) -> Vec<String> {
    let mut lines = Vec::new();
    let mut push = |label: &str, value: Option<String>| {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            lines.push(format!("**{}:** {}", label, value));
        }
    };

    match detail {
        FindingDetail::Parser(_) => {}
        FindingDetail::Analyzer(d) => {
            push("Metric", d.metric.clone());
            push(
                "Value",
                d.value.as_ref().map(|v| match v {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                }),
            );
            push("Trend", d.trend.clone());
        }
        FindingDetail::Compliance(d) => {
            push("Regulation", d.regulation.clone());
            push("Status", d.status.clone());
            push("Details", d.details.clone());
        }
        FindingDetail::Fraud(d) => push("Evidence", d.evidence.clone()),
        FindingDetail::Alert(d) => {
            push("Alert", d.title.clone());
            push("Message", d.message.clone());
            push("Action Required", d.action_required.clone());
            push("Deadline", d.deadline.clone());
        }
        FindingDetail::Insight(d) => push("Priority", d.priority.clone()),
    }

    lines
}

fn generate_recommendations_section(recommendations: &[String]) -> String {
    if recommendations.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Recommendations\n\n");

    for (i, rec) in recommendations.iter().enumerate() {
        section.push_str(&format!("{}. {}\n", i + 1, rec));
    }
    section.push('\n');

    section
}

fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str(&format!(
        "*Report generated by FinSight v{}*\n",
        env!("CARGO_PKG_VERSION")
    ));

    footer
}

fn anchor(heading: &str) -> String {
    heading.replace(' ', "-").to_lowercase()
}

/// Generate a JSON report.
pub fn generate_json_report(report: &DocumentReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}
