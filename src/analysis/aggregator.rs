//! Aggregation of agent results into a single assessment.
//!
//! Every function here is pure: the same agent results always produce the
//! same risk level, key findings and recommendations.

use crate::models::{AgentResult, AgentType, RiskLevel, SeverityBreakdown};

/// Findings considered per agent when picking key findings.
pub const FINDINGS_PER_AGENT: usize = 3;

/// Confidence a finding must exceed to be a key finding.
pub const KEY_FINDING_CONFIDENCE: f64 = 0.7;

/// Maximum number of key findings in a report.
pub const MAX_KEY_FINDINGS: usize = 10;

/// Maximum number of recommendations in a report.
pub const MAX_RECOMMENDATIONS: usize = 5;

/// Used when the insight agent offers no recommendations.
pub const FALLBACK_RECOMMENDATIONS: [&str; 3] = [
    "Continue monitoring key financial metrics on a regular schedule",
    "Maintain compliance with applicable regulatory requirements",
    "Review and update risk management procedures",
];

/// Average severity score across all findings, if any finding is scorable.
pub fn average_risk_score(results: &[AgentResult]) -> Option<f64> {
    let (total, count) = results
        .iter()
        .flat_map(|r| &r.findings)
        .filter_map(|f| f.risk_score())
        .fold((0u64, 0u64), |(total, count), score| {
            (total + u64::from(score), count + 1)
        });

    (count > 0).then(|| total as f64 / count as f64)
}

/// Overall risk level. No scorable findings means low risk.
pub fn calculate_overall_risk(results: &[AgentResult]) -> RiskLevel {
    average_risk_score(results)
        .map(RiskLevel::from_average)
        .unwrap_or(RiskLevel::Low)
}

/// High-confidence findings from the head of each agent's list, tagged by agent.
pub fn extract_key_findings(results: &[AgentResult]) -> Vec<String> {
    results
        .iter()
        .flat_map(|result| {
            let tag = result.agent_type.as_str().to_uppercase();
            result
                .findings
                .iter()
                .take(FINDINGS_PER_AGENT)
                .filter(|f| f.confidence > KEY_FINDING_CONFIDENCE)
                .filter_map(|f| f.display_text())
                .map(move |text| format!("[{}] {}", tag, text))
        })
        .take(MAX_KEY_FINDINGS)
        .collect()
}

/// Recommendations from the insight agent, or the fixed fallback list.
pub fn generate_recommendations(results: &[AgentResult]) -> Vec<String> {
    let recommendations: Vec<String> = results
        .iter()
        .filter(|r| r.agent_type == AgentType::Insight)
        .flat_map(|r| &r.findings)
        .filter(|f| f.is_recommendation())
        .map(|f| f.content.clone().unwrap_or_default())
        .take(MAX_RECOMMENDATIONS)
        .collect();

    if recommendations.is_empty() {
        FALLBACK_RECOMMENDATIONS
            .iter()
            .map(|s| s.to_string())
            .collect()
    } else {
        recommendations
    }
}

/// Count findings per severity bucket.
pub fn severity_breakdown(results: &[AgentResult]) -> SeverityBreakdown {
    let mut breakdown = SeverityBreakdown::default();
    for finding in results.iter().flat_map(|r| &r.findings) {
        breakdown.record(finding);
    }
    breakdown
}

/// Agents whose run ended in a degraded result.
pub fn failed_agents(results: &[AgentResult]) -> Vec<AgentType> {
    results
        .iter()
        .filter(|r| r.is_degraded())
        .map(|r| r.agent_type)
        .collect()
}

/// Mean reported confidence of the agents that succeeded.
pub fn average_confidence(results: &[AgentResult]) -> f64 {
    let succeeded: Vec<f64> = results
        .iter()
        .filter(|r| !r.is_degraded())
        .map(|r| r.confidence)
        .collect();

    if succeeded.is_empty() {
        0.0
    } else {
        succeeded.iter().sum::<f64>() / succeeded.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AgentFinding;
    use serde_json::{json, Map, Value};

    fn finding(agent_type: AgentType, raw: Value) -> AgentFinding {
        AgentFinding::from_value(agent_type, &raw).unwrap()
    }

    fn result(agent_type: AgentType, findings: Vec<AgentFinding>) -> AgentResult {
        AgentResult {
            agent_type,
            findings,
            confidence: 0.8,
            processing_time_ms: 10,
            metadata: Map::new(),
        }
    }

    fn with_severities(severities: &[&str]) -> Vec<AgentResult> {
        let findings = severities
            .iter()
            .map(|s| finding(AgentType::Fraud, json!({"severity": s, "confidence": 0.5})))
            .collect();
        vec![result(AgentType::Fraud, findings)]
    }

    fn all_degraded() -> Vec<AgentResult> {
        AgentType::ALL
            .iter()
            .map(|t| AgentResult::degraded(*t, "down", 0))
            .collect()
    }

    #[test]
    fn test_all_critical_is_critical_risk() {
        let results = with_severities(&["critical", "critical", "CRITICAL"]);
        assert_eq!(calculate_overall_risk(&results), RiskLevel::Critical);
    }

    #[test]
    fn test_no_findings_is_low_risk() {
        assert_eq!(calculate_overall_risk(&all_degraded()), RiskLevel::Low);
        assert_eq!(calculate_overall_risk(&[]), RiskLevel::Low);
        assert_eq!(average_risk_score(&all_degraded()), None);
    }

    #[test]
    fn test_threshold_boundaries() {
        // high + high = 75
        assert_eq!(
            calculate_overall_risk(&with_severities(&["high", "high"])),
            RiskLevel::Critical
        );
        // low + high = 50
        assert_eq!(
            calculate_overall_risk(&with_severities(&["low", "high"])),
            RiskLevel::High
        );
        // info + medium = 25
        assert_eq!(
            calculate_overall_risk(&with_severities(&["info", "medium"])),
            RiskLevel::Medium
        );
    }

    #[test]
    fn test_just_below_medium_is_low() {
        // 2499 findings at low (25) and one at info (0) average to 24.99
        let mut severities = vec!["low"; 2499];
        severities.push("info");
        let results = with_severities(&severities);

        let avg = average_risk_score(&results).unwrap();
        assert!((avg - 24.99).abs() < 1e-9);
        assert_eq!(calculate_overall_risk(&results), RiskLevel::Low);
    }

    #[test]
    fn test_missing_severity_counts_as_info() {
        let results = vec![result(
            AgentType::Parser,
            vec![
                finding(AgentType::Parser, json!({"content": "a"})),
                finding(AgentType::Parser, json!({"severity": "critical"})),
            ],
        )];
        // (0 + 100) / 2 = 50
        assert_eq!(calculate_overall_risk(&results), RiskLevel::High);
    }

    #[test]
    fn test_unknown_severity_is_ignored() {
        let results = with_severities(&["catastrophic", "critical"]);
        assert_eq!(average_risk_score(&results), Some(100.0));
    }

    #[test]
    fn test_key_findings_cap_and_tags() {
        let results: Vec<AgentResult> = AgentType::ALL
            .iter()
            .map(|t| {
                let findings = (0..5)
                    .map(|i| {
                        finding(
                            *t,
                            json!({"content": format!("{} finding {}", t, i), "confidence": 0.9}),
                        )
                    })
                    .collect();
                result(*t, findings)
            })
            .collect();

        let key = extract_key_findings(&results);
        assert_eq!(key.len(), MAX_KEY_FINDINGS);
        assert_eq!(key[0], "[PARSER] parser finding 0");
        assert_eq!(key[2], "[PARSER] parser finding 2");
        assert_eq!(key[3], "[ANALYZER] analyzer finding 0");
        assert_eq!(key[9], "[FRAUD] fraud finding 0");
        assert!(key.iter().all(|k| !k.ends_with("finding 3")));
    }

    #[test]
    fn test_key_findings_confidence_filter() {
        let results = vec![result(
            AgentType::Compliance,
            vec![
                finding(AgentType::Compliance, json!({"description": "exactly 0.7", "confidence": 0.7})),
                finding(AgentType::Compliance, json!({"description": "kept", "confidence": 0.71})),
                finding(AgentType::Compliance, json!({"details": "no display text", "confidence": 0.99})),
                finding(AgentType::Compliance, json!({"description": "fourth", "confidence": 0.99})),
            ],
        )];

        assert_eq!(extract_key_findings(&results), vec!["[COMPLIANCE] kept"]);
    }

    #[test]
    fn test_key_findings_use_probe_order() {
        let results = vec![result(
            AgentType::Analyzer,
            vec![finding(
                AgentType::Analyzer,
                json!({"insight": "Margins compressed", "metric": "Gross margin", "confidence": 0.8}),
            )],
        )];
        assert_eq!(
            extract_key_findings(&results),
            vec!["[ANALYZER] Margins compressed"]
        );
    }

    #[test]
    fn test_recommendations_fallback() {
        let expected: Vec<String> = FALLBACK_RECOMMENDATIONS.iter().map(|s| s.to_string()).collect();

        assert_eq!(generate_recommendations(&all_degraded()), expected);

        let insight_without_recs = vec![result(
            AgentType::Insight,
            vec![finding(AgentType::Insight, json!({"type": "summary", "content": "ok"}))],
        )];
        assert_eq!(generate_recommendations(&insight_without_recs), expected);
    }

    #[test]
    fn test_recommendations_truncated_in_order() {
        let findings = (1..=7)
            .map(|i| {
                finding(
                    AgentType::Insight,
                    json!({"type": "recommendation", "content": format!("rec {}", i)}),
                )
            })
            .collect();
        let results = vec![result(AgentType::Insight, findings)];

        assert_eq!(
            generate_recommendations(&results),
            vec!["rec 1", "rec 2", "rec 3", "rec 4", "rec 5"]
        );
    }

    #[test]
    fn test_recommendations_only_from_insight_agent() {
        let results = vec![
            result(
                AgentType::Alert,
                vec![finding(AgentType::Alert, json!({"type": "recommendation", "content": "alert rec"}))],
            ),
            result(
                AgentType::Insight,
                vec![finding(AgentType::Insight, json!({"type": "recommendation"}))],
            ),
        ];

        // Missing content is kept as an empty string.
        assert_eq!(generate_recommendations(&results), vec![""]);
    }

    #[test]
    fn test_failed_agents_and_confidence() {
        let mut results = all_degraded();
        results[1] = result(AgentType::Analyzer, vec![]);
        results[4] = AgentResult {
            confidence: 0.4,
            ..result(AgentType::Alert, vec![])
        };

        assert_eq!(
            failed_agents(&results),
            vec![AgentType::Parser, AgentType::Compliance, AgentType::Fraud, AgentType::Insight]
        );
        assert!((average_confidence(&results) - 0.6).abs() < 1e-9);
        assert_eq!(average_confidence(&all_degraded()), 0.0);
    }

    #[test]
    fn test_severity_breakdown_across_agents() {
        let mut results = with_severities(&["high", "low"]);
        results.push(result(
            AgentType::Alert,
            vec![finding(AgentType::Alert, json!({"severity": "critical"}))],
        ));

        let breakdown = severity_breakdown(&results);
        assert_eq!(breakdown.total, 3);
        assert_eq!(breakdown.high, 1);
        assert_eq!(breakdown.low, 1);
        assert_eq!(breakdown.critical, 1);
    }
}
