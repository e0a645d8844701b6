//! Timed execution of a single agent task.

use crate::agent::roles::AgentTask;
use crate::error::LlmError;
use crate::llm::TextGenerator;
use crate::models::{AgentResult, AgentType};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error};

/// An agent run that did not produce a result.
///
/// Carries the time spent up to the failure so the degraded result can keep it.
#[derive(Debug, thiserror::Error)]
#[error("{agent_type} agent failed after {elapsed_ms}ms: {error}")]
pub struct AgentFailure {
    pub agent_type: AgentType,
    #[source]
    pub error: LlmError,
    pub elapsed_ms: u64,
}

impl AgentFailure {
    /// Convert into the placeholder result recorded in the report.
    pub fn into_degraded(self) -> AgentResult {
        AgentResult::degraded(self.agent_type, self.error.to_string(), self.elapsed_ms)
    }
}

/// Run one agent task and wrap its output in an [`AgentResult`].
///
/// Failures are returned, not swallowed; the caller decides how to record them.
/// `timeout`, when set, bounds this agent only.
pub async fn execute_agent(
    task: AgentTask,
    client: &dyn TextGenerator,
    content: &str,
    file_name: &str,
    timeout: Option<Duration>,
) -> Result<AgentResult, AgentFailure> {
    let agent_type = task.agent_type();
    let start = Instant::now();

    let outcome = match timeout {
        Some(limit) => tokio::time::timeout(limit, task.run(client, content, file_name))
            .await
            .unwrap_or(Err(LlmError::Timeout { after: limit })),
        None => task.run(client, content, file_name).await,
    };

    let elapsed_ms = elapsed_millis(start);

    match outcome {
        Ok(output) => {
            debug!(
                "Agent {} finished in {}ms with {} findings",
                agent_type,
                elapsed_ms,
                output.findings.len()
            );
            Ok(AgentResult {
                agent_type,
                findings: output.findings,
                confidence: output.confidence,
                processing_time_ms: elapsed_ms,
                metadata: output.metadata,
            })
        }
        Err(error) => {
            error!("Agent {} failed after {}ms: {}", agent_type, elapsed_ms, error);
            Err(AgentFailure {
                agent_type,
                error,
                elapsed_ms,
            })
        }
    }
}

/// Whole milliseconds since `start`.
pub fn elapsed_millis(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::roles::DEFAULT_CONTENT_LIMIT;
    use crate::llm::testing::ScriptedGenerator;

    fn task(agent_type: AgentType) -> AgentTask {
        AgentTask::new(agent_type, DEFAULT_CONTENT_LIMIT)
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_records_timing() {
        let client = ScriptedGenerator::new().reply_after(
            "analyzer",
            r#"{"findings": [{"metric": "ROE", "value": 0.12, "trend": "up", "insight": "Returns improving", "confidence": 0.8}], "confidence": 0.75, "metadata": {"metricsCalculated": 1}}"#,
            Duration::from_millis(250),
        );

        let result = execute_agent(task(AgentType::Analyzer), &client, "doc", "a.txt", None)
            .await
            .unwrap();

        assert_eq!(result.agent_type, AgentType::Analyzer);
        assert_eq!(result.findings.len(), 1);
        assert_eq!(result.confidence, 0.75);
        assert_eq!(result.processing_time_ms, 250);
        assert_eq!(result.metadata["metricsCalculated"], 1);
        assert!(!result.is_degraded());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_keeps_partial_timing() {
        let client =
            ScriptedGenerator::new().fail_after("fraud", "upstream 502", Duration::from_millis(40));

        let failure = execute_agent(task(AgentType::Fraud), &client, "doc", "a.txt", None)
            .await
            .unwrap_err();

        assert_eq!(failure.agent_type, AgentType::Fraud);
        assert_eq!(failure.elapsed_ms, 40);
        assert!(matches!(failure.error, LlmError::Request(_)));

        let degraded = failure.into_degraded();
        assert!(degraded.findings.is_empty());
        assert_eq!(degraded.processing_time_ms, 40);
        assert!(degraded.error().unwrap().contains("upstream 502"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_a_failure() {
        let client =
            ScriptedGenerator::new().reply_after("insight", "{}", Duration::from_secs(30));

        let failure = execute_agent(
            task(AgentType::Insight),
            &client,
            "doc",
            "a.txt",
            Some(Duration::from_secs(5)),
        )
        .await
        .unwrap_err();

        assert!(matches!(failure.error, LlmError::Timeout { after } if after == Duration::from_secs(5)));
        assert_eq!(failure.elapsed_ms, 5000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sub_second_timeout_keeps_millis() {
        let client =
            ScriptedGenerator::new().reply_after("alert", "{}", Duration::from_secs(2));

        let failure = execute_agent(
            task(AgentType::Alert),
            &client,
            "doc",
            "a.txt",
            Some(Duration::from_millis(500)),
        )
        .await
        .unwrap_err();

        assert_eq!(failure.elapsed_ms, 500);
        assert_eq!(failure.error.to_string(), "request timed out after 500ms");
        assert!(failure
            .into_degraded()
            .error()
            .unwrap()
            .contains("timed out after 500ms"));
    }

    #[tokio::test]
    async fn test_malformed_payload_is_a_failure() {
        let client = ScriptedGenerator::new().reply("parser", "<html>oops</html>");

        let failure = execute_agent(task(AgentType::Parser), &client, "doc", "a.txt", None)
            .await
            .unwrap_err();

        assert!(matches!(failure.error, LlmError::MalformedResponse(_)));
    }
}
