//! Multi-agent orchestration.
//!
//! [`Orchestrator::orchestrate`] fans a document out to every registered
//! agent at once, waits for all of them, and hands the collected results to
//! the aggregator. A failing agent becomes a degraded result; it never
//! cancels or delays its siblings.

use crate::agent::executor::{elapsed_millis, execute_agent};
use crate::agent::roles::{registered_tasks, AgentTask, DEFAULT_CONTENT_LIMIT};
use crate::analysis::{calculate_overall_risk, extract_key_findings, generate_recommendations};
use crate::error::{OrchestrationError, OrchestrationResult};
use crate::llm::TextGenerator;
use crate::models::{AgentResult, AnalysisReport};
use futures::{FutureExt, StreamExt};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, Instrument};
use uuid::Uuid;

/// Tunables for an orchestration run.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Characters of document content given to each agent.
    pub content_limit: usize,
    /// Upper bound on each agent's run. `None` leaves it to the client timeout.
    pub agent_timeout: Option<Duration>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            content_limit: DEFAULT_CONTENT_LIMIT,
            agent_timeout: None,
        }
    }
}

/// A document queued for batch analysis.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub file_name: String,
    pub content: String,
}

/// Coordinates the six analysis agents over one shared client.
pub struct Orchestrator {
    client: Arc<dyn TextGenerator>,
    tasks: Vec<AgentTask>,
    agent_timeout: Option<Duration>,
}

impl Orchestrator {
    pub fn new(client: Arc<dyn TextGenerator>, config: OrchestratorConfig) -> Self {
        Self {
            client,
            tasks: registered_tasks(config.content_limit),
            agent_timeout: config.agent_timeout,
        }
    }

    /// Model behind the shared client.
    pub fn model_name(&self) -> &str {
        self.client.model_name()
    }

    /// Analyse one document with every agent.
    ///
    /// Only fails when the concurrent task set itself breaks down; agent
    /// failures are folded into the report as degraded results.
    #[instrument(skip_all, fields(file_name = %file_name))]
    pub async fn orchestrate(
        &self,
        document_content: &str,
        file_name: &str,
    ) -> OrchestrationResult<AnalysisReport> {
        let task_id = Uuid::new_v4();
        let start = Instant::now();

        info!("Starting multi-agent analysis {} for {}", task_id, file_name);

        let agent_results = self.run_agents(document_content, file_name).await?;

        let overall_risk = calculate_overall_risk(&agent_results);
        let key_findings = extract_key_findings(&agent_results);
        let recommendations = generate_recommendations(&agent_results);
        let execution_time_ms = elapsed_millis(start);

        info!(
            "Multi-agent analysis {} completed in {}ms: {}",
            task_id, execution_time_ms, overall_risk
        );

        Ok(AnalysisReport {
            task_id,
            agent_results,
            overall_risk,
            key_findings,
            recommendations,
            execution_time_ms,
        })
    }

    /// Analyse several documents, at most `concurrency` at a time.
    ///
    /// Results come back in input order.
    pub async fn orchestrate_many(
        &self,
        documents: &[SourceDocument],
        concurrency: usize,
    ) -> Vec<OrchestrationResult<AnalysisReport>> {
        futures::stream::iter(documents)
            .map(|doc| self.orchestrate(&doc.content, &doc.file_name))
            .buffered(concurrency.max(1))
            .collect()
            .await
    }

    /// Launch every agent, then collect results in registration order.
    async fn run_agents(
        &self,
        document_content: &str,
        file_name: &str,
    ) -> OrchestrationResult<Vec<AgentResult>> {
        let content: Arc<str> = Arc::from(document_content);
        let file_name: Arc<str> = Arc::from(file_name);

        let mut join_set = JoinSet::new();
        for (idx, task) in self.tasks.iter().copied().enumerate() {
            let client = Arc::clone(&self.client);
            let content = Arc::clone(&content);
            let file_name = Arc::clone(&file_name);
            let timeout = self.agent_timeout;

            join_set.spawn(async move {
                let started = Instant::now();
                let run = execute_agent(task, client.as_ref(), &content, &file_name, timeout);

                let result = match AssertUnwindSafe(run).catch_unwind().await {
                    Ok(Ok(result)) => result,
                    Ok(Err(failure)) => {
                        debug!("Recording degraded result for {}", failure.agent_type);
                        failure.into_degraded()
                    }
                    Err(panic) => {
                        let message = panic_message(panic.as_ref());
                        error!("Agent {} panicked: {}", task.agent_type(), message);
                        AgentResult::degraded(
                            task.agent_type(),
                            format!("agent task panicked: {message}"),
                            elapsed_millis(started),
                        )
                    }
                };

                (idx, result)
            }
            .in_current_span());
        }

        let mut slots: Vec<Option<AgentResult>> = vec![None; self.tasks.len()];
        while let Some(joined) = join_set.join_next().await {
            let (idx, result) = joined.map_err(|e| OrchestrationError::TaskJoin {
                detail: e.to_string(),
            })?;
            slots[idx] = Some(result);
        }

        self.tasks
            .iter()
            .zip(slots)
            .map(|(task, slot)| {
                slot.ok_or(OrchestrationError::MissingResult {
                    agent: task.agent_type(),
                })
            })
            .collect()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
