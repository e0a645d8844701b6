//! In-process generator used by unit tests.

use crate::error::LlmError;
use crate::llm::client::{GenerationRequest, TextGenerator};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone)]
enum Outcome {
    Reply(String),
    Fail(String),
    Panic,
}

#[derive(Debug, Clone)]
struct Script {
    delay: Duration,
    outcome: Outcome,
}

/// Answers each request according to a script keyed by request label.
#[derive(Default)]
pub struct ScriptedGenerator {
    scripts: HashMap<String, Script>,
    calls: AtomicUsize,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, label: &str, body: impl Into<String>) -> Self {
        self.reply_after(label, body, Duration::ZERO)
    }

    pub fn reply_after(mut self, label: &str, body: impl Into<String>, delay: Duration) -> Self {
        self.scripts.insert(
            label.to_string(),
            Script {
                delay,
                outcome: Outcome::Reply(body.into()),
            },
        );
        self
    }

    pub fn fail(self, label: &str, message: &str) -> Self {
        self.fail_after(label, message, Duration::ZERO)
    }

    pub fn fail_after(mut self, label: &str, message: &str, delay: Duration) -> Self {
        self.scripts.insert(
            label.to_string(),
            Script {
                delay,
                outcome: Outcome::Fail(message.to_string()),
            },
        );
        self
    }

    pub fn panic_on(mut self, label: &str) -> Self {
        self.scripts.insert(
            label.to_string(),
            Script {
                delay: Duration::ZERO,
                outcome: Outcome::Panic,
            },
        );
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        let script = self
            .scripts
            .get(&request.label)
            .cloned()
            .ok_or_else(|| LlmError::Request(format!("no script for {}", request.label)))?;

        if !script.delay.is_zero() {
            tokio::time::sleep(script.delay).await;
        }

        match script.outcome {
            Outcome::Reply(body) => Ok(body),
            Outcome::Fail(message) => Err(LlmError::Request(message)),
            Outcome::Panic => panic!("scripted panic for {}", request.label),
        }
    }

    fn model_name(&self) -> &str {
        "scripted-model"
    }
}
