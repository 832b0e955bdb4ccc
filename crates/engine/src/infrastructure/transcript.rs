//! LLM transcript logging decorator.
//!
//! Appends every prompt and reply (with duration and token usage) to a plain
//! text log so a session's narration can be inspected after the fact.

use async_trait::async_trait;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::io::AsyncWriteExt;

use crate::infrastructure::ports::{ClockPort, LlmError, LlmPort, LlmRequest, LlmResponse};

/// Wraps an LLM client and records its traffic in a transcript file.
pub struct TranscriptLlmClient {
    inner: Arc<dyn LlmPort>,
    path: PathBuf,
    clock: Arc<dyn ClockPort>,
}

impl TranscriptLlmClient {
    /// Transcript goes to `<logs_dir>/<timestamp>.log`.
    pub fn new(inner: Arc<dyn LlmPort>, logs_dir: &Path, clock: Arc<dyn ClockPort>) -> Self {
        let file_name = format!("{}.log", clock.now().format("%Y-%m-%d_%H-%M-%S"));
        Self {
            inner,
            path: logs_dir.join(file_name),
            clock,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn append(&self, entry: &str) {
        if let Some(parent) = self.path.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                tracing::warn!(error = %e, "Failed to create transcript directory");
                return;
            }
        }

        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await;

        let result = match file {
            Ok(mut file) => file.write_all(entry.as_bytes()).await,
            Err(e) => Err(e),
        };

        if let Err(e) = result {
            tracing::warn!(error = %e, path = %self.path.display(), "Failed to write LLM transcript");
        }
    }
}

fn format_request(request: &LlmRequest) -> String {
    let mut out = String::new();
    if let Some(system) = &request.system_prompt {
        let _ = writeln!(out, "[system]\n{}", system);
    }
    for message in &request.messages {
        let _ = writeln!(out, "[{}]\n{}", message.role.as_str(), message.content);
    }
    out
}

fn format_outcome(result: &Result<LlmResponse, LlmError>, seconds: f64) -> String {
    match result {
        Ok(response) => {
            let usage = response
                .usage
                .map(|u| {
                    format!(
                        "prompt={} completion={} total={}",
                        u.prompt_tokens, u.completion_tokens, u.total_tokens
                    )
                })
                .unwrap_or_else(|| "n/a".to_string());
            format!(
                "---- response in {:.2}s (tokens: {})\n{}\n",
                seconds, usage, response.content
            )
        }
        Err(e) => format!("---- failed after {:.2}s: {}\n", seconds, e),
    }
}

#[async_trait]
impl LlmPort for TranscriptLlmClient {
    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse, LlmError> {
        let mut entry = format!("==== {}\n", self.clock.now().to_rfc3339());
        entry.push_str(&format_request(&request));

        let started = Instant::now();
        let result = self.inner.generate(request).await;
        let seconds = started.elapsed().as_secs_f64();

        entry.push_str(&format_outcome(&result, seconds));
        entry.push('\n');
        self.append(&entry).await;

        tracing::debug!(duration_ms = (seconds * 1000.0) as u64, "LLM call recorded");
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::clock::FixedClock;
    use crate::infrastructure::ports::{ChatMessage, MockLlmPort, TokenUsage};
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_transcript_records_prompt_and_reply() {
        let dir = TempDir::new().unwrap();
        let clock = Arc::new(FixedClock(Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()));

        let mut inner = MockLlmPort::new();
        inner.expect_generate().times(1).returning(|_| {
            Ok(LlmResponse {
                content: "You see a cave.".to_string(),
                finish_reason: crate::infrastructure::ports::FinishReason::Stop,
                usage: Some(TokenUsage {
                    prompt_tokens: 12,
                    completion_tokens: 4,
                    total_tokens: 16,
                }),
            })
        });

        let client = TranscriptLlmClient::new(Arc::new(inner), dir.path(), clock);
        let request = LlmRequest::new(vec![ChatMessage::user("Look around")])
            .with_system_prompt("You are the game master.");

        let response = client.generate(request).await.unwrap();
        assert_eq!(response.content, "You see a cave.");

        assert!(client.path().ends_with("2024-03-01_09-00-00.log"));
        let log = std::fs::read_to_string(client.path()).unwrap();
        assert!(log.contains("[system]\nYou are the game master."));
        assert!(log.contains("[user]\nLook around"));
        assert!(log.contains("total=16"));
        assert!(log.contains("You see a cave."));
    }

    #[tokio::test]
    async fn test_transcript_passes_errors_through() {
        let dir = TempDir::new().unwrap();
        let clock = Arc::new(FixedClock(Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()));

        let mut inner = MockLlmPort::new();
        inner
            .expect_generate()
            .returning(|_| Err(LlmError::RequestFailed("503: overloaded".to_string())));

        let client = TranscriptLlmClient::new(Arc::new(inner), dir.path(), clock);
        let result = client.generate(LlmRequest::new(vec![])).await;

        assert!(matches!(result, Err(LlmError::RequestFailed(_))));
        let log = std::fs::read_to_string(client.path()).unwrap();
        assert!(log.contains("failed after"));
    }
}
