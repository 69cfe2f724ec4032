//! Ingestion Readiness: gates the editor on the external producer's output.
//!
//! States: `Pending → Processing → Completed | Failed`.
//! - `Completed` needs both a ready status and a payload with content; a ready
//!   flag over empty data is still processing.
//! - An explicit failure from the producer ends polling immediately.
//! - Reaching `max_attempts` without a terminal status synthesizes `Failed`.
//! - Terminal states are final: the machine ignores further observations.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cv::assemble;
use crate::ingestion::producer_client::ProducerError;

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadinessStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// What the readiness consumer sees.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadinessState {
    pub status: ReadinessStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub attempts: u32,
}

impl Default for ReadinessState {
    fn default() -> Self {
        Self {
            status: ReadinessStatus::Pending,
            error: None,
            attempts: 0,
        }
    }
}

/// Status as reported by the producer, before gating.
#[derive(Debug, Clone, PartialEq)]
pub enum ProducerStatus {
    Pending,
    Processing,
    Ready,
    Failed,
}

#[derive(Debug, Clone)]
pub struct StatusReport {
    pub status: ProducerStatus,
    pub payload: Option<Value>,
    pub message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ReadinessConfig {
    pub poll_interval: Duration,
    pub max_attempts: u32,
}

/// Source of producer status. `ProducerClient` in production, fakes in tests.
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn fetch_status(&self, job_id: &str) -> Result<StatusReport, ProducerError>;
}

// ────────────────────────────────────────────────────────────────────────────
// State machine
// ────────────────────────────────────────────────────────────────────────────

pub struct ReadinessMachine {
    max_attempts: u32,
    state: ReadinessState,
    payload: Option<Value>,
}

impl ReadinessMachine {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            state: ReadinessState::default(),
            payload: None,
        }
    }

    pub fn state(&self) -> &ReadinessState {
        &self.state
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.state.status,
            ReadinessStatus::Completed | ReadinessStatus::Failed
        )
    }

    /// Feeds one poll result into the machine and returns the resulting status.
    /// Transport errors count as an attempt but do not change the status.
    pub fn observe(&mut self, report: Result<StatusReport, ProducerError>) -> ReadinessStatus {
        if self.is_terminal() {
            return self.state.status;
        }
        self.state.attempts += 1;

        match report {
            Ok(report) => match report.status {
                ProducerStatus::Failed => {
                    let message = report
                        .message
                        .filter(|m| !m.trim().is_empty())
                        .unwrap_or_else(|| "CV optimization failed".to_string());
                    self.fail(message);
                }
                ProducerStatus::Ready if has_content(report.payload.as_ref()) => {
                    self.state.status = ReadinessStatus::Completed;
                    self.payload = report.payload;
                }
                ProducerStatus::Ready => {
                    debug!("Producer reported ready without data; still waiting");
                    self.state.status = ReadinessStatus::Processing;
                }
                ProducerStatus::Processing => self.state.status = ReadinessStatus::Processing,
                ProducerStatus::Pending => {}
            },
            Err(e) => warn!(
                "Readiness poll {}/{} failed: {e}",
                self.state.attempts, self.max_attempts
            ),
        }

        if !self.is_terminal() && self.state.attempts >= self.max_attempts {
            self.fail(format!(
                "Timed out waiting for the optimized CV after {} attempts",
                self.max_attempts
            ));
        }
        self.state.status
    }

    pub fn take_payload(&mut self) -> Option<Value> {
        self.payload.take()
    }

    fn fail(&mut self, message: String) {
        self.state.status = ReadinessStatus::Failed;
        self.state.error = Some(message);
    }
}

/// A payload is usable when it normalizes into a document with some content.
/// Status fields and other envelope noise do not count.
fn has_content(payload: Option<&Value>) -> bool {
    payload.is_some_and(|p| !assemble(p).is_empty())
}

// ────────────────────────────────────────────────────────────────────────────
// Poll loop
// ────────────────────────────────────────────────────────────────────────────

/// Polls `source` until a terminal state, publishing every intermediate state on
/// `state_tx`. The terminal state is returned unpublished so the caller can make
/// the result available before announcing it. Returns `None` when cancelled.
pub async fn run_readiness_poll(
    source: Arc<dyn StatusSource>,
    job_id: String,
    config: ReadinessConfig,
    state_tx: &watch::Sender<ReadinessState>,
    cancel: CancellationToken,
) -> Option<(ReadinessState, Option<Value>)> {
    let mut machine = ReadinessMachine::new(config.max_attempts);
    info!("Polling producer job {job_id} (max {} attempts)", config.max_attempts);

    loop {
        let report = tokio::select! {
            biased;
            _ = cancel.cancelled() => return None,
            report = source.fetch_status(&job_id) => report,
        };
        let status = machine.observe(report);

        if machine.is_terminal() {
            let state = machine.state().clone();
            match status {
                ReadinessStatus::Completed => info!("Producer job {job_id} completed"),
                _ => warn!(
                    "Producer job {job_id} failed: {}",
                    state.error.as_deref().unwrap_or("unknown error")
                ),
            }
            return Some((state, machine.take_payload()));
        }
        state_tx.send_replace(machine.state().clone());

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return None,
            _ = tokio::time::sleep(config.poll_interval) => {}
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
