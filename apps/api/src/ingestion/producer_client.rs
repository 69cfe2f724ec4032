//! Producer Client: reads job status from the external CV optimization workflow.
//!
//! The producer's response shape has drifted over time, so status, payload and
//! message are each looked up under several keys. A payload delivered as a JSON
//! string is decoded before it reaches the readiness machine, except on failed
//! jobs, where the payload is never read as a CV.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::cv::fields::{resolve, resolve_opt};
use crate::ingestion::readiness::{ProducerStatus, StatusReport, StatusSource};

const REQUEST_TIMEOUT_SECS: u64 = 30;

const STATUS_KEYS: &[&str] = &["status", "state", "jobStatus"];
const PAYLOAD_KEYS: &[&str] = &["data", "result", "payload", "optimizedCv", "optimized_cv", "output"];
const MESSAGE_KEYS: &[&str] = &["error", "message", "errorMessage"];

#[derive(Debug, Error)]
pub enum ProducerError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Clone)]
pub struct ProducerClient {
    client: Client,
    base_url: String,
}

impl ProducerClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ProducerError> {
        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl StatusSource for ProducerClient {
    async fn fetch_status(&self, job_id: &str) -> Result<StatusReport, ProducerError> {
        let url = format!("{}/jobs/{job_id}", self.base_url);
        let response = self.client.get(&url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProducerError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body: Value = response.json().await?;
        let report = parse_status_report(&body)?;
        debug!("Producer job {job_id} reported {:?}", report.status);
        Ok(report)
    }
}

/// Interprets one producer response body.
pub fn parse_status_report(body: &Value) -> Result<StatusReport, ProducerError> {
    let status = match resolve(body, STATUS_KEYS).and_then(Value::as_str) {
        Some(s) => parse_status(s),
        None if body.get("ready").and_then(Value::as_bool) == Some(true) => ProducerStatus::Ready,
        None => ProducerStatus::Pending,
    };

    let mut message = match resolve(body, MESSAGE_KEYS) {
        Some(err @ Value::Object(_)) => resolve_opt(err, &["message"]),
        Some(_) => resolve_opt(body, MESSAGE_KEYS),
        None => None,
    };

    let payload = match resolve(body, PAYLOAD_KEYS) {
        // A failed job's payload is diagnostics, not a CV; text there is the
        // only explanation some producers give.
        Some(raw) if status == ProducerStatus::Failed => {
            if message.is_none() {
                message = raw.as_str().map(str::to_string);
            }
            None
        }
        Some(Value::String(raw)) => Some(serde_json::from_str(raw)?),
        Some(value) => Some(value.clone()),
        None => None,
    };

    Ok(StatusReport {
        status,
        payload,
        message,
    })
}

fn parse_status(raw: &str) -> ProducerStatus {
    match raw.trim().to_lowercase().as_str() {
        "completed" | "complete" | "done" | "ready" | "success" | "succeeded" | "finished" => {
            ProducerStatus::Ready
        }
        "failed" | "failure" | "error" | "errored" | "cancelled" | "canceled" => {
            ProducerStatus::Failed
        }
        "processing" | "running" | "in_progress" | "in-progress" | "started" | "active" => {
            ProducerStatus::Processing
        }
        _ => ProducerStatus::Pending,
    }
}
