use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::ProviderConfig;
use crate::error::{ProviderError, RaghuError, Result};
use crate::llm::prompts;
use crate::requests::FarmingRequest;

/// Advice client backed by the Gemini `generateContent` REST endpoint.
///
/// One request in, one text out: no streaming and no conversation state.
/// Network failures are retried up to `max_retries` times with exponential
/// backoff; error statuses are returned straight away.
pub struct GeminiClient {
    client: Client,
    api_key: SecretString,
    base_url: String,
    model: String,
    max_retries: usize,
    retry_backoff: Duration,
}

// -- generateContent request/response types ---

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: Option<ErrorBody>,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

impl GeminiClient {
    pub fn new(config: &ProviderConfig, api_key: SecretString) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|e| RaghuError::Config(format!("failed to create HTTP client: {e}")))?;

        info!(
            model = %config.model,
            base_url = %config.base_url,
            timeout_secs = config.timeout_secs,
            max_retries = config.max_retries,
            "Gemini client initialized"
        );

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            max_retries: config.max_retries,
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
        })
    }

    /// Send the advice prompt, retrying transport failures.
    pub async fn generate(
        &self,
        request: &FarmingRequest,
    ) -> std::result::Result<String, ProviderError> {
        let body = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part {
                    text: prompts::build_prompt(request),
                }],
            }],
        };
        let body = &body;

        debug!(
            id = %request.id,
            model = %self.model,
            language = request.language.as_str(),
            "invoking Gemini API"
        );

        let backoff = ExponentialBuilder::default()
            .with_min_delay(self.retry_backoff)
            .with_max_times(self.max_retries);

        (|| async move { self.send_once(body).await })
            .retry(backoff)
            .when(|e| matches!(e, ProviderError::Transport(_)))
            .notify(|e, delay| {
                warn!(err = %e, retry_in = ?delay, "Gemini request failed, retrying");
            })
            .await
    }

    async fn send_once(
        &self,
        body: &GenerateRequest,
    ) -> std::result::Result<String, ProviderError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        // reqwest errors carry the request URL, which holds the key
        let resp = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.expose_secret())])
            .json(body)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.without_url().to_string()))?;

        let status = resp.status();
        let raw = resp
            .text()
            .await
            .map_err(|e| ProviderError::Transport(e.without_url().to_string()))?;

        debug!(status = %status, body = %raw, "Gemini raw response");

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&raw)
                .ok()
                .and_then(|r| r.error)
                .map(|e| e.message)
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string());

            warn!(status = %status, error = %message, "Gemini API error");

            return Err(ProviderError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GenerateResponse = serde_json::from_str(&raw).map_err(|e| {
            warn!(err = %e, "unparseable Gemini response");
            ProviderError::MissingText
        })?;

        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text)
            .filter(|t| !t.is_empty())
            .ok_or(ProviderError::MissingText)?;

        info!(response_len = text.len(), model = %self.model, "Gemini response received");
        Ok(text)
    }
}
