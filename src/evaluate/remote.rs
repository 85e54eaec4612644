use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{ApiKey, EvaluatorConfig};
use crate::error::Result;
use super::{Evaluator, common::{
    ChatCompletionRequest, ChatCompletionResponse, EvaluationRequest, EvaluationResult,
    EvaluationSource, build_messages, decode_verdict, degraded_result,
}, local::score_locally};

/// Reasons the remote path produced no completion. Never leaves this module.
#[derive(Error, Debug)]
enum RemoteFailure {
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("service error: {0}")]
    Service(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Remote evaluation through a chat-completion endpoint with local fallback
pub struct RemoteEvaluator {
    client: Client,
    config: EvaluatorConfig,
    api_key: ApiKey,
}

impl RemoteEvaluator {
    pub fn new(config: EvaluatorConfig, api_key: ApiKey) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self::with_client(config, api_key, client))
    }

    pub fn with_client(config: EvaluatorConfig, api_key: ApiKey, client: Client) -> Self {
        Self {
            client,
            config,
            api_key,
        }
    }

    /// Send the evaluation prompt and return the completion text
    async fn request_completion(
        &self,
        request: &EvaluationRequest,
    ) -> std::result::Result<String, RemoteFailure> {
        let body = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: build_messages(request),
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        debug!("Sending evaluation request to: {}", self.config.endpoint);

        let response = self.client
            .post(&self.config.endpoint)
            .bearer_auth(self.api_key.expose())
            .json(&body)
            .send()
            .await
            .map_err(|e| RemoteFailure::Transport(e.to_string()))?;

        let status = response.status();
        let text = response.text().await
            .map_err(|e| RemoteFailure::Transport(format!("Failed to read response body: {}", e)))?;

        let parsed: ChatCompletionResponse = match serde_json::from_str(&text) {
            Ok(parsed) => parsed,
            Err(e) if status.is_success() => {
                return Err(RemoteFailure::InvalidResponse(format!("{}: {}", e, text)));
            }
            Err(_) => {
                return Err(RemoteFailure::Service(format!("HTTP {}: {}", status, text)));
            }
        };

        if let Some(content) = parsed.first_content() {
            debug!("Raw evaluation response: {}", content);
            return Ok(content.to_string());
        }

        if let Some(error) = parsed.error {
            return Err(RemoteFailure::Service(error.to_string()));
        }

        if !status.is_success() {
            return Err(RemoteFailure::Service(format!("HTTP {}", status)));
        }

        Err(RemoteFailure::InvalidResponse("no completion in response".to_string()))
    }
}

#[async_trait]
impl Evaluator for RemoteEvaluator {
    async fn evaluate_detailed(&self, request: &EvaluationRequest) -> (EvaluationResult, EvaluationSource) {
        let content = match self.request_completion(request).await {
            Ok(content) => content,
            Err(failure) => {
                warn!("Remote evaluation failed, scoring locally: {}", failure);
                let result = score_locally(&request.user_translation, &request.reference_target);
                return (result, EvaluationSource::Local);
            }
        };

        match decode_verdict(&content, &request.reference_target) {
            Ok(result) => {
                info!("Remote evaluation: score {} ({})", result.score, result.rating);
                (result, EvaluationSource::Remote)
            }
            Err(e) => {
                warn!("Evaluation reply is not structured ({}), keeping raw text", e);
                (degraded_result(&content, &request.reference_target), EvaluationSource::Degraded)
            }
        }
    }
}
