use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::config::OpenAiConfig;
use crate::error::ApiError;

/// Seam over the completion API so handlers and tests never depend on the
/// real endpoint.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, ApiError>;
}

const GENERIC_FAILURE: &str = "Error al procesar la consulta de IA (Genérico)";

pub struct OpenAiClient {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(config: &OpenAiConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

#[derive(Deserialize)]
struct UpstreamErrorBody {
    error: UpstreamErrorDetail,
}

#[derive(Deserialize)]
struct UpstreamErrorDetail {
    message: String,
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    /// Single-turn request carrying only the current prompt. One attempt,
    /// no retry; a structured remote error is surfaced verbatim.
    async fn complete(&self, prompt: &str) -> Result<String, ApiError> {
        let body = CompletionRequest {
            model: &self.model,
            messages: vec![WireMessage {
                role: "user",
                content: prompt,
            }],
        };

        let res = self
            .http
            .post(format!("{}/v1/chat/completions", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "completion request failed");
                ApiError::Upstream(GENERIC_FAILURE.to_string())
            })?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            if let Ok(parsed) = serde_json::from_str::<UpstreamErrorBody>(&text) {
                error!(%status, message = %parsed.error.message, "completion api error");
                return Err(ApiError::Upstream(parsed.error.message));
            }
            error!(%status, "completion api error");
            return Err(ApiError::Upstream(GENERIC_FAILURE.to_string()));
        }

        let parsed: CompletionResponse = res.json().await.map_err(|e| {
            error!(error = %e, "malformed completion response");
            ApiError::Upstream(GENERIC_FAILURE.to_string())
        })?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| ApiError::Upstream(GENERIC_FAILURE.to_string()))?;

        debug!(model = %self.model, "completion received");
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn make_client(base: &str) -> OpenAiClient {
        OpenAiClient::new(&OpenAiConfig {
            api_key: "sk-test".into(),
            api_base: base.into(),
            model: "gpt-3.5-turbo".into(),
        })
    }

    #[tokio::test]
    async fn complete_extracts_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({
                "model": "gpt-3.5-turbo",
                "messages": [{"role": "user", "content": "hi"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "hello"}}]
            })))
            .mount(&server)
            .await;

        let client = make_client(&server.uri());
        let content = client.complete("hi").await.unwrap();
        assert_eq!(content, "hello");
    }

    #[tokio::test]
    async fn complete_surfaces_structured_remote_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "error": {"message": "You exceeded your current quota", "type": "insufficient_quota"}
            })))
            .mount(&server)
            .await;

        let client = make_client(&server.uri());
        let err = client.complete("hi").await.unwrap_err();
        match err {
            ApiError::Upstream(msg) => assert_eq!(msg, "You exceeded your current quota"),
            other => panic!("expected Upstream, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn complete_falls_back_to_generic_on_unstructured_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let client = make_client(&server.uri());
        let err = client.complete("hi").await.unwrap_err();
        match err {
            ApiError::Upstream(msg) => assert_eq!(msg, GENERIC_FAILURE),
            other => panic!("expected Upstream, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn complete_rejects_empty_choices() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"choices": []})),
            )
            .mount(&server)
            .await;

        let client = make_client(&server.uri());
        assert!(client.complete("hi").await.is_err());
    }
}
