//! Ollama chat adapter issuing requests directly to the local runtime.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{
    ChatMessage, ChatRequest, LanguageModel, LlmSettings, ModelCallError, http_client,
    transport_error,
};

/// Chat model served by an Ollama runtime.
pub struct OllamaChatModel {
    http: Client,
    base_url: String,
    model: String,
    temperature: f32,
}

impl OllamaChatModel {
    /// Build a client from provider settings.
    pub fn new(settings: &LlmSettings) -> Result<Self, ModelCallError> {
        Ok(Self {
            http: http_client(settings, "sds-digest/ollama")?,
            base_url: settings.base_url.clone(),
            model: settings.model.clone(),
            temperature: settings.temperature,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/chat", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Serialize)]
struct ChatBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<Value>,
    options: Value,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: OllamaMessage,
    done: bool,
}

#[derive(Debug, Deserialize)]
struct OllamaMessage {
    content: String,
}

#[async_trait]
impl LanguageModel for OllamaChatModel {
    async fn complete(&self, request: ChatRequest) -> Result<String, ModelCallError> {
        let body = ChatBody {
            model: &self.model,
            messages: &request.messages,
            stream: false,
            format: request.response_shape.map(|shape| shape.schema),
            options: json!({ "temperature": self.temperature }),
        };

        let response = self
            .http
            .post(self.endpoint())
            .json(&body)
            .send()
            .await
            .map_err(|error| transport_error(&self.base_url, error))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(ModelCallError::ProviderUnavailable(format!(
                "Ollama endpoint {} returned 404 (is model '{}' pulled?)",
                self.endpoint(),
                self.model
            )));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ModelCallError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: OllamaChatResponse = response.json().await.map_err(|error| {
            ModelCallError::InvalidEnvelope(format!("failed to decode Ollama response: {error}"))
        })?;

        if !body.done {
            return Err(ModelCallError::InvalidEnvelope(
                "Ollama response incomplete (streaming not supported)".into(),
            ));
        }

        Ok(body.message.content)
    }
}
