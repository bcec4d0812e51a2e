//! OpenAI-compatible chat completions adapter.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{
    ChatMessage, ChatRequest, LanguageModel, LlmSettings, ModelCallError, http_client,
    transport_error,
};

/// Chat model served by the OpenAI API or a compatible gateway.
pub struct OpenAiChatModel {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
}

impl OpenAiChatModel {
    /// Build a client from provider settings; an API key is mandatory.
    pub fn new(settings: &LlmSettings) -> Result<Self, ModelCallError> {
        let api_key = settings.api_key.clone().ok_or_else(|| {
            ModelCallError::ProviderUnavailable("OpenAI API key is not configured".into())
        })?;
        Ok(Self {
            http: http_client(settings, "sds-digest/openai")?,
            base_url: settings.base_url.clone(),
            api_key,
            model: settings.model.clone(),
            temperature: settings.temperature,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    temperature: f32,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl LanguageModel for OpenAiChatModel {
    async fn complete(&self, request: ChatRequest) -> Result<String, ModelCallError> {
        let response_format = request.response_shape.map(|shape| {
            json!({
                "type": "json_schema",
                "json_schema": {
                    "name": shape.name,
                    "schema": shape.schema,
                    "strict": false,
                }
            })
        });
        let body = CompletionBody {
            model: &self.model,
            temperature: self.temperature,
            messages: &request.messages,
            response_format,
        };

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(self.api_key.trim())
            .json(&body)
            .send()
            .await
            .map_err(|error| transport_error(&self.base_url, error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelCallError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: CompletionResponse = response.json().await.map_err(|error| {
            ModelCallError::InvalidEnvelope(format!("failed to decode OpenAI response: {error}"))
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                ModelCallError::InvalidEnvelope("OpenAI response contained no message".into())
            })
    }
}
