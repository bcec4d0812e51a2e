//! Language-model capability shared by every pipeline stage.
//!
//! Stages depend on the [`LanguageModel`] trait rather than on a concrete provider, so swapping
//! OpenAI for a local Ollama runtime (or a scripted stub in tests) is a constructor argument.
//! Two calling styles are layered on the single `complete` primitive:
//!
//! - free text: [`LanguageModel::complete`] with no response shape;
//! - shape-constrained: [`complete_typed`] derives a JSON Schema from the target type with
//!   `schemars`, asks the provider to decode against it, and fails with
//!   [`MalformedModelResponseError`] when the answer does not deserialize.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use thiserror::Error;

mod ollama;
mod openai;

pub use ollama::OllamaChatModel;
pub use openai::OpenAiChatModel;

/// Errors raised by the transport or provider while executing a model call.
#[derive(Debug, Error)]
pub enum ModelCallError {
    /// Provider could not be reached (connection refused, DNS, timeout).
    #[error("Model provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider answered with a non-success status (auth, rate limit, server error).
    #[error("Model provider returned {status}: {body}")]
    Status {
        /// HTTP status code returned by the provider.
        status: u16,
        /// Response body associated with the failure.
        body: String,
    },
    /// Provider response envelope could not be decoded.
    #[error("Malformed provider envelope: {0}")]
    InvalidEnvelope(String),
    /// The blocking bridge could not start its runtime.
    #[error("Failed to start blocking runtime: {0}")]
    Runtime(String),
}

/// A shape-constrained answer did not match the requested type.
#[derive(Debug, Error)]
#[error("Model response did not match the `{shape}` shape: {reason}")]
pub struct MalformedModelResponseError {
    /// Name of the requested response shape.
    pub shape: String,
    /// Decoder diagnostic.
    pub reason: String,
}

/// Failure modes of [`complete_typed`].
#[derive(Debug, Error)]
pub enum TypedCompletionError {
    /// The underlying call failed before a response was available.
    #[error(transparent)]
    Call(#[from] ModelCallError),
    /// The response arrived but could not be decoded into the requested shape.
    #[error(transparent)]
    Malformed(#[from] MalformedModelResponseError),
}

/// Role attached to each chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// Instruction message.
    System,
    /// End-user message.
    User,
}

/// A single chat message sent to the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    /// Message author.
    pub role: ChatRole,
    /// Message body.
    pub content: String,
}

impl ChatMessage {
    /// Build a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    /// Build a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// JSON Schema the provider should constrain its answer to.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseShape {
    /// Schema title, used by providers that require a named format.
    pub name: String,
    /// JSON Schema document.
    pub schema: Value,
}

impl ResponseShape {
    /// Derive the response shape for `T`.
    pub fn of<T: JsonSchema>() -> Self {
        let name = T::schema_name();
        let schema = serde_json::to_value(schemars::schema_for!(T)).unwrap_or_else(|error| {
            tracing::warn!(shape = %name, %error, "Response schema failed to serialize; sending a bare object schema");
            json!({ "type": "object" })
        });
        Self { name, schema }
    }
}

/// Request passed to a [`LanguageModel`].
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    /// Ordered conversation for this call.
    pub messages: Vec<ChatMessage>,
    /// Optional shape for constrained decoding.
    pub response_shape: Option<ResponseShape>,
}

impl ChatRequest {
    /// Free-text request.
    pub fn text(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            response_shape: None,
        }
    }
}

/// Interface implemented by language-model backends.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Execute one chat completion and return the assistant's text.
    async fn complete(&self, request: ChatRequest) -> Result<String, ModelCallError>;
}

/// Ask `model` for an answer decoded into `T`.
pub async fn complete_typed<T>(
    model: &dyn LanguageModel,
    messages: Vec<ChatMessage>,
) -> Result<T, TypedCompletionError>
where
    T: DeserializeOwned + JsonSchema,
{
    let shape = ResponseShape::of::<T>();
    let shape_name = shape.name.clone();
    let raw = model
        .complete(ChatRequest {
            messages,
            response_shape: Some(shape),
        })
        .await?;

    serde_json::from_str(raw.trim()).map_err(|error| {
        tracing::warn!(shape = %shape_name, %error, "Typed model response failed to decode");
        TypedCompletionError::Malformed(MalformedModelResponseError {
            shape: shape_name,
            reason: error.to_string(),
        })
    })
}

/// Drive `future` to completion on a private current-thread runtime.
///
/// Backs the `*_blocking` forms of the pipeline components. Fails with
/// [`ModelCallError::Runtime`] when called from within an async runtime.
pub fn block_on<F: Future>(future: F) -> Result<F::Output, ModelCallError> {
    if tokio::runtime::Handle::try_current().is_ok() {
        return Err(ModelCallError::Runtime(
            "blocking call made from inside an async runtime".to_string(),
        ));
    }
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|error| ModelCallError::Runtime(error.to_string()))?;
    Ok(runtime.block_on(future))
}

/// Supported language-model backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LlmProvider {
    /// Hosted OpenAI (or any OpenAI-compatible) chat completions API.
    OpenAI,
    /// Local Ollama runtime.
    Ollama,
}

impl LlmProvider {
    /// Lowercase label used in logs and diagnostics.
    pub fn label(self) -> &'static str {
        match self {
            Self::OpenAI => "openai",
            Self::Ollama => "ollama",
        }
    }
}

impl std::str::FromStr for LlmProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "ollama" => Ok(Self::Ollama),
            _ => Err(()),
        }
    }
}

/// Provider-agnostic settings consumed by [`build_language_model`].
#[derive(Debug, Clone)]
pub struct LlmSettings {
    /// Backend to talk to.
    pub provider: LlmProvider,
    /// Model identifier understood by the backend.
    pub model: String,
    /// Base URL of the backend.
    pub base_url: String,
    /// Bearer token, when the backend requires one.
    pub api_key: Option<String>,
    /// Sampling temperature.
    pub temperature: f32,
    /// Transport timeout per call.
    pub timeout: Duration,
}

/// Build a language model for the configured provider.
pub fn build_language_model(
    settings: &LlmSettings,
) -> Result<Arc<dyn LanguageModel>, ModelCallError> {
    tracing::info!(
        provider = settings.provider.label(),
        model = %settings.model,
        "Initializing language model"
    );
    let model: Arc<dyn LanguageModel> = match settings.provider {
        LlmProvider::OpenAI => Arc::new(OpenAiChatModel::new(settings)?),
        LlmProvider::Ollama => Arc::new(OllamaChatModel::new(settings)?),
    };
    Ok(model)
}

/// Build the shared reqwest client used by the provider adapters.
fn http_client(settings: &LlmSettings, agent: &str) -> Result<reqwest::Client, ModelCallError> {
    reqwest::Client::builder()
        .user_agent(agent)
        .timeout(settings.timeout)
        .build()
        .map_err(|error| {
            ModelCallError::ProviderUnavailable(format!("failed to build HTTP client: {error}"))
        })
}

/// Map a reqwest send failure into the provider taxonomy.
fn transport_error(base_url: &str, error: reqwest::Error) -> ModelCallError {
    ModelCallError::ProviderUnavailable(format!("failed to reach {base_url}: {error}"))
}
