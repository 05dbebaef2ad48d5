//! OpenAI-compatible providers: embeddings, chat answers, transcription and vision

use async_trait::async_trait;
use base64::Engine as _;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{LlmConfig, OpenAiConfig, TranscriptionConfig, VisionConfig};
use crate::error::{Error, Result};
use crate::generation::PromptBuilder;

use super::embedding::EmbeddingProvider;
use super::llm::LlmProvider;
use super::retry::retry_request;
use super::transcription::Transcriber;
use super::vision::{ImageInput, VisionDescriber};

/// Shared HTTP client for an OpenAI-compatible API
pub struct OpenAiClient {
    client: Client,
    base_url: String,
    max_retries: u32,
}

impl OpenAiClient {
    /// Create a client; fails if no API key is configured
    pub fn new(config: &OpenAiConfig, timeout: Duration, max_retries: u32) -> Result<Self> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| Error::Config("Missing OpenAI API key (OPENAI_API_KEY)".to_string()))?;

        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Bearer {}", api_key))
            .map_err(|_| Error::Config("Invalid OpenAI API key".to_string()))?;
        headers.insert(AUTHORIZATION, auth);

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_retries,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// POST a JSON body and decode a JSON response, retrying failures
    async fn post_json<Req, Resp>(&self, label: &str, path: &str, body: &Req) -> Result<Resp>
    where
        Req: Serialize + Sync,
        Resp: for<'de> Deserialize<'de>,
    {
        let url = self.url(path);
        retry_request(label, self.max_retries, || async {
            let response = self.client.post(&url).json(body).send().await?;
            if !response.status().is_success() {
                let status = response.status().as_u16();
                let body = response.text().await.unwrap_or_default();
                return Err(Error::status(label, status, body));
            }
            Ok(response.json::<Resp>().await?)
        })
        .await
    }

    /// Run a chat completion and return the first choice's text
    async fn chat(&self, label: &str, request: &ChatRequest<'_>) -> Result<String> {
        let response: ChatResponse = self.post_json(label, "chat/completions", request).await?;
        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| Error::internal(format!("{}: response has no message content", label)))
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<serde_json::Value>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: MessageContent,
}

#[derive(Serialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
    detail: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// Embeddings via `/embeddings`
pub struct OpenAiEmbedder {
    client: Arc<OpenAiClient>,
    model: String,
    dimensions: usize,
}

impl OpenAiEmbedder {
    pub fn new(client: Arc<OpenAiClient>, model: String, dimensions: usize) -> Self {
        Self {
            client,
            model,
            dimensions,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut batch = self.embed_batch(&[text.to_string()]).await?;
        batch
            .pop()
            .ok_or_else(|| Error::embedding("Empty embedding response"))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let request = EmbeddingRequest {
            model: &self.model,
            input: texts,
        };
        let mut response: EmbeddingResponse = self
            .client
            .post_json("Embedding request", "embeddings", &request)
            .await
            .map_err(|e| Error::embedding(e.to_string()))?;

        if response.data.len() != texts.len() {
            return Err(Error::embedding(format!(
                "Got {} embeddings for {} inputs",
                response.data.len(),
                texts.len()
            )));
        }
        response.data.sort_by_key(|d| d.index);
        Ok(response.data.into_iter().map(|d| d.embedding).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn name(&self) -> &str {
        "openai"
    }
}

/// Answer generation via `/chat/completions`
pub struct OpenAiLlm {
    client: Arc<OpenAiClient>,
    model: String,
    temperature: f32,
}

impl OpenAiLlm {
    pub fn new(client: Arc<OpenAiClient>, config: &LlmConfig) -> Self {
        Self {
            client,
            model: config.generate_model.clone(),
            temperature: config.temperature,
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiLlm {
    async fn generate(&self, system_role: &str, context: &str, question: &str) -> Result<String> {
        tracing::info!("Generating answer with model: {}", self.model);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: MessageContent::Text(system_role.to_string()),
                },
                ChatMessage {
                    role: "user",
                    content: MessageContent::Text(PromptBuilder::build_user_prompt(context, question)),
                },
            ],
            temperature: Some(self.temperature),
            response_format: None,
        };
        self.client
            .chat("Chat completion", &request)
            .await
            .map_err(|e| Error::llm(e.to_string()))
    }

    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// Speech-to-text via `/audio/transcriptions`
pub struct OpenAiTranscriber {
    client: Arc<OpenAiClient>,
    model: String,
}

impl OpenAiTranscriber {
    pub fn new(client: Arc<OpenAiClient>, config: &TranscriptionConfig) -> Self {
        Self {
            client,
            model: config.model.clone(),
        }
    }
}

#[async_trait]
impl Transcriber for OpenAiTranscriber {
    async fn transcribe(&self, audio_path: &Path) -> Result<String> {
        let audio = tokio::fs::read(audio_path).await?;
        let file_name = audio_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio.mp3".to_string());
        let mime = mime_guess::from_path(audio_path)
            .first_or_octet_stream()
            .to_string();
        let url = self.client.url("audio/transcriptions");

        tracing::debug!("Transcribing {} ({} bytes)", file_name, audio.len());

        let response: TranscriptionResponse =
            retry_request("Transcription request", self.client.max_retries, || async {
                let part = reqwest::multipart::Part::bytes(audio.clone())
                    .file_name(file_name.clone())
                    .mime_str(&mime)?;
                let form = reqwest::multipart::Form::new()
                    .text("model", self.model.clone())
                    .part("file", part);

                let response = self.client.client.post(&url).multipart(form).send().await?;
                if !response.status().is_success() {
                    let status = response.status().as_u16();
                    let body = response.text().await.unwrap_or_default();
                    return Err(Error::status("Transcription request", status, body));
                }
                Ok(response.json::<TranscriptionResponse>().await?)
            })
            .await
            .map_err(|e| match e {
                Error::Transcription(_) => e,
                other => Error::Transcription(other.to_string()),
            })?;

        Ok(response.text)
    }

    fn name(&self) -> &str {
        "openai-whisper"
    }
}

/// The only shape a vision response may take
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ImageDescription {
    description: String,
}

/// Parse a structured vision response; any other shape is an error
fn parse_image_description(content: &str) -> Result<String> {
    serde_json::from_str::<ImageDescription>(content)
        .map(|d| d.description)
        .map_err(|e| Error::Vision(format!("Malformed description response: {}", e)))
}

fn description_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "json_schema",
        "json_schema": {
            "name": "image_description",
            "strict": true,
            "schema": {
                "type": "object",
                "properties": {
                    "description": { "type": "string" }
                },
                "required": ["description"],
                "additionalProperties": false
            }
        }
    })
}

/// Image description via a vision-capable chat model with structured output
pub struct OpenAiVision {
    client: Arc<OpenAiClient>,
    model: String,
    system_prompt: String,
    detail: String,
}

impl OpenAiVision {
    pub fn new(client: Arc<OpenAiClient>, config: &VisionConfig) -> Self {
        Self {
            client,
            model: config.model.clone(),
            system_prompt: config.system_prompt.clone(),
            detail: config.detail.clone(),
        }
    }

    fn user_parts(&self, images: &[ImageInput], instruction: &str) -> Vec<ContentPart> {
        let engine = base64::engine::general_purpose::STANDARD;
        let mut parts = Vec::with_capacity(images.len() + 1);
        parts.push(ContentPart::Text {
            text: instruction.to_string(),
        });
        for image in images {
            parts.push(ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: format!("data:{};base64,{}", image.mime_type, engine.encode(&image.bytes)),
                    detail: self.detail.clone(),
                },
            });
        }
        parts
    }
}

#[async_trait]
impl VisionDescriber for OpenAiVision {
    async fn describe(&self, images: &[ImageInput], instruction: &str) -> Result<String> {
        if images.is_empty() {
            return Err(Error::Vision("No images to describe".to_string()));
        }
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: MessageContent::Text(self.system_prompt.clone()),
                },
                ChatMessage {
                    role: "user",
                    content: MessageContent::Parts(self.user_parts(images, instruction)),
                },
            ],
            temperature: None,
            response_format: Some(description_schema()),
        };

        let content = self
            .client
            .chat("Vision request", &request)
            .await
            .map_err(|e| Error::Vision(e.to_string()))?;
        parse_image_description(&content)
    }

    fn name(&self) -> &str {
        "openai-vision"
    }
}
