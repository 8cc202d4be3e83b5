use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::backend::common::constants::FALLBACK_API_KEY_ENV;
use crate::backend::common::errors::PanelError;
use crate::backend::panel_settings::PanelSettings;

const GEMINI_USER_AGENT: &str = "code-assistant-panel";
const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, Clone, PartialEq)]
pub enum ResponseFormat {
    Text,
    /// JSON constrained by a Gemini `responseSchema`.
    Json { schema: Value },
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub model: String,
    pub system_instruction: Option<String>,
    pub prompt: String,
    pub format: ResponseFormat,
}

/// One non-streaming completion against a generative model.
#[async_trait]
pub trait AiBackend: Send + Sync {
    async fn generate(&self, request: GenerationRequest) -> Result<String, PanelError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    response_mime_type: &'static str,
    response_schema: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    prompt_feedback: Option<GeminiPromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

fn text_content(role: Option<&str>, text: &str) -> GeminiContent {
    GeminiContent {
        role: role.map(ToOwned::to_owned),
        parts: vec![GeminiPart {
            text: Some(text.to_string()),
        }],
    }
}

fn build_request_body(request: &GenerationRequest) -> GeminiRequest {
    let generation_config = match &request.format {
        ResponseFormat::Text => None,
        ResponseFormat::Json { schema } => Some(GeminiGenerationConfig {
            response_mime_type: "application/json",
            response_schema: schema.clone(),
        }),
    };

    GeminiRequest {
        contents: vec![text_content(Some("user"), &request.prompt)],
        system_instruction: request
            .system_instruction
            .as_deref()
            .map(|text| text_content(None, text)),
        generation_config,
    }
}

fn extract_response_text(response: GeminiResponse) -> Result<String, PanelError> {
    if let Some(reason) = response
        .prompt_feedback
        .and_then(|feedback| feedback.block_reason)
    {
        return Err(PanelError::AiApi(format!("prompt was blocked ({reason}).")));
    }

    let Some(candidate) = response.candidates.into_iter().next() else {
        return Err(PanelError::AiApi(
            "the response did not contain any candidates.".to_string(),
        ));
    };

    let texts = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    if texts.is_empty() {
        let reason = candidate
            .finish_reason
            .unwrap_or_else(|| "unknown".to_string());
        return Err(PanelError::AiApi(format!(
            "the response did not contain valid text (finish reason: {reason})."
        )));
    }
    Ok(texts.concat())
}

fn resolve_api_key(
    primary_env: &str,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<String, PanelError> {
    [primary_env, FALLBACK_API_KEY_ENV]
        .into_iter()
        .filter_map(|name| lookup(name))
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
        .ok_or_else(|| {
            PanelError::AiApi(format!(
                "no API key found; set {primary_env} or {FALLBACK_API_KEY_ENV}."
            ))
        })
}

/// `generateContent` client for the Gemini REST API.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    api_key_env: String,
    env_lookup: fn(&str) -> Option<String>,
}

fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

impl GeminiClient {
    pub fn new(settings: &PanelSettings) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .user_agent(GEMINI_USER_AGENT)
            .build()
            .map_err(|error| format!("Failed to initialize Gemini HTTP client: {error}"))?;
        Ok(Self {
            client,
            base_url: settings.api_base_url.clone(),
            api_key_env: settings.api_key_env.clone(),
            env_lookup: process_env,
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }
}

#[async_trait]
impl AiBackend for GeminiClient {
    async fn generate(&self, request: GenerationRequest) -> Result<String, PanelError> {
        // Read at call time so a key exported after startup is picked up.
        let api_key = resolve_api_key(&self.api_key_env, self.env_lookup)?;
        let url = self.endpoint(&request.model);
        let body = build_request_body(&request);

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, api_key)
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|error| PanelError::AiApi(format!("failed to reach the Gemini API: {error}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body_line = body.lines().next().unwrap_or_default().trim().to_string();
            let message = if body_line.is_empty() {
                format!("request failed with status {}.", status.as_u16())
            } else {
                format!("request failed with status {}: {}", status.as_u16(), body_line)
            };
            return Err(PanelError::AiApi(message));
        }

        let parsed = response.json::<GeminiResponse>().await.map_err(|error| {
            PanelError::AiApi(format!("failed to parse the Gemini response payload: {error}"))
        })?;
        extract_response_text(parsed)
    }
}
