use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use super::settings_scope::{
    clamp_timeout_ms, normalize_ignore_globs, normalize_model_name, normalize_optional_text,
};
use crate::backend::common::constants::{
    API_BASE_URL_ENV, DEFAULT_AI_REQUEST_TIMEOUT_MS, DEFAULT_API_BASE_URL, DEFAULT_API_KEY_ENV,
    DEFAULT_FILE_OPERATION_TIMEOUT_MS, DEFAULT_IGNORE_GLOBS, DEFAULT_MAX_LISTED_FILES,
    DEFAULT_MAX_PROMPT_CHARS, DEFAULT_MODEL, DEFAULT_MODEL_ENV, MAX_TIMEOUT_MS, MIN_TIMEOUT_MS,
};

/// Host configuration, persisted as `panel-settings.json` in the app config dir.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelSettings {
    #[serde(default = "default_model")]
    pub default_model: String,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_ignore_globs")]
    pub ignore_globs: Vec<String>,
    #[serde(default = "default_max_listed_files")]
    pub max_listed_files: usize,
    #[serde(default = "default_max_prompt_chars")]
    pub max_prompt_chars: usize,
    #[serde(default = "default_ai_request_timeout_ms")]
    pub ai_request_timeout_ms: u64,
    #[serde(default = "default_file_operation_timeout_ms")]
    pub file_operation_timeout_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bridge_request_timeout_ms: Option<u64>,
}

impl Default for PanelSettings {
    fn default() -> Self {
        Self {
            default_model: default_model(),
            api_base_url: default_api_base_url(),
            api_key_env: default_api_key_env(),
            ignore_globs: default_ignore_globs(),
            max_listed_files: default_max_listed_files(),
            max_prompt_chars: default_max_prompt_chars(),
            ai_request_timeout_ms: default_ai_request_timeout_ms(),
            file_operation_timeout_ms: default_file_operation_timeout_ms(),
            bridge_request_timeout_ms: None,
        }
    }
}

impl PanelSettings {
    pub fn ai_request_timeout(&self) -> Duration {
        Duration::from_millis(self.ai_request_timeout_ms)
    }

    pub fn file_operation_timeout(&self) -> Duration {
        Duration::from_millis(self.file_operation_timeout_ms)
    }

    pub fn bridge_request_timeout(&self) -> Option<Duration> {
        self.bridge_request_timeout_ms.map(Duration::from_millis)
    }

    /// Model named in the request config, or the configured default.
    pub fn resolve_model(&self, requested: Option<&str>) -> Result<String, String> {
        normalize_model_name("config.model", requested.unwrap_or_default(), &self.default_model)
    }
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_api_key_env() -> String {
    DEFAULT_API_KEY_ENV.to_string()
}

fn default_ignore_globs() -> Vec<String> {
    DEFAULT_IGNORE_GLOBS
        .iter()
        .map(|value| value.to_string())
        .collect()
}

fn default_max_listed_files() -> usize {
    DEFAULT_MAX_LISTED_FILES
}

fn default_max_prompt_chars() -> usize {
    DEFAULT_MAX_PROMPT_CHARS
}

fn default_ai_request_timeout_ms() -> u64 {
    DEFAULT_AI_REQUEST_TIMEOUT_MS
}

fn default_file_operation_timeout_ms() -> u64 {
    DEFAULT_FILE_OPERATION_TIMEOUT_MS
}

fn normalize_api_base_url(value: &str) -> Result<String, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(default_api_base_url());
    }

    let mut parsed = url::Url::parse(trimmed)
        .map_err(|error| format!("apiBaseUrl must be a valid URL: {error}"))?;
    if parsed.scheme() != "https" && parsed.scheme() != "http" {
        return Err("apiBaseUrl must use http:// or https://.".to_string());
    }
    if parsed
        .host_str()
        .map(str::trim)
        .unwrap_or_default()
        .is_empty()
    {
        return Err("apiBaseUrl must include a host.".to_string());
    }

    parsed.set_query(None);
    parsed.set_fragment(None);

    let mut normalized = parsed.to_string();
    while normalized.ends_with('/') {
        normalized.pop();
    }
    Ok(normalized)
}

fn normalize_env_name(value: &str) -> Result<String, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(default_api_key_env());
    }
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(format!("apiKeyEnv is not a valid variable name: {trimmed}"));
    }
    Ok(trimmed.to_string())
}

pub fn normalize_panel_settings(settings: PanelSettings) -> Result<PanelSettings, String> {
    let default_model = normalize_model_name("defaultModel", &settings.default_model, DEFAULT_MODEL)?;
    let api_base_url = normalize_api_base_url(&settings.api_base_url)?;
    let api_key_env = normalize_env_name(&settings.api_key_env)?;
    let ignore_globs = normalize_ignore_globs(&settings.ignore_globs)?;

    if settings.max_listed_files == 0 {
        return Err("maxListedFiles must be greater than zero.".to_string());
    }
    if settings.max_prompt_chars == 0 {
        return Err("maxPromptChars must be greater than zero.".to_string());
    }

    Ok(PanelSettings {
        default_model,
        api_base_url,
        api_key_env,
        ignore_globs,
        max_listed_files: settings.max_listed_files,
        max_prompt_chars: settings.max_prompt_chars,
        ai_request_timeout_ms: clamp_timeout_ms(
            settings.ai_request_timeout_ms,
            MIN_TIMEOUT_MS,
            MAX_TIMEOUT_MS,
        ),
        file_operation_timeout_ms: clamp_timeout_ms(
            settings.file_operation_timeout_ms,
            MIN_TIMEOUT_MS,
            MAX_TIMEOUT_MS,
        ),
        bridge_request_timeout_ms: settings
            .bridge_request_timeout_ms
            .map(|value| clamp_timeout_ms(value, MIN_TIMEOUT_MS, MAX_TIMEOUT_MS)),
    })
}

/// Reads the settings file. A missing file yields defaults.
pub fn load_panel_settings(path: &Path) -> Result<PanelSettings, String> {
    if !path.exists() {
        return Ok(PanelSettings::default());
    }

    let raw = fs::read_to_string(path)
        .map_err(|error| format!("Failed to read {}: {error}", path.display()))?;
    let parsed = serde_json::from_str::<PanelSettings>(&raw)
        .map_err(|error| format!("Failed to parse {}: {error}", path.display()))?;
    normalize_panel_settings(parsed)
}

pub fn apply_env_overrides(
    settings: PanelSettings,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<PanelSettings, String> {
    let mut next = settings;
    if let Some(model) = normalize_optional_text(lookup(DEFAULT_MODEL_ENV).as_deref()) {
        next.default_model = model;
    }
    if let Some(base_url) = normalize_optional_text(lookup(API_BASE_URL_ENV).as_deref()) {
        next.api_base_url = base_url;
    }
    normalize_panel_settings(next)
}
