use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::backend::common::errors::PanelError;

pub(crate) fn project_analysis_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "file": { "type": "STRING" },
                "line": { "type": "INTEGER" },
                "severity": { "type": "STRING", "enum": ["error", "warning", "suggestion"] },
                "description": { "type": "STRING" },
                "suggestion": { "type": "STRING" }
            },
            "required": ["file", "severity", "description", "suggestion"]
        }
    })
}

pub(crate) fn repo_cleanup_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "path": { "type": "STRING" },
                "reason": { "type": "STRING" }
            },
            "required": ["path", "reason"]
        }
    })
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Parses a model reply into a typed array. Anything that is not a JSON array
/// whose every element matches `T` is rejected as a whole.
pub(crate) fn parse_structured_array<T: DeserializeOwned>(
    raw: &str,
    what: &str,
) -> Result<Vec<T>, PanelError> {
    let body = strip_code_fence(raw);
    let value = serde_json::from_str::<Value>(body)
        .map_err(|error| PanelError::AiApi(format!("{what} response was not valid JSON: {error}")))?;
    if !value.is_array() {
        return Err(PanelError::AiApi(format!(
            "{what} response was not a JSON array."
        )));
    }
    serde_json::from_value::<Vec<T>>(value).map_err(|error| {
        PanelError::AiApi(format!(
            "{what} response did not match the expected schema: {error}"
        ))
    })
}
