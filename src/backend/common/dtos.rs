use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Message posted by the panel UI to the host.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundMessage {
    pub command: String,
    #[serde(default)]
    pub payload: Value,
    pub request_id: String,
}

/// Message posted by the host to the panel UI.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum OutboundMessage {
    Response {
        #[serde(rename = "requestId")]
        request_id: String,
        #[serde(default)]
        payload: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    RefreshFileTree,
}

impl OutboundMessage {
    pub fn success(request_id: &str, payload: Value) -> Self {
        Self::Response {
            request_id: request_id.to_string(),
            payload,
            error: None,
        }
    }

    pub fn failure(request_id: &str, error: String) -> Self {
        Self::Response {
            request_id: request_id.to_string(),
            payload: Value::Null,
            error: Some(error),
        }
    }

    pub fn request_id(&self) -> Option<&str> {
        match self {
            Self::Response { request_id, .. } => Some(request_id),
            Self::RefreshFileTree => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileTreeItemKind {
    Blob,
    Tree,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileTreeItem {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: FileTreeItemKind,
    pub sha: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub avatar_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryOwner {
    pub login: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Repository {
    pub id: String,
    pub name: String,
    pub owner: RepositoryOwner,
    pub description: Option<String>,
    pub private: bool,
    pub updated_at: String,
    pub language: Option<String>,
    pub default_branch: String,
    #[serde(default)]
    pub file_tree: Vec<FileTreeItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitialData {
    pub user: User,
    pub repo: Repository,
    pub file_tree: Vec<FileTreeItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileContent {
    pub content: String,
    pub sha: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileUpdateResult {
    pub new_sha: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteFileResult {
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFileResult {
    pub success: bool,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelRequestResult {
    pub cancelled: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilePathPayload {
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFileContentPayload {
    pub path: String,
    pub new_content: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelRequestPayload {
    pub request_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AiConfig {
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSnapshot {
    pub path: String,
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateCodeSuggestionPayload {
    #[serde(default)]
    pub config: AiConfig,
    pub file_content: String,
    pub user_instruction: String,
    pub file_name: String,
    #[serde(default)]
    pub full_file_tree: String,
    #[serde(default)]
    pub ai_rules: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateProjectAnalysisPayload {
    #[serde(default)]
    pub config: AiConfig,
    pub file_tree: String,
    #[serde(default)]
    pub files_content: Vec<FileSnapshot>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyAnalysisSuggestionPayload {
    #[serde(default)]
    pub config: AiConfig,
    pub file_content: String,
    pub finding: ProjectAnalysisFinding,
    #[serde(default)]
    pub user_refinement: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRepoCleanupPayload {
    #[serde(default)]
    pub config: AiConfig,
    pub file_tree: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FindingSeverity {
    Error,
    Warning,
    Suggestion,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectAnalysisFinding {
    pub file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    pub severity: FindingSeverity,
    pub description: String,
    pub suggestion: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoCleanupSuggestion {
    pub path: String,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn response_serializes_with_command_tag_and_omits_missing_error() {
        let message = OutboundMessage::success("r1", json!({ "content": "hello" }));
        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({ "command": "response", "requestId": "r1", "payload": { "content": "hello" } })
        );
    }

    #[test]
    fn failure_carries_null_payload_and_error() {
        let message = OutboundMessage::failure("r2", "No workspace is open.".to_string());
        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({ "command": "response", "requestId": "r2", "payload": null, "error": "No workspace is open." })
        );
    }

    #[test]
    fn refresh_notification_has_no_request_id() {
        let value = serde_json::to_value(OutboundMessage::RefreshFileTree).unwrap();
        assert_eq!(value, json!({ "command": "refreshFileTree" }));
        assert_eq!(OutboundMessage::RefreshFileTree.request_id(), None);
    }

    #[test]
    fn inbound_message_defaults_missing_payload_to_null() {
        let message: InboundMessage =
            serde_json::from_value(json!({ "command": "createFile", "requestId": "r3" })).unwrap();
        assert_eq!(message.payload, Value::Null);
    }

    #[test]
    fn finding_rejects_unknown_severity() {
        let result = serde_json::from_value::<ProjectAnalysisFinding>(json!({
            "file": "a.rs",
            "severity": "critical",
            "description": "d",
            "suggestion": "s"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn file_tree_item_uses_type_field() {
        let item = FileTreeItem {
            path: "src/main.rs".to_string(),
            kind: FileTreeItemKind::Blob,
            sha: String::new(),
        };
        assert_eq!(
            serde_json::to_value(item).unwrap(),
            json!({ "path": "src/main.rs", "type": "blob", "sha": "" })
        );
    }
}
