use std::path::PathBuf;

use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmRequest {
    pub title: String,
    pub message: String,
    pub confirm_label: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextInputRequest {
    pub prompt: String,
    /// Initial answer offered to the user.
    pub suggested_name: String,
    /// Directory the answer is relative to, when the host can offer a picker.
    pub base_directory: Option<PathBuf>,
}

/// Interactive capabilities of the host window.
#[async_trait]
pub trait HostPrompts: Send + Sync {
    /// Modal yes/no question. `true` only on explicit confirmation.
    async fn confirm(&self, request: ConfirmRequest) -> bool;

    /// `None` when the user dismisses the prompt.
    async fn input_text(&self, request: TextInputRequest) -> Option<String>;
}

pub(crate) fn delete_confirmation(path: &str) -> ConfirmRequest {
    ConfirmRequest {
        title: "Delete file".to_string(),
        message: format!("Are you sure you want to delete {path}? It will be moved to the trash."),
        confirm_label: "Delete".to_string(),
    }
}

pub(crate) fn new_file_prompt(base_directory: Option<PathBuf>) -> TextInputRequest {
    TextInputRequest {
        prompt: "Enter the path for the new file".to_string(),
        suggested_name: "untitled.txt".to_string(),
        base_directory,
    }
}
