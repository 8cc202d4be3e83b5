use thiserror::Error;

/// Failure of a single panel command. The rendered message is what the UI
/// receives in the `error` field of the response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PanelError {
    #[error("No workspace folder is open. Please open a project to use the assistant.")]
    NoWorkspace,
    #[error("Invalid path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },
    #[error("Failed to {action} file {path}: {cause}")]
    Io {
        action: &'static str,
        path: String,
        cause: String,
    },
    #[error("{0}")]
    UserCancelled(String),
    #[error("Gemini API error: {0}")]
    AiApi(String),
    #[error("Prompt for {operation} is {actual} characters, over the {limit} character budget.")]
    PromptTooLarge {
        operation: &'static str,
        actual: usize,
        limit: usize,
    },
    #[error("{operation} did not finish within {timeout_ms} ms.")]
    DeadlineExceeded { operation: String, timeout_ms: u64 },
    #[error("Request {request_id} was cancelled.")]
    Cancelled { request_id: String },
    #[error("Unknown command: {0}")]
    UnknownCommand(String),
    #[error("Invalid payload for {command}: {message}")]
    InvalidPayload { command: String, message: String },
}

impl PanelError {
    pub(crate) fn io(action: &'static str, path: &str, cause: impl std::fmt::Display) -> Self {
        Self::Io {
            action,
            path: path.to_string(),
            cause: cause.to_string(),
        }
    }

    pub(crate) fn invalid_path(path: &str, reason: &str) -> Self {
        Self::InvalidPath {
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Stable code used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NoWorkspace => "no_workspace",
            Self::InvalidPath { .. } => "invalid_path",
            Self::Io { .. } => "io_error",
            Self::UserCancelled(_) => "user_cancelled",
            Self::AiApi(_) => "ai_api_error",
            Self::PromptTooLarge { .. } => "prompt_too_large",
            Self::DeadlineExceeded { .. } => "deadline_exceeded",
            Self::Cancelled { .. } => "cancelled",
            Self::UnknownCommand(_) => "unknown_command",
            Self::InvalidPayload { .. } => "invalid_payload",
        }
    }

    /// Declined prompts and explicit cancellation are normal outcomes, not faults.
    pub fn is_expected(&self) -> bool {
        matches!(self, Self::UserCancelled(_) | Self::Cancelled { .. })
    }
}
