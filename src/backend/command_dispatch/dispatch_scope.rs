use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::backend::common::constants::AI_COMMAND_PREFIX;
use crate::backend::common::errors::PanelError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PanelCommand {
    GetInitialData,
    GetFileContent,
    UpdateFileContent,
    DeleteFile,
    CreateFile,
    GenerateCodeSuggestion,
    GenerateProjectAnalysis,
    ApplyProjectAnalysisSuggestion,
    GenerateRepoCleanupSuggestions,
    CancelRequest,
}

impl PanelCommand {
    pub const ALL: [PanelCommand; 10] = [
        Self::GetInitialData,
        Self::GetFileContent,
        Self::UpdateFileContent,
        Self::DeleteFile,
        Self::CreateFile,
        Self::GenerateCodeSuggestion,
        Self::GenerateProjectAnalysis,
        Self::ApplyProjectAnalysisSuggestion,
        Self::GenerateRepoCleanupSuggestions,
        Self::CancelRequest,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::GetInitialData => "getInitialData",
            Self::GetFileContent => "getFileContent",
            Self::UpdateFileContent => "updateFileContent",
            Self::DeleteFile => "deleteFile",
            Self::CreateFile => "createFile",
            Self::GenerateCodeSuggestion => "generateCodeSuggestion",
            Self::GenerateProjectAnalysis => "generateProjectAnalysis",
            Self::ApplyProjectAnalysisSuggestion => "applyProjectAnalysisSuggestion",
            Self::GenerateRepoCleanupSuggestions => "generateRepoCleanupSuggestions",
            Self::CancelRequest => "cancelRequest",
        }
    }

    pub fn is_ai(self) -> bool {
        matches!(
            self,
            Self::GenerateCodeSuggestion
                | Self::GenerateProjectAnalysis
                | Self::ApplyProjectAnalysisSuggestion
                | Self::GenerateRepoCleanupSuggestions
        )
    }

    /// Commands whose effect changes the workspace on disk.
    pub fn mutates_workspace(self) -> bool {
        matches!(
            self,
            Self::UpdateFileContent | Self::DeleteFile | Self::CreateFile
        )
    }

    /// Accepts the `gemini:`-prefixed spelling for AI commands only.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        let (name, prefixed) = match trimmed.strip_prefix(AI_COMMAND_PREFIX) {
            Some(rest) => (rest, true),
            None => (trimmed, false),
        };
        let command = Self::ALL
            .into_iter()
            .find(|candidate| candidate.as_str() == name)?;
        if prefixed && !command.is_ai() {
            return None;
        }
        Some(command)
    }
}

pub(crate) fn decode_payload<T: DeserializeOwned>(
    command: PanelCommand,
    payload: Value,
) -> Result<T, PanelError> {
    serde_json::from_value(payload).map_err(|error| PanelError::InvalidPayload {
        command: command.as_str().to_string(),
        message: error.to_string(),
    })
}
