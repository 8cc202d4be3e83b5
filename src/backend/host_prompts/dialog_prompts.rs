use async_trait::async_trait;
use rfd::{AsyncFileDialog, AsyncMessageDialog, MessageButtons, MessageDialogResult, MessageLevel};

use super::prompt_runtime::{ConfirmRequest, HostPrompts, TextInputRequest};
use crate::backend::workspace_files::normalize_workspace_path;

/// Native dialogs. Text input is a save-file picker rooted at the workspace,
/// answered with the chosen path relative to that root.
#[derive(Debug, Default, Clone)]
pub struct DialogPrompts;

#[async_trait]
impl HostPrompts for DialogPrompts {
    async fn confirm(&self, request: ConfirmRequest) -> bool {
        let result = AsyncMessageDialog::new()
            .set_level(MessageLevel::Warning)
            .set_title(&request.title)
            .set_description(&request.message)
            .set_buttons(MessageButtons::OkCancelCustom(
                request.confirm_label.clone(),
                "Cancel".to_string(),
            ))
            .show()
            .await;
        match result {
            MessageDialogResult::Ok | MessageDialogResult::Yes => true,
            MessageDialogResult::Custom(label) => label == request.confirm_label,
            _ => false,
        }
    }

    async fn input_text(&self, request: TextInputRequest) -> Option<String> {
        let mut dialog = AsyncFileDialog::new()
            .set_title(&request.prompt)
            .set_file_name(&request.suggested_name);
        if let Some(directory) = request.base_directory.as_ref() {
            dialog = dialog.set_directory(directory);
        }

        let picked = dialog.save_file().await?;
        let picked = picked.path().to_path_buf();
        let Some(base) = request.base_directory else {
            return Some(picked.display().to_string());
        };

        let base = base.canonicalize().unwrap_or(base);
        let parent = picked
            .parent()
            .and_then(|parent| parent.canonicalize().ok())
            .unwrap_or_else(|| picked.parent().map(ToOwned::to_owned).unwrap_or_default());
        let file_name = picked.file_name()?;
        let Ok(relative_parent) = parent.strip_prefix(&base) else {
            tracing::warn!(
                picked = %picked.display(),
                workspace = %base.display(),
                "new file location is outside the workspace"
            );
            return None;
        };

        let relative = relative_parent.join(file_name);
        let relative = relative.to_string_lossy().replace('\\', "/");
        normalize_workspace_path(&relative).ok()?;
        Some(relative)
    }
}
