use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tauri::{AppHandle, Emitter, State};
use uuid::Uuid;

use crate::backend::command_dispatch::{MessageSink, PanelDispatcher};
use crate::backend::common::constants::PANEL_MESSAGE_EVENT;
use crate::backend::common::dtos::{InboundMessage, OutboundMessage};
use crate::backend::workspace_files::{LocalWorkspace, WorkspaceHost};

pub(crate) struct PanelHostState {
    pub(crate) dispatcher: Arc<PanelDispatcher>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PanelWorkspaceResponse {
    request_id: String,
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    workspace_root: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cancelled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Delivers host messages to the webview as `panel-message` events.
struct TauriSink {
    app: AppHandle,
}

impl MessageSink for TauriSink {
    fn post(&self, message: OutboundMessage) {
        if let Err(error) = self.app.emit(PANEL_MESSAGE_EVENT, &message) {
            tracing::warn!(%error, "failed to emit panel message");
        }
    }
}

fn request_id() -> String {
    Uuid::new_v4().to_string()
}

pub(crate) fn open_workspace(
    dispatcher: &PanelDispatcher,
    root: &Path,
) -> Result<String, String> {
    let workspace = LocalWorkspace::open(root)?;
    let display = workspace.root().display().to_string();
    dispatcher.set_workspace(Some(Arc::new(workspace)));
    tracing::info!(workspace = %display, "workspace opened");
    Ok(display)
}

#[tauri::command]
pub(crate) async fn panel_post_message(
    app: AppHandle,
    state: State<'_, PanelHostState>,
    message: InboundMessage,
) -> Result<(), String> {
    let dispatcher = state.dispatcher.clone();
    tauri::async_runtime::spawn(async move {
        let sink = TauriSink { app };
        dispatcher.handle_message(message, &sink).await;
    });
    Ok(())
}

#[tauri::command]
pub(crate) async fn panel_pick_workspace(
    app: AppHandle,
    state: State<'_, PanelHostState>,
) -> Result<PanelWorkspaceResponse, String> {
    let request_id = request_id();
    let Some(picked) = rfd::AsyncFileDialog::new().pick_folder().await else {
        return Ok(PanelWorkspaceResponse {
            request_id,
            ok: false,
            workspace_root: None,
            cancelled: Some(true),
            error: None,
        });
    };

    let response = match open_workspace(&state.dispatcher, picked.path()) {
        Ok(root) => {
            TauriSink { app }.post(OutboundMessage::RefreshFileTree);
            PanelWorkspaceResponse {
                request_id,
                ok: true,
                workspace_root: Some(root),
                cancelled: None,
                error: None,
            }
        }
        Err(error) => PanelWorkspaceResponse {
            request_id,
            ok: false,
            workspace_root: Some(picked.path().display().to_string()),
            cancelled: None,
            error: Some(error),
        },
    };
    Ok(response)
}

#[tauri::command]
pub(crate) fn panel_active_workspace(state: State<PanelHostState>) -> PanelWorkspaceResponse {
    let workspace_root = state
        .dispatcher
        .active_workspace()
        .map(|workspace| workspace.root().display().to_string());
    PanelWorkspaceResponse {
        request_id: request_id(),
        ok: workspace_root.is_some(),
        workspace_root,
        cancelled: None,
        error: None,
    }
}
