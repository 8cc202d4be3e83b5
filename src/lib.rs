mod backend;
mod logging;

pub use backend::command_dispatch::{MessageSink, PanelCommand, PanelDispatcher};
pub use backend::common::dtos;
pub use backend::common::errors::PanelError;
pub use backend::gemini_integration::{AiBackend, GeminiClient, GenerationRequest, ResponseFormat};
pub use backend::host_prompts::{ConfirmRequest, HostPrompts, TextInputRequest};
pub use backend::message_bridge::{BridgeError, PanelBridge, PanelNotification};
pub use backend::panel_settings::{
    apply_env_overrides, load_panel_settings, normalize_panel_settings, PanelSettings,
};
pub use backend::workspace_files::{LocalWorkspace, WorkspaceHost};
pub use logging::init_tracing;

#[cfg(feature = "desktop")]
pub fn run() {
    init_tracing();
    backend::frontend_command_registry::run();
}
