use std::path::PathBuf;
use std::sync::Arc;

use tauri::Manager;

use super::panel_commands::{
    open_workspace, panel_active_workspace, panel_pick_workspace, panel_post_message,
    PanelHostState,
};
use crate::backend::command_dispatch::PanelDispatcher;
use crate::backend::common::constants::SETTINGS_FILE_NAME;
use crate::backend::gemini_integration::GeminiClient;
use crate::backend::host_prompts::DialogPrompts;
use crate::backend::panel_settings::{apply_env_overrides, load_panel_settings, PanelSettings};

fn startup_settings(config_dir: Option<PathBuf>) -> PanelSettings {
    let loaded = match config_dir {
        Some(dir) => load_panel_settings(&dir.join(SETTINGS_FILE_NAME)),
        None => Ok(PanelSettings::default()),
    };
    let loaded = loaded.unwrap_or_else(|error| {
        tracing::warn!(%error, "invalid panel settings; using defaults");
        PanelSettings::default()
    });
    apply_env_overrides(loaded.clone(), |name| std::env::var(name).ok()).unwrap_or_else(|error| {
        tracing::warn!(%error, "ignoring invalid environment overrides");
        loaded
    })
}

pub(crate) fn run() {
    tauri::Builder::default()
        .setup(|app| {
            let settings = startup_settings(app.path().app_config_dir().ok());
            let ai = GeminiClient::new(&settings)?;
            let dispatcher = Arc::new(PanelDispatcher::new(
                settings,
                Arc::new(DialogPrompts),
                Arc::new(ai),
            ));

            if let Some(root) = std::env::args_os().nth(1) {
                if let Err(error) = open_workspace(&dispatcher, &PathBuf::from(root)) {
                    tracing::warn!(%error, "initial workspace could not be opened");
                }
            }

            app.manage(PanelHostState { dispatcher });
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            panel_post_message,
            panel_pick_workspace,
            panel_active_workspace
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
