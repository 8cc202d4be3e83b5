mod settings_runtime;
mod settings_scope;

pub use settings_runtime::{apply_env_overrides, load_panel_settings, normalize_panel_settings, PanelSettings};
