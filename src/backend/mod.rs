pub mod command_dispatch;
pub mod common;
#[cfg(feature = "desktop")]
pub(crate) mod frontend_command_registry;
pub mod gemini_integration;
pub mod host_prompts;
pub mod message_bridge;
pub mod panel_settings;
pub mod workspace_files;

#[cfg(test)]
pub(crate) mod test_support;
