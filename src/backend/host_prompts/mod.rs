mod prompt_runtime;
#[cfg(feature = "desktop")]
mod dialog_prompts;

#[cfg(feature = "desktop")]
pub use dialog_prompts::DialogPrompts;
pub(crate) use prompt_runtime::{delete_confirmation, new_file_prompt};
pub use prompt_runtime::{ConfirmRequest, HostPrompts, TextInputRequest};
