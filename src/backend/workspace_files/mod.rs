mod files_runtime;
mod files_scope;

pub use files_runtime::{LocalWorkspace, WorkspaceHost};
pub(crate) use files_scope::normalize_workspace_path;
