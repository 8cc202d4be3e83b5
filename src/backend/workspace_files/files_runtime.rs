use std::path::{Path, PathBuf};

use async_trait::async_trait;
use walkdir::WalkDir;

use super::files_scope::{
    compile_ignore_patterns, is_ignored, is_ignored_directory, normalize_workspace_path,
    relative_posix,
};
use crate::backend::common::errors::PanelError;

/// File-system capabilities the dispatcher needs from the host.
///
/// Paths are UI-supplied and relative to the workspace root; implementations
/// validate them before touching the disk.
#[async_trait]
pub trait WorkspaceHost: Send + Sync {
    fn root(&self) -> &Path;

    fn name(&self) -> String;

    /// Relative POSIX paths of every file not matched by `ignore_globs`, sorted.
    async fn list_files(
        &self,
        ignore_globs: &[String],
        max_files: usize,
    ) -> Result<Vec<String>, PanelError>;

    async fn read_file(&self, path: &str) -> Result<Vec<u8>, PanelError>;

    /// Overwrites or creates `path`. The parent directory must already exist.
    async fn write_file(&self, path: &str, contents: &[u8]) -> Result<(), PanelError>;

    /// Creates an empty file, creating parent directories. Never truncates an existing file.
    async fn create_empty_file(&self, path: &str) -> Result<(), PanelError>;

    /// Moves `path` somewhere it can be recovered from.
    async fn move_to_trash(&self, path: &str) -> Result<(), PanelError>;
}

#[derive(Debug, Clone)]
pub struct LocalWorkspace {
    root: PathBuf,
}

impl LocalWorkspace {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, String> {
        let root = root.into();
        let metadata = std::fs::metadata(&root)
            .map_err(|error| format!("Failed to open workspace {}: {error}", root.display()))?;
        if !metadata.is_dir() {
            return Err(format!("Workspace {} is not a directory.", root.display()));
        }
        let root = root.canonicalize().unwrap_or(root);
        Ok(Self { root })
    }

    pub(crate) fn resolve(&self, path: &str) -> Result<PathBuf, PanelError> {
        let relative = normalize_workspace_path(path)?;
        Ok(self.root.join(relative))
    }
}

fn walk_workspace_files(
    root: &Path,
    ignore_globs: &[String],
    max_files: usize,
) -> Vec<String> {
    let patterns = compile_ignore_patterns(ignore_globs);
    let mut files = Vec::new();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            if !entry.file_type().is_dir() {
                return true;
            }
            match relative_posix(root, entry.path()) {
                Some(relative) => !is_ignored_directory(&relative, &patterns),
                None => true,
            }
        });

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(error) => {
                tracing::debug!(%error, "skipping unreadable workspace entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(relative) = relative_posix(root, entry.path()) else {
            continue;
        };
        if is_ignored(&relative, &patterns) {
            continue;
        }
        files.push(relative);
        if files.len() >= max_files {
            tracing::warn!(
                root = %root.display(),
                max_files,
                "workspace listing truncated"
            );
            break;
        }
    }

    files.sort();
    files
}

#[async_trait]
impl WorkspaceHost for LocalWorkspace {
    fn root(&self) -> &Path {
        &self.root
    }

    fn name(&self) -> String {
        self.root
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| self.root.display().to_string())
    }

    async fn list_files(
        &self,
        ignore_globs: &[String],
        max_files: usize,
    ) -> Result<Vec<String>, PanelError> {
        let root = self.root.clone();
        let ignore_globs = ignore_globs.to_vec();
        tokio::task::spawn_blocking(move || walk_workspace_files(&root, &ignore_globs, max_files))
            .await
            .map_err(|error| PanelError::io("list", &self.root.display().to_string(), error))
    }

    async fn read_file(&self, path: &str) -> Result<Vec<u8>, PanelError> {
        let target = self.resolve(path)?;
        tokio::fs::read(&target)
            .await
            .map_err(|error| PanelError::io("read", path, error))
    }

    async fn write_file(&self, path: &str, contents: &[u8]) -> Result<(), PanelError> {
        let target = self.resolve(path)?;
        tokio::fs::write(&target, contents)
            .await
            .map_err(|error| PanelError::io("write", path, error))
    }

    async fn create_empty_file(&self, path: &str) -> Result<(), PanelError> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|error| PanelError::io("create", path, error))?;
        }
        tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
            .await
            .map(|_| ())
            .map_err(|error| PanelError::io("create", path, error))
    }

    async fn move_to_trash(&self, path: &str) -> Result<(), PanelError> {
        let target = self.resolve(path)?;
        if tokio::fs::symlink_metadata(&target).await.is_err() {
            return Err(PanelError::io("delete", path, "file does not exist"));
        }
        let display_path = path.to_string();
        tokio::task::spawn_blocking(move || trash::delete(&target))
            .await
            .map_err(|error| PanelError::io("delete", &display_path, error))?
            .map_err(|error| PanelError::io("delete", &display_path, error))
    }
}
