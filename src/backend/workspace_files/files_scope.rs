use std::path::{Component, Path, PathBuf};

use glob::{MatchOptions, Pattern};

use crate::backend::common::errors::PanelError;

const DIRECTORY_SAMPLE_NAME: &str = "__panel_sample__";

const IGNORE_MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Validates a UI-supplied path and returns it relative to the workspace root.
pub(crate) fn normalize_workspace_path(raw: &str) -> Result<PathBuf, PanelError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(PanelError::invalid_path(raw, "path must not be empty"));
    }

    let candidate = Path::new(trimmed);
    let mut normalized = PathBuf::new();
    for component in candidate.components() {
        match component {
            Component::Normal(part) => normalized.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                return Err(PanelError::invalid_path(
                    raw,
                    "path must not leave the workspace",
                ))
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(PanelError::invalid_path(
                    raw,
                    "path must be relative to the workspace",
                ))
            }
        }
    }

    if normalized.as_os_str().is_empty() {
        return Err(PanelError::invalid_path(raw, "path must name a file"));
    }
    Ok(normalized)
}

pub(crate) fn compile_ignore_patterns(globs: &[String]) -> Vec<Pattern> {
    globs
        .iter()
        .filter_map(|glob| Pattern::new(glob).ok())
        .collect()
}

pub(crate) fn is_ignored(relative_posix: &str, patterns: &[Pattern]) -> bool {
    patterns
        .iter()
        .any(|pattern| pattern.matches_with(relative_posix, IGNORE_MATCH_OPTIONS))
}

/// A directory is pruned when any file directly inside it would be ignored
/// regardless of its name.
pub(crate) fn is_ignored_directory(relative_posix: &str, patterns: &[Pattern]) -> bool {
    let sample = format!("{relative_posix}/{DIRECTORY_SAMPLE_NAME}");
    is_ignored(&sample, patterns)
}

pub(crate) fn relative_posix(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts = relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().to_string()),
            _ => None,
        })
        .collect::<Vec<_>>();
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}
