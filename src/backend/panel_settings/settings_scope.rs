use std::collections::HashSet;

pub(crate) fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|candidate| !candidate.is_empty())
        .map(ToOwned::to_owned)
}

/// Model names end up in the request URL path, so only plain name characters pass.
pub(crate) fn normalize_model_name(
    field: &str,
    value: &str,
    fallback: &str,
) -> Result<String, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(fallback.to_string());
    }
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-')
    {
        return Err(format!("{field} contains unsupported characters: {trimmed}"));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn normalize_ignore_globs(globs: &[String]) -> Result<Vec<String>, String> {
    let mut seen = HashSet::new();
    let mut normalized = Vec::new();
    for glob in globs {
        let trimmed = glob.trim().replace('\\', "/");
        if trimmed.is_empty() {
            continue;
        }
        if let Err(error) = glob::Pattern::new(&trimmed) {
            return Err(format!("ignoreGlobs entry {trimmed:?} is not a valid glob: {error}"));
        }
        if seen.insert(trimmed.clone()) {
            normalized.push(trimmed);
        }
    }
    Ok(normalized)
}

pub(crate) fn clamp_timeout_ms(value: u64, min: u64, max: u64) -> u64 {
    value.clamp(min, max)
}
