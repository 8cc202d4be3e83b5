pub(crate) const PANEL_MESSAGE_EVENT: &str = "panel-message";
pub(crate) const AI_COMMAND_PREFIX: &str = "gemini:";

pub(crate) const SETTINGS_FILE_NAME: &str = "panel-settings.json";
pub(crate) const LOG_FILTER_ENV: &str = "PANEL_LOG";
pub(crate) const DEFAULT_MODEL_ENV: &str = "PANEL_DEFAULT_MODEL";
pub(crate) const API_BASE_URL_ENV: &str = "PANEL_API_BASE_URL";
pub(crate) const FALLBACK_API_KEY_ENV: &str = "GEMINI_API_KEY";

pub(crate) const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub(crate) const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub(crate) const DEFAULT_API_KEY_ENV: &str = "API_KEY";
pub(crate) const DEFAULT_IGNORE_GLOBS: [&str; 4] = [
    "**/node_modules/**",
    "**/dist/**",
    "**/.git/**",
    "**/.vscode/**",
];
pub(crate) const DEFAULT_MAX_LISTED_FILES: usize = 20_000;
pub(crate) const DEFAULT_MAX_PROMPT_CHARS: usize = 800_000;
pub(crate) const DEFAULT_AI_REQUEST_TIMEOUT_MS: u64 = 120_000;
pub(crate) const DEFAULT_FILE_OPERATION_TIMEOUT_MS: u64 = 15_000;
pub(crate) const MIN_TIMEOUT_MS: u64 = 100;
pub(crate) const MAX_TIMEOUT_MS: u64 = 30 * 60 * 1000;

pub(crate) const LOCAL_USER_ID: &str = "local-user";
pub(crate) const LOCAL_USER_NAME: &str = "Local User";
pub(crate) const LOCAL_OWNER_LOGIN: &str = "local";
pub(crate) const LOCAL_REPO_DESCRIPTION: &str = "A local project open in the code assistant.";
pub(crate) const LOCAL_REPO_LANGUAGE: &str = "Local";
pub(crate) const LOCAL_DEFAULT_BRANCH: &str = "main";
