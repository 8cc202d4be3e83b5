mod gemini_prompts;
mod gemini_runtime;
mod gemini_schema;

pub(crate) use gemini_prompts::{
    apply_suggestion_prompt, check_prompt_budget, code_suggestion_prompt, project_analysis_prompt,
    repo_cleanup_prompt, PromptParts,
};
pub use gemini_runtime::{AiBackend, GeminiClient, GenerationRequest, ResponseFormat};
pub(crate) use gemini_schema::{parse_structured_array, project_analysis_schema, repo_cleanup_schema};
