use crate::backend::common::dtos::{
    ApplyAnalysisSuggestionPayload, GenerateCodeSuggestionPayload, GenerateProjectAnalysisPayload,
    GenerateRepoCleanupPayload,
};
use crate::backend::common::errors::PanelError;

const PROJECT_ANALYSIS_INSTRUCTION: &str = "You are an expert senior software engineer performing a comprehensive code review on a project. Analyze the provided file structure and file contents to identify issues and suggest improvements. Provide your response as a JSON array of objects that strictly follows the provided schema. Focus on providing actionable, high-quality feedback.";

const APPLY_SUGGESTION_INSTRUCTION: &str = "You are an expert AI programmer. Your task is to apply a suggested code change to a file. You will receive the original file, a finding from a code review, and an optional refinement from the user. IMPORTANT: Respond ONLY with the full, updated code for the file. Do not add explanations or markdown fences.";

const REPO_CLEANUP_INSTRUCTION: &str = "You are an expert software engineer reviewing the layout of a repository. Identify unnecessary files such as build artifacts, temporary files, logs, duplicated assets or leftovers that should not be committed. Return a JSON array of objects with the path of each file and the reason it can be deleted.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PromptParts {
    pub(crate) system_instruction: Option<String>,
    pub(crate) prompt: String,
}

impl PromptParts {
    pub(crate) fn char_count(&self) -> usize {
        self.prompt.chars().count()
            + self
                .system_instruction
                .as_deref()
                .map(|text| text.chars().count())
                .unwrap_or(0)
    }
}

fn code_suggestion_instruction(file_name: &str, full_file_tree: &str, ai_rules: &str) -> String {
    let rules = ai_rules.trim();
    let rules_section = if rules.is_empty() {
        String::new()
    } else {
        format!(
            "\nThe user has provided the following rules that you MUST follow. This is the highest priority instruction.\n--- USER-DEFINED RULES ---\n{rules}\n--- END OF RULES ---\n"
        )
    };

    format!(
        "You are an expert software engineer AI assistant.
Your task is to help the user with their code.
You will be given the content of a file, a user instruction, the filename, and the project's file structure.
{rules_section}
The user wants to modify the file: `{file_name}`.

This is the full file structure of the project:
```
{full_file_tree}
```

IMPORTANT:
- Respond ONLY with the full, updated code for the file `{file_name}`.
- Do not add any explanations, introductory text, or markdown formatting like ```typescript.
- Your response should be the raw text of the file content and nothing else.
- Ensure the code is complete and syntactically correct.
- If the user's request is unclear or cannot be fulfilled, return the original code without any changes.
"
    )
}

pub(crate) fn code_suggestion_prompt(payload: &GenerateCodeSuggestionPayload) -> PromptParts {
    let file_name = &payload.file_name;
    PromptParts {
        system_instruction: Some(code_suggestion_instruction(
            file_name,
            &payload.full_file_tree,
            &payload.ai_rules,
        )),
        prompt: format!(
            "Original code from `{file_name}`:\n```\n{}\n```\n\nUser instruction: \"{}\"\n\nPlease provide the full updated code for `{file_name}`.",
            payload.file_content, payload.user_instruction
        ),
    }
}

pub(crate) fn project_analysis_prompt(payload: &GenerateProjectAnalysisPayload) -> PromptParts {
    let files_section = payload
        .files_content
        .iter()
        .map(|file| format!("--- FILE: {} ---\n```\n{}\n```", file.path, file.content))
        .collect::<Vec<_>>()
        .join("\n\n");

    PromptParts {
        system_instruction: Some(PROJECT_ANALYSIS_INSTRUCTION.to_string()),
        prompt: format!(
            "Here is the project's file structure:\n{}\n\nHere is the content of key files:\n{files_section}\n\nPlease analyze the project for the following:\n1.  **Bugs & Errors**\n2.  **Best Practices & Code Smell**\n3.  **Performance**\n4.  **Security**\n5.  **Dependencies**\n\nProvide a list of your findings. If no issues are found, return an empty array [].",
            payload.file_tree
        ),
    }
}

pub(crate) fn apply_suggestion_prompt(payload: &ApplyAnalysisSuggestionPayload) -> PromptParts {
    let refinement = payload.user_refinement.trim();
    let refinement = if refinement.is_empty() {
        "Apply original suggestion."
    } else {
        refinement
    };

    PromptParts {
        system_instruction: Some(APPLY_SUGGESTION_INSTRUCTION.to_string()),
        prompt: format!(
            "File: `{}`\n\n--- ORIGINAL CODE ---\n```\n{}\n```\n\n--- ANALYSIS FINDING ---\nDescription: {}\nOriginal Suggestion: {}\n\n--- USER REFINEMENT ---\n{refinement}\n\nProvide the full and complete updated code.",
            payload.finding.file,
            payload.file_content,
            payload.finding.description,
            payload.finding.suggestion
        ),
    }
}

pub(crate) fn repo_cleanup_prompt(payload: &GenerateRepoCleanupPayload) -> PromptParts {
    PromptParts {
        system_instruction: Some(REPO_CLEANUP_INSTRUCTION.to_string()),
        prompt: format!(
            "Analyze the following file tree and identify unnecessary files that can be safely deleted.\nFile Tree:\n```\n{}\n```\nIf no files need to be deleted, return an empty array [].",
            payload.file_tree
        ),
    }
}

pub(crate) fn check_prompt_budget(
    operation: &'static str,
    parts: &PromptParts,
    limit: usize,
) -> Result<(), PanelError> {
    let actual = parts.char_count();
    if actual > limit {
        return Err(PanelError::PromptTooLarge {
            operation,
            actual,
            limit,
        });
    }
    Ok(())
}
