use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::dispatch_scope::{decode_payload, PanelCommand};
use super::in_flight::{InFlightGuard, InFlightRequests};
use crate::backend::common::constants::{
    LOCAL_DEFAULT_BRANCH, LOCAL_OWNER_LOGIN, LOCAL_REPO_DESCRIPTION, LOCAL_REPO_LANGUAGE,
    LOCAL_USER_ID, LOCAL_USER_NAME,
};
use crate::backend::common::dtos::{
    AiConfig, ApplyAnalysisSuggestionPayload, CancelRequestPayload, CancelRequestResult,
    CreateFileResult, DeleteFileResult, FileContent, FilePathPayload, FileTreeItem,
    FileTreeItemKind, FileUpdateResult, GenerateCodeSuggestionPayload,
    GenerateProjectAnalysisPayload, GenerateRepoCleanupPayload, InboundMessage, InitialData,
    OutboundMessage, ProjectAnalysisFinding, RepoCleanupSuggestion, Repository, RepositoryOwner,
    UpdateFileContentPayload, User,
};
use crate::backend::common::errors::PanelError;
use crate::backend::common::timestamps::{freshness_marker, now_iso};
use crate::backend::gemini_integration::{
    apply_suggestion_prompt, check_prompt_budget, code_suggestion_prompt, parse_structured_array,
    project_analysis_prompt, project_analysis_schema, repo_cleanup_prompt, repo_cleanup_schema,
    AiBackend, GenerationRequest, PromptParts, ResponseFormat,
};
use crate::backend::host_prompts::{delete_confirmation, new_file_prompt, HostPrompts};
use crate::backend::panel_settings::PanelSettings;
use crate::backend::workspace_files::{normalize_workspace_path, WorkspaceHost};

/// Outbound half of the host channel.
pub trait MessageSink: Send + Sync {
    fn post(&self, message: OutboundMessage);
}

impl MessageSink for mpsc::UnboundedSender<OutboundMessage> {
    fn post(&self, message: OutboundMessage) {
        if self.send(message).is_err() {
            tracing::debug!("outbound channel closed; dropping panel message");
        }
    }
}

async fn with_deadline<T>(
    operation: &str,
    limit: Duration,
    future: impl Future<Output = Result<T, PanelError>>,
) -> Result<T, PanelError> {
    match tokio::time::timeout(limit, future).await {
        Ok(result) => result,
        Err(_) => Err(PanelError::DeadlineExceeded {
            operation: operation.to_string(),
            timeout_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
        }),
    }
}

async fn until_cancelled<T>(
    token: &CancellationToken,
    request_id: &str,
    future: impl Future<Output = T>,
) -> Result<T, PanelError> {
    tokio::select! {
        _ = token.cancelled() => Err(PanelError::Cancelled {
            request_id: request_id.to_string(),
        }),
        value = future => Ok(value),
    }
}

fn encode_result<T: Serialize>(command: PanelCommand, value: T) -> Result<Value, PanelError> {
    serde_json::to_value(value).map_err(|error| PanelError::InvalidPayload {
        command: command.as_str().to_string(),
        message: format!("failed to encode result: {error}"),
    })
}

fn local_user() -> User {
    User {
        id: LOCAL_USER_ID.to_string(),
        name: LOCAL_USER_NAME.to_string(),
        avatar_url: String::new(),
    }
}

fn local_repository(workspace: &dyn WorkspaceHost) -> Repository {
    Repository {
        id: format!("local-repo-{}", workspace.root().display()),
        name: workspace.name(),
        owner: RepositoryOwner {
            login: LOCAL_OWNER_LOGIN.to_string(),
        },
        description: Some(LOCAL_REPO_DESCRIPTION.to_string()),
        private: true,
        updated_at: now_iso(),
        language: Some(LOCAL_REPO_LANGUAGE.to_string()),
        default_branch: LOCAL_DEFAULT_BRANCH.to_string(),
        file_tree: Vec::new(),
    }
}

/// Host-side command handler. Every inbound message gets exactly one
/// `response` on the sink, whatever happens while handling it.
pub struct PanelDispatcher {
    workspace: RwLock<Option<Arc<dyn WorkspaceHost>>>,
    prompts: Arc<dyn HostPrompts>,
    ai: Arc<dyn AiBackend>,
    settings: PanelSettings,
    in_flight: InFlightRequests,
}

impl PanelDispatcher {
    pub fn new(
        settings: PanelSettings,
        prompts: Arc<dyn HostPrompts>,
        ai: Arc<dyn AiBackend>,
    ) -> Self {
        Self {
            workspace: RwLock::new(None),
            prompts,
            ai,
            settings,
            in_flight: InFlightRequests::default(),
        }
    }

    #[must_use]
    pub fn with_workspace(self, workspace: Arc<dyn WorkspaceHost>) -> Self {
        self.set_workspace(Some(workspace));
        self
    }

    pub fn set_workspace(&self, workspace: Option<Arc<dyn WorkspaceHost>>) {
        let mut active = self.workspace.write().unwrap_or_else(PoisonError::into_inner);
        *active = workspace;
    }

    pub fn active_workspace(&self) -> Option<Arc<dyn WorkspaceHost>> {
        self.workspace
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn settings(&self) -> &PanelSettings {
        &self.settings
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    pub async fn handle_message(&self, message: InboundMessage, sink: &dyn MessageSink) {
        let InboundMessage {
            command,
            payload,
            request_id,
        } = message;
        let started = Instant::now();

        let outcome = self.dispatch(&command, payload, &request_id, sink).await;
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let response = match outcome {
            Ok(payload) => {
                tracing::debug!(%command, %request_id, elapsed_ms, "panel command finished");
                OutboundMessage::success(&request_id, payload)
            }
            Err(error) => {
                if error.is_expected() {
                    tracing::info!(%command, %request_id, kind = error.kind(), elapsed_ms, "panel command declined");
                } else {
                    tracing::warn!(%command, %request_id, kind = error.kind(), %error, elapsed_ms, "panel command failed");
                }
                OutboundMessage::failure(&request_id, error.to_string())
            }
        };
        sink.post(response);
    }

    async fn dispatch(
        &self,
        raw_command: &str,
        payload: Value,
        request_id: &str,
        sink: &dyn MessageSink,
    ) -> Result<Value, PanelError> {
        let command = PanelCommand::parse(raw_command)
            .ok_or_else(|| PanelError::UnknownCommand(raw_command.to_string()))?;

        if command == PanelCommand::CancelRequest {
            let payload: CancelRequestPayload = decode_payload(command, payload)?;
            let cancelled = self.in_flight.cancel(&payload.request_id);
            return encode_result(command, CancelRequestResult { cancelled });
        }

        let Some(token) = self.in_flight.register(request_id) else {
            return Err(PanelError::InvalidPayload {
                command: command.as_str().to_string(),
                message: format!("request {request_id} is already in flight"),
            });
        };
        let _guard = InFlightGuard::new(&self.in_flight, request_id);

        if command.mutates_workspace() {
            // Once the disk change starts it runs to completion; only the
            // prompt before it can be cancelled.
            return self
                .execute_mutation(command, payload, request_id, &token, sink)
                .await;
        }
        until_cancelled(&token, request_id, self.execute(command, payload)).await?
    }

    fn commit(&self, request_id: &str) -> Result<(), PanelError> {
        if self.in_flight.commit(request_id) {
            Ok(())
        } else {
            Err(PanelError::Cancelled {
                request_id: request_id.to_string(),
            })
        }
    }

    fn require_workspace(&self) -> Result<Arc<dyn WorkspaceHost>, PanelError> {
        self.active_workspace().ok_or(PanelError::NoWorkspace)
    }

    async fn execute(&self, command: PanelCommand, payload: Value) -> Result<Value, PanelError> {
        match command {
            PanelCommand::GetInitialData => {
                let workspace = self.require_workspace()?;
                let data = self.initial_data(workspace.as_ref()).await?;
                encode_result(command, data)
            }
            PanelCommand::GetFileContent => {
                let workspace = self.require_workspace()?;
                let payload: FilePathPayload = decode_payload(command, payload)?;
                let bytes = with_deadline(
                    command.as_str(),
                    self.settings.file_operation_timeout(),
                    workspace.read_file(&payload.path),
                )
                .await?;
                encode_result(
                    command,
                    FileContent {
                        content: String::from_utf8_lossy(&bytes).into_owned(),
                        sha: freshness_marker(),
                    },
                )
            }
            PanelCommand::GenerateCodeSuggestion => {
                let payload: GenerateCodeSuggestionPayload = decode_payload(command, payload)?;
                let parts = code_suggestion_prompt(&payload);
                let text = self.generate_text(command, &payload.config, parts).await?;
                encode_result(command, text)
            }
            PanelCommand::GenerateProjectAnalysis => {
                let payload: GenerateProjectAnalysisPayload = decode_payload(command, payload)?;
                let parts = project_analysis_prompt(&payload);
                let findings = self
                    .generate_array::<ProjectAnalysisFinding>(
                        command,
                        &payload.config,
                        parts,
                        project_analysis_schema(),
                    )
                    .await?;
                encode_result(command, findings)
            }
            PanelCommand::ApplyProjectAnalysisSuggestion => {
                let payload: ApplyAnalysisSuggestionPayload = decode_payload(command, payload)?;
                let parts = apply_suggestion_prompt(&payload);
                let text = self.generate_text(command, &payload.config, parts).await?;
                encode_result(command, text)
            }
            PanelCommand::GenerateRepoCleanupSuggestions => {
                let payload: GenerateRepoCleanupPayload = decode_payload(command, payload)?;
                let parts = repo_cleanup_prompt(&payload);
                let suggestions = self
                    .generate_array::<RepoCleanupSuggestion>(
                        command,
                        &payload.config,
                        parts,
                        repo_cleanup_schema(),
                    )
                    .await?;
                encode_result(command, suggestions)
            }
            PanelCommand::UpdateFileContent
            | PanelCommand::DeleteFile
            | PanelCommand::CreateFile
            | PanelCommand::CancelRequest => Err(PanelError::InvalidPayload {
                command: command.as_str().to_string(),
                message: "not a read-only command".to_string(),
            }),
        }
    }

    async fn execute_mutation(
        &self,
        command: PanelCommand,
        payload: Value,
        request_id: &str,
        token: &CancellationToken,
        sink: &dyn MessageSink,
    ) -> Result<Value, PanelError> {
        let workspace = self.require_workspace()?;
        match command {
            PanelCommand::UpdateFileContent => {
                let payload: UpdateFileContentPayload = decode_payload(command, payload)?;
                self.commit(request_id)?;
                workspace
                    .write_file(&payload.path, payload.new_content.as_bytes())
                    .await?;
                encode_result(
                    command,
                    FileUpdateResult {
                        new_sha: freshness_marker(),
                    },
                )
            }
            PanelCommand::DeleteFile => {
                let payload: FilePathPayload = decode_payload(command, payload)?;
                let result = self
                    .delete_file(workspace.as_ref(), &payload.path, request_id, token, sink)
                    .await?;
                encode_result(command, result)
            }
            PanelCommand::CreateFile => {
                let result = self
                    .create_file(workspace.as_ref(), request_id, token, sink)
                    .await?;
                encode_result(command, result)
            }
            _ => Err(PanelError::InvalidPayload {
                command: command.as_str().to_string(),
                message: "does not change the workspace".to_string(),
            }),
        }
    }

    async fn initial_data(&self, workspace: &dyn WorkspaceHost) -> Result<InitialData, PanelError> {
        let files = with_deadline(
            PanelCommand::GetInitialData.as_str(),
            self.settings.file_operation_timeout(),
            workspace.list_files(&self.settings.ignore_globs, self.settings.max_listed_files),
        )
        .await?;

        let file_tree = files
            .into_iter()
            .map(|path| FileTreeItem {
                path,
                kind: FileTreeItemKind::Blob,
                sha: String::new(),
            })
            .collect();

        Ok(InitialData {
            user: local_user(),
            repo: local_repository(workspace),
            file_tree,
        })
    }

    async fn delete_file(
        &self,
        workspace: &dyn WorkspaceHost,
        path: &str,
        request_id: &str,
        token: &CancellationToken,
        sink: &dyn MessageSink,
    ) -> Result<DeleteFileResult, PanelError> {
        normalize_workspace_path(path)?;

        let confirmed =
            until_cancelled(token, request_id, self.prompts.confirm(delete_confirmation(path)))
                .await?;
        if !confirmed {
            return Err(PanelError::UserCancelled(
                "Deletion cancelled by user.".to_string(),
            ));
        }

        self.commit(request_id)?;
        workspace.move_to_trash(path).await?;
        tracing::info!(path, "moved workspace file to trash");
        sink.post(OutboundMessage::RefreshFileTree);
        Ok(DeleteFileResult { success: true })
    }

    async fn create_file(
        &self,
        workspace: &dyn WorkspaceHost,
        request_id: &str,
        token: &CancellationToken,
        sink: &dyn MessageSink,
    ) -> Result<CreateFileResult, PanelError> {
        let prompt = new_file_prompt(Some(workspace.root().to_path_buf()));
        let answer = until_cancelled(token, request_id, self.prompts.input_text(prompt)).await?;
        let Some(path) = answer
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
        else {
            return Err(PanelError::UserCancelled(
                "File creation cancelled by user.".to_string(),
            ));
        };

        self.commit(request_id)?;
        workspace.create_empty_file(&path).await?;
        tracing::info!(path = %path, "created workspace file");
        sink.post(OutboundMessage::RefreshFileTree);
        Ok(CreateFileResult {
            success: true,
            path,
        })
    }

    async fn call_model(
        &self,
        command: PanelCommand,
        config: &AiConfig,
        parts: PromptParts,
        format: ResponseFormat,
    ) -> Result<String, PanelError> {
        let model = self
            .settings
            .resolve_model(config.model.as_deref())
            .map_err(|message| PanelError::InvalidPayload {
                command: command.as_str().to_string(),
                message,
            })?;
        check_prompt_budget(command.as_str(), &parts, self.settings.max_prompt_chars)?;

        let request = GenerationRequest {
            model,
            system_instruction: parts.system_instruction,
            prompt: parts.prompt,
            format,
        };
        tracing::debug!(command = command.as_str(), model = %request.model, "calling generative model");

        with_deadline(
            command.as_str(),
            self.settings.ai_request_timeout(),
            self.ai.generate(request),
        )
        .await
        .map_err(|error| match error {
            PanelError::DeadlineExceeded { .. } => PanelError::AiApi(error.to_string()),
            other => other,
        })
    }

    async fn generate_text(
        &self,
        command: PanelCommand,
        config: &AiConfig,
        parts: PromptParts,
    ) -> Result<String, PanelError> {
        let text = self
            .call_model(command, config, parts, ResponseFormat::Text)
            .await?;
        Ok(text.trim().to_string())
    }

    async fn generate_array<T: DeserializeOwned>(
        &self,
        command: PanelCommand,
        config: &AiConfig,
        parts: PromptParts,
        schema: Value,
    ) -> Result<Vec<T>, PanelError> {
        let raw = self
            .call_model(command, config, parts, ResponseFormat::Json { schema })
            .await?;
        parse_structured_array(&raw, command.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::test_support::{
        dispatcher_with, FakeAi, RecordingSink, ScriptedPrompts, SlowTrashWorkspace,
    };
    use serde_json::json;
    use std::fs;
    use std::sync::atomic::Ordering;

    fn message(command: &str, payload: Value, request_id: &str) -> InboundMessage {
        InboundMessage {
            command: command.to_string(),
            payload,
            request_id: request_id.to_string(),
        }
    }

    fn only_response(sink: &RecordingSink, request_id: &str) -> (Value, Option<String>) {
        let responses = sink.responses_for(request_id);
        assert_eq!(responses.len(), 1, "expected exactly one response for {request_id}");
        match responses.into_iter().next().unwrap() {
            OutboundMessage::Response { payload, error, .. } => (payload, error),
            OutboundMessage::RefreshFileTree => unreachable!(),
        }
    }

    fn workspace_dir(files: &[(&str, &str)]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (path, contents) in files {
            let target = dir.path().join(path);
            fs::create_dir_all(target.parent().unwrap()).unwrap();
            fs::write(target, contents).unwrap();
        }
        dir
    }

    fn default_dispatcher(root: Option<&std::path::Path>) -> PanelDispatcher {
        dispatcher_with(
            root,
            Arc::new(ScriptedPrompts::default()),
            Arc::new(FakeAi::replying("")),
            PanelSettings::default(),
        )
    }

    #[tokio::test]
    async fn reads_file_content_with_timestamp_marker() {
        let dir = workspace_dir(&[("a.txt", "hello")]);
        let dispatcher = default_dispatcher(Some(dir.path()));
        let sink = RecordingSink::default();

        dispatcher
            .handle_message(message("getFileContent", json!({ "path": "a.txt" }), "r1"), &sink)
            .await;

        let (payload, error) = only_response(&sink, "r1");
        assert_eq!(error, None);
        assert_eq!(payload["content"], "hello");
        let sha = payload["sha"].as_str().unwrap();
        assert!(sha.parse::<u128>().is_ok());
    }

    #[tokio::test]
    async fn workspace_commands_fail_without_workspace() {
        let dispatcher = default_dispatcher(None);
        let sink = RecordingSink::default();

        dispatcher
            .handle_message(message("getInitialData", Value::Null, "r1"), &sink)
            .await;
        dispatcher
            .handle_message(message("getFileContent", json!({ "path": "a.txt" }), "r2"), &sink)
            .await;

        for request_id in ["r1", "r2"] {
            let (payload, error) = only_response(&sink, request_id);
            assert_eq!(payload, Value::Null);
            assert_eq!(error, Some(PanelError::NoWorkspace.to_string()));
        }
    }

    #[tokio::test]
    async fn initial_data_lists_files_without_ignored_directories() {
        let dir = workspace_dir(&[
            ("src/main.rs", "fn main() {}"),
            ("node_modules/pkg/index.js", ""),
            (".git/HEAD", "ref: refs/heads/main"),
        ]);
        let dispatcher = default_dispatcher(Some(dir.path()));
        let sink = RecordingSink::default();

        dispatcher
            .handle_message(message("getInitialData", Value::Null, "init"), &sink)
            .await;

        let (payload, error) = only_response(&sink, "init");
        assert_eq!(error, None);
        let data: InitialData = serde_json::from_value(payload).unwrap();
        let paths = data
            .file_tree
            .iter()
            .map(|item| item.path.as_str())
            .collect::<Vec<_>>();
        assert_eq!(paths, vec!["src/main.rs"]);
        assert_eq!(data.repo.owner.login, "local");
        assert!(data.repo.private);
        assert!(data.repo.file_tree.is_empty());
        assert_eq!(data.user.id, "local-user");
    }

    #[tokio::test]
    async fn update_creates_file_in_existing_directory_only() {
        let dir = workspace_dir(&[("src/lib.rs", "")]);
        let dispatcher = default_dispatcher(Some(dir.path()));
        let sink = RecordingSink::default();

        dispatcher
            .handle_message(
                message(
                    "updateFileContent",
                    json!({ "path": "src/new.rs", "newContent": "pub fn f() {}" }),
                    "ok",
                ),
                &sink,
            )
            .await;
        dispatcher
            .handle_message(
                message(
                    "updateFileContent",
                    json!({ "path": "nope/new.rs", "newContent": "x" }),
                    "bad",
                ),
                &sink,
            )
            .await;

        let (payload, error) = only_response(&sink, "ok");
        assert_eq!(error, None);
        assert!(payload["newSha"].as_str().is_some());
        assert_eq!(
            fs::read_to_string(dir.path().join("src/new.rs")).unwrap(),
            "pub fn f() {}"
        );

        let (_, error) = only_response(&sink, "bad");
        assert!(error.unwrap().starts_with("Failed to write file nope/new.rs:"));
    }

    #[tokio::test]
    async fn declined_delete_leaves_file_and_skips_refresh() {
        let dir = workspace_dir(&[("a.txt", "keep me")]);
        let prompts = Arc::new(ScriptedPrompts::confirming(false));
        let dispatcher = dispatcher_with(
            Some(dir.path()),
            prompts.clone(),
            Arc::new(FakeAi::replying("")),
            PanelSettings::default(),
        );
        let sink = RecordingSink::default();

        dispatcher
            .handle_message(message("deleteFile", json!({ "path": "a.txt" }), "del"), &sink)
            .await;

        let (_, error) = only_response(&sink, "del");
        assert_eq!(error.as_deref(), Some("Deletion cancelled by user."));
        assert_eq!(prompts.confirm_calls.load(Ordering::SeqCst), 1);
        assert_eq!(sink.refresh_count(), 0);
        assert_eq!(fs::read_to_string(dir.path().join("a.txt")).unwrap(), "keep me");
    }

    #[tokio::test]
    async fn confirmed_delete_removes_file_and_refreshes_before_responding() {
        let dir = workspace_dir(&[("a.txt", "bye")]);
        let dispatcher = dispatcher_with(
            Some(dir.path()),
            Arc::new(ScriptedPrompts::confirming(true)),
            Arc::new(FakeAi::replying("")),
            PanelSettings::default(),
        );
        let sink = RecordingSink::default();

        dispatcher
            .handle_message(message("deleteFile", json!({ "path": "a.txt" }), "del"), &sink)
            .await;

        let messages = sink.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], OutboundMessage::RefreshFileTree);
        assert_eq!(
            messages[1],
            OutboundMessage::success("del", json!({ "success": true }))
        );
        assert!(!dir.path().join("a.txt").exists());
    }

    #[tokio::test]
    async fn delete_rejects_escaping_path_without_prompting() {
        let dir = workspace_dir(&[]);
        let prompts = Arc::new(ScriptedPrompts::confirming(true));
        let dispatcher = dispatcher_with(
            Some(dir.path()),
            prompts.clone(),
            Arc::new(FakeAi::replying("")),
            PanelSettings::default(),
        );
        let sink = RecordingSink::default();

        dispatcher
            .handle_message(message("deleteFile", json!({ "path": "../x" }), "del"), &sink)
            .await;

        let (_, error) = only_response(&sink, "del");
        assert!(error.unwrap().starts_with("Invalid path"));
        assert_eq!(prompts.confirm_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cancelled_or_blank_create_makes_nothing() {
        for answer in [None, Some("   ")] {
            let dir = workspace_dir(&[]);
            let prompts = Arc::new(ScriptedPrompts::answering(answer));
            let dispatcher = dispatcher_with(
                Some(dir.path()),
                prompts.clone(),
                Arc::new(FakeAi::replying("")),
                PanelSettings::default(),
            );
            let sink = RecordingSink::default();

            dispatcher
                .handle_message(message("createFile", Value::Null, "new"), &sink)
                .await;

            let (_, error) = only_response(&sink, "new");
            assert_eq!(error.as_deref(), Some("File creation cancelled by user."));
            assert_eq!(prompts.input_calls.load(Ordering::SeqCst), 1);
            assert_eq!(sink.refresh_count(), 0);
            assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
        }
    }

    #[tokio::test]
    async fn create_makes_empty_file_and_refreshes() {
        let dir = workspace_dir(&[]);
        let dispatcher = dispatcher_with(
            Some(dir.path()),
            Arc::new(ScriptedPrompts::answering(Some("src/components/New.tsx"))),
            Arc::new(FakeAi::replying("")),
            PanelSettings::default(),
        );
        let sink = RecordingSink::default();

        dispatcher
            .handle_message(message("createFile", Value::Null, "new"), &sink)
            .await;

        let (payload, error) = only_response(&sink, "new");
        assert_eq!(error, None);
        assert_eq!(payload, json!({ "success": true, "path": "src/components/New.tsx" }));
        assert_eq!(sink.refresh_count(), 1);
        assert_eq!(
            fs::metadata(dir.path().join("src/components/New.tsx"))
                .unwrap()
                .len(),
            0
        );
    }

    #[tokio::test]
    async fn unknown_command_and_bad_payload_still_get_one_response() {
        let dir = workspace_dir(&[]);
        let dispatcher = default_dispatcher(Some(dir.path()));
        let sink = RecordingSink::default();

        dispatcher
            .handle_message(message("formatDisk", Value::Null, "u1"), &sink)
            .await;
        dispatcher
            .handle_message(message("getFileContent", json!({ "file": 3 }), "u2"), &sink)
            .await;

        let (_, error) = only_response(&sink, "u1");
        assert_eq!(error.as_deref(), Some("Unknown command: formatDisk"));
        let (_, error) = only_response(&sink, "u2");
        assert!(error.unwrap().starts_with("Invalid payload for getFileContent"));
    }

    #[tokio::test]
    async fn code_suggestion_is_trimmed_and_uses_requested_model() {
        let ai = Arc::new(FakeAi::replying("\n  fn main() { println!(\"hi\"); }\n\n"));
        let dispatcher = dispatcher_with(
            None,
            Arc::new(ScriptedPrompts::default()),
            ai.clone(),
            PanelSettings::default(),
        );
        let sink = RecordingSink::default();

        dispatcher
            .handle_message(
                message(
                    "gemini:generateCodeSuggestion",
                    json!({
                        "config": { "model": "gemini-pro" },
                        "fileContent": "fn main() {}",
                        "userInstruction": "say hi",
                        "fileName": "src/main.rs",
                        "fullFileTree": "src/main.rs",
                        "aiRules": ""
                    }),
                    "ai1",
                ),
                &sink,
            )
            .await;

        let (payload, error) = only_response(&sink, "ai1");
        assert_eq!(error, None);
        assert_eq!(payload, json!("fn main() { println!(\"hi\"); }"));

        let requests = ai.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].model, "gemini-pro");
        assert_eq!(requests[0].format, ResponseFormat::Text);
        assert!(requests[0].system_instruction.is_some());
    }

    #[tokio::test]
    async fn project_analysis_returns_typed_findings_with_default_model() {
        let ai = Arc::new(FakeAi::replying(
            r#"[{"file": "src/main.rs", "line": 4, "severity": "warning", "description": "unwrap", "suggestion": "use ?"}]"#,
        ));
        let dispatcher = dispatcher_with(
            None,
            Arc::new(ScriptedPrompts::default()),
            ai.clone(),
            PanelSettings::default(),
        );
        let sink = RecordingSink::default();

        dispatcher
            .handle_message(
                message(
                    "generateProjectAnalysis",
                    json!({ "config": {}, "fileTree": "src/main.rs", "filesContent": [] }),
                    "ai2",
                ),
                &sink,
            )
            .await;

        let (payload, error) = only_response(&sink, "ai2");
        assert_eq!(error, None);
        assert_eq!(
            payload,
            json!([{ "file": "src/main.rs", "line": 4, "severity": "warning", "description": "unwrap", "suggestion": "use ?" }])
        );
        let requests = ai.requests();
        assert_eq!(requests[0].model, "gemini-2.5-flash");
        assert!(matches!(requests[0].format, ResponseFormat::Json { .. }));
    }

    #[tokio::test]
    async fn malformed_structured_reply_is_an_ai_error() {
        let dispatcher = dispatcher_with(
            None,
            Arc::new(ScriptedPrompts::default()),
            Arc::new(FakeAi::replying(r#"{"path": "tmp.log"}"#)),
            PanelSettings::default(),
        );
        let sink = RecordingSink::default();

        dispatcher
            .handle_message(
                message(
                    "gemini:generateRepoCleanupSuggestions",
                    json!({ "config": {}, "fileTree": "tmp.log" }),
                    "ai3",
                ),
                &sink,
            )
            .await;

        let (payload, error) = only_response(&sink, "ai3");
        assert_eq!(payload, Value::Null);
        assert!(error.unwrap().starts_with("Gemini API error:"));
    }

    #[tokio::test]
    async fn backend_failure_surfaces_as_error_string() {
        let dispatcher = dispatcher_with(
            None,
            Arc::new(ScriptedPrompts::default()),
            Arc::new(FakeAi::failing(PanelError::AiApi(
                "request failed with status 500.".to_string(),
            ))),
            PanelSettings::default(),
        );
        let sink = RecordingSink::default();

        dispatcher
            .handle_message(
                message(
                    "applyProjectAnalysisSuggestion",
                    json!({
                        "config": {},
                        "fileContent": "x",
                        "finding": { "file": "a.rs", "severity": "error", "description": "d", "suggestion": "s" },
                        "userRefinement": ""
                    }),
                    "ai4",
                ),
                &sink,
            )
            .await;

        let (_, error) = only_response(&sink, "ai4");
        assert_eq!(
            error.as_deref(),
            Some("Gemini API error: request failed with status 500.")
        );
    }

    #[tokio::test]
    async fn oversized_prompt_never_reaches_the_model() {
        let ai = Arc::new(FakeAi::replying("[]"));
        let settings = PanelSettings {
            max_prompt_chars: 64,
            ..PanelSettings::default()
        };
        let dispatcher =
            dispatcher_with(None, Arc::new(ScriptedPrompts::default()), ai.clone(), settings);
        let sink = RecordingSink::default();

        dispatcher
            .handle_message(
                message(
                    "generateRepoCleanupSuggestions",
                    json!({ "config": {}, "fileTree": "a\n".repeat(100) }),
                    "big",
                ),
                &sink,
            )
            .await;

        let (_, error) = only_response(&sink, "big");
        assert!(error.unwrap().contains("character budget"));
        assert!(ai.requests().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_model_hits_deadline_as_ai_error() {
        let settings = PanelSettings {
            ai_request_timeout_ms: 1_000,
            ..PanelSettings::default()
        };
        let dispatcher = dispatcher_with(
            None,
            Arc::new(ScriptedPrompts::default()),
            Arc::new(FakeAi::replying("late").delayed(Duration::from_secs(60))),
            settings,
        );
        let sink = RecordingSink::default();

        dispatcher
            .handle_message(
                message(
                    "generateRepoCleanupSuggestions",
                    json!({ "config": {}, "fileTree": "a" }),
                    "slow",
                ),
                &sink,
            )
            .await;

        let (_, error) = only_response(&sink, "slow");
        let error = error.unwrap();
        assert!(error.starts_with("Gemini API error:"));
        assert!(error.contains("1000 ms"));
        assert_eq!(dispatcher.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn cancel_request_settles_in_flight_call_once() {
        let dispatcher = Arc::new(dispatcher_with(
            None,
            Arc::new(ScriptedPrompts::default()),
            Arc::new(FakeAi::replying("never").delayed(Duration::from_secs(3600))),
            PanelSettings::default(),
        ));
        let sink = Arc::new(RecordingSink::default());

        let running = {
            let dispatcher = dispatcher.clone();
            let sink = sink.clone();
            tokio::spawn(async move {
                dispatcher
                    .handle_message(
                        message(
                            "generateCodeSuggestion",
                            json!({
                                "fileContent": "",
                                "userInstruction": "wait",
                                "fileName": "a.rs"
                            }),
                            "long",
                        ),
                        sink.as_ref(),
                    )
                    .await;
            })
        };

        while dispatcher.in_flight_count() == 0 {
            tokio::task::yield_now().await;
        }

        dispatcher
            .handle_message(
                message("cancelRequest", json!({ "requestId": "long" }), "cancel"),
                sink.as_ref(),
            )
            .await;
        running.await.unwrap();

        let (payload, error) = only_response(&sink, "cancel");
        assert_eq!(error, None);
        assert_eq!(payload, json!({ "cancelled": true }));
        let (_, error) = only_response(&sink, "long");
        assert_eq!(error.as_deref(), Some("Request long was cancelled."));
        assert_eq!(dispatcher.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn cancelling_unknown_request_reports_false() {
        let dispatcher = default_dispatcher(None);
        let sink = RecordingSink::default();

        dispatcher
            .handle_message(
                message("cancelRequest", json!({ "requestId": "ghost" }), "c1"),
                &sink,
            )
            .await;

        let (payload, _) = only_response(&sink, "c1");
        assert_eq!(payload, json!({ "cancelled": false }));
    }

    #[tokio::test]
    async fn path_like_model_is_rejected_before_any_call() {
        let ai = Arc::new(FakeAi::replying("x"));
        let dispatcher = dispatcher_with(
            None,
            Arc::new(ScriptedPrompts::default()),
            ai.clone(),
            PanelSettings::default(),
        );
        let sink = RecordingSink::default();

        dispatcher
            .handle_message(
                message(
                    "generateCodeSuggestion",
                    json!({
                        "config": { "model": "../../../evil/path?x=" },
                        "fileContent": "",
                        "userInstruction": "x",
                        "fileName": "a.rs"
                    }),
                    "bad-model",
                ),
                &sink,
            )
            .await;

        let (_, error) = only_response(&sink, "bad-model");
        assert_eq!(
            error.as_deref(),
            Some(
                "Invalid payload for generateCodeSuggestion: config.model contains unsupported characters: ../../../evil/path?x="
            )
        );
        assert!(ai.requests().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_trash_outlives_file_deadline_and_still_refreshes() {
        let dir = workspace_dir(&[("a.txt", "bye")]);
        let settings = PanelSettings {
            file_operation_timeout_ms: 1_000,
            ..PanelSettings::default()
        };
        let dispatcher = PanelDispatcher::new(
            settings,
            Arc::new(ScriptedPrompts::confirming(true)),
            Arc::new(FakeAi::replying("")),
        )
        .with_workspace(Arc::new(SlowTrashWorkspace::open(
            dir.path(),
            Duration::from_secs(60),
        )));
        let sink = RecordingSink::default();

        dispatcher
            .handle_message(message("deleteFile", json!({ "path": "a.txt" }), "del"), &sink)
            .await;

        assert_eq!(
            sink.messages(),
            vec![
                OutboundMessage::RefreshFileTree,
                OutboundMessage::success("del", json!({ "success": true })),
            ]
        );
        assert!(!dir.path().join("a.txt").exists());
    }

    #[tokio::test]
    async fn cancel_after_delete_started_is_refused() {
        let dir = workspace_dir(&[("a.txt", "bye")]);
        let workspace = Arc::new(SlowTrashWorkspace::open(
            dir.path(),
            Duration::from_millis(50),
        ));
        let dispatcher = Arc::new(
            PanelDispatcher::new(
                PanelSettings::default(),
                Arc::new(ScriptedPrompts::confirming(true)),
                Arc::new(FakeAi::replying("")),
            )
            .with_workspace(workspace.clone()),
        );
        let sink = Arc::new(RecordingSink::default());

        let running = {
            let dispatcher = dispatcher.clone();
            let sink = sink.clone();
            tokio::spawn(async move {
                dispatcher
                    .handle_message(
                        message("deleteFile", json!({ "path": "a.txt" }), "del"),
                        sink.as_ref(),
                    )
                    .await;
            })
        };

        while !workspace.trash_started.load(Ordering::SeqCst) {
            tokio::task::yield_now().await;
        }
        dispatcher
            .handle_message(
                message("cancelRequest", json!({ "requestId": "del" }), "cancel"),
                sink.as_ref(),
            )
            .await;
        running.await.unwrap();

        let (payload, _) = only_response(&sink, "cancel");
        assert_eq!(payload, json!({ "cancelled": false }));
        let (payload, error) = only_response(&sink, "del");
        assert_eq!(error, None);
        assert_eq!(payload, json!({ "success": true }));
        assert_eq!(sink.refresh_count(), 1);
        assert!(!dir.path().join("a.txt").exists());
    }

    #[tokio::test]
    async fn cancel_during_delete_prompt_leaves_file() {
        let dir = workspace_dir(&[("a.txt", "keep")]);
        let prompts = Arc::new(ScriptedPrompts::hanging());
        let dispatcher = Arc::new(dispatcher_with(
            Some(dir.path()),
            prompts.clone(),
            Arc::new(FakeAi::replying("")),
            PanelSettings::default(),
        ));
        let sink = Arc::new(RecordingSink::default());

        let running = {
            let dispatcher = dispatcher.clone();
            let sink = sink.clone();
            tokio::spawn(async move {
                dispatcher
                    .handle_message(
                        message("deleteFile", json!({ "path": "a.txt" }), "del"),
                        sink.as_ref(),
                    )
                    .await;
            })
        };

        while prompts.confirm_calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
        dispatcher
            .handle_message(
                message("cancelRequest", json!({ "requestId": "del" }), "cancel"),
                sink.as_ref(),
            )
            .await;
        running.await.unwrap();

        let (_, error) = only_response(&sink, "del");
        assert_eq!(error.as_deref(), Some("Request del was cancelled."));
        assert_eq!(sink.refresh_count(), 0);
        assert_eq!(fs::read_to_string(dir.path().join("a.txt")).unwrap(), "keep");
        assert_eq!(dispatcher.in_flight_count(), 0);
    }
}
