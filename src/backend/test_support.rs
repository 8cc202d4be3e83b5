use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::backend::command_dispatch::{MessageSink, PanelDispatcher};
use crate::backend::common::dtos::OutboundMessage;
use crate::backend::common::errors::PanelError;
use crate::backend::gemini_integration::{AiBackend, GenerationRequest};
use crate::backend::host_prompts::{ConfirmRequest, HostPrompts, TextInputRequest};
use crate::backend::panel_settings::PanelSettings;
use crate::backend::workspace_files::{LocalWorkspace, WorkspaceHost};

#[derive(Default)]
pub(crate) struct RecordingSink {
    messages: Mutex<Vec<OutboundMessage>>,
}

impl RecordingSink {
    pub(crate) fn messages(&self) -> Vec<OutboundMessage> {
        self.messages.lock().unwrap().clone()
    }

    pub(crate) fn responses_for(&self, request_id: &str) -> Vec<OutboundMessage> {
        self.messages()
            .into_iter()
            .filter(|message| message.request_id() == Some(request_id))
            .collect()
    }

    pub(crate) fn refresh_count(&self) -> usize {
        self.messages()
            .iter()
            .filter(|message| matches!(message, OutboundMessage::RefreshFileTree))
            .count()
    }
}

impl MessageSink for RecordingSink {
    fn post(&self, message: OutboundMessage) {
        self.messages.lock().unwrap().push(message);
    }
}

#[derive(Default)]
pub(crate) struct ScriptedPrompts {
    pub(crate) confirm_answer: bool,
    pub(crate) input_answer: Option<String>,
    pub(crate) hangs: bool,
    pub(crate) confirm_calls: AtomicUsize,
    pub(crate) input_calls: AtomicUsize,
}

impl ScriptedPrompts {
    pub(crate) fn confirming(answer: bool) -> Self {
        Self {
            confirm_answer: answer,
            ..Self::default()
        }
    }

    /// Prompts that never get an answer.
    pub(crate) fn hanging() -> Self {
        Self {
            hangs: true,
            ..Self::default()
        }
    }

    pub(crate) fn answering(answer: Option<&str>) -> Self {
        Self {
            input_answer: answer.map(ToOwned::to_owned),
            ..Self::default()
        }
    }
}

#[async_trait]
impl HostPrompts for ScriptedPrompts {
    async fn confirm(&self, _request: ConfirmRequest) -> bool {
        self.confirm_calls.fetch_add(1, Ordering::SeqCst);
        if self.hangs {
            std::future::pending::<()>().await;
        }
        self.confirm_answer
    }

    async fn input_text(&self, _request: TextInputRequest) -> Option<String> {
        self.input_calls.fetch_add(1, Ordering::SeqCst);
        if self.hangs {
            std::future::pending::<()>().await;
        }
        self.input_answer.clone()
    }
}

pub(crate) struct FakeAi {
    reply: Result<String, PanelError>,
    delay: Option<Duration>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl FakeAi {
    pub(crate) fn replying(text: &str) -> Self {
        Self {
            reply: Ok(text.to_string()),
            delay: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn failing(error: PanelError) -> Self {
        Self {
            reply: Err(error),
            delay: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl AiBackend for FakeAi {
    async fn generate(&self, request: GenerationRequest) -> Result<String, PanelError> {
        self.requests.lock().unwrap().push(request);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.reply.clone()
    }
}

/// Local workspace whose trash is a plain delete, so tests never touch the
/// user's real trash can.
pub(crate) struct TrashlessWorkspace {
    inner: LocalWorkspace,
}

impl TrashlessWorkspace {
    pub(crate) fn open(root: &Path) -> Self {
        Self {
            inner: LocalWorkspace::open(root).unwrap(),
        }
    }
}

#[async_trait]
impl WorkspaceHost for TrashlessWorkspace {
    fn root(&self) -> &Path {
        self.inner.root()
    }

    fn name(&self) -> String {
        self.inner.name()
    }

    async fn list_files(
        &self,
        ignore_globs: &[String],
        max_files: usize,
    ) -> Result<Vec<String>, PanelError> {
        self.inner.list_files(ignore_globs, max_files).await
    }

    async fn read_file(&self, path: &str) -> Result<Vec<u8>, PanelError> {
        self.inner.read_file(path).await
    }

    async fn write_file(&self, path: &str, contents: &[u8]) -> Result<(), PanelError> {
        self.inner.write_file(path, contents).await
    }

    async fn create_empty_file(&self, path: &str) -> Result<(), PanelError> {
        self.inner.create_empty_file(path).await
    }

    async fn move_to_trash(&self, path: &str) -> Result<(), PanelError> {
        let target = self.inner.resolve(path)?;
        tokio::fs::remove_file(&target)
            .await
            .map_err(|error| PanelError::io("delete", path, error))
    }
}

/// Workspace whose trash step takes `delay` before removing the file.
pub(crate) struct SlowTrashWorkspace {
    inner: TrashlessWorkspace,
    delay: Duration,
    pub(crate) trash_started: AtomicBool,
}

impl SlowTrashWorkspace {
    pub(crate) fn open(root: &Path, delay: Duration) -> Self {
        Self {
            inner: TrashlessWorkspace::open(root),
            delay,
            trash_started: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl WorkspaceHost for SlowTrashWorkspace {
    fn root(&self) -> &Path {
        self.inner.root()
    }

    fn name(&self) -> String {
        self.inner.name()
    }

    async fn list_files(
        &self,
        ignore_globs: &[String],
        max_files: usize,
    ) -> Result<Vec<String>, PanelError> {
        self.inner.list_files(ignore_globs, max_files).await
    }

    async fn read_file(&self, path: &str) -> Result<Vec<u8>, PanelError> {
        self.inner.read_file(path).await
    }

    async fn write_file(&self, path: &str, contents: &[u8]) -> Result<(), PanelError> {
        self.inner.write_file(path, contents).await
    }

    async fn create_empty_file(&self, path: &str) -> Result<(), PanelError> {
        self.inner.create_empty_file(path).await
    }

    async fn move_to_trash(&self, path: &str) -> Result<(), PanelError> {
        self.trash_started.store(true, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.inner.move_to_trash(path).await
    }
}

pub(crate) fn dispatcher_with(
    root: Option<&Path>,
    prompts: Arc<ScriptedPrompts>,
    ai: Arc<FakeAi>,
    settings: PanelSettings,
) -> PanelDispatcher {
    let dispatcher = PanelDispatcher::new(settings, prompts, ai);
    if let Some(root) = root {
        dispatcher.set_workspace(Some(Arc::new(TrashlessWorkspace::open(root))));
    }
    dispatcher
}
