use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use tokio_util::sync::CancellationToken;

#[derive(Debug)]
struct InFlightEntry {
    token: CancellationToken,
    committed: bool,
}

/// Cancellation tokens of requests currently executing, keyed by request id.
#[derive(Debug, Default)]
pub(crate) struct InFlightRequests {
    entries: Mutex<HashMap<String, InFlightEntry>>,
}

impl InFlightRequests {
    /// `None` when a request with the same id is already running.
    pub(crate) fn register(&self, request_id: &str) -> Option<CancellationToken> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if entries.contains_key(request_id) {
            return None;
        }
        let token = CancellationToken::new();
        entries.insert(
            request_id.to_string(),
            InFlightEntry {
                token: token.clone(),
                committed: false,
            },
        );
        Some(token)
    }

    /// Marks a request whose side effect is about to start; from here on it
    /// can no longer be cancelled. `false` when it was cancelled first.
    pub(crate) fn commit(&self, request_id: &str) -> bool {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        match entries.get_mut(request_id) {
            Some(entry) if entry.token.is_cancelled() => false,
            Some(entry) => {
                entry.committed = true;
                true
            }
            None => true,
        }
    }

    pub(crate) fn cancel(&self, request_id: &str) -> bool {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        match entries.get(request_id) {
            Some(entry) if !entry.committed => {
                entry.token.cancel();
                true
            }
            _ => false,
        }
    }

    pub(crate) fn finish(&self, request_id: &str) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(request_id);
    }

    pub(crate) fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Removes the registry entry when the request settles, on every path.
pub(crate) struct InFlightGuard<'a> {
    registry: &'a InFlightRequests,
    request_id: String,
}

impl<'a> InFlightGuard<'a> {
    pub(crate) fn new(registry: &'a InFlightRequests, request_id: &str) -> Self {
        Self {
            registry,
            request_id: request_id.to_string(),
        }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.registry.finish(&self.request_id);
    }
}
