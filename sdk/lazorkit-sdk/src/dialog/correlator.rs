//! Matches asynchronous responses to outstanding requests by id.

use crate::dialog::message::Message;
use crate::error::ChannelError;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::Instant;

type Outcome = Result<Message, ChannelError>;

struct PendingRequest {
    created_at: Instant,
    sender: oneshot::Sender<Outcome>,
    timer: JoinHandle<()>,
}

/// Receiving half of a registered request.
#[derive(Debug)]
pub struct PendingHandle {
    id: String,
    receiver: oneshot::Receiver<Outcome>,
}

impl PendingHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Wait for the request to settle.
    pub async fn wait(self) -> Outcome {
        self.receiver
            .await
            .unwrap_or(Err(ChannelError::ChannelClosed))
    }
}

/// Table of pending requests. Each entry settles exactly once: by
/// `resolve`, `reject`, `reject_all`, or its timer.
#[derive(Clone, Default)]
pub struct RequestCorrelator {
    pending: Arc<Mutex<HashMap<String, PendingRequest>>>,
}

impl RequestCorrelator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `id` and start its timeout. Must be called inside a tokio runtime.
    pub fn register(&self, id: &str, timeout: Duration) -> Result<PendingHandle, ChannelError> {
        let mut pending = self.pending.lock();
        if pending.contains_key(id) {
            return Err(ChannelError::InvalidArgument(format!(
                "request {} already pending",
                id
            )));
        }

        let (sender, receiver) = oneshot::channel();
        let table = Arc::clone(&self.pending);
        let timer_id = id.to_string();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            let expired = table.lock().remove(&timer_id);
            if let Some(entry) = expired {
                tracing::debug!(
                    "request {} timed out after {:?}",
                    timer_id,
                    entry.created_at.elapsed()
                );
                let _ = entry.sender.send(Err(ChannelError::Timeout));
            }
        });

        pending.insert(
            id.to_string(),
            PendingRequest {
                created_at: Instant::now(),
                sender,
                timer,
            },
        );

        Ok(PendingHandle {
            id: id.to_string(),
            receiver,
        })
    }

    /// Settle `request_id` with a response. Returns false for unknown ids.
    pub fn resolve(&self, request_id: &str, message: Message) -> bool {
        self.settle(request_id, Ok(message))
    }

    /// Settle `request_id` with an error. Returns false for unknown ids.
    pub fn reject(&self, request_id: &str, error: ChannelError) -> bool {
        self.settle(request_id, Err(error))
    }

    /// Drop `request_id` without settling; its handle observes `ChannelClosed`.
    pub fn cancel(&self, request_id: &str) -> bool {
        match self.pending.lock().remove(request_id) {
            Some(entry) => {
                entry.timer.abort();
                true
            },
            None => false,
        }
    }

    /// Reject every pending request, returning how many were settled.
    pub fn reject_all(&self, error: ChannelError) -> usize {
        let drained: Vec<_> = self.pending.lock().drain().collect();
        let count = drained.len();
        for (id, entry) in drained {
            entry.timer.abort();
            tracing::debug!("rejecting pending request {}", id);
            let _ = entry.sender.send(Err(error.clone()));
        }
        count
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_pending(&self, request_id: &str) -> bool {
        self.pending.lock().contains_key(request_id)
    }

    fn settle(&self, request_id: &str, outcome: Outcome) -> bool {
        let entry = self.pending.lock().remove(request_id);
        match entry {
            Some(entry) => {
                entry.timer.abort();
                tracing::debug!(
                    "settling request {} after {:?}",
                    request_id,
                    entry.created_at.elapsed()
                );
                // Receiver may have been dropped by a caller that gave up.
                let _ = entry.sender.send(outcome);
                true
            },
            None => {
                tracing::debug!("no pending request for {}", request_id);
                false
            },
        }
    }
}

impl std::fmt::Debug for RequestCorrelator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestCorrelator")
            .field("pending", &self.pending_count())
            .finish()
    }
}
