use parking_lot::Mutex;
use storechat_core::{ChatTurnRequest, Message, MessageId, SessionState};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info_span, warn, Instrument};

use crate::backend::ChatBackend;
use crate::error::{ClientError, Result};
use crate::reconcile::{
    classify_failure, transport_failure_text, FailureKind, EMPTY_REPLY_TEXT, GENERIC_ERROR_TEXT,
    QUOTA_EXCEEDED_STATUS,
};
use crate::stream::{CompletedReply, NoopObserver, StreamConsumer, StreamObserver, StreamOutcome};

/// How a call to [`ChatSession::send_message`] settled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Blank input, or another turn was already in flight
    Ignored,
    /// The reply was appended to the conversation
    Replied { message_id: MessageId },
    /// Out of credits. Nothing was appended for the reply.
    QuotaExceeded,
    /// An error entry was appended
    Failed { message_id: MessageId },
    /// Stopped before the reply finished; nothing was appended for it
    Cancelled,
}

enum TurnResult {
    Reply(CompletedReply),
    Failure(FailureKind),
    Transport(ClientError),
    Cancelled,
}

/// Owns one conversation and drives its request/response cycles.
///
/// The session is the only writer of its [`SessionState`]; everyone else reads
/// through [`snapshot`](Self::snapshot) or [`subscribe`](Self::subscribe).
pub struct ChatSession<B: ChatBackend> {
    backend: B,
    state: watch::Sender<SessionState>,
    in_flight: Mutex<Option<CancellationToken>>,
}

impl<B: ChatBackend> ChatSession<B> {
    pub fn new(backend: B, initial_credits: u64) -> Self {
        let (state, _) = watch::channel(SessionState::new(initial_credits));
        Self {
            backend,
            state,
            in_flight: Mutex::new(None),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Current state, cloned
    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Receiver notified after every state change
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading()
    }

    pub async fn send_message(&self, text: &str) -> SendOutcome {
        self.send_message_with(text, &mut NoopObserver).await
    }

    /// Send `text` as the next user turn, reporting the reply as it streams in.
    ///
    /// Blank text and calls made while a turn is in flight are ignored without
    /// touching the conversation.
    pub async fn send_message_with<O>(&self, text: &str, observer: &mut O) -> SendOutcome
    where
        O: StreamObserver + ?Sized,
    {
        if text.trim().is_empty() {
            return SendOutcome::Ignored;
        }

        let cancel = CancellationToken::new();
        let start = {
            let mut in_flight = self.in_flight.lock();
            let mut start = None;
            self.state.send_if_modified(|state| {
                start = state.begin_turn(text);
                start.is_some()
            });
            if start.is_some() {
                *in_flight = Some(cancel.clone());
            }
            start
        };

        let Some(start) = start else {
            debug!("turn already in flight, ignoring message");
            return SendOutcome::Ignored;
        };

        let guard = TurnGuard {
            state: &self.state,
            in_flight: &self.in_flight,
            settled: false,
        };

        let request = ChatTurnRequest::new(text, start.history);
        let span = info_span!(
            "chat_turn",
            message_id = start.message_id,
            history = request.chat_history.len()
        );
        let result = self
            .run_turn(&request, observer, &cancel)
            .instrument(span)
            .await;

        self.commit(result, guard)
    }

    async fn run_turn<O>(
        &self,
        request: &ChatTurnRequest,
        observer: &mut O,
        cancel: &CancellationToken,
    ) -> TurnResult
    where
        O: StreamObserver + ?Sized,
    {
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return TurnResult::Cancelled,
            response = self.backend.open_turn(request) => response,
        };

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                error!("chat request failed: {}", e);
                return TurnResult::Transport(e);
            }
        };

        if !response.is_success() {
            let status = response.status;
            if status == QUOTA_EXCEEDED_STATUS {
                return TurnResult::Failure(FailureKind::QuotaExceeded);
            }
            let body = tokio::select! {
                biased;
                _ = cancel.cancelled() => return TurnResult::Cancelled,
                body = response.text() => body,
            };
            let body = match body {
                Ok(body) => Some(body),
                Err(e) => {
                    warn!(status, "could not read error body: {}", e);
                    None
                }
            };
            return TurnResult::Failure(classify_failure(status, body.as_deref()));
        }

        match StreamConsumer::new()
            .consume(response.into_frames(), observer, cancel)
            .await
        {
            Ok(StreamOutcome::Completed(reply)) => TurnResult::Reply(reply),
            Ok(StreamOutcome::Cancelled) => TurnResult::Cancelled,
            Err(e) => {
                error!("reply stream failed: {}", e);
                TurnResult::Transport(e)
            }
        }
    }

    // The final entry and the end of loading land in one notification.
    fn commit(&self, result: TurnResult, guard: TurnGuard<'_>) -> SendOutcome {
        match result {
            TurnResult::Reply(CompletedReply { text, metadata }) => {
                let text = if text.trim().is_empty() {
                    EMPTY_REPLY_TEXT.to_string()
                } else {
                    text
                };
                let message_id = guard.settle(|state| state.apply_reply(text, &metadata));
                debug!(message_id, intent = ?metadata.intent, credits = ?metadata.token_credits, "reply committed");
                SendOutcome::Replied { message_id }
            }
            TurnResult::Failure(FailureKind::QuotaExceeded) => {
                warn!("insufficient credits");
                guard.settle(|_| ());
                SendOutcome::QuotaExceeded
            }
            TurnResult::Failure(kind) => {
                let text = kind
                    .into_message()
                    .unwrap_or_else(|| GENERIC_ERROR_TEXT.to_string());
                SendOutcome::Failed {
                    message_id: guard.settle(|state| state.push_error(text)),
                }
            }
            TurnResult::Transport(e) => {
                let text = transport_failure_text(&e);
                SendOutcome::Failed {
                    message_id: guard.settle(|state| state.push_error(text)),
                }
            }
            TurnResult::Cancelled => {
                debug!("turn cancelled");
                guard.settle(|_| ());
                SendOutcome::Cancelled
            }
        }
    }

    /// Cancel the turn in flight. Returns false when there was none.
    pub fn stop(&self) -> bool {
        match self.in_flight.lock().as_ref() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Forget the conversation. Credits are kept.
    pub fn clear(&self) {
        self.state.send_modify(SessionState::clear);
    }

    /// Append a message built elsewhere. Its id is replaced with one from
    /// this session's sequence.
    pub fn add_message(&self, mut message: Message) -> MessageId {
        let mut message_id = 0;
        self.state.send_modify(|state| {
            message.id = state.next_id();
            message_id = state.append(message);
        });
        message_id
    }

    pub fn update_token_credits(&self, credits: u64) {
        self.state.send_modify(|state| state.set_token_credits(credits));
    }

    pub fn set_current_intent(&self, intent: Option<String>) {
        self.state.send_modify(|state| state.set_current_intent(intent));
    }

    /// Ask the backend for the balance and store it when one is reported
    pub async fn refresh_credits(&self) -> Result<Option<u64>> {
        match self.backend.fetch_credits().await {
            Ok(Some(credits)) => {
                self.update_token_credits(credits);
                Ok(Some(credits))
            }
            Ok(None) => {
                debug!("backend reported no credit balance");
                Ok(None)
            }
            Err(e) => {
                warn!("failed to refresh credits: {}", e);
                Err(e)
            }
        }
    }
}

// Ends the turn exactly once: through `settle`, or on drop when the send
// future is abandoned.
struct TurnGuard<'a> {
    state: &'a watch::Sender<SessionState>,
    in_flight: &'a Mutex<Option<CancellationToken>>,
    settled: bool,
}

impl TurnGuard<'_> {
    /// Apply the turn's last change and clear the loading flag together
    fn settle<R, F>(mut self, update: F) -> R
    where
        R: Default,
        F: FnOnce(&mut SessionState) -> R,
    {
        self.settled = true;
        let mut in_flight = self.in_flight.lock();
        in_flight.take();
        let mut output = R::default();
        self.state.send_modify(|state| {
            output = update(state);
            state.finish_turn();
        });
        output
    }
}

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut in_flight = self.in_flight.lock();
        in_flight.take();
        self.state.send_modify(SessionState::finish_turn);
    }
}
