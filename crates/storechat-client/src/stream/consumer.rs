use futures::{Stream, StreamExt};
use storechat_core::ReplyMetadata;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::Result;
use crate::stream::frame::ReplyFrame;

/// Receives the running reply text while it streams in
pub trait StreamObserver: Send {
    /// Called with the full text received so far, never just the delta
    fn on_text(&mut self, text: &str);
}

impl<F> StreamObserver for F
where
    F: FnMut(&str) + Send,
{
    fn on_text(&mut self, text: &str) {
        self(text)
    }
}

/// Observer that ignores partial text
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl StreamObserver for NoopObserver {
    fn on_text(&mut self, _text: &str) {}
}

/// A reply that streamed to completion
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletedReply {
    pub text: String,
    pub metadata: ReplyMetadata,
}

/// How a stream ended when it did not fail
#[derive(Debug, Clone, PartialEq)]
pub enum StreamOutcome {
    Completed(CompletedReply),
    /// The owner cancelled; whatever was received is discarded
    Cancelled,
}

/// Accumulates reply frames into the final text
#[derive(Debug, Default)]
pub struct StreamConsumer {
    buffer: String,
    metadata: ReplyMetadata,
    frames: usize,
}

impl StreamConsumer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read `frames` until the reply ends, the stream fails, or `cancel` fires.
    ///
    /// Cancellation is checked before every read; once it fires the observer
    /// sees nothing more.
    pub async fn consume<S, O>(
        mut self,
        mut frames: S,
        observer: &mut O,
        cancel: &CancellationToken,
    ) -> Result<StreamOutcome>
    where
        S: Stream<Item = Result<ReplyFrame>> + Unpin,
        O: StreamObserver + ?Sized,
    {
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(frames = self.frames, received = self.buffer.len(), "reply stream cancelled");
                    return Ok(StreamOutcome::Cancelled);
                }
                next = frames.next() => next,
            };

            let Some(frame) = next else {
                break;
            };
            self.frames += 1;

            match frame? {
                ReplyFrame::Text(delta) => {
                    if delta.is_empty() {
                        continue;
                    }
                    self.buffer.push_str(&delta);
                    observer.on_text(&self.buffer);
                }
                ReplyFrame::Metadata(metadata) => self.metadata.merge(metadata),
                ReplyFrame::Done => break,
            }
        }

        debug!(frames = self.frames, length = self.buffer.len(), "reply stream complete");
        Ok(StreamOutcome::Completed(CompletedReply {
            text: self.buffer,
            metadata: self.metadata,
        }))
    }
}
