pub mod http;

pub use http::HttpBackend;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, TryStreamExt};
use std::pin::Pin;
use storechat_core::ChatTurnRequest;

use crate::error::Result;
use crate::stream::{decode_body, BodyFormat, FrameStream};

/// Raw response body, chunk by chunk
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Status and unread body of a conversation turn
pub struct TurnResponse {
    pub status: u16,
    pub format: BodyFormat,
    pub body: ByteStream,
}

impl TurnResponse {
    pub fn new(status: u16, format: BodyFormat, body: ByteStream) -> Self {
        Self {
            status,
            format,
            body,
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode the body as reply frames
    pub fn into_frames(self) -> FrameStream {
        decode_body(self.format, self.body)
    }

    /// Read the whole body as text, replacing invalid UTF-8
    pub async fn text(self) -> Result<String> {
        let chunks: Vec<Bytes> = self.body.try_collect().await?;
        let raw: Vec<u8> = chunks.concat();
        Ok(String::from_utf8_lossy(&raw).into_owned())
    }
}

impl std::fmt::Debug for TurnResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnResponse")
            .field("status", &self.status)
            .field("format", &self.format)
            .finish_non_exhaustive()
    }
}

/// The backend a chat session talks to
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Send one conversation turn. Any HTTP status counts as a response;
    /// only a request that never got one is an error.
    async fn open_turn(&self, request: &ChatTurnRequest) -> Result<TurnResponse>;

    /// Current credit balance, if the backend reports one
    async fn fetch_credits(&self) -> Result<Option<u64>>;
}
