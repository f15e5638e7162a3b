//! Turning a reply body into text deltas and metadata.

use async_stream::try_stream;
use eventsource_stream::Eventsource;
use futures::{Stream, StreamExt};
use serde_json::Value;
use std::pin::Pin;
use storechat_core::ReplyMetadata;
use tracing::warn;

use crate::backend::ByteStream;
use crate::error::{ClientError, Result};
use crate::stream::decoder::Utf8Decoder;

/// Stream of decoded reply frames
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<ReplyFrame>> + Send>>;

/// How a successful reply body is framed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFormat {
    /// Raw UTF-8 text; every chunk is part of the reply
    PlainText,
    /// Server-sent events carrying JSON payloads
    EventStream,
    /// A single JSON document with the whole reply
    Json,
}

impl BodyFormat {
    /// Pick the framing from a `Content-Type` header value
    pub fn from_content_type(content_type: Option<&str>) -> Self {
        let mime = content_type
            .and_then(|value| value.split(';').next())
            .map(|value| value.trim().to_ascii_lowercase())
            .unwrap_or_default();

        match mime.as_str() {
            "text/event-stream" => Self::EventStream,
            "application/json" => Self::Json,
            other if other.ends_with("+json") => Self::Json,
            _ => Self::PlainText,
        }
    }
}

/// One decoded unit of a reply
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyFrame {
    /// Text to append to the reply
    Text(String),
    /// Intent and/or credit balance
    Metadata(ReplyMetadata),
    /// The backend marked the reply complete
    Done,
}

/// Decode a reply body according to its framing
pub fn decode_body(format: BodyFormat, body: ByteStream) -> FrameStream {
    match format {
        BodyFormat::PlainText => Box::pin(plain_text_frames(body)),
        BodyFormat::EventStream => Box::pin(event_stream_frames(body)),
        BodyFormat::Json => Box::pin(json_frames(body)),
    }
}

fn plain_text_frames(mut body: ByteStream) -> impl Stream<Item = Result<ReplyFrame>> + Send {
    try_stream! {
        let mut decoder = Utf8Decoder::new();
        while let Some(chunk) = body.next().await {
            let text = decoder.decode(&chunk?)?;
            if !text.is_empty() {
                yield ReplyFrame::Text(text);
            }
        }
        decoder.finish()?;
    }
}

fn event_stream_frames(body: ByteStream) -> impl Stream<Item = Result<ReplyFrame>> + Send {
    try_stream! {
        let mut events = Box::pin(body.eventsource());
        while let Some(event) = events.next().await {
            let event = event.map_err(|e| ClientError::Stream(e.to_string()))?;
            let data = event.data.trim();
            if data.is_empty() {
                continue;
            }
            if data == "[DONE]" {
                yield ReplyFrame::Done;
                break;
            }

            let payload: Value = match serde_json::from_str(data) {
                Ok(payload) => payload,
                Err(e) => {
                    warn!("Failed to parse streaming data: {} - data: {}", e, data);
                    continue;
                }
            };

            if let Some(message) = payload.get("error").and_then(Value::as_str) {
                Err::<(), _>(ClientError::Stream(message.to_string()))?;
            }
            if let Some(text) = payload.get("content").and_then(Value::as_str) {
                if !text.is_empty() {
                    yield ReplyFrame::Text(text.to_string());
                }
            }
            let metadata = ReplyMetadata::from_value(&payload);
            if !metadata.is_empty() {
                yield ReplyFrame::Metadata(metadata);
            }
            if payload.get("done").and_then(Value::as_bool).unwrap_or(false) {
                yield ReplyFrame::Done;
                break;
            }
        }
    }
}

fn json_frames(mut body: ByteStream) -> impl Stream<Item = Result<ReplyFrame>> + Send {
    try_stream! {
        let mut raw = Vec::new();
        while let Some(chunk) = body.next().await {
            raw.extend_from_slice(&chunk?);
        }

        let payload: Value = serde_json::from_slice(&raw)
            .map_err(|e| ClientError::Decode(format!("invalid JSON reply: {}", e)))?;

        let text = payload
            .get("response")
            .or_else(|| payload.get("content"))
            .and_then(Value::as_str)
            .unwrap_or_default();
        if !text.is_empty() {
            yield ReplyFrame::Text(text.to_string());
        }
        let metadata = ReplyMetadata::from_value(&payload);
        if !metadata.is_empty() {
            yield ReplyFrame::Metadata(metadata);
        }
        yield ReplyFrame::Done;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use futures::TryStreamExt;

    fn body(chunks: Vec<Bytes>) -> ByteStream {
        Box::pin(futures::stream::iter(chunks.into_iter().map(Ok::<_, ClientError>)))
    }

    async fn collect(format: BodyFormat, chunks: Vec<&'static str>) -> Result<Vec<ReplyFrame>> {
        let chunks = chunks.into_iter().map(|c| Bytes::from_static(c.as_bytes())).collect();
        decode_body(format, body(chunks)).try_collect().await
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(
            BodyFormat::from_content_type(Some("text/event-stream; charset=utf-8")),
            BodyFormat::EventStream
        );
        assert_eq!(
            BodyFormat::from_content_type(Some("Application/JSON")),
            BodyFormat::Json
        );
        assert_eq!(
            BodyFormat::from_content_type(Some("application/problem+json")),
            BodyFormat::Json
        );
        assert_eq!(
            BodyFormat::from_content_type(Some("text/plain")),
            BodyFormat::PlainText
        );
        assert_eq!(BodyFormat::from_content_type(None), BodyFormat::PlainText);
    }

    #[tokio::test]
    async fn test_plain_text_frames() {
        let frames = collect(BodyFormat::PlainText, vec!["Hel", "lo, ", "world"])
            .await
            .unwrap();
        assert_eq!(
            frames,
            vec![
                ReplyFrame::Text("Hel".to_string()),
                ReplyFrame::Text("lo, ".to_string()),
                ReplyFrame::Text("world".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_plain_text_split_character() {
        // "é" is 0xC3 0xA9
        let chunks = vec![Bytes::from_static(b"caf\xC3"), Bytes::from_static(b"\xA9!")];
        let frames: Vec<ReplyFrame> = decode_body(BodyFormat::PlainText, body(chunks))
            .try_collect()
            .await
            .unwrap();
        assert_eq!(
            frames,
            vec![
                ReplyFrame::Text("caf".to_string()),
                ReplyFrame::Text("é!".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_event_stream_frames_across_chunk_boundaries() {
        let frames = collect(
            BodyFormat::EventStream,
            vec![
                "data: {\"content\": \"You have \"}\n\ndata: {\"con",
                "tent\": \"12 products.\"}\n\n",
                "data: {\"intent\": \"find_best_selling_products\", \"tokenCredits\": 988, \"done\": true}\n\n",
            ],
        )
        .await
        .unwrap();

        assert_eq!(
            frames,
            vec![
                ReplyFrame::Text("You have ".to_string()),
                ReplyFrame::Text("12 products.".to_string()),
                ReplyFrame::Metadata(ReplyMetadata {
                    intent: Some("find_best_selling_products".to_string()),
                    token_credits: Some(988),
                }),
                ReplyFrame::Done,
            ]
        );
    }

    #[tokio::test]
    async fn test_event_stream_skips_garbage_and_stops_at_done_sentinel() {
        let frames = collect(
            BodyFormat::EventStream,
            vec!["data: not json\n\ndata: {\"content\": \"ok\"}\n\ndata: [DONE]\n\ndata: {\"content\": \"late\"}\n\n"],
        )
        .await
        .unwrap();
        assert_eq!(
            frames,
            vec![ReplyFrame::Text("ok".to_string()), ReplyFrame::Done]
        );
    }

    #[tokio::test]
    async fn test_event_stream_error_payload() {
        let err = collect(
            BodyFormat::EventStream,
            vec!["data: {\"content\": \"par\"}\n\ndata: {\"error\": \"model overloaded\"}\n\n"],
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ClientError::Stream(ref m) if m == "model overloaded"));
    }

    #[tokio::test]
    async fn test_json_reply() {
        let frames = collect(
            BodyFormat::Json,
            vec!["{\"response\": \"Hi there\", ", "\"intent\": \"general_inquiry\", \"credits\": \"50\"}"],
        )
        .await
        .unwrap();
        assert_eq!(
            frames,
            vec![
                ReplyFrame::Text("Hi there".to_string()),
                ReplyFrame::Metadata(ReplyMetadata {
                    intent: Some("general_inquiry".to_string()),
                    token_credits: Some(50),
                }),
                ReplyFrame::Done,
            ]
        );
    }

    #[tokio::test]
    async fn test_json_reply_unparseable() {
        let err = collect(BodyFormat::Json, vec!["<html>oops"]).await.unwrap_err();
        assert!(matches!(err, ClientError::Decode(_)));
    }
}
