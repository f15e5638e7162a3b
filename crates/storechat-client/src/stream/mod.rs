pub mod consumer;
pub mod decoder;
pub mod frame;

pub use consumer::{CompletedReply, NoopObserver, StreamConsumer, StreamObserver, StreamOutcome};
pub use decoder::Utf8Decoder;
pub use frame::{decode_body, BodyFormat, FrameStream, ReplyFrame};
