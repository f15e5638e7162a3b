pub mod auth;
pub mod backend;
pub mod config;
pub mod error;
pub mod reconcile;
pub mod session;
pub mod stream;

// Re-export core types
pub use auth::{Authenticator, BearerAuth, NoAuth};
pub use backend::{ByteStream, ChatBackend, HttpBackend, TurnResponse};
pub use config::{ClientConfig, DEFAULT_BASE_URL};
pub use error::{ClientError, Result};
pub use reconcile::{
    classify_failure, transport_failure_text, FailureKind, EMPTY_REPLY_TEXT, GENERIC_ERROR_TEXT,
    QUOTA_EXCEEDED_STATUS,
};
pub use session::{ChatSession, SendOutcome};
pub use stream::{
    BodyFormat, CompletedReply, NoopObserver, ReplyFrame, StreamConsumer, StreamObserver,
    StreamOutcome,
};
