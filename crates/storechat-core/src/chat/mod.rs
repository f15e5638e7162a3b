pub mod metadata;
pub mod request;

pub use metadata::{extract_credits, ReplyMetadata, CREDIT_FIELDS};
pub use request::ChatTurnRequest;
