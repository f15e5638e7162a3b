use thiserror::Error;

/// Unified error type for backend communication
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("network error: {0}")]
    Network(String),

    #[error("api error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("authentication error: {0}")]
    Auth(String),

    #[error("stream error: {0}")]
    Stream(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("config error: {0}")]
    Config(String),
}

impl ClientError {
    /// The underlying message without the category prefix
    pub fn detail(&self) -> &str {
        match self {
            Self::Network(message)
            | Self::Auth(message)
            | Self::Stream(message)
            | Self::Decode(message)
            | Self::Config(message) => message,
            Self::Api { message, .. } => message,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
