use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Default backend location used by development deployments
pub const DEFAULT_BASE_URL: &str = "http://localhost:5008/api";

/// Backend endpoint configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL for the API, without trailing slash
    pub base_url: String,
    /// Path of the conversation endpoint
    #[serde(default = "default_chat_path")]
    pub chat_path: String,
    /// Path of the remaining-credits endpoint
    #[serde(default = "default_tokens_path")]
    pub tokens_path: String,
    /// Whole-request timeout. Unset means requests may wait indefinitely.
    #[serde(with = "serde_duration", default)]
    pub timeout: Option<Duration>,
    /// Additional headers to include
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn with_chat_path(mut self, path: impl Into<String>) -> Self {
        self.chat_path = path.into();
        self
    }

    pub fn with_tokens_path(mut self, path: impl Into<String>) -> Self {
        self.tokens_path = path.into();
        self
    }

    /// Opt into a client-side timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn chat_url(&self) -> String {
        join_url(&self.base_url, &self.chat_path)
    }

    pub fn tokens_url(&self) -> String {
        join_url(&self.base_url, &self.tokens_path)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            chat_path: default_chat_path(),
            tokens_path: default_tokens_path(),
            timeout: None,
            headers: HashMap::new(),
        }
    }
}

fn default_chat_path() -> String {
    "/chat".to_string()
}

fn default_tokens_path() -> String {
    "/chat/tokens".to_string()
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

// Timeout is stored as whole seconds
mod serde_duration {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(duration) => serializer.serialize_some(&duration.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}
