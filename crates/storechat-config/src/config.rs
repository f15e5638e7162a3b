use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 主配置结构体
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub version: String,
    pub api: ApiConfig,
    pub chat: ChatConfig,
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            api: ApiConfig::default(),
            chat: ChatConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// 获取配置值的快捷方法
    pub fn get_value(&self, key: &str) -> Option<String> {
        let parts: Vec<&str> = key.split('.').collect();
        match parts.as_slice() {
            ["version"] => Some(self.version.clone()),
            ["api", "base_url"] => Some(self.api.base_url.clone()),
            ["api", "chat_path"] => Some(self.api.chat_path.clone()),
            ["api", "tokens_path"] => Some(self.api.tokens_path.clone()),
            ["api", "token_env"] => Some(self.api.token_env.clone()),
            ["api", "timeout_seconds"] => self.api.timeout_seconds.map(|s| s.to_string()),
            ["api", "headers", name] => self.api.headers.get(*name).cloned(),
            ["chat", "initial_credits"] => Some(self.chat.initial_credits.to_string()),
            ["logging", "level"] => Some(self.logging.level.to_string()),
            ["logging", "file"] => self.logging.file.clone(),
            ["logging", "json"] => Some(self.logging.json.to_string()),
            _ => None,
        }
    }

    /// 设置配置值
    ///
    /// 对可选项传入空字符串或 `none` 表示清除
    pub fn set_value(&mut self, key: &str, value: &str) -> ConfigResult<()> {
        let parts: Vec<&str> = key.split('.').collect();
        match parts.as_slice() {
            ["api", "base_url"] => {
                self.api.base_url = value.trim_end_matches('/').to_string();
            }
            ["api", "chat_path"] => {
                self.api.chat_path = value.to_string();
            }
            ["api", "tokens_path"] => {
                self.api.tokens_path = value.to_string();
            }
            ["api", "token_env"] => {
                self.api.token_env = value.to_string();
            }
            ["api", "timeout_seconds"] => {
                self.api.timeout_seconds = if is_unset(value) {
                    None
                } else {
                    Some(value.parse().map_err(|_| {
                        ConfigError::Validation(format!("Invalid number: {}", value))
                    })?)
                };
            }
            ["api", "headers", name] => {
                if is_unset(value) {
                    self.api.headers.remove(*name);
                } else {
                    self.api.headers.insert(name.to_string(), value.to_string());
                }
            }
            ["chat", "initial_credits"] => {
                self.chat.initial_credits = value.parse().map_err(|_| {
                    ConfigError::Validation(format!("Invalid number: {}", value))
                })?;
            }
            ["logging", "level"] => {
                self.logging.level = value.parse()?;
            }
            ["logging", "file"] => {
                self.logging.file = if is_unset(value) {
                    None
                } else {
                    Some(value.to_string())
                };
            }
            ["logging", "json"] => {
                self.logging.json = value.parse().map_err(|_| {
                    ConfigError::Validation(format!("Invalid boolean: {}", value))
                })?;
            }
            _ => return Err(ConfigError::KeyNotFound(key.to_string())),
        }
        Ok(())
    }
}

fn is_unset(value: &str) -> bool {
    value.is_empty() || value.eq_ignore_ascii_case("none")
}

/// 后端 API 配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    /// 后端地址 (e.g., "http://localhost:5008/api")
    pub base_url: String,
    pub chat_path: String,
    /// 余额查询路径
    pub tokens_path: String,
    /// 存放 bearer token 的环境变量名
    pub token_env: String,
    /// 请求超时（秒），默认不设置
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5008/api".to_string(),
            chat_path: "/chat".to_string(),
            tokens_path: "/chat/tokens".to_string(),
            token_env: "STORECHAT_TOKEN".to_string(),
            timeout_seconds: None,
            headers: HashMap::new(),
        }
    }
}

impl ApiConfig {
    /// 从环境变量读取 bearer token
    pub fn token(&self) -> Option<String> {
        std::env::var(&self.token_env)
            .ok()
            .filter(|token| !token.trim().is_empty())
    }
}

/// 会话配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChatConfig {
    /// 新会话的初始余额
    pub initial_credits: u64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            initial_credits: 100,
        }
    }
}

/// 日志级别
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl Default for LogLevel {
    fn default() -> Self {
        Self::Info
    }
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> ConfigResult<Self> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(ConfigError::Validation(format!("Invalid log level: {}", s))),
        }
    }
}

/// Logging 配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
    /// 日志文件；为空时输出到 stderr
    pub file: Option<String>,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            file: Some("~/.storechat/logs/storechat.log".to_string()),
            json: false,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Key not found: {0}")]
    KeyNotFound(String),

    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
