//! 日志配置
//!
//! 可以直接构造，也可以从 storechat 主配置转换。

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// 观测性配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// 应用名称
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// 日志配置
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// 设置日志级别
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.logging.level = level.into();
        self
    }

    /// 设置是否使用 JSON 格式
    pub fn with_json_format(mut self, json: bool) -> Self {
        self.logging.json_format = json;
        self
    }

    /// 设置日志文件路径
    pub fn with_log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.logging.file_path = Some(path.into());
        self
    }

    /// 添加模块特定的日志级别
    pub fn with_module_level(mut self, module: impl Into<String>, level: impl Into<String>) -> Self {
        self.logging.module_levels.insert(module.into(), level.into());
        self
    }
}

impl From<&storechat_config::Config> for Config {
    fn from(config: &storechat_config::Config) -> Self {
        let logging = &config.logging;
        Self {
            app_name: default_app_name(),
            logging: LoggingConfig {
                level: logging.level.to_string(),
                json_format: logging.json,
                file_path: logging
                    .file
                    .as_deref()
                    .and_then(storechat_config::expand_tilde),
                ..LoggingConfig::default()
            },
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别（trace, debug, info, warn, error）
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否使用 JSON 格式
    #[serde(default)]
    pub json_format: bool,

    /// 日志文件路径；未设置时输出到 stderr
    #[serde(default)]
    pub file_path: Option<PathBuf>,

    /// 模块级别的日志配置
    #[serde(default)]
    pub module_levels: HashMap<String, String>,

    /// 是否启用 ANSI 颜色（仅 stderr）
    #[serde(default = "default_true")]
    pub ansi_colors: bool,

    /// 是否包含目标（target）
    #[serde(default = "default_true")]
    pub include_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
            file_path: None,
            module_levels: HashMap::new(),
            ansi_colors: true,
            include_target: true,
        }
    }
}

fn default_app_name() -> String {
    "storechat".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders() {
        let config = Config::default()
            .with_log_level("debug")
            .with_json_format(true)
            .with_module_level("reqwest", "warn");

        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json_format);
        assert_eq!(config.logging.module_levels.get("reqwest").map(String::as_str), Some("warn"));
    }

    #[test]
    fn test_from_app_config() {
        let mut app = storechat_config::Config::default();
        app.set_value("logging.level", "warn").unwrap();
        app.set_value("logging.file", "/tmp/storechat-test.log").unwrap();
        app.set_value("logging.json", "true").unwrap();

        let config = Config::from(&app);
        assert_eq!(config.logging.level, "warn");
        assert!(config.logging.json_format);
        assert_eq!(config.logging.file_path, Some(PathBuf::from("/tmp/storechat-test.log")));
    }

    #[test]
    fn test_from_app_config_without_file() {
        let mut app = storechat_config::Config::default();
        app.set_value("logging.file", "none").unwrap();
        assert!(Config::from(&app).logging.file_path.is_none());
    }
}
