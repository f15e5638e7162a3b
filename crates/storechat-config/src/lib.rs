pub mod config;
pub mod manager;

pub use config::{
    ApiConfig, ChatConfig, Config, ConfigError, ConfigResult, LogLevel, LoggingConfig,
};
pub use manager::ConfigManager;

use std::path::PathBuf;

/// 获取 storechat 配置目录路径
pub fn storechat_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".storechat"))
}

/// 获取默认配置文件路径
pub fn default_config_path() -> Option<PathBuf> {
    storechat_dir().map(|dir| dir.join("config.json"))
}

/// 初始化 storechat 目录结构
pub async fn init_storechat_dirs() -> ConfigResult<()> {
    if let Some(root) = storechat_dir() {
        tokio::fs::create_dir_all(root.join("logs")).await?;
    }
    Ok(())
}

/// 展开路径中的 ~ 为用户主目录
pub fn expand_tilde(path: &str) -> Option<PathBuf> {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir().map(|home| home.join(rest)),
        None => Some(PathBuf::from(path)),
    }
}
