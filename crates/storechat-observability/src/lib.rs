//! storechat observability
//!
//! 提供统一的日志初始化和动态日志级别调整。

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod logging;

pub use config::{Config, LoggingConfig};
pub use error::{ObservabilityError, Result};
pub use logging::{create_command_span, create_session_span, LogManager};

use parking_lot::RwLock;
use std::sync::Arc;

/// 统一的观测性句柄
#[derive(Debug)]
pub struct Observability {
    /// 日志管理器
    log_manager: Arc<RwLock<LogManager>>,
    /// 配置
    config: Config,
}

impl Observability {
    /// 初始化观测性基础设施
    pub fn init(config: Config) -> Result<Self> {
        let log_manager = Arc::new(RwLock::new(LogManager::new(&config)?));

        tracing::debug!(
            target: "storechat_observability",
            app = %config.app_name,
            "Observability initialized"
        );

        Ok(Self {
            log_manager,
            config,
        })
    }

    /// 获取日志管理器
    pub fn log_manager(&self) -> Arc<RwLock<LogManager>> {
        Arc::clone(&self.log_manager)
    }

    /// 获取配置
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// 动态更新日志级别
    pub fn update_log_level(&self, level: &str) -> Result<()> {
        self.log_manager.write().update_level(level)
    }

    /// 优雅关闭
    pub fn shutdown(self) -> Result<()> {
        self.log_manager.write().shutdown()
    }
}

/// 便捷导入模块
pub mod prelude {
    //! 常用类型的便捷导入

    pub use crate::{Config, Observability, Result};

    pub use tracing::{debug, error, info, instrument, trace, warn, Span};
}
