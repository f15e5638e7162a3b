//! 结构化日志模块
//!
//! 提供基于 tracing 的结构化日志功能。

use std::sync::Arc;

use parking_lot::RwLock;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, writer::BoxMakeWriter},
    layer::SubscriberExt,
    reload::{self, Handle},
    util::SubscriberInitExt,
    EnvFilter, Registry,
};

use crate::config::{Config, LoggingConfig};
use crate::error::{ObservabilityError, Result};

/// 日志级别重新加载句柄类型
type ReloadHandle = Handle<EnvFilter, Registry>;

/// 日志管理器
#[derive(Debug)]
pub struct LogManager {
    /// 配置
    config: LoggingConfig,

    /// 过滤器重新加载句柄
    reload_handle: Option<Arc<RwLock<ReloadHandle>>>,

    /// 文件输出的后台写线程，drop 时刷新
    guard: Option<WorkerGuard>,

    /// 是否已初始化
    initialized: bool,
}

impl LogManager {
    /// 创建并安装全局日志订阅者
    pub fn new(config: &Config) -> Result<Self> {
        let mut manager = Self {
            config: config.logging.clone(),
            reload_handle: None,
            guard: None,
            initialized: false,
        };

        manager.init()?;

        Ok(manager)
    }

    fn init(&mut self) -> Result<()> {
        if self.initialized {
            return Ok(());
        }

        let filter = build_filter(&self.config)?;
        let (filter, reload_handle) = reload::Layer::new(filter);
        self.reload_handle = Some(Arc::new(RwLock::new(reload_handle)));

        let (writer, to_file) = self.make_writer()?;
        let registry = tracing_subscriber::registry().with(filter);

        let installed = if self.config.json_format {
            let layer = fmt::layer()
                .json()
                .with_target(self.config.include_target)
                .with_writer(writer);
            registry.with(layer).try_init()
        } else {
            let layer = fmt::layer()
                .with_target(self.config.include_target)
                .with_ansi(self.config.ansi_colors && !to_file)
                .with_writer(writer);
            registry.with(layer).try_init()
        };
        installed
            .map_err(|e| ObservabilityError::logging(format!("Failed to install subscriber: {}", e)))?;

        self.initialized = true;

        tracing::debug!(
            target: "storechat_observability",
            "Log manager initialized with level: {}",
            self.config.level
        );

        Ok(())
    }

    // 配置了文件时写文件，否则写 stderr，避免和对话输出混在一起
    fn make_writer(&mut self) -> Result<(BoxMakeWriter, bool)> {
        let Some(path) = self.config.file_path.as_ref() else {
            return Ok((BoxMakeWriter::new(std::io::stderr), false));
        };

        let file_name = path
            .file_name()
            .ok_or_else(|| ObservabilityError::config(format!("Invalid log file path: {:?}", path)))?;
        let dir = path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(|| std::path::Path::new("."));
        std::fs::create_dir_all(dir)?;

        let appender = tracing_appender::rolling::never(dir, file_name);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        self.guard = Some(guard);

        Ok((BoxMakeWriter::new(writer), true))
    }

    /// 动态更新日志级别
    pub fn update_level(&mut self, level: &str) -> Result<()> {
        let new_filter = EnvFilter::try_new(level)
            .map_err(|e| ObservabilityError::logging(format!("Invalid log level: {}", e)))?;

        let Some(ref handle) = self.reload_handle else {
            return Err(ObservabilityError::logging("Log manager not initialized"));
        };

        handle
            .write()
            .modify(|filter| {
                *filter = new_filter;
            })
            .map_err(|e| ObservabilityError::logging(format!("Failed to update log level: {}", e)))?;

        self.config.level = level.to_string();

        tracing::info!(
            target: "storechat_observability",
            "Log level updated to: {}",
            level
        );

        Ok(())
    }

    /// 获取当前配置
    pub fn config(&self) -> &LoggingConfig {
        &self.config
    }

    /// 关闭日志管理器，刷新文件输出
    pub fn shutdown(&mut self) -> Result<()> {
        tracing::debug!(
            target: "storechat_observability",
            "Log manager shutting down"
        );
        self.guard.take();
        Ok(())
    }
}

/// 构建环境过滤器
pub fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    let mut filter = EnvFilter::try_new(&config.level)
        .map_err(|e| ObservabilityError::logging(format!("Invalid log level: {}", e)))?;

    // 添加模块级别的过滤器
    for (module, level) in &config.module_levels {
        filter = filter.add_directive(
            format!("{}={}", module, level)
                .parse()
                .map_err(|e| ObservabilityError::logging(format!("Invalid directive: {}", e)))?,
        );
    }

    Ok(filter)
}

/// 创建带有会话上下文的 span
pub fn create_session_span(backend: &str) -> tracing::Span {
    tracing::info_span!(
        "chat_session",
        backend = %backend,
    )
}

/// 创建单条命令的 span
pub fn create_command_span(command: &str) -> tracing::Span {
    tracing::info_span!(
        "command",
        command = %command,
    )
}
