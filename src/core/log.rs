//! 日志系统模块
//!
//! 基于 `tracing` 提供结构化的日志记录功能。
//!
//! # 使用示例
//!
//! ```no_run
//! use autoviz::core::log::{self, LogLevel};
//!
//! log::init_logger(LogLevel::Info, false, None);
//! tracing::info!(frame = 1, "Frame started");
//! ```

use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use std::path::Path;

pub use super::config::LogLevel;

/// 初始化日志系统
///
/// 必须在程序开始时调用一次。重复调用时保留第一次安装的订阅器。
///
/// # 参数
///
/// * `level` - 日志级别（`RUST_LOG` 存在时优先）
/// * `file_output` - 是否输出到文件
/// * `log_file_path` - 日志文件路径（可选，默认为 "autoviz.log"）
pub fn init_logger(level: LogLevel, file_output: bool, log_file_path: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_directive(level)));

    if file_output {
        // 解析日志文件路径
        let log_path = log_file_path.unwrap_or("autoviz.log");
        let path = Path::new(log_path);
        let directory = path.parent().unwrap_or(Path::new("."));
        let filename = path.file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("autoviz.log");

        // 创建滚动文件 appender（每天滚动）
        let file_appender = RollingFileAppender::new(
            Rotation::DAILY,
            directory,
            filename
        );

        let console_layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_ansi(true);

        let file_layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_ansi(false)  // 文件不需要 ANSI 颜色
            .with_writer(file_appender);

        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(console_layer)
            .with(file_layer)
            .try_init();
    } else {
        let fmt_layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_span_events(FmtSpan::CLOSE)
            .with_ansi(true);

        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init();
    }
}

fn level_directive(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Trace => "trace",
        LogLevel::Debug => "debug",
        LogLevel::Info => "info",
        LogLevel::Warn => "warn",
        LogLevel::Error => "error",
    }
}

/// 分发器日志 - Debug 级别
#[macro_export]
macro_rules! autogui_debug {
    ($($arg:tt)*) => {
        tracing::debug!(target: "autoviz::autogui", $($arg)*)
    };
}

/// 分发器日志 - Warn 级别
#[macro_export]
macro_rules! autogui_warn {
    ($($arg:tt)*) => {
        tracing::warn!(target: "autoviz::autogui", $($arg)*)
    };
}

/// 持久化日志 - Warn 级别
#[macro_export]
macro_rules! persist_warn {
    ($($arg:tt)*) => {
        tracing::warn!(target: "autoviz::persist", $($arg)*)
    };
}

/// 日志级别转换
impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

/// 帧级 span，帧结束时记录耗时
#[macro_export]
macro_rules! frame_span {
    ($frame:expr) => {
        tracing::span!(tracing::Level::TRACE, "frame", index = $frame)
    };
}
