//! 错误处理模块
//!
//! 定义了 autoviz 中使用的统一错误类型。
//!
//! # 错误分类
//!
//! - **协议违规**（`ProtocolViolation`）：区域 open/close 不配对、同一帧内路径冲突。
//!   致命错误，帧循环终止。
//! - **持久化错误**（`PersistenceError`）：布局文件缺失、损坏或写入失败。
//!   本地恢复，只记录警告。
//! - **自定义渲染失败**（`CustomRender`）：自定义渲染钩子返回的错误。
//!   对当前帧致命，驱动器会先关闭所有已打开的区域。
//!
//! 无法分类的值不是错误：分发器会退回只读文本显示。

use std::fmt;
use std::path::PathBuf;

use crate::autogui::{RegionKind, WidgetPath};

/// 统一的 Result 类型
pub type Result<T> = std::result::Result<T, VizError>;

/// autoviz 的错误类型
#[derive(Debug)]
pub enum VizError {
    /// 配置错误
    Config(ConfigError),

    /// 即时模式协议违规（致命）
    Protocol(ProtocolViolation),

    /// 布局持久化错误（非致命）
    Persistence(PersistenceError),

    /// 自定义渲染钩子失败
    CustomRender { path: WidgetPath, message: String },

    /// IO 错误
    Io(std::io::Error),

    /// 初始化错误
    Initialization(String),

    /// 运行时错误
    Runtime(String),
}

/// 配置相关的错误
#[derive(Debug)]
pub enum ConfigError {
    /// 配置文件未找到
    FileNotFound(String),

    /// 配置文件解析失败
    ParseError(String),

    /// 配置值无效
    InvalidValue { field: String, reason: String },
}

/// 区域栈与路径协议违规
#[derive(Debug, Clone, PartialEq)]
pub enum ProtocolViolation {
    /// 帧结束时上下文栈非空
    UnbalancedStack {
        depth: usize,
        open: Vec<(RegionKind, WidgetPath)>,
    },

    /// close 的区域类型与栈顶不一致
    MismatchedClose {
        expected: RegionKind,
        found: RegionKind,
        path: WidgetPath,
    },

    /// 栈为空时调用 close
    CloseWithoutOpen(RegionKind),

    /// 同一帧内两个控件解析到相同路径
    DuplicatePath(WidgetPath),
}

/// 布局持久化错误
#[derive(Debug)]
pub enum PersistenceError {
    /// 读取失败
    Read { path: PathBuf, source: std::io::Error },

    /// 写入失败
    Write { path: PathBuf, source: std::io::Error },

    /// 内容损坏
    Corrupt {
        path: PathBuf,
        line: usize,
        reason: String,
    },
}

impl VizError {
    /// 出错的控件路径（如果有）
    pub fn path(&self) -> Option<&WidgetPath> {
        match self {
            VizError::CustomRender { path, .. } => Some(path),
            VizError::Protocol(ProtocolViolation::DuplicatePath(path)) => Some(path),
            VizError::Protocol(ProtocolViolation::MismatchedClose { path, .. }) => Some(path),
            VizError::Protocol(ProtocolViolation::UnbalancedStack { open, .. }) => {
                open.last().map(|(_, path)| path)
            }
            _ => None,
        }
    }

    /// 是否为必须终止帧循环的错误
    pub fn is_fatal(&self) -> bool {
        !matches!(self, VizError::Persistence(_))
    }

    /// 便于自定义渲染钩子构造错误
    pub fn custom(path: &WidgetPath, message: impl Into<String>) -> Self {
        VizError::CustomRender {
            path: path.clone(),
            message: message.into(),
        }
    }
}

impl fmt::Display for VizError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VizError::Config(e) => write!(f, "Configuration error: {}", e),
            VizError::Protocol(e) => write!(f, "Protocol violation: {}", e),
            VizError::Persistence(e) => write!(f, "Persistence error: {}", e),
            VizError::CustomRender { path, message } => {
                write!(f, "Custom render failed at '{}': {}", path, message)
            }
            VizError::Io(e) => write!(f, "IO error: {}", e),
            VizError::Initialization(msg) => write!(f, "Initialization error: {}", msg),
            VizError::Runtime(msg) => write!(f, "Runtime error: {}", msg),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => write!(f, "Config file not found: {}", path),
            ConfigError::ParseError(msg) => write!(f, "Failed to parse config: {}", msg),
            ConfigError::InvalidValue { field, reason } => {
                write!(f, "Invalid value for '{}': {}", field, reason)
            }
        }
    }
}

impl fmt::Display for ProtocolViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolViolation::UnbalancedStack { depth, open } => {
                write!(f, "{} region(s) still open at frame end", depth)?;
                for (kind, path) in open {
                    write!(f, "; {:?} '{}'", kind, path)?;
                }
                Ok(())
            }
            ProtocolViolation::MismatchedClose {
                expected,
                found,
                path,
            } => write!(
                f,
                "close({:?}) called while {:?} '{}' is innermost",
                found, expected, path
            ),
            ProtocolViolation::CloseWithoutOpen(kind) => {
                write!(f, "close({:?}) called with no open region", kind)
            }
            ProtocolViolation::DuplicatePath(path) => {
                write!(f, "widget path '{}' visited twice in one frame", path)
            }
        }
    }
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistenceError::Read { path, source } => {
                write!(f, "Failed to read {}: {}", path.display(), source)
            }
            PersistenceError::Write { path, source } => {
                write!(f, "Failed to write {}: {}", path.display(), source)
            }
            PersistenceError::Corrupt { path, line, reason } => {
                write!(f, "Corrupt layout {} (line {}): {}", path.display(), line, reason)
            }
        }
    }
}

impl std::error::Error for VizError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            VizError::Io(e) => Some(e),
            VizError::Persistence(e) => Some(e),
            _ => None,
        }
    }
}

impl std::error::Error for ConfigError {}
impl std::error::Error for ProtocolViolation {}

impl std::error::Error for PersistenceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PersistenceError::Read { source, .. } | PersistenceError::Write { source, .. } => {
                Some(source)
            }
            PersistenceError::Corrupt { .. } => None,
        }
    }
}

// 实现 From trait 以便于错误转换
impl From<std::io::Error> for VizError {
    fn from(err: std::io::Error) -> Self {
        VizError::Io(err)
    }
}

impl From<ConfigError> for VizError {
    fn from(err: ConfigError) -> Self {
        VizError::Config(err)
    }
}

impl From<ProtocolViolation> for VizError {
    fn from(err: ProtocolViolation) -> Self {
        VizError::Protocol(err)
    }
}

impl From<PersistenceError> for VizError {
    fn from(err: PersistenceError) -> Self {
        VizError::Persistence(err)
    }
}
