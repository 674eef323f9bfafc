//! 核心功能模块
//!
//! 本模块提供与具体 GUI 后端无关的基础功能：日志、配置、错误处理、按键事件队列。
//!
//! # 模块组织
//!
//! - `log`：日志系统，提供结构化的日志记录功能
//! - `config`：配置管理，支持从配置文件加载设置
//! - `error`：错误处理，定义统一的错误类型
//! - `event`：按键事件与每帧事件队列
//! - `runtime`：进程级的入口程序身份

pub mod log;
pub mod config;
pub mod error;
pub mod event;
pub mod runtime;

// 重新导出常用类型，方便使用
pub use error::{Result, VizError, ConfigError, ProtocolViolation, PersistenceError};
pub use config::{Config, AutoguiConfig, PersistenceConfig, WindowConfig};
pub use event::{EventQueue, KeyAction, KeyCode, KeyEvent, Modifiers};
pub use runtime::{init_program_identity, program_identity, ProgramIdentity};
