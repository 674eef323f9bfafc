//! 配置管理模块
//!
//! 提供 autoviz 配置的加载、解析和管理功能。
//! 支持从 TOML 配置文件加载，也支持命令行参数覆盖。
//!
//! # 配置文件格式 (autoviz.toml)
//!
//! ```toml
//! [window]
//! width = 1280
//! height = 800
//! title = "autoviz"
//! vsync = true
//!
//! [autogui]
//! eviction_frames = 3
//! persist_tree_state = false
//! drag_speed = 0.1
//! float_format = "%.3f"
//!
//! [persistence]
//! enabled = true
//! flush_interval_frames = 120
//!
//! [logging]
//! level = "info"      # trace, debug, info, warn, error
//! file_output = false
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::error::{ConfigError, Result};

/// 全局配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// 窗口配置
    #[serde(default)]
    pub window: WindowConfig,

    /// 自动 GUI 配置
    #[serde(default)]
    pub autogui: AutoguiConfig,

    /// 布局持久化配置
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// 日志配置
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// 窗口配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    /// 窗口宽度
    #[serde(default = "default_width")]
    pub width: u32,

    /// 窗口高度
    #[serde(default = "default_height")]
    pub height: u32,

    /// 窗口标题
    #[serde(default = "default_title")]
    pub title: String,

    /// 垂直同步（帧节奏由呈现阻塞决定）
    #[serde(default = "default_vsync")]
    pub vsync: bool,

    /// 关闭垂直同步时两帧之间的最短间隔（毫秒）
    #[serde(default)]
    pub min_frame_interval_ms: u64,

    /// 不创建窗口，使用无头宿主
    #[serde(default)]
    pub headless: bool,

    /// 最多运行多少帧（0 表示不限）
    #[serde(default)]
    pub frame_limit: u64,
}

/// 自动 GUI 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoguiConfig {
    /// 缓存条目连续多少帧未访问后被淘汰
    #[serde(default = "default_eviction_frames")]
    pub eviction_frames: u64,

    /// 折叠节点的展开状态是否写入布局文件
    #[serde(default)]
    pub persist_tree_state: bool,

    /// 数值拖拽控件的默认速度
    #[serde(default = "default_drag_speed")]
    pub drag_speed: f32,

    /// 浮点数默认显示格式
    #[serde(default = "default_float_format")]
    pub float_format: String,

    /// 整数默认显示格式
    #[serde(default = "default_int_format")]
    pub int_format: String,
}

/// 布局持久化配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// 是否启用布局持久化
    #[serde(default = "default_persistence_enabled")]
    pub enabled: bool,

    /// 每隔多少帧刷写一次（0 表示只在退出时刷写）
    #[serde(default = "default_flush_interval")]
    pub flush_interval_frames: u64,

    /// 布局文件目录，空字符串表示入口程序所在目录
    #[serde(default)]
    pub directory: String,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: LogLevel,

    /// 是否输出到文件
    #[serde(default = "default_file_output")]
    pub file_output: bool,

    /// 日志文件路径
    #[serde(default = "default_log_file")]
    pub log_file: String,
}

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

// 默认值函数
fn default_width() -> u32 { 1280 }
fn default_height() -> u32 { 800 }
fn default_title() -> String { "autoviz".to_string() }
fn default_vsync() -> bool { true }
fn default_eviction_frames() -> u64 { 3 }
fn default_drag_speed() -> f32 { 0.1 }
fn default_float_format() -> String { "%.3f".to_string() }
fn default_int_format() -> String { "%d".to_string() }
fn default_persistence_enabled() -> bool { true }
fn default_flush_interval() -> u64 { 120 }
fn default_log_level() -> LogLevel { LogLevel::Info }
fn default_file_output() -> bool { false }
fn default_log_file() -> String { "autoviz.log".to_string() }

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            title: default_title(),
            vsync: default_vsync(),
            min_frame_interval_ms: 0,
            headless: false,
            frame_limit: 0,
        }
    }
}

impl Default for AutoguiConfig {
    fn default() -> Self {
        Self {
            eviction_frames: default_eviction_frames(),
            persist_tree_state: false,
            drag_speed: default_drag_speed(),
            float_format: default_float_format(),
            int_format: default_int_format(),
        }
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            enabled: default_persistence_enabled(),
            flush_interval_frames: default_flush_interval(),
            directory: String::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file_output: default_file_output(),
            log_file: default_log_file(),
        }
    }
}

impl Config {
    /// 从配置文件加载
    ///
    /// # 参数
    ///
    /// * `path` - 配置文件路径
    ///
    /// # 返回值
    ///
    /// 成功返回 `Config` 实例，失败返回错误
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let contents = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound(path_str.clone()))?;

        toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(e.to_string()).into())
    }

    /// 从配置文件加载，如果文件不存在或无法解析则使用默认配置
    pub fn from_file_or_default<P: AsRef<Path>>(path: P) -> Self {
        Self::from_file(path).unwrap_or_default()
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        std::fs::write(path, contents)?;
        Ok(())
    }

    /// 从命令行参数覆盖配置
    ///
    /// 支持的参数：
    /// - `--headless`: 不创建窗口
    /// - `--width <value>` / `--height <value>`: 窗口尺寸
    /// - `--eviction-frames <value>`: 缓存淘汰帧数
    /// - `--frames <value>`: 运行指定帧数后退出
    /// - `--no-persist`: 关闭布局持久化
    pub fn apply_args<I>(&mut self, args: I)
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let args: Vec<String> = args.into_iter().map(|s| s.as_ref().to_string()).collect();

        if args.iter().any(|a| a == "--headless") {
            self.window.headless = true;
        }

        if args.iter().any(|a| a == "--no-persist") {
            self.persistence.enabled = false;
        }

        if let Some(width) = arg_value(&args, "--width") {
            self.window.width = width;
        }

        if let Some(height) = arg_value(&args, "--height") {
            self.window.height = height;
        }

        if let Some(frames) = arg_value(&args, "--frames") {
            self.window.frame_limit = frames;
        }

        if let Some(frames) = arg_value(&args, "--eviction-frames") {
            self.autogui.eviction_frames = frames;
        }
    }

    /// 验证配置的有效性
    pub fn validate(&self) -> Result<()> {
        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::InvalidValue {
                field: "window.width/height".to_string(),
                reason: "Window dimensions must be greater than 0".to_string(),
            }.into());
        }

        if self.autogui.eviction_frames == 0 {
            return Err(ConfigError::InvalidValue {
                field: "autogui.eviction_frames".to_string(),
                reason: "Eviction horizon must be at least 1 frame".to_string(),
            }.into());
        }

        if self.autogui.float_format.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "autogui.float_format".to_string(),
                reason: "Display format must not be empty".to_string(),
            }.into());
        }

        if !(self.autogui.drag_speed > 0.0) {
            return Err(ConfigError::InvalidValue {
                field: "autogui.drag_speed".to_string(),
                reason: "Drag speed must be positive".to_string(),
            }.into());
        }

        Ok(())
    }
}

fn arg_value<T: std::str::FromStr>(args: &[String], flag: &str) -> Option<T> {
    let idx = args.iter().position(|a| a == flag)?;
    args.get(idx + 1)?.parse().ok()
}
