//! GUI 后端模块
//!
//! 分发器通过 `Backend` trait 调用即时模式控件，具体实现有两个：
//!
//! - `RecordingBackend`：无头后端，记录调用并按脚本回答交互，用于测试和 `--headless`
//! - `EguiBackend`：把控件调用记录成命令树，再绘制到 egui

pub mod backend;
pub mod egui_backend;
pub mod headless;
mod metrics;

pub use backend::{
    Backend, DragResponse, NumericSpec, RegionArgs, RegionFlags, SeqEdit, TextResponse,
};
pub use egui_backend::{EguiBackend, DEFAULT_WINDOW};
pub use headless::{Invocation, RecordingBackend, Response};
pub use metrics::FrameStats;
