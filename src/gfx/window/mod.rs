//! 原生窗口宿主（winit + wgpu + egui-winit + egui-wgpu）
//!
//! - `context`：窗口、表面、设备
//! - `host`：`WindowHost`，驱动事件泵、egui 帧和呈现

mod context;
mod host;

pub use context::SurfaceContext;
pub use host::WindowHost;
