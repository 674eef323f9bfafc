//! 帧宿主模块
//!
//! 宿主决定帧节奏并持有即时模式后端：
//! - `HeadlessHost`：没有窗口，用于测试和 `--headless`
//! - `WindowHost`（`window` 特性）：winit 窗口 + wgpu 表面 + egui
//!
//! 所有宿主都实现了统一的 `FrameHost` trait，驱动器不关心具体是哪一个。

pub mod headless;
pub mod host;
#[cfg(feature = "window")]
pub mod window;

pub use headless::HeadlessHost;
pub use host::{FrameHost, FramePacer};
#[cfg(feature = "window")]
pub use window::WindowHost;
