//! autoviz - 反射驱动的即时模式调参界面
//!
//! 每帧把任意应用状态对象自动渲染成可编辑的控件树，
//! 用户的修改当场写回对象本身。
//!
//! # 模块结构
//!
//! - `core`: 核心功能模块（日志、配置、错误处理、按键事件、入口程序身份）
//! - `autogui`: 类型分发器、上下文栈、控件状态缓存
//! - `persist`: 布局持久化
//! - `gui`: 即时模式后端（无头记录后端、egui 后端）
//! - `gfx`: 帧宿主（无头、winit + wgpu 窗口）
//! - `viz`: 帧循环驱动器
//!
//! # 使用示例
//!
//! ```no_run
//! use autoviz::{autogui_struct, Config, Viz};
//!
//! #[derive(Default)]
//! struct Particle {
//!     pos: [f32; 2],
//!     mass: f64,
//! }
//!
//! autogui_struct!(Particle { pos, mass: { min: 0.0, max: 10.0 } });
//!
//! let mut viz = Viz::new(Config::default()).unwrap();
//! let mut particle = Particle::default();
//! while viz.wait() {
//!     viz.render(&mut particle).unwrap();
//! }
//! ```

pub mod core;
pub mod autogui;
pub mod persist;
pub mod gui;
pub mod gfx;
pub mod viz;

pub use crate::autogui::{
    CustomRender, FieldOptions, Opaque, Reflect, RegionKind, Ui, WidgetPath,
};
pub use crate::core::{Config, Result, VizError};
pub use crate::gui::RegionFlags;
pub use crate::viz::Viz;
