//! 自动 GUI 模块
//!
//! 把任意应用对象映射为即时模式控件树。
//!
//! # 模块组织
//!
//! - `path`：控件路径，缓存键与后端 ID 作用域
//! - `context`：区域上下文栈
//! - `cache`：跨帧的控件状态缓存
//! - `options`：字段渲染选项
//! - `reflect`：类型能力探测（`Reflect` 及各分类 trait）
//! - `dispatch`：每帧遍历对象并调用后端控件

pub mod cache;
pub mod context;
pub mod dispatch;
pub mod options;
pub mod path;
pub mod reflect;

pub use cache::{CacheEntry, WidgetKind, WidgetState, WidgetStateCache};
pub use context::{AutoguiContext, ContextFrame, RegionKind};
pub use dispatch::{Autogui, Ui};
pub use options::{format_float, FieldOptions};
pub use path::{split_label, PathSegment, WidgetPath};
pub use reflect::{
    Composite, CustomRender, Field, FloatValue, IntValue, Mapping, Node, Opaque, Reflect,
    Sequence, VectorValue,
};
