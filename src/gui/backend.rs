//! 即时模式后端的统一抽象接口
//!
//! 分发器只决定调用哪个基本控件以及传什么参数，
//! 像素绘制、窗口系统和控件本身的交互都由实现此 trait 的后端完成。
//! 所有控件调用都是“传入旧值、返回新值”的形式。

use bitflags::bitflags;

use crate::autogui::{RegionKind, WidgetPath};
use crate::core::event::EventQueue;
use crate::persist::RegionLayout;

bitflags! {
    /// 区域标志
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct RegionFlags: u32 {
        const NONE = 0;
        const NO_TITLE_BAR = 1 << 0;
        const NO_RESIZE = 1 << 1;
        const NO_MOVE = 1 << 2;
        const AUTO_RESIZE = 1 << 3;
        /// 折叠节点第一次出现时展开
        const DEFAULT_OPEN = 1 << 4;
    }
}

/// 打开区域时的参数
#[derive(Debug, Clone, Copy)]
pub struct RegionArgs<'a> {
    /// 可见标题
    pub title: &'a str,
    pub flags: RegionFlags,
    /// 第一次打开时从布局文件拉取的几何信息
    pub layout: Option<&'a RegionLayout>,
    /// 折叠节点当前的展开状态
    pub open: Option<bool>,
}

/// 数值控件参数
#[derive(Debug, Clone, PartialEq)]
pub struct NumericSpec {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub speed: f32,
    pub format: String,
    pub slider: bool,
}

/// 拖拽类控件的返回
#[derive(Debug, Clone, PartialEq)]
pub struct DragResponse<T> {
    pub value: T,
    /// 用户是否正在拖拽
    pub active: bool,
}

impl<T> DragResponse<T> {
    pub fn idle(value: T) -> Self {
        Self { value, active: false }
    }
}

/// 文本输入的返回
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextResponse {
    /// 缓冲内容被修改
    pub changed: bool,
    /// 输入框持有焦点
    pub active: bool,
}

/// 序列结构性编辑
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeqEdit {
    Remove(usize),
    InsertAfter(usize),
    Append,
}

/// 即时模式后端
pub trait Backend {
    /// 开始新的一帧，把自上一帧以来的按键事件压入 `events`
    fn begin_frame(&mut self, frame: u64, events: &mut EventQueue);

    /// 打开区域，返回内部内容是否需要渲染
    fn begin_region(&mut self, kind: RegionKind, path: &WidgetPath, args: &RegionArgs<'_>) -> bool;

    /// 关闭区域；无论 `begin_region` 返回什么都必须调用
    ///
    /// 返回区域当前的几何信息（如果后端知道）。
    fn end_region(&mut self, kind: RegionKind, path: &WidgetPath, visible: bool) -> Option<RegionLayout>;

    /// 请求在下一次 `begin_region(Popup, path)` 时显示弹出框
    fn open_popup(&mut self, path: &WidgetPath);

    fn checkbox(&mut self, path: &WidgetPath, label: &str, value: bool) -> bool;

    fn drag_int(&mut self, path: &WidgetPath, label: &str, value: i128, spec: &NumericSpec) -> DragResponse<i128>;

    fn drag_float(&mut self, path: &WidgetPath, label: &str, value: f64, spec: &NumericSpec) -> DragResponse<f64>;

    fn drag_vector(
        &mut self,
        path: &WidgetPath,
        label: &str,
        values: &[f64],
        spec: &NumericSpec,
    ) -> DragResponse<Vec<f64>>;

    /// 编辑 `buffer`
    fn input_text(&mut self, path: &WidgetPath, label: &str, buffer: &mut String) -> TextResponse;

    fn text(&mut self, text: &str);

    fn button(&mut self, path: &WidgetPath, label: &str) -> bool;

    fn same_line(&mut self);

    fn separator(&mut self);

    /// 在绘图区域内画一条折线
    fn plot_line(&mut self, label: &str, points: &[[f64; 2]]);

    /// 序列元素旁的删除 / 插入按钮
    fn sequence_controls(&mut self, path: &WidgetPath, index: usize) -> Option<SeqEdit>;

    /// 序列末尾的追加按钮，返回是否被点击
    fn sequence_footer(&mut self, path: &WidgetPath) -> bool;

    fn end_frame(&mut self);

    /// 后端名称，用于日志
    fn backend_name(&self) -> &str;
}
