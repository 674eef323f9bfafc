//! 自动 GUI 上下文栈
//!
//! 镜像即时模式中 begin/end 区域调用的嵌套关系。
//! 每个 `open` 都必须在同一帧内配对恰好一个 `close`，与 `open` 的返回值无关：
//! 后端在 begin 时分配的资源即使区域不可见也要在 end 时释放。

use std::collections::HashSet;

use crate::autogui::path::WidgetPath;
use crate::core::error::{ProtocolViolation, Result};

/// 区域类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RegionKind {
    Window,
    Popup,
    Child,
    Plot,
    /// 可折叠节点
    Tree,
}

impl RegionKind {
    /// 布局文件中的节名
    pub fn section(&self) -> &'static str {
        match self {
            RegionKind::Window => "Window",
            RegionKind::Popup => "Popup",
            RegionKind::Child => "Child",
            RegionKind::Plot => "Plot",
            RegionKind::Tree => "Tree",
        }
    }

    pub fn from_section(name: &str) -> Option<Self> {
        match name {
            "Window" => Some(RegionKind::Window),
            "Popup" => Some(RegionKind::Popup),
            "Child" => Some(RegionKind::Child),
            "Plot" => Some(RegionKind::Plot),
            "Tree" => Some(RegionKind::Tree),
            _ => None,
        }
    }

    /// 该类区域是否有持久化的布局
    pub fn has_layout(&self, persist_tree_state: bool) -> bool {
        match self {
            RegionKind::Window | RegionKind::Popup | RegionKind::Plot => true,
            RegionKind::Tree => persist_tree_state,
            RegionKind::Child => false,
        }
    }
}

/// 上下文栈中的一帧
#[derive(Debug, Clone, PartialEq)]
pub struct ContextFrame {
    pub kind: RegionKind,
    /// 区域内部的路径前缀
    pub path: WidgetPath,
    /// begin 调用是否报告可见；只决定是否渲染内部内容
    pub visible: bool,
}

/// 区域栈
#[derive(Debug, Default)]
pub struct AutoguiContext {
    stack: Vec<ContextFrame>,
    /// 本进程中已经打开过的区域身份
    known: HashSet<(RegionKind, WidgetPath)>,
}

impl AutoguiContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// 帧开始时清空栈
    pub fn reset(&mut self) {
        self.stack.clear();
    }

    /// 当前路径前缀（最内层区域的路径）
    pub fn prefix(&self) -> WidgetPath {
        self.stack
            .last()
            .map(|frame| frame.path.clone())
            .unwrap_or_else(WidgetPath::empty)
    }

    /// 记录一次打开；返回 `true` 表示该身份在本进程中第一次出现，需要拉取布局
    pub fn first_open(&mut self, kind: RegionKind, path: &WidgetPath) -> bool {
        self.known.insert((kind, path.clone()))
    }

    /// 压入一帧
    pub fn open(&mut self, kind: RegionKind, path: WidgetPath, visible: bool) {
        self.stack.push(ContextFrame { kind, path, visible });
    }

    /// 弹出最内层的一帧，类型必须匹配
    pub fn close(&mut self, kind: RegionKind) -> Result<ContextFrame> {
        match self.stack.last() {
            None => Err(ProtocolViolation::CloseWithoutOpen(kind).into()),
            Some(top) if top.kind != kind => Err(ProtocolViolation::MismatchedClose {
                expected: top.kind,
                found: kind,
                path: top.path.clone(),
            }
            .into()),
            Some(_) => self
                .stack
                .pop()
                .ok_or_else(|| ProtocolViolation::CloseWithoutOpen(kind).into()),
        }
    }

    /// 按从内到外的顺序弹出所有帧
    pub fn unwind(&mut self) -> Vec<ContextFrame> {
        let mut frames = Vec::with_capacity(self.stack.len());
        while let Some(frame) = self.stack.pop() {
            frames.push(frame);
        }
        frames
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn innermost(&self) -> Option<&ContextFrame> {
        self.stack.last()
    }

    pub fn frames(&self) -> &[ContextFrame] {
        &self.stack
    }

    /// 帧结束时栈必须为空
    pub fn assert_empty(&self) -> Result<()> {
        if self.stack.is_empty() {
            return Ok(());
        }
        Err(ProtocolViolation::UnbalancedStack {
            depth: self.stack.len(),
            open: self
                .stack
                .iter()
                .map(|frame| (frame.kind, frame.path.clone()))
                .collect(),
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::VizError;

    #[test]
    fn test_balanced_pairs() {
        let mut ctx = AutoguiContext::new();
        let root = WidgetPath::root("w");
        ctx.open(RegionKind::Window, root.clone(), true);
        ctx.open(RegionKind::Tree, root.field("a"), false);
        assert_eq!(ctx.prefix(), root.field("a"));
        assert_eq!(ctx.depth(), 2);
        ctx.close(RegionKind::Tree).unwrap();
        ctx.close(RegionKind::Window).unwrap();
        assert!(ctx.assert_empty().is_ok());
    }

    #[test]
    fn test_mismatched_close() {
        let mut ctx = AutoguiContext::new();
        ctx.open(RegionKind::Window, WidgetPath::root("w"), true);
        let err = ctx.close(RegionKind::Popup).unwrap_err();
        assert!(matches!(
            err,
            VizError::Protocol(ProtocolViolation::MismatchedClose {
                expected: RegionKind::Window,
                found: RegionKind::Popup,
                ..
            })
        ));
        assert_eq!(ctx.depth(), 1);

        let mut empty = AutoguiContext::new();
        assert!(empty.close(RegionKind::Child).is_err());
    }

    #[test]
    fn test_unbalanced_names_open_regions() {
        let mut ctx = AutoguiContext::new();
        ctx.open(RegionKind::Window, WidgetPath::root("w"), true);
        ctx.open(RegionKind::Plot, WidgetPath::root("w").label("plot"), true);
        let err = ctx.assert_empty().unwrap_err();
        assert_eq!(err.path(), Some(&WidgetPath::root("w").label("plot")));

        let frames = ctx.unwind();
        assert_eq!(frames[0].kind, RegionKind::Plot);
        assert_eq!(frames[1].kind, RegionKind::Window);
        assert!(ctx.assert_empty().is_ok());
    }

    #[test]
    fn test_first_open_once_per_identity() {
        let mut ctx = AutoguiContext::new();
        let path = WidgetPath::root("Style");
        assert!(ctx.first_open(RegionKind::Window, &path));
        assert!(!ctx.first_open(RegionKind::Window, &path));
        assert!(ctx.first_open(RegionKind::Plot, &path));
        ctx.reset();
        assert!(!ctx.first_open(RegionKind::Window, &path));
    }

    #[test]
    fn test_layout_kinds() {
        assert!(RegionKind::Plot.has_layout(false));
        assert!(!RegionKind::Child.has_layout(true));
        assert!(!RegionKind::Tree.has_layout(false));
        assert!(RegionKind::Tree.has_layout(true));
        assert_eq!(RegionKind::from_section(RegionKind::Popup.section()), Some(RegionKind::Popup));
    }
}
