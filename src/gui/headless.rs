//! 无头后端
//!
//! 不绘制任何东西，只记录每一次基本控件调用，并按脚本回答用户交互。
//! 用于测试和 `--headless` 运行。

use std::collections::{HashMap, HashSet, VecDeque};

use crate::autogui::{RegionKind, WidgetPath};
use crate::core::event::{EventQueue, KeyEvent};
use crate::gui::backend::{
    Backend, DragResponse, NumericSpec, RegionArgs, RegionFlags, SeqEdit, TextResponse,
};
use crate::persist::RegionLayout;

/// 一次基本控件调用
#[derive(Debug, Clone, PartialEq)]
pub enum Invocation {
    BeginFrame,
    BeginRegion { kind: RegionKind, id: String, title: String, visible: bool },
    EndRegion { kind: RegionKind, id: String, visible: bool },
    OpenPopup { id: String },
    Checkbox { id: String, value: bool },
    DragInt { id: String, value: i128 },
    DragFloat { id: String, value: f64 },
    DragVector { id: String, values: Vec<f64> },
    InputText { id: String, value: String },
    Text(String),
    Button { id: String },
    SameLine,
    Separator,
    PlotLine { label: String, points: usize },
    SequenceControls { id: String },
    SequenceFooter { id: String },
    EndFrame,
}

/// 脚本化的用户交互
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Bool(bool),
    Int(i128),
    Float(f64),
    Vector(Vec<f64>),
    Text(String),
    /// 拖拽进行中，数值为当前拖到的位置
    Dragging(f64),
    Clicked,
    /// 区域可见性
    Region(bool),
    Edit(SeqEdit),
}

/// 记录调用的无头后端
#[derive(Debug, Default)]
pub struct RecordingBackend {
    log: Vec<Invocation>,
    script: HashMap<String, VecDeque<Response>>,
    pending_keys: Vec<KeyEvent>,
    popups: HashSet<String>,
    geometry: HashMap<String, RegionLayout>,
    frame: u64,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// 为 `path` 安排一次交互，在该控件下一次被调用时生效
    pub fn script(&mut self, path: &WidgetPath, response: Response) {
        self.script.entry(path.id()).or_default().push_back(response);
    }

    /// 模拟按键，下一帧开始时送达
    pub fn push_key(&mut self, event: KeyEvent) {
        self.pending_keys.push(event);
    }

    /// 模拟用户移动或缩放了区域
    pub fn set_geometry(&mut self, path: &WidgetPath, layout: RegionLayout) {
        self.geometry.insert(path.id(), layout);
    }

    /// 后端当前记录的区域几何
    pub fn geometry(&self, path: &WidgetPath) -> Option<RegionLayout> {
        self.geometry.get(&path.id()).copied()
    }

    pub fn invocations(&self) -> &[Invocation] {
        &self.log
    }

    /// 取出并清空调用记录
    pub fn take_invocations(&mut self) -> Vec<Invocation> {
        std::mem::take(&mut self.log)
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// 取出 `path` 的下一条交互，只在类型匹配时消费
    fn take(&mut self, path: &WidgetPath, accepts: impl Fn(&Response) -> bool) -> Option<Response> {
        let id = path.id();
        let queue = self.script.get_mut(&id)?;
        if !queue.front().is_some_and(|r| accepts(r)) {
            return None;
        }
        let response = queue.pop_front();
        if queue.is_empty() {
            self.script.remove(&id);
        }
        response
    }

    fn drag(&mut self, path: &WidgetPath, value: f64) -> DragResponse<f64> {
        let scripted = self.take(path, |r| {
            matches!(r, Response::Float(_) | Response::Int(_) | Response::Dragging(_))
        });
        match scripted {
            Some(Response::Float(v)) => DragResponse::idle(v),
            Some(Response::Int(v)) => DragResponse::idle(v as f64),
            Some(Response::Dragging(v)) => DragResponse { value: v, active: true },
            _ => DragResponse::idle(value),
        }
    }
}

impl Backend for RecordingBackend {
    fn begin_frame(&mut self, frame: u64, events: &mut EventQueue) {
        self.frame = frame;
        events.extend(self.pending_keys.drain(..));
        self.log.push(Invocation::BeginFrame);
    }

    fn begin_region(&mut self, kind: RegionKind, path: &WidgetPath, args: &RegionArgs<'_>) -> bool {
        let id = path.id();
        if let Some(layout) = args.layout {
            self.geometry.entry(id.clone()).or_insert(*layout);
        }
        let default = match kind {
            RegionKind::Popup => self.popups.contains(&id),
            RegionKind::Tree => args
                .open
                .unwrap_or(args.flags.contains(RegionFlags::DEFAULT_OPEN)),
            _ => true,
        };
        let scripted = self.take(path, |r| {
            matches!(r, Response::Region(_)) || (kind == RegionKind::Tree && *r == Response::Clicked)
        });
        let visible = match scripted {
            Some(Response::Region(v)) => v,
            Some(Response::Clicked) if kind == RegionKind::Tree => !default,
            _ => default,
        };
        if kind == RegionKind::Popup && !visible {
            self.popups.remove(&id);
        }
        self.log.push(Invocation::BeginRegion {
            kind,
            id,
            title: args.title.to_string(),
            visible,
        });
        visible
    }

    fn end_region(&mut self, kind: RegionKind, path: &WidgetPath, visible: bool) -> Option<RegionLayout> {
        let id = path.id();
        let layout = self.geometry.get(&id).copied();
        self.log.push(Invocation::EndRegion { kind, id, visible });
        layout
    }

    fn open_popup(&mut self, path: &WidgetPath) {
        self.popups.insert(path.id());
        self.log.push(Invocation::OpenPopup { id: path.id() });
    }

    fn checkbox(&mut self, path: &WidgetPath, _label: &str, value: bool) -> bool {
        self.log.push(Invocation::Checkbox { id: path.id(), value });
        match self.take(path, |r| matches!(r, Response::Bool(_) | Response::Clicked)) {
            Some(Response::Bool(v)) => v,
            Some(Response::Clicked) => !value,
            _ => value,
        }
    }

    fn drag_int(&mut self, path: &WidgetPath, _label: &str, value: i128, _spec: &NumericSpec) -> DragResponse<i128> {
        self.log.push(Invocation::DragInt { id: path.id(), value });
        let scripted = self.take(path, |r| {
            matches!(r, Response::Float(_) | Response::Int(_) | Response::Dragging(_))
        });
        match scripted {
            Some(Response::Int(v)) => DragResponse::idle(v),
            Some(Response::Float(v)) if !v.is_nan() => DragResponse::idle(v.round() as i128),
            Some(Response::Dragging(v)) if !v.is_nan() => DragResponse { value: v.round() as i128, active: true },
            Some(Response::Dragging(_)) => DragResponse { value, active: true },
            _ => DragResponse::idle(value),
        }
    }

    fn drag_float(&mut self, path: &WidgetPath, _label: &str, value: f64, _spec: &NumericSpec) -> DragResponse<f64> {
        self.log.push(Invocation::DragFloat { id: path.id(), value });
        self.drag(path, value)
    }

    fn drag_vector(
        &mut self,
        path: &WidgetPath,
        _label: &str,
        values: &[f64],
        _spec: &NumericSpec,
    ) -> DragResponse<Vec<f64>> {
        self.log.push(Invocation::DragVector { id: path.id(), values: values.to_vec() });
        match self.take(path, |r| matches!(r, Response::Vector(_))) {
            Some(Response::Vector(v)) => DragResponse::idle(v),
            _ => DragResponse::idle(values.to_vec()),
        }
    }

    fn input_text(&mut self, path: &WidgetPath, _label: &str, buffer: &mut String) -> TextResponse {
        self.log.push(Invocation::InputText { id: path.id(), value: buffer.clone() });
        match self.take(path, |r| matches!(r, Response::Text(_))) {
            Some(Response::Text(text)) => {
                let changed = *buffer != text;
                *buffer = text;
                TextResponse { changed, active: false }
            }
            _ => TextResponse::default(),
        }
    }

    fn text(&mut self, text: &str) {
        self.log.push(Invocation::Text(text.to_string()));
    }

    fn button(&mut self, path: &WidgetPath, _label: &str) -> bool {
        self.log.push(Invocation::Button { id: path.id() });
        self.take(path, |r| *r == Response::Clicked).is_some()
    }

    fn same_line(&mut self) {
        self.log.push(Invocation::SameLine);
    }

    fn separator(&mut self) {
        self.log.push(Invocation::Separator);
    }

    fn plot_line(&mut self, label: &str, points: &[[f64; 2]]) {
        self.log.push(Invocation::PlotLine {
            label: label.to_string(),
            points: points.len(),
        });
    }

    fn sequence_controls(&mut self, path: &WidgetPath, _index: usize) -> Option<SeqEdit> {
        self.log.push(Invocation::SequenceControls { id: path.id() });
        match self.take(path, |r| matches!(r, Response::Edit(SeqEdit::Remove(_) | SeqEdit::InsertAfter(_)))) {
            Some(Response::Edit(edit)) => Some(edit),
            _ => None,
        }
    }

    fn sequence_footer(&mut self, path: &WidgetPath) -> bool {
        self.log.push(Invocation::SequenceFooter { id: path.id() });
        self.take(path, |r| *r == Response::Edit(SeqEdit::Append)).is_some()
    }

    fn end_frame(&mut self) {
        self.log.push(Invocation::EndFrame);
    }

    fn backend_name(&self) -> &str {
        "headless"
    }
}
