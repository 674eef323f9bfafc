//! 类型分发器
//!
//! 每帧对根对象做一次自顶向下、从左到右的遍历：
//! 按 `Reflect::node()` 给出的分类选择基本控件，复合值递归进入子节点，
//! 控件返回的新值在每一层显式写回所属容器。
//!
//! `Ui` 是绑定了后端、上下文栈、状态缓存、事件快照和布局存储的上下文对象，
//! 自定义渲染钩子通过它使用即时模式接口。

use std::collections::HashSet;

use crate::autogui::cache::{WidgetKind, WidgetState, WidgetStateCache};
use crate::autogui::context::{AutoguiContext, RegionKind};
use crate::autogui::options::{format_float, FieldOptions};
use crate::autogui::path::{split_label, WidgetPath};
use crate::autogui::reflect::{
    Composite, CustomRender, FloatValue, IntValue, Mapping, Node, Reflect, Sequence, VectorValue,
};
use crate::core::config::AutoguiConfig;
use crate::core::error::Result;
use crate::core::event::{EventQueue, KeyCode, KeyEvent, Modifiers};
use crate::gui::backend::{Backend, NumericSpec, RegionArgs, RegionFlags, SeqEdit};
use crate::persist::{LayoutStore, RegionLayout};

/// 进程级的分发器状态：上下文栈与控件状态缓存
///
/// 启动时构造一次，每帧开始时重置上下文、帧末老化缓存。
#[derive(Debug)]
pub struct Autogui {
    pub context: AutoguiContext,
    pub cache: WidgetStateCache,
    config: AutoguiConfig,
    reported_opaque: HashSet<WidgetPath>,
}

impl Autogui {
    pub fn new(config: AutoguiConfig) -> Self {
        Self {
            context: AutoguiContext::new(),
            cache: WidgetStateCache::new(config.eviction_frames),
            config,
            reported_opaque: HashSet::new(),
        }
    }

    pub fn config(&self) -> &AutoguiConfig {
        &self.config
    }

    pub fn begin_frame(&mut self, frame: u64) {
        self.context.reset();
        self.cache.begin_frame(frame);
    }

    /// 结束本帧：检查上下文栈已清空，淘汰过期缓存
    pub fn end_frame(&mut self) -> Result<()> {
        let balanced = self.context.assert_empty();
        self.cache.end_frame();
        balanced
    }

    /// 出错时从内到外关闭所有仍然打开的区域
    pub fn unwind(&mut self, backend: &mut dyn Backend) -> usize {
        let frames = self.context.unwind();
        for frame in &frames {
            backend.end_region(frame.kind, &frame.path, frame.visible);
        }
        if !frames.is_empty() {
            crate::autogui_debug!(regions = frames.len(), "Unwound open regions");
        }
        frames.len()
    }

    /// 为本帧构造绑定上下文
    pub fn ui<'a>(
        &'a mut self,
        backend: &'a mut dyn Backend,
        events: &'a EventQueue,
        layout: &'a mut LayoutStore,
    ) -> Ui<'a> {
        Ui {
            backend,
            state: self,
            events,
            layout,
            scope: WidgetPath::empty(),
            saved_scopes: Vec::new(),
        }
    }
}

/// 一帧内的绑定上下文
pub struct Ui<'a> {
    backend: &'a mut dyn Backend,
    state: &'a mut Autogui,
    events: &'a EventQueue,
    layout: &'a mut LayoutStore,
    scope: WidgetPath,
    saved_scopes: Vec<WidgetPath>,
}

impl<'a> Ui<'a> {
    /// 当前路径前缀
    pub fn path(&self) -> &WidgetPath {
        &self.scope
    }

    /// 本帧的按键事件
    pub fn key_events(&self) -> &[KeyEvent] {
        self.events.poll()
    }

    pub fn key_pressed(&self, key: KeyCode, mods: Modifiers) -> bool {
        self.events.pressed(key, mods)
    }

    pub fn config(&self) -> &AutoguiConfig {
        &self.state.config
    }

    /// 当前打开的区域数
    pub fn depth(&self) -> usize {
        self.state.context.depth()
    }

    // ----------------------------------------------------------------
    // 区域
    // ----------------------------------------------------------------

    /// 打开一个区域，必须配对调用 `close_region`，与返回值无关
    pub fn open_region(&mut self, kind: RegionKind, label: &str, flags: RegionFlags) -> Result<bool> {
        let path = self.scope.label(label);
        self.state.cache.mark_visited(&path)?;
        self.open_at(kind, &path, split_label(label).0, flags)
    }

    pub fn close_region(&mut self, kind: RegionKind) -> Result<()> {
        let frame = self.state.context.close(kind)?;
        let geometry = self.backend.end_region(kind, &frame.path, frame.visible);
        if let Some(geometry) = geometry {
            if kind != RegionKind::Tree && kind.has_layout(self.state.config.persist_tree_state) {
                self.layout.update(kind, &frame.path.id(), &geometry);
            }
        }
        self.scope = self.saved_scopes.pop().unwrap_or_else(WidgetPath::empty);
        Ok(())
    }

    /// 闭包形式：`f` 只在区域可见时运行，区域总会被关闭
    pub fn region<R>(
        &mut self,
        kind: RegionKind,
        label: &str,
        flags: RegionFlags,
        f: impl FnOnce(&mut Self) -> Result<R>,
    ) -> Result<Option<R>> {
        let visible = self.open_region(kind, label, flags)?;
        let out = if visible { Some(f(self)?) } else { None };
        self.close_region(kind)?;
        Ok(out)
    }

    pub fn window<R>(&mut self, label: &str, f: impl FnOnce(&mut Self) -> Result<R>) -> Result<Option<R>> {
        self.region(RegionKind::Window, label, RegionFlags::NONE, f)
    }

    pub fn popup<R>(&mut self, label: &str, f: impl FnOnce(&mut Self) -> Result<R>) -> Result<Option<R>> {
        self.region(RegionKind::Popup, label, RegionFlags::NONE, f)
    }

    pub fn child<R>(&mut self, label: &str, f: impl FnOnce(&mut Self) -> Result<R>) -> Result<Option<R>> {
        self.region(RegionKind::Child, label, RegionFlags::NONE, f)
    }

    pub fn plot<R>(&mut self, label: &str, f: impl FnOnce(&mut Self) -> Result<R>) -> Result<Option<R>> {
        self.region(RegionKind::Plot, label, RegionFlags::NONE, f)
    }

    pub fn tree<R>(&mut self, label: &str, f: impl FnOnce(&mut Self) -> Result<R>) -> Result<Option<R>> {
        self.region(RegionKind::Tree, label, RegionFlags::NONE, f)
    }

    /// 请求显示弹出框 `label`
    pub fn open_popup(&mut self, label: &str) {
        let path = self.scope.label(label);
        self.backend.open_popup(&path);
    }

    fn open_at(&mut self, kind: RegionKind, path: &WidgetPath, title: &str, flags: RegionFlags) -> Result<bool> {
        let persist_tree = self.state.config.persist_tree_state;
        let visible = if kind == RegionKind::Tree {
            self.open_tree(path, title, flags, persist_tree)
        } else {
            let layout = if kind.has_layout(persist_tree) && self.state.context.first_open(kind, path) {
                let layout = self.layout.region(kind, &path.id());
                crate::autogui_debug!(kind = ?kind, path = %path, found = layout.is_some(), "Layout pulled");
                layout
            } else {
                None
            };
            let args = RegionArgs {
                title,
                flags,
                layout: layout.as_ref(),
                open: None,
            };
            self.backend.begin_region(kind, path, &args)
        };
        self.state.context.open(kind, path.clone(), visible);
        self.saved_scopes
            .push(std::mem::replace(&mut self.scope, path.clone()));
        Ok(visible)
    }

    /// 折叠节点：展开状态保存在缓存里，可选地写入布局文件
    fn open_tree(&mut self, path: &WidgetPath, title: &str, flags: RegionFlags, persist: bool) -> bool {
        let id = path.id();
        let cached = match self.state.cache.get(path, WidgetKind::Tree).map(|e| &e.state) {
            Some(WidgetState::Tree { open }) => Some(*open),
            _ => None,
        };
        let initial = cached
            .or_else(|| {
                if persist {
                    self.layout.region(RegionKind::Tree, &id).and_then(|l| l.open)
                } else {
                    None
                }
            })
            .unwrap_or(flags.contains(RegionFlags::DEFAULT_OPEN));
        let args = RegionArgs {
            title,
            flags,
            layout: None,
            open: Some(initial),
        };
        let open = self.backend.begin_region(RegionKind::Tree, path, &args);
        self.state.cache.get_or_create(path, WidgetKind::Tree).state = WidgetState::Tree { open };
        if persist && open != initial {
            self.layout.update(
                RegionKind::Tree,
                &id,
                &RegionLayout {
                    open: Some(open),
                    ..Default::default()
                },
            );
        }
        open
    }

    // ----------------------------------------------------------------
    // 基本控件
    // ----------------------------------------------------------------

    pub fn text(&mut self, text: &str) {
        self.backend.text(text);
    }

    pub fn button(&mut self, label: &str) -> Result<bool> {
        let path = self.scope.label(label);
        self.state.cache.mark_visited(&path)?;
        Ok(self.backend.button(&path, split_label(label).0))
    }

    pub fn same_line(&mut self) {
        self.backend.same_line();
    }

    pub fn separator(&mut self) {
        self.backend.separator();
    }

    /// 在当前绘图区域里画折线
    pub fn plot_line(&mut self, label: &str, points: &[[f64; 2]]) {
        self.backend.plot_line(label, points);
    }

    // ----------------------------------------------------------------
    // 分发
    // ----------------------------------------------------------------

    /// 在当前前缀下渲染一个具名字段
    pub fn render_field(&mut self, name: &str, value: &mut dyn Reflect, options: &FieldOptions) -> Result<()> {
        let path = self.scope.field(name);
        self.render_value(value, &path, options)
    }

    /// 渲染根对象，根节点不包折叠节点
    pub fn render_root(&mut self, root: &mut dyn Reflect, path: &WidgetPath) -> Result<()> {
        let saved = std::mem::replace(&mut self.scope, path.clone());
        let result = self.render_value(root, path, &FieldOptions::new().inline(true));
        self.scope = saved;
        result
    }

    /// 按分类渲染 `value` 并把新值写回
    pub fn render_value(&mut self, value: &mut dyn Reflect, path: &WidgetPath, options: &FieldOptions) -> Result<()> {
        self.state.cache.mark_visited(path)?;
        let caption = options.label.clone().unwrap_or_else(|| path.caption());

        match value.node() {
            Node::Bool(v) => {
                if options.read_only {
                    self.backend.text(&format!("{}: {}", caption, v));
                } else {
                    *v = self.backend.checkbox(path, &caption, *v);
                }
            }
            Node::Int(v) => self.render_int(v, path, &caption, options),
            Node::Float(v) => self.render_float(v, path, &caption, options),
            Node::Text(v) => self.render_text(v, path, &caption, options),
            Node::Vector(v) => self.render_vector(v, path, &caption, options),
            Node::Composite(c) => self.render_composite(c, path, &caption, options)?,
            Node::Sequence(s) => self.render_sequence(s, path, &caption, options)?,
            Node::Mapping(m) => self.render_mapping(m, path, &caption, options)?,
            Node::Custom(hook) => self.render_custom(hook, path, options)?,
            Node::Opaque(text) => {
                if self.state.reported_opaque.insert(path.clone()) {
                    crate::autogui_debug!(path = %path, "Unsupported value, rendered as text");
                }
                self.backend.text(&format!("{}: {}", caption, text));
            }
        }
        Ok(())
    }

    fn numeric_spec(&self, options: &FieldOptions, integer: bool) -> NumericSpec {
        let config = &self.state.config;
        let default_format = if integer { &config.int_format } else { &config.float_format };
        NumericSpec {
            min: options.min,
            max: options.max,
            speed: options.speed.unwrap_or(config.drag_speed),
            format: options.format.clone().unwrap_or_else(|| default_format.clone()),
            slider: options.slider && options.is_bounded(),
        }
    }

    fn render_float(&mut self, v: &mut dyn FloatValue, path: &WidgetPath, caption: &str, options: &FieldOptions) {
        let spec = self.numeric_spec(options, false);
        let old = options.clamp(v.get());
        if options.read_only {
            self.backend.text(&format!("{}: {}", caption, format_float(&spec.format, old)));
            return;
        }
        let response = self.backend.drag_float(path, caption, old, &spec);
        let new = self.settle_drag(path, old, response.value, response.active, options);
        v.set(new);
    }

    fn render_int(&mut self, v: &mut dyn IntValue, path: &WidgetPath, caption: &str, options: &FieldOptions) {
        let spec = self.numeric_spec(options, true);
        let (lo, hi) = v.limits();
        let current = v.get();
        let old = options.clamp_int(current).clamp(lo, hi);
        if options.read_only {
            self.backend.text(&format!("{}: {}", caption, old));
            return;
        }
        let response = self.backend.drag_int(path, caption, old, &spec);
        let new = match self.track_drag(path, old as f64, response.active) {
            Some(origin) => options.clamp_int(origin.round() as i128),
            None => options.clamp_int(response.value),
        }
        .clamp(lo, hi);
        if new != current {
            v.set(new);
        }
    }

    /// 限制范围、丢弃 NaN，并处理拖拽中按 Escape 撤销
    fn settle_drag(&mut self, path: &WidgetPath, old: f64, proposed: f64, active: bool, options: &FieldOptions) -> f64 {
        match self.track_drag(path, old, active) {
            Some(origin) => origin,
            None if proposed.is_nan() => old,
            None => options.clamp(proposed),
        }
    }

    /// 记录拖拽起点；拖拽中按下 Escape 时返回起点
    fn track_drag(&mut self, path: &WidgetPath, old: f64, active: bool) -> Option<f64> {
        if !active && !self.state.cache.contains(path, WidgetKind::Drag) {
            return None;
        }
        let escape = self.events.pressed(KeyCode::Escape, Modifiers::NONE);
        let entry = self.state.cache.get_or_create(path, WidgetKind::Drag);
        let WidgetState::Drag { active: dragging, origin } = &mut entry.state else {
            return None;
        };
        if active && !*dragging {
            *origin = old;
        }
        if (active || *dragging) && escape {
            *dragging = false;
            crate::autogui_debug!(path = %path, origin = *origin, "Drag reverted");
            return Some(*origin);
        }
        *dragging = active;
        None
    }

    fn render_text(&mut self, v: &mut String, path: &WidgetPath, caption: &str, options: &FieldOptions) {
        if options.read_only {
            self.backend.text(&format!("{}: {}", caption, v));
            return;
        }
        let entry = self.state.cache.get_or_create(path, WidgetKind::TextEdit);
        if let WidgetState::TextEdit { buffer, editing } = &mut entry.state {
            if !*editing {
                buffer.clone_from(v);
            }
            let response = self.backend.input_text(path, caption, buffer);
            if response.changed {
                v.clone_from(buffer);
            }
            *editing = response.active;
        }
    }

    fn render_vector(&mut self, v: &mut dyn VectorValue, path: &WidgetPath, caption: &str, options: &FieldOptions) {
        let integer = v.is_integer();
        let spec = self.numeric_spec(options, integer);
        let current = v.components();
        let old: Vec<f64> = current.iter().map(|c| options.clamp(*c)).collect();
        if options.read_only {
            let parts: Vec<String> = old.iter().map(|c| format_float(&spec.format, *c)).collect();
            self.backend.text(&format!("{}: [{}]", caption, parts.join(", ")));
            return;
        }
        let response = self.backend.drag_vector(path, caption, &old, &spec);
        let new: Vec<f64> = old
            .iter()
            .zip(response.value.iter().chain(std::iter::repeat(&f64::NAN)))
            .map(|(before, after)| {
                let value = if after.is_nan() { *before } else { options.clamp(*after) };
                if integer { value.round() } else { value }
            })
            .collect();
        if new != current {
            v.set_components(&new);
        }
    }

    /// 复合值放在折叠节点里（根节点和 `inline` 字段除外）
    fn render_nested(
        &mut self,
        path: &WidgetPath,
        caption: &str,
        options: &FieldOptions,
        body: impl FnOnce(&mut Self) -> Result<()>,
    ) -> Result<()> {
        if options.inline {
            return body(self);
        }
        let open = self.open_at(RegionKind::Tree, path, caption, RegionFlags::NONE)?;
        if open {
            body(self)?;
        }
        self.close_region(RegionKind::Tree)
    }

    fn render_composite(
        &mut self,
        composite: &mut dyn Composite,
        path: &WidgetPath,
        caption: &str,
        options: &FieldOptions,
    ) -> Result<()> {
        self.render_nested(path, caption, options, |ui| {
            for field in composite.fields() {
                let child = path.field(field.name);
                let mut child_options = field.options;
                child_options.read_only |= options.read_only;
                ui.render_value(field.value, &child, &child_options)?;
            }
            Ok(())
        })
    }

    fn render_sequence(
        &mut self,
        sequence: &mut dyn Sequence,
        path: &WidgetPath,
        caption: &str,
        options: &FieldOptions,
    ) -> Result<()> {
        let item_options = FieldOptions {
            label: None,
            inline: false,
            ..options.clone()
        };
        self.render_nested(path, caption, options, |ui| {
            let resizable = sequence.resizable() && !options.read_only;
            let mut edits = Vec::new();
            for index in 0..sequence.len() {
                let child = path.index(index);
                if let Some(item) = sequence.item(index) {
                    ui.render_value(item, &child, &item_options)?;
                }
                if resizable {
                    if let Some(edit) = ui.backend.sequence_controls(&child, index) {
                        edits.push(edit);
                    }
                }
            }
            if resizable && ui.backend.sequence_footer(path) {
                edits.push(SeqEdit::Append);
            }
            ui.apply_edits(sequence, path, edits);
            Ok(())
        })
    }

    /// 遍历结束后按下标从大到小应用结构性编辑，再让移动过的下标的缓存失效
    fn apply_edits(&mut self, sequence: &mut dyn Sequence, path: &WidgetPath, edits: Vec<SeqEdit>) {
        if edits.is_empty() {
            return;
        }
        let len = sequence.len();
        let mut ops: Vec<(usize, SeqEdit)> = edits
            .into_iter()
            .filter_map(|edit| match edit {
                SeqEdit::Remove(i) if i < len => Some((i, edit)),
                SeqEdit::InsertAfter(i) if i < len => Some((i + 1, edit)),
                SeqEdit::Append => Some((len, edit)),
                _ => None,
            })
            .collect();
        // 同一位置先删除再插入
        ops.sort_by(|a, b| {
            b.0.cmp(&a.0)
                .then_with(|| is_insert(&a.1).cmp(&is_insert(&b.1)))
        });
        ops.dedup();

        for (position, edit) in &ops {
            match edit {
                SeqEdit::Remove(_) => sequence.remove(*position),
                SeqEdit::InsertAfter(_) | SeqEdit::Append => sequence.insert_default(*position),
            }
        }
        if let Some(first) = ops.iter().map(|(position, _)| *position).min() {
            crate::autogui_debug!(path = %path, edits = ops.len(), first, "Applied sequence edits");
            self.state.cache.invalidate_from(path, first);
        }
    }

    fn render_mapping(
        &mut self,
        mapping: &mut dyn Mapping,
        path: &WidgetPath,
        caption: &str,
        options: &FieldOptions,
    ) -> Result<()> {
        let item_options = FieldOptions {
            label: None,
            inline: false,
            ..options.clone()
        };
        self.render_nested(path, caption, options, |ui| {
            for (key, value) in mapping.entries() {
                let child = path.label(key);
                ui.render_value(value, &child, &item_options)?;
            }
            Ok(())
        })
    }

    /// 钩子的错误原样向上传播
    fn render_custom(&mut self, hook: &mut dyn CustomRender, path: &WidgetPath, options: &FieldOptions) -> Result<()> {
        let saved = std::mem::replace(&mut self.scope, path.clone());
        let result = hook.render(self, path, options);
        self.scope = saved;
        result
    }
}

fn is_insert(edit: &SeqEdit) -> bool {
    !matches!(edit, SeqEdit::Remove(_))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::{ProtocolViolation, VizError};
    use crate::core::event::{KeyAction, KeyEvent};
    use crate::gui::headless::{Invocation, RecordingBackend, Response};

    struct Harness {
        autogui: Autogui,
        backend: RecordingBackend,
        events: EventQueue,
        layout: LayoutStore,
        frame: u64,
        root: WidgetPath,
    }

    impl Harness {
        fn new() -> Self {
            Self::with_config(AutoguiConfig::default())
        }

        fn with_config(config: AutoguiConfig) -> Self {
            Self {
                autogui: Autogui::new(config),
                backend: RecordingBackend::new(),
                events: EventQueue::new(),
                layout: LayoutStore::in_memory(),
                frame: 0,
                root: WidgetPath::root("root"),
            }
        }

        fn frame(&mut self, root: &mut dyn Reflect) -> Result<()> {
            self.frame += 1;
            self.backend.begin_frame(self.frame, &mut self.events);
            self.events.begin_frame();
            self.autogui.begin_frame(self.frame);
            let result = {
                let mut ui = self.autogui.ui(&mut self.backend, &self.events, &mut self.layout);
                ui.render_root(root, &self.root)
            };
            if result.is_err() {
                self.autogui.unwind(&mut self.backend);
            }
            self.backend.end_frame();
            let balanced = self.autogui.end_frame();
            result.and(balanced)
        }
    }

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Point {
        x: f64,
        y: f64,
    }

    crate::autogui_struct!(Point {
        x: { min: -1, max: 1 },
        y: { min: -1, max: 1 },
    });

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Item {
        name: String,
        weight: f32,
    }

    crate::autogui_struct!(Item { name, weight });

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Scene {
        enabled: bool,
        count: u8,
        offset: [f32; 3],
        items: Vec<Item>,
        tags: std::collections::BTreeMap<String, i32>,
        note: Option<String>,
    }

    crate::autogui_struct!(Scene {
        enabled,
        count: { max: 10 },
        offset: { format: "%.1f" },
        items,
        tags,
        note,
    });

    fn scene() -> Scene {
        Scene {
            enabled: true,
            count: 3,
            offset: [0.0, 1.0, 2.0],
            items: vec![
                Item { name: "a".into(), weight: 1.0 },
                Item { name: "b".into(), weight: 2.0 },
            ],
            tags: [("x".to_string(), 1), ("y".to_string(), 2)].into_iter().collect(),
            note: None,
        }
    }

    #[test]
    fn test_clamped_drag_writes_back() {
        let mut h = Harness::new();
        let mut point = Point::default();
        h.backend.script(&h.root.field("x"), Response::Float(2.5));
        h.backend.script(&h.root.field("y"), Response::Float(-3.0));
        h.frame(&mut point).unwrap();
        assert_eq!(point, Point { x: 1.0, y: -1.0 });
    }

    #[test]
    fn test_out_of_range_value_is_clamped_before_display() {
        let mut h = Harness::new();
        let mut point = Point { x: 7.0, y: -0.5 };
        h.frame(&mut point).unwrap();
        assert_eq!(point, Point { x: 1.0, y: -0.5 });
        assert!(h.backend.invocations().contains(&Invocation::DragFloat {
            id: "root.x".to_string(),
            value: 1.0,
        }));
    }

    #[test]
    fn test_nan_keeps_previous_value() {
        let mut h = Harness::new();
        let mut point = Point { x: 0.25, y: 0.0 };
        h.backend.script(&h.root.field("x"), Response::Float(f64::NAN));
        h.frame(&mut point).unwrap();
        assert_eq!(point.x, 0.25);
    }

    #[test]
    fn test_integer_respects_type_and_bounds() {
        let mut h = Harness::new();
        let mut s = scene();
        h.backend.script(&h.root.field("count"), Response::Int(40));
        h.frame(&mut s).unwrap();
        assert_eq!(s.count, 10);
    }

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Counters {
        big: u64,
        huge: i64,
        small: i8,
        pair: [i64; 2],
    }

    crate::autogui_struct!(Counters { big, huge, small, pair });

    #[test]
    fn test_wide_integers_survive_rendering() {
        let mut h = Harness::new();
        let before = Counters {
            big: u64::MAX - 5,
            huge: (1i64 << 53) + 1,
            small: i8::MIN,
            pair: [i64::MAX - 1, (1i64 << 53) + 1],
        };
        let mut counters = before.clone();
        h.frame(&mut counters).unwrap();
        h.frame(&mut counters).unwrap();
        assert_eq!(counters, before);
        assert!(h.backend.invocations().contains(&Invocation::DragInt {
            id: "root.big".to_string(),
            value: (u64::MAX - 5) as i128,
        }));

        h.backend.script(&h.root.field("big"), Response::Int(u64::MAX as i128 + 10));
        h.backend.script(&h.root.field("huge"), Response::Int((1i128 << 53) + 3));
        h.frame(&mut counters).unwrap();
        assert_eq!(counters.big, u64::MAX);
        assert_eq!(counters.huge, (1i64 << 53) + 3);
    }

    #[test]
    fn test_escape_reverts_active_drag() {
        let mut h = Harness::new();
        let mut point = Point::default();
        let x = h.root.field("x");

        h.backend.script(&x, Response::Dragging(0.5));
        h.frame(&mut point).unwrap();
        assert_eq!(point.x, 0.5);

        h.backend.script(&x, Response::Dragging(0.7));
        h.backend.push_key(KeyEvent::new(KeyCode::Escape, KeyAction::Press, Modifiers::NONE));
        h.frame(&mut point).unwrap();
        assert_eq!(point.x, 0.0);
    }

    #[test]
    fn test_unchanged_object_is_idempotent() {
        let mut h = Harness::new();
        let mut s = scene();
        let before = s.clone();
        h.frame(&mut s).unwrap();
        let first = h.backend.take_invocations();
        h.frame(&mut s).unwrap();
        let second = h.backend.take_invocations();
        assert_eq!(first, second);
        assert_eq!(s, before);
        assert!(first.contains(&Invocation::Text("note: None".to_string())));
    }

    #[test]
    fn test_field_paths_stable_across_frames() {
        let mut h = Harness::new();
        let mut s = scene();
        let ids = |log: &[Invocation]| -> Vec<String> {
            log.iter()
                .filter_map(|i| match i {
                    Invocation::Checkbox { id, .. } | Invocation::DragInt { id, .. } => Some(id.clone()),
                    _ => None,
                })
                .collect()
        };
        h.frame(&mut s).unwrap();
        let first = ids(&h.backend.take_invocations());
        h.frame(&mut s).unwrap();
        assert_eq!(first, ids(&h.backend.take_invocations()));
        assert_eq!(first, ["root.enabled", "root.count"]);
    }

    #[test]
    fn test_nested_values_render_in_closed_trees() {
        let mut h = Harness::new();
        let mut s = scene();
        h.frame(&mut s).unwrap();
        let log = h.backend.invocations();
        assert!(log.contains(&Invocation::BeginRegion {
            kind: RegionKind::Tree,
            id: "root.items".to_string(),
            title: "items".to_string(),
            visible: false,
        }));
        // 折叠时不渲染子节点
        assert!(!log.iter().any(|i| matches!(i, Invocation::InputText { id, .. } if id.starts_with("root.items"))));

        h.backend.script(&h.root.field("items"), Response::Clicked);
        h.frame(&mut s).unwrap();
        assert!(h.backend.invocations().contains(&Invocation::BeginRegion {
            kind: RegionKind::Tree,
            id: "root.items[0]".to_string(),
            title: "0".to_string(),
            visible: false,
        }));
    }

    #[test]
    fn test_sequence_remove_forgets_shifted_state() {
        let mut h = Harness::new();
        let mut items = vec![
            Item { name: "a".into(), weight: 0.0 },
            Item { name: "b".into(), weight: 0.0 },
            Item { name: "c".into(), weight: 0.0 },
        ];
        let second = h.root.index(1);

        // 展开 b
        h.backend.script(&second, Response::Clicked);
        h.frame(&mut items).unwrap();
        assert!(h.autogui.cache.contains(&second, WidgetKind::Tree));

        // 删除 b
        h.backend.script(&second, Response::Edit(SeqEdit::Remove(1)));
        h.frame(&mut items).unwrap();
        let names: Vec<_> = items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["a", "c"]);
        assert!(!h.autogui.cache.contains(&second, WidgetKind::Tree));
        assert!(!h.autogui.cache.contains(&h.root.index(2), WidgetKind::Tree));

        // c 移到下标 1 后是折叠的默认状态，而不是继承 b 的展开状态
        h.backend.take_invocations();
        h.frame(&mut items).unwrap();
        assert!(h.backend.invocations().contains(&Invocation::BeginRegion {
            kind: RegionKind::Tree,
            id: "root[1]".to_string(),
            title: "1".to_string(),
            visible: false,
        }));
    }

    #[test]
    fn test_sequence_insert_and_append() {
        let mut h = Harness::new();
        let mut values = vec![1.0f64, 2.0];
        h.backend.script(&h.root.index(0), Response::Edit(SeqEdit::InsertAfter(0)));
        h.backend.script(&h.root, Response::Edit(SeqEdit::Append));
        h.frame(&mut values).unwrap();
        assert_eq!(values, [1.0, 0.0, 2.0, 0.0]);
    }

    #[test]
    fn test_remove_and_insert_at_same_position() {
        let mut h = Harness::new();
        let mut values = vec![1i32, 2, 3];
        h.backend.script(&h.root.index(2), Response::Edit(SeqEdit::Remove(2)));
        h.backend.script(&h.root.index(1), Response::Edit(SeqEdit::InsertAfter(1)));
        h.frame(&mut values).unwrap();
        assert_eq!(values, [1, 2, 0]);
    }

    #[test]
    fn test_text_edit_writes_back() {
        let mut h = Harness::new();
        let mut item = Item { name: "old".into(), weight: 0.0 };
        h.backend.script(&h.root.field("name"), Response::Text("new".into()));
        h.frame(&mut item).unwrap();
        assert_eq!(item.name, "new");
    }

    struct Panel {
        point: Point,
        popup_visible: bool,
        fail: bool,
    }

    impl CustomRender for Panel {
        fn render(&mut self, ui: &mut Ui<'_>, path: &WidgetPath, _options: &FieldOptions) -> Result<()> {
            if ui.key_pressed(KeyCode::K, Modifiers::CONTROL) {
                ui.open_popup("popup");
            }
            let fail = self.fail;
            let point = &mut self.point;
            ui.window("Style", |ui| {
                ui.render_field("point", point, &FieldOptions::new())?;
                ui.child("child", |ui| {
                    ui.plot("plot", |ui| {
                        ui.plot_line("line", &[[0.0, 0.0], [1.0, 1.0]]);
                        if fail {
                            return Err(VizError::custom(ui.path(), "boom"));
                        }
                        Ok(())
                    })
                })
            })?;
            self.popup_visible = ui.popup("popup", |ui| {
                ui.text("hello");
                Ok(())
            })?
            .is_some();
            assert_eq!(ui.path(), path);
            Ok(())
        }
    }

    crate::autogui_custom!(Panel);

    fn panel() -> Panel {
        Panel { point: Point::default(), popup_visible: false, fail: false }
    }

    #[test]
    fn test_stack_balanced_for_every_visibility() {
        let regions = ["root##Style", "root##Style##child", "root##Style##child##plot"];
        for mask in 0..8u8 {
            let mut h = Harness::new();
            let mut p = panel();
            for (bit, id) in regions.iter().enumerate() {
                let path = match bit {
                    0 => h.root.label("Style"),
                    1 => h.root.label("Style").label("child"),
                    _ => h.root.label("Style").label("child").label("plot"),
                };
                assert_eq!(path.id(), *id);
                h.backend.script(&path, Response::Region(mask & (1 << bit) != 0));
            }
            h.frame(&mut p).unwrap();
            assert_eq!(h.autogui.context.depth(), 0);
            let log = h.backend.invocations();
            let begins = log.iter().filter(|i| matches!(i, Invocation::BeginRegion { .. })).count();
            let ends = log.iter().filter(|i| matches!(i, Invocation::EndRegion { .. })).count();
            assert_eq!(begins, ends, "mask {}", mask);
        }
    }

    #[test]
    fn test_custom_hook_popup_from_key_event() {
        let mut h = Harness::new();
        let mut p = panel();
        h.frame(&mut p).unwrap();
        assert!(!p.popup_visible);

        h.backend.push_key(KeyEvent::new(KeyCode::K, KeyAction::Press, Modifiers::CONTROL));
        h.frame(&mut p).unwrap();
        assert!(p.popup_visible);
        assert!(h.backend.invocations().contains(&Invocation::Text("hello".to_string())));
    }

    #[test]
    fn test_custom_failure_unwinds_open_regions() {
        let mut h = Harness::new();
        let mut p = panel();
        p.fail = true;
        let err = h.frame(&mut p).unwrap_err();
        assert!(matches!(err, VizError::CustomRender { .. }));
        assert_eq!(err.path(), Some(&h.root.label("Style").label("child").label("plot")));
        assert_eq!(h.autogui.context.depth(), 0);
        let log = h.backend.invocations();
        let begins = log.iter().filter(|i| matches!(i, Invocation::BeginRegion { .. })).count();
        let ends = log.iter().filter(|i| matches!(i, Invocation::EndRegion { .. })).count();
        // 窗口、字段折叠节点、子区域、绘图
        assert_eq!(begins, 4);
        assert_eq!(ends, 4);
    }

    struct Twins;

    impl CustomRender for Twins {
        fn render(&mut self, ui: &mut Ui<'_>, _path: &WidgetPath, _options: &FieldOptions) -> Result<()> {
            ui.button("Go")?;
            ui.button("Go")?;
            Ok(())
        }
    }

    crate::autogui_custom!(Twins);

    #[test]
    fn test_duplicate_path_is_protocol_violation() {
        let mut h = Harness::new();
        let err = h.frame(&mut Twins).unwrap_err();
        assert!(matches!(err, VizError::Protocol(ProtocolViolation::DuplicatePath(_))));
        assert_eq!(err.path(), Some(&h.root.label("Go")));
    }

    struct Leaky;

    impl CustomRender for Leaky {
        fn render(&mut self, ui: &mut Ui<'_>, _path: &WidgetPath, _options: &FieldOptions) -> Result<()> {
            ui.open_region(RegionKind::Window, "left open", RegionFlags::NONE)?;
            Ok(())
        }
    }

    crate::autogui_custom!(Leaky);

    #[test]
    fn test_unclosed_region_fails_frame() {
        let mut h = Harness::new();
        let err = h.frame(&mut Leaky).unwrap_err();
        assert!(matches!(
            err,
            VizError::Protocol(ProtocolViolation::UnbalancedStack { depth: 1, .. })
        ));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_window_layout_pulled_once_and_updated() {
        let mut h = Harness::new();
        let window = h.root.label("Style");
        h.layout.update(
            RegionKind::Window,
            &window.id(),
            &RegionLayout { pos: Some([10.0, 20.0]), ..Default::default() },
        );
        let mut p = panel();
        h.frame(&mut p).unwrap();
        assert_eq!(h.backend.geometry(&window).and_then(|l| l.pos), Some([10.0, 20.0]));

        h.backend.set_geometry(&window, RegionLayout { pos: Some([300.0, 40.0]), size: Some([200.0, 100.0]), ..Default::default() });
        h.frame(&mut p).unwrap();
        let stored = h.layout.region(RegionKind::Window, &window.id()).unwrap();
        assert_eq!(stored.pos, Some([300.0, 40.0]));
        assert_eq!(stored.size, Some([200.0, 100.0]));
    }

    #[test]
    fn test_tree_state_persisted_when_enabled() {
        let config = AutoguiConfig { persist_tree_state: true, ..AutoguiConfig::default() };
        let mut h = Harness::with_config(config);
        let mut s = scene();
        h.backend.script(&h.root.field("items"), Response::Clicked);
        h.frame(&mut s).unwrap();
        assert_eq!(
            h.layout.region(RegionKind::Tree, "root.items").and_then(|l| l.open),
            Some(true)
        );

        // 缓存淘汰后从布局文件恢复
        let mut fresh = Harness::with_config(AutoguiConfig { persist_tree_state: true, ..AutoguiConfig::default() });
        fresh.layout = std::mem::replace(&mut h.layout, LayoutStore::in_memory());
        fresh.frame(&mut s).unwrap();
        assert!(fresh.backend.invocations().contains(&Invocation::BeginRegion {
            kind: RegionKind::Tree,
            id: "root.items".to_string(),
            title: "items".to_string(),
            visible: true,
        }));
    }

    #[test]
    fn test_tree_state_not_persisted_by_default() {
        let mut h = Harness::new();
        let mut s = scene();
        h.backend.script(&h.root.field("items"), Response::Clicked);
        h.frame(&mut s).unwrap();
        assert_eq!(h.layout.region(RegionKind::Tree, "root.items"), None);
        assert!(!h.layout.is_dirty());
    }
}
