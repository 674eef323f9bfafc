//! egui 后端
//!
//! egui 的区域 API 是闭包形式，而分发器按 begin/end 成对调用。
//! 因此每一帧先把所有调用记录成一棵命令树，帧结束后再整体绘制到 `egui::Context`。
//! 绘制时产生的用户交互按控件 ID 保存，下一帧同一控件被调用时返回新值
//! （一帧延迟，语义上仍然是即时模式）。

use std::collections::{HashMap, HashSet};

use crate::autogui::options::format_float;
use crate::autogui::{RegionKind, WidgetPath};
use crate::core::event::{EventQueue, KeyAction, KeyCode, KeyEvent, Modifiers};
use crate::gui::backend::{
    Backend, DragResponse, NumericSpec, RegionArgs, RegionFlags, SeqEdit, TextResponse,
};
use crate::persist::RegionLayout;

/// 没有放进任何窗口的控件所在的默认窗口
pub const DEFAULT_WINDOW: &str = "Debug##Default";

const PLOT_HEIGHT: f32 = 200.0;
const CHILD_MAX_HEIGHT: f32 = 240.0;

const PALETTE: [egui::Color32; 6] = [
    egui::Color32::from_rgb(86, 156, 214),
    egui::Color32::from_rgb(230, 145, 56),
    egui::Color32::from_rgb(106, 190, 96),
    egui::Color32::from_rgb(214, 86, 96),
    egui::Color32::from_rgb(170, 120, 220),
    egui::Color32::from_rgb(220, 200, 80),
];

#[derive(Debug, Clone)]
struct RegionCommand {
    kind: RegionKind,
    id: String,
    title: String,
    flags: RegionFlags,
    layout: Option<RegionLayout>,
    open: bool,
    children: Vec<Command>,
}

#[derive(Debug, Clone)]
enum Command {
    Region(RegionCommand),
    Checkbox { id: String, label: String, value: bool },
    Drag { id: String, label: String, value: f64, spec: NumericSpec },
    DragInt { id: String, label: String, value: i128, spec: NumericSpec },
    DragVector { id: String, label: String, values: Vec<f64>, spec: NumericSpec },
    InputText { id: String, label: String, buffer: String },
    Text(String),
    Button { id: String, label: String },
    SameLine,
    Separator,
    PlotLine { label: String, points: Vec<[f64; 2]> },
    SequenceControls { id: String, index: usize },
    SequenceFooter { id: String },
}

/// 绘制时收集到的用户交互
#[derive(Debug, Clone, PartialEq)]
enum Edit {
    Bool(bool),
    Number { value: f64, active: bool },
    Int { value: i128, active: bool },
    Vector(Vec<f64>),
    Text { buffer: String, active: bool },
    Clicked,
    Toggled(bool),
    Seq(SeqEdit),
}

#[derive(Debug, Default)]
struct Interaction {
    edits: HashMap<String, Edit>,
    geometry: HashMap<String, RegionLayout>,
    plot_limits: HashMap<String, [f64; 4]>,
    collapsed: HashSet<String>,
    popups: HashSet<String>,
    keys: Vec<KeyEvent>,
}

/// 基于 egui 的后端
#[derive(Debug, Default)]
pub struct EguiBackend {
    building: Vec<(Option<RegionCommand>, Vec<Command>)>,
    committed: Vec<Command>,
    interaction: Interaction,
}

impl EguiBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, command: Command) {
        if self.building.is_empty() {
            self.building.push((None, Vec::new()));
        }
        if let Some((_, commands)) = self.building.last_mut() {
            commands.push(command);
        }
    }

    fn take_edit(&mut self, key: &str) -> Option<Edit> {
        self.interaction.edits.remove(key)
    }

    /// 把上一帧记录的命令树绘制到 `ctx`
    ///
    /// 必须在 `ctx.begin_frame` 与 `ctx.end_frame` 之间调用。
    pub fn paint(&mut self, ctx: &egui::Context) {
        collect_keys(ctx, &mut self.interaction.keys);

        let commands = std::mem::take(&mut self.committed);
        let mut loose = Vec::new();
        for command in &commands {
            match command {
                // 空的默认窗口不显示
                Command::Region(region)
                    if region.id == DEFAULT_WINDOW && region.children.is_empty() => {}
                Command::Region(region)
                    if matches!(region.kind, RegionKind::Window | RegionKind::Popup) =>
                {
                    paint_window(ctx, region, &mut self.interaction);
                }
                other => loose.push(other.clone()),
            }
        }
        if !loose.is_empty() {
            egui::Window::new("autoviz")
                .id(egui::Id::new(DEFAULT_WINDOW))
                .default_pos(egui::pos2(60.0, 60.0))
                .default_size(egui::vec2(400.0, 400.0))
                .show(ctx, |ui| paint_list(ui, &loose, &mut self.interaction));
        }
        self.committed = commands;
    }
}

impl Backend for EguiBackend {
    fn begin_frame(&mut self, _frame: u64, events: &mut EventQueue) {
        self.building.clear();
        self.building.push((None, Vec::new()));
        events.extend(self.interaction.keys.drain(..));
    }

    fn begin_region(&mut self, kind: RegionKind, path: &WidgetPath, args: &RegionArgs<'_>) -> bool {
        let id = path.id();
        let open = match kind {
            RegionKind::Window => !self.interaction.collapsed.contains(&id),
            RegionKind::Popup => self.interaction.popups.contains(&id),
            RegionKind::Tree => match self.take_edit(&id) {
                Some(Edit::Toggled(open)) => open,
                _ => args
                    .open
                    .unwrap_or(args.flags.contains(RegionFlags::DEFAULT_OPEN)),
            },
            RegionKind::Child | RegionKind::Plot => true,
        };
        self.building.push((
            Some(RegionCommand {
                kind,
                id,
                title: args.title.to_string(),
                flags: args.flags,
                layout: args.layout.copied(),
                open,
                children: Vec::new(),
            }),
            Vec::new(),
        ));
        open
    }

    fn end_region(&mut self, _kind: RegionKind, path: &WidgetPath, _visible: bool) -> Option<RegionLayout> {
        if let Some((Some(mut region), children)) = self.building.pop() {
            region.children = children;
            self.push(Command::Region(region));
        }
        self.interaction.geometry.get(&path.id()).copied()
    }

    fn open_popup(&mut self, path: &WidgetPath) {
        self.interaction.popups.insert(path.id());
    }

    fn checkbox(&mut self, path: &WidgetPath, label: &str, value: bool) -> bool {
        let id = path.id();
        let value = match self.take_edit(&id) {
            Some(Edit::Bool(v)) => v,
            _ => value,
        };
        self.push(Command::Checkbox { id, label: label.to_string(), value });
        value
    }

    fn drag_int(&mut self, path: &WidgetPath, label: &str, value: i128, spec: &NumericSpec) -> DragResponse<i128> {
        let id = path.id();
        let response = match self.take_edit(&id) {
            Some(Edit::Int { value, active }) => DragResponse { value, active },
            _ => DragResponse::idle(value),
        };
        self.push(Command::DragInt {
            id,
            label: label.to_string(),
            value: response.value,
            spec: spec.clone(),
        });
        response
    }

    fn drag_float(&mut self, path: &WidgetPath, label: &str, value: f64, spec: &NumericSpec) -> DragResponse<f64> {
        let id = path.id();
        let response = match self.take_edit(&id) {
            Some(Edit::Number { value, active }) => DragResponse { value, active },
            _ => DragResponse::idle(value),
        };
        self.push(Command::Drag {
            id,
            label: label.to_string(),
            value: response.value,
            spec: spec.clone(),
        });
        response
    }

    fn drag_vector(
        &mut self,
        path: &WidgetPath,
        label: &str,
        values: &[f64],
        spec: &NumericSpec,
    ) -> DragResponse<Vec<f64>> {
        let id = path.id();
        let response = match self.take_edit(&id) {
            Some(Edit::Vector(v)) if v.len() == values.len() => DragResponse::idle(v),
            _ => DragResponse::idle(values.to_vec()),
        };
        self.push(Command::DragVector {
            id,
            label: label.to_string(),
            values: response.value.clone(),
            spec: spec.clone(),
        });
        response
    }

    fn input_text(&mut self, path: &WidgetPath, label: &str, buffer: &mut String) -> TextResponse {
        let id = path.id();
        let response = match self.take_edit(&id) {
            Some(Edit::Text { buffer: edited, active }) => {
                let changed = *buffer != edited;
                *buffer = edited;
                TextResponse { changed, active }
            }
            _ => TextResponse::default(),
        };
        self.push(Command::InputText {
            id,
            label: label.to_string(),
            buffer: buffer.clone(),
        });
        response
    }

    fn text(&mut self, text: &str) {
        self.push(Command::Text(text.to_string()));
    }

    fn button(&mut self, path: &WidgetPath, label: &str) -> bool {
        let id = path.id();
        let clicked = matches!(self.take_edit(&id), Some(Edit::Clicked));
        self.push(Command::Button { id, label: label.to_string() });
        clicked
    }

    fn same_line(&mut self) {
        self.push(Command::SameLine);
    }

    fn separator(&mut self) {
        self.push(Command::Separator);
    }

    fn plot_line(&mut self, label: &str, points: &[[f64; 2]]) {
        self.push(Command::PlotLine {
            label: label.to_string(),
            points: points.to_vec(),
        });
    }

    fn sequence_controls(&mut self, path: &WidgetPath, index: usize) -> Option<SeqEdit> {
        let id = path.id();
        let edit = match self.take_edit(&seq_key(&id)) {
            Some(Edit::Seq(edit)) => Some(edit),
            _ => None,
        };
        self.push(Command::SequenceControls { id, index });
        edit
    }

    fn sequence_footer(&mut self, path: &WidgetPath) -> bool {
        let id = path.id();
        let clicked = matches!(self.take_edit(&seq_key(&id)), Some(Edit::Seq(SeqEdit::Append)));
        self.push(Command::SequenceFooter { id });
        clicked
    }

    fn end_frame(&mut self) {
        // 正常情况下只剩根列表；区域未关闭时把它们就地收拢
        while self.building.len() > 1 {
            if let Some((Some(mut region), children)) = self.building.pop() {
                region.children = children;
                self.push(Command::Region(region));
            }
        }
        self.committed = self
            .building
            .pop()
            .map(|(_, commands)| commands)
            .unwrap_or_default();
        // 本帧没有被消费的交互已经过期
        self.interaction.edits.clear();
    }

    fn backend_name(&self) -> &str {
        "egui"
    }
}

fn seq_key(id: &str) -> String {
    format!("{}#seq", id)
}

fn paint_window(ctx: &egui::Context, region: &RegionCommand, interaction: &mut Interaction) {
    let mut window = egui::Window::new(region.title.as_str())
        .id(egui::Id::new(&region.id))
        .title_bar(!region.flags.contains(RegionFlags::NO_TITLE_BAR))
        .resizable(!region.flags.contains(RegionFlags::NO_RESIZE))
        .movable(!region.flags.contains(RegionFlags::NO_MOVE));
    if let Some(layout) = &region.layout {
        if let Some([x, y]) = layout.pos {
            window = window.default_pos(egui::pos2(x, y));
        }
        if let Some([w, h]) = layout.size {
            window = window.default_size(egui::vec2(w, h));
        }
    }
    if region.flags.contains(RegionFlags::AUTO_RESIZE) {
        window = window.auto_sized();
    }

    let mut keep_open = true;
    let shown = if region.kind == RegionKind::Popup {
        window
            .collapsible(false)
            .open(&mut keep_open)
            .show(ctx, |ui| paint_list(ui, &region.children, interaction))
    } else {
        window.show(ctx, |ui| paint_list(ui, &region.children, interaction))
    };
    if !keep_open {
        interaction.popups.remove(&region.id);
    }

    if let Some(shown) = shown {
        let rect = shown.response.rect;
        interaction.geometry.insert(
            region.id.clone(),
            RegionLayout {
                pos: Some([rect.min.x, rect.min.y]),
                size: Some([rect.width(), rect.height()]),
                ..Default::default()
            },
        );
        if shown.inner.is_none() {
            interaction.collapsed.insert(region.id.clone());
        } else {
            interaction.collapsed.remove(&region.id);
        }
    }
}

/// 按 `SameLine` 把命令分成行后逐行绘制
fn paint_list(ui: &mut egui::Ui, commands: &[Command], interaction: &mut Interaction) {
    let mut start = 0;
    while start < commands.len() {
        let mut end = start + 1;
        while end + 1 < commands.len() && matches!(commands[end], Command::SameLine) {
            end += 2;
        }
        let row = &commands[start..end];
        if row.len() > 1 {
            ui.horizontal(|ui| {
                for command in row {
                    paint_command(ui, command, interaction);
                }
            });
        } else {
            paint_command(ui, &row[0], interaction);
        }
        start = end;
    }
}

fn paint_command(ui: &mut egui::Ui, command: &Command, interaction: &mut Interaction) {
    match command {
        Command::Region(region) => paint_region(ui, region, interaction),
        Command::Checkbox { id, label, value } => {
            let mut v = *value;
            if ui.push_id(id, |ui| ui.checkbox(&mut v, label.as_str())).inner.changed() {
                interaction.edits.insert(id.clone(), Edit::Bool(v));
            }
        }
        Command::Drag { id, label, value, spec } => {
            let mut v = *value;
            let response = ui
                .push_id(id, |ui| {
                    ui.horizontal(|ui| {
                        let response = numeric_widget(ui, &mut v, spec);
                        ui.label(label.as_str());
                        response
                    })
                    .inner
                })
                .inner;
            if response.changed() || response.dragged() {
                interaction.edits.insert(
                    id.clone(),
                    Edit::Number { value: v, active: response.dragged() },
                );
            }
        }
        Command::DragInt { id, label, value, spec } => {
            // 控件只能编辑 f64，按拖动的差值改写原整数
            let start = *value as f64;
            let mut v = start;
            let response = ui
                .push_id(id, |ui| {
                    ui.horizontal(|ui| {
                        let response = numeric_widget(ui, &mut v, spec);
                        ui.label(label.as_str());
                        response
                    })
                    .inner
                })
                .inner;
            if (response.changed() || response.dragged()) && !v.is_nan() {
                let edited = value.saturating_add((v - start).round() as i128);
                interaction.edits.insert(
                    id.clone(),
                    Edit::Int { value: edited, active: response.dragged() },
                );
            }
        }
        Command::DragVector { id, label, values, spec } => {
            let mut edited = values.clone();
            let changed = ui
                .push_id(id, |ui| {
                    ui.horizontal(|ui| {
                        let mut changed = false;
                        for component in edited.iter_mut() {
                            changed |= numeric_widget(ui, component, spec).changed();
                        }
                        ui.label(label.as_str());
                        changed
                    })
                    .inner
                })
                .inner;
            if changed {
                interaction.edits.insert(id.clone(), Edit::Vector(edited));
            }
        }
        Command::InputText { id, label, buffer } => {
            let mut edited = buffer.clone();
            let response = ui
                .horizontal(|ui| {
                    let response = ui.add(
                        egui::TextEdit::singleline(&mut edited).id(egui::Id::new(id)),
                    );
                    ui.label(label.as_str());
                    response
                })
                .inner;
            if response.changed() || response.has_focus() || response.lost_focus() {
                interaction.edits.insert(
                    id.clone(),
                    Edit::Text { buffer: edited, active: response.has_focus() },
                );
            }
        }
        Command::Text(text) => {
            ui.label(text.as_str());
        }
        Command::Button { id, label } => {
            if ui.push_id(id, |ui| ui.button(label.as_str())).inner.clicked() {
                interaction.edits.insert(id.clone(), Edit::Clicked);
            }
        }
        Command::SameLine => {}
        Command::Separator => {
            ui.separator();
        }
        // 绘图区域之外的折线没有坐标系可画
        Command::PlotLine { .. } => {}
        Command::SequenceControls { id, index } => {
            ui.push_id(seq_key(id), |ui| {
                ui.horizontal(|ui| {
                    if ui.small_button("-").on_hover_text("Remove").clicked() {
                        interaction.edits.insert(seq_key(id), Edit::Seq(SeqEdit::Remove(*index)));
                    }
                    if ui.small_button("+").on_hover_text("Insert after").clicked() {
                        interaction.edits.insert(seq_key(id), Edit::Seq(SeqEdit::InsertAfter(*index)));
                    }
                });
            });
        }
        Command::SequenceFooter { id } => {
            if ui.push_id(seq_key(id), |ui| ui.small_button("Append")).inner.clicked() {
                interaction.edits.insert(seq_key(id), Edit::Seq(SeqEdit::Append));
            }
        }
    }
}

fn paint_region(ui: &mut egui::Ui, region: &RegionCommand, interaction: &mut Interaction) {
    match region.kind {
        RegionKind::Window | RegionKind::Popup => {
            let ctx = ui.ctx().clone();
            paint_window(&ctx, region, interaction);
        }
        RegionKind::Child => {
            egui::Frame::group(ui.style()).show(ui, |ui| {
                egui::ScrollArea::vertical()
                    .id_source(&region.id)
                    .max_height(CHILD_MAX_HEIGHT)
                    .show(ui, |ui| paint_list(ui, &region.children, interaction));
            });
        }
        RegionKind::Tree => {
            let response = egui::CollapsingHeader::new(region.title.as_str())
                .id_source(&region.id)
                .open(Some(region.open))
                .show(ui, |ui| paint_list(ui, &region.children, interaction));
            if response.header_response.clicked() {
                interaction
                    .edits
                    .insert(region.id.clone(), Edit::Toggled(!region.open));
            }
        }
        RegionKind::Plot => paint_plot(ui, region, interaction),
    }
}

fn paint_plot(ui: &mut egui::Ui, region: &RegionCommand, interaction: &mut Interaction) {
    let lines: Vec<(&str, &[[f64; 2]])> = region
        .children
        .iter()
        .filter_map(|command| match command {
            Command::PlotLine { label, points } => Some((label.as_str(), points.as_slice())),
            _ => None,
        })
        .collect();

    let fitted = data_limits(&lines);
    let limits = interaction
        .plot_limits
        .entry(region.id.clone())
        .or_insert_with(|| {
            region
                .layout
                .and_then(|layout| layout.limits)
                .unwrap_or(fitted)
        });

    ui.label(region.title.as_str());
    let size = egui::vec2(ui.available_width().max(120.0), PLOT_HEIGHT);
    let (rect, response) = ui.allocate_exact_size(size, egui::Sense::click_and_drag());

    // 双击自动适配，拖拽平移
    if response.double_clicked() {
        *limits = fitted;
    } else if response.dragged() {
        let delta = response.drag_delta();
        let dx = (limits[1] - limits[0]) * (delta.x / rect.width()) as f64;
        let dy = (limits[3] - limits[2]) * (delta.y / rect.height()) as f64;
        limits[0] -= dx;
        limits[1] -= dx;
        limits[2] += dy;
        limits[3] += dy;
    }
    let [x0, x1, y0, y1] = *limits;

    let painter = ui.painter_at(rect);
    painter.rect_stroke(rect, 0.0, ui.visuals().widgets.noninteractive.bg_stroke);
    let to_screen = |p: [f64; 2]| {
        let tx = ((p[0] - x0) / (x1 - x0).max(f64::EPSILON)) as f32;
        let ty = ((p[1] - y0) / (y1 - y0).max(f64::EPSILON)) as f32;
        egui::pos2(rect.left() + tx * rect.width(), rect.bottom() - ty * rect.height())
    };
    for (i, (label, points)) in lines.iter().enumerate() {
        let color = PALETTE[i % PALETTE.len()];
        let screen: Vec<egui::Pos2> = points.iter().map(|p| to_screen(*p)).collect();
        painter.add(egui::Shape::line(screen, egui::Stroke::new(1.5, color)));
        painter.text(
            rect.left_top() + egui::vec2(6.0, 6.0 + 14.0 * i as f32),
            egui::Align2::LEFT_TOP,
            *label,
            egui::FontId::proportional(12.0),
            color,
        );
    }

    let others: Vec<Command> = region
        .children
        .iter()
        .filter(|command| !matches!(command, Command::PlotLine { .. }))
        .cloned()
        .collect();
    paint_list(ui, &others, interaction);

    interaction.geometry.insert(
        region.id.clone(),
        RegionLayout {
            limits: Some([x0, x1, y0, y1]),
            ..Default::default()
        },
    );
}

fn data_limits(lines: &[(&str, &[[f64; 2]])]) -> [f64; 4] {
    let mut limits = [f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY];
    for p in lines.iter().flat_map(|(_, points)| points.iter()) {
        if !(p[0].is_finite() && p[1].is_finite()) {
            continue;
        }
        limits[0] = limits[0].min(p[0]);
        limits[1] = limits[1].max(p[0]);
        limits[2] = limits[2].min(p[1]);
        limits[3] = limits[3].max(p[1]);
    }
    if !limits.iter().all(|v| v.is_finite()) {
        return [0.0, 1.0, 0.0, 1.0];
    }
    for axis in [0, 2] {
        if limits[axis + 1] - limits[axis] < f64::EPSILON {
            limits[axis] -= 0.5;
            limits[axis + 1] += 0.5;
        }
    }
    limits
}

fn numeric_widget(ui: &mut egui::Ui, value: &mut f64, spec: &NumericSpec) -> egui::Response {
    let format = spec.format.clone();
    match (spec.slider, spec.min, spec.max) {
        (true, Some(lo), Some(hi)) => ui.add(
            egui::Slider::new(value, lo..=hi).custom_formatter(move |v, _| format_float(&format, v)),
        ),
        _ => {
            let mut drag = egui::DragValue::new(value)
                .speed(spec.speed as f64)
                .custom_formatter(move |v, _| format_float(&format, v));
            if spec.min.is_some() || spec.max.is_some() {
                drag = drag.clamp_range(
                    spec.min.unwrap_or(f64::NEG_INFINITY)..=spec.max.unwrap_or(f64::INFINITY),
                );
            }
            ui.add(drag)
        }
    }
}

fn collect_keys(ctx: &egui::Context, out: &mut Vec<KeyEvent>) {
    ctx.input(|input| {
        for event in &input.events {
            if let egui::Event::Key { key, pressed, repeat, modifiers, .. } = event {
                let action = match (*pressed, *repeat) {
                    (true, true) => KeyAction::Repeat,
                    (true, false) => KeyAction::Press,
                    (false, _) => KeyAction::Release,
                };
                out.push(KeyEvent::new(map_key(*key), action, map_modifiers(*modifiers)));
            }
        }
    });
}

fn map_modifiers(modifiers: egui::Modifiers) -> Modifiers {
    let mut mods = Modifiers::NONE;
    if modifiers.shift {
        mods |= Modifiers::SHIFT;
    }
    if modifiers.ctrl {
        mods |= Modifiers::CONTROL;
    }
    if modifiers.alt {
        mods |= Modifiers::ALT;
    }
    if modifiers.mac_cmd {
        mods |= Modifiers::SUPER;
    }
    mods
}

fn map_key(key: egui::Key) -> KeyCode {
    use egui::Key;
    match key {
        Key::A => KeyCode::A,
        Key::B => KeyCode::B,
        Key::C => KeyCode::C,
        Key::D => KeyCode::D,
        Key::E => KeyCode::E,
        Key::F => KeyCode::F,
        Key::G => KeyCode::G,
        Key::H => KeyCode::H,
        Key::I => KeyCode::I,
        Key::J => KeyCode::J,
        Key::K => KeyCode::K,
        Key::L => KeyCode::L,
        Key::M => KeyCode::M,
        Key::N => KeyCode::N,
        Key::O => KeyCode::O,
        Key::P => KeyCode::P,
        Key::Q => KeyCode::Q,
        Key::R => KeyCode::R,
        Key::S => KeyCode::S,
        Key::T => KeyCode::T,
        Key::U => KeyCode::U,
        Key::V => KeyCode::V,
        Key::W => KeyCode::W,
        Key::X => KeyCode::X,
        Key::Y => KeyCode::Y,
        Key::Z => KeyCode::Z,
        Key::Num0 => KeyCode::Num0,
        Key::Num1 => KeyCode::Num1,
        Key::Num2 => KeyCode::Num2,
        Key::Num3 => KeyCode::Num3,
        Key::Num4 => KeyCode::Num4,
        Key::Num5 => KeyCode::Num5,
        Key::Num6 => KeyCode::Num6,
        Key::Num7 => KeyCode::Num7,
        Key::Num8 => KeyCode::Num8,
        Key::Num9 => KeyCode::Num9,
        Key::Escape => KeyCode::Escape,
        Key::Enter => KeyCode::Enter,
        Key::Tab => KeyCode::Tab,
        Key::Backspace => KeyCode::Backspace,
        Key::Space => KeyCode::Space,
        Key::Delete => KeyCode::Delete,
        Key::ArrowUp => KeyCode::ArrowUp,
        Key::ArrowDown => KeyCode::ArrowDown,
        Key::ArrowLeft => KeyCode::ArrowLeft,
        Key::ArrowRight => KeyCode::ArrowRight,
        Key::F1 => KeyCode::F1,
        Key::F2 => KeyCode::F2,
        Key::F3 => KeyCode::F3,
        Key::F4 => KeyCode::F4,
        Key::F5 => KeyCode::F5,
        Key::F6 => KeyCode::F6,
        Key::F7 => KeyCode::F7,
        Key::F8 => KeyCode::F8,
        Key::F9 => KeyCode::F9,
        Key::F10 => KeyCode::F10,
        Key::F11 => KeyCode::F11,
        Key::F12 => KeyCode::F12,
        other => KeyCode::Other(other as u32),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> NumericSpec {
        NumericSpec {
            min: Some(-1.0),
            max: Some(1.0),
            speed: 0.1,
            format: "%.3f".to_string(),
            slider: false,
        }
    }

    #[test]
    fn test_command_tree_paints_headless() {
        let mut backend = EguiBackend::new();
        let mut events = EventQueue::new();
        let window = WidgetPath::root("Style");
        let args = RegionArgs { title: "Style", flags: RegionFlags::NONE, layout: None, open: None };

        backend.begin_frame(1, &mut events);
        assert!(backend.begin_region(RegionKind::Window, &window, &args));
        backend.drag_float(&window.field("x"), "x", 0.5, &spec());
        backend.same_line();
        backend.text("units");
        assert!(backend.begin_region(RegionKind::Plot, &window.label("plot"), &args));
        backend.plot_line("sin", &[[0.0, 0.0], [1.0, 1.0]]);
        backend.end_region(RegionKind::Plot, &window.label("plot"), true);
        backend.end_region(RegionKind::Window, &window, true);
        backend.end_frame();

        assert_eq!(backend.committed.len(), 1);
        let ctx = egui::Context::default();
        let _ = ctx.run(egui::RawInput::default(), |ctx| backend.paint(ctx));
        assert!(backend.interaction.geometry.contains_key(&window.label("plot").id()));
    }

    #[test]
    fn test_edits_return_on_next_call() {
        let mut backend = EguiBackend::new();
        let path = WidgetPath::root("r").field("x");
        backend
            .interaction
            .edits
            .insert(path.id(), Edit::Number { value: 0.75, active: true });
        let response = backend.drag_float(&path, "x", 0.0, &spec());
        assert_eq!(response, DragResponse { value: 0.75, active: true });
        assert_eq!(backend.drag_float(&path, "x", 0.75, &spec()).value, 0.75);
    }

    #[test]
    fn test_drag_int_keeps_large_values() {
        let mut backend = EguiBackend::new();
        let mut events = EventQueue::new();
        let path = WidgetPath::root("r").field("big");
        let big = (u64::MAX - 5) as i128;
        let spec = NumericSpec { min: None, max: None, format: "%d".to_string(), ..spec() };

        backend.begin_frame(1, &mut events);
        assert_eq!(backend.drag_int(&path, "big", big, &spec), DragResponse::idle(big));
        backend.end_frame();
        let ctx = egui::Context::default();
        let _ = ctx.run(egui::RawInput::default(), |ctx| backend.paint(ctx));
        assert!(backend.interaction.edits.is_empty());

        backend.interaction.edits.insert(path.id(), Edit::Int { value: big - 2, active: false });
        assert_eq!(backend.drag_int(&path, "big", big, &spec).value, big - 2);
    }

    #[test]
    fn test_data_limits() {
        let points = [[0.0, 2.0], [4.0, -2.0]];
        assert_eq!(data_limits(&[("a", &points[..])]), [0.0, 4.0, -2.0, 2.0]);
        assert_eq!(data_limits(&[]), [0.0, 1.0, 0.0, 1.0]);
        assert_eq!(data_limits(&[("a", &[[1.0, 1.0]][..])]), [0.5, 1.5, 0.5, 1.5]);
    }

    #[test]
    fn test_key_mapping() {
        assert_eq!(map_key(egui::Key::K), KeyCode::K);
        assert_eq!(map_key(egui::Key::Escape), KeyCode::Escape);
        let mods = egui::Modifiers { ctrl: true, shift: true, ..Default::default() };
        assert_eq!(map_modifiers(mods), Modifiers::CONTROL | Modifiers::SHIFT);
    }
}
