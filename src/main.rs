//! autoviz 演示程序
//!
//! 渲染一个演示对象：按 Ctrl+K 打开弹出框，编辑样式参数，拖动绘图。
//!
//! # 使用方法
//!
//! ```bash
//! # 原生窗口
//! cargo run --features window
//!
//! # 无头运行 300 帧
//! cargo run -- --headless --frames 300
//! ```
//!
//! # 命令行参数
//!
//! - `--headless`: 不创建窗口
//! - `--frames <value>`: 运行指定帧数后退出
//! - `--width <value>` / `--height <value>`: 窗口尺寸
//! - `--eviction-frames <value>`: 缓存淘汰帧数
//! - `--no-persist`: 不读写布局文件

use std::collections::BTreeMap;

use anyhow::Context as _;
use autoviz::core::event::{KeyAction, KeyCode, Modifiers};
use autoviz::core::runtime::{init_program_identity, ProgramIdentity};
use autoviz::{autogui_custom, autogui_struct, Config, CustomRender, FieldOptions, Opaque, Ui, Viz, WidgetPath};
use tracing::info;

#[derive(Debug, Clone, Default)]
struct Particle {
    name: String,
    pos: [f32; 2],
    mass: f64,
    alive: bool,
}

autogui_struct!(Particle {
    name,
    pos: { format: "%.2f" },
    mass: { min: 0.0, max: 100.0, slider: true },
    alive,
});

#[derive(Debug, Clone)]
struct Style {
    line_width: f32,
    samples: u32,
    frequency: f64,
    tint: [f32; 3],
}

autogui_struct!(Style {
    line_width: { min: 0.5, max: 8.0 },
    samples: { min: 8, max: 512 },
    frequency: { min: 0.1, max: 10.0, format: "%.2f Hz" },
    tint: { min: 0.0, max: 1.0 },
});

impl Default for Style {
    fn default() -> Self {
        Self {
            line_width: 1.5,
            samples: 128,
            frequency: 1.0,
            tint: [0.3, 0.6, 0.9],
        }
    }
}

#[derive(Debug, Default)]
struct Demo {
    vec_2d: [i32; 2],
    style: Style,
    particles: Vec<Particle>,
    counters: BTreeMap<String, i64>,
    started: Opaque<Option<std::time::SystemTime>>,
    ctrl_k_presses: u32,
}

impl CustomRender for Demo {
    fn render(&mut self, ui: &mut Ui<'_>, _path: &WidgetPath, _options: &FieldOptions) -> autoviz::Result<()> {
        let ctrl_k = ui
            .key_events()
            .iter()
            .any(|e| e.key == KeyCode::K && e.action == KeyAction::Press && e.mods == Modifiers::CONTROL);
        if ctrl_k {
            self.ctrl_k_presses += 1;
            info!(count = self.ctrl_k_presses, "Pressed Ctrl+K");
            ui.open_popup("Shortcut");
        }

        if ui.button("Add particle")? {
            let index = self.particles.len();
            self.particles.push(Particle {
                name: format!("p{}", index),
                mass: 1.0,
                alive: true,
                ..Default::default()
            });
        }
        ui.same_line();
        if ui.button("Clear")? {
            self.particles.clear();
        }
        ui.separator();

        ui.render_field("vec_2d", &mut self.vec_2d, &FieldOptions::new().bounds(-10, 10))?;
        ui.render_field("particles", &mut self.particles, &FieldOptions::new())?;
        ui.render_field("counters", &mut self.counters, &FieldOptions::new())?;
        ui.render_field("started", &mut self.started, &FieldOptions::new())?;

        let style = &mut self.style;
        ui.window("Style", |ui| {
            ui.render_field("style", style, &FieldOptions::new().inline(true))?;
            ui.plot("Wave", |ui| {
                let samples = style.samples.max(2) as usize;
                let points: Vec<[f64; 2]> = (0..samples)
                    .map(|i| {
                        let t = i as f64 / (samples - 1) as f64;
                        [t, (t * style.frequency * std::f64::consts::TAU).sin()]
                    })
                    .collect();
                ui.plot_line("sin", &points);
                Ok(())
            })
        })?;

        let presses = self.ctrl_k_presses;
        ui.popup("Shortcut", |ui| {
            ui.text(&format!("Ctrl+K pressed {} time(s)", presses));
            Ok(())
        })?;
        Ok(())
    }
}

autogui_custom!(Demo);

fn main() -> anyhow::Result<()> {
    // 布局文件以入口程序命名，启动时固定下来
    if let Some(identity) = ProgramIdentity::current() {
        init_program_identity(identity);
    }

    let mut config = Config::from_file_or_default("autoviz.toml");
    config.apply_args(std::env::args());

    let mut viz = Viz::new(config).context("failed to start autoviz")?;
    info!(version = env!("CARGO_PKG_VERSION"), "autoviz demo started");

    let mut demo = Demo {
        counters: [("frames".to_string(), 0), ("resets".to_string(), 0)].into_iter().collect(),
        started: Opaque(Some(std::time::SystemTime::now())),
        ..Default::default()
    };

    while viz.wait() {
        if let Some(frames) = demo.counters.get_mut("frames") {
            *frames += 1;
        }
        viz.render(&mut demo)
            .with_context(|| format!("frame {} failed", viz.frame()))?;
    }
    Ok(())
}
