//! 帧循环驱动器
//!
//! ```no_run
//! use autoviz::{autogui_struct, Config, Viz};
//!
//! #[derive(Default)]
//! struct State {
//!     speed: f32,
//!     label: String,
//! }
//!
//! autogui_struct!(State { speed: { min: 0.0, max: 10.0 }, label });
//!
//! fn main() -> autoviz::Result<()> {
//!     let mut viz = Viz::new(Config::default())?;
//!     let mut state = State::default();
//!     while viz.wait() {
//!         viz.render(&mut state)?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! 每一帧：后端开始新帧、事件队列交付快照、上下文栈重置，
//! 根对象渲染在默认窗口里，然后检查上下文栈已清空、老化缓存、呈现，
//! 并按固定节奏刷写布局。

use tracing::{error, info};

use crate::autogui::{Autogui, Reflect, WidgetPath};
use crate::core::config::Config;
use crate::core::error::{Result, VizError};
use crate::core::event::EventQueue;
use crate::core::log;
use crate::core::runtime::program_identity;
use crate::gfx::{FrameHost, HeadlessHost};
use crate::gui::{FrameStats, DEFAULT_WINDOW};
use crate::persist::{owner_path, LayoutStore};

/// 根对象的路径名
pub const ROOT_NAME: &str = "root";

/// 帧循环驱动器
pub struct Viz<H: FrameHost = Box<dyn FrameHost>> {
    host: H,
    autogui: Autogui,
    events: EventQueue,
    layout: LayoutStore,
    stats: FrameStats,
    flush_interval: u64,
    frame: u64,
    root: WidgetPath,
    closed: bool,
}

impl Viz {
    /// 按配置创建：初始化日志，加载布局，打开窗口（或无头宿主）
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let log_file = config
            .logging
            .file_output
            .then_some(config.logging.log_file.as_str());
        log::init_logger(config.logging.level, config.logging.file_output, log_file);

        let host = open_host(&config)?;
        info!(host = host.host_name(), "Frame host ready");
        let layout = load_layout(&config);
        Ok(Viz::with_layout(config, host, layout))
    }
}

fn frame_limit(config: &Config) -> Option<u64> {
    (config.window.frame_limit > 0).then_some(config.window.frame_limit)
}

fn headless_host(config: &Config) -> Box<dyn FrameHost> {
    let pacing = std::time::Duration::from_millis(config.window.min_frame_interval_ms);
    Box::new(HeadlessHost::new(frame_limit(config)).with_pacing(pacing))
}

#[cfg(feature = "window")]
fn open_host(config: &Config) -> Result<Box<dyn FrameHost>> {
    if config.window.headless {
        return Ok(headless_host(config));
    }
    Ok(Box::new(crate::gfx::WindowHost::new(&config.window)?))
}

#[cfg(not(feature = "window"))]
fn open_host(config: &Config) -> Result<Box<dyn FrameHost>> {
    if !config.window.headless {
        tracing::warn!("Built without the `window` feature, running headless");
    }
    Ok(headless_host(config))
}

/// 布局文件以入口程序命名；持久化关闭时只在内存中工作
fn load_layout(config: &Config) -> LayoutStore {
    if !config.persistence.enabled {
        return LayoutStore::in_memory();
    }
    let Some(identity) = program_identity() else {
        crate::persist_warn!("Entry program unknown, layout kept in memory");
        return LayoutStore::in_memory();
    };
    let directory = config.persistence.directory.trim();
    let directory = (!directory.is_empty()).then(|| std::path::Path::new(directory));
    LayoutStore::load(owner_path(&identity, directory))
}

impl<H: FrameHost> Viz<H> {
    /// 使用给定的宿主，布局只在内存中
    pub fn with_host(config: Config, host: H) -> Self {
        Self::with_layout(config, host, LayoutStore::in_memory())
    }

    pub fn with_layout(config: Config, host: H, layout: LayoutStore) -> Self {
        Self {
            host,
            autogui: Autogui::new(config.autogui.clone()),
            events: EventQueue::new(),
            layout,
            stats: FrameStats::new(),
            flush_interval: config.persistence.flush_interval_frames,
            frame: 0,
            root: WidgetPath::root(ROOT_NAME),
            closed: false,
        }
    }

    /// 阻塞到下一帧
    ///
    /// 宿主关闭时刷写布局并返回 `false`，调用方必须停止循环。
    pub fn wait(&mut self) -> bool {
        if self.closed {
            crate::autogui_warn!("wait() called after the host closed");
            return false;
        }
        if self.host.wait_frame() {
            return true;
        }
        self.closed = true;
        self.layout.flush();
        info!(frames = self.frame, "Frame loop finished");
        false
    }

    /// 渲染一帧
    ///
    /// 失败时所有已打开的区域都已关闭；协议违规和自定义渲染失败应终止循环。
    pub fn render(&mut self, root: &mut dyn Reflect) -> Result<()> {
        if self.closed {
            return Err(VizError::Runtime("render() called after the host closed".to_string()));
        }
        self.frame += 1;
        let span = crate::frame_span!(self.frame);
        let _enter = span.enter();

        let backend = self.host.backend();
        backend.begin_frame(self.frame, &mut self.events);
        self.events.begin_frame();
        self.autogui.begin_frame(self.frame);

        let root_path = &self.root;
        let result = {
            let mut ui = self.autogui.ui(&mut *backend, &self.events, &mut self.layout);
            ui.window(DEFAULT_WINDOW, |ui| ui.render_root(root, root_path))
                .map(|_| ())
        };
        let result = result.and_then(|()| self.autogui.context.assert_empty());
        if result.is_err() {
            self.autogui.unwind(&mut *backend);
        }
        // 栈已清空，只剩缓存老化
        let _ = self.autogui.end_frame();
        backend.end_frame();

        self.host.finish_frame()?;
        self.stats.record_frame();

        if let Err(e) = result {
            error!(
                frame = self.frame,
                path = %e.path().map(|p| p.to_string()).unwrap_or_default(),
                error = %e,
                "Frame failed"
            );
            return Err(e);
        }

        if self.flush_interval > 0 && self.frame % self.flush_interval == 0 {
            self.layout.flush();
        }
        Ok(())
    }

    /// 已渲染的帧数
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    pub fn layout(&self) -> &LayoutStore {
        &self.layout
    }

    pub fn autogui(&self) -> &Autogui {
        &self.autogui
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl<H: FrameHost> Drop for Viz<H> {
    fn drop(&mut self) {
        if !self.closed {
            self.layout.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autogui::{CustomRender, FieldOptions, RegionKind, Ui};
    use crate::core::error::ProtocolViolation;
    use crate::core::event::{KeyAction, KeyCode, KeyEvent, Modifiers};
    use crate::gui::{Invocation, Response};
    use crate::persist::{RegionLayout, DEFAULT_LAYOUT};

    #[derive(Debug, Default)]
    struct Point {
        x: f64,
        y: f64,
    }

    crate::autogui_struct!(Point {
        x: { min: -1, max: 1 },
        y: { min: -1, max: 1 },
    });

    fn viz(frames: u64) -> Viz<HeadlessHost> {
        Viz::with_host(Config::default(), HeadlessHost::new(Some(frames)))
    }

    #[test]
    fn test_wait_returns_false_once_host_closes() {
        let mut viz = viz(3);
        let mut point = Point::default();
        let mut frames = 0;
        while viz.wait() {
            viz.render(&mut point).unwrap();
            frames += 1;
        }
        assert_eq!(frames, 3);
        assert!(viz.is_closed());
        assert!(viz.render(&mut point).is_err());
        assert_eq!(viz.stats().total_frames(), 3);
    }

    #[test]
    fn test_root_renders_inside_default_window() {
        let mut viz = viz(1);
        let mut point = Point::default();
        assert!(viz.wait());
        viz.render(&mut point).unwrap();
        let log = viz.host_mut().recorder().take_invocations();
        assert_eq!(log[0], Invocation::BeginFrame);
        assert_eq!(
            log[1],
            Invocation::BeginRegion {
                kind: RegionKind::Window,
                id: DEFAULT_WINDOW.to_string(),
                title: "Debug".to_string(),
                visible: true,
            }
        );
        assert!(log.contains(&Invocation::DragFloat { id: "root.x".to_string(), value: 0.0 }));
        assert_eq!(log[log.len() - 1], Invocation::EndFrame);
        // 默认窗口位置来自内置布局
        let window = WidgetPath::root(DEFAULT_WINDOW);
        assert_eq!(viz.host_mut().recorder().geometry(&window).and_then(|l| l.pos), Some([60.0, 60.0]));
    }

    #[test]
    fn test_drag_clamped_end_to_end() {
        let mut viz = viz(1);
        let mut point = Point::default();
        let root = WidgetPath::root(ROOT_NAME);
        viz.host_mut().recorder().script(&root.field("x"), Response::Float(2.5));
        viz.host_mut().recorder().script(&root.field("y"), Response::Float(-3.0));
        assert!(viz.wait());
        viz.render(&mut point).unwrap();
        assert_eq!((point.x, point.y), (1.0, -1.0));
    }

    #[derive(Default)]
    struct KeyProbe {
        first: Vec<KeyEvent>,
        second: Vec<KeyEvent>,
    }

    impl CustomRender for KeyProbe {
        fn render(&mut self, ui: &mut Ui<'_>, _path: &WidgetPath, _options: &FieldOptions) -> Result<()> {
            self.first = ui.key_events().to_vec();
            self.second = ui.key_events().to_vec();
            Ok(())
        }
    }

    crate::autogui_custom!(KeyProbe);

    #[test]
    fn test_key_events_snapshot_per_frame() {
        let mut viz = viz(2);
        let mut probe = KeyProbe::default();
        let keys = [
            KeyEvent::new(KeyCode::K, KeyAction::Press, Modifiers::CONTROL),
            KeyEvent::new(KeyCode::K, KeyAction::Release, Modifiers::CONTROL),
            KeyEvent::press(KeyCode::K),
        ];
        for key in keys {
            viz.host_mut().recorder().push_key(key);
        }
        assert!(viz.wait());
        viz.render(&mut probe).unwrap();
        assert_eq!(probe.first, keys);
        assert_eq!(probe.second, keys);

        assert!(viz.wait());
        viz.render(&mut probe).unwrap();
        assert!(probe.first.is_empty());
    }

    struct Failing;

    impl CustomRender for Failing {
        fn render(&mut self, ui: &mut Ui<'_>, _path: &WidgetPath, _options: &FieldOptions) -> Result<()> {
            ui.window("Inner", |ui| -> Result<()> {
                Err(VizError::custom(ui.path(), "sensor offline"))
            })?;
            Ok(())
        }
    }

    crate::autogui_custom!(Failing);

    #[test]
    fn test_custom_failure_closes_regions_and_reports_path() {
        let mut viz = viz(2);
        assert!(viz.wait());
        let err = viz.render(&mut Failing).unwrap_err();
        assert_eq!(err.path().map(|p| p.id()), Some("root##Inner".to_string()));
        assert_eq!(viz.autogui().context.depth(), 0);

        let log = viz.host_mut().recorder().take_invocations();
        let begins = log.iter().filter(|i| matches!(i, Invocation::BeginRegion { .. })).count();
        let ends = log.iter().filter(|i| matches!(i, Invocation::EndRegion { .. })).count();
        assert_eq!((begins, ends), (2, 2));
        assert_eq!(log[log.len() - 1], Invocation::EndFrame);
    }

    struct Unbalanced;

    impl CustomRender for Unbalanced {
        fn render(&mut self, ui: &mut Ui<'_>, _path: &WidgetPath, _options: &FieldOptions) -> Result<()> {
            ui.close_region(RegionKind::Popup)
        }
    }

    crate::autogui_custom!(Unbalanced);

    #[test]
    fn test_mismatched_close_is_fatal() {
        let mut viz = viz(1);
        assert!(viz.wait());
        let err = viz.render(&mut Unbalanced).unwrap_err();
        assert!(matches!(
            err,
            VizError::Protocol(ProtocolViolation::MismatchedClose {
                expected: RegionKind::Window,
                found: RegionKind::Popup,
                ..
            })
        ));
        assert!(err.is_fatal());
        assert_eq!(viz.autogui().context.depth(), 0);
    }

    fn temp_layout(name: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!(".autoviz_viz_{}_{}.autoviz.ini", name, std::process::id()));
        let _ = std::fs::remove_file(&path);
        path
    }

    #[test]
    fn test_layout_saved_on_close_and_reloaded() {
        let owner = temp_layout("close");
        assert!(!owner.exists());

        let store = LayoutStore::load(&owner);
        assert_eq!(store.blob(), &crate::persist::default_blob());
        assert!(DEFAULT_LAYOUT.contains("Debug##Default"));

        let mut viz = Viz::with_layout(Config::default(), HeadlessHost::new(Some(1)), store);
        let window = WidgetPath::root(DEFAULT_WINDOW);
        viz.host_mut().recorder().set_geometry(
            &window,
            RegionLayout { pos: Some([15.0, 25.0]), size: Some([320.0, 240.0]), ..Default::default() },
        );
        let mut point = Point::default();
        while viz.wait() {
            viz.render(&mut point).unwrap();
        }
        assert!(!viz.layout().is_dirty());

        let reloaded = LayoutStore::load(&owner);
        let layout = reloaded.region(RegionKind::Window, DEFAULT_WINDOW).unwrap();
        assert_eq!(layout.pos, Some([15.0, 25.0]));
        assert_eq!(layout.size, Some([320.0, 240.0]));
        let _ = std::fs::remove_file(&owner);
    }

    #[test]
    fn test_periodic_flush() {
        let owner = temp_layout("periodic");
        let mut config = Config::default();
        config.persistence.flush_interval_frames = 2;
        let mut viz = Viz::with_layout(config, HeadlessHost::new(None), LayoutStore::load(&owner));
        let window = WidgetPath::root(DEFAULT_WINDOW);
        viz.host_mut().recorder().set_geometry(&window, RegionLayout { pos: Some([1.0, 2.0]), ..Default::default() });
        let mut point = Point::default();

        assert!(viz.wait());
        viz.render(&mut point).unwrap();
        assert!(viz.layout().is_dirty());
        assert!(!owner.exists());

        assert!(viz.wait());
        viz.render(&mut point).unwrap();
        assert!(!viz.layout().is_dirty());
        assert!(owner.exists());
        drop(viz);
        let _ = std::fs::remove_file(&owner);
    }
}
