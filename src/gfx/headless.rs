//! 无头宿主
//!
//! 没有窗口，使用 `RecordingBackend`。帧数用完或调用 `close` 后关闭。

use std::time::Duration;

use crate::core::error::Result;
use crate::gfx::host::{FrameHost, FramePacer};
use crate::gui::{Backend, RecordingBackend};

/// 无头宿主
#[derive(Debug)]
pub struct HeadlessHost {
    backend: RecordingBackend,
    frame_limit: Option<u64>,
    frames: u64,
    closed: bool,
    pacer: FramePacer,
}

impl HeadlessHost {
    /// `frame_limit` 为 `None` 时一直运行到 `close`
    pub fn new(frame_limit: Option<u64>) -> Self {
        Self {
            backend: RecordingBackend::new(),
            frame_limit,
            frames: 0,
            closed: false,
            pacer: FramePacer::new(Duration::ZERO),
        }
    }

    pub fn with_pacing(mut self, min_interval: Duration) -> Self {
        self.pacer = FramePacer::new(min_interval);
        self
    }

    /// 用于安排按键和交互
    pub fn recorder(&mut self) -> &mut RecordingBackend {
        &mut self.backend
    }

    /// 模拟用户关闭窗口
    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl FrameHost for HeadlessHost {
    fn wait_frame(&mut self) -> bool {
        if self.closed {
            return false;
        }
        if self.frame_limit.is_some_and(|limit| self.frames >= limit) {
            tracing::debug!(frames = self.frames, "Frame limit reached");
            self.closed = true;
            return false;
        }
        self.pacer.wait();
        self.frames += 1;
        true
    }

    fn backend(&mut self) -> &mut dyn Backend {
        &mut self.backend
    }

    fn finish_frame(&mut self) -> Result<()> {
        Ok(())
    }

    fn host_name(&self) -> &str {
        "headless"
    }
}
