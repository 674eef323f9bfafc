//! 帧统计
//!
//! FrameStats 跟踪帧率和帧时间，驱动器每帧记录一次，
//! 后端可以把它显示在调试窗口里。

use std::time::{Duration, Instant};

/// 帧统计（帧率、帧时间、总帧数）
#[derive(Debug, Clone)]
pub struct FrameStats {
    frames_in_window: u32,
    total_frames: u64,
    last_update: Instant,
    fps: f32,
    frame_time_ms: f32,
}

impl FrameStats {
    pub fn new() -> Self {
        Self {
            frames_in_window: 0,
            total_frames: 0,
            last_update: Instant::now(),
            fps: 0.0,
            frame_time_ms: 0.0,
        }
    }

    /// 记录一帧
    pub fn record_frame(&mut self) {
        self.record_frame_at(Instant::now());
    }

    fn record_frame_at(&mut self, now: Instant) {
        self.frames_in_window += 1;
        self.total_frames += 1;
        let elapsed = now.duration_since(self.last_update);

        // 每秒更新一次 FPS
        if elapsed >= Duration::from_secs(1) {
            self.fps = self.frames_in_window as f32 / elapsed.as_secs_f32();
            self.frame_time_ms = 1000.0 / self.fps;
            self.frames_in_window = 0;
            self.last_update = now;
        }
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }

    pub fn frame_time_ms(&self) -> f32 {
        self.frame_time_ms
    }

    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }
}

impl Default for FrameStats {
    fn default() -> Self {
        Self::new()
    }
}
