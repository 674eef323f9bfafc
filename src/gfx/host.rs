//! 帧宿主的统一抽象接口
//!
//! 宿主拥有窗口（或者没有窗口）和即时模式后端，负责帧节奏：
//! 驱动器在 `wait_frame` 里阻塞到下一帧，帧内只通过 `backend()` 调用控件，
//! 帧末由 `finish_frame` 呈现。

use std::time::{Duration, Instant};

use crate::core::error::Result;
use crate::gui::Backend;

/// 帧宿主的统一接口
pub trait FrameHost {
    /// 阻塞到下一帧
    ///
    /// 返回 `false` 表示宿主正在关闭。
    fn wait_frame(&mut self) -> bool;

    /// 本帧使用的后端
    fn backend(&mut self) -> &mut dyn Backend;

    /// 呈现本帧
    fn finish_frame(&mut self) -> Result<()>;

    /// 宿主名称，用于日志
    fn host_name(&self) -> &str;
}

impl FrameHost for Box<dyn FrameHost> {
    fn wait_frame(&mut self) -> bool {
        (**self).wait_frame()
    }

    fn backend(&mut self) -> &mut dyn Backend {
        (**self).backend()
    }

    fn finish_frame(&mut self) -> Result<()> {
        (**self).finish_frame()
    }

    fn host_name(&self) -> &str {
        (**self).host_name()
    }
}

/// 两帧之间的最短间隔（没有垂直同步时使用）
#[derive(Debug, Clone)]
pub struct FramePacer {
    min_interval: Duration,
    last: Option<Instant>,
}

impl FramePacer {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last: None,
        }
    }

    pub fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }

    /// 睡眠到距上一帧至少 `min_interval`
    pub fn wait(&mut self) {
        if self.min_interval.is_zero() {
            return;
        }
        if let Some(last) = self.last {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                std::thread::sleep(self.min_interval - elapsed);
            }
        }
        self.last = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pacer_enforces_interval() {
        let mut pacer = FramePacer::from_millis(15);
        let start = Instant::now();
        pacer.wait();
        pacer.wait();
        pacer.wait();
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_zero_interval_never_sleeps() {
        let mut pacer = FramePacer::from_millis(0);
        let start = Instant::now();
        for _ in 0..100 {
            pacer.wait();
        }
        assert!(start.elapsed() < Duration::from_millis(50));
    }
}
