//! 事件队列模块
//!
//! 每帧一次的按键事件快照。宿主在帧与帧之间把后端收集到的事件推入队列，
//! `begin_frame` 把它们变成本帧只读、可重复遍历的快照。
//!
//! # 语义
//!
//! - 事件按到达顺序排列
//! - `Press` / `Release` 是边沿触发（每次物理跳变恰好一个事件）
//! - `Repeat` 是按住按键时后端产生的独立动作，不是重复的 `Press`
//! - 快照以借用形式返回，无法跨帧持有
//!
//! # 使用示例
//!
//! ```
//! use autoviz::core::event::*;
//!
//! let mut queue = EventQueue::new();
//! queue.push(KeyEvent::new(KeyCode::K, KeyAction::Press, Modifiers::CONTROL));
//! queue.begin_frame();
//!
//! for e in queue.poll() {
//!     if e.key == KeyCode::K && e.action == KeyAction::Press && e.mods == Modifiers::CONTROL {
//!         println!("Ctrl+K");
//!     }
//! }
//! ```

use std::fmt;

/// 键盘按键
///
/// 覆盖常用按键，其余按键使用 `Other`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    A, B, C, D, E, F, G, H, I, J, K, L, M,
    N, O, P, Q, R, S, T, U, V, W, X, Y, Z,

    Num0, Num1, Num2, Num3, Num4, Num5, Num6, Num7, Num8, Num9,

    /// Escape 键
    ///
    /// 拖拽进行中按下时撤销本次拖拽
    Escape,
    Enter,
    Tab,
    Backspace,
    Space,
    Delete,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,

    F1, F2, F3, F4, F5, F6, F7, F8, F9, F10, F11, F12,

    /// 其他按键（平台相关键码）
    Other(u32),
}

/// 按键动作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAction {
    Press,
    Release,
    /// 按住不放时的自动重复
    Repeat,
}

bitflags::bitflags! {
    /// 修饰键位掩码
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u8 {
        const NONE    = 0;
        const SHIFT   = 1 << 0;
        const CONTROL = 1 << 1;
        const ALT     = 1 << 2;
        const SUPER   = 1 << 3;
    }
}

/// 按键事件（产生后不可变）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    pub key: KeyCode,
    pub action: KeyAction,
    pub mods: Modifiers,
}

impl KeyEvent {
    pub fn new(key: KeyCode, action: KeyAction, mods: Modifiers) -> Self {
        Self { key, action, mods }
    }

    pub fn press(key: KeyCode) -> Self {
        Self::new(key, KeyAction::Press, Modifiers::NONE)
    }

    pub fn release(key: KeyCode) -> Self {
        Self::new(key, KeyAction::Release, Modifiers::NONE)
    }
}

impl fmt::Display for KeyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.mods.is_empty() {
            write!(f, "{:?} {:?}", self.key, self.action)
        } else {
            bitflags::parser::to_writer(&self.mods, &mut *f)?;
            write!(f, "+{:?} {:?}", self.key, self.action)
        }
    }
}

/// 每帧按键事件队列
#[derive(Debug, Default)]
pub struct EventQueue {
    /// 帧之间到达、尚未交付的事件
    pending: Vec<KeyEvent>,
    /// 本帧快照
    frame: Vec<KeyEvent>,
    frame_index: u64,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// 后端推入一个事件（在帧与帧之间调用）
    pub fn push(&mut self, event: KeyEvent) {
        self.pending.push(event);
    }

    pub fn extend<I: IntoIterator<Item = KeyEvent>>(&mut self, events: I) {
        self.pending.extend(events);
    }

    /// 开始新的一帧：丢弃上一帧快照，交付待处理事件
    pub fn begin_frame(&mut self) {
        self.frame.clear();
        std::mem::swap(&mut self.frame, &mut self.pending);
        self.frame_index += 1;
    }

    /// 本帧的事件快照
    ///
    /// 可在同一帧内多次调用，每次得到相同的序列。
    pub fn poll(&self) -> &[KeyEvent] {
        &self.frame
    }

    /// 本帧是否按下了 `key`（修饰键完全匹配）
    pub fn pressed(&self, key: KeyCode, mods: Modifiers) -> bool {
        self.frame
            .iter()
            .any(|e| e.key == key && e.action == KeyAction::Press && e.mods == mods)
    }

    pub fn is_empty(&self) -> bool {
        self.frame.is_empty()
    }

    /// 已开始的帧数
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_is_restartable_and_ordered() {
        let mut queue = EventQueue::new();
        let events = [
            KeyEvent::new(KeyCode::K, KeyAction::Press, Modifiers::CONTROL),
            KeyEvent::release(KeyCode::K),
            KeyEvent::press(KeyCode::K),
        ];
        queue.extend(events);
        queue.begin_frame();

        let first: Vec<KeyEvent> = queue.poll().to_vec();
        let second: Vec<KeyEvent> = queue.poll().to_vec();
        assert_eq!(first, events.to_vec());
        assert_eq!(first, second);
        assert!(queue.pressed(KeyCode::K, Modifiers::CONTROL));
        assert!(queue.pressed(KeyCode::K, Modifiers::NONE));
    }

    #[test]
    fn test_frames_are_disjoint() {
        let mut queue = EventQueue::new();
        queue.push(KeyEvent::press(KeyCode::A));
        queue.begin_frame();
        assert_eq!(queue.poll().len(), 1);

        // 帧内到达的事件属于下一帧
        queue.push(KeyEvent::press(KeyCode::B));
        assert_eq!(queue.poll(), &[KeyEvent::press(KeyCode::A)]);

        queue.begin_frame();
        assert_eq!(queue.poll(), &[KeyEvent::press(KeyCode::B)]);

        queue.begin_frame();
        assert!(queue.is_empty());
        assert_eq!(queue.frame_index(), 3);
    }

    #[test]
    fn test_repeat_is_not_press() {
        let mut queue = EventQueue::new();
        queue.push(KeyEvent::new(KeyCode::Space, KeyAction::Repeat, Modifiers::NONE));
        queue.begin_frame();
        assert!(!queue.pressed(KeyCode::Space, Modifiers::NONE));
    }

    #[test]
    fn test_display() {
        let e = KeyEvent::new(KeyCode::K, KeyAction::Press, Modifiers::CONTROL);
        assert_eq!(e.to_string(), "CONTROL+K Press");
    }
}
