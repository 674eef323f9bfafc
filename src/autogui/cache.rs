//! 控件状态缓存
//!
//! 即时模式下没有持久的控件对象，展开状态、文本编辑缓冲、拖拽起点等瞬时状态
//! 保存在这里，以 `(WidgetPath, WidgetKind)` 为键。
//!
//! # 生命周期
//!
//! - 首次访问时惰性创建
//! - 跨帧保留
//! - 超过 `eviction_frames` 帧未被访问后在帧末淘汰
//!
//! 序列发生结构性编辑后，被移动的下标对应的条目整体失效，
//! 新占据该下标的元素得到默认状态，而不是继承旧元素的状态。

use std::collections::{HashMap, HashSet};

use crate::autogui::path::WidgetPath;
use crate::core::error::{ProtocolViolation, Result};

/// 控件种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WidgetKind {
    /// 可折叠节点
    Tree,
    /// 文本输入
    TextEdit,
    /// 数值拖拽
    Drag,
}

/// 控件瞬时状态
#[derive(Debug, Clone, PartialEq)]
pub enum WidgetState {
    Tree { open: bool },
    TextEdit { buffer: String, editing: bool },
    Drag { active: bool, origin: f64 },
}

impl WidgetState {
    fn empty(kind: WidgetKind) -> Self {
        match kind {
            WidgetKind::Tree => WidgetState::Tree { open: false },
            WidgetKind::TextEdit => WidgetState::TextEdit {
                buffer: String::new(),
                editing: false,
            },
            WidgetKind::Drag => WidgetState::Drag {
                active: false,
                origin: 0.0,
            },
        }
    }
}

/// 缓存条目
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub state: WidgetState,
    /// 本条目是否在本帧刚刚创建
    pub fresh: bool,
}

/// 同一路径下各种控件的状态
#[derive(Debug, Default)]
struct Slot {
    last_visited: u64,
    states: HashMap<WidgetKind, CacheEntry>,
}

/// 进程级控件状态缓存
#[derive(Debug)]
pub struct WidgetStateCache {
    slots: HashMap<WidgetPath, Slot>,
    /// 本帧访问过的后端 ID；段序列不同但 ID 相同也算重复
    visited: HashSet<String>,
    frame: u64,
    eviction_frames: u64,
}

impl WidgetStateCache {
    /// 创建缓存
    ///
    /// `eviction_frames` 小于 1 时按 1 处理。
    pub fn new(eviction_frames: u64) -> Self {
        Self {
            slots: HashMap::new(),
            visited: HashSet::new(),
            frame: 0,
            eviction_frames: eviction_frames.max(1),
        }
    }

    pub fn eviction_frames(&self) -> u64 {
        self.eviction_frames
    }

    /// 开始新的一帧
    pub fn begin_frame(&mut self, frame: u64) {
        self.frame = frame;
        self.visited.clear();
        for entry in self.slots.values_mut().flat_map(|slot| slot.states.values_mut()) {
            entry.fresh = false;
        }
    }

    /// 记录本帧访问了 `path`
    ///
    /// 同一帧内重复访问同一路径意味着两个控件身份冲突。
    pub fn mark_visited(&mut self, path: &WidgetPath) -> Result<()> {
        if !self.visited.insert(path.id()) {
            return Err(ProtocolViolation::DuplicatePath(path.clone()).into());
        }
        if let Some(slot) = self.slots.get_mut(path) {
            slot.last_visited = self.frame;
        }
        Ok(())
    }

    /// 获取条目，不存在时创建空条目
    pub fn get_or_create(&mut self, path: &WidgetPath, kind: WidgetKind) -> &mut CacheEntry {
        let frame = self.frame;
        let slot = self.slots.entry(path.clone()).or_default();
        slot.last_visited = frame;
        slot.states.entry(kind).or_insert_with(|| CacheEntry {
            state: WidgetState::empty(kind),
            fresh: true,
        })
    }

    pub fn get(&self, path: &WidgetPath, kind: WidgetKind) -> Option<&CacheEntry> {
        self.slots.get(path)?.states.get(&kind)
    }

    pub fn contains(&self, path: &WidgetPath, kind: WidgetKind) -> bool {
        self.get(path, kind).is_some()
    }

    /// 序列结构性编辑后，丢弃下标不小于 `first_index` 的所有子条目
    pub fn invalidate_from(&mut self, sequence: &WidgetPath, first_index: usize) {
        let before = self.slots.len();
        self.slots.retain(|path, _| match path.index_after(sequence) {
            Some(i) => i < first_index,
            None => true,
        });
        let dropped = before - self.slots.len();
        if dropped > 0 {
            crate::autogui_debug!(path = %sequence, first_index, dropped, "Invalidated shifted cache entries");
        }
    }

    /// 结束本帧，淘汰过期条目
    ///
    /// 连续 `eviction_frames` 帧未访问的条目仍然保留，
    /// 再多错过一帧就在那一帧的末尾被淘汰。
    pub fn end_frame(&mut self) {
        let frame = self.frame;
        let horizon = self.eviction_frames;
        self.slots
            .retain(|_, slot| frame.saturating_sub(slot.last_visited) <= horizon);
    }

    /// 条目总数
    pub fn len(&self) -> usize {
        self.slots.values().map(|slot| slot.states.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.visited.clear();
    }
}

impl Default for WidgetStateCache {
    fn default() -> Self {
        Self::new(3)
    }
}
