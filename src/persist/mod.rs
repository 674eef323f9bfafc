//! 布局持久化
//!
//! 进程启动时加载布局文件，与内置默认布局合并（磁盘上的值优先），
//! 由帧循环驱动器按固定节奏或在退出时写回。
//! 布局文件以入口程序的身份命名，不同程序互不干扰。
//!
//! 持久化失败从不致命：读失败退回默认布局，写失败记录警告并在下次刷写时重试。

pub mod ini;

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::autogui::RegionKind;
use crate::core::error::{PersistenceError, Result};
use crate::core::runtime::ProgramIdentity;

pub use ini::LayoutBlob;

/// 内置默认布局
pub const DEFAULT_LAYOUT: &str = "\
[Window][Debug##Default]
Pos=60,60
Size=400,400
";

/// 布局文件扩展名
pub const LAYOUT_SUFFIX: &str = "autoviz.ini";

/// 一个区域的几何信息
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RegionLayout {
    pub pos: Option<[f32; 2]>,
    pub size: Option<[f32; 2]>,
    /// 坐标轴范围 `[x0, x1, y0, y1]`
    pub limits: Option<[f64; 4]>,
    /// 折叠节点是否展开
    pub open: Option<bool>,
}

impl RegionLayout {
    pub fn is_empty(&self) -> bool {
        self.pos.is_none() && self.size.is_none() && self.limits.is_none() && self.open.is_none()
    }

    fn from_blob(blob: &LayoutBlob, kind: RegionKind, identity: &str) -> Option<Self> {
        let section = blob.section(kind.section(), identity)?;
        let layout = RegionLayout {
            pos: section.get("Pos").and_then(|v| parse_array(v)),
            size: section.get("Size").and_then(|v| parse_array(v)),
            limits: section.get("Limits").and_then(|v| parse_array(v)),
            open: section.get("Open").and_then(|v| match v.as_str() {
                "1" => Some(true),
                "0" => Some(false),
                _ => None,
            }),
        };
        (!layout.is_empty()).then_some(layout)
    }

    /// 写入 `blob`，返回是否有值发生变化
    fn write_into(&self, blob: &mut LayoutBlob, kind: RegionKind, identity: &str) -> bool {
        let section = kind.section();
        let mut changed = false;
        if let Some(pos) = self.pos {
            changed |= blob.set(section, identity, "Pos", &join(pos.map(f32::round).as_slice()));
        }
        if let Some(size) = self.size {
            changed |= blob.set(section, identity, "Size", &join(size.map(f32::round).as_slice()));
        }
        if let Some(limits) = self.limits {
            changed |= blob.set(section, identity, "Limits", &join(limits.as_slice()));
        }
        if let Some(open) = self.open {
            changed |= blob.set(section, identity, "Open", if open { "1" } else { "0" });
        }
        changed
    }
}

fn parse_array<T: std::str::FromStr + Copy + Default, const N: usize>(value: &str) -> Option<[T; N]> {
    let mut out = [T::default(); N];
    let mut parts = value.split(',');
    for slot in out.iter_mut() {
        *slot = parts.next()?.trim().parse().ok()?;
    }
    if parts.next().is_some() {
        return None;
    }
    Some(out)
}

fn join<T: std::fmt::Display>(values: &[T]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// 由入口程序身份得到布局文件路径：`<目录>/.<程序名>.autoviz.ini`
///
/// `directory` 为空时使用程序所在目录。
pub fn owner_path(identity: &ProgramIdentity, directory: Option<&Path>) -> PathBuf {
    let directory = directory
        .map(Path::to_path_buf)
        .unwrap_or_else(|| identity.directory());
    directory.join(format!(".{}.{}", identity.stem(), LAYOUT_SUFFIX))
}

/// 内置默认布局
pub fn default_blob() -> LayoutBlob {
    LayoutBlob::parse(DEFAULT_LAYOUT, Path::new("<builtin>")).unwrap_or_default()
}

/// 进程级布局存储
#[derive(Debug)]
pub struct LayoutStore {
    owner: Option<PathBuf>,
    blob: LayoutBlob,
    dirty: bool,
}

impl LayoutStore {
    /// 只在内存中工作的存储（持久化关闭时使用）
    pub fn in_memory() -> Self {
        Self {
            owner: None,
            blob: default_blob(),
            dirty: false,
        }
    }

    /// 加载布局：默认布局与磁盘内容合并
    ///
    /// 文件不存在时静默使用默认布局，损坏时记录警告。
    pub fn load(owner: impl Into<PathBuf>) -> Self {
        let owner = owner.into();
        let mut blob = default_blob();
        match read_blob(&owner) {
            Ok(Some(disk)) => {
                tracing::debug!(path = %owner.display(), sections = disk.len(), "Layout loaded");
                blob.merge(&disk);
            }
            Ok(None) => {
                tracing::debug!(path = %owner.display(), "No layout file, using defaults");
            }
            Err(e) => {
                crate::persist_warn!(error = %e, "Layout unreadable, using defaults");
            }
        }
        Self {
            owner: Some(owner),
            blob,
            dirty: false,
        }
    }

    pub fn owner(&self) -> Option<&Path> {
        self.owner.as_deref()
    }

    pub fn blob(&self) -> &LayoutBlob {
        &self.blob
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// 读取一个区域的布局
    pub fn region(&self, kind: RegionKind, identity: &str) -> Option<RegionLayout> {
        RegionLayout::from_blob(&self.blob, kind, identity)
    }

    /// 更新一个区域的布局
    pub fn update(&mut self, kind: RegionKind, identity: &str, layout: &RegionLayout) {
        if layout.write_into(&mut self.blob, kind, identity) {
            self.dirty = true;
        }
    }

    /// 原子写回（临时文件 + 重命名）
    ///
    /// 失败时保持脏标记，下次刷写重试。
    pub fn save(&mut self) -> Result<()> {
        let Some(owner) = self.owner.clone() else {
            self.dirty = false;
            return Ok(());
        };
        write_atomic(&owner, &self.blob.serialize())?;
        self.dirty = false;
        tracing::debug!(path = %owner.display(), "Layout saved");
        Ok(())
    }

    /// 有修改时写回，失败只记录警告
    pub fn flush(&mut self) -> bool {
        if !self.dirty {
            return true;
        }
        match self.save() {
            Ok(()) => true,
            Err(e) => {
                crate::persist_warn!(error = %e, "Layout save failed, will retry");
                false
            }
        }
    }
}

fn read_blob(path: &Path) -> std::result::Result<Option<LayoutBlob>, PersistenceError> {
    match fs::read_to_string(path) {
        Ok(text) => LayoutBlob::parse(&text, path).map(Some),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(PersistenceError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn write_atomic(path: &Path, contents: &str) -> std::result::Result<(), PersistenceError> {
    let write_err = |source| PersistenceError::Write {
        path: path.to_path_buf(),
        source,
    };
    let tmp = path.with_extension("ini.tmp");
    let mut file = fs::File::create(&tmp).map_err(write_err)?;
    file.write_all(contents.as_bytes()).map_err(write_err)?;
    file.sync_all().map_err(write_err)?;
    drop(file);
    fs::rename(&tmp, path).map_err(write_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_owner(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("autoviz-persist-{}-{}", name, std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(format!(".{}.{}", name, LAYOUT_SUFFIX));
        let _ = fs::remove_file(&path);
        path
    }

    #[test]
    fn test_owner_path() {
        let id = ProgramIdentity::from_path("/nonexistent/bin/sim.exe");
        assert_eq!(
            owner_path(&id, None),
            PathBuf::from("/nonexistent/bin/.sim.autoviz.ini")
        );
        assert_eq!(
            owner_path(&id, Some(Path::new("/tmp/layouts"))),
            PathBuf::from("/tmp/layouts/.sim.autoviz.ini")
        );
    }

    #[test]
    fn test_missing_file_then_save_and_reload() {
        let owner = temp_owner("missing");

        let mut store = LayoutStore::load(&owner);
        assert_eq!(store.blob(), &default_blob());
        assert!(!store.is_dirty());

        let moved = RegionLayout {
            pos: Some([200.0, 120.0]),
            size: Some([640.0, 480.0]),
            ..Default::default()
        };
        store.update(RegionKind::Window, "Debug##Default", &moved);
        store.update(
            RegionKind::Plot,
            "root##plot",
            &RegionLayout { limits: Some([0.0, 10.0, -1.0, 1.0]), ..Default::default() },
        );
        assert!(store.is_dirty());
        store.save().unwrap();
        assert!(!store.is_dirty());

        let reloaded = LayoutStore::load(&owner);
        assert_eq!(reloaded.region(RegionKind::Window, "Debug##Default"), Some(moved));
        assert_eq!(
            reloaded.region(RegionKind::Plot, "root##plot").and_then(|l| l.limits),
            Some([0.0, 10.0, -1.0, 1.0])
        );
        assert!(!owner.with_extension("ini.tmp").exists());
    }

    #[test]
    fn test_corrupt_file_falls_back_to_defaults() {
        let owner = temp_owner("corrupt");
        fs::write(&owner, "this is not a layout\n").unwrap();
        let store = LayoutStore::load(&owner);
        assert_eq!(store.blob(), &default_blob());
    }

    #[test]
    fn test_disk_values_win() {
        let owner = temp_owner("wins");
        fs::write(&owner, "[Window][Debug##Default]\nPos=5,6\n").unwrap();
        let store = LayoutStore::load(&owner);
        let layout = store.region(RegionKind::Window, "Debug##Default").unwrap();
        assert_eq!(layout.pos, Some([5.0, 6.0]));
        assert_eq!(layout.size, Some([400.0, 400.0]));
    }

    #[test]
    fn test_failed_save_retried_on_next_flush() {
        let dir = std::env::temp_dir().join(format!("autoviz-persist-missing-dir-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        let owner = dir.join(".x.autoviz.ini");
        let mut store = LayoutStore::load(&owner);
        store.update(RegionKind::Window, "w", &RegionLayout { pos: Some([1.0, 1.0]), ..Default::default() });
        assert!(!store.flush());
        assert!(store.is_dirty());

        fs::create_dir_all(&dir).unwrap();
        assert!(store.flush());
        assert!(!store.is_dirty());
        assert!(owner.exists());
        let reloaded = LayoutStore::load(&owner);
        assert_eq!(reloaded.region(RegionKind::Window, "w").and_then(|l| l.pos), Some([1.0, 1.0]));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_unchanged_update_is_clean() {
        let mut store = LayoutStore::in_memory();
        store.update(
            RegionKind::Window,
            "Debug##Default",
            &RegionLayout { pos: Some([60.0, 60.0]), ..Default::default() },
        );
        assert!(!store.is_dirty());
        store.update(RegionKind::Tree, "root.items", &RegionLayout { open: Some(true), ..Default::default() });
        assert!(store.is_dirty());
        assert!(store.flush());
        assert_eq!(store.region(RegionKind::Tree, "root.items").and_then(|l| l.open), Some(true));
    }
}
