//! 布局文件的文本格式
//!
//! ```text
//! ; 注释
//! [Window][root##Style]
//! Pos=60,60
//! Size=400,300
//! ```
//!
//! 节头固定为 `[类型][身份]`，节内是 `key=value` 行。

use std::collections::BTreeMap;
use std::path::Path;

use crate::core::error::PersistenceError;

/// 节的键：(区域类型, 身份)
pub type SectionKey = (String, String);

/// 一个布局文件的全部内容
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayoutBlob {
    sections: BTreeMap<SectionKey, BTreeMap<String, String>>,
}

impl LayoutBlob {
    pub fn new() -> Self {
        Self::default()
    }

    /// 解析文本
    ///
    /// `origin` 只用于错误信息。
    pub fn parse(text: &str, origin: &Path) -> Result<Self, PersistenceError> {
        let mut blob = Self::new();
        let mut current: Option<SectionKey> = None;

        for (number, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with(';') {
                continue;
            }

            let corrupt = |reason: &str| PersistenceError::Corrupt {
                path: origin.to_path_buf(),
                line: number + 1,
                reason: reason.to_string(),
            };

            if line.starts_with('[') {
                let key = parse_header(line).ok_or_else(|| corrupt("malformed section header"))?;
                blob.sections.entry(key.clone()).or_default();
                current = Some(key);
                continue;
            }

            let (key, value) = line
                .split_once('=')
                .ok_or_else(|| corrupt("expected key=value"))?;
            let section = current
                .as_ref()
                .ok_or_else(|| corrupt("key=value outside of a section"))?;
            blob.set(&section.0, &section.1, key.trim(), value.trim());
        }

        Ok(blob)
    }

    /// 序列化为文本，节之间空一行
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        for ((kind, identity), entries) in &self.sections {
            out.push_str(&format!("[{}][{}]\n", kind, identity));
            for (key, value) in entries {
                out.push_str(&format!("{}={}\n", key, value));
            }
            out.push('\n');
        }
        out
    }

    pub fn get(&self, kind: &str, identity: &str, key: &str) -> Option<&str> {
        self.section(kind, identity)?.get(key).map(String::as_str)
    }

    pub fn section(&self, kind: &str, identity: &str) -> Option<&BTreeMap<String, String>> {
        self.sections
            .get(&(kind.to_string(), identity.to_string()))
    }

    /// 写入一个值，返回值是否发生了变化
    pub fn set(&mut self, kind: &str, identity: &str, key: &str, value: &str) -> bool {
        let section = self
            .sections
            .entry((kind.to_string(), identity.to_string()))
            .or_default();
        match section.get(key) {
            Some(old) if old == value => false,
            _ => {
                section.insert(key.to_string(), value.to_string());
                true
            }
        }
    }

    /// 合并另一份内容，冲突时 `other` 的值生效
    pub fn merge(&mut self, other: &LayoutBlob) {
        for ((kind, identity), entries) in &other.sections {
            let section = self
                .sections
                .entry((kind.clone(), identity.clone()))
                .or_default();
            for (key, value) in entries {
                section.insert(key.clone(), value.clone());
            }
        }
    }

    pub fn sections(&self) -> impl Iterator<Item = (&SectionKey, &BTreeMap<String, String>)> {
        self.sections.iter()
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

fn parse_header(line: &str) -> Option<SectionKey> {
    let inner = line.strip_prefix('[')?.strip_suffix(']')?;
    let (kind, identity) = inner.split_once("][")?;
    if kind.is_empty() || identity.is_empty() {
        return None;
    }
    Some((kind.to_string(), identity.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sections() {
        let text = "; layout\n[Window][Debug##Default]\nPos=60,60\nSize = 400,400\n\n[Plot][root##plot]\nLimits=0,1,-1,1\n";
        let blob = LayoutBlob::parse(text, Path::new("test.ini")).unwrap();
        assert_eq!(blob.len(), 2);
        assert_eq!(blob.get("Window", "Debug##Default", "Size"), Some("400,400"));
        assert_eq!(blob.get("Plot", "root##plot", "Limits"), Some("0,1,-1,1"));
        assert_eq!(blob.get("Plot", "root##plot", "Pos"), None);
    }

    #[test]
    fn test_corrupt_lines() {
        let err = LayoutBlob::parse("[Window][a]\nnot a pair\n", Path::new("x.ini")).unwrap_err();
        assert!(matches!(err, PersistenceError::Corrupt { line: 2, .. }));

        assert!(LayoutBlob::parse("Pos=1,2\n", Path::new("x.ini")).is_err());
        assert!(LayoutBlob::parse("[Window]\n", Path::new("x.ini")).is_err());
    }

    #[test]
    fn test_merge_other_wins() {
        let mut base = LayoutBlob::new();
        base.set("Window", "a", "Pos", "0,0");
        base.set("Window", "a", "Size", "10,10");
        let mut disk = LayoutBlob::new();
        disk.set("Window", "a", "Pos", "5,5");
        disk.set("Window", "b", "Size", "1,1");
        base.merge(&disk);
        assert_eq!(base.get("Window", "a", "Pos"), Some("5,5"));
        assert_eq!(base.get("Window", "a", "Size"), Some("10,10"));
        assert_eq!(base.get("Window", "b", "Size"), Some("1,1"));
    }

    #[test]
    fn test_serialize_parses_back() {
        let mut blob = LayoutBlob::new();
        assert!(blob.set("Window", "root##Style", "Pos", "12,30"));
        assert!(!blob.set("Window", "root##Style", "Pos", "12,30"));
        blob.set("Tree", "root.items", "Open", "1");
        let text = blob.serialize();
        assert!(text.starts_with("[Tree][root.items]\nOpen=1\n"));
        assert_eq!(LayoutBlob::parse(&text, Path::new("x.ini")).unwrap(), blob);
    }
}
