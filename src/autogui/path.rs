//! 控件路径
//!
//! `WidgetPath` 是值在对象图中的遍历路径（字段名 / 下标 / 显式标签），
//! 同时作为控件状态缓存的键和后端的 ID 作用域。
//! 对于未改变的对象，同一字段每帧得到的路径完全相同。

use std::fmt;

/// 路径段
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathSegment {
    /// 结构体字段名
    Field(String),
    /// 序列下标
    Index(usize),
    /// 显式标签（用于消除同名冲突，或映射的键）
    Label(String),
}

/// 控件路径
///
/// 两个路径相等当且仅当它们的段序列相等。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct WidgetPath {
    segments: Vec<PathSegment>,
}

impl WidgetPath {
    /// 根路径
    pub fn root(name: impl Into<String>) -> Self {
        Self {
            segments: vec![PathSegment::Label(name.into())],
        }
    }

    /// 空路径（上下文栈为空时的前缀）
    pub fn empty() -> Self {
        Self::default()
    }

    fn child(&self, segment: PathSegment) -> Self {
        let mut segments = Vec::with_capacity(self.segments.len() + 1);
        segments.extend_from_slice(&self.segments);
        segments.push(segment);
        Self { segments }
    }

    /// 追加字段段
    pub fn field(&self, name: impl Into<String>) -> Self {
        self.child(PathSegment::Field(name.into()))
    }

    /// 追加下标段
    pub fn index(&self, index: usize) -> Self {
        self.child(PathSegment::Index(index))
    }

    /// 追加标签段
    pub fn label(&self, label: impl Into<String>) -> Self {
        self.child(PathSegment::Label(label.into()))
    }

    /// 父路径，根路径返回 `None`
    pub fn parent(&self) -> Option<Self> {
        if self.segments.is_empty() {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn last(&self) -> Option<&PathSegment> {
        self.segments.last()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// `prefix` 是否为本路径的前缀（包括相等）
    pub fn starts_with(&self, prefix: &WidgetPath) -> bool {
        self.segments.starts_with(&prefix.segments)
    }

    /// 紧跟在 `prefix` 之后的下标段
    pub fn index_after(&self, prefix: &WidgetPath) -> Option<usize> {
        if !self.starts_with(prefix) {
            return None;
        }
        match self.segments.get(prefix.segments.len()) {
            Some(PathSegment::Index(i)) => Some(*i),
            _ => None,
        }
    }

    /// 后端使用的稳定 ID 字符串
    ///
    /// 与 `Display` 相同，但字段名和标签里的 `.`、`[`、`]`、`\` 会被转义，
    /// 映射键 `"a.name"` 与字段路径 `a.name` 得到不同的 ID。
    /// 标签里的 `##` 保留原样。
    pub fn id(&self) -> String {
        let mut id = String::new();
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                PathSegment::Field(name) => {
                    if i > 0 {
                        id.push('.');
                    }
                    push_escaped(&mut id, name);
                }
                PathSegment::Index(index) => {
                    id.push('[');
                    id.push_str(&index.to_string());
                    id.push(']');
                }
                PathSegment::Label(label) => {
                    if i > 0 {
                        id.push_str("##");
                    }
                    push_escaped(&mut id, label);
                }
            }
        }
        id
    }

    /// 可见标题：最后一段去掉 `##` 之后的部分
    pub fn caption(&self) -> String {
        match self.segments.last() {
            Some(PathSegment::Field(name)) => name.clone(),
            Some(PathSegment::Index(i)) => i.to_string(),
            Some(PathSegment::Label(label)) => split_label(label).0.to_string(),
            None => String::new(),
        }
    }
}

fn push_escaped(out: &mut String, text: &str) {
    for c in text.chars() {
        if matches!(c, '.' | '[' | ']' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
}

/// 按即时模式约定拆分 `"caption##id"`
pub fn split_label(label: &str) -> (&str, &str) {
    match label.find("##") {
        Some(pos) => (&label[..pos], &label[pos + 2..]),
        None => (label, label),
    }
}

impl fmt::Display for WidgetPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                PathSegment::Field(name) => {
                    if i > 0 {
                        write!(f, ".")?;
                    }
                    write!(f, "{}", name)?;
                }
                PathSegment::Index(index) => write!(f, "[{}]", index)?,
                PathSegment::Label(label) => {
                    if i > 0 {
                        write!(f, "##")?;
                    }
                    write!(f, "{}", label)?;
                }
            }
        }
        Ok(())
    }
}
