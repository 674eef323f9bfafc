//! 类型能力探测
//!
//! 任意应用类型通过实现 `Reflect` 把自己归入一个封闭的结构形状集合
//! （基本值 / 复合 / 序列 / 映射 / 自定义 / 不透明）。
//! 分发器每帧重新调用 `node()`，分类结果从不缓存。
//!
//! # 注册结构体
//!
//! ```
//! use autoviz::autogui_struct;
//!
//! #[derive(Default)]
//! struct Particle {
//!     pos: [f32; 2],
//!     mass: f64,
//!     name: String,
//! }
//!
//! autogui_struct!(Particle {
//!     pos,
//!     mass: { min: 0.0, max: 10.0, format: "%.2f kg" },
//!     name,
//! });
//! ```

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt::{Debug, Display};

use crate::autogui::dispatch::Ui;
use crate::autogui::options::FieldOptions;
use crate::autogui::path::WidgetPath;
use crate::core::error::Result;

/// 值的结构分类
pub enum Node<'a> {
    Bool(&'a mut bool),
    Int(&'a mut dyn IntValue),
    Float(&'a mut dyn FloatValue),
    Text(&'a mut String),
    /// 定长数值向量
    Vector(&'a mut dyn VectorValue),
    Composite(&'a mut dyn Composite),
    Sequence(&'a mut dyn Sequence),
    Mapping(&'a mut dyn Mapping),
    /// 值自己负责渲染
    Custom(&'a mut dyn CustomRender),
    /// 无法分类，只读文本显示
    Opaque(String),
}

impl Node<'_> {
    /// 分类名，用于诊断日志
    pub fn shape(&self) -> &'static str {
        match self {
            Node::Bool(_) => "bool",
            Node::Int(_) => "int",
            Node::Float(_) => "float",
            Node::Text(_) => "text",
            Node::Vector(_) => "vector",
            Node::Composite(_) => "composite",
            Node::Sequence(_) => "sequence",
            Node::Mapping(_) => "mapping",
            Node::Custom(_) => "custom",
            Node::Opaque(_) => "opaque",
        }
    }
}

/// 能被自动渲染的值
pub trait Reflect {
    fn node(&mut self) -> Node<'_>;
}

/// 整数值
///
/// 统一用 `i128` 读写，`i64`/`u64` 的全部取值都能无损往返。
pub trait IntValue {
    fn get(&self) -> i128;
    fn set(&mut self, value: i128);
    /// 类型本身的取值范围
    fn limits(&self) -> (i128, i128);
}

/// 浮点值
pub trait FloatValue {
    fn get(&self) -> f64;
    fn set(&mut self, value: f64);
}

/// 定长数值向量
pub trait VectorValue {
    fn components(&self) -> Vec<f64>;
    fn set_components(&mut self, values: &[f64]);
    fn is_integer(&self) -> bool;
}

/// 复合值的一个字段
pub struct Field<'a> {
    pub name: &'static str,
    pub value: &'a mut dyn Reflect,
    pub options: FieldOptions,
}

/// 具名字段的复合值，字段按声明顺序给出
pub trait Composite {
    fn type_name(&self) -> &'static str;
    fn fields(&mut self) -> Vec<Field<'_>>;
}

/// 可按下标访问的有序序列
pub trait Sequence {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn item(&mut self, index: usize) -> Option<&mut dyn Reflect>;

    /// 是否支持插入和删除
    fn resizable(&self) -> bool {
        false
    }

    fn remove(&mut self, _index: usize) {}

    /// 在 `index` 处插入默认值
    fn insert_default(&mut self, _index: usize) {}
}

/// 键唯一的映射；键在遍历中只读
pub trait Mapping {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 按稳定顺序给出 `(键文本, 值)`
    fn entries(&mut self) -> Vec<(String, &mut dyn Reflect)>;
}

/// 自定义渲染钩子
///
/// 实现者完全负责自己的控件输出，可以通过 `ui.render_field` 回到分发器。
/// 返回的错误不会被分发器捕获。
pub trait CustomRender {
    fn render(&mut self, ui: &mut Ui<'_>, path: &WidgetPath, options: &FieldOptions) -> Result<()>;
}

/// 只读显示 `Debug` 文本的包装
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Opaque<T>(pub T);

impl<T: Debug> Reflect for Opaque<T> {
    fn node(&mut self) -> Node<'_> {
        Node::Opaque(format!("{:?}", self.0))
    }
}

impl Reflect for bool {
    fn node(&mut self) -> Node<'_> {
        Node::Bool(self)
    }
}

impl Reflect for String {
    fn node(&mut self) -> Node<'_> {
        Node::Text(self)
    }
}

macro_rules! impl_int {
    ($($ty:ty),*) => {$(
        impl IntValue for $ty {
            fn get(&self) -> i128 {
                *self as i128
            }

            fn set(&mut self, value: i128) {
                let (lo, hi) = self.limits();
                *self = value.clamp(lo, hi) as $ty;
            }

            fn limits(&self) -> (i128, i128) {
                (<$ty>::MIN as i128, <$ty>::MAX as i128)
            }
        }

        impl Reflect for $ty {
            fn node(&mut self) -> Node<'_> {
                Node::Int(self)
            }
        }
    )*};
}

impl_int!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

macro_rules! impl_float {
    ($($ty:ty),*) => {$(
        impl FloatValue for $ty {
            fn get(&self) -> f64 {
                *self as f64
            }

            fn set(&mut self, value: f64) {
                *self = value as $ty;
            }
        }

        impl Reflect for $ty {
            fn node(&mut self) -> Node<'_> {
                Node::Float(self)
            }
        }
    )*};
}

impl_float!(f32, f64);

macro_rules! impl_vector {
    ($integer:expr; $($ty:ty),*) => {$(
        impl<const N: usize> VectorValue for [$ty; N] {
            fn components(&self) -> Vec<f64> {
                self.iter().map(|v| *v as f64).collect()
            }

            fn set_components(&mut self, values: &[f64]) {
                // 未改动的分量保持原值，宽整数不经过浮点往返
                for (slot, value) in self.iter_mut().zip(values) {
                    if *slot as f64 != *value {
                        *slot = *value as $ty;
                    }
                }
            }

            fn is_integer(&self) -> bool {
                $integer
            }
        }

        impl<const N: usize> Reflect for [$ty; N] {
            fn node(&mut self) -> Node<'_> {
                Node::Vector(self)
            }
        }
    )*};
}

impl_vector!(false; f32, f64);
impl_vector!(true; i32, i64);

impl<T: Reflect> Reflect for Option<T> {
    fn node(&mut self) -> Node<'_> {
        match self {
            Some(value) => value.node(),
            None => Node::Opaque("None".to_string()),
        }
    }
}

impl<T: Reflect + Default> Sequence for Vec<T> {
    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn item(&mut self, index: usize) -> Option<&mut dyn Reflect> {
        self.get_mut(index).map(|v| v as &mut dyn Reflect)
    }

    fn resizable(&self) -> bool {
        true
    }

    fn remove(&mut self, index: usize) {
        if index < Vec::len(self) {
            Vec::remove(self, index);
        }
    }

    fn insert_default(&mut self, index: usize) {
        let index = index.min(Vec::len(self));
        Vec::insert(self, index, T::default());
    }
}

impl<T: Reflect + Default> Reflect for Vec<T> {
    fn node(&mut self) -> Node<'_> {
        Node::Sequence(self)
    }
}

impl<T: Reflect + Default> Sequence for VecDeque<T> {
    fn len(&self) -> usize {
        VecDeque::len(self)
    }

    fn item(&mut self, index: usize) -> Option<&mut dyn Reflect> {
        self.get_mut(index).map(|v| v as &mut dyn Reflect)
    }

    fn resizable(&self) -> bool {
        true
    }

    fn remove(&mut self, index: usize) {
        VecDeque::remove(self, index);
    }

    fn insert_default(&mut self, index: usize) {
        let index = index.min(VecDeque::len(self));
        VecDeque::insert(self, index, T::default());
    }
}

impl<T: Reflect + Default> Reflect for VecDeque<T> {
    fn node(&mut self) -> Node<'_> {
        Node::Sequence(self)
    }
}

impl<K: Display + Ord, V: Reflect> Mapping for BTreeMap<K, V> {
    fn len(&self) -> usize {
        BTreeMap::len(self)
    }

    fn entries(&mut self) -> Vec<(String, &mut dyn Reflect)> {
        self.iter_mut()
            .map(|(k, v)| (k.to_string(), v as &mut dyn Reflect))
            .collect()
    }
}

impl<K: Display + Ord, V: Reflect> Reflect for BTreeMap<K, V> {
    fn node(&mut self) -> Node<'_> {
        Node::Mapping(self)
    }
}

impl<K: Display, V: Reflect, S> Mapping for HashMap<K, V, S> {
    fn len(&self) -> usize {
        HashMap::len(self)
    }

    /// 哈希表没有稳定顺序，按键文本排序
    fn entries(&mut self) -> Vec<(String, &mut dyn Reflect)> {
        let mut entries: Vec<(String, &mut dyn Reflect)> = self
            .iter_mut()
            .map(|(k, v)| (k.to_string(), v as &mut dyn Reflect))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }
}

impl<K: Display, V: Reflect, S> Reflect for HashMap<K, V, S> {
    fn node(&mut self) -> Node<'_> {
        Node::Mapping(self)
    }
}

/// 为结构体注册字段，字段按书写顺序渲染
///
/// 每个字段可以带一组选项：`min`、`max`、`format`、`speed`、`slider`、
/// `label`、`read_only`、`inline`。
#[macro_export]
macro_rules! autogui_struct {
    ($ty:ty { $($field:ident $(: { $($key:ident : $value:expr),* $(,)? })?),* $(,)? }) => {
        impl $crate::autogui::Composite for $ty {
            fn type_name(&self) -> &'static str {
                stringify!($ty)
            }

            fn fields(&mut self) -> Vec<$crate::autogui::Field<'_>> {
                vec![$(
                    $crate::autogui::Field {
                        name: stringify!($field),
                        value: &mut self.$field,
                        options: $crate::autogui::FieldOptions::new() $($(.$key($value))*)?,
                    }
                ),*]
            }
        }

        impl $crate::autogui::Reflect for $ty {
            fn node(&mut self) -> $crate::autogui::Node<'_> {
                $crate::autogui::Node::Composite(self)
            }
        }
    };
}

/// 声明一个类型使用自己的 `CustomRender` 实现
#[macro_export]
macro_rules! autogui_custom {
    ($ty:ty) => {
        impl $crate::autogui::Reflect for $ty {
            fn node(&mut self) -> $crate::autogui::Node<'_> {
                $crate::autogui::Node::Custom(self)
            }
        }
    };
}
