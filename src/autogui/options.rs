/// 字段渲染选项
///
/// 由 `autogui_struct!` 为每个字段生成，也可以在自定义渲染钩子里手动构造。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldOptions {
    /// 数值下界
    pub min: Option<f64>,
    /// 数值上界
    pub max: Option<f64>,
    /// printf 风格的显示格式，例如 `"%.2f"`
    pub format: Option<String>,
    /// 拖拽速度
    pub speed: Option<f32>,
    /// 有上下界时使用滑块而不是拖拽
    pub slider: bool,
    /// 覆盖显示标题
    pub label: Option<String>,
    /// 只读显示
    pub read_only: bool,
    /// 复合值直接展开，不包在可折叠节点里
    pub inline: bool,
}

impl FieldOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn min(mut self, min: impl Into<f64>) -> Self {
        self.min = Some(min.into());
        self
    }

    pub fn max(mut self, max: impl Into<f64>) -> Self {
        self.max = Some(max.into());
        self
    }

    pub fn bounds(self, min: impl Into<f64>, max: impl Into<f64>) -> Self {
        self.min(min).max(max)
    }

    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn speed(mut self, speed: f32) -> Self {
        self.speed = Some(speed);
        self
    }

    pub fn slider(mut self, slider: bool) -> Self {
        self.slider = slider;
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub fn inline(mut self, inline: bool) -> Self {
        self.inline = inline;
        self
    }

    /// 把值限制在上下界内
    ///
    /// 下界大于上界时以下界为准。
    pub fn clamp(&self, value: f64) -> f64 {
        let mut value = value;
        if let Some(max) = self.max {
            value = value.min(max);
        }
        if let Some(min) = self.min {
            value = value.max(min);
        }
        value
    }

    /// 整数版本的 `clamp`，不经过浮点
    ///
    /// 非整数的上界向下取整、下界向上取整。
    pub fn clamp_int(&self, value: i128) -> i128 {
        let mut value = value;
        if let Some(max) = self.max {
            value = value.min(max.floor() as i128);
        }
        if let Some(min) = self.min {
            value = value.max(min.ceil() as i128);
        }
        value
    }

    pub fn is_bounded(&self) -> bool {
        self.min.is_some() && self.max.is_some()
    }
}

/// 把 printf 风格的格式应用到浮点数
///
/// 只识别精度（`%.3f`、`%.1e` 之类），无法识别时退回 `{}`。
pub fn format_float(format: &str, value: f64) -> String {
    let Some(start) = format.find('%') else {
        return value.to_string();
    };
    let spec = &format[start + 1..];
    let end = spec
        .find(|c: char| c.is_ascii_alphabetic())
        .unwrap_or(spec.len());
    let precision = spec[..end]
        .split('.')
        .nth(1)
        .and_then(|p| p.parse::<usize>().ok());
    let conversion = spec[end..].chars().next();
    let body = match (conversion, precision) {
        (Some('e'), Some(p)) => format!("{:.*e}", p, value),
        (Some('e'), None) => format!("{:e}", value),
        (Some('d'), _) => format!("{}", value.round() as i64),
        (_, Some(p)) => format!("{:.*}", p, value),
        (_, None) => value.to_string(),
    };
    let suffix_start = (start + 1 + end + conversion.map_or(0, char::len_utf8)).min(format.len());
    format!("{}{}{}", &format[..start], body, &format[suffix_start..])
}
