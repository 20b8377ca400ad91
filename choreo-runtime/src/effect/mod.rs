//! # Effect 模块
//!
//! 效果数据模型：类别、参数、关键帧，以及生成器与效果库。
//!
//! ## 设计原则
//!
//! - **声明式**：关键帧只描述"目标样式是什么"，插值渲染由宿主完成
//! - **参数结构化提取**：效果参数采用统一的位置/命名参数列表，
//!   具体语义由各效果的生成器解释

mod bank;
mod generator;
pub mod presets;

pub use bank::{CompositionFrequency, EffectBank, EffectEntry};
pub use generator::{
    ComposedEffect, DirectionEffect, EffectContext, EffectGenerator, KeyframesFn, Mutator,
    MutatorCtx, MutatorFactory,
};

use serde::{Deserialize, Serialize};
use std::fmt;

/// 效果类别
///
/// 封闭枚举：每个类别有少量专属生命周期行为，由片段层分发。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EffectCategory {
    /// 入场（从隐藏到可见）
    Entrance,
    /// 退场（从可见到隐藏）
    Exit,
    /// 强调（不改变可见性）
    Emphasis,
    /// 位移（默认可叠加合成）
    Motion,
    /// 过渡（样式 A -> 样式 B）
    Transition,
    /// 滚动
    Scroller,
    /// 连接线端点设置（瞬时）
    ConnectorSetter,
    /// 连接线入场
    ConnectorEntrance,
    /// 连接线退场
    ConnectorExit,
}

impl EffectCategory {
    /// 所有类别
    pub fn all() -> [EffectCategory; 9] {
        [
            Self::Entrance,
            Self::Exit,
            Self::Emphasis,
            Self::Motion,
            Self::Transition,
            Self::Scroller,
            Self::ConnectorSetter,
            Self::ConnectorEntrance,
            Self::ConnectorExit,
        ]
    }

    /// 是否作用于连接线元素
    pub fn is_connector(&self) -> bool {
        matches!(
            self,
            Self::ConnectorSetter | Self::ConnectorEntrance | Self::ConnectorExit
        )
    }
}

impl fmt::Display for EffectCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Entrance => "Entrance",
            Self::Exit => "Exit",
            Self::Emphasis => "Emphasis",
            Self::Motion => "Motion",
            Self::Transition => "Transition",
            Self::Scroller => "Scroller",
            Self::ConnectorSetter => "ConnectorSetter",
            Self::ConnectorEntrance => "ConnectorEntrance",
            Self::ConnectorExit => "ConnectorExit",
        };
        write!(f, "{}", name)
    }
}

/// 效果参数值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EffectArg {
    /// 数字参数，如 `1.5`
    Number(f64),
    /// 字符串参数，如 `"to-the-right"`
    String(String),
    /// 布尔参数，如 `true`
    Bool(bool),
}

/// 效果参数列表
///
/// 支持位置参数与命名参数：
/// - `None` = 位置参数
/// - `Some(key)` = 命名参数
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EffectArgs {
    args: Vec<(Option<String>, EffectArg)>,
}

impl EffectArgs {
    /// 空参数
    pub fn none() -> Self {
        Self::default()
    }

    /// 从位置参数构造
    pub fn positional(args: Vec<EffectArg>) -> Self {
        Self {
            args: args.into_iter().map(|a| (None, a)).collect(),
        }
    }

    /// 追加命名参数（builder 风格）
    pub fn with_named(mut self, key: impl Into<String>, value: EffectArg) -> Self {
        self.args.push((Some(key.into()), value));
        self
    }

    /// 获取位置参数（按索引）
    pub fn get_positional(&self, index: usize) -> Option<&EffectArg> {
        self.args
            .iter()
            .filter(|(key, _)| key.is_none())
            .nth(index)
            .map(|(_, v)| v)
    }

    /// 获取命名参数（按 key）
    pub fn get_named(&self, key: &str) -> Option<&EffectArg> {
        self.args
            .iter()
            .find(|(k, _)| k.as_deref() == Some(key))
            .map(|(_, v)| v)
    }

    /// 获取参数值：优先命名参数，回退到位置参数
    pub fn get_arg(&self, key: &str, positional_index: usize) -> Option<&EffectArg> {
        self.get_named(key)
            .or_else(|| self.get_positional(positional_index))
    }

    /// 按数字读取
    pub fn number(&self, key: &str, positional_index: usize) -> Option<f64> {
        self.get_arg(key, positional_index).and_then(|a| match a {
            EffectArg::Number(n) => Some(*n),
            _ => None,
        })
    }

    /// 按字符串读取
    pub fn string(&self, key: &str, positional_index: usize) -> Option<String> {
        self.get_arg(key, positional_index).and_then(|a| match a {
            EffectArg::String(s) => Some(s.clone()),
            _ => None,
        })
    }

    /// 按布尔读取
    pub fn bool(&self, key: &str, positional_index: usize) -> Option<bool> {
        self.get_arg(key, positional_index).and_then(|a| match a {
            EffectArg::Bool(b) => Some(*b),
            _ => None,
        })
    }
}

/// 单个关键帧
///
/// `offset` 是 0.0 - 1.0 的相位进度；`None` 表示由宿主均匀分布。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Keyframe {
    pub offset: Option<f64>,
    /// 样式声明（属性名 -> 值）
    pub styles: Vec<(String, String)>,
}

impl Keyframe {
    /// 创建关键帧
    pub fn new(offset: Option<f64>, styles: Vec<(&str, &str)>) -> Self {
        Self {
            offset,
            styles: styles
                .into_iter()
                .map(|(p, v)| (p.to_string(), v.to_string()))
                .collect(),
        }
    }
}

/// 关键帧序列
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Keyframes {
    pub frames: Vec<Keyframe>,
}

impl Keyframes {
    /// 创建关键帧序列
    pub fn new(frames: Vec<Keyframe>) -> Self {
        Self { frames }
    }

    /// 空序列（仅产生类/提交副作用的效果）
    pub fn empty() -> Self {
        Self::default()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// 末帧样式（样式提交时写入内联样式）
    pub fn final_styles(&self) -> &[(String, String)] {
        self.frames.last().map(|f| f.styles.as_slice()).unwrap_or(&[])
    }

    /// 出现过的所有样式属性名（去重，保持首次出现顺序）
    pub fn property_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for frame in &self.frames {
            for (prop, _) in &frame.styles {
                if !names.contains(prop) {
                    names.push(prop.clone());
                }
            }
        }
        names
    }

    /// 生成首尾颠倒的反向帧（偏移量取 1 - offset）
    pub fn reversed(&self) -> Keyframes {
        let mut frames: Vec<Keyframe> = self
            .frames
            .iter()
            .rev()
            .map(|f| Keyframe {
                offset: f.offset.map(|o| 1.0 - o),
                styles: f.styles.clone(),
            })
            .collect();
        // 颠倒后偏移保持递增
        frames.sort_by(|a, b| {
            a.offset
                .unwrap_or(0.0)
                .partial_cmp(&b.offset.unwrap_or(0.0))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Keyframes { frames }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_positional_and_named() {
        let args = EffectArgs::positional(vec![
            EffectArg::Number(1.5),
            EffectArg::String("up".to_string()),
        ])
        .with_named("clockwise", EffectArg::Bool(true));

        assert_eq!(args.number("duration", 0), Some(1.5));
        assert_eq!(args.string("direction", 1).as_deref(), Some("up"));
        assert_eq!(args.bool("clockwise", 9), Some(true));
        // 命名参数优先于位置参数
        let args2 = EffectArgs::positional(vec![EffectArg::Number(1.0)])
            .with_named("duration", EffectArg::Number(2.0));
        assert_eq!(args2.number("duration", 0), Some(2.0));
    }

    #[test]
    fn test_keyframes_final_styles() {
        let frames = Keyframes::new(vec![
            Keyframe::new(Some(0.0), vec![("opacity", "0")]),
            Keyframe::new(Some(1.0), vec![("opacity", "1"), ("transform", "none")]),
        ]);

        assert_eq!(
            frames.final_styles(),
            &[
                ("opacity".to_string(), "1".to_string()),
                ("transform".to_string(), "none".to_string())
            ]
        );
        assert_eq!(frames.property_names(), vec!["opacity", "transform"]);
    }

    #[test]
    fn test_keyframes_reversed() {
        let frames = Keyframes::new(vec![
            Keyframe::new(Some(0.0), vec![("opacity", "0")]),
            Keyframe::new(Some(1.0), vec![("opacity", "1")]),
        ]);

        let reversed = frames.reversed();
        assert_eq!(reversed.frames[0].styles[0].1, "1");
        assert_eq!(reversed.frames[0].offset, Some(0.0));
        assert_eq!(reversed.frames[1].styles[0].1, "0");
    }

    #[test]
    fn test_category_display() {
        assert_eq!(EffectCategory::ConnectorSetter.to_string(), "ConnectorSetter");
        assert!(EffectCategory::ConnectorEntrance.is_connector());
        assert!(!EffectCategory::Motion.is_connector());
        assert_eq!(EffectCategory::all().len(), 9);
    }
}
