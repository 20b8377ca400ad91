//! # Config 模块
//!
//! 片段配置、修饰符与配置合并。
//!
//! ## 合并优先级（低到高）
//!
//! ```text
//! 类别默认 -> 条目 defaultConfig -> 条目 config -> 作者配置 -> 条目 immutableConfig
//! ```

use serde::{Deserialize, Serialize};

use super::timing::ClipTiming;
use crate::easing::EasingFunction;
use crate::effect::{EffectCategory, EffectEntry};

/// 相位边界挂接的 CSS 类
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CssClasses {
    pub to_add_on_start: Vec<String>,
    pub to_add_on_finish: Vec<String>,
    pub to_remove_on_start: Vec<String>,
    pub to_remove_on_finish: Vec<String>,
}

/// 样式合成模式
///
/// 同一元素被多个片段驱动时的叠加策略。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CompositeMode {
    /// 替换（默认）
    #[default]
    Replace,
    /// 累积（位移叠加）
    Accumulate,
    /// 相加
    Add,
}

/// 隐藏方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HideType {
    /// display:none（脱离布局）
    DisplayNone,
    /// visibility:hidden（保留布局）
    VisibilityHidden,
}

/// 片段完整配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipConfig {
    /// 时序参数
    pub timing: ClipTiming,
    /// CSS 类副作用
    pub css_classes: CssClasses,
    /// 合成模式
    pub composite: CompositeMode,
    /// 激活相位结束后是否把最终样式写入内联样式
    pub commits_styles: bool,
    /// 元素未渲染时是否临时强制显示以完成提交
    pub commit_styles_forcefully: bool,
    /// 与前一片段同组并行
    pub starts_with_previous: bool,
    /// 让下一片段与本片段同组并行
    pub starts_next_clip_too: bool,
    /// 构造时立即运行生成器（关键帧不依赖实时布局的效果）
    pub compute_now: bool,
}

impl Default for ClipConfig {
    fn default() -> Self {
        Self {
            timing: ClipTiming::default(),
            css_classes: CssClasses::default(),
            composite: CompositeMode::default(),
            commits_styles: true,
            commit_styles_forcefully: false,
            starts_with_previous: false,
            starts_next_clip_too: false,
            compute_now: false,
        }
    }
}

impl ClipConfig {
    /// 类别默认配置（合并链最底层）
    pub fn for_category(category: EffectCategory) -> Self {
        let mut config = Self::default();
        match category {
            // 位移默认可叠加，平移彼此累积而非相互覆盖
            EffectCategory::Motion => {
                config.composite = CompositeMode::Accumulate;
            }
            // 端点设置是瞬时动作，且总是与下一片段并行
            EffectCategory::ConnectorSetter => {
                config.timing.duration = 0.0;
                config.starts_next_clip_too = true;
                config.commits_styles = false;
            }
            EffectCategory::ConnectorEntrance | EffectCategory::ConnectorExit => {
                config.commits_styles = false;
            }
            _ => {}
        }
        config
    }

    /// 执行完整合并链
    pub fn resolve(
        category: EffectCategory,
        entry: &EffectEntry,
        author: &PartialClipConfig,
    ) -> Self {
        let mut config = Self::for_category(category);
        entry.default_config.apply_to(&mut config);
        entry.config.apply_to(&mut config);
        author.apply_to(&mut config);
        entry.immutable_config.apply_to(&mut config);

        // 端点设置的两项约束不接受任何覆盖
        if category == EffectCategory::ConnectorSetter {
            config.timing.duration = 0.0;
            config.starts_next_clip_too = true;
        }
        config
    }
}

/// 部分片段配置
///
/// 所有字段可缺省；合并时仅写入出现的字段。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PartialClipConfig {
    pub delay: Option<f64>,
    pub duration: Option<f64>,
    pub end_delay: Option<f64>,
    pub easing: Option<EasingFunction>,
    pub playback_rate: Option<f64>,
    pub css_classes: Option<CssClasses>,
    pub composite: Option<CompositeMode>,
    pub commits_styles: Option<bool>,
    pub commit_styles_forcefully: Option<bool>,
    pub starts_with_previous: Option<bool>,
    pub starts_next_clip_too: Option<bool>,
    pub compute_now: Option<bool>,
}

impl PartialClipConfig {
    /// 创建空配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 写入目标配置（仅覆盖出现的字段）
    pub fn apply_to(&self, target: &mut ClipConfig) {
        if let Some(v) = self.delay {
            target.timing.delay = v;
        }
        if let Some(v) = self.duration {
            target.timing.duration = v;
        }
        if let Some(v) = self.end_delay {
            target.timing.end_delay = v;
        }
        if let Some(v) = self.easing {
            target.timing.easing = v;
        }
        if let Some(v) = self.playback_rate {
            target.timing.playback_rate = v;
        }
        if let Some(v) = &self.css_classes {
            target.css_classes = v.clone();
        }
        if let Some(v) = self.composite {
            target.composite = v;
        }
        if let Some(v) = self.commits_styles {
            target.commits_styles = v;
        }
        if let Some(v) = self.commit_styles_forcefully {
            target.commit_styles_forcefully = v;
        }
        if let Some(v) = self.starts_with_previous {
            target.starts_with_previous = v;
        }
        if let Some(v) = self.starts_next_clip_too {
            target.starts_next_clip_too = v;
        }
        if let Some(v) = self.compute_now {
            target.compute_now = v;
        }
    }

    // ===== builder 便捷方法 =====

    pub fn delay(mut self, ms: f64) -> Self {
        self.delay = Some(ms);
        self
    }

    pub fn duration(mut self, ms: f64) -> Self {
        self.duration = Some(ms);
        self
    }

    pub fn end_delay(mut self, ms: f64) -> Self {
        self.end_delay = Some(ms);
        self
    }

    pub fn easing(mut self, easing: EasingFunction) -> Self {
        self.easing = Some(easing);
        self
    }

    pub fn playback_rate(mut self, rate: f64) -> Self {
        self.playback_rate = Some(rate);
        self
    }

    pub fn starts_with_previous(mut self, value: bool) -> Self {
        self.starts_with_previous = Some(value);
        self
    }

    pub fn starts_next_clip_too(mut self, value: bool) -> Self {
        self.starts_next_clip_too = Some(value);
        self
    }

    pub fn commits_styles(mut self, value: bool) -> Self {
        self.commits_styles = Some(value);
        self
    }

    pub fn compute_now(mut self, value: bool) -> Self {
        self.compute_now = Some(value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::{EffectGenerator, Keyframes};

    fn entry_with(
        default_config: PartialClipConfig,
        config: PartialClipConfig,
        immutable: PartialClipConfig,
    ) -> EffectEntry {
        EffectEntry::new(EffectGenerator::from_static_frames(Keyframes::empty(), None))
            .with_default_config(default_config)
            .with_config(config)
            .with_immutable_config(immutable)
    }

    #[test]
    fn test_merge_precedence() {
        let entry = entry_with(
            PartialClipConfig::new().duration(100.0).delay(10.0),
            PartialClipConfig::new().duration(200.0),
            PartialClipConfig::new().end_delay(99.0),
        );
        let author = PartialClipConfig::new().duration(300.0).end_delay(5.0);

        let config = ClipConfig::resolve(EffectCategory::Emphasis, &entry, &author);

        // 作者覆盖条目 config，条目 config 覆盖 defaultConfig
        assert_eq!(config.timing.duration, 300.0);
        assert_eq!(config.timing.delay, 10.0);
        // immutableConfig 覆盖作者
        assert_eq!(config.timing.end_delay, 99.0);
    }

    #[test]
    fn test_motion_defaults_to_accumulate() {
        let config = ClipConfig::for_category(EffectCategory::Motion);
        assert_eq!(config.composite, CompositeMode::Accumulate);

        let config = ClipConfig::for_category(EffectCategory::Emphasis);
        assert_eq!(config.composite, CompositeMode::Replace);
    }

    #[test]
    fn test_connector_setter_constraints_survive_author() {
        let entry = entry_with(
            PartialClipConfig::new(),
            PartialClipConfig::new(),
            PartialClipConfig::new(),
        );
        let author = PartialClipConfig::new()
            .duration(400.0)
            .starts_next_clip_too(false);

        let config = ClipConfig::resolve(EffectCategory::ConnectorSetter, &entry, &author);
        assert_eq!(config.timing.duration, 0.0);
        assert!(config.starts_next_clip_too);
    }

    #[test]
    fn test_partial_config_serde_roundtrip() {
        let partial = PartialClipConfig::new()
            .duration(250.0)
            .easing(EasingFunction::EaseOutQuad);

        let json = serde_json::to_string(&partial).unwrap();
        let back: PartialClipConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(partial, back);
    }
}
