//! # Bank 模块
//!
//! 效果库：效果名称到生成器与配置的映射。
//!
//! 效果名称与默认配置的**唯一来源**。用户库按类别逐项合并到内置库之上。

use std::collections::HashMap;

use super::{EffectCategory, EffectGenerator};
use crate::clip::PartialClipConfig;

/// 效果组合频率
///
/// 决定生成器结果的缓存策略。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompositionFrequency {
    /// 仅首次播放时组合，之后复用（常量效果）
    #[default]
    OnFirstPlayOnly,
    /// 每次播放都重新组合（依赖实时 DOM 状态的效果）
    EveryPlay,
}

/// 效果库条目
#[derive(Debug, Clone)]
pub struct EffectEntry {
    /// 生成器（四种形态之一）
    pub generator: EffectGenerator,
    /// 条目默认配置（优先级低于条目配置）
    pub default_config: PartialClipConfig,
    /// 条目配置（可被作者覆盖）
    pub config: PartialClipConfig,
    /// 不可变配置（覆盖作者配置）
    pub immutable_config: PartialClipConfig,
    /// 组合频率
    pub composition_frequency: CompositionFrequency,
}

impl EffectEntry {
    /// 创建条目（全部配置为空）
    pub fn new(generator: EffectGenerator) -> Self {
        Self {
            generator,
            default_config: PartialClipConfig::default(),
            config: PartialClipConfig::default(),
            immutable_config: PartialClipConfig::default(),
            composition_frequency: CompositionFrequency::default(),
        }
    }

    /// 设置条目默认配置
    pub fn with_default_config(mut self, config: PartialClipConfig) -> Self {
        self.default_config = config;
        self
    }

    /// 设置条目配置
    pub fn with_config(mut self, config: PartialClipConfig) -> Self {
        self.config = config;
        self
    }

    /// 设置不可变配置
    pub fn with_immutable_config(mut self, config: PartialClipConfig) -> Self {
        self.immutable_config = config;
        self
    }

    /// 设置组合频率
    pub fn with_composition_frequency(mut self, frequency: CompositionFrequency) -> Self {
        self.composition_frequency = frequency;
        self
    }
}

/// 效果库
///
/// 按（类别, 效果名）索引条目。
#[derive(Debug, Clone, Default)]
pub struct EffectBank {
    entries: HashMap<EffectCategory, HashMap<String, EffectEntry>>,
}

impl EffectBank {
    /// 创建空库
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册条目（同名覆盖）
    pub fn insert(
        &mut self,
        category: EffectCategory,
        name: impl Into<String>,
        entry: EffectEntry,
    ) {
        self.entries
            .entry(category)
            .or_default()
            .insert(name.into(), entry);
    }

    /// 查找条目
    pub fn get(&self, category: EffectCategory, name: &str) -> Option<&EffectEntry> {
        self.entries.get(&category)?.get(name)
    }

    /// 按类别列出效果名（排序后）
    pub fn names(&self, category: EffectCategory) -> Vec<String> {
        let mut names: Vec<String> = self
            .entries
            .get(&category)
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    /// 把 `other` 按类别逐项合并到本库之上（other 中的同名条目胜出）
    pub fn merge(&mut self, other: EffectBank) {
        for (category, entries) in other.entries {
            let slot = self.entries.entry(category).or_default();
            for (name, entry) in entries {
                slot.insert(name, entry);
            }
        }
    }

    /// 条目总数
    pub fn len(&self) -> usize {
        self.entries.values().map(|m| m.len()).sum()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::Keyframes;

    fn noop_entry() -> EffectEntry {
        EffectEntry::new(EffectGenerator::from_static_frames(Keyframes::empty(), None))
    }

    #[test]
    fn test_insert_and_get() {
        let mut bank = EffectBank::new();
        bank.insert(EffectCategory::Entrance, "~fade-in", noop_entry());

        assert!(bank.get(EffectCategory::Entrance, "~fade-in").is_some());
        assert!(bank.get(EffectCategory::Exit, "~fade-in").is_none());
        assert_eq!(bank.len(), 1);
    }

    #[test]
    fn test_merge_overrides_by_name() {
        let mut base = EffectBank::new();
        base.insert(EffectCategory::Entrance, "~fade-in", noop_entry());
        base.insert(EffectCategory::Entrance, "~appear", noop_entry());

        let mut user = EffectBank::new();
        let custom = noop_entry().with_composition_frequency(CompositionFrequency::EveryPlay);
        user.insert(EffectCategory::Entrance, "~fade-in", custom);
        user.insert(EffectCategory::Exit, "~vanish", noop_entry());

        base.merge(user);

        assert_eq!(base.len(), 3);
        // 同名条目被用户库覆盖
        let merged = base.get(EffectCategory::Entrance, "~fade-in").unwrap();
        assert_eq!(
            merged.composition_frequency,
            CompositionFrequency::EveryPlay
        );
        // 未覆盖的条目保留
        assert!(bank_has(&base, EffectCategory::Entrance, "~appear"));
        assert!(bank_has(&base, EffectCategory::Exit, "~vanish"));
    }

    fn bank_has(bank: &EffectBank, category: EffectCategory, name: &str) -> bool {
        bank.get(category, name).is_some()
    }

    #[test]
    fn test_names_sorted() {
        let mut bank = EffectBank::new();
        bank.insert(EffectCategory::Entrance, "~slide-in", noop_entry());
        bank.insert(EffectCategory::Entrance, "~appear", noop_entry());

        assert_eq!(bank.names(EffectCategory::Entrance), vec!["~appear", "~slide-in"]);
    }
}
