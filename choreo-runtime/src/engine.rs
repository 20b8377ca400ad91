//! # Engine 模块
//!
//! 门面：时间轴 / 序列 / 片段的唯一签发入口。
//!
//! ## 职责
//!
//! - 持有效果库（内置库 + 用户库按类别合并）
//! - 按类别签发片段工厂，执行配置合并链
//! - 持有进程级共享状态：滚动锚点栈

use std::cell::Cell;

use crate::clip::{
    AnimClip, CategoryStateSeed, ClipConfig, ClipId, HideType, PartialClipConfig,
    ScrollAnchorStack,
};
use crate::dom::{Connector, ConnectorPoint, Element};
use crate::effect::{presets, EffectArgs, EffectBank, EffectCategory, EffectEntry};
use crate::error::{ChoreoError, ChoreoResult, ClipError};
use crate::sequence::{AnimSequence, SequenceConfig, SequenceId};
use crate::timeline::{AnimTimeline, TimelineConfig, TimelineId};

/// 门面
///
/// 一个进程通常只需要一个实例；测试夹具各建各的，互不共享
/// 滚动锚点栈。
#[derive(Debug)]
pub struct Choreographer {
    bank: EffectBank,
    scroll_anchors: ScrollAnchorStack,
    next_clip_id: Cell<u64>,
    next_sequence_id: Cell<u64>,
    next_timeline_id: Cell<u64>,
}

impl Choreographer {
    /// 创建门面（仅内置效果库）
    pub fn new() -> Self {
        Self::with_banks(EffectBank::new())
    }

    /// 创建门面并合并用户效果库
    ///
    /// 用户条目按类别逐项覆盖内置条目。
    pub fn with_banks(user_bank: EffectBank) -> Self {
        let mut bank = presets::builtin_bank();
        bank.merge(user_bank);
        Self {
            bank,
            scroll_anchors: ScrollAnchorStack::default(),
            next_clip_id: Cell::new(1),
            next_sequence_id: Cell::new(1),
            next_timeline_id: Cell::new(1),
        }
    }

    /// 效果库
    pub fn bank(&self) -> &EffectBank {
        &self.bank
    }

    /// 滚动锚点栈句柄
    pub fn scroll_anchors(&self) -> ScrollAnchorStack {
        ScrollAnchorStack::clone(&self.scroll_anchors)
    }

    fn next_clip_id(&self) -> ClipId {
        let id = self.next_clip_id.get();
        self.next_clip_id.set(id + 1);
        ClipId(id)
    }

    // ========== 结构签发 ==========

    /// 签发时间轴
    pub fn new_timeline(&self, config: TimelineConfig) -> AnimTimeline {
        let id = self.next_timeline_id.get();
        self.next_timeline_id.set(id + 1);
        AnimTimeline::new(TimelineId(id), config)
    }

    /// 签发序列
    pub fn new_sequence(&self, config: SequenceConfig) -> AnimSequence {
        let id = self.next_sequence_id.get();
        self.next_sequence_id.set(id + 1);
        AnimSequence::new(SequenceId(id), config)
    }

    // ========== 片段工厂 ==========

    fn lookup(&self, category: EffectCategory, name: &str) -> ChoreoResult<&EffectEntry> {
        self.bank.get(category, name).ok_or_else(|| {
            ChoreoError::Clip(ClipError::UnknownEffect {
                category: category.to_string(),
                effect: name.to_string(),
            })
        })
    }

    fn make_clip(
        &self,
        category: EffectCategory,
        seed: CategoryStateSeed,
        target: Element,
        effect_name: &str,
        args: EffectArgs,
        author_config: &PartialClipConfig,
    ) -> ChoreoResult<AnimClip> {
        let entry = self.lookup(category, effect_name)?;
        let config = ClipConfig::resolve(category, entry, author_config);
        AnimClip::new(
            self.next_clip_id(),
            seed,
            effect_name,
            target,
            args,
            entry.generator.clone(),
            entry.composition_frequency,
            config,
        )
    }

    /// 入场片段
    ///
    /// `hide_now` 指定构造时立即隐藏目标的方式。
    pub fn entrance(
        &self,
        target: &Element,
        effect_name: &str,
        args: EffectArgs,
        config: &PartialClipConfig,
        hide_now: Option<HideType>,
    ) -> ChoreoResult<AnimClip> {
        self.make_clip(
            EffectCategory::Entrance,
            CategoryStateSeed::Entrance { hide_now },
            target.clone(),
            effect_name,
            args,
            config,
        )
    }

    /// 退场片段
    pub fn exit(
        &self,
        target: &Element,
        effect_name: &str,
        args: EffectArgs,
        config: &PartialClipConfig,
        exit_type: HideType,
    ) -> ChoreoResult<AnimClip> {
        self.make_clip(
            EffectCategory::Exit,
            CategoryStateSeed::Exit { exit_type },
            target.clone(),
            effect_name,
            args,
            config,
        )
    }

    /// 强调片段
    pub fn emphasis(
        &self,
        target: &Element,
        effect_name: &str,
        args: EffectArgs,
        config: &PartialClipConfig,
    ) -> ChoreoResult<AnimClip> {
        self.make_clip(
            EffectCategory::Emphasis,
            CategoryStateSeed::Emphasis,
            target.clone(),
            effect_name,
            args,
            config,
        )
    }

    /// 位移片段
    pub fn motion(
        &self,
        target: &Element,
        effect_name: &str,
        args: EffectArgs,
        config: &PartialClipConfig,
    ) -> ChoreoResult<AnimClip> {
        self.make_clip(
            EffectCategory::Motion,
            CategoryStateSeed::Motion,
            target.clone(),
            effect_name,
            args,
            config,
        )
    }

    /// 过渡片段
    pub fn transition(
        &self,
        target: &Element,
        effect_name: &str,
        args: EffectArgs,
        config: &PartialClipConfig,
        remove_inline_styles_on_finish: bool,
    ) -> ChoreoResult<AnimClip> {
        self.make_clip(
            EffectCategory::Transition,
            CategoryStateSeed::Transition {
                remove_inline_styles_on_finish,
            },
            target.clone(),
            effect_name,
            args,
            config,
        )
    }

    /// 滚动片段
    pub fn scroller(
        &self,
        target: &Element,
        effect_name: &str,
        args: EffectArgs,
        config: &PartialClipConfig,
    ) -> ChoreoResult<AnimClip> {
        self.make_clip(
            EffectCategory::Scroller,
            CategoryStateSeed::Scroller {
                anchors: self.scroll_anchors(),
            },
            target.clone(),
            effect_name,
            args,
            config,
        )
    }

    /// 连接线端点设置片段
    ///
    /// 工厂形态与其他类别不同：直接接收端点，不接收效果参数。
    pub fn connector_setter(
        &self,
        connector: &Connector,
        point_a: ConnectorPoint,
        point_b: ConnectorPoint,
        tracking: Option<bool>,
        config: &PartialClipConfig,
    ) -> ChoreoResult<AnimClip> {
        self.make_clip(
            EffectCategory::ConnectorSetter,
            CategoryStateSeed::ConnectorSetter {
                connector: connector.clone(),
                point_a,
                point_b,
                tracking,
            },
            connector.element().clone(),
            "~set-line-points",
            EffectArgs::none(),
            config,
        )
    }

    /// 连接线入场片段
    pub fn connector_entrance(
        &self,
        connector: &Connector,
        effect_name: &str,
        args: EffectArgs,
        config: &PartialClipConfig,
    ) -> ChoreoResult<AnimClip> {
        self.make_clip(
            EffectCategory::ConnectorEntrance,
            CategoryStateSeed::ConnectorEntrance {
                connector: connector.clone(),
            },
            connector.element().clone(),
            effect_name,
            args,
            config,
        )
    }

    /// 连接线退场片段
    pub fn connector_exit(
        &self,
        connector: &Connector,
        effect_name: &str,
        args: EffectArgs,
        config: &PartialClipConfig,
    ) -> ChoreoResult<AnimClip> {
        self.make_clip(
            EffectCategory::ConnectorExit,
            CategoryStateSeed::ConnectorExit {
                connector: connector.clone(),
            },
            connector.element().clone(),
            effect_name,
            args,
            config,
        )
    }
}

impl Default for Choreographer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::CLASS_HIDDEN;

    #[test]
    fn test_factories_issue_unique_ids() {
        let studio = Choreographer::new();
        let elem = Element::new("div");
        elem.add_class(CLASS_HIDDEN);

        let a = studio
            .entrance(&elem, "~fade-in", EffectArgs::none(), &PartialClipConfig::new(), None)
            .unwrap();
        let b = studio
            .entrance(&elem, "~appear", EffectArgs::none(), &PartialClipConfig::new(), None)
            .unwrap();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_unknown_effect_rejected() {
        let studio = Choreographer::new();
        let elem = Element::new("div");

        let result = studio.emphasis(
            &elem,
            "~不存在的效果",
            EffectArgs::none(),
            &PartialClipConfig::new(),
        );
        assert!(matches!(
            result,
            Err(ChoreoError::Clip(ClipError::UnknownEffect { .. }))
        ));
    }

    #[test]
    fn test_hide_now_applies_class() {
        let studio = Choreographer::new();
        let elem = Element::new("div");

        studio
            .entrance(
                &elem,
                "~fade-in",
                EffectArgs::none(),
                &PartialClipConfig::new(),
                Some(HideType::DisplayNone),
            )
            .unwrap();
        assert!(elem.has_class(CLASS_HIDDEN));
    }

    #[test]
    fn test_user_bank_overrides_builtin() {
        use crate::effect::{EffectGenerator, Keyframes};

        let mut user = EffectBank::new();
        user.insert(
            EffectCategory::Entrance,
            "~fade-in",
            EffectEntry::new(EffectGenerator::from_static_frames(Keyframes::empty(), None))
                .with_config(PartialClipConfig::new().duration(123.0)),
        );

        let studio = Choreographer::with_banks(user);
        let elem = Element::new("div");
        let clip = studio
            .entrance(&elem, "~fade-in", EffectArgs::none(), &PartialClipConfig::new(), None)
            .unwrap();
        assert_eq!(clip.config().timing.duration, 123.0);
    }
}
