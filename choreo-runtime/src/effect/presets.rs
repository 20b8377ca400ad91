//! # Presets 模块
//!
//! 内置效果库。
//!
//! 效果名称与默认参数的**唯一来源**：任何需要默认时长/缓动的地方
//! 都应引用 [`defaults`] 中的常量，而非硬编码数字。
//! 用户库按类别逐项合并到这些条目之上。

use std::cell::Cell;
use std::rc::Rc;

use super::bank::{CompositionFrequency, EffectBank, EffectEntry};
use super::generator::{EffectGenerator, KeyframesFn, Mutator};
use super::{EffectCategory, Keyframe, Keyframes};
use crate::clip::PartialClipConfig;
use crate::dom::CLASS_HIGHLIGHTABLE;
use crate::easing::EasingFunction;

/// 内置效果的默认参数
pub mod defaults {
    /// 淡入/淡出默认时长（毫秒）
    pub const FADE_DURATION_MS: f64 = 500.0;
    /// 滑入/滑出默认时长
    pub const SLIDE_DURATION_MS: f64 = 500.0;
    /// 高亮默认时长
    pub const HIGHLIGHT_DURATION_MS: f64 = 1000.0;
    /// 平移默认时长
    pub const TRANSLATE_DURATION_MS: f64 = 500.0;
    /// 滚动默认时长
    pub const SCROLL_DURATION_MS: f64 = 500.0;
    /// 连接线描画默认时长
    pub const DRAW_LINE_DURATION_MS: f64 = 350.0;
}

fn fade_frames(from: &str, to: &str) -> Keyframes {
    Keyframes::new(vec![
        Keyframe::new(Some(0.0), vec![("opacity", from)]),
        Keyframe::new(Some(1.0), vec![("opacity", to)]),
    ])
}

/// 滑入方向参数解析（默认从左侧）
fn slide_offset(direction: &str, width: f64, height: f64) -> (f64, f64) {
    match direction {
        "from-right" => (width, 0.0),
        "from-top" => (0.0, -height),
        "from-bottom" => (0.0, height),
        _ => (-width, 0.0),
    }
}

/// 构建内置效果库
pub fn builtin_bank() -> EffectBank {
    let mut bank = EffectBank::new();

    // ===== Entrance =====

    bank.insert(
        EffectCategory::Entrance,
        "~fade-in",
        EffectEntry::new(EffectGenerator::from_static_frames(
            fade_frames("0", "1"),
            None,
        ))
        .with_config(PartialClipConfig::new().duration(defaults::FADE_DURATION_MS)),
    );

    bank.insert(
        EffectCategory::Entrance,
        "~appear",
        EffectEntry::new(EffectGenerator::from_static_frames(Keyframes::empty(), None))
            .with_immutable_config(PartialClipConfig::new().duration(0.0)),
    );

    // 滑入：关键帧依赖实时包围盒，每次播放重新生成
    bank.insert(
        EffectCategory::Entrance,
        "~slide-in",
        EffectEntry::new(EffectGenerator::KeyframeGenerators(Rc::new(|ctx| {
            let direction = ctx.args.string("direction", 0).unwrap_or_default();
            let forward: KeyframesFn = Rc::new(move |ctx| {
                let rect = ctx.element.bounding_box();
                let (dx, dy) = slide_offset(&direction, rect.width, rect.height);
                Ok(Keyframes::new(vec![
                    Keyframe::new(
                        Some(0.0),
                        vec![("transform", &format!("translate({}px, {}px)", dx, dy) as &str)],
                    ),
                    Keyframe::new(Some(1.0), vec![("transform", "translate(0px, 0px)")]),
                ]))
            });
            Ok((forward, None))
        })))
        .with_config(
            PartialClipConfig::new()
                .duration(defaults::SLIDE_DURATION_MS)
                .easing(EasingFunction::EaseOutQuad),
        )
        .with_composition_frequency(CompositionFrequency::EveryPlay),
    );

    // ===== Exit =====

    bank.insert(
        EffectCategory::Exit,
        "~fade-out",
        EffectEntry::new(EffectGenerator::from_static_frames(
            fade_frames("1", "0"),
            None,
        ))
        .with_config(PartialClipConfig::new().duration(defaults::FADE_DURATION_MS)),
    );

    bank.insert(
        EffectCategory::Exit,
        "~disappear",
        EffectEntry::new(EffectGenerator::from_static_frames(Keyframes::empty(), None))
            .with_immutable_config(PartialClipConfig::new().duration(0.0)),
    );

    bank.insert(
        EffectCategory::Exit,
        "~slide-out",
        EffectEntry::new(EffectGenerator::KeyframeGenerators(Rc::new(|ctx| {
            let direction = ctx.args.string("direction", 0).unwrap_or_default();
            let forward: KeyframesFn = Rc::new(move |ctx| {
                let rect = ctx.element.bounding_box();
                let (dx, dy) = slide_offset(&direction, rect.width, rect.height);
                Ok(Keyframes::new(vec![
                    Keyframe::new(Some(0.0), vec![("transform", "translate(0px, 0px)")]),
                    Keyframe::new(
                        Some(1.0),
                        vec![("transform", &format!("translate({}px, {}px)", dx, dy) as &str)],
                    ),
                ]))
            });
            Ok((forward, None))
        })))
        .with_config(
            PartialClipConfig::new()
                .duration(defaults::SLIDE_DURATION_MS)
                .easing(EasingFunction::EaseInQuad),
        )
        .with_composition_frequency(CompositionFrequency::EveryPlay),
    );

    // ===== Emphasis =====

    bank.insert(
        EffectCategory::Emphasis,
        "~highlight",
        EffectEntry::new(EffectGenerator::from_static_frames(
            Keyframes::new(vec![
                Keyframe::new(Some(0.0), vec![("background-position-x", "100%")]),
                Keyframe::new(Some(1.0), vec![("background-position-x", "0%")]),
            ]),
            None,
        ))
        .with_config({
            let mut classes = crate::clip::CssClasses::default();
            classes.to_add_on_start.push(CLASS_HIGHLIGHTABLE.to_string());
            let mut partial = PartialClipConfig::new().duration(defaults::HIGHLIGHT_DURATION_MS);
            partial.css_classes = Some(classes);
            partial
        }),
    );

    bank.insert(
        EffectCategory::Emphasis,
        "~un-highlight",
        EffectEntry::new(EffectGenerator::from_static_frames(
            Keyframes::new(vec![
                Keyframe::new(Some(0.0), vec![("background-position-x", "0%")]),
                Keyframe::new(Some(1.0), vec![("background-position-x", "100%")]),
            ]),
            None,
        ))
        .with_config({
            let mut classes = crate::clip::CssClasses::default();
            classes
                .to_remove_on_finish
                .push(CLASS_HIGHLIGHTABLE.to_string());
            let mut partial = PartialClipConfig::new().duration(defaults::HIGHLIGHT_DURATION_MS);
            partial.css_classes = Some(classes);
            partial
        }),
    );

    // ===== Motion =====

    bank.insert(
        EffectCategory::Motion,
        "~translate",
        EffectEntry::new(EffectGenerator::Keyframes(Rc::new(|ctx| {
            let tx = ctx.args.number("x", 0).unwrap_or(0.0);
            let ty = ctx.args.number("y", 1).unwrap_or(0.0);
            Ok((
                Keyframes::new(vec![
                    Keyframe::new(Some(0.0), vec![("transform", "translate(0px, 0px)")]),
                    Keyframe::new(
                        Some(1.0),
                        vec![("transform", &format!("translate({}px, {}px)", tx, ty) as &str)],
                    ),
                ]),
                None,
            ))
        })))
        .with_config(PartialClipConfig::new().duration(defaults::TRANSLATE_DURATION_MS)),
    );

    // ===== Transition =====

    bank.insert(
        EffectCategory::Transition,
        "~to-opacity",
        EffectEntry::new(EffectGenerator::Keyframes(Rc::new(|ctx| {
            let opacity = ctx.args.number("opacity", 0).unwrap_or(1.0);
            Ok((
                Keyframes::new(vec![Keyframe::new(
                    Some(1.0),
                    vec![("opacity", &opacity.to_string() as &str)],
                )]),
                None,
            ))
        })))
        .with_config(PartialClipConfig::new().duration(defaults::FADE_DURATION_MS)),
    );

    // ===== Scroller =====

    // 平滑滚动：关键帧无法表达，走逐帧回调；
    // 正向工厂记录起点，反向工厂回到该起点
    bank.insert(
        EffectCategory::Scroller,
        "~scroll-self",
        EffectEntry::new(EffectGenerator::RafMutatorGenerators(Rc::new(|ctx| {
            let target_left = ctx.args.number("left", 0).unwrap_or(0.0);
            let target_top = ctx.args.number("top", 1).unwrap_or(0.0);
            let origin: Rc<Cell<(f64, f64)>> = Rc::new(Cell::new((0.0, 0.0)));

            let origin_fwd = Rc::clone(&origin);
            let forward: super::MutatorFactory = Rc::new(move |ctx: &super::EffectContext| {
                let start = ctx.element.scroll_offset();
                origin_fwd.set(start);
                let mutator: Mutator = Rc::new(move |m| {
                    m.element.scroll_to(
                        m.compute_tween(start.0, target_left),
                        m.compute_tween(start.1, target_top),
                    );
                });
                Ok(mutator)
            });

            let origin_bwd = Rc::clone(&origin);
            let backward: super::MutatorFactory = Rc::new(move |ctx: &super::EffectContext| {
                let start = ctx.element.scroll_offset();
                let home = origin_bwd.get();
                let mutator: Mutator = Rc::new(move |m| {
                    m.element.scroll_to(
                        m.compute_tween(start.0, home.0),
                        m.compute_tween(start.1, home.1),
                    );
                });
                Ok(mutator)
            });

            Ok((forward, backward))
        })))
        .with_config(
            PartialClipConfig::new()
                .duration(defaults::SCROLL_DURATION_MS)
                .commits_styles(false),
        ),
    );

    // ===== Connector =====

    bank.insert(
        EffectCategory::ConnectorSetter,
        "~set-line-points",
        EffectEntry::new(EffectGenerator::from_static_frames(Keyframes::empty(), None)),
    );

    bank.insert(
        EffectCategory::ConnectorEntrance,
        "~draw-line",
        EffectEntry::new(EffectGenerator::from_static_frames(
            Keyframes::new(vec![
                Keyframe::new(Some(0.0), vec![("stroke-dashoffset", "1")]),
                Keyframe::new(Some(1.0), vec![("stroke-dashoffset", "0")]),
            ]),
            None,
        ))
        .with_config(PartialClipConfig::new().duration(defaults::DRAW_LINE_DURATION_MS)),
    );

    bank.insert(
        EffectCategory::ConnectorEntrance,
        "~appear",
        EffectEntry::new(EffectGenerator::from_static_frames(Keyframes::empty(), None))
            .with_immutable_config(PartialClipConfig::new().duration(0.0)),
    );

    bank.insert(
        EffectCategory::ConnectorExit,
        "~erase-line",
        EffectEntry::new(EffectGenerator::from_static_frames(
            Keyframes::new(vec![
                Keyframe::new(Some(0.0), vec![("stroke-dashoffset", "0")]),
                Keyframe::new(Some(1.0), vec![("stroke-dashoffset", "1")]),
            ]),
            None,
        ))
        .with_config(PartialClipConfig::new().duration(defaults::DRAW_LINE_DURATION_MS)),
    );

    bank.insert(
        EffectCategory::ConnectorExit,
        "~disappear",
        EffectEntry::new(EffectGenerator::from_static_frames(Keyframes::empty(), None))
            .with_immutable_config(PartialClipConfig::new().duration(0.0)),
    );

    bank
}
