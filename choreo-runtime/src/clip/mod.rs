//! # Clip 模块
//!
//! 片段：原子播放单元（目标元素 × 效果 × 时序）。
//!
//! ## 职责
//!
//! - 绑定目标元素、效果生成器与时序/修饰符配置
//! - 驱动一段 [`ClipAnimation`] 走完相位状态机
//! - 在相位边界执行副作用：CSS 类挂接、类别专属生命周期、样式提交
//!
//! ## 类别分发
//!
//! 九个效果类别是封闭枚举，各自的少量生命周期差异集中在
//! `CategoryState` 的 match 分发里，不走开放继承。

mod animation;
mod config;
mod timing;

pub use animation::{
    AnimStatus, BlockKind, ClipAnimation, Direction, Phase, PhaseEvent, PhasePosition,
};
pub use config::{ClipConfig, CompositeMode, CssClasses, HideType, PartialClipConfig};
pub use timing::{ClipTiming, ScheduledTimes};

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::debug;

use crate::dom::{
    Connector, ConnectorPoint, ConnectorStash, Element, CLASS_FORCE_SHOW, CLASS_HIDDEN,
    CLASS_INVISIBLE,
};
use crate::effect::{
    ComposedEffect, CompositionFrequency, DirectionEffect, EffectArgs, EffectCategory,
    EffectContext, EffectGenerator, MutatorCtx,
};
use crate::error::{ChoreoError, ChoreoResult, ClipError, ErrorLocation};
use crate::sequence::SequenceId;
use crate::signal::{signal_pair, Signal, Waiter};
use crate::timeline::TimelineId;

/// 片段 ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClipId(pub u64);

/// 滚动锚点（目标元素与滚动前的偏移）
#[derive(Debug, Clone)]
pub struct ScrollAnchor {
    pub element: Element,
    pub left: f64,
    pub top: f64,
}

/// 进程级滚动锚点栈的共享句柄
pub type ScrollAnchorStack = Rc<RefCell<Vec<ScrollAnchor>>>;

/// 启动模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LaunchMode {
    /// 按时序播放
    Normal,
    /// 非时序推进到终点，仍尊重路障
    Finish,
    /// 跳过：启动即非时序推进到终点，同样尊重路障
    Skip,
}

/// 类别专属状态
///
/// 选项与运行期暂存一起存放，随方向往返恢复。
#[derive(Debug)]
enum CategoryState {
    Entrance {
        /// 初始化时立即隐藏的方式
        hide_now: Option<HideType>,
        /// 正向启动时摘掉的隐藏类，反向收尾时还原
        stashed_class: Option<String>,
    },
    Exit {
        exit_type: HideType,
    },
    Emphasis,
    Motion,
    Transition {
        remove_inline_styles_on_finish: bool,
        /// 正向关键帧触碰过的内联样式属性
        touched: Vec<String>,
    },
    Scroller {
        anchors: ScrollAnchorStack,
        /// 正向启动时的滚动偏移
        stash: Option<(f64, f64)>,
    },
    ConnectorSetter {
        connector: Connector,
        point_a: ConnectorPoint,
        point_b: ConnectorPoint,
        tracking: Option<bool>,
        stash: Option<ConnectorStash>,
    },
    ConnectorEntrance {
        connector: Connector,
    },
    ConnectorExit {
        connector: Connector,
    },
}

impl CategoryState {
    fn category(&self) -> EffectCategory {
        match self {
            Self::Entrance { .. } => EffectCategory::Entrance,
            Self::Exit { .. } => EffectCategory::Exit,
            Self::Emphasis => EffectCategory::Emphasis,
            Self::Motion => EffectCategory::Motion,
            Self::Transition { .. } => EffectCategory::Transition,
            Self::Scroller { .. } => EffectCategory::Scroller,
            Self::ConnectorSetter { .. } => EffectCategory::ConnectorSetter,
            Self::ConnectorEntrance { .. } => EffectCategory::ConnectorEntrance,
            Self::ConnectorExit { .. } => EffectCategory::ConnectorExit,
        }
    }
}

/// 片段
///
/// 由门面的工厂方法签发；加入序列后归序列所有，播放控制必须经由父结构。
#[derive(Debug)]
pub struct AnimClip {
    id: ClipId,
    effect_name: String,
    target: Element,
    args: EffectArgs,
    config: ClipConfig,
    animation: ClipAnimation,
    generator: EffectGenerator,
    composition_frequency: CompositionFrequency,
    /// 生成器产物缓存
    composed: Option<ComposedEffect>,
    /// 当前运行方向解析出的效果体
    active_effect: Option<DirectionEffect>,
    category_state: CategoryState,
    /// 父序列（反向引用，不拥有）
    pub(crate) parent_sequence: Option<SequenceId>,
    /// 父时间轴（反向引用，不拥有）
    pub(crate) parent_timeline: Option<TimelineId>,
    in_progress: bool,
    /// 当前运行的播放承诺
    play_signal: Option<Signal>,
    /// 提交后派生的调度时间
    scheduled: Option<ScheduledTimes>,
    /// 错误上下文（序列/时间轴坐标由父结构补全）
    location: ErrorLocation,
}

impl AnimClip {
    /// 创建片段（仅供门面工厂调用）
    pub(crate) fn new(
        id: ClipId,
        category_state_seed: CategoryStateSeed,
        effect_name: impl Into<String>,
        target: Element,
        args: EffectArgs,
        generator: EffectGenerator,
        composition_frequency: CompositionFrequency,
        config: ClipConfig,
    ) -> ChoreoResult<Self> {
        let effect_name = effect_name.into();
        let category_state = category_state_seed.into_state();

        let mut clip = Self {
            id,
            location: ErrorLocation {
                clip_category: Some(category_state.category().to_string()),
                effect_name: Some(effect_name.clone()),
                element_tag: Some(target.opening_tag()),
                ..Default::default()
            },
            effect_name,
            animation: ClipAnimation::new(config.timing.clone()),
            target,
            args,
            config,
            generator,
            composition_frequency,
            composed: None,
            active_effect: None,
            category_state,
            parent_sequence: None,
            parent_timeline: None,
            in_progress: false,
            play_signal: None,
            scheduled: None,
        };

        // 类别初始化
        if let CategoryState::Entrance { hide_now, .. } = &clip.category_state {
            match hide_now {
                Some(HideType::DisplayNone) => clip.target.add_class(CLASS_HIDDEN),
                Some(HideType::VisibilityHidden) => clip.target.add_class(CLASS_INVISIBLE),
                None => {}
            }
        }

        // 预生成：构造时运行生成器并缓存
        if clip.config.compute_now {
            clip.composed = Some(clip.generator.compose(&clip.effect_context())?);
        }
        Ok(clip)
    }

    /// 片段 ID
    pub fn id(&self) -> ClipId {
        self.id
    }

    /// 效果类别
    pub fn category(&self) -> EffectCategory {
        self.category_state.category()
    }

    /// 效果名称
    pub fn effect_name(&self) -> &str {
        &self.effect_name
    }

    /// 目标元素
    pub fn target(&self) -> &Element {
        &self.target
    }

    /// 配置
    pub fn config(&self) -> &ClipConfig {
        &self.config
    }

    /// 是否在播放中
    pub fn in_progress(&self) -> bool {
        self.in_progress
    }

    /// 是否推进中（在播放且未暂停）
    pub fn is_running(&self) -> bool {
        self.in_progress && !self.animation.is_paused()
    }

    /// 是否已暂停
    pub fn is_paused(&self) -> bool {
        self.in_progress && self.animation.is_paused()
    }

    /// 提交后的调度时间（未提交时为 None）
    pub fn scheduled_times(&self) -> Option<ScheduledTimes> {
        self.scheduled
    }

    pub(crate) fn set_scheduled_times(&mut self, times: ScheduledTimes) {
        self.scheduled = times.into();
    }

    /// 当前运行的播放承诺
    pub fn play_waiter(&self) -> Waiter {
        match &self.play_signal {
            Some(signal) => signal.waiter(),
            None => Waiter::resolved(),
        }
    }

    /// 父结构补全错误上下文坐标
    pub(crate) fn fill_location(&mut self, outer: &ErrorLocation) {
        self.location.timeline_name = outer.timeline_name.clone();
        self.location.step_number = outer.step_number;
        self.location.sequence_index = outer.sequence_index;
        self.location.sequence_tag = outer.sequence_tag.clone();
        self.location.sequence_description = outer.sequence_description.clone();
    }

    fn effect_context(&self) -> EffectContext {
        EffectContext {
            element: self.target.clone(),
            args: self.args.clone(),
        }
    }

    // ========== 承诺 / 阻塞 ==========

    /// 生成越过承诺
    pub fn generate_time_promise(
        &mut self,
        direction: Direction,
        phase: Phase,
        position: &PhasePosition,
    ) -> ChoreoResult<Waiter> {
        self.animation.generate_time_promise(direction, phase, position)
    }

    /// 插入路障（作者 API）
    pub fn add_roadblocks(
        &mut self,
        direction: Direction,
        phase: Phase,
        position: &PhasePosition,
        waiters: Vec<Waiter>,
    ) -> ChoreoResult<()> {
        self.animation.add_roadblocks(direction, phase, position, waiters)
    }

    pub(crate) fn add_integrity_blocks(
        &mut self,
        direction: Direction,
        phase: Phase,
        position: &PhasePosition,
        waiters: Vec<Waiter>,
    ) -> ChoreoResult<()> {
        self.animation.add_integrity_blocks(direction, phase, position, waiters)
    }

    /// 当前方向上是否有未解析的路障
    pub fn has_pending_roadblock(&self) -> bool {
        self.animation.has_pending_roadblock()
    }

    // ========== 独立播放（未被序列持有时） ==========

    /// 正向播放
    ///
    /// 已被序列持有的片段必须经由父结构驱动。
    pub fn play(&mut self) -> ChoreoResult<Waiter> {
        self.reject_if_owned("play")?;
        self.launch(Direction::Forward, LaunchMode::Normal, 1.0)?;
        Ok(self.play_waiter())
    }

    /// 反向播放
    pub fn rewind(&mut self) -> ChoreoResult<Waiter> {
        self.reject_if_owned("rewind")?;
        self.launch(Direction::Backward, LaunchMode::Normal, 1.0)?;
        Ok(self.play_waiter())
    }

    /// 暂停（独立片段）
    pub fn pause(&mut self) -> ChoreoResult<()> {
        self.reject_if_owned("pause")?;
        self.pause_internal();
        Ok(())
    }

    /// 恢复（独立片段）
    pub fn unpause(&mut self) -> ChoreoResult<()> {
        self.reject_if_owned("unpause")?;
        self.resume_internal();
        Ok(())
    }

    /// 完成（独立片段）
    pub fn finish(&mut self) -> ChoreoResult<()> {
        self.reject_if_owned("finish")?;
        self.finish_internal()
    }

    /// 推进（独立片段由宿主直接驱动）
    pub fn update(&mut self, dt: f64) -> ChoreoResult<()> {
        self.reject_if_owned("update")?;
        self.update_internal(dt, 1.0)
    }

    fn reject_if_owned(&self, operation: &str) -> ChoreoResult<()> {
        if self.parent_sequence.is_some() {
            return Err(ChoreoError::Clip(ClipError::ChildPlayback {
                operation: operation.to_string(),
                location: self.location.clone(),
            }));
        }
        Ok(())
    }

    // ========== 父结构驱动 ==========

    /// 启动一轮播放
    pub(crate) fn launch(
        &mut self,
        direction: Direction,
        mode: LaunchMode,
        outer_rate: f64,
    ) -> ChoreoResult<()> {
        debug_assert!(!self.in_progress, "片段重复启动");
        debug!(
            clip = self.id.0,
            effect = %self.effect_name,
            ?direction,
            ?mode,
            "启动片段"
        );

        let (signal, _waiter) = signal_pair();
        self.play_signal = Some(signal);
        self.in_progress = true;
        self.active_effect = None;
        self.animation.set_timing(self.config.timing.clone());
        self.animation
            .update_playback_rate(outer_rate * self.config.timing.playback_rate);
        self.animation.launch(direction);

        let events = match mode {
            LaunchMode::Normal => self.animation.advance(0.0),
            LaunchMode::Finish => self.animation.finish(),
            LaunchMode::Skip => self.animation.skip_to_end(),
        };
        self.process_events(events)
    }

    /// 推进一帧
    pub(crate) fn update_internal(&mut self, dt: f64, outer_rate: f64) -> ChoreoResult<()> {
        if !self.in_progress {
            return Ok(());
        }
        self.animation
            .update_playback_rate(outer_rate * self.config.timing.playback_rate);
        let events = self.animation.advance(dt);
        self.process_events(events)?;
        self.tick_mutator();
        self.tick_connector_tracking();
        Ok(())
    }

    pub(crate) fn pause_internal(&mut self) {
        self.animation.pause();
    }

    pub(crate) fn resume_internal(&mut self) {
        self.animation.resume();
    }

    /// 非时序完成（尊重路障）
    pub(crate) fn finish_internal(&mut self) -> ChoreoResult<()> {
        if !self.in_progress {
            return Ok(());
        }
        let events = self.animation.finish();
        self.process_events(events)
    }

    /// 更新复合播放速率
    pub(crate) fn use_compounded_playback_rate(&mut self, outer_rate: f64) {
        self.animation
            .update_playback_rate(outer_rate * self.config.timing.playback_rate);
    }

    // ========== 相位边界副作用 ==========

    fn process_events(&mut self, events: Vec<PhaseEvent>) -> ChoreoResult<()> {
        for event in events {
            let result = match (self.animation.direction(), event) {
                (Direction::Forward, PhaseEvent::DelayFinished) => self.on_active_start_forward(),
                (Direction::Forward, PhaseEvent::ActiveFinished) => self.on_active_finish_forward(),
                (Direction::Backward, PhaseEvent::DelayFinished) => self.on_active_start_backward(),
                (Direction::Backward, PhaseEvent::ActiveFinished) => {
                    self.on_active_finish_backward()
                }
                (_, PhaseEvent::EndDelayFinished) => {
                    self.complete_run();
                    Ok(())
                }
            };

            if let Err(error) = result {
                // 钩子出错：暂停自身，拒绝播放承诺，错误沿 update 链上抛
                self.animation.pause();
                if let Some(signal) = &self.play_signal {
                    signal.reject(error.clone());
                }
                return Err(error);
            }
        }
        Ok(())
    }

    fn complete_run(&mut self) {
        self.in_progress = false;
        if let Some(signal) = self.play_signal.take() {
            signal.resolve();
        }
        debug!(clip = self.id.0, effect = %self.effect_name, "片段播放完毕");
    }

    /// 组合（如需要）并解析当前方向的效果体
    fn resolve_effect(&mut self, direction: Direction) -> ChoreoResult<()> {
        let needs_compose = self.composed.is_none()
            || self.composition_frequency == CompositionFrequency::EveryPlay;
        if needs_compose {
            self.composed = Some(self.generator.compose(&self.effect_context())?);
        }
        let composed = self.composed.as_ref().expect("组合结果已就绪");
        self.active_effect = Some(composed.resolve(direction, &self.effect_context())?);
        Ok(())
    }

    /// 正向激活段开始
    fn on_active_start_forward(&mut self) -> ChoreoResult<()> {
        self.category_on_start_forward()?;
        for class in &self.config.css_classes.to_add_on_start {
            self.target.add_class(class);
        }
        for class in &self.config.css_classes.to_remove_on_start {
            self.target.remove_class(class);
        }
        self.resolve_effect(Direction::Forward)?;
        self.call_mutator(0.0);
        Ok(())
    }

    /// 正向激活段结束
    ///
    /// 提交先于类别钩子：退场类效果在收尾时隐藏元素，
    /// 提交必须赶在元素脱离渲染之前。
    fn on_active_finish_forward(&mut self) -> ChoreoResult<()> {
        self.call_mutator(1.0);
        if self.config.commits_styles {
            self.commit_styles()?;
        }
        for class in &self.config.css_classes.to_add_on_finish {
            self.target.add_class(class);
        }
        for class in &self.config.css_classes.to_remove_on_finish {
            self.target.remove_class(class);
        }
        self.category_on_finish_forward()
    }

    /// 反向激活段开始
    fn on_active_start_backward(&mut self) -> ChoreoResult<()> {
        // 撤销收尾类
        for class in &self.config.css_classes.to_add_on_finish {
            self.target.remove_class(class);
        }
        for class in &self.config.css_classes.to_remove_on_finish {
            self.target.add_class(class);
        }
        self.category_on_start_backward()?;
        self.resolve_effect(Direction::Backward)?;
        self.call_mutator(0.0);
        Ok(())
    }

    /// 反向激活段结束
    fn on_active_finish_backward(&mut self) -> ChoreoResult<()> {
        self.call_mutator(1.0);
        if self.config.commits_styles {
            self.commit_styles()?;
        }
        // 撤销起始类
        for class in &self.config.css_classes.to_add_on_start {
            self.target.remove_class(class);
        }
        for class in &self.config.css_classes.to_remove_on_start {
            self.target.add_class(class);
        }
        self.category_on_finish_backward()
    }

    // ========== 类别生命周期 ==========

    fn category_on_start_forward(&mut self) -> ChoreoResult<()> {
        match &mut self.category_state {
            CategoryState::Entrance { stashed_class, .. } => {
                let target = &self.target;
                let found = if target.has_class(CLASS_HIDDEN) {
                    Some(CLASS_HIDDEN)
                } else if target.has_class(CLASS_INVISIBLE) {
                    Some(CLASS_INVISIBLE)
                } else {
                    None
                };
                match found {
                    Some(class) => {
                        target.remove_class(class);
                        *stashed_class = Some(class.to_string());
                        Ok(())
                    }
                    None => {
                        let message = if target.style("display").as_deref() == Some("none") {
                            "元素通过内联 CSS 隐藏，而非可识别的隐藏类".to_string()
                        } else {
                            "元素未被任何可识别的隐藏类标记".to_string()
                        };
                        Err(ChoreoError::Clip(ClipError::InvalidEntranceAttempt {
                            message,
                            location: self.location.clone(),
                        }))
                    }
                }
            }
            CategoryState::Exit { .. } => {
                if self.target.has_class(CLASS_HIDDEN) || self.target.has_class(CLASS_INVISIBLE) {
                    Err(ChoreoError::Clip(ClipError::InvalidExitAttempt {
                        message: "元素已处于隐藏状态".to_string(),
                        location: self.location.clone(),
                    }))
                } else {
                    Ok(())
                }
            }
            CategoryState::Scroller { anchors, stash } => {
                let (left, top) = self.target.scroll_offset();
                *stash = Some((left, top));
                anchors.borrow_mut().push(ScrollAnchor {
                    element: self.target.clone(),
                    left,
                    top,
                });
                Ok(())
            }
            CategoryState::ConnectorSetter {
                connector,
                point_a,
                point_b,
                tracking,
                stash,
            } => {
                *stash = Some(connector.stash());
                connector.set_point_a(Some(point_a.clone()));
                connector.set_point_b(Some(point_b.clone()));
                if let Some(enabled) = tracking {
                    connector.set_point_tracking(*enabled);
                }
                connector.update_endpoints();
                Ok(())
            }
            CategoryState::ConnectorEntrance { connector } => {
                connector.element().remove_class(CLASS_HIDDEN);
                connector.update_endpoints();
                if connector.point_tracking_enabled() {
                    connector.continuously_update_endpoints();
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn category_on_finish_forward(&mut self) -> ChoreoResult<()> {
        match &mut self.category_state {
            CategoryState::Exit { exit_type } => {
                match exit_type {
                    HideType::DisplayNone => self.target.add_class(CLASS_HIDDEN),
                    HideType::VisibilityHidden => self.target.add_class(CLASS_INVISIBLE),
                }
                Ok(())
            }
            CategoryState::Transition {
                remove_inline_styles_on_finish,
                touched,
            } => {
                if let Some(DirectionEffect::Frames { frames, .. }) = &self.active_effect {
                    *touched = frames.property_names();
                }
                if *remove_inline_styles_on_finish {
                    for prop in touched.clone() {
                        self.target.remove_style(&prop);
                    }
                }
                Ok(())
            }
            CategoryState::ConnectorExit { connector } => {
                connector.cancel_continuous_updates();
                connector.element().add_class(CLASS_HIDDEN);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn category_on_start_backward(&mut self) -> ChoreoResult<()> {
        match &mut self.category_state {
            CategoryState::Exit { exit_type } => {
                match exit_type {
                    HideType::DisplayNone => self.target.remove_class(CLASS_HIDDEN),
                    HideType::VisibilityHidden => self.target.remove_class(CLASS_INVISIBLE),
                }
                Ok(())
            }
            CategoryState::Scroller { anchors, .. } => {
                // 弹掉自己的锚点，回滚目标由暂存值决定
                anchors
                    .borrow_mut()
                    .retain(|anchor| !anchor.element.ptr_eq(&self.target));
                Ok(())
            }
            CategoryState::ConnectorSetter { connector, stash, .. } => {
                if let Some(stash) = stash.take() {
                    connector.restore(&stash);
                    connector.update_endpoints();
                }
                Ok(())
            }
            CategoryState::ConnectorExit { connector } => {
                connector.element().remove_class(CLASS_HIDDEN);
                connector.update_endpoints();
                if connector.point_tracking_enabled() {
                    connector.continuously_update_endpoints();
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn category_on_finish_backward(&mut self) -> ChoreoResult<()> {
        match &mut self.category_state {
            CategoryState::Entrance { stashed_class, .. } => {
                if let Some(class) = stashed_class.take() {
                    self.target.add_class(&class);
                }
                Ok(())
            }
            CategoryState::Scroller { stash, .. } => {
                if let Some((left, top)) = stash.take() {
                    self.target.scroll_to(left, top);
                }
                Ok(())
            }
            CategoryState::ConnectorEntrance { connector } => {
                connector.cancel_continuous_updates();
                connector.element().add_class(CLASS_HIDDEN);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    // ========== 逐帧效果 ==========

    /// 当前方向的有效缓动（反向取镜像）
    fn effective_easing(&self) -> crate::easing::EasingFunction {
        match self.animation.direction() {
            Direction::Forward => self.config.timing.easing,
            Direction::Backward => self.config.timing.easing.reversed(),
        }
    }

    /// 推进逐帧回调（播放头在激活段内时）
    fn tick_mutator(&mut self) {
        if let Some(raw) = self.animation.active_progress() {
            let eased = self.effective_easing().apply(raw);
            self.call_mutator(eased);
        }
    }

    fn call_mutator(&self, progress: f64) {
        if let Some(DirectionEffect::Mutator(mutator)) = &self.active_effect {
            mutator(&MutatorCtx {
                element: self.target.clone(),
                progress,
            });
        }
    }

    /// 连接线端点追踪帧
    fn tick_connector_tracking(&self) {
        match &self.category_state {
            CategoryState::ConnectorEntrance { connector }
            | CategoryState::ConnectorExit { connector }
            | CategoryState::ConnectorSetter { connector, .. } => connector.tick_tracking(),
            _ => {}
        }
    }

    // ========== 样式提交 ==========

    /// 把当前方向末帧样式写入内联样式
    fn commit_styles(&mut self) -> ChoreoResult<()> {
        let frames = match &self.active_effect {
            Some(DirectionEffect::Frames { frames, .. }) if !frames.is_empty() => frames.clone(),
            _ => return Ok(()),
        };

        if self.target.is_rendered() {
            self.write_final_styles(&frames);
            return Ok(());
        }

        if !self.config.commit_styles_forcefully {
            return Err(ChoreoError::Clip(ClipError::CommitStyles {
                message: "元素未渲染且未开启强制提交".to_string(),
                location: self.location.clone(),
            }));
        }

        // 临时强制显示再提交
        self.target.add_class(CLASS_FORCE_SHOW);
        if !self.target.is_rendered() {
            self.target.remove_class(CLASS_FORCE_SHOW);
            return Err(ChoreoError::Clip(ClipError::CommitStyles {
                message: "祖先元素未渲染，强制提交同样失败".to_string(),
                location: self.location.clone(),
            }));
        }
        self.write_final_styles(&frames);
        self.target.remove_class(CLASS_FORCE_SHOW);
        Ok(())
    }

    fn write_final_styles(&self, frames: &crate::effect::Keyframes) {
        for (prop, value) in frames.final_styles() {
            self.target.set_style(prop, value);
        }
    }
}

/// 类别状态种子（工厂传入的类别选项）
#[derive(Debug)]
pub(crate) enum CategoryStateSeed {
    Entrance { hide_now: Option<HideType> },
    Exit { exit_type: HideType },
    Emphasis,
    Motion,
    Transition { remove_inline_styles_on_finish: bool },
    Scroller { anchors: ScrollAnchorStack },
    ConnectorSetter {
        connector: Connector,
        point_a: ConnectorPoint,
        point_b: ConnectorPoint,
        tracking: Option<bool>,
    },
    ConnectorEntrance { connector: Connector },
    ConnectorExit { connector: Connector },
}

impl CategoryStateSeed {
    fn into_state(self) -> CategoryState {
        match self {
            Self::Entrance { hide_now } => CategoryState::Entrance {
                hide_now,
                stashed_class: None,
            },
            Self::Exit { exit_type } => CategoryState::Exit { exit_type },
            Self::Emphasis => CategoryState::Emphasis,
            Self::Motion => CategoryState::Motion,
            Self::Transition {
                remove_inline_styles_on_finish,
            } => CategoryState::Transition {
                remove_inline_styles_on_finish,
                touched: Vec::new(),
            },
            Self::Scroller { anchors } => CategoryState::Scroller {
                anchors,
                stash: None,
            },
            Self::ConnectorSetter {
                connector,
                point_a,
                point_b,
                tracking,
            } => CategoryState::ConnectorSetter {
                connector,
                point_a,
                point_b,
                tracking,
                stash: None,
            },
            Self::ConnectorEntrance { connector } => {
                CategoryState::ConnectorEntrance { connector }
            }
            Self::ConnectorExit { connector } => CategoryState::ConnectorExit { connector },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::{Keyframe, Keyframes};

    fn fade_generator() -> EffectGenerator {
        EffectGenerator::from_static_frames(
            Keyframes::new(vec![
                Keyframe::new(Some(0.0), vec![("opacity", "0")]),
                Keyframe::new(Some(1.0), vec![("opacity", "1")]),
            ]),
            None,
        )
    }

    fn entrance_clip(target: Element) -> AnimClip {
        AnimClip::new(
            ClipId(1),
            CategoryStateSeed::Entrance { hide_now: None },
            "~fade-in",
            target,
            EffectArgs::none(),
            fade_generator(),
            CompositionFrequency::OnFirstPlayOnly,
            ClipConfig {
                timing: ClipTiming {
                    duration: 100.0,
                    ..Default::default()
                },
                ..ClipConfig::for_category(EffectCategory::Entrance)
            },
        )
        .unwrap()
    }

    #[test]
    fn test_entrance_unhides_and_restores() {
        let target = Element::new("div");
        target.add_class(CLASS_HIDDEN);

        let mut clip = entrance_clip(target.clone());

        // 正向：摘掉隐藏类
        clip.play().unwrap();
        clip.update(200.0).unwrap();
        assert!(!clip.in_progress());
        assert!(!target.has_class(CLASS_HIDDEN));
        assert_eq!(target.style("opacity").as_deref(), Some("1"));

        // 反向：还原隐藏类
        clip.rewind().unwrap();
        clip.update(200.0).unwrap();
        assert!(target.has_class(CLASS_HIDDEN));
    }

    #[test]
    fn test_entrance_on_visible_element_fails() {
        let target = Element::new("div");
        let mut clip = entrance_clip(target);

        let result = clip.play();
        assert!(matches!(
            result,
            Err(ChoreoError::Clip(ClipError::InvalidEntranceAttempt { .. }))
        ));
        // 承诺被拒绝
        assert!(clip.play_waiter().is_rejected());
    }

    #[test]
    fn test_exit_hides_on_finish() {
        let target = Element::new("div");
        let mut clip = AnimClip::new(
            ClipId(2),
            CategoryStateSeed::Exit {
                exit_type: HideType::DisplayNone,
            },
            "~fade-out",
            target.clone(),
            EffectArgs::none(),
            fade_generator(),
            CompositionFrequency::OnFirstPlayOnly,
            ClipConfig {
                timing: ClipTiming {
                    duration: 100.0,
                    ..Default::default()
                },
                commits_styles: false,
                ..ClipConfig::for_category(EffectCategory::Exit)
            },
        )
        .unwrap();

        clip.play().unwrap();
        clip.update(150.0).unwrap();
        assert!(target.has_class(CLASS_HIDDEN));

        clip.rewind().unwrap();
        clip.update(150.0).unwrap();
        assert!(!target.has_class(CLASS_HIDDEN));
    }

    #[test]
    fn test_owned_clip_rejects_direct_control() {
        let target = Element::new("div");
        target.add_class(CLASS_HIDDEN);
        let mut clip = entrance_clip(target);
        clip.parent_sequence = Some(SequenceId(7));

        assert!(matches!(
            clip.play(),
            Err(ChoreoError::Clip(ClipError::ChildPlayback { .. }))
        ));
        assert!(matches!(
            clip.pause(),
            Err(ChoreoError::Clip(ClipError::ChildPlayback { .. }))
        ));
    }

    #[test]
    fn test_css_class_hooks_roundtrip() {
        let target = Element::new("div");
        let mut clip = AnimClip::new(
            ClipId(3),
            CategoryStateSeed::Emphasis,
            "~highlight",
            target.clone(),
            EffectArgs::none(),
            fade_generator(),
            CompositionFrequency::OnFirstPlayOnly,
            ClipConfig {
                timing: ClipTiming {
                    duration: 100.0,
                    ..Default::default()
                },
                css_classes: CssClasses {
                    to_add_on_start: vec!["active".to_string()],
                    to_add_on_finish: vec!["done".to_string()],
                    ..Default::default()
                },
                commits_styles: false,
                ..Default::default()
            },
        )
        .unwrap();

        clip.play().unwrap();
        clip.update(50.0).unwrap();
        assert!(target.has_class("active"));
        assert!(!target.has_class("done"));

        clip.update(100.0).unwrap();
        assert!(target.has_class("done"));

        clip.rewind().unwrap();
        clip.update(150.0).unwrap();
        assert!(!target.has_class("active"));
        assert!(!target.has_class("done"));
    }

    #[test]
    fn test_commit_styles_on_hidden_element_fails() {
        let parent = Element::new("section");
        let target = Element::new("div");
        parent.append_child(&target);
        target.add_class(CLASS_HIDDEN);

        // Emphasis 片段：目标被隐藏且未开启强制提交
        let mut clip = AnimClip::new(
            ClipId(4),
            CategoryStateSeed::Emphasis,
            "~pulse",
            target,
            EffectArgs::none(),
            fade_generator(),
            CompositionFrequency::OnFirstPlayOnly,
            ClipConfig {
                timing: ClipTiming {
                    duration: 50.0,
                    ..Default::default()
                },
                commits_styles: true,
                ..Default::default()
            },
        )
        .unwrap();

        clip.play().unwrap();
        let result = clip.update(100.0);
        assert!(matches!(
            result,
            Err(ChoreoError::Clip(ClipError::CommitStyles { .. }))
        ));
    }

    #[test]
    fn test_commit_styles_forcefully_succeeds() {
        let target = Element::new("div");
        target.add_class(CLASS_HIDDEN);

        let mut clip = AnimClip::new(
            ClipId(5),
            CategoryStateSeed::Emphasis,
            "~pulse",
            target.clone(),
            EffectArgs::none(),
            fade_generator(),
            CompositionFrequency::OnFirstPlayOnly,
            ClipConfig {
                timing: ClipTiming {
                    duration: 50.0,
                    ..Default::default()
                },
                commits_styles: true,
                commit_styles_forcefully: true,
                ..Default::default()
            },
        )
        .unwrap();

        clip.play().unwrap();
        clip.update(100.0).unwrap();
        assert_eq!(target.style("opacity").as_deref(), Some("1"));
        // 覆盖类已撤掉
        assert!(!target.has_class(CLASS_FORCE_SHOW));
    }

    #[test]
    fn test_transition_removes_inline_styles() {
        let target = Element::new("div");
        let mut clip = AnimClip::new(
            ClipId(6),
            CategoryStateSeed::Transition {
                remove_inline_styles_on_finish: true,
            },
            "~to-style",
            target.clone(),
            EffectArgs::none(),
            fade_generator(),
            CompositionFrequency::OnFirstPlayOnly,
            ClipConfig {
                timing: ClipTiming {
                    duration: 50.0,
                    ..Default::default()
                },
                commits_styles: true,
                ..Default::default()
            },
        )
        .unwrap();

        clip.play().unwrap();
        clip.update(100.0).unwrap();
        // 提交写入的 opacity 在收尾时被清掉
        assert!(target.style("opacity").is_none());
    }

    #[test]
    fn test_scroller_anchor_stack_roundtrip() {
        let target = Element::new("div");
        target.scroll_to(0.0, 120.0);
        let anchors: ScrollAnchorStack = Rc::new(RefCell::new(Vec::new()));

        let mut clip = AnimClip::new(
            ClipId(7),
            CategoryStateSeed::Scroller {
                anchors: Rc::clone(&anchors),
            },
            "~scroll-self",
            target.clone(),
            EffectArgs::none(),
            EffectGenerator::from_static_frames(Keyframes::empty(), None),
            CompositionFrequency::OnFirstPlayOnly,
            ClipConfig {
                timing: ClipTiming {
                    duration: 50.0,
                    ..Default::default()
                },
                commits_styles: false,
                ..Default::default()
            },
        )
        .unwrap();

        clip.play().unwrap();
        clip.update(100.0).unwrap();
        assert_eq!(anchors.borrow().len(), 1);
        assert_eq!(anchors.borrow()[0].top, 120.0);

        // 中途滚走
        target.scroll_to(0.0, 900.0);

        clip.rewind().unwrap();
        clip.update(100.0).unwrap();
        assert!(anchors.borrow().is_empty());
        // 回滚到播放前的偏移
        assert_eq!(target.scroll_offset(), (0.0, 120.0));
    }
}
