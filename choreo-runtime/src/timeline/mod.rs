//! # Timeline 模块
//!
//! 时间轴：有序序列列表 + 步进 / 跳转 / 跳过 / 暂停 / 变速。
//!
//! ## 执行模型
//!
//! ```text
//! step_forward() / step_backward()   发起一步
//! update(dt)                         驱动在播放中的序列；
//!                                    完成时推进索引并按自动连播规则续步
//! ```
//!
//! `loaded_seq_index` 的含义：0 = 第一个序列之前，
//! 序列数 = 最后一个序列之后。对作者暴露的步骤编号为
//! `loaded_seq_index + 1`（1 起始）。
//!
//! ## 结构锁
//!
//! 动画或跳转进行中拒绝增删序列；在已加载位置之前的插入/移除
//! 任何时候都被"时间悖论"错误拒绝。

mod buttons;
mod jump;

pub use buttons::{ButtonAction, PlaybackButton, PlaybackButtons};
pub use jump::{AutoplayDetection, JumpPosition, TagSearch, TagSearchDirection};

use serde::{Deserialize, Serialize};
use std::rc::Rc;
use tracing::debug;

use crate::clip::Direction;
use crate::error::{ChoreoError, ChoreoResult, TimelineError};
use crate::sequence::{AnimSequence, SequenceId};

/// 时间轴 ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimelineId(pub u64);

/// 快进档位的播放速率
const FAST_FORWARD_RATE: f64 = 7.0;

/// 时间轴配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineConfig {
    /// 名称（错误上下文与按钮配对使用）
    pub timeline_name: String,
    /// 调试模式（放大日志粒度）
    pub debug_mode: bool,
    /// 创建后是否自动配对播放按钮
    pub auto_links_buttons: bool,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            timeline_name: String::new(),
            debug_mode: false,
            auto_links_buttons: true,
        }
    }
}

/// 一步的推进状态
#[derive(Debug)]
struct StepState {
    direction: Direction,
    /// 正在播放/回退的序列索引
    active_index: usize,
    /// 完成后是否咨询自动连播
    autoplay: bool,
}

/// 时间轴
///
/// 拥有序列列表；由门面签发。
#[derive(Debug)]
pub struct AnimTimeline {
    id: TimelineId,
    sequences: Vec<AnimSequence>,
    loaded_seq_index: usize,
    config: TimelineConfig,
    is_paused: bool,
    skipping_on: bool,
    is_jumping: bool,
    current_direction: Direction,
    playback_rate: f64,
    step: Option<StepState>,
    buttons: PlaybackButtons,
}

impl AnimTimeline {
    /// 创建时间轴（仅供门面调用）
    pub(crate) fn new(id: TimelineId, config: TimelineConfig) -> Self {
        Self {
            id,
            sequences: Vec::new(),
            loaded_seq_index: 0,
            config,
            is_paused: false,
            skipping_on: false,
            is_jumping: false,
            current_direction: Direction::Forward,
            playback_rate: 1.0,
            step: None,
            buttons: PlaybackButtons::default(),
        }
    }

    /// 时间轴 ID
    pub fn id(&self) -> TimelineId {
        self.id
    }

    /// 配置
    pub fn config(&self) -> &TimelineConfig {
        &self.config
    }

    // ========== 状态 ==========

    /// 序列数量
    pub fn num_sequences(&self) -> usize {
        self.sequences.len()
    }

    /// 当前加载索引
    pub fn loaded_seq_index(&self) -> usize {
        self.loaded_seq_index
    }

    /// 作者可见的步骤编号（1 起始）
    pub fn step_number(&self) -> usize {
        self.loaded_seq_index + 1
    }

    /// 是否有一步在推进中
    pub fn is_animating(&self) -> bool {
        self.step.is_some()
    }

    /// 是否已暂停
    pub fn is_paused(&self) -> bool {
        self.is_paused
    }

    /// 跳过状态
    pub fn skipping_on(&self) -> bool {
        self.skipping_on
    }

    /// 是否在跳转中
    pub fn is_jumping(&self) -> bool {
        self.is_jumping
    }

    /// 最近一步的方向
    pub fn current_direction(&self) -> Direction {
        self.current_direction
    }

    /// 播放速率
    pub fn playback_rate(&self) -> f64 {
        self.playback_rate
    }

    /// 按索引访问序列
    pub fn sequence(&self, index: usize) -> Option<&AnimSequence> {
        self.sequences.get(index)
    }

    /// 按索引可变访问序列
    pub fn sequence_mut(&mut self, index: usize) -> Option<&mut AnimSequence> {
        self.sequences.get_mut(index)
    }

    /// 在播放中的序列索引集合
    pub fn in_progress_sequences(&self) -> Vec<usize> {
        self.sequences
            .iter()
            .enumerate()
            .filter(|(_, s)| s.in_progress())
            .map(|(i, _)| i)
            .collect()
    }

    /// 已配对的播放按钮
    pub fn playback_buttons(&self) -> &PlaybackButtons {
        &self.buttons
    }

    // ========== 结构 ==========

    fn reject_if_locked(&self, operation: &str) -> ChoreoResult<()> {
        if self.is_animating() {
            return Err(ChoreoError::Timeline(TimelineError::LockedOperation {
                operation: operation.to_string(),
                reason: "动画进行中".to_string(),
            }));
        }
        if self.is_jumping {
            return Err(ChoreoError::Timeline(TimelineError::LockedOperation {
                operation: operation.to_string(),
                reason: "跳转进行中".to_string(),
            }));
        }
        Ok(())
    }

    fn validate_child(sequence: &AnimSequence) -> ChoreoResult<()> {
        if sequence.parent_timeline.is_some() {
            return Err(ChoreoError::Timeline(TimelineError::InvalidChild {
                message: "序列已属于另一个时间轴".to_string(),
            }));
        }
        if sequence.is_finished() && sequence.was_played() {
            return Err(ChoreoError::Timeline(TimelineError::InvalidChild {
                message: "序列处于正向完成状态，不能再加入时间轴".to_string(),
            }));
        }
        Ok(())
    }

    /// 追加序列
    pub fn add_sequences(&mut self, sequences: Vec<AnimSequence>) -> ChoreoResult<()> {
        self.reject_if_locked("add_sequences")?;
        for sequence in &sequences {
            Self::validate_child(sequence)?;
        }
        for mut sequence in sequences {
            sequence.set_parent_timeline(Some(self.id));
            self.sequences.push(sequence);
        }
        Ok(())
    }

    /// 在指定位置插入序列
    ///
    /// 在已加载位置之前插入会破坏因果，被"时间悖论"错误拒绝。
    pub fn add_sequences_at(
        &mut self,
        index: usize,
        sequences: Vec<AnimSequence>,
    ) -> ChoreoResult<()> {
        self.reject_if_locked("add_sequences_at")?;
        if index < self.loaded_seq_index {
            return Err(ChoreoError::Timeline(TimelineError::TimeParadox {
                index,
                loaded_index: self.loaded_seq_index,
            }));
        }
        if index > self.sequences.len() {
            return Err(ChoreoError::Timeline(TimelineError::PositionOutOfBounds {
                target: index as isize,
                max: self.sequences.len(),
            }));
        }
        for sequence in &sequences {
            Self::validate_child(sequence)?;
        }
        for (offset, mut sequence) in sequences.into_iter().enumerate() {
            sequence.set_parent_timeline(Some(self.id));
            self.sequences.insert(index + offset, sequence);
        }
        Ok(())
    }

    /// 按 ID 移除序列
    ///
    /// 与按索引移除相同的约束：动画/跳转进行中拒绝；命中已加载位置
    /// 之前的序列以"时间悖论"拒绝。校验先于移除，任何一项被拒绝时
    /// 结构保持原样。
    pub fn remove_sequences(&mut self, ids: &[SequenceId]) -> ChoreoResult<Vec<AnimSequence>> {
        self.reject_if_locked("remove_sequences")?;

        let mut indices = Vec::with_capacity(ids.len());
        for &id in ids {
            let index = self
                .sequences
                .iter()
                .position(|s| s.id() == id)
                .ok_or(ChoreoError::Timeline(TimelineError::SequenceNotFound {
                    id: id.0,
                }))?;
            if index < self.loaded_seq_index {
                return Err(ChoreoError::Timeline(TimelineError::TimeParadox {
                    index,
                    loaded_index: self.loaded_seq_index,
                }));
            }
            indices.push(index);
        }
        indices.sort_unstable();
        indices.dedup();

        // 从后往前摘除，索引不互相挪动
        let mut removed = Vec::with_capacity(indices.len());
        for index in indices.into_iter().rev() {
            let mut sequence = self.sequences.remove(index);
            sequence.set_parent_timeline(None);
            removed.push(sequence);
        }
        removed.reverse();
        Ok(removed)
    }

    /// 移除指定区间的序列
    pub fn remove_sequences_at(
        &mut self,
        index: usize,
        count: usize,
    ) -> ChoreoResult<Vec<AnimSequence>> {
        self.reject_if_locked("remove_sequences_at")?;
        if index < self.loaded_seq_index {
            return Err(ChoreoError::Timeline(TimelineError::TimeParadox {
                index,
                loaded_index: self.loaded_seq_index,
            }));
        }
        if index + count > self.sequences.len() {
            return Err(ChoreoError::Timeline(TimelineError::PositionOutOfBounds {
                target: (index + count) as isize,
                max: self.sequences.len(),
            }));
        }
        let removed: Vec<AnimSequence> = self.sequences.drain(index..index + count).collect();
        Ok(removed
            .into_iter()
            .map(|mut s| {
                s.set_parent_timeline(None);
                s
            })
            .collect())
    }

    // ========== 步进 ==========

    /// 向前步进
    ///
    /// 播放当前加载位置的序列，完成后索引 +1，再按自动连播规则续步。
    pub fn step_forward(&mut self) -> ChoreoResult<()> {
        self.reject_if_locked("step_forward")?;
        self.step_once(Direction::Forward, self.skipping_on, true)
    }

    /// 向后步进
    pub fn step_backward(&mut self) -> ChoreoResult<()> {
        self.reject_if_locked("step_backward")?;
        self.step_once(Direction::Backward, self.skipping_on, true)
    }

    /// 发起一步（内部：跳转复用）
    pub(crate) fn step_once(
        &mut self,
        direction: Direction,
        skipping: bool,
        autoplay: bool,
    ) -> ChoreoResult<()> {
        let index = match direction {
            Direction::Forward => {
                if self.loaded_seq_index >= self.sequences.len() {
                    return Err(ChoreoError::Timeline(TimelineError::StepEdge {
                        direction: "前".to_string(),
                        step_number: self.step_number(),
                        num_sequences: self.sequences.len(),
                    }));
                }
                self.loaded_seq_index
            }
            Direction::Backward => {
                if self.loaded_seq_index == 0 {
                    return Err(ChoreoError::Timeline(TimelineError::StepEdge {
                        direction: "后".to_string(),
                        step_number: self.step_number(),
                        num_sequences: self.sequences.len(),
                    }));
                }
                self.loaded_seq_index - 1
            }
        };

        self.current_direction = direction;
        self.fill_sequence_location(index);
        debug!(
            timeline = %self.config.timeline_name,
            step = self.step_number(),
            ?direction,
            "时间轴步进"
        );

        self.step = Some(StepState {
            direction,
            active_index: index,
            autoplay,
        });
        if let Err(error) = self.sequences[index].start_run(direction, skipping, self.playback_rate)
        {
            if self.sequences[index].is_paused() {
                // 片段钩子错误：暂停根结构供作者检视，保留本步现场
                self.is_paused = true;
            } else {
                // 提交/结构错误：同步上抛，不留现场
                self.step = None;
            }
            return Err(error);
        }
        self.drive(0.0)
    }

    fn fill_sequence_location(&mut self, index: usize) {
        let name = if self.config.timeline_name.is_empty() {
            None
        } else {
            Some(self.config.timeline_name.clone())
        };
        let step = self.step_number();
        self.sequences[index].fill_location(name, Some(step), Some(index));
    }

    /// 推进一帧
    ///
    /// 驱动在播放中的序列；序列完成时推进加载索引并按自动连播
    /// 规则续步。片段钩子抛出的错误会把时间轴暂停后上抛。
    pub fn update(&mut self, dt: f64) -> ChoreoResult<()> {
        if self.config.debug_mode {
            tracing::trace!(
                timeline = %self.config.timeline_name,
                dt,
                paused = self.is_paused,
                "时间轴推进"
            );
        }
        if self.is_paused {
            return Ok(());
        }
        self.drive(dt)
    }

    fn drive(&mut self, dt: f64) -> ChoreoResult<()> {
        let mut dt = dt;
        loop {
            let Some(state) = &self.step else { break };
            let index = state.active_index;
            let direction = state.direction;
            let autoplay = state.autoplay;

            if self.sequences[index].in_progress() {
                if let Err(error) = self.sequences[index].update_internal(dt, self.playback_rate) {
                    // 错误路由：暂停根结构，供作者检视半播状态
                    self.is_paused = true;
                    return Err(error);
                }
                dt = 0.0;
            }
            if self.sequences[index].in_progress() {
                break;
            }

            // 本步的序列已完成：推进索引
            self.loaded_seq_index = match direction {
                Direction::Forward => index + 1,
                Direction::Backward => index,
            };
            debug!(
                timeline = %self.config.timeline_name,
                loaded = self.loaded_seq_index,
                "一步完成"
            );

            // 自动连播判定
            let next_index = if autoplay {
                match direction {
                    Direction::Forward => {
                        let loaded = self.loaded_seq_index;
                        (loaded < self.sequences.len() && self.autoplay_boundary(loaded))
                            .then_some(loaded)
                    }
                    Direction::Backward => {
                        let loaded = self.loaded_seq_index;
                        (loaded > 0 && self.autoplay_boundary(loaded)).then(|| loaded - 1)
                    }
                }
            } else {
                None
            };

            match next_index {
                Some(next) => {
                    self.fill_sequence_location(next);
                    self.step = Some(StepState {
                        direction,
                        active_index: next,
                        autoplay,
                    });
                    let skipping = self.skipping_on;
                    if let Err(error) =
                        self.sequences[next].start_run(direction, skipping, self.playback_rate)
                    {
                        if self.sequences[next].is_paused() {
                            self.is_paused = true;
                        } else {
                            self.step = None;
                        }
                        return Err(error);
                    }
                }
                None => {
                    self.step = None;
                }
            }
        }
        Ok(())
    }

    /// 边界 `index` 上的自动连播谓词
    ///
    /// 边界位于序列 `index - 1` 与 `index` 之间：
    /// `前者.autoplays_next_sequence || 后者.autoplays`。
    pub(crate) fn autoplay_boundary(&self, index: usize) -> bool {
        let prev_chains = index >= 1
            && self
                .sequences
                .get(index - 1)
                .map(|s| s.config().autoplays_next_sequence)
                .unwrap_or(false);
        let next_autoplays = self
            .sequences
            .get(index)
            .map(|s| s.config().autoplays)
            .unwrap_or(false);
        prev_chains || next_autoplays
    }

    // ========== 暂停 / 跳过 / 变速 ==========

    /// 暂停
    ///
    /// 广播给在播放中的序列；跳转进行中拒绝。
    pub fn pause(&mut self) -> ChoreoResult<()> {
        if self.is_jumping {
            return Err(ChoreoError::Timeline(TimelineError::LockedOperation {
                operation: "pause".to_string(),
                reason: "跳转进行中".to_string(),
            }));
        }
        self.force_pause();
        Ok(())
    }

    /// 恢复
    pub fn unpause(&mut self) -> ChoreoResult<()> {
        if self.is_jumping {
            return Err(ChoreoError::Timeline(TimelineError::LockedOperation {
                operation: "unpause".to_string(),
                reason: "跳转进行中".to_string(),
            }));
        }
        self.force_unpause();
        Ok(())
    }

    pub(crate) fn force_pause(&mut self) {
        if !self.is_paused {
            self.is_paused = true;
            for sequence in &mut self.sequences {
                if sequence.in_progress() {
                    sequence.pause_internal();
                }
            }
        }
    }

    pub(crate) fn force_unpause(&mut self) {
        if self.is_paused {
            self.is_paused = false;
            for sequence in &mut self.sequences {
                if sequence.in_progress() {
                    sequence.unpause_internal();
                }
            }
        }
    }

    /// 开启跳过
    ///
    /// 先把在播放中的序列非时序完成，再置跳过态；
    /// 之后启动的序列以跳过模式运行。
    pub fn turn_skipping_on(&mut self) -> ChoreoResult<()> {
        self.finish_in_progress_sequences()?;
        self.skipping_on = true;
        Ok(())
    }

    /// 关闭跳过
    pub fn turn_skipping_off(&mut self) {
        self.skipping_on = false;
    }

    /// 切换跳过状态
    pub fn toggle_skipping(&mut self) -> ChoreoResult<bool> {
        if self.skipping_on {
            self.turn_skipping_off();
        } else {
            self.turn_skipping_on()?;
        }
        Ok(self.skipping_on)
    }

    /// 非时序完成在播放中的序列
    ///
    /// 未解析的路障仍然生效：被路障挡住的序列保持挂起。
    pub fn finish_in_progress_sequences(&mut self) -> ChoreoResult<()> {
        let rate = self.playback_rate;
        for index in 0..self.sequences.len() {
            if self.sequences[index].in_progress() {
                if let Err(error) = self.sequences[index].finish_internal(rate) {
                    self.is_paused = true;
                    return Err(error);
                }
            }
        }
        self.drive(0.0)
    }

    /// 设置播放速率并广播到在播放中的子结构
    pub fn set_playback_rate(&mut self, rate: f64) {
        self.playback_rate = rate;
        for sequence in &mut self.sequences {
            if sequence.in_progress() {
                sequence.use_compounded_playback_rate(rate);
            }
        }
    }

    pub(crate) fn set_jumping(&mut self, jumping: bool) {
        self.is_jumping = jumping;
    }

    pub(crate) fn set_skipping_flag(&mut self, skipping: bool) {
        self.skipping_on = skipping;
    }

    // ========== 播放按钮 ==========

    /// 配对播放按钮
    pub fn link_playback_buttons(
        &mut self,
        candidates: &[Rc<dyn PlaybackButton>],
        subset: Option<&[ButtonAction]>,
    ) {
        self.buttons = PlaybackButtons::link(&self.config.timeline_name, candidates, subset);
    }

    /// 按下某个已配对的按钮
    pub fn press_button(&mut self, action: ButtonAction) -> ChoreoResult<()> {
        let button = self.buttons.slot(action).clone();
        match action {
            ButtonAction::StepForward => {
                if let Some(b) = &button {
                    b.style_activation();
                }
                let result = self.step_forward();
                if let Some(b) = &button {
                    b.style_deactivation();
                }
                result
            }
            ButtonAction::StepBackward => {
                if let Some(b) = &button {
                    b.style_activation();
                }
                let result = self.step_backward();
                if let Some(b) = &button {
                    b.style_deactivation();
                }
                result
            }
            ButtonAction::Pause => {
                if self.is_paused {
                    self.unpause()?;
                    if let Some(b) = &button {
                        b.style_deactivation();
                    }
                } else {
                    self.pause()?;
                    if let Some(b) = &button {
                        b.style_activation();
                    }
                }
                Ok(())
            }
            ButtonAction::FastForward => {
                if (self.playback_rate - FAST_FORWARD_RATE).abs() < f64::EPSILON {
                    self.set_playback_rate(1.0);
                    if let Some(b) = &button {
                        b.style_deactivation();
                    }
                } else {
                    self.set_playback_rate(FAST_FORWARD_RATE);
                    if let Some(b) = &button {
                        b.style_activation();
                    }
                }
                Ok(())
            }
            ButtonAction::ToggleSkipping => {
                let on = self.toggle_skipping()?;
                if let Some(b) = &button {
                    if on {
                        b.style_activation();
                    } else {
                        b.style_deactivation();
                    }
                }
                Ok(())
            }
        }
    }
}
