//! # Sequence 模块
//!
//! 序列：有序片段列表 + 组内并行调度。
//!
//! ## 执行模型
//!
//! 每次播放/回退分两步：
//!
//! 1. **提交**（[`commit`]）：从片段的编排标志与时序计算分组和
//!    每组的相位顺序表
//! 2. **执行**：按组串行、组内并行地启动片段；组内顺序由
//!    完整性阻塞钉住，不受宿主时钟抖动影响
//!
//! 正向时组内按插入顺序启动，每个片段等前一片段的激活段开始；
//! 反向时从最后一组的最后一个片段开始，前一片段等待两者在正向
//! 时间上的交叠量被回退完。

mod commit;

pub(crate) use commit::{commit_clips, CommitPlan};

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::clip::{AnimClip, Direction, LaunchMode, Phase, PhasePosition};
use crate::error::{ChoreoError, ChoreoResult, ErrorLocation, SequenceError};
use crate::signal::{signal_pair, Signal, Waiter};
use crate::timeline::TimelineId;

/// 序列 ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SequenceId(pub u64);

/// 序列配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceConfig {
    /// 上一序列完成后自动播放本序列
    pub autoplays: bool,
    /// 本序列完成后自动播放下一序列
    pub autoplays_next_sequence: bool,
    /// 序列播放速率（与时间轴、片段速率相乘）
    pub playback_rate: f64,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            autoplays: false,
            autoplays_next_sequence: false,
            playback_rate: 1.0,
        }
    }
}

/// 边界处理器
///
/// 返回错误的处理器会像片段钩子错误一样沿 update 链上抛。
pub type Handler = Box<dyn FnMut() -> ChoreoResult<()>>;

/// 序列边界处理器集合
#[derive(Default)]
pub struct SequenceHandlers {
    /// 正向播放启动后（提交完成、片段启动前）
    pub on_start_do: Option<Handler>,
    /// 回退结束时
    pub on_start_undo: Option<Handler>,
    /// 正向播放结束后
    pub on_finish_do: Option<Handler>,
    /// 回退开始时
    pub on_finish_undo: Option<Handler>,
}

impl fmt::Debug for SequenceHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SequenceHandlers")
            .field("on_start_do", &self.on_start_do.is_some())
            .field("on_start_undo", &self.on_start_undo.is_some())
            .field("on_finish_do", &self.on_finish_do.is_some())
            .field("on_finish_undo", &self.on_finish_undo.is_some())
            .finish()
    }
}

/// 运行状态
#[derive(Debug)]
struct RunState {
    direction: Direction,
    /// 跳过模式（启动即非时序推进；未解析的路障仍会停住）
    skipping: bool,
    /// 已完成的组数
    groups_done: usize,
    /// 当前组内已启动的片段数
    launch_cursor: usize,
    /// 下一次启动的门（前一片段的越过承诺）
    gate: Option<Waiter>,
    /// 最近一次观察到的外层（时间轴）速率
    outer_rate: f64,
}

/// 序列
///
/// 拥有片段列表；由门面签发，至多加入一个时间轴。
#[derive(Debug)]
pub struct AnimSequence {
    id: SequenceId,
    clips: Vec<AnimClip>,
    description: Option<String>,
    tag: Option<String>,
    config: SequenceConfig,
    /// 父时间轴（反向引用，不拥有）
    pub(crate) parent_timeline: Option<TimelineId>,
    plan: CommitPlan,
    run: Option<RunState>,
    in_progress: bool,
    is_paused: bool,
    is_finished: bool,
    was_played: bool,
    was_rewound: bool,
    using_finish: bool,
    fully_finished: (Signal, Waiter),
    handlers: SequenceHandlers,
    /// 错误上下文（时间轴坐标由父结构补全）
    location: ErrorLocation,
}

impl AnimSequence {
    /// 创建序列（仅供门面调用）
    pub(crate) fn new(id: SequenceId, config: SequenceConfig) -> Self {
        Self {
            id,
            clips: Vec::new(),
            description: None,
            tag: None,
            config,
            parent_timeline: None,
            plan: CommitPlan::default(),
            run: None,
            in_progress: false,
            is_paused: false,
            is_finished: false,
            was_played: false,
            was_rewound: false,
            using_finish: false,
            fully_finished: signal_pair(),
            handlers: SequenceHandlers::default(),
            location: ErrorLocation::default(),
        }
    }

    /// 序列 ID
    pub fn id(&self) -> SequenceId {
        self.id
    }

    /// 配置
    pub fn config(&self) -> &SequenceConfig {
        &self.config
    }

    /// 设置描述
    pub fn set_description(&mut self, description: impl Into<String>) {
        let description = description.into();
        self.location.sequence_description = Some(description.clone());
        self.description = Some(description);
    }

    /// 描述
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// 设置可检索标签
    pub fn set_tag(&mut self, tag: impl Into<String>) {
        let tag = tag.into();
        self.location.sequence_tag = Some(tag.clone());
        self.tag = Some(tag);
    }

    /// 标签
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    /// 设置边界处理器
    pub fn set_handlers(&mut self, handlers: SequenceHandlers) {
        self.handlers = handlers;
    }

    // ========== 状态 ==========

    /// 是否在播放中
    pub fn in_progress(&self) -> bool {
        self.in_progress
    }

    /// 是否推进中
    pub fn is_running(&self) -> bool {
        self.in_progress && !self.is_paused
    }

    /// 是否已暂停
    pub fn is_paused(&self) -> bool {
        self.is_paused
    }

    /// 最近一轮是否已完成
    pub fn is_finished(&self) -> bool {
        self.is_finished
    }

    /// 最近完成的一轮是正向
    pub fn was_played(&self) -> bool {
        self.was_played
    }

    /// 最近完成的一轮是回退
    pub fn was_rewound(&self) -> bool {
        self.was_rewound
    }

    /// 是否处于 finish 驱动中
    pub fn using_finish(&self) -> bool {
        self.using_finish
    }

    /// 本轮（或上一轮）的完成承诺
    pub fn fully_finished(&self) -> Waiter {
        self.fully_finished.1.clone()
    }

    /// 在播放中的片段数
    pub fn in_progress_clip_count(&self) -> usize {
        self.clips.iter().filter(|c| c.in_progress()).count()
    }

    // ========== 结构 ==========

    /// 片段数量
    pub fn num_clips(&self) -> usize {
        self.clips.len()
    }

    /// 按索引访问片段
    pub fn clip(&self, index: usize) -> Option<&AnimClip> {
        self.clips.get(index)
    }

    /// 按索引可变访问片段（用于附加路障等）
    pub fn clip_mut(&mut self, index: usize) -> Option<&mut AnimClip> {
        self.clips.get_mut(index)
    }

    /// 追加片段
    ///
    /// 片段自此归本序列所有，直接的播放控制将被拒绝。
    pub fn add_clips(&mut self, clips: Vec<AnimClip>) -> ChoreoResult<()> {
        if self.in_progress {
            return Err(ChoreoError::Sequence(SequenceError::LockedOperation {
                operation: "add_clips".to_string(),
                reason: "序列正在播放".to_string(),
                location: self.location.clone(),
            }));
        }
        for mut clip in clips {
            clip.parent_sequence = Some(self.id);
            clip.parent_timeline = self.parent_timeline;
            self.clips.push(clip);
        }
        Ok(())
    }

    /// 时间轴归属变化时同步片段的反向引用
    pub(crate) fn set_parent_timeline(&mut self, timeline: Option<TimelineId>) {
        self.parent_timeline = timeline;
        for clip in &mut self.clips {
            clip.parent_timeline = timeline;
        }
    }

    /// 父结构补全错误上下文坐标
    pub(crate) fn fill_location(
        &mut self,
        timeline_name: Option<String>,
        step_number: Option<usize>,
        sequence_index: Option<usize>,
    ) {
        self.location.timeline_name = timeline_name;
        self.location.step_number = step_number;
        self.location.sequence_index = sequence_index;
    }

    fn reject_if_owned(&self, operation: &str) -> ChoreoResult<()> {
        if self.parent_timeline.is_some() {
            return Err(ChoreoError::Sequence(SequenceError::ChildPlayback {
                operation: operation.to_string(),
                location: self.location.clone(),
            }));
        }
        Ok(())
    }

    // ========== 播放控制（独立序列） ==========

    /// 正向播放
    pub fn play(&mut self) -> ChoreoResult<Waiter> {
        self.reject_if_owned("play")?;
        self.start_run(Direction::Forward, false, 1.0)
    }

    /// 回退
    pub fn rewind(&mut self) -> ChoreoResult<Waiter> {
        self.reject_if_owned("rewind")?;
        self.start_run(Direction::Backward, false, 1.0)
    }

    /// 暂停
    pub fn pause(&mut self) -> ChoreoResult<()> {
        self.reject_if_owned("pause")?;
        self.pause_internal();
        Ok(())
    }

    /// 恢复
    pub fn unpause(&mut self) -> ChoreoResult<()> {
        self.reject_if_owned("unpause")?;
        self.unpause_internal();
        Ok(())
    }

    /// 非时序完成
    ///
    /// 未播放过（或最近一轮是回退）时先发起一轮正向播放，
    /// 让 `using_finish` 能被观察到。暂停或已在 finish 中为无操作。
    pub fn finish(&mut self) -> ChoreoResult<Waiter> {
        self.reject_if_owned("finish")?;
        self.finish_internal(1.0)
    }

    /// 推进（独立序列由宿主驱动）
    pub fn update(&mut self, dt: f64) -> ChoreoResult<bool> {
        self.reject_if_owned("update")?;
        self.update_internal(dt, 1.0)
    }

    // ========== 播放控制（内部 / 时间轴驱动） ==========

    /// 发起一轮播放
    ///
    /// # 参数
    /// - `direction`: 播放方向
    /// - `skipping`: 跳过模式（时间轴 skipping / 跳转时为 true）
    /// - `outer_rate`: 外层（时间轴）播放速率
    pub(crate) fn start_run(
        &mut self,
        direction: Direction,
        skipping: bool,
        outer_rate: f64,
    ) -> ChoreoResult<Waiter> {
        if self.in_progress {
            return Err(ChoreoError::Sequence(SequenceError::LockedOperation {
                operation: "play".to_string(),
                reason: "序列正在播放".to_string(),
                location: self.location.clone(),
            }));
        }
        if self.clips.is_empty() {
            return Err(ChoreoError::Sequence(SequenceError::NoClips {
                location: self.location.clone(),
            }));
        }

        debug!(sequence = self.id.0, ?direction, skipping, "序列提交并启动");

        // 提交
        self.plan = commit_clips(&mut self.clips);
        let location = self.location.clone();
        for clip in &mut self.clips {
            clip.fill_location(&location);
        }

        // 完整性阻塞：钉住组内激活段完成顺序
        self.attach_integrity_blocks(direction)?;

        // 边界处理器
        match direction {
            Direction::Forward => {
                if let Some(handler) = &mut self.handlers.on_start_do {
                    handler()?;
                }
            }
            Direction::Backward => {
                if let Some(handler) = &mut self.handlers.on_finish_undo {
                    handler()?;
                }
            }
        }

        self.fully_finished = signal_pair();
        self.using_finish = false;
        self.in_progress = true;
        self.is_paused = false;
        self.is_finished = false;
        self.run = Some(RunState {
            direction,
            skipping,
            groups_done: 0,
            launch_cursor: 0,
            gate: None,
            outer_rate,
        });

        // 立即驱动一次，让零延迟/跳过模式同步推进
        self.update_internal(0.0, outer_rate)?;
        Ok(self.fully_finished())
    }

    /// 按方向附加组内完整性阻塞
    fn attach_integrity_blocks(&mut self, direction: Direction) -> ChoreoResult<()> {
        let orders: Vec<Vec<usize>> = self
            .plan
            .groupings
            .iter()
            .map(|g| match direction {
                Direction::Forward => g.active_finish_order.clone(),
                Direction::Backward => g.backward_active_finish_order.clone(),
            })
            .collect();

        for order in orders {
            for j in 1..order.len() {
                let promise = self.clips[order[j - 1]].generate_time_promise(
                    direction,
                    Phase::Active,
                    &PhasePosition::End,
                )?;
                self.clips[order[j]].add_integrity_blocks(
                    direction,
                    Phase::Active,
                    &PhasePosition::End,
                    vec![promise],
                )?;
            }
        }
        Ok(())
    }

    pub(crate) fn pause_internal(&mut self) {
        if self.in_progress && !self.is_paused {
            self.is_paused = true;
            for clip in &mut self.clips {
                if clip.in_progress() {
                    clip.pause_internal();
                }
            }
        }
    }

    pub(crate) fn unpause_internal(&mut self) {
        if self.in_progress && self.is_paused {
            self.is_paused = false;
            for clip in &mut self.clips {
                if clip.in_progress() {
                    clip.resume_internal();
                }
            }
        }
    }

    /// 非时序完成（内部）
    pub(crate) fn finish_internal(&mut self, outer_rate: f64) -> ChoreoResult<Waiter> {
        // 暂停中或已在 finish 中：无操作
        if self.is_paused || self.using_finish {
            return Ok(self.fully_finished());
        }

        if !self.in_progress {
            if self.was_played && !self.was_rewound {
                // 已正向完成：无事可做
                return Ok(self.fully_finished());
            }
            self.start_run(Direction::Forward, false, outer_rate)?;
        }

        // start_run 可能已同步跑完（零时长结构），此时无须进入 finish 驱动
        if self.in_progress {
            self.using_finish = true;
            if let Err(error) = self.finish_running_clips() {
                self.pause_internal();
                return Err(error);
            }
            self.update_internal(0.0, outer_rate)?;
        }
        Ok(self.fully_finished())
    }

    fn finish_running_clips(&mut self) -> ChoreoResult<()> {
        for clip in &mut self.clips {
            if clip.in_progress() {
                clip.finish_internal()?;
            }
        }
        Ok(())
    }

    /// 更新复合播放速率（广播给在播放中的片段）
    pub(crate) fn use_compounded_playback_rate(&mut self, outer_rate: f64) {
        let rate = outer_rate * self.config.playback_rate;
        for clip in &mut self.clips {
            if clip.in_progress() {
                clip.use_compounded_playback_rate(rate);
            }
        }
    }

    /// 推进一帧
    ///
    /// 片段推进与启动交替进行直到收不到任何进展：跳过/finish 驱动中，
    /// 后启动的片段会解析先启动片段的完整性阻塞，被放行的片段要在
    /// 同一次调用里继续推进，否则瞬时跳转无法同步收尾。
    ///
    /// # 返回
    /// 本次推进中序列是否完成
    pub(crate) fn update_internal(&mut self, dt: f64, outer_rate: f64) -> ChoreoResult<bool> {
        if !self.in_progress || self.is_paused {
            return Ok(false);
        }
        if let Some(run) = &mut self.run {
            run.outer_rate = outer_rate;
        }
        let rate = outer_rate * self.config.playback_rate;
        let mut dt = dt;

        loop {
            let mut progressed = false;

            // 1. 推进在播放中的片段（第二轮起用 0，重查刚放行的阻塞点）
            for index in 0..self.clips.len() {
                if self.clips[index].in_progress() {
                    if let Err(error) = self.clips[index].update_internal(dt, rate) {
                        self.pause_internal();
                        self.fully_finished.0.reject(error.clone());
                        return Err(error);
                    }
                    if !self.clips[index].in_progress() {
                        progressed = true;
                    }
                }
            }
            dt = 0.0;

            // 2. 推进启动游标（门已解析时可能一次启动多个）
            loop {
                let Some(run) = &self.run else { break };
                let total_groups = self.plan.groupings.len();
                if run.groups_done >= total_groups {
                    break;
                }
                let group_index = match run.direction {
                    Direction::Forward => run.groups_done,
                    Direction::Backward => total_groups - 1 - run.groups_done,
                };
                let group_len = self.plan.groupings[group_index].clips.len();

                if run.launch_cursor < group_len {
                    if let Some(gate) = &run.gate {
                        if gate.is_pending() {
                            break;
                        }
                    }
                    if let Err(error) = self.launch_next(group_index) {
                        self.pause_internal();
                        self.fully_finished.0.reject(error.clone());
                        return Err(error);
                    }
                    progressed = true;
                } else {
                    // 本组全部启动：等全部片段到达完整终点后进入下一组
                    let all_done = self.plan.groupings[group_index]
                        .end_delay_finish_order
                        .iter()
                        .all(|&i| !self.clips[i].in_progress());
                    if !all_done {
                        break;
                    }
                    let run = self.run.as_mut().expect("运行状态存在");
                    run.groups_done += 1;
                    run.launch_cursor = 0;
                    run.gate = None;
                    progressed = true;
                }
            }

            // 3. 完成检查
            let done = self
                .run
                .as_ref()
                .map(|r| r.groups_done >= self.plan.groupings.len())
                .unwrap_or(false);
            if done {
                self.complete_run()?;
                return Ok(true);
            }
            if !progressed {
                return Ok(false);
            }
        }
    }

    /// 启动当前组的下一个片段并架好后继的门
    fn launch_next(&mut self, group_index: usize) -> ChoreoResult<()> {
        let run = self.run.as_ref().expect("运行状态存在");
        let direction = run.direction;
        let skipping = run.skipping;
        let cursor = run.launch_cursor;
        let group = &self.plan.groupings[group_index];
        let group_len = group.clips.len();

        // 正向按插入顺序，反向从组尾开始
        let clip_index = match direction {
            Direction::Forward => group.clips[cursor],
            Direction::Backward => group.clips[group_len - 1 - cursor],
        };
        let next_index = if cursor + 1 < group_len {
            Some(match direction {
                Direction::Forward => group.clips[cursor + 1],
                Direction::Backward => group.clips[group_len - 2 - cursor],
            })
        } else {
            None
        };

        let mode = if skipping {
            LaunchMode::Skip
        } else if self.using_finish {
            LaunchMode::Finish
        } else {
            LaunchMode::Normal
        };
        let rate = run.outer_rate * self.config.playback_rate;

        // 门必须在启动之前注册：跳过/完成模式下启动本身就会把
        // 播放头推过门的位置
        let gate = match (direction, next_index) {
            (_, None) => None,
            (Direction::Forward, Some(_)) => {
                // 等当前片段的激活段开始（延迟走完）
                Some(self.clips[clip_index].generate_time_promise(
                    Direction::Forward,
                    Phase::Active,
                    &PhasePosition::Beginning,
                )?)
            }
            (Direction::Backward, Some(next)) => {
                let curr_sched = self.clips[clip_index]
                    .scheduled_times()
                    .expect("提交已完成");
                let next_sched = self.clips[next].scheduled_times().expect("提交已完成");
                if next_sched.full_finish > curr_sched.full_start {
                    // 正向时间上交叠：等当前片段回退完交叠量（超出整体长度时封顶）
                    let whole = self.clips[clip_index].config().timing.full_duration();
                    let overlap = (next_sched.full_finish - curr_sched.full_start).min(whole);
                    Some(self.clips[clip_index].generate_time_promise(
                        Direction::Backward,
                        Phase::Whole,
                        &PhasePosition::Millis(overlap),
                    )?)
                } else {
                    // 无交叠：等当前片段的反向延迟段开始
                    Some(self.clips[clip_index].generate_time_promise(
                        Direction::Backward,
                        Phase::Delay,
                        &PhasePosition::Beginning,
                    )?)
                }
            }
        };

        {
            let run = self.run.as_mut().expect("运行状态存在");
            run.launch_cursor += 1;
            run.gate = gate;
        }
        self.clips[clip_index].launch(direction, mode, rate)
    }

    /// 一轮播放完成：边界处理器、状态标志、完成承诺
    fn complete_run(&mut self) -> ChoreoResult<()> {
        let direction = self
            .run
            .take()
            .map(|r| r.direction)
            .expect("运行状态存在");
        self.in_progress = false;
        self.using_finish = false;

        match direction {
            Direction::Forward => {
                if let Some(handler) = &mut self.handlers.on_finish_do {
                    handler()?;
                }
                self.is_finished = true;
                self.was_played = true;
                self.was_rewound = false;
            }
            Direction::Backward => {
                if let Some(handler) = &mut self.handlers.on_start_undo {
                    handler()?;
                }
                self.is_finished = true;
                self.was_rewound = true;
                self.was_played = false;
            }
        }

        self.fully_finished.0.resolve();
        debug!(sequence = self.id.0, ?direction, "序列一轮播放完成");
        Ok(())
    }
}
