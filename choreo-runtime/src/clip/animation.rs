//! # Animation 模块
//!
//! 片段动画：单个片段的相位状态机。
//!
//! ## 相位模型
//!
//! 任一方向上，播放头都沿三段相位推进：
//!
//! ```text
//! delayPhase -> activePhase -> endDelayPhase
//! ```
//!
//! 反向播放使用交换后的时间轴：反向 delayPhase 的长度等于正向
//! endDelay，反之亦然。`Whole` 指三段的连接整体。
//!
//! ## 等待机制
//!
//! - **时间承诺**：播放头越过注册位置时解析（含暂停/变速的正确处理，
//!   因为推进只看播放头自身位置）
//! - **阻塞点**：播放头到达注册位置时停住，等成员全部结束
//!   （allSettled 语义）后自动恢复。完整性阻塞由引擎插入，
//!   路障由作者插入，两者仅来源不同
//!
//! 方向反转后，注册在当前播放头之前（含位置 0）的越过承诺会在下次
//! 推进时按注册顺序立即解析。

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::timing::ClipTiming;
use crate::error::{ChoreoError, ClipError};
use crate::signal::{signal_pair, Signal, Waiter};

/// 播放方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// 正向
    Forward,
    /// 反向
    Backward,
}

impl Direction {
    /// 反方向
    pub fn reversed(&self) -> Self {
        match self {
            Self::Forward => Self::Backward,
            Self::Backward => Self::Forward,
        }
    }
}

/// 相位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// 起始延迟段
    Delay,
    /// 激活段
    Active,
    /// 结尾延迟段
    EndDelay,
    /// 三段整体
    Whole,
}

/// 相位位置字面量
///
/// 可接受的形式：`beginning` / `end` / 非负整数毫秒 / `"<n>%"`（0-100）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PhasePosition {
    Beginning,
    End,
    /// 相位内毫秒偏移
    Millis(f64),
    /// 相位长度百分比
    Percent(f64),
}

impl PhasePosition {
    /// 解析为相位内偏移
    ///
    /// # 参数
    /// - `phase_len`: 相位长度（毫秒）
    ///
    /// # 返回
    /// 相位内偏移；数值越界时返回 [`ClipError::InvalidPhasePosition`]
    pub fn resolve(&self, phase_len: f64) -> Result<f64, ChoreoError> {
        match self {
            Self::Beginning => Ok(0.0),
            Self::End => Ok(phase_len),
            Self::Millis(ms) => {
                if *ms < 0.0 || *ms > phase_len {
                    Err(ChoreoError::Clip(ClipError::InvalidPhasePosition {
                        position: format!("{}", ms),
                        message: format!("毫秒偏移超出相位长度 {}", phase_len),
                    }))
                } else {
                    Ok(*ms)
                }
            }
            Self::Percent(p) => {
                if !(0.0..=100.0).contains(p) {
                    Err(ChoreoError::Clip(ClipError::InvalidPhasePosition {
                        position: format!("{}%", p),
                        message: "百分比必须在 0-100 之间".to_string(),
                    }))
                } else {
                    Ok(phase_len * p / 100.0)
                }
            }
        }
    }
}

impl FromStr for PhasePosition {
    type Err = ChoreoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed {
            "beginning" => Ok(Self::Beginning),
            "end" => Ok(Self::End),
            _ => {
                if let Some(percent) = trimmed.strip_suffix('%') {
                    let value: f64 = percent.trim().parse().map_err(|_| {
                        ChoreoError::Clip(ClipError::InvalidPhasePosition {
                            position: s.to_string(),
                            message: "无法解析百分比".to_string(),
                        })
                    })?;
                    Ok(Self::Percent(value))
                } else {
                    let value: f64 = trimmed.parse().map_err(|_| {
                        ChoreoError::Clip(ClipError::InvalidPhasePosition {
                            position: s.to_string(),
                            message: "期望 beginning / end / 毫秒数 / 百分比".to_string(),
                        })
                    })?;
                    if value < 0.0 {
                        return Err(ChoreoError::Clip(ClipError::InvalidPhasePosition {
                            position: s.to_string(),
                            message: "毫秒偏移不能为负".to_string(),
                        }));
                    }
                    Ok(Self::Millis(value))
                }
            }
        }
    }
}

/// 相位边界事件（在当前方向的时间轴上）
///
/// 每个播放方向的每个边界恰好触发一次。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseEvent {
    /// 延迟段结束（激活段开始）
    DelayFinished,
    /// 激活段结束
    ActiveFinished,
    /// 结尾延迟段结束（本方向播放完毕）
    EndDelayFinished,
}

/// 动画状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnimStatus {
    /// 未启动
    #[default]
    Idle,
    /// 推进中
    Running,
    /// 已暂停
    Paused,
    /// 停在阻塞点等待
    Blocked,
    /// 本方向播放完毕
    Finished,
}

/// 阻塞点来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    /// 引擎插入（钉住片段间顺序，作者不可见）
    Integrity,
    /// 作者插入
    Roadblock,
}

/// 阻塞点
#[derive(Debug)]
struct BlockPoint {
    direction: Direction,
    /// 方向轴上的绝对位置
    time: f64,
    kind: BlockKind,
    waiters: Vec<Waiter>,
    /// 已放行
    passed: bool,
}

/// 越过承诺
#[derive(Debug)]
struct PromisePoint {
    direction: Direction,
    time: f64,
    signal: Signal,
}

/// 片段动画
///
/// 包装一段可正反播放的相位时间轴，向上层提供相位事件流。
#[derive(Debug)]
pub struct ClipAnimation {
    timing: ClipTiming,
    direction: Direction,
    /// 当前方向时间轴上的播放头位置
    local_time: f64,
    status: AnimStatus,
    /// 下一个待触发的相位边界（0 = delay，1 = active，2 = endDelay）
    next_boundary: usize,
    /// 复合播放速率（时间轴 × 序列 × 片段）
    rate: f64,
    /// finish 请求：非时序推进到终点（仍在阻塞点停住）
    finish_requested: bool,
    promises: Vec<PromisePoint>,
    blocks: Vec<BlockPoint>,
}

impl ClipAnimation {
    /// 创建动画
    pub fn new(timing: ClipTiming) -> Self {
        Self {
            timing,
            direction: Direction::Forward,
            local_time: 0.0,
            status: AnimStatus::Idle,
            next_boundary: 0,
            rate: 1.0,
            finish_requested: false,
            promises: Vec::new(),
            blocks: Vec::new(),
        }
    }

    /// 时序参数
    pub fn timing(&self) -> &ClipTiming {
        &self.timing
    }

    /// 替换时序参数（仅未启动时）
    pub fn set_timing(&mut self, timing: ClipTiming) {
        debug_assert!(self.status == AnimStatus::Idle || self.status == AnimStatus::Finished);
        self.timing = timing;
    }

    /// 当前方向
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// 当前状态
    pub fn status(&self) -> AnimStatus {
        self.status
    }

    /// 播放头位置（当前方向时间轴）
    pub fn local_time(&self) -> f64 {
        self.local_time
    }

    /// 是否播放完毕
    pub fn is_finished(&self) -> bool {
        self.status == AnimStatus::Finished
    }

    /// 更新复合播放速率
    pub fn update_playback_rate(&mut self, rate: f64) {
        self.rate = rate;
    }

    /// 方向轴三段长度
    fn segments(&self, direction: Direction) -> [f64; 3] {
        match direction {
            Direction::Forward => [self.timing.delay, self.timing.duration, self.timing.end_delay],
            // 反向时间轴：延迟与结尾延迟交换
            Direction::Backward => {
                [self.timing.end_delay, self.timing.duration, self.timing.delay]
            }
        }
    }

    /// 完整长度
    fn total(&self) -> f64 {
        self.timing.full_duration()
    }

    /// 相位在方向轴上的（起点, 长度）
    fn phase_bounds(&self, direction: Direction, phase: Phase) -> (f64, f64) {
        let [d, a, e] = self.segments(direction);
        match phase {
            Phase::Delay => (0.0, d),
            Phase::Active => (d, a),
            Phase::EndDelay => (d + a, e),
            Phase::Whole => (0.0, d + a + e),
        }
    }

    /// 把（方向, 相位, 位置）解析为方向轴上的绝对时间
    pub fn resolve_position(
        &self,
        direction: Direction,
        phase: Phase,
        position: &PhasePosition,
    ) -> Result<f64, ChoreoError> {
        let (start, len) = self.phase_bounds(direction, phase);
        Ok(start + position.resolve(len)?)
    }

    /// 本方向的一轮播放是否在进行中（含暂停与阻塞）
    fn run_active(&self) -> bool {
        matches!(
            self.status,
            AnimStatus::Running | AnimStatus::Paused | AnimStatus::Blocked
        )
    }

    /// 生成越过承诺
    ///
    /// 播放头越过指定位置时解析。本轮播放中已越过的位置立即解析；
    /// 已结束/未启动的轮次不算（下一轮启动后照常在越过时解析）。
    pub fn generate_time_promise(
        &mut self,
        direction: Direction,
        phase: Phase,
        position: &PhasePosition,
    ) -> Result<Waiter, ChoreoError> {
        let time = self.resolve_position(direction, phase, position)?;
        if direction == self.direction && self.run_active() && time <= self.local_time {
            return Ok(Waiter::resolved());
        }
        let (signal, waiter) = signal_pair();
        self.promises.push(PromisePoint {
            direction,
            time,
            signal,
        });
        Ok(waiter)
    }

    /// 插入阻塞点
    pub fn add_blocks(
        &mut self,
        kind: BlockKind,
        direction: Direction,
        phase: Phase,
        position: &PhasePosition,
        waiters: Vec<Waiter>,
    ) -> Result<(), ChoreoError> {
        let time = self.resolve_position(direction, phase, position)?;
        // 本轮播放中已越过的位置不再阻塞
        let passed = direction == self.direction && self.run_active() && time < self.local_time;
        self.blocks.push(BlockPoint {
            direction,
            time,
            kind,
            waiters,
            passed,
        });
        Ok(())
    }

    /// 插入完整性阻塞（引擎内部）
    pub fn add_integrity_blocks(
        &mut self,
        direction: Direction,
        phase: Phase,
        position: &PhasePosition,
        waiters: Vec<Waiter>,
    ) -> Result<(), ChoreoError> {
        self.add_blocks(BlockKind::Integrity, direction, phase, position, waiters)
    }

    /// 插入路障（作者可见）
    pub fn add_roadblocks(
        &mut self,
        direction: Direction,
        phase: Phase,
        position: &PhasePosition,
        waiters: Vec<Waiter>,
    ) -> Result<(), ChoreoError> {
        self.add_blocks(BlockKind::Roadblock, direction, phase, position, waiters)
    }

    /// 启动指定方向的播放
    ///
    /// 重置播放头与边界游标；上一轮已放行的阻塞点被清掉，
    /// 未决承诺保留（越过时依旧解析）。
    pub fn launch(&mut self, direction: Direction) {
        self.direction = direction;
        self.local_time = 0.0;
        self.next_boundary = 0;
        self.status = AnimStatus::Running;
        self.finish_requested = false;
        self.blocks.retain(|b| !b.passed);
        self.promises.retain(|p| p.signal.waiter().is_pending());
    }

    /// 暂停
    pub fn pause(&mut self) {
        if matches!(self.status, AnimStatus::Running | AnimStatus::Blocked) {
            self.status = AnimStatus::Paused;
        }
    }

    /// 恢复
    pub fn resume(&mut self) {
        if self.status == AnimStatus::Paused {
            // 若停在未放行的阻塞点上，下次推进会重新停住
            self.status = AnimStatus::Running;
        }
    }

    /// 是否已暂停
    pub fn is_paused(&self) -> bool {
        self.status == AnimStatus::Paused
    }

    /// 请求非时序完成
    ///
    /// 播放头以"无限速率"推进到终点，但仍会停在未解析的阻塞点上。
    pub fn finish(&mut self) -> Vec<PhaseEvent> {
        self.finish_requested = true;
        self.advance(0.0)
    }

    /// 取消：丢弃本方向的播放进度，回到未启动状态
    ///
    /// 不触发任何相位边界事件；未决承诺保持挂起。
    pub fn cancel(&mut self) {
        self.local_time = 0.0;
        self.next_boundary = 0;
        self.finish_requested = false;
        self.status = AnimStatus::Idle;
    }

    /// 跳过式完成：启动即非时序推进到终点
    ///
    /// 与 [`finish`](Self::finish) 同一推进语义：仍在未解析的
    /// 阻塞点上停住（永不解析的路障会把片段无限期挂起）。
    /// 相位边界事件依旧按顺序触发。
    pub fn skip_to_end(&mut self) -> Vec<PhaseEvent> {
        self.finish_requested = true;
        self.advance(0.0)
    }

    /// 推进播放头
    ///
    /// # 参数
    /// - `dt`: 真实流逝毫秒数（推进量 = dt × 复合速率）
    ///
    /// # 返回
    /// 本次推进越过的相位边界事件（按顺序）
    pub fn advance(&mut self, dt: f64) -> Vec<PhaseEvent> {
        let mut events = Vec::new();
        match self.status {
            AnimStatus::Running | AnimStatus::Blocked => {}
            _ => return events,
        }

        let total = self.total();
        let target = if self.finish_requested {
            total
        } else {
            (self.local_time + dt * self.rate).min(total)
        };

        loop {
            // [local_time, target] 内最近的未放行阻塞点
            let next_block = self
                .blocks
                .iter()
                .enumerate()
                .filter(|(_, b)| {
                    !b.passed
                        && b.direction == self.direction
                        && b.time >= self.local_time
                        && b.time <= target
                })
                .min_by(|(_, a), (_, b)| {
                    a.time.partial_cmp(&b.time).unwrap_or(std::cmp::Ordering::Equal)
                })
                .map(|(i, b)| (i, b.time));

            match next_block {
                Some((index, time)) => {
                    // 停在阻塞点：边界事件被扣住（严格小于），承诺照常解析
                    self.move_playhead(time, true, &mut events);
                    if self.blocks[index].waiters.iter().all(|w| w.is_settled()) {
                        self.blocks[index].passed = true;
                        self.status = AnimStatus::Running;
                    } else {
                        self.status = AnimStatus::Blocked;
                        return events;
                    }
                }
                None => {
                    self.move_playhead(target, false, &mut events);
                    break;
                }
            }
        }

        if self.local_time >= total && !matches!(self.status, AnimStatus::Blocked) {
            self.status = AnimStatus::Finished;
        }
        events
    }

    /// 把播放头移到 `time`，解析越过的承诺并触发相位边界
    ///
    /// `hold_boundary` 为 true 时，恰好位于 `time` 上的边界事件被扣住
    /// （停在阻塞点时相位尚未结束）。
    fn move_playhead(&mut self, time: f64, hold_boundary: bool, events: &mut Vec<PhaseEvent>) {
        self.local_time = time;

        // 承诺按注册顺序解析
        for promise in &self.promises {
            if promise.direction == self.direction && promise.time <= time {
                promise.signal.resolve();
            }
        }

        let [d, a, e] = self.segments(self.direction);
        let boundaries = [d, d + a, d + a + e];
        while self.next_boundary < 3 {
            let boundary_time = boundaries[self.next_boundary];
            let crossed = if hold_boundary {
                boundary_time < time
            } else {
                boundary_time <= time
            };
            if !crossed {
                break;
            }
            events.push(match self.next_boundary {
                0 => PhaseEvent::DelayFinished,
                1 => PhaseEvent::ActiveFinished,
                _ => PhaseEvent::EndDelayFinished,
            });
            self.next_boundary += 1;
        }
    }

    /// 激活段进度（未缓动）
    ///
    /// 播放头在激活段内时返回 0.0 - 1.0，否则返回 None。
    pub fn active_progress(&self) -> Option<f64> {
        let (start, len) = self.phase_bounds(self.direction, Phase::Active);
        if len <= 0.0 {
            return None;
        }
        if self.local_time < start || self.local_time > start + len {
            return None;
        }
        Some(((self.local_time - start) / len).clamp(0.0, 1.0))
    }

    /// 是否有未解析的路障挡在当前方向上
    pub fn has_pending_roadblock(&self) -> bool {
        self.blocks.iter().any(|b| {
            !b.passed
                && b.kind == BlockKind::Roadblock
                && b.direction == self.direction
                && b.waiters.iter().any(|w| w.is_pending())
        })
    }
}
