//! # Jump 模块
//!
//! 时间轴瞬时跳转：按标签或位置计算目标索引，
//! 以跳过模式连续步进到位，再按自动连播探测规则延伸。
//!
//! 跳转期间暂停状态被临时解除、跳过视觉态开启，结束后复原。
//! `is_jumping` 拒绝重入。

use regex_lite::Regex;

use super::AnimTimeline;
use crate::clip::Direction;
use crate::error::{ChoreoError, ChoreoResult, TimelineError};

/// 位置跳转目标
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpPosition {
    /// 第一个序列之前
    Beginning,
    /// 最后一个序列之后
    End,
    /// 指定加载索引
    Index(usize),
}

/// 标签检索方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TagSearchDirection {
    /// 从头向后找（命中最低索引）
    #[default]
    ForwardFromBeginning,
    /// 从当前位置向后找
    Forward,
    /// 从当前位置向前找
    Backward,
    /// 从末尾向前找（命中最高索引）
    BackwardFromEnd,
}

/// 跳转后的自动连播探测
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AutoplayDetection {
    /// 不探测，停在落点
    #[default]
    None,
    /// 沿正向延伸自动连播链
    Forward,
    /// 沿反向延伸自动连播链
    Backward,
}

/// 标签检索选项
#[derive(Debug, Clone, Copy, Default)]
pub struct TagSearch {
    pub direction: TagSearchDirection,
    /// 检索起点的整数偏移
    pub search_offset: isize,
    /// 最终落点的整数偏移
    pub target_offset: isize,
    pub autoplay_detection: AutoplayDetection,
}

impl AnimTimeline {
    /// 跳转到位置
    ///
    /// 合法位置是 `0..=序列数`；越界在任何移动发生之前报错。
    pub fn jump_to_position(
        &mut self,
        position: JumpPosition,
        autoplay_detection: AutoplayDetection,
    ) -> ChoreoResult<()> {
        let max = self.num_sequences();
        let target = match position {
            JumpPosition::Beginning => 0,
            JumpPosition::End => max,
            JumpPosition::Index(index) => {
                if index > max {
                    return Err(ChoreoError::Timeline(TimelineError::PositionOutOfBounds {
                        target: index as isize,
                        max,
                    }));
                }
                index
            }
        };
        self.perform_jump(target, autoplay_detection)
    }

    /// 按标签精确匹配跳转
    pub fn jump_to_sequence_tag(&mut self, tag: &str, search: TagSearch) -> ChoreoResult<()> {
        let target = self.resolve_tag_target(&|t| t == tag, tag, &search)?;
        self.perform_jump(target, search.autoplay_detection)
    }

    /// 按正则匹配标签跳转
    pub fn jump_to_sequence_tag_matching(
        &mut self,
        pattern: &Regex,
        search: TagSearch,
    ) -> ChoreoResult<()> {
        let target = self.resolve_tag_target(&|t| pattern.is_match(t), pattern.as_str(), &search)?;
        self.perform_jump(target, search.autoplay_detection)
    }

    /// 解析标签检索的落点索引
    fn resolve_tag_target(
        &self,
        matches: &dyn Fn(&str) -> bool,
        display: &str,
        search: &TagSearch,
    ) -> ChoreoResult<usize> {
        let len = self.num_sequences() as isize;
        let loaded = self.loaded_seq_index() as isize;

        let found: Option<isize> = match search.direction {
            TagSearchDirection::ForwardFromBeginning => {
                self.scan_tags(search.search_offset, 1, len, matches)
            }
            TagSearchDirection::Forward => {
                self.scan_tags(loaded + search.search_offset, 1, len, matches)
            }
            TagSearchDirection::Backward => {
                self.scan_tags(loaded + search.search_offset, -1, len, matches)
            }
            TagSearchDirection::BackwardFromEnd => {
                self.scan_tags(len - 1 + search.search_offset, -1, len, matches)
            }
        };

        let found = found.ok_or_else(|| {
            ChoreoError::Timeline(TimelineError::TagNotFound {
                tag: display.to_string(),
            })
        })?;

        let target = found + search.target_offset;
        if target < 0 || target > len {
            return Err(ChoreoError::Timeline(TimelineError::PositionOutOfBounds {
                target,
                max: len as usize,
            }));
        }
        Ok(target as usize)
    }

    /// 沿方向扫描标签
    fn scan_tags(
        &self,
        start: isize,
        step: isize,
        len: isize,
        matches: &dyn Fn(&str) -> bool,
    ) -> Option<isize> {
        let mut index = start;
        while index >= 0 && index < len {
            if let Some(tag) = self.sequence(index as usize).and_then(|s| s.tag()) {
                if matches(tag) {
                    return Some(index);
                }
            }
            index += step;
        }
        None
    }

    /// 执行跳转
    ///
    /// 以跳过模式连续步进（不咨询自动连播）直到落点，
    /// 再按探测规则延伸。没有未解析路障时全程同步完成；
    /// 路障挡住某一步时跳转报错中止（见 [`jump_step`](Self::jump_step)）。
    fn perform_jump(
        &mut self,
        target: usize,
        autoplay_detection: AutoplayDetection,
    ) -> ChoreoResult<()> {
        if self.is_jumping() {
            return Err(ChoreoError::Timeline(TimelineError::LockedOperation {
                operation: "jump".to_string(),
                reason: "跳转进行中".to_string(),
            }));
        }
        if self.is_animating() {
            return Err(ChoreoError::Timeline(TimelineError::LockedOperation {
                operation: "jump".to_string(),
                reason: "动画进行中".to_string(),
            }));
        }

        self.set_jumping(true);
        let was_paused = self.is_paused();
        if was_paused {
            self.force_unpause();
        }
        let was_skipping = self.skipping_on();
        self.set_skipping_flag(true);

        let result = self.jump_steps(target, autoplay_detection);

        // 复原暂停与跳过状态
        self.set_skipping_flag(was_skipping);
        if was_paused {
            self.force_pause();
        }
        self.set_jumping(false);
        result
    }

    fn jump_steps(
        &mut self,
        target: usize,
        autoplay_detection: AutoplayDetection,
    ) -> ChoreoResult<()> {
        // 1. 不咨询自动连播，步进到落点
        while self.loaded_seq_index() != target {
            let direction = if self.loaded_seq_index() < target {
                Direction::Forward
            } else {
                Direction::Backward
            };
            self.jump_step(direction)?;
        }

        // 2. 自动连播探测
        match autoplay_detection {
            AutoplayDetection::None => {}
            AutoplayDetection::Forward => {
                while self.loaded_seq_index() < self.num_sequences()
                    && self.autoplay_boundary(self.loaded_seq_index())
                {
                    self.jump_step(Direction::Forward)?;
                }
            }
            AutoplayDetection::Backward => {
                while self.loaded_seq_index() > 0 && self.autoplay_boundary(self.loaded_seq_index())
                {
                    self.jump_step(Direction::Backward)?;
                }
            }
        }
        Ok(())
    }

    /// 跳转中的一步：跳过模式且不咨询自动连播
    ///
    /// 跳过推进仍会在未解析的路障上停住；这样的一步无法瞬时完成，
    /// 跳转报错中止，挂起的一步留待宿主 `update` 继续驱动。
    fn jump_step(&mut self, direction: Direction) -> ChoreoResult<()> {
        self.step_once(direction, true, false)?;
        if self.is_animating() {
            return Err(ChoreoError::Timeline(TimelineError::LockedOperation {
                operation: "jump".to_string(),
                reason: "未解析的路障阻塞了跳转步进，无法瞬时完成".to_string(),
            }));
        }
        Ok(())
    }
}
