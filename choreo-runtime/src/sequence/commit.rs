//! # Commit 模块
//!
//! 提交算法：播放前把片段的编排标志与时序折算成调度计划。
//!
//! ## 分组规则
//!
//! 按插入顺序遍历片段。片段 i 在以下任一条件下并入当前组，
//! 否则开启新组：
//!
//! - 片段 i 带 `starts_with_previous`
//! - 片段 i-1 带 `starts_next_clip_too`
//!
//! ## 起点指派
//!
//! - 片段 0：`full_start = 0`
//! - 并入当前组：`full_start = 前一片段.active_start`
//!   —— 锚到前一片段的**激活起点**而非完整起点，自身延迟叠在
//!   前一片段的延迟之上（"延迟叠加"行为）
//! - 开启新组：`full_start = 上一组 full_finish 的最大值`

use super::super::clip::{AnimClip, ScheduledTimes};

/// 一个并行组的调度信息
#[derive(Debug, Clone)]
pub(crate) struct Grouping {
    /// 组内片段（序列内索引，插入顺序）
    pub clips: Vec<usize>,
    /// 激活段结束顺序（active_finish 升序）
    pub active_finish_order: Vec<usize>,
    /// 完整结束顺序（full_finish 升序）
    pub end_delay_finish_order: Vec<usize>,
    /// 反向激活段结束顺序：完整结束顺序反转后按 active_start
    /// 稳定降序 —— 越晚启动的片段越先完成激活段回退
    pub backward_active_finish_order: Vec<usize>,
}

/// 调度计划
#[derive(Debug, Clone, Default)]
pub(crate) struct CommitPlan {
    pub groupings: Vec<Grouping>,
}

/// 提交：计算每个片段的调度时间与组内顺序表
pub(crate) fn commit_clips(clips: &mut [AnimClip]) -> CommitPlan {
    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut times: Vec<ScheduledTimes> = Vec::with_capacity(clips.len());

    for i in 0..clips.len() {
        let joins = i > 0
            && (clips[i].config().starts_with_previous
                || clips[i - 1].config().starts_next_clip_too);

        let full_start = if i == 0 {
            0.0
        } else if joins {
            times[i - 1].active_start
        } else {
            let prev_group = groups.last().expect("前一组必然存在");
            prev_group
                .iter()
                .map(|&j| times[j].full_finish)
                .fold(0.0_f64, f64::max)
        };

        let scheduled = ScheduledTimes::from_timing(full_start, &clips[i].config().timing);
        clips[i].set_scheduled_times(scheduled);
        times.push(scheduled);

        if joins {
            groups.last_mut().expect("前一组必然存在").push(i);
        } else {
            groups.push(vec![i]);
        }
    }

    let groupings = groups
        .into_iter()
        .map(|members| {
            let mut active_finish_order = members.clone();
            active_finish_order.sort_by(|&a, &b| {
                times[a]
                    .active_finish
                    .partial_cmp(&times[b].active_finish)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

            let mut end_delay_finish_order = members.clone();
            end_delay_finish_order.sort_by(|&a, &b| {
                times[a]
                    .full_finish
                    .partial_cmp(&times[b].full_finish)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

            let mut backward_active_finish_order: Vec<usize> =
                end_delay_finish_order.iter().rev().copied().collect();
            backward_active_finish_order.sort_by(|&a, &b| {
                times[b]
                    .active_start
                    .partial_cmp(&times[a].active_start)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

            Grouping {
                clips: members,
                active_finish_order,
                end_delay_finish_order,
                backward_active_finish_order,
            }
        })
        .collect();

    CommitPlan { groupings }
}
