//! # Timing 模块
//!
//! 片段时序参数与提交后的调度时间。

use serde::{Deserialize, Serialize};

use crate::easing::EasingFunction;

/// 片段时序参数（全部为未缩放毫秒）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipTiming {
    /// 起始延迟
    pub delay: f64,
    /// 激活相位时长
    pub duration: f64,
    /// 结尾延迟
    pub end_delay: f64,
    /// 缓动函数
    pub easing: EasingFunction,
    /// 片段自身播放速率（与序列、时间轴速率相乘）
    pub playback_rate: f64,
}

impl Default for ClipTiming {
    fn default() -> Self {
        Self {
            delay: 0.0,
            duration: 500.0,
            end_delay: 0.0,
            easing: EasingFunction::default(),
            playback_rate: 1.0,
        }
    }
}

impl ClipTiming {
    /// 完整时长（delay + duration + endDelay）
    pub fn full_duration(&self) -> f64 {
        self.delay + self.duration + self.end_delay
    }
}

/// 提交后派生的调度时间
///
/// 序列提交时为每个片段计算，满足：
///
/// ```text
/// full_start <= active_start = full_start + delay
///            <= active_finish = active_start + duration
///            <= full_finish = active_finish + end_delay
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScheduledTimes {
    /// 完整起点（含延迟）
    pub full_start: f64,
    /// 激活相位起点
    pub active_start: f64,
    /// 激活相位终点
    pub active_finish: f64,
    /// 完整终点（含结尾延迟）
    pub full_finish: f64,
}

impl ScheduledTimes {
    /// 从完整起点与时序参数派生
    pub fn from_timing(full_start: f64, timing: &ClipTiming) -> Self {
        let active_start = full_start + timing.delay;
        let active_finish = active_start + timing.duration;
        Self {
            full_start,
            active_start,
            active_finish,
            full_finish: active_finish + timing.end_delay,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedule_derivation() {
        let timing = ClipTiming {
            delay: 100.0,
            duration: 500.0,
            end_delay: 50.0,
            ..Default::default()
        };

        let times = ScheduledTimes::from_timing(200.0, &timing);
        assert_eq!(times.full_start, 200.0);
        assert_eq!(times.active_start, 300.0);
        assert_eq!(times.active_finish, 800.0);
        assert_eq!(times.full_finish, 850.0);

        // 不变式：四个时间点单调不减
        assert!(times.full_start <= times.active_start);
        assert!(times.active_start <= times.active_finish);
        assert!(times.active_finish <= times.full_finish);
    }

    #[test]
    fn test_full_duration() {
        let timing = ClipTiming {
            delay: 10.0,
            duration: 20.0,
            end_delay: 30.0,
            ..Default::default()
        };
        assert_eq!(timing.full_duration(), 60.0);
    }
}
