//! # Easing 模块
//!
//! 缓动函数库，用于动画的时间插值。
//!
//! 调度核心只做"按名称选择缓动"：具体曲线数学收敛在本模块内，
//! 反向播放时通过 [`EasingFunction::reversed`] 取镜像曲线。

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// 缓动函数类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EasingFunction {
    /// 线性（匀速）
    Linear,
    /// 缓入（先慢后快）
    EaseIn,
    /// 缓出（先快后慢）
    EaseOut,
    /// 缓入缓出（两头慢中间快）
    #[default]
    EaseInOut,
    /// 二次缓入
    EaseInQuad,
    /// 二次缓出
    EaseOutQuad,
    /// 二次缓入缓出
    EaseInOutQuad,
    /// 三次缓入
    EaseInCubic,
    /// 三次缓出
    EaseOutCubic,
    /// 三次缓入缓出
    EaseInOutCubic,
    /// 正弦缓入
    EaseInSine,
    /// 正弦缓出
    EaseOutSine,
    /// 正弦缓入缓出
    EaseInOutSine,
    /// 弹性缓入
    EaseInElastic,
    /// 弹性缓出
    EaseOutElastic,
    /// 弹跳缓入
    EaseInBounce,
    /// 弹跳缓出
    EaseOutBounce,
}

impl EasingFunction {
    /// 计算缓动值
    ///
    /// # 参数
    /// - `t`: 时间进度 (0.0 - 1.0)
    ///
    /// # 返回
    /// - 缓动后的进度值 (0.0 - 1.0)
    pub fn apply(&self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);

        match self {
            EasingFunction::Linear => t,
            EasingFunction::EaseIn => t * t * t,
            EasingFunction::EaseOut => 1.0 - (1.0 - t).powi(3),
            EasingFunction::EaseInOut => ease_in_out_cubic(t),
            EasingFunction::EaseInQuad => t * t,
            EasingFunction::EaseOutQuad => 1.0 - (1.0 - t) * (1.0 - t),
            EasingFunction::EaseInOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
            EasingFunction::EaseInCubic => t * t * t,
            EasingFunction::EaseOutCubic => 1.0 - (1.0 - t).powi(3),
            EasingFunction::EaseInOutCubic => ease_in_out_cubic(t),
            EasingFunction::EaseInSine => 1.0 - (t * PI / 2.0).cos(),
            EasingFunction::EaseOutSine => (t * PI / 2.0).sin(),
            EasingFunction::EaseInOutSine => -((PI * t).cos() - 1.0) / 2.0,
            EasingFunction::EaseInElastic => 1.0 - ease_out_elastic(1.0 - t),
            EasingFunction::EaseOutElastic => ease_out_elastic(t),
            EasingFunction::EaseInBounce => 1.0 - ease_out_bounce(1.0 - t),
            EasingFunction::EaseOutBounce => ease_out_bounce(t),
        }
    }

    /// 取镜像缓动
    ///
    /// 反向播放未显式提供反向关键帧时，正向帧以反向方向运行，
    /// 缓动需要换成镜像曲线才能保持视觉对称。
    pub fn reversed(&self) -> Self {
        match self {
            EasingFunction::Linear => EasingFunction::Linear,
            EasingFunction::EaseIn => EasingFunction::EaseOut,
            EasingFunction::EaseOut => EasingFunction::EaseIn,
            EasingFunction::EaseInOut => EasingFunction::EaseInOut,
            EasingFunction::EaseInQuad => EasingFunction::EaseOutQuad,
            EasingFunction::EaseOutQuad => EasingFunction::EaseInQuad,
            EasingFunction::EaseInOutQuad => EasingFunction::EaseInOutQuad,
            EasingFunction::EaseInCubic => EasingFunction::EaseOutCubic,
            EasingFunction::EaseOutCubic => EasingFunction::EaseInCubic,
            EasingFunction::EaseInOutCubic => EasingFunction::EaseInOutCubic,
            EasingFunction::EaseInSine => EasingFunction::EaseOutSine,
            EasingFunction::EaseOutSine => EasingFunction::EaseInSine,
            EasingFunction::EaseInOutSine => EasingFunction::EaseInOutSine,
            EasingFunction::EaseInElastic => EasingFunction::EaseOutElastic,
            EasingFunction::EaseOutElastic => EasingFunction::EaseInElastic,
            EasingFunction::EaseInBounce => EasingFunction::EaseOutBounce,
            EasingFunction::EaseOutBounce => EasingFunction::EaseInBounce,
        }
    }
}

/// 缓入缓出（Cubic）
fn ease_in_out_cubic(t: f64) -> f64 {
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

/// 弹性缓出
fn ease_out_elastic(t: f64) -> f64 {
    if t == 0.0 {
        0.0
    } else if t == 1.0 {
        1.0
    } else {
        let c4 = (2.0 * PI) / 3.0;
        2.0_f64.powf(-10.0 * t) * ((t * 10.0 - 0.75) * c4).sin() + 1.0
    }
}

/// 弹跳缓出
fn ease_out_bounce(t: f64) -> f64 {
    let n1 = 7.5625;
    let d1 = 2.75;

    if t < 1.0 / d1 {
        n1 * t * t
    } else if t < 2.0 / d1 {
        let t = t - 1.5 / d1;
        n1 * t * t + 0.75
    } else if t < 2.5 / d1 {
        let t = t - 2.25 / d1;
        n1 * t * t + 0.9375
    } else {
        let t = t - 2.625 / d1;
        n1 * t * t + 0.984375
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear() {
        let easing = EasingFunction::Linear;
        assert_eq!(easing.apply(0.0), 0.0);
        assert_eq!(easing.apply(0.5), 0.5);
        assert_eq!(easing.apply(1.0), 1.0);
    }

    #[test]
    fn test_ease_in_out() {
        let easing = EasingFunction::EaseInOut;
        assert_eq!(easing.apply(0.0), 0.0);
        assert_eq!(easing.apply(1.0), 1.0);
        // 中点应该是 0.5
        let mid = easing.apply(0.5);
        assert!((mid - 0.5).abs() < 0.01);
    }

    #[test]
    fn test_clamp() {
        let easing = EasingFunction::Linear;
        // 超出范围应该被限制
        assert_eq!(easing.apply(-0.5), 0.0);
        assert_eq!(easing.apply(1.5), 1.0);
    }

    #[test]
    fn test_reversed_symmetry() {
        // 镜像曲线满足 reversed(t) = 1 - original(1 - t)
        let pairs = [
            (EasingFunction::EaseIn, EasingFunction::EaseOut),
            (EasingFunction::EaseInQuad, EasingFunction::EaseOutQuad),
            (EasingFunction::EaseInSine, EasingFunction::EaseOutSine),
        ];

        for (ein, eout) in pairs {
            assert_eq!(ein.reversed(), eout);
            assert_eq!(eout.reversed(), ein);
            for i in 0..=10 {
                let t = i as f64 / 10.0;
                let mirrored = 1.0 - ein.apply(1.0 - t);
                assert!((eout.apply(t) - mirrored).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_reversed_is_involution() {
        let all = [
            EasingFunction::Linear,
            EasingFunction::EaseInOut,
            EasingFunction::EaseInElastic,
            EasingFunction::EaseOutBounce,
        ];
        for easing in all {
            assert_eq!(easing.reversed().reversed(), easing);
        }
    }
}
