//! # Generator 模块
//!
//! 效果生成器：把（元素, 参数）转换成可播放的效果体。
//!
//! ## 四种生成器形态
//!
//! 按优先级探测：
//!
//! 1. `Keyframes` —— 直接返回正/反关键帧
//! 2. `KeyframeGenerators` —— 返回"每次播放再生成关键帧"的闭包
//! 3. `RafMutators` —— 返回逐帧回调（不能用关键帧表达的效果，
//!    如平滑滚动、动态文本）
//! 4. `RafMutatorGenerators` —— 返回"每个方向启动时再生成逐帧回调"的工厂
//!
//! 生成器以 [`EffectContext`] 为接收者调用，从中读取目标元素；
//! 逐帧回调通过 [`MutatorCtx::compute_tween`] 做数值插值。

use std::fmt;
use std::rc::Rc;

use super::Keyframes;
use crate::dom::Element;
use crate::error::ChoreoResult;
use crate::{clip::Direction, effect::EffectArgs};

/// 生成器调用上下文（生成器眼中的"this"）
#[derive(Debug, Clone)]
pub struct EffectContext {
    /// 目标元素
    pub element: Element,
    /// 作者提供的效果参数
    pub args: EffectArgs,
}

/// 逐帧回调上下文
#[derive(Debug, Clone)]
pub struct MutatorCtx {
    /// 目标元素
    pub element: Element,
    /// 当前有效方向上激活相位的进度（0.0 - 1.0，已应用缓动）
    pub progress: f64,
}

impl MutatorCtx {
    /// 数值插值：`a + (b - a) * progress`
    pub fn compute_tween(&self, a: f64, b: f64) -> f64 {
        a + (b - a) * self.progress
    }
}

/// 延迟生成关键帧的闭包
pub type KeyframesFn = Rc<dyn Fn(&EffectContext) -> ChoreoResult<Keyframes>>;
/// 逐帧回调
pub type Mutator = Rc<dyn Fn(&MutatorCtx)>;
/// 逐帧回调工厂（每个播放方向启动时调用）
pub type MutatorFactory = Rc<dyn Fn(&EffectContext) -> ChoreoResult<Mutator>>;

/// 关键帧对生成器：返回（正向帧, 可选反向帧）
pub type KeyframePairFn =
    Rc<dyn Fn(&EffectContext) -> ChoreoResult<(Keyframes, Option<Keyframes>)>>;
/// 关键帧闭包对生成器
pub type KeyframeGenPairFn =
    Rc<dyn Fn(&EffectContext) -> ChoreoResult<(KeyframesFn, Option<KeyframesFn>)>>;
/// 逐帧回调对生成器：返回（正向回调, 反向回调）
pub type MutatorPairFn = Rc<dyn Fn(&EffectContext) -> ChoreoResult<(Mutator, Mutator)>>;
/// 逐帧回调工厂对生成器
pub type MutatorFactoryPairFn =
    Rc<dyn Fn(&EffectContext) -> ChoreoResult<(MutatorFactory, MutatorFactory)>>;

/// 效果生成器
#[derive(Clone)]
pub enum EffectGenerator {
    /// 形态 1：generateKeyframes
    Keyframes(KeyframePairFn),
    /// 形态 2：generateKeyframeGenerators
    KeyframeGenerators(KeyframeGenPairFn),
    /// 形态 3：generateRafMutators
    RafMutators(MutatorPairFn),
    /// 形态 4：generateRafMutatorGenerators
    RafMutatorGenerators(MutatorFactoryPairFn),
}

impl fmt::Debug for EffectGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Keyframes(_) => "Keyframes",
            Self::KeyframeGenerators(_) => "KeyframeGenerators",
            Self::RafMutators(_) => "RafMutators",
            Self::RafMutatorGenerators(_) => "RafMutatorGenerators",
        };
        write!(f, "EffectGenerator::{}", name)
    }
}

impl EffectGenerator {
    /// 从静态关键帧构造（无须访问元素的常量效果）
    pub fn from_static_frames(forward: Keyframes, backward: Option<Keyframes>) -> Self {
        Self::Keyframes(Rc::new(move |_ctx| Ok((forward.clone(), backward.clone()))))
    }

    /// 调用生成器，得到组合后的效果体
    pub fn compose(&self, ctx: &EffectContext) -> ChoreoResult<ComposedEffect> {
        match self {
            Self::Keyframes(generate) => {
                let (forward, backward) = generate(ctx)?;
                Ok(ComposedEffect::Keyframes { forward, backward })
            }
            Self::KeyframeGenerators(generate) => {
                let (forward, backward) = generate(ctx)?;
                Ok(ComposedEffect::KeyframeGenerators { forward, backward })
            }
            Self::RafMutators(generate) => {
                let (forward, backward) = generate(ctx)?;
                Ok(ComposedEffect::Mutators { forward, backward })
            }
            Self::RafMutatorGenerators(generate) => {
                let (forward, backward) = generate(ctx)?;
                Ok(ComposedEffect::MutatorFactories { forward, backward })
            }
        }
    }
}

/// 组合后的效果体
///
/// 生成器调用一次的产物；每个播放方向启动时再解析出
/// 该方向的 [`DirectionEffect`]。
#[derive(Clone)]
pub enum ComposedEffect {
    Keyframes {
        forward: Keyframes,
        backward: Option<Keyframes>,
    },
    KeyframeGenerators {
        forward: KeyframesFn,
        backward: Option<KeyframesFn>,
    },
    Mutators {
        forward: Mutator,
        backward: Mutator,
    },
    MutatorFactories {
        forward: MutatorFactory,
        backward: MutatorFactory,
    },
}

impl fmt::Debug for ComposedEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Keyframes { .. } => "Keyframes",
            Self::KeyframeGenerators { .. } => "KeyframeGenerators",
            Self::Mutators { .. } => "Mutators",
            Self::MutatorFactories { .. } => "MutatorFactories",
        };
        write!(f, "ComposedEffect::{}", name)
    }
}

/// 单个方向解析出的效果体
#[derive(Clone)]
pub enum DirectionEffect {
    /// 关键帧
    ///
    /// `mirrored = true` 表示没有显式反向帧，由正向帧反转推导，
    /// 播放时需要镜像缓动。
    Frames { frames: Keyframes, mirrored: bool },
    /// 逐帧回调
    Mutator(Mutator),
}

impl fmt::Debug for DirectionEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Frames { frames, mirrored } => f
                .debug_struct("DirectionEffect::Frames")
                .field("frames", &frames.frames.len())
                .field("mirrored", mirrored)
                .finish(),
            Self::Mutator(_) => write!(f, "DirectionEffect::Mutator"),
        }
    }
}

impl ComposedEffect {
    /// 解析指定方向的效果体
    ///
    /// 反向播放未提供反向帧/反向生成器时，回退为正向帧的反转。
    pub fn resolve(&self, direction: Direction, ctx: &EffectContext) -> ChoreoResult<DirectionEffect> {
        match (self, direction) {
            (Self::Keyframes { forward, .. }, Direction::Forward) => Ok(DirectionEffect::Frames {
                frames: forward.clone(),
                mirrored: false,
            }),
            (Self::Keyframes { forward, backward }, Direction::Backward) => match backward {
                Some(frames) => Ok(DirectionEffect::Frames {
                    frames: frames.clone(),
                    mirrored: false,
                }),
                None => Ok(DirectionEffect::Frames {
                    frames: forward.reversed(),
                    mirrored: true,
                }),
            },
            (Self::KeyframeGenerators { forward, .. }, Direction::Forward) => {
                Ok(DirectionEffect::Frames {
                    frames: forward(ctx)?,
                    mirrored: false,
                })
            }
            (Self::KeyframeGenerators { forward, backward }, Direction::Backward) => {
                match backward {
                    Some(generate) => Ok(DirectionEffect::Frames {
                        frames: generate(ctx)?,
                        mirrored: false,
                    }),
                    None => Ok(DirectionEffect::Frames {
                        frames: forward(ctx)?.reversed(),
                        mirrored: true,
                    }),
                }
            }
            (Self::Mutators { forward, .. }, Direction::Forward) => {
                Ok(DirectionEffect::Mutator(Rc::clone(forward)))
            }
            (Self::Mutators { backward, .. }, Direction::Backward) => {
                Ok(DirectionEffect::Mutator(Rc::clone(backward)))
            }
            (Self::MutatorFactories { forward, .. }, Direction::Forward) => {
                Ok(DirectionEffect::Mutator(forward(ctx)?))
            }
            (Self::MutatorFactories { backward, .. }, Direction::Backward) => {
                Ok(DirectionEffect::Mutator(backward(ctx)?))
            }
        }
    }
}
