//! # choreo-runtime
//!
//! 层级式动画调度核心。
//!
//! ## 架构概述
//!
//! `choreo-runtime` 是纯逻辑核心，不渲染任何帧。作者搭建三层嵌套的
//! 播放结构并正反驱动；关键帧插值由宿主完成，本库负责其上的调度、
//! 协调与状态机：
//!
//! ```text
//! AnimTimeline（时间轴）  步进 / 跳转 / 跳过 / 暂停 / 变速
//!   └─ AnimSequence（序列）  提交并行分组，组内按相位顺序协调
//!        └─ AnimClip（片段）  元素 × 效果 × 时序，相位边界副作用
//!             └─ ClipAnimation  相位状态机 + 时间承诺 + 阻塞点
//! ```
//!
//! 播放指令自上而下流动，完成承诺自下而上解析；暂停、跳过与
//! 速率变更只广播给在播放中的子结构。
//!
//! ## 执行模型
//!
//! 宿主（事件循环 / 测试夹具）逐帧调用 `update(dt)` 驱动。
//! 等待点（时间承诺、完整性阻塞、路障）是共享状态句柄
//! （[`signal`]），每次推进时检查；两次 `update` 之间的状态变更
//! 对调度器而言是原子的。
//!
//! ## 使用示例
//!
//! ```ignore
//! use choreo_runtime::{Choreographer, SequenceConfig, TimelineConfig};
//!
//! let studio = Choreographer::new();
//! let mut timeline = studio.new_timeline(TimelineConfig::default());
//!
//! let mut seq = studio.new_sequence(SequenceConfig::default());
//! seq.add_clips(vec![
//!     studio.entrance(&elem, "~fade-in", args, &config, None)?,
//! ])?;
//! timeline.add_sequences(vec![seq])?;
//!
//! timeline.step_forward()?;
//! loop {
//!     timeline.update(dt_ms)?;
//!     if !timeline.is_animating() { break; }
//! }
//! ```
//!
//! ## 模块结构
//!
//! - [`clip`]：片段与相位状态机
//! - [`sequence`]：序列提交与组内并行调度
//! - [`timeline`]：时间轴步进 / 跳转 / 播放按钮
//! - [`engine`]：门面（工厂与效果库绑定）
//! - [`effect`]：效果类别 / 生成器 / 效果库
//! - [`dom`]：宿主文档的内存模型
//! - [`signal`]：单线程承诺原语
//! - [`diagnostic`]：结构静态分析
//! - [`snapshot`]：可序列化的进度快照

pub mod clip;
pub mod diagnostic;
pub mod dom;
pub mod easing;
pub mod effect;
pub mod engine;
pub mod error;
pub mod sequence;
pub mod signal;
pub mod snapshot;
pub mod timeline;

// 重导出核心类型
pub use clip::{
    AnimClip, ClipConfig, ClipId, ClipTiming, CompositeMode, CssClasses, Direction, HideType,
    PartialClipConfig, Phase, PhasePosition, ScheduledTimes,
};
pub use diagnostic::{analyze_sequence, analyze_timeline, Diagnostic, DiagnosticLevel};
pub use dom::{Connector, ConnectorPoint, Element, Rect};
pub use easing::EasingFunction;
pub use effect::{
    CompositionFrequency, EffectArg, EffectArgs, EffectBank, EffectCategory, EffectEntry,
    EffectGenerator, Keyframe, Keyframes,
};
pub use engine::Choreographer;
pub use error::{ChoreoError, ChoreoResult, ClipError, ErrorLocation, SequenceError, TimelineError};
pub use sequence::{AnimSequence, SequenceConfig, SequenceHandlers, SequenceId};
pub use signal::{signal_pair, Signal, Waiter};
pub use snapshot::{SequenceSnapshot, TimelineSnapshot};
pub use timeline::{
    AnimTimeline, AutoplayDetection, ButtonAction, JumpPosition, PlaybackButton, TagSearch,
    TagSearchDirection, TimelineConfig, TimelineId,
};
