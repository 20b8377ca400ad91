//! # Error 模块
//!
//! 定义 choreo-runtime 中使用的错误类型。
//!
//! ## 设计原则
//!
//! - 错误按层级划分：片段（Clip）、序列（Sequence）、时间轴（Timeline）
//! - 每个错误携带 [`ErrorLocation`] 上下文，指明出错位置在层级中的坐标
//! - 警告（如播放按钮缺失）不使用错误类型，统一走 `tracing::warn!`

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// 错误位置上下文
///
/// 附加在错误信息末尾，帮助作者定位出错的片段/序列/时间轴。
/// 所有字段可选：独立播放的片段没有序列/时间轴坐标。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ErrorLocation {
    /// 时间轴名称
    pub timeline_name: Option<String>,
    /// 步骤编号（1 起始，= loadedSeqIndex + 1）
    pub step_number: Option<usize>,
    /// 序列在时间轴中的索引
    pub sequence_index: Option<usize>,
    /// 序列标签
    pub sequence_tag: Option<String>,
    /// 序列描述
    pub sequence_description: Option<String>,
    /// 片段类别
    pub clip_category: Option<String>,
    /// 效果名称
    pub effect_name: Option<String>,
    /// 目标元素的开标签（如 `<div class="box">`）
    pub element_tag: Option<String>,
}

impl ErrorLocation {
    /// 是否完全为空（无任何坐标信息）
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl fmt::Display for ErrorLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return Ok(());
        }
        write!(f, "\n位置：")?;
        if let Some(name) = &self.timeline_name {
            write!(f, " 时间轴 '{}'", name)?;
        }
        if let Some(step) = self.step_number {
            write!(f, " 第 {} 步", step)?;
        }
        if let Some(index) = self.sequence_index {
            write!(f, " 序列 #{}", index)?;
        }
        if let Some(tag) = &self.sequence_tag {
            write!(f, " [tag: {}]", tag)?;
        }
        if let Some(desc) = &self.sequence_description {
            write!(f, " ({})", desc)?;
        }
        if let Some(cat) = &self.clip_category {
            write!(f, " 片段 {}", cat)?;
        }
        if let Some(effect) = &self.effect_name {
            write!(f, " 效果 '{}'", effect)?;
        }
        if let Some(tag) = &self.element_tag {
            write!(f, " 目标 {}", tag)?;
        }
        Ok(())
    }
}

/// 片段级错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClipError {
    /// 目标元素无效（空引用或元素子类型不匹配）
    #[error("无效的目标元素：{message}{location}")]
    InvalidElement {
        message: String,
        location: ErrorLocation,
    },

    /// 入场失败：元素未处于可识别的隐藏状态
    #[error("无效的入场尝试：{message}{location}")]
    InvalidEntranceAttempt {
        message: String,
        location: ErrorLocation,
    },

    /// 退场失败：元素已处于隐藏状态
    #[error("无效的退场尝试：{message}{location}")]
    InvalidExitAttempt {
        message: String,
        location: ErrorLocation,
    },

    /// 相位位置字面量越界或格式错误
    #[error("无效的相位位置 '{position}'：{message}")]
    InvalidPhasePosition { position: String, message: String },

    /// 样式提交失败（元素未渲染且强制提交被关闭或同样失败）
    #[error("样式提交失败：{message}{location}")]
    CommitStyles {
        message: String,
        location: ErrorLocation,
    },

    /// 对已被序列持有的片段直接调用播放控制
    #[error("片段已由序列持有，不允许直接调用 '{operation}'，请通过父结构驱动{location}")]
    ChildPlayback {
        operation: String,
        location: ErrorLocation,
    },

    /// 效果库中找不到指定效果
    #[error("类别 {category} 中没有名为 '{effect}' 的效果")]
    UnknownEffect { category: String, effect: String },
}

/// 序列级错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SequenceError {
    /// 对已被时间轴持有的序列直接调用播放控制
    #[error("序列已由时间轴持有，不允许直接调用 '{operation}'，请通过时间轴驱动{location}")]
    ChildPlayback {
        operation: String,
        location: ErrorLocation,
    },

    /// 播放中不允许的操作（结构修改、重复播放等）
    #[error("序列操作 '{operation}' 被拒绝：{reason}{location}")]
    LockedOperation {
        operation: String,
        reason: String,
        location: ErrorLocation,
    },

    /// 空序列不能播放
    #[error("序列不包含任何片段，无法播放{location}")]
    NoClips { location: ErrorLocation },
}

/// 时间轴级错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TimelineError {
    /// 动画进行中或跳转进行中不允许的操作
    #[error("时间轴操作 '{operation}' 被拒绝：{reason}")]
    LockedOperation { operation: String, reason: String },

    /// 在已加载位置之前插入/移除序列（破坏因果）
    #[error("时间悖论：不允许在已加载位置（{loaded_index}）之前修改结构（目标索引 {index}）")]
    TimeParadox { index: usize, loaded_index: usize },

    /// 添加的序列已有父时间轴，或处于正向完成状态
    #[error("无效的子序列：{message}")]
    InvalidChild { message: String },

    /// 步进越界（已在最前/最后）
    #[error("无法向{direction}步进：已到达时间轴边缘（当前第 {step_number} 步，共 {num_sequences} 个序列）")]
    StepEdge {
        direction: String,
        step_number: usize,
        num_sequences: usize,
    },

    /// 跳转目标标签未找到
    #[error("跳转失败：找不到匹配标签 '{tag}' 的序列")]
    TagNotFound { tag: String },

    /// 时间轴中找不到指定序列
    #[error("时间轴中没有 ID 为 {id} 的序列")]
    SequenceNotFound { id: u64 },

    /// 跳转目标位置越界
    #[error("跳转失败：目标位置 {target} 越界（合法范围 0..={max}）")]
    PositionOutOfBounds { target: isize, max: usize },
}

/// choreo-runtime 统一错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChoreoError {
    /// 片段级错误
    #[error("片段错误: {0}")]
    Clip(#[from] ClipError),

    /// 序列级错误
    #[error("序列错误: {0}")]
    Sequence(#[from] SequenceError),

    /// 时间轴级错误
    #[error("时间轴错误: {0}")]
    Timeline(#[from] TimelineError),
}

/// Result 类型别名
pub type ChoreoResult<T> = Result<T, ChoreoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_display() {
        let location = ErrorLocation {
            timeline_name: Some("demo".to_string()),
            step_number: Some(2),
            clip_category: Some("Entrance".to_string()),
            element_tag: Some("<div class=\"box\">".to_string()),
            ..Default::default()
        };

        let text = location.to_string();
        assert!(text.contains("时间轴 'demo'"));
        assert!(text.contains("第 2 步"));
        assert!(text.contains("<div class=\"box\">"));
    }

    #[test]
    fn test_empty_location_renders_nothing() {
        let location = ErrorLocation::default();
        assert!(location.is_empty());
        assert_eq!(location.to_string(), "");
    }

    #[test]
    fn test_error_conversion() {
        let err: ChoreoError = ClipError::UnknownEffect {
            category: "Entrance".to_string(),
            effect: "~missing".to_string(),
        }
        .into();

        assert!(matches!(err, ChoreoError::Clip(_)));
        assert!(err.to_string().contains("~missing"));
    }
}
