//! # Diagnostic 模块
//!
//! 结构静态分析：对已搭建的时间轴/序列做纯只读检查，
//! 报告可能的编排问题。
//!
//! ## 设计原则
//!
//! - 只读：不触碰播放状态，不执行提交
//! - 非阻断：结果仅供作者参考，不影响播放

use serde::{Deserialize, Serialize};

use crate::clip::CompositeMode;
use crate::sequence::AnimSequence;
use crate::timeline::AnimTimeline;

/// 诊断级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticLevel {
    /// 提示
    Info,
    /// 警告：很可能不是作者想要的
    Warning,
}

/// 单条诊断
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub message: String,
    /// 所在序列索引（时间轴分析时有值）
    pub sequence_index: Option<usize>,
    /// 所在片段索引
    pub clip_index: Option<usize>,
}

impl Diagnostic {
    fn warning(message: String) -> Self {
        Self {
            level: DiagnosticLevel::Warning,
            message,
            sequence_index: None,
            clip_index: None,
        }
    }

    fn at(mut self, sequence_index: Option<usize>, clip_index: Option<usize>) -> Self {
        self.sequence_index = sequence_index;
        self.clip_index = clip_index;
        self
    }
}

/// 分析单个序列
pub fn analyze_sequence(sequence: &AnimSequence) -> Vec<Diagnostic> {
    let mut findings = Vec::new();

    if sequence.num_clips() == 0 {
        findings.push(Diagnostic::warning("序列不包含任何片段，播放会被拒绝".to_string()));
    }

    // 重建分组（只读），检查同组内对同一元素的 Replace 写入
    let mut group_start = 0usize;
    let mut index = 0usize;
    while index < sequence.num_clips() {
        let joins = index > group_start
            && (sequence.clip(index).map(|c| c.config().starts_with_previous).unwrap_or(false)
                || sequence
                    .clip(index - 1)
                    .map(|c| c.config().starts_next_clip_too)
                    .unwrap_or(false));
        if index > group_start && !joins {
            check_group(sequence, group_start, index, &mut findings);
            group_start = index;
        }
        index += 1;
    }
    check_group(sequence, group_start, sequence.num_clips(), &mut findings);

    // 零时长 + 提交样式：提交的是"开始即结束"的末帧，多半是漏配了时长
    for i in 0..sequence.num_clips() {
        let clip = sequence.clip(i).expect("索引合法");
        if clip.config().timing.duration == 0.0 && clip.config().commits_styles {
            findings.push(
                Diagnostic::warning(format!(
                    "片段 '{}' 时长为 0 且开启了样式提交",
                    clip.effect_name()
                ))
                .at(None, Some(i)),
            );
        }
    }

    findings
}

/// 同一并行组内，多个片段以 Replace 合成模式驱动同一元素
fn check_group(
    sequence: &AnimSequence,
    start: usize,
    end: usize,
    findings: &mut Vec<Diagnostic>,
) {
    for i in start..end {
        for j in (i + 1)..end {
            let (a, b) = (
                sequence.clip(i).expect("索引合法"),
                sequence.clip(j).expect("索引合法"),
            );
            if a.target().ptr_eq(b.target())
                && a.config().composite == CompositeMode::Replace
                && b.config().composite == CompositeMode::Replace
            {
                findings.push(
                    Diagnostic::warning(format!(
                        "片段 '{}' 与 '{}' 并行驱动同一元素且均为 Replace 合成，后者会覆盖前者",
                        a.effect_name(),
                        b.effect_name()
                    ))
                    .at(None, Some(j)),
                );
            }
        }
    }
}

/// 分析整个时间轴
pub fn analyze_timeline(timeline: &AnimTimeline) -> Vec<Diagnostic> {
    let mut findings = Vec::new();

    // 重复标签：跳转检索只会命中其一
    for i in 0..timeline.num_sequences() {
        let Some(tag) = timeline.sequence(i).and_then(|s| s.tag()) else {
            continue;
        };
        for j in (i + 1)..timeline.num_sequences() {
            if timeline.sequence(j).and_then(|s| s.tag()) == Some(tag) {
                findings.push(
                    Diagnostic::warning(format!("标签 '{}' 在序列 {} 与 {} 上重复", tag, i, j))
                        .at(Some(j), None),
                );
            }
        }
    }

    for i in 0..timeline.num_sequences() {
        let sequence = timeline.sequence(i).expect("索引合法");
        for mut finding in analyze_sequence(sequence) {
            finding.sequence_index = Some(i);
            findings.push(finding);
        }
    }

    findings
}
