//! # Snapshot 模块
//!
//! 播放位置快照：可序列化的时间轴进度，供宿主 UI 展示或持久化。
//!
//! 快照只覆盖纯数据（名称、索引、播放标志），不含在飞的播放
//! 机械（承诺、阻塞点、闭包）。

use serde::{Deserialize, Serialize};

use crate::timeline::AnimTimeline;

/// 序列快照
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceSnapshot {
    pub tag: Option<String>,
    pub description: Option<String>,
    pub was_played: bool,
    pub was_rewound: bool,
}

/// 时间轴快照
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineSnapshot {
    pub timeline_name: String,
    /// 作者可见的步骤编号（1 起始）
    pub step_number: usize,
    pub loaded_seq_index: usize,
    pub num_sequences: usize,
    pub sequences: Vec<SequenceSnapshot>,
}

impl TimelineSnapshot {
    /// 截取当前进度
    pub fn capture(timeline: &AnimTimeline) -> Self {
        let sequences = (0..timeline.num_sequences())
            .map(|i| {
                let sequence = timeline.sequence(i).expect("索引合法");
                SequenceSnapshot {
                    tag: sequence.tag().map(str::to_string),
                    description: sequence.description().map(str::to_string),
                    was_played: sequence.was_played(),
                    was_rewound: sequence.was_rewound(),
                }
            })
            .collect();

        Self {
            timeline_name: timeline.config().timeline_name.clone(),
            step_number: timeline.step_number(),
            loaded_seq_index: timeline.loaded_seq_index(),
            num_sequences: timeline.num_sequences(),
            sequences,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Choreographer;
    use crate::sequence::SequenceConfig;
    use crate::timeline::TimelineConfig;

    #[test]
    fn test_capture_and_roundtrip() {
        let studio = Choreographer::new();
        let mut timeline = studio.new_timeline(TimelineConfig {
            timeline_name: "demo".to_string(),
            ..Default::default()
        });

        let mut seq = studio.new_sequence(SequenceConfig::default());
        seq.set_tag("intro");
        seq.set_description("开场");
        timeline.add_sequences(vec![seq]).unwrap();

        let snapshot = TimelineSnapshot::capture(&timeline);
        assert_eq!(snapshot.timeline_name, "demo");
        assert_eq!(snapshot.step_number, 1);
        assert_eq!(snapshot.sequences.len(), 1);
        assert_eq!(snapshot.sequences[0].tag.as_deref(), Some("intro"));

        let json = serde_json::to_string(&snapshot).unwrap();
        let back: TimelineSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(snapshot, back);
    }
}
