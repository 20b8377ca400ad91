//! 时间轴导航端到端测试：步进、自动连播、跳转与结构锁。

use choreo_runtime::{
    AnimTimeline, AutoplayDetection, ChoreoError, Choreographer, EffectArgs, EffectBank,
    EffectCategory, EffectEntry, EffectGenerator, Element, JumpPosition, Keyframes,
    PartialClipConfig, SequenceConfig, TagSearch, TagSearchDirection, TimelineConfig,
    TimelineError,
};

fn studio() -> Choreographer {
    let mut bank = EffectBank::new();
    bank.insert(
        EffectCategory::Emphasis,
        "~noop",
        EffectEntry::new(EffectGenerator::from_static_frames(Keyframes::empty(), None))
            .with_config(PartialClipConfig::new().commits_styles(false)),
    );
    Choreographer::with_banks(bank)
}

/// 构造带 n 个序列的时间轴；每个序列一个 100ms 的片段
fn timeline_with(studio: &Choreographer, configs: Vec<SequenceConfig>) -> AnimTimeline {
    let mut timeline = studio.new_timeline(TimelineConfig {
        timeline_name: "导航测试".to_string(),
        ..Default::default()
    });
    let sequences = configs
        .into_iter()
        .enumerate()
        .map(|(i, config)| {
            let mut seq = studio.new_sequence(config);
            seq.set_tag(format!("seq-{}", i));
            let elem = Element::new("div");
            seq.add_clips(vec![studio
                .emphasis(
                    &elem,
                    "~noop",
                    EffectArgs::none(),
                    &PartialClipConfig::new().duration(100.0),
                )
                .unwrap()])
            .unwrap();
            seq
        })
        .collect();
    timeline.add_sequences(sequences).unwrap();
    timeline
}

fn drive(timeline: &mut AnimTimeline, step_ms: f64, max_ms: f64) {
    let mut elapsed = 0.0;
    while timeline.is_animating() {
        timeline.update(step_ms).unwrap();
        elapsed += step_ms;
        assert!(elapsed <= max_ms, "时间轴在 {} 毫秒内未静止", max_ms);
    }
}

fn plain_config() -> SequenceConfig {
    SequenceConfig::default()
}

#[test]
fn step_forward_then_backward_restores_index() {
    let studio = studio();
    let mut timeline = timeline_with(&studio, vec![plain_config(), plain_config()]);
    assert_eq!(timeline.loaded_seq_index(), 0);
    assert_eq!(timeline.step_number(), 1);

    timeline.step_forward().unwrap();
    drive(&mut timeline, 50.0, 1000.0);
    assert_eq!(timeline.loaded_seq_index(), 1);

    timeline.step_backward().unwrap();
    drive(&mut timeline, 50.0, 1000.0);
    assert_eq!(timeline.loaded_seq_index(), 0);
}

#[test]
fn step_rejected_at_edges() {
    let studio = studio();
    let mut timeline = timeline_with(&studio, vec![plain_config()]);

    assert!(matches!(
        timeline.step_backward(),
        Err(ChoreoError::Timeline(TimelineError::StepEdge { .. }))
    ));

    timeline.step_forward().unwrap();
    drive(&mut timeline, 50.0, 1000.0);
    assert!(matches!(
        timeline.step_forward(),
        Err(ChoreoError::Timeline(TimelineError::StepEdge { .. }))
    ));
}

#[test]
fn autoplay_chain_spans_either_side_of_boundary() {
    let studio = studio();
    // seq0.autoplays_next = true；seq1 无标志；seq2.autoplays = true
    let mut timeline = timeline_with(
        &studio,
        vec![
            SequenceConfig {
                autoplays_next_sequence: true,
                ..Default::default()
            },
            plain_config(),
            SequenceConfig {
                autoplays: true,
                ..Default::default()
            },
        ],
    );

    // 一次步进：seq0 -> (seq0.anext) seq1 -> (seq2.autoplays) seq2
    timeline.step_forward().unwrap();
    drive(&mut timeline, 50.0, 2000.0);
    assert_eq!(timeline.loaded_seq_index(), 3);

    // 反向同样整链回退
    timeline.step_backward().unwrap();
    drive(&mut timeline, 50.0, 2000.0);
    assert_eq!(timeline.loaded_seq_index(), 0);
}

#[test]
fn jump_to_position_lands_exactly() {
    let studio = studio();
    let mut timeline = timeline_with(
        &studio,
        vec![plain_config(), plain_config(), plain_config()],
    );

    timeline
        .jump_to_position(JumpPosition::Index(2), AutoplayDetection::None)
        .unwrap();
    // 跳转同步完成
    assert!(!timeline.is_animating());
    assert_eq!(timeline.loaded_seq_index(), 2);

    // 从任意起点跳回任意合法位置
    timeline
        .jump_to_position(JumpPosition::Beginning, AutoplayDetection::None)
        .unwrap();
    assert_eq!(timeline.loaded_seq_index(), 0);

    timeline
        .jump_to_position(JumpPosition::End, AutoplayDetection::None)
        .unwrap();
    assert_eq!(timeline.loaded_seq_index(), 3);

    assert!(matches!(
        timeline.jump_to_position(JumpPosition::Index(4), AutoplayDetection::None),
        Err(ChoreoError::Timeline(TimelineError::PositionOutOfBounds { .. }))
    ));
}

#[test]
fn jump_with_forward_autoplay_detection_extends_chain() {
    let studio = studio();
    // seqA、seqB(autoplays, anext)、seqC
    let mut timeline = timeline_with(
        &studio,
        vec![
            plain_config(),
            SequenceConfig {
                autoplays: true,
                autoplays_next_sequence: true,
                ..Default::default()
            },
            plain_config(),
        ],
    );

    timeline
        .jump_to_position(JumpPosition::Index(1), AutoplayDetection::Forward)
        .unwrap();
    // 落点 1 处 seqB.autoplays 成立 -> 前进；seqB.anext 成立 -> 再前进
    assert_eq!(timeline.loaded_seq_index(), 3);
}

#[test]
fn tag_search_directions() {
    let studio = studio();
    let mut timeline = timeline_with(
        &studio,
        vec![plain_config(), plain_config(), plain_config(), plain_config()],
    );
    // 放两个同名标签验证检索方向（0 与 2）
    timeline.sequence_mut(0).unwrap().set_tag("dup");
    timeline.sequence_mut(2).unwrap().set_tag("dup");

    // 从头向后：命中最低索引
    timeline
        .jump_to_sequence_tag("dup", TagSearch::default())
        .unwrap();
    assert_eq!(timeline.loaded_seq_index(), 0);

    // 从末尾向前：命中最高索引
    timeline
        .jump_to_sequence_tag(
            "dup",
            TagSearch {
                direction: TagSearchDirection::BackwardFromEnd,
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(timeline.loaded_seq_index(), 2);

    // 落点偏移
    timeline
        .jump_to_sequence_tag(
            "dup",
            TagSearch {
                direction: TagSearchDirection::ForwardFromBeginning,
                target_offset: 1,
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(timeline.loaded_seq_index(), 1);

    // 未命中标签报错，且不移动
    let before = timeline.loaded_seq_index();
    assert!(matches!(
        timeline.jump_to_sequence_tag("不存在", TagSearch::default()),
        Err(ChoreoError::Timeline(TimelineError::TagNotFound { .. }))
    ));
    assert_eq!(timeline.loaded_seq_index(), before);
}

#[test]
fn tag_search_with_regex() {
    use regex_lite::Regex;

    let studio = studio();
    let mut timeline = timeline_with(&studio, vec![plain_config(), plain_config()]);

    let pattern = Regex::new(r"^seq-\d$").unwrap();
    timeline
        .jump_to_sequence_tag_matching(
            &pattern,
            TagSearch {
                direction: TagSearchDirection::BackwardFromEnd,
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(timeline.loaded_seq_index(), 1);
}

#[test]
fn jump_restores_pause_state() {
    let studio = studio();
    let mut timeline = timeline_with(&studio, vec![plain_config(), plain_config()]);

    timeline.pause().unwrap();
    timeline
        .jump_to_position(JumpPosition::Index(2), AutoplayDetection::None)
        .unwrap();

    // 跳转后暂停状态复原
    assert!(timeline.is_paused());
    assert_eq!(timeline.loaded_seq_index(), 2);
}

#[test]
fn structure_locked_while_animating() {
    let studio = studio();
    let mut timeline = timeline_with(&studio, vec![plain_config(), plain_config()]);

    timeline.step_forward().unwrap();
    assert!(timeline.is_animating());

    let orphan = studio.new_sequence(SequenceConfig::default());
    assert!(matches!(
        timeline.add_sequences(vec![orphan]),
        Err(ChoreoError::Timeline(TimelineError::LockedOperation { .. }))
    ));
    assert!(matches!(
        timeline.step_forward(),
        Err(ChoreoError::Timeline(TimelineError::LockedOperation { .. }))
    ));

    drive(&mut timeline, 50.0, 1000.0);
}

#[test]
fn time_paradox_guards_loaded_prefix() {
    let studio = studio();
    let mut timeline = timeline_with(&studio, vec![plain_config(), plain_config()]);

    timeline.step_forward().unwrap();
    drive(&mut timeline, 50.0, 1000.0);
    assert_eq!(timeline.loaded_seq_index(), 1);

    // 在已加载位置之前插入/移除被拒绝
    let orphan = studio.new_sequence(SequenceConfig::default());
    assert!(matches!(
        timeline.add_sequences_at(0, vec![orphan]),
        Err(ChoreoError::Timeline(TimelineError::TimeParadox { .. }))
    ));
    assert!(matches!(
        timeline.remove_sequences_at(0, 1),
        Err(ChoreoError::Timeline(TimelineError::TimeParadox { .. }))
    ));

    // 已加载位置之后允许
    let orphan = studio.new_sequence(SequenceConfig::default());
    timeline.add_sequences_at(2, vec![orphan]).unwrap();
    assert_eq!(timeline.num_sequences(), 3);
}

#[test]
fn remove_sequences_by_id() {
    let studio = studio();
    let mut timeline = timeline_with(
        &studio,
        vec![plain_config(), plain_config(), plain_config()],
    );
    let id0 = timeline.sequence(0).unwrap().id();
    let id2 = timeline.sequence(2).unwrap().id();

    // 动画进行中拒绝
    timeline.step_forward().unwrap();
    assert!(matches!(
        timeline.remove_sequences(&[id2]),
        Err(ChoreoError::Timeline(TimelineError::LockedOperation { .. }))
    ));
    drive(&mut timeline, 50.0, 1000.0);
    assert_eq!(timeline.loaded_seq_index(), 1);

    // 命中已加载位置之前的序列：时间悖论，结构保持原样
    assert!(matches!(
        timeline.remove_sequences(&[id0, id2]),
        Err(ChoreoError::Timeline(TimelineError::TimeParadox { .. }))
    ));
    assert_eq!(timeline.num_sequences(), 3);

    // 未知 ID
    assert!(matches!(
        timeline.remove_sequences(&[choreo_runtime::SequenceId(9999)]),
        Err(ChoreoError::Timeline(TimelineError::SequenceNotFound { .. }))
    ));

    // 已加载位置之后允许；父引用清除，可再入其他时间轴
    let removed = timeline.remove_sequences(&[id2]).unwrap();
    assert_eq!(removed.len(), 1);
    assert_eq!(timeline.num_sequences(), 2);

    let mut other = studio.new_timeline(TimelineConfig::default());
    other.add_sequences(removed).unwrap();
}

#[test]
fn sequence_with_parent_rejected_as_child() {
    let studio1 = studio();
    let mut t1 = timeline_with(&studio1, vec![plain_config()]);
    let mut t2 = studio1.new_timeline(TimelineConfig::default());

    // 从 t1 中取出的序列已清除父引用，可再入 t2
    let seq = t1.remove_sequences_at(0, 1).unwrap().pop().unwrap();
    t2.add_sequences(vec![seq]).unwrap();

    // 直接挪用 t2 里的序列不可能（所有权在 t2），
    // 这里验证正向完成态的序列不能再入轴
    let studio2 = studio();
    let elem = Element::new("div");
    let mut finished = studio2.new_sequence(SequenceConfig::default());
    finished
        .add_clips(vec![studio2
            .emphasis(
                &elem,
                "~noop",
                EffectArgs::none(),
                &PartialClipConfig::new().duration(50.0),
            )
            .unwrap()])
        .unwrap();
    finished.play().unwrap();
    while !finished.update(50.0).unwrap() {}

    assert!(matches!(
        t2.add_sequences(vec![finished]),
        Err(ChoreoError::Timeline(TimelineError::InvalidChild { .. }))
    ));
}

#[test]
fn skipping_completes_steps_synchronously() {
    let studio = studio();
    let mut timeline = timeline_with(&studio, vec![plain_config(), plain_config()]);

    timeline.turn_skipping_on().unwrap();
    timeline.step_forward().unwrap();
    // 跳过模式下一步同步完成
    assert!(!timeline.is_animating());
    assert_eq!(timeline.loaded_seq_index(), 1);

    timeline.turn_skipping_off();
    timeline.step_forward().unwrap();
    assert!(timeline.is_animating());
    drive(&mut timeline, 50.0, 1000.0);
}

#[test]
fn toggle_skipping_finishes_in_flight_step() {
    let studio = studio();
    let mut timeline = timeline_with(&studio, vec![plain_config()]);

    timeline.step_forward().unwrap();
    timeline.update(30.0).unwrap();
    assert!(timeline.is_animating());

    // 开启跳过会先把在播放中的序列非时序完成
    timeline.turn_skipping_on().unwrap();
    assert!(!timeline.is_animating());
    assert_eq!(timeline.loaded_seq_index(), 1);
}

#[test]
fn jump_rejected_while_animating() {
    let studio = studio();
    let mut timeline = timeline_with(&studio, vec![plain_config(), plain_config()]);

    timeline.step_forward().unwrap();
    assert!(matches!(
        timeline.jump_to_position(JumpPosition::Index(0), AutoplayDetection::None),
        Err(ChoreoError::Timeline(TimelineError::LockedOperation { .. }))
    ));
    drive(&mut timeline, 50.0, 1000.0);
}
