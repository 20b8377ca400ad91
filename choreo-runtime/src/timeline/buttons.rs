//! # Buttons 模块
//!
//! 播放按钮契约：时间轴与宿主 UI 按钮的配对与驱动。
//!
//! 按钮本体由宿主实现（本模块只定义 trait）；时间轴按
//! `timeline_name` 配对按钮，并在按下时驱动对应的播放操作。

use std::fmt;
use std::rc::Rc;

use tracing::warn;

/// 按钮动作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ButtonAction {
    StepForward,
    StepBackward,
    Pause,
    FastForward,
    ToggleSkipping,
}

impl ButtonAction {
    /// 全部动作（缺失告警时列举用）
    pub fn all() -> [ButtonAction; 5] {
        [
            Self::StepForward,
            Self::StepBackward,
            Self::Pause,
            Self::FastForward,
            Self::ToggleSkipping,
        ]
    }

    /// 用途描述
    pub fn label(&self) -> &'static str {
        match self {
            Self::StepForward => "step-forward",
            Self::StepBackward => "step-backward",
            Self::Pause => "pause",
            Self::FastForward => "fast-forward",
            Self::ToggleSkipping => "toggle-skipping",
        }
    }
}

/// 播放按钮契约
///
/// 宿主的自定义按钮元素实现此 trait；激活/去激活样式由按钮自理。
pub trait PlaybackButton {
    /// 按钮承担的动作
    fn action(&self) -> ButtonAction;

    /// 配对用的时间轴名称
    fn timeline_name(&self) -> &str;

    /// 激活样式（按下/开启）
    fn style_activation(&self) {}

    /// 去激活样式（释放/关闭）
    fn style_deactivation(&self) {}
}

/// 已配对的播放按钮集合
#[derive(Default, Clone)]
pub struct PlaybackButtons {
    pub forward_button: Option<Rc<dyn PlaybackButton>>,
    pub backward_button: Option<Rc<dyn PlaybackButton>>,
    pub pause_button: Option<Rc<dyn PlaybackButton>>,
    pub fast_forward_button: Option<Rc<dyn PlaybackButton>>,
    pub toggle_skipping_button: Option<Rc<dyn PlaybackButton>>,
}

impl fmt::Debug for PlaybackButtons {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackButtons")
            .field("forward", &self.forward_button.is_some())
            .field("backward", &self.backward_button.is_some())
            .field("pause", &self.pause_button.is_some())
            .field("fast_forward", &self.fast_forward_button.is_some())
            .field("toggle_skipping", &self.toggle_skipping_button.is_some())
            .finish()
    }
}

impl PlaybackButtons {
    /// 按动作取槽位
    pub fn slot(&self, action: ButtonAction) -> &Option<Rc<dyn PlaybackButton>> {
        match action {
            ButtonAction::StepForward => &self.forward_button,
            ButtonAction::StepBackward => &self.backward_button,
            ButtonAction::Pause => &self.pause_button,
            ButtonAction::FastForward => &self.fast_forward_button,
            ButtonAction::ToggleSkipping => &self.toggle_skipping_button,
        }
    }

    fn slot_mut(&mut self, action: ButtonAction) -> &mut Option<Rc<dyn PlaybackButton>> {
        match action {
            ButtonAction::StepForward => &mut self.forward_button,
            ButtonAction::StepBackward => &mut self.backward_button,
            ButtonAction::Pause => &mut self.pause_button,
            ButtonAction::FastForward => &mut self.fast_forward_button,
            ButtonAction::ToggleSkipping => &mut self.toggle_skipping_button,
        }
    }

    /// 从候选集中配对指定时间轴的按钮
    ///
    /// # 参数
    /// - `timeline_name`: 配对的时间轴名称
    /// - `candidates`: 宿主收集到的按钮集合
    /// - `subset`: 只配对这些动作（None 表示全部）
    ///
    /// 配不到的用途通过 `tracing::warn!` 列举，不影响播放。
    pub fn link(
        timeline_name: &str,
        candidates: &[Rc<dyn PlaybackButton>],
        subset: Option<&[ButtonAction]>,
    ) -> Self {
        let wanted: Vec<ButtonAction> = match subset {
            Some(actions) => actions.to_vec(),
            None => ButtonAction::all().to_vec(),
        };

        let mut buttons = Self::default();
        let mut missing: Vec<&'static str> = Vec::new();

        for action in wanted {
            let found = candidates
                .iter()
                .find(|b| b.action() == action && b.timeline_name() == timeline_name)
                .cloned();
            if found.is_none() {
                missing.push(action.label());
            }
            *buttons.slot_mut(action) = found;
        }

        if !missing.is_empty() {
            warn!(
                timeline = timeline_name,
                missing = ?missing,
                "部分播放按钮未找到"
            );
        }
        buttons
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct FakeButton {
        action: ButtonAction,
        timeline: String,
        activations: Cell<u32>,
    }

    impl FakeButton {
        fn new(action: ButtonAction, timeline: &str) -> Rc<Self> {
            Rc::new(Self {
                action,
                timeline: timeline.to_string(),
                activations: Cell::new(0),
            })
        }
    }

    impl PlaybackButton for FakeButton {
        fn action(&self) -> ButtonAction {
            self.action
        }

        fn timeline_name(&self) -> &str {
            &self.timeline
        }

        fn style_activation(&self) {
            self.activations.set(self.activations.get() + 1);
        }
    }

    #[test]
    fn test_link_pairs_by_timeline_name() {
        let forward = FakeButton::new(ButtonAction::StepForward, "demo");
        let other = FakeButton::new(ButtonAction::StepBackward, "别的时间轴");
        let candidates: Vec<Rc<dyn PlaybackButton>> = vec![forward, other];

        let buttons = PlaybackButtons::link("demo", &candidates, None);
        assert!(buttons.forward_button.is_some());
        // 名称不匹配的按钮不配对
        assert!(buttons.backward_button.is_none());
        assert!(buttons.pause_button.is_none());
    }

    #[test]
    fn test_link_subset_only() {
        let forward = FakeButton::new(ButtonAction::StepForward, "demo");
        let pause = FakeButton::new(ButtonAction::Pause, "demo");
        let candidates: Vec<Rc<dyn PlaybackButton>> = vec![forward, pause];

        let buttons =
            PlaybackButtons::link("demo", &candidates, Some(&[ButtonAction::StepForward]));
        assert!(buttons.forward_button.is_some());
        // 子集之外的动作不配对
        assert!(buttons.pause_button.is_none());
    }
}
