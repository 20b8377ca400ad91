//! # Signal 模块
//!
//! 单线程共享状态的承诺原语，是调度核心的唯一"异步"构件。
//!
//! ## 设计说明
//!
//! 引擎采用逐帧推进（tick）模型，没有线程和 async 运行时。
//! "等待某个事件"被建模为一对句柄：
//!
//! - [`Signal`]：解析端。引擎在播放头越过时间承诺位置时解析，
//!   或由外部（作者代码）手动解析路障
//! - [`Waiter`]：观察端。每次 tick 检查是否已解析
//!
//! 两端共享同一个 `Rc<RefCell<_>>` 状态，与对象属性共享采用同一模式。
//!
//! ```text
//! let (signal, waiter) = signal_pair();
//! assert!(waiter.is_pending());
//! signal.resolve();
//! assert!(waiter.is_resolved());
//! ```

use crate::error::ChoreoError;
use std::cell::RefCell;
use std::rc::Rc;

/// 承诺状态
#[derive(Debug, Clone, PartialEq)]
enum SignalState {
    /// 尚未解析
    Pending,
    /// 已成功解析
    Resolved,
    /// 已失败（携带错误）
    Rejected(ChoreoError),
}

/// 承诺的解析端
///
/// 持有者调用 [`resolve`](Signal::resolve) 或 [`reject`](Signal::reject)
/// 使所有关联的 [`Waiter`] 观察到结果。可克隆，任意一份解析均生效。
#[derive(Debug, Clone)]
pub struct Signal {
    state: Rc<RefCell<SignalState>>,
}

impl Signal {
    /// 解析承诺
    ///
    /// 已解析/已失败的承诺再次解析是无操作。
    pub fn resolve(&self) {
        let mut state = self.state.borrow_mut();
        if *state == SignalState::Pending {
            *state = SignalState::Resolved;
        }
    }

    /// 使承诺失败
    pub fn reject(&self, error: ChoreoError) {
        let mut state = self.state.borrow_mut();
        if *state == SignalState::Pending {
            *state = SignalState::Rejected(error);
        }
    }

    /// 获取一个新的观察端
    pub fn waiter(&self) -> Waiter {
        Waiter {
            state: Rc::clone(&self.state),
        }
    }
}

/// 承诺的观察端
///
/// 引擎在每次 tick 检查 `is_resolved` 决定是否解除阻塞。
#[derive(Debug, Clone)]
pub struct Waiter {
    state: Rc<RefCell<SignalState>>,
}

impl Waiter {
    /// 创建一个立即已解析的观察端
    pub fn resolved() -> Self {
        Self {
            state: Rc::new(RefCell::new(SignalState::Resolved)),
        }
    }

    /// 是否仍在等待
    pub fn is_pending(&self) -> bool {
        *self.state.borrow() == SignalState::Pending
    }

    /// 是否已成功解析
    pub fn is_resolved(&self) -> bool {
        *self.state.borrow() == SignalState::Resolved
    }

    /// 是否已失败
    pub fn is_rejected(&self) -> bool {
        matches!(&*self.state.borrow(), SignalState::Rejected(_))
    }

    /// 是否已结束（成功或失败）
    ///
    /// 阻塞点采用 allSettled 语义：成员全部结束即可放行，
    /// 失败的成员不会使阻塞永远卡住。
    pub fn is_settled(&self) -> bool {
        !self.is_pending()
    }

    /// 获取失败错误（若已失败）
    pub fn error(&self) -> Option<ChoreoError> {
        match &*self.state.borrow() {
            SignalState::Rejected(e) => Some(e.clone()),
            _ => None,
        }
    }
}

/// 创建一对承诺句柄
pub fn signal_pair() -> (Signal, Waiter) {
    let state = Rc::new(RefCell::new(SignalState::Pending));
    (
        Signal {
            state: Rc::clone(&state),
        },
        Waiter { state },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ChoreoError, TimelineError};

    #[test]
    fn test_resolve() {
        let (signal, waiter) = signal_pair();
        assert!(waiter.is_pending());
        assert!(!waiter.is_settled());

        signal.resolve();
        assert!(waiter.is_resolved());
        assert!(waiter.is_settled());
        assert!(waiter.error().is_none());
    }

    #[test]
    fn test_reject() {
        let (signal, waiter) = signal_pair();
        signal.reject(ChoreoError::Timeline(TimelineError::LockedOperation {
            operation: "pause".to_string(),
            reason: "test".to_string(),
        }));

        assert!(waiter.is_rejected());
        assert!(waiter.is_settled());
        assert!(waiter.error().is_some());

        // 失败后 resolve 无效
        signal.resolve();
        assert!(waiter.is_rejected());
    }

    #[test]
    fn test_shared_observation() {
        let (signal, waiter1) = signal_pair();
        let waiter2 = waiter1.clone();
        let waiter3 = signal.waiter();

        signal.resolve();
        assert!(waiter1.is_resolved());
        assert!(waiter2.is_resolved());
        assert!(waiter3.is_resolved());
    }

    #[test]
    fn test_immediately_resolved() {
        let waiter = Waiter::resolved();
        assert!(waiter.is_resolved());
    }

    #[test]
    fn test_dropped_signal_stays_pending() {
        let (signal, waiter) = signal_pair();
        drop(signal);
        // 解析端被丢弃后承诺永远挂起，这正是"永不解析的路障"语义
        assert!(waiter.is_pending());
    }
}
