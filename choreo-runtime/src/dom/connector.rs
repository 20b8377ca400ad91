//! # Connector 模块
//!
//! 连接线元素契约。
//!
//! 连接线把两个元素的锚点连成一条线。调度核心只读写它的端点配置
//! 与追踪开关（ConnectorSetter / ConnectorEntrance / ConnectorExit
//! 的生命周期钩子），不负责画线。

use super::element::Element;
use crate::error::{ChoreoError, ClipError};

/// 端点定义：目标元素 + 盒内相对位置
///
/// `x` / `y` 是 0.0 - 1.0 的比例（0 = 左/上，1 = 右/下）。
#[derive(Debug, Clone)]
pub struct ConnectorPoint {
    pub element: Element,
    pub x: f64,
    pub y: f64,
}

impl ConnectorPoint {
    /// 创建端点
    pub fn new(element: Element, x: f64, y: f64) -> Self {
        Self { element, x, y }
    }

    /// 端点的宿主坐标
    pub fn position(&self) -> (f64, f64) {
        self.element.bounding_box().point_at(self.x, self.y)
    }
}

/// 解析端点位置字面量
///
/// 可接受的形式：`left` / `center` / `right` / `top` / `bottom` /
/// `"<n>%"`（0 - 100）。
///
/// # 返回
/// 0.0 - 1.0 的比例值
pub fn parse_placement(text: &str) -> Result<f64, ChoreoError> {
    let trimmed = text.trim();
    let fraction = match trimmed {
        "left" | "top" => 0.0,
        "center" => 0.5,
        "right" | "bottom" => 1.0,
        other => {
            let percent = other
                .strip_suffix('%')
                .and_then(|n| n.trim().parse::<f64>().ok())
                .ok_or_else(|| {
                    ChoreoError::Clip(ClipError::InvalidElement {
                        message: format!("无法解析端点位置 '{}'", text),
                        location: Default::default(),
                    })
                })?;
            if !(0.0..=100.0).contains(&percent) {
                return Err(ChoreoError::Clip(ClipError::InvalidElement {
                    message: format!("端点百分比 {} 超出 0-100 范围", percent),
                    location: Default::default(),
                }));
            }
            percent / 100.0
        }
    };
    Ok(fraction)
}

/// 连接线状态快照（ConnectorSetter 的暂存/恢复单元）
#[derive(Debug, Clone, Default)]
pub struct ConnectorStash {
    pub point_a: Option<ConnectorPoint>,
    pub point_b: Option<ConnectorPoint>,
    pub point_tracking_enabled: bool,
}

/// 连接线元素
///
/// 包装一个普通 [`Element`] 并附加端点状态。
#[derive(Debug, Clone)]
pub struct Connector {
    element: Element,
    state: std::rc::Rc<std::cell::RefCell<ConnectorState>>,
}

#[derive(Debug, Default)]
struct ConnectorState {
    point_a: Option<ConnectorPoint>,
    point_b: Option<ConnectorPoint>,
    /// 端点是否跟随目标元素持续更新
    point_tracking_enabled: bool,
    /// 持续追踪循环是否正在运行
    tracking_active: bool,
    /// 最近一次计算出的端点坐标
    computed_a: (f64, f64),
    computed_b: (f64, f64),
}

impl Connector {
    /// 创建连接线（默认开启端点追踪）
    pub fn new() -> Self {
        Self {
            element: Element::new("choreo-connector"),
            state: std::rc::Rc::new(std::cell::RefCell::new(ConnectorState {
                point_tracking_enabled: true,
                ..Default::default()
            })),
        }
    }

    /// 底层元素句柄
    pub fn element(&self) -> &Element {
        &self.element
    }

    /// 设置 A 端点
    pub fn set_point_a(&self, point: Option<ConnectorPoint>) {
        self.state.borrow_mut().point_a = point;
    }

    /// 设置 B 端点
    pub fn set_point_b(&self, point: Option<ConnectorPoint>) {
        self.state.borrow_mut().point_b = point;
    }

    /// A 端点
    pub fn point_a(&self) -> Option<ConnectorPoint> {
        self.state.borrow().point_a.clone()
    }

    /// B 端点
    pub fn point_b(&self) -> Option<ConnectorPoint> {
        self.state.borrow().point_b.clone()
    }

    /// 设置端点追踪开关
    pub fn set_point_tracking(&self, enabled: bool) {
        self.state.borrow_mut().point_tracking_enabled = enabled;
    }

    /// 端点追踪是否开启
    pub fn point_tracking_enabled(&self) -> bool {
        self.state.borrow().point_tracking_enabled
    }

    /// 重新计算端点坐标
    pub fn update_endpoints(&self) {
        let mut state = self.state.borrow_mut();
        if let Some(a) = &state.point_a {
            state.computed_a = a.position();
        }
        if let Some(b) = &state.point_b {
            state.computed_b = b.position();
        }
    }

    /// 开始持续端点更新（宿主在每帧调用 [`tick_tracking`](Self::tick_tracking)）
    pub fn continuously_update_endpoints(&self) {
        self.state.borrow_mut().tracking_active = true;
    }

    /// 取消持续端点更新
    pub fn cancel_continuous_updates(&self) {
        self.state.borrow_mut().tracking_active = false;
    }

    /// 持续追踪是否在运行
    pub fn is_tracking(&self) -> bool {
        self.state.borrow().tracking_active
    }

    /// 每帧追踪推进：追踪开启时重算端点
    pub fn tick_tracking(&self) {
        if self.is_tracking() {
            self.update_endpoints();
        }
    }

    /// 最近一次计算出的端点坐标 (a, b)
    pub fn computed_endpoints(&self) -> ((f64, f64), (f64, f64)) {
        let state = self.state.borrow();
        (state.computed_a, state.computed_b)
    }

    /// 暂存当前端点状态（ConnectorSetter 正向启动时调用）
    pub fn stash(&self) -> ConnectorStash {
        let state = self.state.borrow();
        ConnectorStash {
            point_a: state.point_a.clone(),
            point_b: state.point_b.clone(),
            point_tracking_enabled: state.point_tracking_enabled,
        }
    }

    /// 恢复暂存的端点状态（ConnectorSetter 反向启动时调用）
    pub fn restore(&self, stash: &ConnectorStash) {
        let mut state = self.state.borrow_mut();
        state.point_a = stash.point_a.clone();
        state.point_b = stash.point_b.clone();
        state.point_tracking_enabled = stash.point_tracking_enabled;
    }
}

impl Default for Connector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Rect;

    #[test]
    fn test_parse_placement() {
        assert_eq!(parse_placement("left").unwrap(), 0.0);
        assert_eq!(parse_placement("center").unwrap(), 0.5);
        assert_eq!(parse_placement("bottom").unwrap(), 1.0);
        assert_eq!(parse_placement("25%").unwrap(), 0.25);

        assert!(parse_placement("sideways").is_err());
        assert!(parse_placement("120%").is_err());
    }

    #[test]
    fn test_endpoint_computation() {
        let target = Element::new("div");
        target.set_bounding_box(Rect::new(100.0, 0.0, 50.0, 20.0));

        let connector = Connector::new();
        connector.set_point_a(Some(ConnectorPoint::new(target.clone(), 0.0, 0.5)));
        connector.set_point_b(Some(ConnectorPoint::new(target, 1.0, 0.5)));
        connector.update_endpoints();

        let (a, b) = connector.computed_endpoints();
        assert_eq!(a, (100.0, 10.0));
        assert_eq!(b, (150.0, 10.0));
    }

    #[test]
    fn test_tracking_follows_target() {
        let target = Element::new("div");
        target.set_bounding_box(Rect::new(0.0, 0.0, 10.0, 10.0));

        let connector = Connector::new();
        connector.set_point_a(Some(ConnectorPoint::new(target.clone(), 0.0, 0.0)));
        connector.continuously_update_endpoints();
        connector.tick_tracking();
        assert_eq!(connector.computed_endpoints().0, (0.0, 0.0));

        // 目标移动后，追踪帧重算端点
        target.set_bounding_box(Rect::new(30.0, 40.0, 10.0, 10.0));
        connector.tick_tracking();
        assert_eq!(connector.computed_endpoints().0, (30.0, 40.0));

        // 取消追踪后不再更新
        connector.cancel_continuous_updates();
        target.set_bounding_box(Rect::new(99.0, 99.0, 10.0, 10.0));
        connector.tick_tracking();
        assert_eq!(connector.computed_endpoints().0, (30.0, 40.0));
    }

    #[test]
    fn test_stash_restore() {
        let target = Element::new("div");
        let connector = Connector::new();
        connector.set_point_a(Some(ConnectorPoint::new(target, 0.5, 0.5)));
        connector.set_point_tracking(false);

        let stash = connector.stash();

        connector.set_point_a(None);
        connector.set_point_tracking(true);
        assert!(connector.point_a().is_none());

        connector.restore(&stash);
        assert!(connector.point_a().is_some());
        assert!(!connector.point_tracking_enabled());
    }
}
