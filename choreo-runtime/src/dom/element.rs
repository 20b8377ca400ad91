//! # Element 模块
//!
//! 元素句柄：调度核心可见的宿主元素状态。

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use super::{CLASS_FORCE_SHOW, CLASS_HIDDEN};

/// 包围盒（宿主坐标，像素）
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    /// 创建包围盒
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// 按比例取盒内一点（0.0 = 左/上边缘，1.0 = 右/下边缘）
    pub fn point_at(&self, fx: f64, fy: f64) -> (f64, f64) {
        (self.x + self.width * fx, self.y + self.height * fy)
    }
}

/// 元素内部状态
#[derive(Debug)]
struct ElementData {
    /// 标签名（如 `div`）
    tag_name: String,
    /// CSS 类列表（保持插入顺序）
    classes: Vec<String>,
    /// 内联样式（属性名 -> 值，保持插入顺序）
    inline_styles: Vec<(String, String)>,
    /// 包围盒（由宿主/测试夹具设置，调度核心只读取）
    bounding_box: Rect,
    /// 滚动偏移
    scroll_left: f64,
    scroll_top: f64,
    /// 父元素（弱引用，不拥有）
    parent: Weak<RefCell<ElementData>>,
}

/// 元素句柄
///
/// `Rc<RefCell<_>>` 共享：片段持有克隆句柄，修改对所有持有者可见。
#[derive(Debug, Clone)]
pub struct Element {
    inner: Rc<RefCell<ElementData>>,
}

impl Element {
    /// 创建新元素
    pub fn new(tag_name: impl Into<String>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ElementData {
                tag_name: tag_name.into(),
                classes: Vec::new(),
                inline_styles: Vec::new(),
                bounding_box: Rect::default(),
                scroll_left: 0.0,
                scroll_top: 0.0,
                parent: Weak::new(),
            })),
        }
    }

    /// 把 `child` 挂到本元素下（只记录父链，不维护子列表）
    pub fn append_child(&self, child: &Element) {
        child.inner.borrow_mut().parent = Rc::downgrade(&self.inner);
    }

    /// 两个句柄是否指向同一元素
    pub fn ptr_eq(&self, other: &Element) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// 标签名
    pub fn tag_name(&self) -> String {
        self.inner.borrow().tag_name.clone()
    }

    // ========== CSS 类 ==========

    /// 添加类（已存在则无操作）
    pub fn add_class(&self, class: &str) {
        let mut data = self.inner.borrow_mut();
        if !data.classes.iter().any(|c| c == class) {
            data.classes.push(class.to_string());
        }
    }

    /// 移除类
    pub fn remove_class(&self, class: &str) {
        self.inner.borrow_mut().classes.retain(|c| c != class);
    }

    /// 是否含有指定类
    pub fn has_class(&self, class: &str) -> bool {
        self.inner.borrow().classes.iter().any(|c| c == class)
    }

    /// 类列表快照
    pub fn classes(&self) -> Vec<String> {
        self.inner.borrow().classes.clone()
    }

    // ========== 内联样式 ==========

    /// 设置内联样式（同名属性覆盖）
    pub fn set_style(&self, property: &str, value: &str) {
        let mut data = self.inner.borrow_mut();
        if let Some(entry) = data.inline_styles.iter_mut().find(|(p, _)| p == property) {
            entry.1 = value.to_string();
        } else {
            data.inline_styles
                .push((property.to_string(), value.to_string()));
        }
    }

    /// 读取内联样式
    pub fn style(&self, property: &str) -> Option<String> {
        self.inner
            .borrow()
            .inline_styles
            .iter()
            .find(|(p, _)| p == property)
            .map(|(_, v)| v.clone())
    }

    /// 移除内联样式
    pub fn remove_style(&self, property: &str) {
        self.inner
            .borrow_mut()
            .inline_styles
            .retain(|(p, _)| p != property);
    }

    /// 内联样式快照
    pub fn inline_styles(&self) -> Vec<(String, String)> {
        self.inner.borrow().inline_styles.clone()
    }

    // ========== 渲染状态 ==========

    /// 元素自身是否被 display:none 隐藏
    ///
    /// 识别两条途径：隐藏类，或内联 `display: none`。
    /// 强制显示覆盖类优先于两者。
    pub fn is_display_hidden(&self) -> bool {
        if self.has_class(CLASS_FORCE_SHOW) {
            return false;
        }
        self.has_class(CLASS_HIDDEN) || self.style("display").as_deref() == Some("none")
    }

    /// 元素是否参与渲染（自身与所有祖先都未被 display:none 隐藏）
    ///
    /// visibility:hidden 的元素仍然参与渲染（占据布局），
    /// 因此不影响本判断。
    pub fn is_rendered(&self) -> bool {
        if self.is_display_hidden() {
            return false;
        }
        let mut ancestor = self.inner.borrow().parent.upgrade();
        while let Some(node) = ancestor {
            let handle = Element { inner: node };
            if handle.is_display_hidden() {
                return false;
            }
            ancestor = handle.inner.borrow().parent.upgrade();
        }
        true
    }

    /// 是否是"祖先未渲染"（自身可见但某个祖先被隐藏）
    pub fn has_unrendered_ancestor(&self) -> bool {
        !self.is_rendered() && !self.is_display_hidden()
    }

    // ========== 包围盒 / 滚动 ==========

    /// 设置包围盒（宿主/测试夹具调用）
    pub fn set_bounding_box(&self, rect: Rect) {
        self.inner.borrow_mut().bounding_box = rect;
    }

    /// 读取包围盒
    pub fn bounding_box(&self) -> Rect {
        self.inner.borrow().bounding_box
    }

    /// 滚动到指定偏移
    pub fn scroll_to(&self, left: f64, top: f64) {
        let mut data = self.inner.borrow_mut();
        data.scroll_left = left;
        data.scroll_top = top;
    }

    /// 当前滚动偏移 (left, top)
    pub fn scroll_offset(&self) -> (f64, f64) {
        let data = self.inner.borrow();
        (data.scroll_left, data.scroll_top)
    }

    /// 渲染开标签（用于错误上下文）
    ///
    /// 例如 `<div class="box choreo-display-none">`。
    pub fn opening_tag(&self) -> String {
        let data = self.inner.borrow();
        if data.classes.is_empty() {
            format!("<{}>", data.tag_name)
        } else {
            format!("<{} class=\"{}\">", data.tag_name, data.classes.join(" "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::CLASS_INVISIBLE;

    #[test]
    fn test_class_operations() {
        let elem = Element::new("div");
        assert!(!elem.has_class("a"));

        elem.add_class("a");
        elem.add_class("a"); // 重复添加无效
        elem.add_class("b");
        assert_eq!(elem.classes(), vec!["a", "b"]);

        elem.remove_class("a");
        assert_eq!(elem.classes(), vec!["b"]);
    }

    #[test]
    fn test_inline_styles() {
        let elem = Element::new("div");
        elem.set_style("opacity", "0.5");
        elem.set_style("opacity", "1");
        elem.set_style("transform", "translateX(10px)");

        assert_eq!(elem.style("opacity").as_deref(), Some("1"));
        assert_eq!(elem.inline_styles().len(), 2);

        elem.remove_style("opacity");
        assert!(elem.style("opacity").is_none());
    }

    #[test]
    fn test_rendered_state() {
        let parent = Element::new("section");
        let child = Element::new("div");
        parent.append_child(&child);

        assert!(child.is_rendered());

        // 祖先隐藏导致子元素不渲染
        parent.add_class(CLASS_HIDDEN);
        assert!(!child.is_rendered());
        assert!(child.has_unrendered_ancestor());

        parent.remove_class(CLASS_HIDDEN);

        // visibility:hidden 不影响渲染判断
        child.add_class(CLASS_INVISIBLE);
        assert!(child.is_rendered());
    }

    #[test]
    fn test_force_show_overrides_hidden() {
        let elem = Element::new("div");
        elem.add_class(CLASS_HIDDEN);
        assert!(!elem.is_rendered());

        elem.add_class(CLASS_FORCE_SHOW);
        assert!(elem.is_rendered());
    }

    #[test]
    fn test_inline_display_none_detected() {
        let elem = Element::new("div");
        elem.set_style("display", "none");
        assert!(elem.is_display_hidden());
    }

    #[test]
    fn test_opening_tag() {
        let elem = Element::new("div");
        elem.add_class("box");
        assert_eq!(elem.opening_tag(), "<div class=\"box\">");
    }

    #[test]
    fn test_scroll_and_bbox() {
        let elem = Element::new("div");
        elem.set_bounding_box(Rect::new(10.0, 20.0, 100.0, 50.0));
        assert_eq!(elem.bounding_box().point_at(0.5, 1.0), (60.0, 70.0));

        elem.scroll_to(0.0, 300.0);
        assert_eq!(elem.scroll_offset(), (0.0, 300.0));
    }
}
