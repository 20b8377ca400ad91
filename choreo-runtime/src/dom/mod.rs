//! # Dom 模块
//!
//! 宿主文档的内存模型。
//!
//! ## 设计说明
//!
//! 调度核心不渲染任何帧：它只在相位边界读写元素状态
//! （CSS 类、内联样式、滚动偏移），真正的插值渲染由宿主完成。
//! 本模块提供调度所需的最小元素抽象：
//!
//! - [`Element`]：`Rc<RefCell<_>>` 共享句柄，承载类列表 / 内联样式 /
//!   包围盒 / 滚动位置 / 父链
//! - [`Connector`]：连接线元素契约（端点、持续追踪开关）
//!
//! 元素句柄可以被多个片段共享；片段在播放期间对元素是逻辑单写者，
//! 除非作者显式选择可叠加的合成模式。

mod connector;
mod element;

pub use connector::{parse_placement, Connector, ConnectorPoint, ConnectorStash};
pub use element::{Element, Rect};

/// display:none 隐藏类
pub const CLASS_HIDDEN: &str = "choreo-display-none";
/// visibility:hidden 隐藏类
pub const CLASS_INVISIBLE: &str = "choreo-visibility-hidden";
/// 强制提交样式时的临时显示覆盖类
pub const CLASS_FORCE_SHOW: &str = "choreo-force-show";
/// 高亮辅助类（~highlight / ~un-highlight 期间挂载）
pub const CLASS_HIGHLIGHTABLE: &str = "choreo-highlightable";
