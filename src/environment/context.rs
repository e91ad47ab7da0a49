// src/environment/context.rs

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 浏览上下文（window / frame）的句柄
pub type ContextId = usize;

/// 跨域访问被拒绝
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("access denied to browsing context {context}")]
pub struct AccessDenied {
    pub context: ContextId,
}

pub type Access<T> = Result<T, AccessDenied>;

/// `getBoundingClientRect` 的纵向部分，坐标相对于所属上下文的视口
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub top: f64,
    pub bottom: f64,
}

impl Rect {
    /// 与 `[0, viewport_height]` 的纵向视口有交集（含边界）
    pub fn overlaps_viewport(&self, viewport_height: f64) -> bool {
        self.bottom >= 0.0 && self.top <= viewport_height
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Location {
    pub protocol: String,
    pub href: String,
}

/// 运行时暴露的浏览上下文能力面。
///
/// 除 `current` / `top` 外，每个操作都可能因为同源限制失败，
/// 调用方必须在访问点就地处理 `AccessDenied`。
pub trait BrowsingContexts {
    fn current(&self) -> ContextId;

    fn top(&self) -> ContextId;

    /// 顶层上下文的 parent 是它自己
    fn parent(&self, context: ContextId) -> Access<ContextId>;

    /// 嵌入该上下文的 frame 元素在父上下文中的矩形；顶层返回 `Ok(None)`
    fn frame_element(&self, context: ContextId) -> Access<Option<Rect>>;

    fn location(&self, context: ContextId) -> Access<Location>;

    fn document_referrer(&self, context: ContextId) -> Access<String>;

    /// `document.getElementById(id).getBoundingClientRect()`，元素不存在时 `Ok(None)`
    fn element_by_id(&self, context: ContextId, id: &str) -> Access<Option<Rect>>;

    fn inner_height(&self, context: ContextId) -> Access<f64>;
}
