// src/environment/probe.rs

use std::collections::HashSet;

use tracing::debug;

use crate::environment::context::{Access, BrowsingContexts, ContextId};

/// frame 链的最大遍历深度
const MAX_FRAME_DEPTH: usize = 32;

/// 读取当前及祖先浏览上下文的环境信息。
///
/// 所有公开方法都在访问点处理 `AccessDenied`，降级为约定的默认值或 `None`，不会把失败抛给调用方。
pub struct EnvironmentProbe<'a, C: BrowsingContexts + ?Sized> {
    contexts: &'a C,
}

/// 把访问失败记为 debug 日志并转成 None
fn observe<T>(operation: &str, access: Access<T>) -> Option<T> {
    match access {
        Ok(value) => Some(value),
        Err(denied) => {
            debug!(operation, context = denied.context, "browsing context access denied");
            None
        }
    }
}

impl<'a, C: BrowsingContexts + ?Sized> EnvironmentProbe<'a, C> {
    pub fn new(contexts: &'a C) -> Self {
        Self { contexts }
    }

    pub fn is_secure(&self) -> bool {
        observe("location", self.contexts.location(self.contexts.current()))
            .map(|location| location.protocol == "https:")
            .unwrap_or(false)
    }

    /// 顶层 document.referrer，跨域时退回当前上下文自己的 referrer
    pub fn top_referrer(&self) -> Option<String> {
        observe("top referrer", self.contexts.document_referrer(self.contexts.top()))
            .or_else(|| {
                observe(
                    "current referrer",
                    self.contexts.document_referrer(self.contexts.current()),
                )
            })
            .filter(|referrer| !referrer.is_empty())
    }

    /// 从当前上下文向上走，直到父上下文不可读或到达真正的顶层
    pub fn most_accessible_top_context(&self) -> ContextId {
        let top = self.contexts.top();
        let mut context = self.contexts.current();
        let mut visited = HashSet::from([context]);

        while context != top && visited.len() <= MAX_FRAME_DEPTH {
            let Some(parent) = observe("parent", self.contexts.parent(context)) else {
                break;
            };
            if !visited.insert(parent) {
                break;
            }
            let readable = observe("parent location", self.contexts.location(parent))
                .map(|location| !location.href.is_empty())
                .unwrap_or(false);
            if !readable {
                break;
            }
            context = parent;
        }
        context
    }

    pub fn is_main_page_accessible(&self) -> bool {
        self.most_accessible_top_context() == self.contexts.top()
    }

    /// 元素及其所有祖先 iframe 都与各自的视口相交时为 `Some(true)`。
    ///
    /// 链上任一处无法解析（元素缺失、跨域、深度超限）时为 `None`，与 `Some(false)` 区分。
    /// 某一层已判定不可见时直接返回 `Some(false)`，不再读取更上层的上下文。
    pub fn is_element_in_view(&self, element_id: &str) -> Option<bool> {
        let top = self.contexts.top();
        let mut context = self.contexts.current();
        let mut rect = observe(
            "element by id",
            self.contexts.element_by_id(context, element_id),
        )??;
        let mut visited = HashSet::new();

        loop {
            if !visited.insert(context) || visited.len() > MAX_FRAME_DEPTH {
                debug!(element_id, context, "frame chain loops or is too deep");
                return None;
            }
            let viewport_height = observe("inner height", self.contexts.inner_height(context))?;
            if !rect.overlaps_viewport(viewport_height) {
                return Some(false);
            }
            if context == top {
                return Some(true);
            }
            rect = observe("frame element", self.contexts.frame_element(context))??;
            context = observe("parent", self.contexts.parent(context))?;
        }
    }
}
