// src/environment/frame_tree.rs

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::environment::context::{Access, AccessDenied, BrowsingContexts, ContextId, Location, Rect};

/// 浏览上下文链的快照，由宿主页面采集后随请求一起提交。
///
/// `frames[0]` 为顶层上下文，`current` 指向适配器所在的上下文。
/// 与当前上下文 origin 不同的 frame 视为跨域：读取其属性会得到 `AccessDenied`。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FrameTree {
    pub current: ContextId,
    pub frames: Vec<FrameSnapshot>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FrameSnapshot {
    /// 父 frame 的下标，顶层为 None
    #[serde(default)]
    pub parent: Option<ContextId>,
    pub origin: String,
    #[serde(default)]
    pub protocol: String,
    #[serde(default)]
    pub href: String,
    #[serde(default)]
    pub referrer: String,
    #[serde(default)]
    pub viewport_height: f64,
    /// 嵌入本 frame 的 iframe 元素在父视口中的位置
    #[serde(default)]
    pub frame_rect: Option<Rect>,
    #[serde(default)]
    pub elements: HashMap<String, Rect>,
}

/// 没有提交环境信息时使用：单个不可识别协议的顶层上下文
impl Default for FrameTree {
    fn default() -> Self {
        Self {
            current: 0,
            frames: vec![FrameSnapshot::default()],
        }
    }
}

impl FrameTree {
    fn frame(&self, context: ContextId) -> Access<&FrameSnapshot> {
        self.frames.get(context).ok_or(AccessDenied { context })
    }

    /// 同源才可读
    fn readable(&self, context: ContextId) -> Access<&FrameSnapshot> {
        let frame = self.frame(context)?;
        let current = self.frame(self.current)?;
        if frame.origin == current.origin {
            Ok(frame)
        } else {
            Err(AccessDenied { context })
        }
    }
}

impl BrowsingContexts for FrameTree {
    fn current(&self) -> ContextId {
        self.current
    }

    fn top(&self) -> ContextId {
        0
    }

    fn parent(&self, context: ContextId) -> Access<ContextId> {
        let frame = self.frame(context)?;
        match frame.parent {
            Some(parent) if parent < self.frames.len() => Ok(parent),
            Some(_) => Err(AccessDenied { context }),
            None => Ok(context),
        }
    }

    fn frame_element(&self, context: ContextId) -> Access<Option<Rect>> {
        let frame = self.frame(context)?;
        match frame.parent {
            None => Ok(None),
            Some(parent) => {
                self.readable(parent)?;
                Ok(frame.frame_rect)
            }
        }
    }

    fn location(&self, context: ContextId) -> Access<Location> {
        let frame = self.readable(context)?;
        Ok(Location {
            protocol: frame.protocol.clone(),
            href: frame.href.clone(),
        })
    }

    fn document_referrer(&self, context: ContextId) -> Access<String> {
        Ok(self.readable(context)?.referrer.clone())
    }

    fn element_by_id(&self, context: ContextId, id: &str) -> Access<Option<Rect>> {
        Ok(self.readable(context)?.elements.get(id).copied())
    }

    fn inner_height(&self, context: ContextId) -> Access<f64> {
        Ok(self.readable(context)?.viewport_height)
    }
}

#[cfg(test)]
impl FrameSnapshot {
    pub fn page(origin: &str, href: &str) -> Self {
        let protocol = href.split("//").next().unwrap_or_default().to_string();
        Self {
            origin: origin.to_string(),
            protocol,
            href: href.to_string(),
            viewport_height: 800.0,
            ..Default::default()
        }
    }

    pub fn embedded_in(mut self, parent: ContextId, rect: Rect) -> Self {
        self.parent = Some(parent);
        self.frame_rect = Some(rect);
        self
    }

    pub fn with_referrer(mut self, referrer: &str) -> Self {
        self.referrer = referrer.to_string();
        self
    }

    pub fn with_element(mut self, id: &str, rect: Rect) -> Self {
        self.elements.insert(id.to_string(), rect);
        self
    }
}
