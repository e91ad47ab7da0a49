// src/config/ambient.rs

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 页面上的只读环境信号，由宿主在调用时注入
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AmbientSignals {
    /// 本地存储中持久化的 yl2 测试标记，"1" 表示开启
    #[serde(default)]
    pub persisted_yl2: Option<String>,
    /// 全局 A/B 测试键值对象
    #[serde(default)]
    pub ab_test: Option<Map<String, Value>>,
}

impl AmbientSignals {
    pub fn yl2_flag(&self) -> bool {
        self.persisted_yl2.as_deref() == Some("1")
    }
}
