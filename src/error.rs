// src/error.rs

use thiserror::Error;

/// 服务边界上的错误；核心组件（校验、探测、构建、解析）不向外抛错
#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("config: {0}")]
    Config(String),

    #[error("decode: {0}")]
    Decode(String),

    #[error("logging: {0}")]
    Logging(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("serde: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AdapterError>;
