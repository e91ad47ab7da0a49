// src/protocol/lenient.rs

//! 宿主和供应商传来的 JSON 字段类型并不可靠，这里的解码函数在类型不符时
//! 退回默认值，而不是让整条记录解析失败。

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// 能解析成 `T` 就取值，否则视为未设置
pub fn optional<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).ok())
}

/// server-side auction type：数值等于 1 或 2（含 `1.0`）时返回对应编码
pub fn ssat_code(value: &Value) -> Option<u8> {
    match value.as_f64() {
        Some(n) if n == 1.0 => Some(1),
        Some(n) if n == 2.0 => Some(2),
        _ => None,
    }
}

pub fn ssat<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u8>, D::Error> {
    Ok(ssat_code(&Value::deserialize(deserializer)?))
}

/// 非数值或非有限值按 0 处理
pub fn number_or_zero<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_f64().filter(|n| n.is_finite()).unwrap_or(0.0))
}

/// 尺寸：非负整数值（含 `300.0`）才取用，其余按 0 处理
pub fn dimension_or_zero<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let value = Value::deserialize(deserializer)?;
    let dimension = match value.as_u64() {
        Some(n) => u32::try_from(n).ok(),
        None => value
            .as_f64()
            .filter(|n| *n >= 0.0 && n.fract() == 0.0 && *n <= f64::from(u32::MAX))
            .map(|n| n as u32),
    };
    Ok(dimension.unwrap_or(0))
}
