//! 工具参数 JSON Schema 生成（schemars 自动生成）
//!
//! 工具的参数结构体 derive JsonSchema，生成的 schema 直接作为 function 声明的 parameters。

use schemars::{schema_for, JsonSchema};
use serde_json::Value;

/// 返回类型 T 的参数 schema；去掉 $schema / title 这类对 LLM 无意义的键
pub fn parameters_schema<T: JsonSchema>() -> Value {
    let schema = schema_for!(T);
    let mut value = serde_json::to_value(&schema).unwrap_or_else(|_| {
        serde_json::json!({"type": "object", "properties": {}})
    });
    if let Some(obj) = value.as_object_mut() {
        obj.remove("$schema");
        obj.remove("title");
    }
    value
}
