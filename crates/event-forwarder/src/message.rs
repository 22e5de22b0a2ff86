//! 消息构建
//!
//! 渲染后的文本直接作为消息体，或按 profile 的参数对象包装成 JSON。

use crate::document::Profile;
use crate::error::Result;
use crate::template::Template;
use rule_engine::{BODY_KEY, Outcome};
use serde_json::Value;

/// 参数对象中被渲染文本替换的占位值
pub const TEXT_PLACEHOLDER: &str = "@@@@";

/// 从匹配结果中取出用于渲染的记录
///
/// 字符串形式的记录如果是合法 JSON 则先解析。
pub fn record_data(outcome: &Outcome) -> Value {
    match outcome.get(BODY_KEY) {
        Some(Value::String(text)) => {
            serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.clone()))
        }
        Some(body) => body.clone(),
        None => Value::Null,
    }
}

/// 渲染模板并按 profile 参数生成最终消息
pub fn build_message(template: &Template, profile: &Profile, data: &Value) -> Result<String> {
    let text = template.render(data)?;

    match &profile.parameters {
        Some(Value::Object(parameters)) => {
            let mut message = parameters.clone();
            // 只替换第一个占位字段
            if let Some(slot) = message
                .values_mut()
                .find(|v| v.as_str() == Some(TEXT_PLACEHOLDER))
            {
                *slot = Value::String(text);
            }
            Ok(serde_json::to_string(&message)?)
        }
        _ => Ok(text),
    }
}
