//! 数据转换
//!
//! 指令格式为 `操作名:目标路径[:参数]`，按顺序作用于数据，每条指令的输出
//! 作为下一条的输入。操作名在进程级只读注册表中查找（不区分大小写），
//! 未注册的操作静默跳过。

use crate::error::{Result, RuleError};
use crate::evaluator::type_name;
use crate::path::{self, Path};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::debug;

/// 转换函数：接收目标位置的值和可选参数，返回新值
pub type TransformFn = fn(Value, Option<&str>) -> Value;

/// 内置转换操作注册表
static REGISTRY: LazyLock<HashMap<&'static str, TransformFn>> = LazyLock::new(|| {
    let mut ops: HashMap<&'static str, TransformFn> = HashMap::new();
    ops.insert("json", from_json);
    ops
});

/// 已拆分的转换指令
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction<'a> {
    /// 小写化的操作名
    pub op: String,
    pub path: Option<&'a str>,
    pub param: Option<&'a str>,
}

impl<'a> Instruction<'a> {
    /// 按冒号拆分，第三段之后的内容被忽略
    pub fn parse(text: &'a str) -> Self {
        let mut parts = text.split(':');
        let op = parts.next().unwrap_or_default().to_lowercase();
        let path = parts.next();
        let param = parts.next();

        Self { op, path, param }
    }
}

/// 转换管道
pub struct Transformer;

impl Transformer {
    /// 执行转换指令
    ///
    /// `instructions` 可以是单个指令字符串，也可以是指令字符串数组。
    pub fn transform(instructions: &Value, data: &Value) -> Result<Value> {
        let list: Vec<&Value> = match instructions {
            Value::Array(items) => items.iter().collect(),
            single => vec![single],
        };

        let mut current = data.clone();
        for instruction in list {
            let text = instruction.as_str().ok_or_else(|| {
                RuleError::InvalidInstruction(format!(
                    "转换指令必须是字符串, 实际 {}",
                    type_name(instruction)
                ))
            })?;
            current = Self::apply(text, &current)?;
        }

        Ok(current)
    }

    /// 执行单条指令
    pub fn apply(instruction: &str, data: &Value) -> Result<Value> {
        let parsed = Instruction::parse(instruction);

        let Some(op) = REGISTRY.get(parsed.op.as_str()) else {
            debug!(op = %parsed.op, "未注册的转换操作, 跳过");
            return Ok(data.clone());
        };

        let target = parsed.path.ok_or_else(|| {
            RuleError::InvalidInstruction(format!("指令 '{}' 缺少目标路径", instruction))
        })?;

        let target = Path::parse(target);
        if target.is_empty() {
            return Err(RuleError::InvalidInstruction(format!(
                "指令 '{}' 的目标路径为空",
                instruction
            )));
        }

        path::set_at(data, &target, |value| op(value, parsed.param))
    }

    /// 是否为已注册的操作名
    pub fn is_registered(op: &str) -> bool {
        REGISTRY.contains_key(op.to_lowercase().as_str())
    }
}

/// 把字符串解析为 JSON；解析失败时以包含错误信息和原文的诊断字符串替换，
/// 不中断管道。非字符串值原样返回。
fn from_json(value: Value, _param: Option<&str>) -> Value {
    match value {
        Value::String(text) => match serde_json::from_str(&text) {
            Ok(parsed) => parsed,
            Err(e) => Value::String(format!("JSON error ({}): {}", e, text)),
        },
        other => other,
    }
}
