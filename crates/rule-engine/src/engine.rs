//! 规则引擎
//!
//! 启动时一次性从配置构建规则集合，之后只读。按配置顺序评估，第一个匹配的
//! 规则集合胜出。

use crate::compiler::RuleCompiler;
use crate::error::Result;
use crate::models::{Outcome, RuleCollection};
use crate::transform::Transformer;
use serde_json::Value;
use tracing::{debug, info};

/// 匹配结果中存放记录的键
pub const BODY_KEY: &str = "body";

/// 匹配结果中转换指令的键
pub const TRANSFORM_KEY: &str = "transform";

/// 规则引擎
#[derive(Debug, Clone)]
pub struct RuleEngine {
    collections: Vec<RuleCollection>,
}

impl RuleEngine {
    /// 从规则配置列表构建引擎，任一规则无效则构建失败
    pub fn new(rules: &[Value]) -> Result<Self> {
        let mut compiler = RuleCompiler::new();
        let collections = compiler.compile_all(rules)?;

        info!(collections = collections.len(), "规则引擎已构建");
        Ok(Self { collections })
    }

    /// 从 JSON 数组字符串构建引擎
    pub fn from_json(json: &str) -> Result<Self> {
        let rules: Vec<Value> = serde_json::from_str(json)?;
        Self::new(&rules)
    }

    pub fn collections(&self) -> &[RuleCollection] {
        &self.collections
    }

    pub fn len(&self) -> usize {
        self.collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    /// 评估输入数据
    ///
    /// 返回第一个匹配集合的元数据，并在 `body` 键下附上原始输入；
    /// 元数据含 `transform` 时，`body` 为转换后的数据。
    /// 没有集合匹配时返回 `None`，调用方应原样转发输入。
    pub fn evaluate(&self, input: &Value) -> Result<Option<Outcome>> {
        for collection in &self.collections {
            let Some(result) = collection.check(input)? else {
                continue;
            };

            debug!(collection = %collection.name, "规则集合匹配");

            let body = match result.get(TRANSFORM_KEY) {
                Some(instructions) => Transformer::transform(instructions, input)?,
                None => input.clone(),
            };

            let mut outcome = result.clone();
            outcome.insert(BODY_KEY.to_string(), body);
            return Ok(Some(outcome));
        }

        debug!("没有匹配的规则集合");
        Ok(None)
    }
}
