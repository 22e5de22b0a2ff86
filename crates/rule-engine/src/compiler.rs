//! 规则编译器
//!
//! 将规则配置（JSON）编译成内存中的规则集合，配置错误在编译阶段暴露。
//!
//! 单条规则配置形如：
//!
//! ```json
//! {
//!     "rulesets": {
//!         "and": [["event.type", "EQ", "ALERT"]],
//!         "or": [["event.severity", "LE", 3]]
//!     },
//!     "profile": "ops",
//!     "transform": "json:event.payload"
//! }
//! ```
//!
//! `rulesets` 以外的字段原样作为匹配结果返回。

use crate::error::{Result, RuleError};
use crate::models::{RuleCollection, RuleItem, RuleSet};
use crate::operators::{LogicalOperator, Operator};
use crate::path::Path;
use serde_json::{Map, Value};
use tracing::debug;

/// 规则配置中规则集所在的键
pub const RULESETS_KEY: &str = "rulesets";

/// 规则编译器
///
/// 按编译顺序为规则集合生成 `autogen1`、`autogen2`…… 的名称。
pub struct RuleCompiler {
    sequence: usize,
}

impl RuleCompiler {
    pub fn new() -> Self {
        Self { sequence: 0 }
    }

    /// 从 JSON 数组字符串编译全部规则
    pub fn compile_from_json(&mut self, json: &str) -> Result<Vec<RuleCollection>> {
        let rules: Vec<Value> = serde_json::from_str(json)?;
        self.compile_all(&rules)
    }

    /// 按文档顺序编译全部规则，任意一条失败即整体失败
    pub fn compile_all(&mut self, rules: &[Value]) -> Result<Vec<RuleCollection>> {
        rules.iter().map(|rule| self.compile(rule)).collect()
    }

    /// 编译单条规则
    pub fn compile(&mut self, rule: &Value) -> Result<RuleCollection> {
        self.sequence += 1;
        let name = format!("autogen{}", self.sequence);

        let entry = rule.as_object().ok_or_else(|| {
            RuleError::InvalidConfig(format!("规则 '{}' 必须是对象", name))
        })?;

        let rulesets = entry
            .get(RULESETS_KEY)
            .and_then(Value::as_object)
            .ok_or_else(|| {
                RuleError::InvalidConfig(format!("规则 '{}' 缺少 rulesets 对象", name))
            })?;

        let mut ruleset_list = Vec::with_capacity(rulesets.len());
        for (key, items) in rulesets {
            let Some(logic) = LogicalOperator::from_key(key) else {
                debug!(rule = %name, key = %key, "忽略未知的规则集键");
                continue;
            };

            let items = items.as_array().ok_or_else(|| {
                RuleError::InvalidConfig(format!("规则 '{}' 的 {} 规则集必须是数组", name, key))
            })?;

            let rule_items = items
                .iter()
                .enumerate()
                .map(|(i, item)| Self::compile_item(item, &format!("{}.{}[{}]", name, key, i)))
                .collect::<Result<Vec<_>>>()?;

            ruleset_list.push(RuleSet::new(rule_items, logic));
        }

        let result_on_match: Map<String, Value> = entry
            .iter()
            .filter(|(key, _)| key.as_str() != RULESETS_KEY)
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        debug!(rule = %name, rulesets = ruleset_list.len(), "规则已编译");
        Ok(RuleCollection::new(name, ruleset_list, result_on_match))
    }

    /// 编译 `[path, operator, value]` 三元组
    fn compile_item(item: &Value, location: &str) -> Result<RuleItem> {
        let parts = item
            .as_array()
            .filter(|parts| parts.len() == 3)
            .ok_or_else(|| {
                RuleError::InvalidConfig(format!(
                    "条件 '{}' 必须是 [path, operator, value] 三元组",
                    location
                ))
            })?;

        let path = Path::from_value(&parts[0]).ok_or_else(|| {
            RuleError::InvalidConfig(format!("条件 '{}' 的路径无效: {}", location, parts[0]))
        })?;

        let operator: Operator = parts[1]
            .as_str()
            .ok_or_else(|| RuleError::UnknownOperator(parts[1].to_string()))?
            .parse()?;

        RuleItem::new(path, operator, parts[2].clone())
    }
}

impl Default for RuleCompiler {
    fn default() -> Self {
        Self::new()
    }
}
