//! 规则引擎领域模型

use crate::error::Result;
use crate::evaluator::ConditionEvaluator;
use crate::operators::{LogicalOperator, Operator};
use crate::path::{self, Path};
use regex::Regex;
use serde_json::{Map, Value};
use tracing::trace;

/// 路径缺失时替代的比较值
static NULL: Value = Value::Null;

/// 匹配结果：规则集合的元数据，外加 `body` 字段
pub type Outcome = Map<String, Value>;

/// 规则条目：路径、操作符、参考值
#[derive(Debug, Clone)]
pub struct RuleItem {
    pub path: Path,
    pub operator: Operator,
    pub value: Value,
    pattern: Option<Regex>,
}

impl RuleItem {
    /// 创建规则条目，REGEX 的参考值在此编译
    pub fn new(path: impl Into<Path>, operator: Operator, value: impl Into<Value>) -> Result<Self> {
        let value = value.into();
        let pattern = match operator {
            Operator::Regex => Some(ConditionEvaluator::compile_pattern(&value)?),
            _ => None,
        };

        Ok(Self {
            path: path.into(),
            operator,
            value,
            pattern,
        })
    }

    /// 用提取值评估，比较方向为 `参考值 <op> 提取值`
    pub fn evaluate(&self, extracted: &Value) -> Result<bool> {
        ConditionEvaluator::evaluate(self.operator, &self.value, extracted, self.pattern.as_ref())
    }
}

/// 规则集：一组条目按 AND/OR 聚合
#[derive(Debug, Clone)]
pub struct RuleSet {
    pub items: Vec<RuleItem>,
    pub logic: LogicalOperator,
}

impl RuleSet {
    pub fn new(items: Vec<RuleItem>, logic: LogicalOperator) -> Self {
        Self { items, logic }
    }

    pub fn and(items: Vec<RuleItem>) -> Self {
        Self::new(items, LogicalOperator::And)
    }

    pub fn or(items: Vec<RuleItem>) -> Self {
        Self::new(items, LogicalOperator::Or)
    }

    /// 检查数据是否满足规则集
    ///
    /// 只按**最后一个**条目的路径提取一次比较值，所有条目都与该值比较；
    /// 路径不存在时所有条目都与 null 比较。条目全部评估，不短路。
    pub fn check(&self, data: &Value) -> Result<bool> {
        let extracted = match self.items.last() {
            Some(item) => path::resolve(data, &item.path).unwrap_or(&NULL),
            None => &NULL,
        };

        let results = self
            .items
            .iter()
            .map(|item| item.evaluate(extracted))
            .collect::<Result<Vec<bool>>>()?;

        let matched = self.logic.aggregate(&results);
        trace!(logic = %self.logic, ?results, matched, "规则集评估完成");
        Ok(matched)
    }
}

/// 规则集合：一组规则集绑定匹配时返回的元数据
#[derive(Debug, Clone)]
pub struct RuleCollection {
    pub name: String,
    pub rulesets: Vec<RuleSet>,
    pub result_on_match: Map<String, Value>,
}

impl RuleCollection {
    pub fn new(
        name: impl Into<String>,
        rulesets: Vec<RuleSet>,
        result_on_match: Map<String, Value>,
    ) -> Self {
        Self {
            name: name.into(),
            rulesets,
            result_on_match,
        }
    }

    /// 评估全部规则集（不短路），至少一个为真且没有为假时返回元数据
    pub fn check(&self, data: &Value) -> Result<Option<&Map<String, Value>>> {
        let results = self
            .rulesets
            .iter()
            .map(|ruleset| ruleset.check(data))
            .collect::<Result<Vec<bool>>>()?;

        if LogicalOperator::And.aggregate(&results) {
            Ok(Some(&self.result_on_match))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RuleError;
    use serde_json::json;

    fn item(path: &str, operator: Operator, value: Value) -> RuleItem {
        RuleItem::new(path, operator, value).unwrap()
    }

    #[test]
    fn test_rule_item_evaluate() {
        let eq = item("x", Operator::Eq, json!(5));
        assert!(eq.evaluate(&json!(5)).unwrap());
        assert!(!eq.evaluate(&json!(4)).unwrap());

        let re = item("x", Operator::Regex, json!("^a"));
        assert!(re.evaluate(&json!("abc")).unwrap());
        assert!(!re.evaluate(&json!("xyz")).unwrap());
    }

    #[test]
    fn test_rule_item_rejects_bad_pattern() {
        let err = RuleItem::new("x", Operator::Regex, json!("(")).unwrap_err();
        assert!(matches!(err, RuleError::InvalidRegex(_)));

        assert!(RuleItem::new("x", Operator::Regex, json!(1)).is_err());
    }

    #[test]
    fn test_and_ruleset() {
        let data = json!({"level": "gold"});

        let all_true = RuleSet::and(vec![
            item("level", Operator::Eq, json!("gold")),
            item("level", Operator::Ne, json!("silver")),
        ]);
        assert!(all_true.check(&data).unwrap());

        let mixed = RuleSet::and(vec![
            item("level", Operator::Eq, json!("gold")),
            item("level", Operator::Eq, json!("silver")),
        ]);
        assert!(!mixed.check(&data).unwrap());

        assert!(!RuleSet::and(vec![]).check(&data).unwrap());
    }

    #[test]
    fn test_or_ruleset() {
        let data = json!({"level": "gold"});

        let all_false = RuleSet::or(vec![
            item("level", Operator::Eq, json!("bronze")),
            item("level", Operator::Eq, json!("silver")),
        ]);
        assert!(!all_false.check(&data).unwrap());

        let mixed = RuleSet::or(vec![
            item("level", Operator::Eq, json!("gold")),
            item("level", Operator::Eq, json!("silver")),
        ]);
        assert!(mixed.check(&data).unwrap());

        assert!(RuleSet::or(vec![]).check(&data).unwrap());
    }

    #[test]
    fn test_ruleset_uses_last_item_path_for_every_item() {
        // 第一个条目的路径 a 被忽略，两个条目都与 b 的值比较
        let data = json!({"a": "x", "b": "y"});
        let ruleset = RuleSet::and(vec![
            item("a", Operator::Eq, json!("y")),
            item("b", Operator::Eq, json!("y")),
        ]);
        assert!(ruleset.check(&data).unwrap());

        let ruleset = RuleSet::and(vec![
            item("a", Operator::Eq, json!("x")),
            item("b", Operator::Eq, json!("y")),
        ]);
        assert!(!ruleset.check(&data).unwrap());
    }

    #[test]
    fn test_ruleset_missing_path_compares_against_null() {
        let data = json!({"a": 1});

        let ruleset = RuleSet::and(vec![
            item("a", Operator::Eq, json!(null)),
            item("missing.path", Operator::Eq, json!(null)),
        ]);
        assert!(ruleset.check(&data).unwrap());

        let ruleset = RuleSet::or(vec![item("missing", Operator::Ne, json!(null))]);
        assert!(!ruleset.check(&data).unwrap());
    }

    #[test]
    fn test_ruleset_propagates_type_errors() {
        let data = json!({"amount": "abc"});
        let ruleset = RuleSet::and(vec![item("amount", Operator::Gt, json!(100))]);
        assert!(matches!(
            ruleset.check(&data).unwrap_err(),
            RuleError::TypeMismatch { .. }
        ));
    }

    #[test]
    fn test_collection_requires_true_and_no_false() {
        let data = json!({"type": "ALERT", "severity": 5});
        let meta = json!({"profile": "ops"}).as_object().cloned().unwrap();

        let matching = RuleCollection::new(
            "autogen1",
            vec![
                RuleSet::and(vec![item("type", Operator::Eq, json!("ALERT"))]),
                RuleSet::or(vec![item("severity", Operator::Le, json!(5))]),
            ],
            meta.clone(),
        );
        assert_eq!(matching.check(&data).unwrap(), Some(&meta));

        let one_false = RuleCollection::new(
            "autogen2",
            vec![
                RuleSet::and(vec![item("type", Operator::Eq, json!("ALERT"))]),
                RuleSet::and(vec![item("type", Operator::Eq, json!("INFO"))]),
            ],
            meta.clone(),
        );
        assert_eq!(one_false.check(&data).unwrap(), None);

        let empty = RuleCollection::new("autogen3", vec![], meta);
        assert_eq!(empty.check(&data).unwrap(), None);
    }
}
