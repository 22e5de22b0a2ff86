//! 条件评估器
//!
//! 按 `参考值 <操作符> 提取值` 的方向比较两个 JSON 值。

use crate::error::{Result, RuleError};
use crate::operators::Operator;
use regex::Regex;
use serde_json::{Number, Value};
use std::cmp::Ordering;

/// 条件评估器
pub struct ConditionEvaluator;

impl ConditionEvaluator {
    /// 评估条件
    ///
    /// # Arguments
    /// * `operator` - 操作符
    /// * `reference` - 规则中定义的参考值（左操作数）
    /// * `extracted` - 从数据中提取的值（右操作数）
    /// * `pattern` - 预编译的正则，仅 REGEX 使用；为空时现场编译 `reference`
    pub fn evaluate(
        operator: Operator,
        reference: &Value,
        extracted: &Value,
        pattern: Option<&Regex>,
    ) -> Result<bool> {
        match operator {
            Operator::Eq => Ok(Self::eq(reference, extracted)),
            Operator::Ne => Ok(!Self::eq(reference, extracted)),
            Operator::Lt => Ok(Self::compare(reference, extracted)?.is_lt()),
            Operator::Le => Ok(Self::compare(reference, extracted)?.is_le()),
            Operator::Gt => Ok(Self::compare(reference, extracted)?.is_gt()),
            Operator::Ge => Ok(Self::compare(reference, extracted)?.is_ge()),
            Operator::Regex => match pattern {
                Some(regex) => Self::regex_search(regex, extracted),
                None => Self::regex_search(&Self::compile_pattern(reference)?, extracted),
            },
        }
    }

    /// 编译正则参考值
    pub fn compile_pattern(reference: &Value) -> Result<Regex> {
        let pattern = reference.as_str().ok_or_else(|| RuleError::TypeMismatch {
            expected: "string (regex pattern)".to_string(),
            actual: type_name(reference).to_string(),
        })?;

        Regex::new(pattern)
            .map_err(|e| RuleError::InvalidRegex(format!("'{}': {}", pattern, e)))
    }

    /// 相等比较，数值统一按数值语义比较（100 == 100.0）
    pub fn eq(a: &Value, b: &Value) -> bool {
        match (a, b) {
            (Value::Number(x), Value::Number(y)) => compare_numbers(x, y).is_eq(),
            (Value::Array(x), Value::Array(y)) => {
                x.len() == y.len() && x.iter().zip(y).all(|(l, r)| Self::eq(l, r))
            }
            (Value::Object(x), Value::Object(y)) => {
                x.len() == y.len()
                    && x
                        .iter()
                        .all(|(k, l)| y.get(k).is_some_and(|r| Self::eq(l, r)))
            }
            _ => a == b,
        }
    }

    /// 有序比较
    ///
    /// 只有同类值可比：数值、字符串（按字典序）、布尔、数组（逐元素字典序）。
    /// 其它组合返回 `TypeMismatch`。
    pub fn compare(a: &Value, b: &Value) -> Result<Ordering> {
        match (a, b) {
            (Value::Number(x), Value::Number(y)) => Ok(compare_numbers(x, y)),
            (Value::String(x), Value::String(y)) => Ok(x.cmp(y)),
            (Value::Bool(x), Value::Bool(y)) => Ok(x.cmp(y)),
            (Value::Array(x), Value::Array(y)) => {
                for (l, r) in x.iter().zip(y) {
                    let ordering = Self::compare(l, r)?;
                    if ordering.is_ne() {
                        return Ok(ordering);
                    }
                }
                Ok(x.len().cmp(&y.len()))
            }
            _ => Err(RuleError::TypeMismatch {
                expected: type_name(a).to_string(),
                actual: type_name(b).to_string(),
            }),
        }
    }

    /// 正则搜索（在任意位置出现即匹配，不要求整体匹配）
    fn regex_search(regex: &Regex, extracted: &Value) -> Result<bool> {
        let s = extracted.as_str().ok_or_else(|| RuleError::TypeMismatch {
            expected: "string".to_string(),
            actual: type_name(extracted).to_string(),
        })?;

        Ok(regex.is_match(s))
    }
}

fn compare_numbers(x: &Number, y: &Number) -> Ordering {
    if let (Some(a), Some(b)) = (x.as_i64(), y.as_i64()) {
        return a.cmp(&b);
    }
    if let (Some(a), Some(b)) = (x.as_u64(), y.as_u64()) {
        return a.cmp(&b);
    }

    let a = x.as_f64().unwrap_or(f64::NAN);
    let b = y.as_f64().unwrap_or(f64::NAN);
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

/// 获取值的类型名称
pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn eval(operator: Operator, reference: Value, extracted: Value) -> Result<bool> {
        ConditionEvaluator::evaluate(operator, &reference, &extracted, None)
    }

    #[test]
    fn test_eq_numbers() {
        assert!(eval(Operator::Eq, json!(5), json!(5)).unwrap());
        assert!(!eval(Operator::Eq, json!(5), json!(4)).unwrap());
        assert!(eval(Operator::Eq, json!(100), json!(100.0)).unwrap());
    }

    #[test]
    fn test_eq_strings_and_null() {
        assert!(eval(Operator::Eq, json!("hello"), json!("hello")).unwrap());
        assert!(!eval(Operator::Eq, json!("hello"), json!("world")).unwrap());
        assert!(eval(Operator::Eq, json!(null), json!(null)).unwrap());
        assert!(!eval(Operator::Eq, json!("5"), json!(5)).unwrap());
    }

    #[test]
    fn test_ne() {
        assert!(eval(Operator::Ne, json!("a"), json!("b")).unwrap());
        assert!(!eval(Operator::Ne, json!(1), json!(1.0)).unwrap());
        assert!(eval(Operator::Ne, json!("a"), json!(null)).unwrap());
    }

    #[test]
    fn test_ordering_direction() {
        // 参考值在左：LT 表示 reference < extracted
        assert!(eval(Operator::Lt, json!(100), json!(500)).unwrap());
        assert!(!eval(Operator::Lt, json!(500), json!(100)).unwrap());
        assert!(eval(Operator::Le, json!(100), json!(100)).unwrap());
        assert!(eval(Operator::Gt, json!(500), json!(100)).unwrap());
        assert!(eval(Operator::Ge, json!(100), json!(100.0)).unwrap());
    }

    #[test]
    fn test_ordering_strings_and_arrays() {
        assert!(eval(Operator::Lt, json!("abc"), json!("abd")).unwrap());
        assert!(eval(Operator::Lt, json!([1, 2]), json!([1, 3])).unwrap());
        assert!(eval(Operator::Lt, json!([1, 2]), json!([1, 2, 0])).unwrap());
    }

    #[test]
    fn test_ordering_incomparable_types() {
        let err = eval(Operator::Gt, json!(5), json!(null)).unwrap_err();
        assert!(matches!(err, RuleError::TypeMismatch { .. }));

        assert!(eval(Operator::Lt, json!("5"), json!(6)).is_err());
    }

    #[test]
    fn test_regex_is_search() {
        assert!(eval(Operator::Regex, json!("^a"), json!("abc")).unwrap());
        assert!(!eval(Operator::Regex, json!("^a"), json!("xyz")).unwrap());
        assert!(eval(Operator::Regex, json!("error"), json!("fatal error: disk")).unwrap());
    }

    #[test]
    fn test_regex_with_precompiled_pattern() {
        let regex = ConditionEvaluator::compile_pattern(&json!(r"\d{3}")).unwrap();
        assert!(ConditionEvaluator::evaluate(
            Operator::Regex,
            &json!(r"\d{3}"),
            &json!("code 404"),
            Some(&regex)
        )
        .unwrap());
    }

    #[test]
    fn test_regex_on_non_string() {
        assert!(eval(Operator::Regex, json!("^a"), json!(null)).is_err());
        assert!(eval(Operator::Regex, json!("^1"), json!(123)).is_err());
    }

    #[test]
    fn test_invalid_pattern() {
        let err = ConditionEvaluator::compile_pattern(&json!("[invalid")).unwrap_err();
        assert!(matches!(err, RuleError::InvalidRegex(_)));
    }
}
