//! 规则操作符定义

use crate::error::RuleError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 条件操作符
///
/// 配置中按名称精确匹配（区分大小写），未知名称在构建规则时即报错。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Regex,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "EQ",
            Self::Ne => "NE",
            Self::Lt => "LT",
            Self::Le => "LE",
            Self::Gt => "GT",
            Self::Ge => "GE",
            Self::Regex => "REGEX",
        }
    }
}

impl FromStr for Operator {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "EQ" => Ok(Self::Eq),
            "NE" => Ok(Self::Ne),
            "LT" => Ok(Self::Lt),
            "LE" => Ok(Self::Le),
            "GT" => Ok(Self::Gt),
            "GE" => Ok(Self::Ge),
            "REGEX" => Ok(Self::Regex),
            other => Err(RuleError::UnknownOperator(other.to_string())),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 逻辑操作符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogicalOperator {
    And,
    Or,
}

impl LogicalOperator {
    /// 识别规则集配置键（不区分大小写），其它键返回 None
    pub fn from_key(key: &str) -> Option<Self> {
        if key.eq_ignore_ascii_case("and") {
            Some(Self::And)
        } else if key.eq_ignore_ascii_case("or") {
            Some(Self::Or)
        } else {
            None
        }
    }

    /// 聚合一组评估结果
    ///
    /// - AND: 至少一个 true 且没有 false（空列表为 false）
    /// - OR: 没有 false，或至少一个 true（空列表为 true）
    ///
    /// 这不是教科书式的布尔逻辑，现有规则配置依赖这一行为，不要"修正"。
    pub fn aggregate(&self, results: &[bool]) -> bool {
        let any_true = results.contains(&true);
        let any_false = results.contains(&false);

        match self {
            Self::And => any_true && !any_false,
            Self::Or => !any_false || any_true,
        }
    }
}

impl fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And => write!(f, "AND"),
            Self::Or => write!(f, "OR"),
        }
    }
}
