//! 规则引擎错误类型

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("路径不存在: {path} (缺失段: {segment})")]
    PathNotFound { path: String, segment: String },

    #[error("无效的操作符: {0}")]
    UnknownOperator(String),

    #[error("规则配置无效: {0}")]
    InvalidConfig(String),

    #[error("无效的正则表达式: {0}")]
    InvalidRegex(String),

    #[error("类型不匹配: 期望 {expected}, 实际 {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("无效的转换指令: {0}")]
    InvalidInstruction(String),

    #[error("JSON 序列化错误: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl RuleError {
    /// 是否为路径缺失错误
    pub fn is_path_not_found(&self) -> bool {
        matches!(self, Self::PathNotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, RuleError>;
