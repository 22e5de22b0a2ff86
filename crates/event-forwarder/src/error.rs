//! 转发服务错误类型
//!
//! 区分启动期错误（配置文档缺失或无效）和单条记录的处理错误。
//! 启动期错误终止进程，记录错误只触发告警。

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ForwarderError {
    #[error("转发配置不存在: {0}")]
    ConfigNotFound(String),

    #[error("转发配置无效: {0}")]
    InvalidDocument(String),

    #[error("记录内容不是有效的 JSON: {0}")]
    InvalidRecord(String),

    #[error("Profile 未定义: {0}")]
    ProfileNotFound(String),

    #[error("Profile 未配置 endpoint: {0}")]
    MissingEndpoint(String),

    #[error("无效的模板: {0}")]
    InvalidTemplate(String),

    #[error("模板渲染失败: {0}")]
    Render(#[from] minijinja::Error),

    #[error("消息发送失败: status={status}, profile={profile}, message={message}")]
    SendFailed {
        status: u16,
        profile: String,
        message: String,
    },

    #[error("HTTP 请求失败: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON 序列化错误: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Rule(#[from] rule_engine::RuleError),

    #[error(transparent)]
    Shared(#[from] forwarder_shared::error::SharedError),
}

pub type Result<T> = std::result::Result<T, ForwarderError>;

impl ForwarderError {
    /// 启动期错误，出现时进程不应继续处理事件
    pub fn is_startup(&self) -> bool {
        matches!(self, Self::ConfigNotFound(_) | Self::InvalidDocument(_))
    }

    /// 重新投递同一条记录可能成功的错误
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::SendFailed { status, .. } => *status >= 500 || *status == 429,
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::Shared(e) => e.is_retryable(),
            _ => false,
        }
    }
}
