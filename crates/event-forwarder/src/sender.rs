//! HTTP 投递
//!
//! 通过 `HttpSender` trait 抽象投递行为，转发流程只关心返回的状态码，
//! 是否视为成功由调用方判断。

use crate::error::{ForwarderError, Result};
use async_trait::async_trait;
use forwarder_shared::error::SharedError;
use std::time::Duration;
use tracing::{debug, instrument};

/// 消息投递器
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HttpSender: Send + Sync {
    /// POST 消息到端点，返回 HTTP 状态码
    async fn send(&self, endpoint: &str, message: String) -> Result<u16>;
}

/// 超时单独归类为外部服务超时，其余保留 reqwest 错误
pub(crate) fn request_error(service: &str, err: reqwest::Error) -> ForwarderError {
    if err.is_timeout() {
        SharedError::ExternalServiceTimeout {
            service: service.to_string(),
        }
        .into()
    } else {
        err.into()
    }
}

/// 基于 reqwest 的投递器
#[derive(Debug, Clone)]
pub struct ReqwestSender {
    client: reqwest::Client,
}

impl ReqwestSender {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpSender for ReqwestSender {
    #[instrument(skip(self, message), fields(bytes = message.len()))]
    async fn send(&self, endpoint: &str, message: String) -> Result<u16> {
        let response = self
            .client
            .post(endpoint)
            .body(message)
            .send()
            .await
            .map_err(|e| request_error(endpoint, e))?;
        let status = response.status().as_u16();

        debug!(status, "端点已响应");
        Ok(status)
    }
}
