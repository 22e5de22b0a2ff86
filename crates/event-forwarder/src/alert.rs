//! 管理员告警
//!
//! 记录处理失败时通知管理员。告警本身失败只记录日志，由调用方决定是否关心。

use crate::error::Result;
use crate::sender::request_error;
use async_trait::async_trait;
use forwarder_shared::config::AlertConfig;
use forwarder_shared::error::SharedError;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// 告警通道
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AdminNotifier: Send + Sync {
    async fn notify(&self, subject: &str, message: &str) -> Result<()>;
}

const WEBHOOK_SERVICE: &str = "admin-webhook";

#[derive(Debug, Serialize)]
struct AlertPayload<'a> {
    subject: &'a str,
    message: &'a str,
}

/// 以 JSON 形式 POST 到 webhook
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl AdminNotifier for WebhookNotifier {
    async fn notify(&self, subject: &str, message: &str) -> Result<()> {
        let response = self
            .client
            .post(&self.url)
            .json(&AlertPayload { subject, message })
            .send()
            .await
            .map_err(|e| request_error(WEBHOOK_SERVICE, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SharedError::ExternalService {
                service: WEBHOOK_SERVICE.to_string(),
                message: format!("status {}", status.as_u16()),
            }
            .into());
        }

        info!(subject = %subject, "管理员告警已发送");
        Ok(())
    }
}

/// 未配置告警渠道时只写错误日志
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl AdminNotifier for LogNotifier {
    async fn notify(&self, subject: &str, message: &str) -> Result<()> {
        error!(
            subject = %subject,
            message = %message,
            "未配置管理员告警渠道，告警仅记录日志"
        );
        Ok(())
    }
}

/// 按配置选择告警通道
pub fn from_config(config: &AlertConfig, timeout: Duration) -> Result<Arc<dyn AdminNotifier>> {
    match &config.webhook_url {
        Some(url) if !url.trim().is_empty() => Ok(Arc::new(WebhookNotifier::new(url, timeout)?)),
        _ => Ok(Arc::new(LogNotifier)),
    }
}
