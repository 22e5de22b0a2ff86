//! 批次转发
//!
//! 启动时从参数存储加载转发配置并构建规则引擎，之后按顺序处理批次中的每条记录：
//! 规则匹配 -> 选择 profile -> 渲染模板 -> 投递。
//! 单条记录的任何错误都被捕获、记录并告警，批次继续处理。

use crate::alert::AdminNotifier;
use crate::document::{DEFAULT_PROFILE, ForwarderDocument, Profile};
use crate::error::{ForwarderError, Result};
use crate::message;
use crate::sender::HttpSender;
use crate::template::TemplateCache;
use forwarder_shared::config::AppConfig;
use forwarder_shared::observability::metrics;
use forwarder_shared::parameter_store::ParameterStore;
use rule_engine::{BODY_KEY, Outcome, RuleEngine};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, instrument};

/// 匹配结果中指定 profile 的键
pub const PROFILE_KEY: &str = "profile";

/// 待转发的事件批次
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "Records", default)]
    pub records: Vec<Record>,
}

/// 批次中的单条记录
///
/// `body` 应为 JSON 文本。这里按任意 JSON 值接收，类型不对的记录
/// 在处理时单独失败，不影响整批事件的解析。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    #[serde(default)]
    pub body: Value,

    #[serde(rename = "messageId", default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
}

impl Record {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: Value::String(body.into()),
            message_id: None,
        }
    }

    /// 解析记录内容
    pub fn parse_body(&self) -> Result<Value> {
        let Value::String(text) = &self.body else {
            return Err(ForwarderError::InvalidRecord(format!(
                "body 必须是 JSON 文本, 实际 {}",
                json_type(&self.body)
            )));
        };

        serde_json::from_str(text).map_err(|e| ForwarderError::InvalidRecord(e.to_string()))
    }

    /// 告警中展示的记录原文
    fn body_text(&self) -> String {
        match &self.body {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        }
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl Event {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// 批次处理结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub sent: usize,
    pub failed: usize,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.sent + self.failed
    }
}

/// 已选定的投递目标
#[derive(Debug)]
pub struct Route<'a> {
    pub name: String,
    pub profile: &'a Profile,
    pub endpoint: &'a str,
}

/// 事件转发器
pub struct Forwarder {
    document: ForwarderDocument,
    engine: Option<RuleEngine>,
    templates: TemplateCache,
    sender: Arc<dyn HttpSender>,
    notifier: Arc<dyn AdminNotifier>,
    alert_subject: String,
}

impl Forwarder {
    /// 从参数存储加载转发配置并构建转发器
    ///
    /// 配置缺失、无法解析或规则无效时构建失败。
    pub async fn new(
        config: &AppConfig,
        store: Arc<dyn ParameterStore>,
        sender: Arc<dyn HttpSender>,
        notifier: Arc<dyn AdminNotifier>,
    ) -> Result<Self> {
        let key = &config.forwarder.config_key;

        let raw = match store.get_parameter(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                error!(key = %key, "转发配置不存在");
                return Err(ForwarderError::ConfigNotFound(key.clone()));
            }
            Err(e) => {
                error!(key = %key, error = %e, "读取转发配置失败");
                return Err(e.into());
            }
        };

        let document = ForwarderDocument::from_json(&raw).map_err(|e| {
            error!(key = %key, error = %e, "转发配置不是有效的 JSON");
            ForwarderError::InvalidDocument(e.to_string())
        })?;
        info!(key = %key, document = %raw.trim(), "转发配置已加载");

        let templates = TemplateCache::new(store, config.forwarder.clone());

        Self::from_document(document, templates, sender, notifier)
            .map(|forwarder| forwarder.with_alert_subject(&config.alert.subject))
    }

    /// 从已解析的配置文档构建
    pub fn from_document(
        document: ForwarderDocument,
        templates: TemplateCache,
        sender: Arc<dyn HttpSender>,
        notifier: Arc<dyn AdminNotifier>,
    ) -> Result<Self> {
        let engine = document.rules.as_deref().map(RuleEngine::new).transpose()?;

        Ok(Self {
            document,
            engine,
            templates,
            sender,
            notifier,
            alert_subject: forwarder_shared::config::AlertConfig::default().subject,
        })
    }

    pub fn with_alert_subject(mut self, subject: impl Into<String>) -> Self {
        self.alert_subject = subject.into();
        self
    }

    pub fn has_rules(&self) -> bool {
        self.engine.is_some()
    }

    /// 处理一个批次，单条记录失败不中断批次
    #[instrument(skip(self, event), fields(records = event.records.len()))]
    pub async fn handle(&self, event: &Event) -> BatchReport {
        let mut report = BatchReport::default();

        for (index, record) in event.records.iter().enumerate() {
            match self.process_record(record).await {
                Ok(()) => {
                    report.sent += 1;
                    metrics::record_outcome("sent");
                }
                Err(e) => {
                    report.failed += 1;
                    metrics::record_outcome("failed");
                    self.report_failure(index, record, &e).await;
                }
            }
        }

        info!(sent = report.sent, failed = report.failed, "批次处理完成");
        report
    }

    /// 处理单条记录
    #[instrument(skip(self, record), fields(message_id = record.message_id.as_deref()))]
    pub async fn process_record(&self, record: &Record) -> Result<()> {
        let body = record.parse_body()?;

        let outcome = self.check_rules(&body)?;
        let route = self.route(&outcome)?;
        info!(profile = %route.name, "已选定 profile");

        let template = self.templates.get(route.profile.template_name()).await?;
        let data = message::record_data(&outcome);
        let msg = message::build_message(&template, route.profile, &data)?;
        debug!(msg = %msg, "消息已生成");

        let start = Instant::now();
        let status = self.sender.send(route.endpoint, msg.clone()).await?;
        metrics::record_send(&route.name, status, start.elapsed().as_secs_f64());

        if status != 200 {
            return Err(ForwarderError::SendFailed {
                status,
                profile: route.name,
                message: msg,
            });
        }

        info!(profile = %route.name, status, "消息已投递");
        Ok(())
    }

    /// 评估规则，没有规则或没有匹配时原样转发
    pub fn check_rules(&self, record: &Value) -> Result<Outcome> {
        if let Some(engine) = &self.engine {
            let outcome = engine.evaluate(record)?;
            metrics::record_rule_evaluation(outcome.is_some());

            if let Some(outcome) = outcome {
                return Ok(outcome);
            }
        }

        let mut outcome = Outcome::new();
        outcome.insert(BODY_KEY.to_string(), record.clone());
        Ok(outcome)
    }

    /// 按匹配结果选择 profile
    pub fn route(&self, outcome: &Outcome) -> Result<Route<'_>> {
        let name = match outcome.get(PROFILE_KEY) {
            None => DEFAULT_PROFILE.to_string(),
            Some(Value::String(name)) => name.clone(),
            Some(other) => other.to_string(),
        };

        let profile = self.document.profile(&name).ok_or_else(|| {
            error!(profile = %name, "Profile 未定义");
            ForwarderError::ProfileNotFound(name.clone())
        })?;

        let Some(endpoint) = profile.endpoint.as_deref() else {
            error!(profile = %name, "Profile 未配置 endpoint");
            return Err(ForwarderError::MissingEndpoint(name));
        };

        Ok(Route {
            name,
            profile,
            endpoint,
        })
    }

    async fn report_failure(&self, index: usize, record: &Record, err: &ForwarderError) {
        let text = format!(
            "Exception \"{}\" at record {}:\n{}\n{:?}\n\nRecord:\n{}",
            err,
            index,
            "-".repeat(60),
            err,
            record.body_text()
        );
        error!(
            record = index,
            error = %err,
            detail = ?err,
            retryable = err.is_retryable(),
            "记录处理失败"
        );

        match self.notifier.notify(&self.alert_subject, &text).await {
            Ok(()) => metrics::record_admin_alert(true),
            Err(e) => {
                error!(record = index, error = %e, "发送管理员告警失败");
                metrics::record_admin_alert(false);
            }
        }
    }
}
