//! 转发服务集成测试
//!
//! 使用 wiremock 模拟投递端点和告警 webhook，验证从参数存储加载配置到
//! HTTP 投递的完整链路。

use event_forwarder::alert::{AdminNotifier, WebhookNotifier};
use event_forwarder::sender::{HttpSender, ReqwestSender};
use event_forwarder::{BatchReport, Event, Forwarder, ForwarderError, Record};
use forwarder_shared::config::AppConfig;
use forwarder_shared::error::SharedError;
use forwarder_shared::parameter_store::InMemoryParameterStore;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, body_string, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TIMEOUT: Duration = Duration::from_secs(5);

fn forwarding_document(server: &MockServer) -> Value {
    json!({
        "rules": [
            {
                "rulesets": {
                    "and": [["detail.state", "EQ", "ALARM"]],
                    "or": [["detail.severity", "LE", 2]]
                },
                "profile": "pager",
                "transform": ["json:detail.message"]
            },
            {
                "rulesets": {"or": [["source", "REGEX", "^aws\\.(ec2|rds)"]]},
                "profile": "infra"
            }
        ],
        "profiles": {
            "default": {"endpoint": format!("{}/default", server.uri())},
            "pager": {
                "endpoint": format!("{}/pager", server.uri()),
                "template": "pager",
                "parameters": {"channel": "#oncall", "text": "@@@@"}
            },
            "infra": {
                "endpoint": format!("{}/infra", server.uri()),
                "template": "infra"
            }
        }
    })
}

fn parameter_store(server: &MockServer) -> Arc<InMemoryParameterStore> {
    Arc::new(
        InMemoryParameterStore::new()
            .with(
                "/eventforwarder/config",
                forwarding_document(server).to_string(),
            )
            .with(
                "/eventforwarder/templates/pager",
                "{= data.detail.state =}: {= data.detail.message.metric =}",
            )
            .with(
                "/eventforwarder/templates/default",
                "{= data.source =} is {= data.detail.state =}",
            ),
    )
}

async fn build_forwarder(server: &MockServer, alerts: &MockServer) -> Forwarder {
    let sender = Arc::new(ReqwestSender::new(TIMEOUT).unwrap());
    let notifier = Arc::new(WebhookNotifier::new(format!("{}/alerts", alerts.uri()), TIMEOUT).unwrap());

    Forwarder::new(
        &AppConfig::default(),
        parameter_store(server),
        sender,
        notifier,
    )
    .await
    .unwrap()
}

/// 不匹配第一个规则集合的记录，规则中用到的字段都存在
fn quiet_record(source: &str) -> Value {
    json!({"source": source, "detail": {"state": "OK", "severity": 5}})
}

fn batch(bodies: &[Value]) -> Event {
    Event {
        records: bodies.iter().map(|b| Record::new(b.to_string())).collect(),
    }
}

// ==================== 完整链路 ====================

#[tokio::test]
async fn test_matched_record_is_transformed_and_wrapped() {
    let server = MockServer::start().await;
    let alerts = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/pager"))
        .and(body_json(json!({"channel": "#oncall", "text": "ALARM: CPUUtilization"})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let forwarder = build_forwarder(&server, &alerts).await;
    let report = forwarder
        .handle(&batch(&[json!({
            "source": "aws.cloudwatch",
            "detail": {
                "state": "ALARM",
                "severity": 3,
                "message": "{\"metric\": \"CPUUtilization\"}"
            }
        })]))
        .await;

    assert_eq!(report, BatchReport { sent: 1, failed: 0 });
}

#[tokio::test]
async fn test_pass_through_renders_default_template() {
    let server = MockServer::start().await;
    let alerts = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/default"))
        .and(body_string("custom.app is OK"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let forwarder = build_forwarder(&server, &alerts).await;
    let report = forwarder
        .handle(&batch(&[quiet_record("custom.app")]))
        .await;

    assert_eq!(report.sent, 1);
}

#[tokio::test]
async fn test_missing_template_sends_fallback_text() {
    let server = MockServer::start().await;
    let alerts = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/infra"))
        .and(body_string(
            "ERROR - Could not find template /eventforwarder/templates/infra!\n\nMessage:\n\
             {\n    \"source\": \"aws.rds\",\n    \"detail\": {\n        \"state\": \"OK\",\n        \"severity\": 5\n    }\n}\n",
        ))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let forwarder = build_forwarder(&server, &alerts).await;
    let report = forwarder.handle(&batch(&[quiet_record("aws.rds")])).await;

    assert_eq!(report.sent, 1);
}

// ==================== 失败与告警 ====================

#[tokio::test]
async fn test_non_200_status_alerts_and_continues() {
    let server = MockServer::start().await;
    let alerts = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/infra"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/default"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/alerts"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&alerts)
        .await;

    let forwarder = build_forwarder(&server, &alerts).await;
    let event = Event {
        records: vec![
            Record::new(quiet_record("aws.ec2").to_string()),
            Record::new("{\"truncated\": "),
            Record::new(quiet_record("custom.app").to_string()),
        ],
    };

    let report = forwarder.handle(&event).await;
    assert_eq!(report, BatchReport { sent: 1, failed: 2 });

    let requests = alerts.received_requests().await.unwrap();
    let first: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(first["subject"], json!("Eventforwarder exception"));
    assert!(
        first["message"]
            .as_str()
            .unwrap()
            .contains("at record 0")
    );
}

#[tokio::test]
async fn test_object_body_fails_alone() {
    let server = MockServer::start().await;
    let alerts = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/default"))
        .and(body_string("custom.app is OK"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/alerts"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&alerts)
        .await;

    let raw = json!({
        "Records": [
            {"body": {"source": "custom.app"}, "messageId": "m-1"},
            {"body": quiet_record("custom.app").to_string(), "messageId": "m-2"}
        ]
    })
    .to_string();
    let event = Event::from_json(&raw).unwrap();

    let forwarder = build_forwarder(&server, &alerts).await;
    let report = forwarder.handle(&event).await;
    assert_eq!(report, BatchReport { sent: 1, failed: 1 });

    let requests = alerts.received_requests().await.unwrap();
    let alert: Value = serde_json::from_slice(&requests[0].body).unwrap();
    let message = alert["message"].as_str().unwrap();
    assert!(message.contains("at record 0"));
    assert!(message.contains("object"));
}

#[tokio::test]
async fn test_alert_webhook_failure_does_not_abort_batch() {
    let server = MockServer::start().await;
    let alerts = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/alerts"))
        .respond_with(ResponseTemplate::new(502))
        .expect(2)
        .mount(&alerts)
        .await;

    let forwarder = build_forwarder(&server, &alerts).await;
    let event = Event {
        records: vec![Record::new("nope"), Record::new("[")],
    };

    assert_eq!(forwarder.handle(&event).await.failed, 2);
}

// ==================== 投递组件 ====================

#[tokio::test]
async fn test_reqwest_sender_reports_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .and(body_string("payload"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let sender = ReqwestSender::new(TIMEOUT).unwrap();
    let status = sender
        .send(&format!("{}/hook", server.uri()), "payload".to_string())
        .await
        .unwrap();
    assert_eq!(status, 503);
}

#[tokio::test]
async fn test_reqwest_sender_timeout_is_retryable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;

    let sender = ReqwestSender::new(Duration::from_millis(50)).unwrap();
    let err = sender
        .send(&format!("{}/slow", server.uri()), "payload".to_string())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ForwarderError::Shared(SharedError::ExternalServiceTimeout { .. })
    ));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_webhook_notifier_rejects_error_status() {
    let alerts = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/alerts"))
        .and(body_json(json!({"subject": "s", "message": "m"})))
        .respond_with(ResponseTemplate::new(500))
        .mount(&alerts)
        .await;

    let notifier = WebhookNotifier::new(format!("{}/alerts", alerts.uri()), TIMEOUT).unwrap();
    let err = notifier.notify("s", "m").await.unwrap_err();
    assert!(matches!(err, ForwarderError::Shared(_)));
}
