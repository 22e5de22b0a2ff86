//! 事件转发服务
//!
//! 读取一个事件批次（文件或标准输入），按规则转发到各 profile 的 HTTP 端点。

use anyhow::Context;
use clap::Parser;
use event_forwarder::sender::ReqwestSender;
use event_forwarder::{Event, Forwarder, alert};
use forwarder_shared::config::AppConfig;
use forwarder_shared::observability;
use forwarder_shared::parameter_store::{FileParameterStore, ParameterStore};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tracing::{info, warn};

const SERVICE_NAME: &str = "event-forwarder";

#[derive(Parser, Debug)]
#[command(name = "event-forwarder", version, about = "按规则将事件转发到 HTTP 端点")]
struct Cli {
    /// 事件批次文件，缺省时读取标准输入
    #[arg(short, long)]
    event: Option<PathBuf>,

    /// 服务名，决定加载 config/{service}.toml
    #[arg(long, default_value = SERVICE_NAME)]
    service: String,
}

async fn read_event(path: Option<&PathBuf>) -> anyhow::Result<Event> {
    let raw = match path {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("读取事件文件失败: {}", path.display()))?,
        None => {
            let mut raw = String::new();
            tokio::io::stdin().read_to_string(&mut raw).await?;
            raw
        }
    };

    Event::from_json(&raw).context("事件不是有效的 JSON")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (config, load_error) = match AppConfig::load(&cli.service) {
        Ok(config) => (config, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };

    let obs_config = config
        .observability
        .clone()
        .with_service_name(&cli.service);
    observability::init(&obs_config)?;

    if let Some(e) = load_error {
        warn!(error = %e, "加载配置失败，使用默认配置");
    }

    info!(
        environment = %config.environment,
        config_key = %config.forwarder.config_key,
        "Starting event-forwarder..."
    );

    let timeout = Duration::from_secs(config.http.timeout_seconds);
    let store: Arc<dyn ParameterStore> =
        Arc::new(FileParameterStore::new(&config.parameter_store.root_dir));
    let sender = Arc::new(ReqwestSender::new(timeout)?);
    let notifier = alert::from_config(&config.alert, timeout)?;

    let forwarder = Forwarder::new(&config, store, sender, notifier).await?;
    info!(rules = forwarder.has_rules(), "转发器已就绪");

    let event = read_event(cli.event.as_ref()).await?;
    let report = forwarder.handle(&event).await;

    info!(
        total = report.total(),
        sent = report.sent,
        failed = report.failed,
        "事件转发完成"
    );

    Ok(())
}
