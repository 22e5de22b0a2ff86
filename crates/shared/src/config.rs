//! 配置管理模块
//!
//! 支持多格式配置文件加载，环境变量覆盖，以及类型安全的配置访问。

use crate::error::{Result, SharedError};
use crate::observability::ObservabilityConfig;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// 转发器配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ForwarderConfig {
    /// 保存规则与 profile 文档的参数名
    pub config_key: String,
    /// 模板参数名前缀，模板参数为 `{template_prefix}/{name}`
    pub template_prefix: String,
}

impl Default for ForwarderConfig {
    fn default() -> Self {
        Self {
            config_key: "/eventforwarder/config".to_string(),
            template_prefix: "/eventforwarder/templates".to_string(),
        }
    }
}

impl ForwarderConfig {
    /// 模板参数的完整名称
    pub fn template_key(&self, template_name: &str) -> String {
        format!(
            "{}/{}",
            self.template_prefix.trim_end_matches('/'),
            template_name
        )
    }
}

/// 参数存储配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ParameterStoreConfig {
    /// 文件参数存储的根目录
    pub root_dir: PathBuf,
}

impl Default for ParameterStoreConfig {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("parameters"),
        }
    }
}

/// HTTP 投递配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_seconds: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 10,
        }
    }
}

/// 管理员告警配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// 告警 webhook 地址，未配置时告警只写日志
    pub webhook_url: Option<String>,
    pub subject: String,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            subject: "Eventforwarder exception".to_string(),
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub service_name: String,
    pub environment: String,
    pub forwarder: ForwarderConfig,
    pub parameter_store: ParameterStoreConfig,
    pub http: HttpConfig,
    pub alert: AlertConfig,
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    ///
    /// 加载顺序（后加载的会覆盖先加载的同名配置项）：
    /// 1. `.env`（存在时）
    /// 2. config/default.toml（默认配置）
    /// 3. config/{environment}.toml（环境特定配置）
    /// 4. config/{service_name}.toml（服务特定配置）
    /// 5. 环境变量（FORWARDER_ 前缀，`__` 分隔层级，如
    ///    FORWARDER_HTTP__TIMEOUT_SECONDS -> http.timeout_seconds）
    /// 6. 兼容旧部署的 CONFIGPATH / TEMPLATEPATH
    pub fn load(service_name: &str) -> Result<Self> {
        dotenvy::dotenv().ok();

        let env = std::env::var("FORWARDER_ENV").unwrap_or_else(|_| "development".to_string());
        let config_dir = std::env::var("CONFIG_DIR").unwrap_or_else(|_| "config".to_string());

        let builder = Config::builder()
            .set_default("service_name", service_name)?
            .set_default("environment", env.clone())?
            .add_source(File::from(Path::new(&config_dir).join("default.toml")).required(false))
            .add_source(
                File::from(Path::new(&config_dir).join(format!("{}.toml", env))).required(false),
            )
            .add_source(
                File::from(Path::new(&config_dir).join(format!("{}.toml", service_name)))
                    .required(false),
            )
            .add_source(
                Environment::with_prefix("FORWARDER")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        let mut config: Self = builder.build()?.try_deserialize()?;
        config.apply_legacy_env();
        config.validate()?;

        Ok(config)
    }

    /// 旧部署通过 CONFIGPATH / TEMPLATEPATH 指定参数位置
    fn apply_legacy_env(&mut self) {
        if let Ok(path) = std::env::var("CONFIGPATH") {
            self.forwarder.config_key = path;
        }
        if let Ok(path) = std::env::var("TEMPLATEPATH") {
            self.forwarder.template_prefix = path;
        }
    }

    /// 校验必填项
    pub fn validate(&self) -> Result<()> {
        if self.forwarder.config_key.trim().is_empty() {
            return Err(SharedError::Validation(
                "forwarder.config_key 不能为空".to_string(),
            ));
        }
        if self.http.timeout_seconds == 0 {
            return Err(SharedError::Validation(
                "http.timeout_seconds 必须大于 0".to_string(),
            ));
        }
        Ok(())
    }

}
