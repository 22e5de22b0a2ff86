//! 消息模板
//!
//! 模板使用 Jinja 语法，变量分隔符改为 `{=` 和 `=}`，块语句仍为 `{% %}`。
//! 渲染上下文：
//! - `data`：记录内容
//! - `datastr`：记录内容的 4 空格缩进 JSON
//!
//! 未定义的字段渲染为空字符串，可以链式访问（`data.a.b` 在 `a` 缺失时也为空）。
//! 模板从参数存储按名称加载，首次加载成功后缓存。

use crate::error::{ForwarderError, Result};
use dashmap::DashMap;
use forwarder_shared::config::ForwarderConfig;
use forwarder_shared::parameter_store::ParameterStore;
use minijinja::syntax::SyntaxConfig;
use minijinja::{Environment, UndefinedBehavior, context};
use serde::Serialize;
use serde_json::Value;
use serde_json::ser::{PrettyFormatter, Serializer};
use std::sync::Arc;
use tracing::{debug, error, warn};

const TEMPLATE_NAME: &str = "message";

/// 找不到模板时使用的兜底模板，`reason` 为出错原因
const FALLBACK_SOURCE: &str = "{= reason =}\n\nMessage:\n{= datastr =}\n\n";

fn environment() -> Result<Environment<'static>> {
    let syntax = SyntaxConfig::builder()
        .variable_delimiters("{=", "=}")
        .build()
        .map_err(|e| ForwarderError::InvalidTemplate(e.to_string()))?;

    let mut env = Environment::new();
    env.set_syntax(syntax);
    env.set_undefined_behavior(UndefinedBehavior::Chainable);
    Ok(env)
}

/// 已编译的模板
#[derive(Debug)]
pub struct Template {
    source: String,
    env: Environment<'static>,
    reason: Option<String>,
}

impl Template {
    /// 从参数值构建模板，参数缺失视为无效模板
    pub fn new(text: Option<String>) -> Result<Self> {
        match text {
            Some(text) => Self::parse(text),
            None => Err(ForwarderError::InvalidTemplate("模板内容为空".to_string())),
        }
    }

    /// 编译模板文本，语法错误返回 `InvalidTemplate`
    pub fn parse(source: impl Into<String>) -> Result<Self> {
        let source = source.into();
        let mut env = environment()?;
        env.add_template_owned(TEMPLATE_NAME, source.clone())
            .map_err(|e| ForwarderError::InvalidTemplate(e.to_string()))?;

        Ok(Self {
            source,
            env,
            reason: None,
        })
    }

    /// 兜底模板：输出出错原因和原始记录
    pub fn fallback(reason: impl Into<String>) -> Result<Self> {
        let mut template = Self::parse(FALLBACK_SOURCE)?;
        template.reason = Some(reason.into());
        Ok(template)
    }

    pub fn text(&self) -> &str {
        &self.source
    }

    pub fn is_fallback(&self) -> bool {
        self.reason.is_some()
    }

    /// 用记录内容渲染模板
    pub fn render(&self, data: &Value) -> Result<String> {
        let datastr = pretty_json(data);
        let template = self.env.get_template(TEMPLATE_NAME)?;

        Ok(template.render(context! {
            data => data,
            datastr => datastr,
            reason => self.reason.as_deref(),
        })?)
    }
}

/// 4 空格缩进的 JSON
fn pretty_json(value: &Value) -> String {
    let mut buf = Vec::new();
    let mut ser = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));

    match value.serialize(&mut ser) {
        Ok(()) => String::from_utf8(buf).unwrap_or_else(|_| value.to_string()),
        Err(_) => value.to_string(),
    }
}

/// 模板缓存
///
/// 只缓存成功加载的模板，兜底模板每次重新生成，便于模板补录后立即生效。
pub struct TemplateCache {
    store: Arc<dyn ParameterStore>,
    config: ForwarderConfig,
    templates: DashMap<String, Arc<Template>>,
}

impl TemplateCache {
    pub fn new(store: Arc<dyn ParameterStore>, config: ForwarderConfig) -> Self {
        Self {
            store,
            config,
            templates: DashMap::new(),
        }
    }

    /// 按名称获取模板
    ///
    /// 模板不存在或读取失败时返回兜底模板；模板存在但语法错误时返回错误。
    pub async fn get(&self, name: &str) -> Result<Arc<Template>> {
        if let Some(template) = self.templates.get(name) {
            return Ok(Arc::clone(template.value()));
        }

        let key = self.config.template_key(name);
        match self.store.get_parameter(&key).await {
            Ok(Some(text)) => {
                let template = Arc::new(Template::parse(text).inspect_err(|e| {
                    error!(template = %key, error = %e, "模板编译失败");
                })?);
                debug!(template = %key, "模板已加载");
                self.templates.insert(name.to_string(), Arc::clone(&template));
                Ok(template)
            }
            Ok(None) => {
                warn!(template = %key, "模板不存在，使用兜底模板");
                Ok(Arc::new(Template::fallback(format!(
                    "ERROR - Could not find template {}!",
                    key
                ))?))
            }
            Err(e) => {
                error!(template = %key, error = %e, "读取模板失败，使用兜底模板");
                Ok(Arc::new(Template::fallback(format!(
                    "ERROR - Exception:\n{}",
                    e
                ))?))
            }
        }
    }

    pub fn is_cached(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
