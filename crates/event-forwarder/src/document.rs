//! 转发配置文档
//!
//! 文档保存在参数存储中，包含规则列表和 profile 表：
//!
//! ```json
//! {
//!   "rules": [{"rulesets": {"and": [["detail.state", "EQ", "ALARM"]]}, "profile": "pager"}],
//!   "profiles": {
//!     "default": {"endpoint": "https://hooks.example.com/x"},
//!     "pager": {"endpoint": "https://pager.example.com", "template": "pager",
//!               "parameters": {"channel": "#ops", "text": "@@@@"}}
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// 匹配结果未指定 profile 时使用的 profile
pub const DEFAULT_PROFILE: &str = "default";

/// profile 未指定模板时使用的模板名
pub const DEFAULT_TEMPLATE: &str = "default";

/// 投递目标
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default)]
    pub template: Option<String>,

    /// 消息参数对象，值为 `@@@@` 的字段替换为渲染后的文本
    #[serde(default)]
    pub parameters: Option<Value>,
}

impl Profile {
    pub fn template_name(&self) -> &str {
        self.template.as_deref().unwrap_or(DEFAULT_TEMPLATE)
    }
}

/// 转发配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForwarderDocument {
    #[serde(default)]
    pub rules: Option<Vec<Value>>,

    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl ForwarderDocument {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn profile(&self, name: &str) -> Option<&Profile> {
        self.profiles.get(name)
    }
}
