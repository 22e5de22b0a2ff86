//! 参数存储
//!
//! 按名称读取配置文档和模板文本。`Ok(None)` 表示参数不存在，
//! `Err` 表示读取过程本身失败，调用方据此区分"未配置"与"暂时不可用"。

use crate::error::{Result, SharedError};
use async_trait::async_trait;
use dashmap::DashMap;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, instrument};

/// 参数存储接口
#[async_trait]
pub trait ParameterStore: Send + Sync {
    /// 读取参数值
    async fn get_parameter(&self, name: &str) -> Result<Option<String>>;
}

/// 基于文件的参数存储
///
/// 参数名去掉开头的 `/` 后映射为根目录下的相对路径，
/// 如 `/eventforwarder/templates/default` -> `{root}/eventforwarder/templates/default`。
#[derive(Debug, Clone)]
pub struct FileParameterStore {
    root: PathBuf,
}

impl FileParameterStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 参数名对应的文件路径，拒绝跳出根目录的名称
    pub fn path_for(&self, name: &str) -> Result<PathBuf> {
        let relative = Path::new(name.trim_start_matches('/'));

        if relative.as_os_str().is_empty()
            || relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(SharedError::Validation(format!("无效的参数名: {}", name)));
        }

        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ParameterStore for FileParameterStore {
    #[instrument(skip(self))]
    async fn get_parameter(&self, name: &str) -> Result<Option<String>> {
        let path = self.path_for(name)?;

        match tokio::fs::read_to_string(&path).await {
            Ok(value) => {
                debug!(path = %path.display(), "参数已读取");
                Ok(Some(value))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SharedError::ParameterRetrieval {
                name: name.to_string(),
                message: e.to_string(),
            }),
        }
    }
}

/// 内存参数存储，用于本地运行和测试
#[derive(Debug, Default)]
pub struct InMemoryParameterStore {
    params: DashMap<String, String>,
}

impl InMemoryParameterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 链式写入参数
    pub fn with(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&self, name: impl Into<String>, value: impl Into<String>) {
        self.params.insert(name.into(), value.into());
    }

    pub fn remove(&self, name: &str) -> Option<String> {
        self.params.remove(name).map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

#[async_trait]
impl ParameterStore for InMemoryParameterStore {
    async fn get_parameter(&self, name: &str) -> Result<Option<String>> {
        Ok(self.params.get(name).map(|entry| entry.value().clone()))
    }
}
