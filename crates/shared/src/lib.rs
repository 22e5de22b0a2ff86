//! 共享库
//!
//! 包含转发服务共用的配置、错误处理、参数存储和可观测性等基础设施代码。

pub mod config;
pub mod error;
pub mod observability;
pub mod parameter_store;
