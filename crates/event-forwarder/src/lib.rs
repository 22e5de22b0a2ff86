//! 事件转发服务
//!
//! 读取一批事件记录，按规则引擎的匹配结果选择 profile，用模板渲染消息后
//! 投递到 profile 指定的 HTTP 端点。单条记录失败只告警，不影响同批其他记录。

pub mod alert;
pub mod document;
pub mod error;
pub mod forwarder;
pub mod message;
pub mod sender;
pub mod template;

pub use error::{ForwarderError, Result};
pub use forwarder::{BatchReport, Event, Forwarder, Record};
