//! 外部资源适配层
//!
//! - [`HttpNodeClient`] - 网络传输，调用节点服务器的 `/tools/*` 接口
//! - [`AuditLog`] - 追加写入的NDJSON审计文件，超过上限时保留最新条目
//! - [`HttpNarrator`] - 远端补全服务的叙述器实现

pub mod audit;
pub mod http_client;
pub mod narrator;

pub use audit::{AuditEntry, AuditLog};
pub use http_client::HttpNodeClient;
pub use narrator::HttpNarrator;
