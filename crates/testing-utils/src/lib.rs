//! # Fleet Testing Utils
//!
//! 编排系统各crate共享的测试工具。
//!
//! - **Mock节点客户端**: 内存中的 [`NodeClient`](fleet_core::NodeClient) 实现，
//!   可配置指标、文件、失败方式，并记录调用次数
//! - **Mock叙述器**: 记录收到的上下文，可配置为总是失败
//! - **测试数据构建器**: 带合理默认值的 `NodeInfo` 构建器
//!
//! 作为 dev-dependency 使用：
//!
//! ```toml
//! [dev-dependencies]
//! fleet-testing-utils = { path = "../testing-utils" }
//! ```

pub mod builders;
pub mod mocks;

pub use builders::*;
pub use mocks::*;
