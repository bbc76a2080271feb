//! Fleet 核心库
//!
//! 定义编排器与节点共享的错误类型、数据模型和能力接口。
//! 其余crate（配置、节点工具、传输层、调度器）都只依赖这里的抽象。

pub mod errors;
pub mod models;
pub mod traits;

pub use errors::*;
pub use models::*;
pub use traits::{NarrationContext, Narrator, NodeClient};

/// 统一的Result类型
pub type FleetResult<T> = std::result::Result<T, FleetError>;
