//! 能力接口
//!
//! - [`NodeClient`] - 编排器调用节点工具的统一接口，网络和本地两种传输都实现它
//! - [`Narrator`] - 可选的说明文字生成器，只提供建议，失败时由调用方降级

pub mod narrator;
pub mod node_client;

pub use narrator::{NarrationContext, Narrator};
pub use node_client::NodeClient;
