//! 节点端工具实现
//!
//! 在单个根目录内提供文件列举、读写、命令执行、目录同步和主机信息六种工具。
//! [`NodeTools`] 被节点HTTP服务器直接使用，[`LocalNodeClient`] 把它包装成
//! 编排器的进程内传输。

pub mod executor;
pub mod filesystem;
pub mod local_client;
pub mod metrics;
pub mod paths;
pub mod sync;
pub mod tools;

pub use executor::CommandExecutor;
pub use local_client::LocalNodeClient;
pub use paths::NodeRoot;
pub use tools::NodeTools;
