//! # 数据模型
//!
//! 编排器与节点之间交换的全部数据结构。
//!
//! ## 核心模型
//!
//! ### 节点
//! - [`NodeInfo`] - 节点自报的静态信息和实时指标
//! - [`NodeStatus`] - 注册表为每个节点维护的健康快照
//!
//! ### 文件
//! - [`FileMetadata`] - 目录列举结果中的单个条目
//! - [`ReadFileResponse`] / [`WriteFileResponse`] - 读写结果
//!
//! ### 命令
//! - [`CommandLine`] - 参数数组或shell风格字符串
//! - [`CommandOutput`] - 节点返回的原始执行结果
//! - [`CommandResult`] - 编排器聚合后的单节点结果（含失败原因）
//!
//! ### 路由与计划
//! - [`RouterRequest`] / [`RouterDecision`] - 节点选择的输入和输出
//! - [`ExecutionPlan`] - 一次命令分发的具体计划
//!
//! ### 同步
//! - [`SyncStrategy`] - 镜像或追加
//! - [`SyncPlan`] / [`SyncReport`] - 跨节点同步的计划和逐目标报告
//!
//! ### 请求
//! 每个节点工具都有一个静态类型的请求结构，在传输边界通过 [`Validate`] 校验。
//!
//! ## 设计原则
//!
//! - 时间字段统一使用 `DateTime<Utc>`
//! - 持续时间统一以秒为单位的 `f64` 表示
//! - 所有模型都实现 `Serialize`/`Deserialize`，字段名即线上格式

pub mod command;
pub mod file;
pub mod node;
pub mod requests;
pub mod routing;
pub mod sync;

pub use command::*;
pub use file::*;
pub use node::*;
pub use requests::*;
pub use routing::*;
pub use sync::*;
