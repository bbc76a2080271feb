//! 编排器核心
//!
//! 节点注册表、路由、安全检查、执行计划、命令分发、跨节点同步和健康监控，
//! 由 [`OrchestratorService`] 组合成对外的操作集合。

pub mod dispatch;
pub mod health_monitor;
pub mod narrator;
pub mod planner;
pub mod registry;
pub mod router;
pub mod security;
pub mod service;
pub mod sync_coordinator;
pub mod transport;

pub use dispatch::CommandDispatcher;
pub use health_monitor::{HealthMonitor, HealthMonitorConfig};
pub use narrator::{build_narrator, DisabledNarrator, HeuristicNarrator};
pub use planner::{estimate_timeout, ExecutionPlanner};
pub use registry::NodeRegistry;
pub use router::{LeastLoadedStrategy, Router, SelectionStrategy};
pub use security::{Screening, SecurityGate};
pub use service::{BackendProbe, NodeListing, NodeWrite, OrchestratorService, AUTO_NODE};
pub use sync_coordinator::SyncCoordinator;
pub use transport::NodeTransport;
