use std::sync::Arc;
use std::time::{Duration, Instant};

use fleet_config::OrchestratorConfig;
use fleet_core::{
    CommandRequest, CommandResult, ExecuteCommandRequest, ExecutionResponse, FleetError,
    FleetResult, ListFilesRequest, ListFilesResponse, NarrationContext, Narrator, NodeInfo,
    NodeStatus, RouterRequest, SyncFilesRequest, SyncFilesResponse, SyncPathResponse,
    SyncStrategy, WriteFileRequest, WriteFileResponse,
};
use fleet_infrastructure::AuditLog;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::dispatch::CommandDispatcher;
use crate::health_monitor::{HealthMonitor, HealthMonitorConfig};
use crate::narrator::build_narrator;
use crate::planner::ExecutionPlanner;
use crate::registry::NodeRegistry;
use crate::router::Router;
use crate::security::SecurityGate;
use crate::sync_coordinator::SyncCoordinator;

/// `list_files` 的节点参数取这个值时由路由器选择负载最低的健康节点
pub const AUTO_NODE: &str = "auto";

/// 带节点ID的目录列举结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeListing {
    pub node_id: String,
    #[serde(flatten)]
    pub listing: ListFilesResponse,
}

/// 带节点ID的写入结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeWrite {
    pub node_id: String,
    #[serde(flatten)]
    pub response: WriteFileResponse,
}

/// 叙述器探测结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendProbe {
    pub narrator: String,
    pub available: bool,
    pub reply: Option<String>,
    pub error: Option<String>,
    pub duration: f64,
}

/// 编排服务
///
/// 对外的全部操作都经过这里：节点查询、命令分发、跨节点同步和叙述器探测。
/// 会改变节点状态的操作写入审计日志；审计失败只记录警告，不影响操作结果。
pub struct OrchestratorService {
    registry: Arc<NodeRegistry>,
    router: Router,
    planner: ExecutionPlanner,
    gate: SecurityGate,
    dispatcher: CommandDispatcher,
    sync: SyncCoordinator,
    narrator: Arc<dyn Narrator>,
    audit: Option<Arc<AuditLog>>,
    max_parallelism: usize,
    refresh_interval: Duration,
}

impl OrchestratorService {
    /// 按配置装配全部组件
    pub async fn from_config(config: &OrchestratorConfig) -> FleetResult<Self> {
        let registry = Arc::new(NodeRegistry::from_config(config)?);
        let narrator = build_narrator(&config.narrator)?;
        let audit = Arc::new(AuditLog::from_config(&config.audit).await?);

        info!(
            "编排服务已装配: id={}, nodes={}, narrator={}",
            config.orchestrator_id,
            registry.len(),
            narrator.name()
        );
        Ok(Self::new(registry, narrator, Some(audit))
            .with_max_parallelism(config.max_parallelism)
            .with_refresh_interval(Duration::from_secs_f64(config.refresh_interval_seconds)))
    }

    pub fn new(
        registry: Arc<NodeRegistry>,
        narrator: Arc<dyn Narrator>,
        audit: Option<Arc<AuditLog>>,
    ) -> Self {
        Self {
            router: Router::new(registry.clone(), Some(narrator.clone())),
            planner: ExecutionPlanner::new(),
            gate: SecurityGate::new(registry.clone()),
            dispatcher: CommandDispatcher::new(registry.clone()),
            sync: SyncCoordinator::new(registry.clone(), Some(narrator.clone())),
            registry,
            narrator,
            audit,
            max_parallelism: 8,
            refresh_interval: HealthMonitorConfig::default().refresh_interval,
        }
    }

    pub fn with_max_parallelism(mut self, max_parallelism: usize) -> Self {
        self.max_parallelism = max_parallelism.max(1);
        self
    }

    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    pub fn registry(&self) -> &Arc<NodeRegistry> {
        &self.registry
    }

    pub fn audit_log(&self) -> Option<&Arc<AuditLog>> {
        self.audit.as_ref()
    }

    /// 按服务的刷新间隔创建健康监控
    pub fn health_monitor(&self) -> HealthMonitor {
        HealthMonitor::new(
            self.registry.clone(),
            Some(HealthMonitorConfig {
                refresh_interval: self.refresh_interval,
            }),
        )
    }

    /// 刷新后的全部节点状态
    pub async fn list_nodes(&self) -> Vec<NodeStatus> {
        self.registry.refresh_all().await
    }

    pub async fn get_node_info(&self, node_id: &str) -> FleetResult<NodeInfo> {
        let client = self.registry.get_client(node_id)?;
        let info = client.get_node_info().await?;
        self.record("get_node_info", json!({ "node_id": node_id })).await;
        Ok(info)
    }

    /// `node_id` 为 `auto` 时由路由器按刷新后的负载选择节点
    pub async fn list_files(&self, node_id: &str, request: ListFilesRequest) -> FleetResult<NodeListing> {
        let node_id = if node_id == AUTO_NODE {
            let decision = self
                .router
                .select_nodes(&RouterRequest::new(format!("List files under {}", request.path)))
                .await?;
            decision
                .nodes
                .into_iter()
                .next()
                .ok_or_else(|| FleetError::validation("没有可用于列举文件的节点"))?
        } else {
            node_id.to_string()
        };
        let client = self.registry.get_client(&node_id)?;
        let path = request.path.clone();
        let listing = client.list_files(request).await?;

        self.record(
            "list_files",
            json!({
                "node_id": node_id,
                "path": path,
                "count": listing.count,
            }),
        )
        .await;
        Ok(NodeListing { node_id, listing })
    }

    /// 选择节点、制定计划、安全检查、并发执行、记录审计
    ///
    /// 被允许列表拒绝的节点不会收到命令，结果中以失败记录出现；
    /// 只有全部节点都被拒绝时返回 `CommandNotAllowed`。
    pub async fn execute_command(&self, request: CommandRequest) -> FleetResult<ExecutionResponse> {
        request.command.argv()?;
        let parallelism = request.parallelism.clamp(1, self.max_parallelism);
        if parallelism != request.parallelism {
            warn!(
                "并行度 {} 超出范围，调整为 {}",
                request.parallelism, parallelism
            );
        }

        let router_request = RouterRequest::new(request.task())
            .with_tags(request.preferred_tags.clone())
            .with_parallelism(parallelism);
        let decision = self.router.select_nodes(&router_request).await?;
        let plan = self.planner.plan(&request, decision)?;
        let execution_id = Uuid::new_v4();

        let mut screening = self.gate.screen(&plan.nodes, &request.command)?;
        if screening.all_rejected() {
            let (_, err) = screening.rejected.remove(0);
            self.record(
                "execute_command_rejected",
                json!({
                    "execution_id": execution_id,
                    "command": request.command.to_string(),
                    "nodes": plan.nodes,
                    "error": err.to_string(),
                }),
            )
            .await;
            return Err(err);
        }

        let exec_request = ExecuteCommandRequest {
            command: request.command.clone(),
            timeout: plan.timeout,
            cwd: request.cwd.clone(),
            env: request.env.clone(),
        };
        info!(
            "分发命令: execution_id={}, command={}, nodes={:?}, timeout={:.1}s",
            execution_id, request.command, screening.authorized, plan.timeout
        );
        let dispatched = self.dispatcher.dispatch(&screening.authorized, &exec_request).await;
        metrics::counter!("fleet_commands_dispatched_total").increment(dispatched.len() as u64);

        let mut results = Vec::with_capacity(plan.nodes.len());
        let mut dispatched = dispatched.into_iter();
        for node_id in &plan.nodes {
            if let Some(pos) = screening.rejected.iter().position(|(id, _)| id == node_id) {
                let (_, err) = &screening.rejected[pos];
                results.push(CommandResult::from_error(node_id, err, 0.0));
            } else if let Some(result) = dispatched.next() {
                results.push(result);
            }
        }

        self.record(
            "execute_command",
            json!({
                "execution_id": execution_id,
                "description": request.description,
                "command": request.command.to_string(),
                "nodes": plan.nodes,
                "mode": plan.mode,
                "timeout": plan.timeout,
                "exit_codes": results
                    .iter()
                    .map(|r| json!({"node_id": r.node_id, "exit_code": r.exit_code}))
                    .collect::<Vec<_>>(),
            }),
        )
        .await;

        Ok(ExecutionResponse {
            execution_id,
            plan,
            results,
        })
    }

    /// 经编排器中转，把源节点上的路径复制到其他节点
    pub async fn sync_path(
        &self,
        source_node: &str,
        source_path: &str,
        target_nodes: &[String],
        strategy: SyncStrategy,
    ) -> FleetResult<SyncPathResponse> {
        let plan = self
            .sync
            .plan_sync(source_node, source_path, target_nodes, strategy)
            .await?;
        let reports = self.sync.sync_path(&plan).await?;

        self.record(
            "sync_path",
            json!({
                "source_node": plan.source_node,
                "source_path": plan.source_path,
                "targets": plan.target_nodes,
                "requested_strategy": plan.strategy,
                "files_synced": reports.iter().map(|r| r.files_synced).sum::<u64>(),
            }),
        )
        .await;
        Ok(SyncPathResponse { plan, reports })
    }

    /// 调用单个节点自身的 sync-files 工具
    pub async fn sync_files(&self, node_id: &str, request: SyncFilesRequest) -> FleetResult<SyncFilesResponse> {
        let client = self.registry.get_client(node_id)?;
        let response = client.sync_files(request).await?;
        self.record(
            "sync_files",
            json!({
                "node_id": node_id,
                "source": response.source,
                "strategy": response.strategy,
                "targets": response.targets.iter().map(|t| &t.target).collect::<Vec<_>>(),
            }),
        )
        .await;
        Ok(response)
    }

    /// 写到按偏好标签选出的节点
    pub async fn write_file(
        &self,
        path: &str,
        content: &str,
        preferred_tags: &[String],
        overwrite: bool,
    ) -> FleetResult<NodeWrite> {
        let node_id = self.registry.choose_node(preferred_tags)?;
        let client = self.registry.get_client(&node_id)?;
        let response = client
            .write_file(WriteFileRequest::new(path, content).overwrite(overwrite))
            .await?;

        self.record(
            "write_file",
            json!({
                "node_id": node_id,
                "path": response.relative_path,
                "bytes_written": response.bytes_written,
                "backup_path": response.backup_path,
            }),
        )
        .await;
        Ok(NodeWrite { node_id, response })
    }

    /// 探测叙述器是否可用，不可用时也正常返回
    pub async fn check_agent_backend(&self, message: &str, context: Value) -> BackendProbe {
        let started = Instant::now();
        let narration = NarrationContext::new("probe", message, context);
        let outcome = self.narrator.narrate(&narration).await;
        let probe = BackendProbe {
            narrator: self.narrator.name().to_string(),
            available: outcome.is_ok(),
            error: outcome.as_ref().err().map(FleetError::to_string),
            reply: outcome.ok(),
            duration: started.elapsed().as_secs_f64(),
        };

        self.record(
            "check_agent_backend",
            json!({
                "narrator": probe.narrator,
                "available": probe.available,
                "message": message,
            }),
        )
        .await;
        probe
    }

    async fn record(&self, action: &str, payload: Value) {
        if let Some(audit) = &self.audit {
            if let Err(e) = audit.record(action, payload).await {
                warn!("审计记录写入失败: action={}, error={}", action, e);
            }
        }
    }
}
