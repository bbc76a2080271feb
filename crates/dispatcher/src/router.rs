use std::cmp::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use fleet_core::{
    FanOutMode, FleetError, FleetResult, NarrationContext, Narrator, NodeStatus, RouterDecision,
    RouterRequest,
};
use serde_json::json;
use tracing::{debug, warn};

use crate::registry::NodeRegistry;

/// 节点选择策略
#[async_trait]
pub trait SelectionStrategy: Send + Sync {
    /// 从候选中按优先顺序选出节点
    async fn select_nodes(
        &self,
        request: &RouterRequest,
        candidates: &[NodeStatus],
    ) -> FleetResult<Vec<String>>;

    fn name(&self) -> &str;
}

/// 健康优先，其次CPU、内存占用最低
pub struct LeastLoadedStrategy;

impl LeastLoadedStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LeastLoadedStrategy {
    fn default() -> Self {
        Self::new()
    }
}

fn load_order(a: &NodeStatus, b: &NodeStatus) -> Ordering {
    (!a.healthy)
        .cmp(&!b.healthy)
        .then_with(|| a.cpu_percent().total_cmp(&b.cpu_percent()))
        .then_with(|| a.memory_percent().total_cmp(&b.memory_percent()))
}

#[async_trait]
impl SelectionStrategy for LeastLoadedStrategy {
    async fn select_nodes(
        &self,
        request: &RouterRequest,
        candidates: &[NodeStatus],
    ) -> FleetResult<Vec<String>> {
        let mut ranked: Vec<&NodeStatus> = candidates.iter().collect();
        ranked.sort_by(|a, b| load_order(a, b));

        let selected: Vec<String> = ranked
            .into_iter()
            .take(request.parallelism.max(1))
            .map(|status| status.node_id.clone())
            .collect();

        debug!("最低负载策略选择节点: {:?}", selected);
        Ok(selected)
    }

    fn name(&self) -> &str {
        "LeastLoaded"
    }
}

/// 根据实时健康状态为任务挑选节点
///
/// 降级而不是失败：没有节点匹配标签时忽略标签，没有健康节点时在全部节点中选。
pub struct Router {
    registry: Arc<NodeRegistry>,
    strategy: Arc<dyn SelectionStrategy>,
    narrator: Option<Arc<dyn Narrator>>,
}

impl Router {
    pub fn new(registry: Arc<NodeRegistry>, narrator: Option<Arc<dyn Narrator>>) -> Self {
        Self {
            registry,
            strategy: Arc::new(LeastLoadedStrategy::new()),
            narrator,
        }
    }

    pub fn with_strategy(mut self, strategy: Arc<dyn SelectionStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    pub async fn select_nodes(&self, request: &RouterRequest) -> FleetResult<RouterDecision> {
        let statuses = self.registry.refresh_all().await;
        if statuses.is_empty() {
            return Err(FleetError::validation("注册表中没有节点"));
        }
        let candidates = candidate_pool(statuses, &request.required_tags);

        let nodes = self.strategy.select_nodes(request, &candidates).await?;
        if nodes.is_empty() {
            return Err(FleetError::Internal(format!(
                "选择策略 {} 没有返回节点",
                self.strategy.name()
            )));
        }

        let mode = if request.parallelism > 1 || nodes.len() > 1 {
            FanOutMode::Parallel
        } else {
            FanOutMode::Single
        };
        let reason = self.justify(request, &nodes, &candidates).await;

        debug!(
            "路由决策: task={}, nodes={:?}, mode={}, strategy={}",
            request.task,
            nodes,
            mode,
            self.strategy.name()
        );
        Ok(RouterDecision { nodes, mode, reason })
    }

    async fn justify(&self, request: &RouterRequest, nodes: &[String], candidates: &[NodeStatus]) -> String {
        let fallback = format!("Selected {} based on lowest CPU utilization", nodes.join(", "));
        let Some(narrator) = &self.narrator else {
            return fallback;
        };

        let selected: Vec<_> = nodes
            .iter()
            .filter_map(|id| candidates.iter().find(|s| &s.node_id == id))
            .map(|s| {
                json!({
                    "node_id": s.node_id,
                    "healthy": s.healthy,
                    "cpu_percent": s.cpu_percent(),
                    "memory_percent": s.memory_percent(),
                    "tags": s.tags,
                })
            })
            .collect();
        let context = NarrationContext::new(
            "router",
            format!("Explain why these nodes were chosen for: {}", request.task),
            json!({
                "task": request.task,
                "required_tags": request.required_tags,
                "parallelism": request.parallelism,
                "selected": selected,
            }),
        );

        match narrator.narrate(&context).await {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => fallback,
            Err(e) => {
                warn!("叙述器 {} 不可用，使用默认说明: {}", narrator.name(), e);
                fallback
            }
        }
    }
}

/// 健康节点 -> 标签过滤 -> 过滤为空时回到全部健康节点 -> 没有健康节点时全部节点
fn candidate_pool(statuses: Vec<NodeStatus>, required_tags: &[String]) -> Vec<NodeStatus> {
    let healthy: Vec<NodeStatus> = statuses.iter().filter(|s| s.healthy).cloned().collect();
    if healthy.is_empty() {
        warn!("没有健康节点，在全部 {} 个节点中降级选择", statuses.len());
        return statuses;
    }
    if required_tags.is_empty() {
        return healthy;
    }

    let tagged: Vec<NodeStatus> = healthy
        .iter()
        .filter(|s| s.has_any_tag(required_tags))
        .cloned()
        .collect();
    if tagged.is_empty() {
        debug!("没有健康节点匹配标签 {:?}，忽略标签", required_tags);
        healthy
    } else {
        tagged
    }
}
