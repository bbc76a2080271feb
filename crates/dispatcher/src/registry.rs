use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use fleet_config::{NodeDefinition, OrchestratorConfig};
use fleet_core::{FleetError, FleetResult, NodeClient, NodeStatus};
use futures::future::join_all;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::transport::NodeTransport;

struct RegisteredNode {
    definition: NodeDefinition,
    client: Arc<dyn NodeClient>,
}

/// 节点注册表
///
/// 定义和客户端在构造时确定，之后只有健康状态会变化。
/// 状态表由读写锁保护，远程探测期间不持有锁。
pub struct NodeRegistry {
    nodes: Vec<RegisteredNode>,
    index: HashMap<String, usize>,
    statuses: RwLock<HashMap<String, NodeStatus>>,
    status_timeout: Duration,
}

impl NodeRegistry {
    /// 按配置为每个节点建立传输
    pub fn from_config(config: &OrchestratorConfig) -> FleetResult<Self> {
        let request_timeout = Duration::from_secs_f64(config.request_timeout_seconds);
        let mut entries = Vec::with_capacity(config.nodes.len());
        for definition in &config.nodes {
            let transport = NodeTransport::from_definition(definition, request_timeout)?;
            info!(
                "注册节点: node_id={}, transport={:?}, tags={:?}",
                definition.node_id,
                transport.kind(),
                definition.tags
            );
            entries.push((definition.clone(), Arc::new(transport) as Arc<dyn NodeClient>));
        }
        Self::with_clients(
            entries,
            Duration::from_secs_f64(config.status_timeout_seconds),
        )
    }

    /// 使用现成的客户端构造，测试中用来注入mock
    pub fn with_clients(
        entries: Vec<(NodeDefinition, Arc<dyn NodeClient>)>,
        status_timeout: Duration,
    ) -> FleetResult<Self> {
        let mut nodes = Vec::with_capacity(entries.len());
        let mut index = HashMap::new();
        let mut statuses = HashMap::new();

        for (definition, client) in entries {
            let node_id = definition.node_id.clone();
            if index.insert(node_id.clone(), nodes.len()).is_some() {
                return Err(FleetError::config(format!("节点ID重复: {node_id}")));
            }
            statuses.insert(
                node_id.clone(),
                NodeStatus::new(
                    node_id,
                    definition.display_name().to_string(),
                    definition.tags.clone(),
                ),
            );
            nodes.push(RegisteredNode { definition, client });
        }

        Ok(Self {
            nodes,
            index,
            statuses: RwLock::new(statuses),
            status_timeout,
        })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// 按配置顺序
    pub fn node_ids(&self) -> Vec<String> {
        self.nodes
            .iter()
            .map(|node| node.definition.node_id.clone())
            .collect()
    }

    pub fn get_client(&self, node_id: &str) -> FleetResult<Arc<dyn NodeClient>> {
        self.entry(node_id).map(|node| node.client.clone())
    }

    pub fn get_definition(&self, node_id: &str) -> FleetResult<&NodeDefinition> {
        self.entry(node_id).map(|node| &node.definition)
    }

    fn entry(&self, node_id: &str) -> FleetResult<&RegisteredNode> {
        self.index
            .get(node_id)
            .map(|&i| &self.nodes[i])
            .ok_or_else(|| FleetError::UnknownNode {
                node_id: node_id.to_string(),
            })
    }

    /// 探测单个节点并更新状态
    ///
    /// 探测失败只记录在状态里；只有未知节点返回错误。
    pub async fn refresh_status(&self, node_id: &str) -> FleetResult<NodeStatus> {
        let client = self.get_client(node_id)?;

        let outcome = match tokio::time::timeout(self.status_timeout, client.get_node_info()).await {
            Ok(result) => result,
            Err(_) => Err(FleetError::Timeout {
                seconds: self.status_timeout.as_secs_f64(),
            }),
        };

        let mut statuses = self.statuses.write().await;
        let status = statuses
            .get_mut(node_id)
            .ok_or_else(|| FleetError::UnknownNode {
                node_id: node_id.to_string(),
            })?;

        match outcome {
            Ok(info) => {
                status.mark_healthy(&info.metrics, Utc::now());
                debug!(
                    "节点状态已刷新: node_id={}, cpu={:.1}, memory={:.1}",
                    node_id, info.metrics.cpu_percent, info.metrics.memory_percent
                );
            }
            Err(e) => {
                warn!("节点健康探测失败: node_id={}, kind={}, error={}", node_id, e.kind(), e);
                metrics::counter!("fleet_node_refresh_failures_total", "node_id" => node_id.to_string())
                    .increment(1);
                status.mark_unhealthy(e.to_string(), e.kind());
            }
        }
        Ok(status.clone())
    }

    /// 并发探测全部节点，返回按配置顺序排列的快照
    pub async fn refresh_all(&self) -> Vec<NodeStatus> {
        let node_ids = self.node_ids();
        let results = join_all(node_ids.iter().map(|id| self.refresh_status(id))).await;
        results.into_iter().filter_map(Result::ok).collect()
    }

    /// 当前快照，不触发探测
    pub async fn statuses(&self) -> Vec<NodeStatus> {
        let statuses = self.statuses.read().await;
        self.nodes
            .iter()
            .filter_map(|node| statuses.get(&node.definition.node_id).cloned())
            .collect()
    }

    pub async fn status(&self, node_id: &str) -> FleetResult<NodeStatus> {
        self.statuses
            .read()
            .await
            .get(node_id)
            .cloned()
            .ok_or_else(|| FleetError::UnknownNode {
                node_id: node_id.to_string(),
            })
    }

    /// 按静态优先级选一个节点
    ///
    /// 优先在带有任一偏好标签的节点中选；没有这样的节点时在全部节点中选。
    /// 按 `(priority, node_id)` 取最小。
    pub fn choose_node(&self, preferred_tags: &[String]) -> FleetResult<String> {
        let tagged: Vec<&NodeDefinition> = self
            .nodes
            .iter()
            .map(|node| &node.definition)
            .filter(|def| preferred_tags.iter().any(|tag| def.tags.contains(tag)))
            .collect();

        let candidates = if tagged.is_empty() {
            self.nodes.iter().map(|node| &node.definition).collect()
        } else {
            tagged
        };

        candidates
            .into_iter()
            .min_by(|a, b| (a.priority, &a.node_id).cmp(&(b.priority, &b.node_id)))
            .map(|def| def.node_id.clone())
            .ok_or_else(|| FleetError::validation("注册表中没有节点"))
    }
}
