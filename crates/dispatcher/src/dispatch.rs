use std::sync::Arc;
use std::time::Instant;

use fleet_core::{CommandResult, ExecuteCommandRequest};
use futures::future::join_all;
use tracing::{info, warn};

use crate::registry::NodeRegistry;

/// 把同一条命令并发发往多个节点
///
/// 每个节点的结果相互独立，一个节点失败或超时不会取消其他节点。
pub struct CommandDispatcher {
    registry: Arc<NodeRegistry>,
}

impl CommandDispatcher {
    pub fn new(registry: Arc<NodeRegistry>) -> Self {
        Self { registry }
    }

    /// 结果顺序与 `nodes` 一致
    pub async fn dispatch(&self, nodes: &[String], request: &ExecuteCommandRequest) -> Vec<CommandResult> {
        join_all(nodes.iter().map(|node_id| self.dispatch_one(node_id, request.clone()))).await
    }

    async fn dispatch_one(&self, node_id: &str, request: ExecuteCommandRequest) -> CommandResult {
        let started = Instant::now();
        let outcome = match self.registry.get_client(node_id) {
            Ok(client) => client.execute_command(request).await,
            Err(e) => Err(e),
        };
        let elapsed = started.elapsed().as_secs_f64();

        match outcome {
            Ok(output) => {
                info!(
                    "命令执行完成: node_id={}, exit_code={}, duration={:.3}s",
                    node_id, output.exit_code, output.duration
                );
                CommandResult::from_output(node_id, output)
            }
            Err(e) => {
                warn!("命令分发失败: node_id={}, kind={}, error={}", node_id, e.kind(), e);
                CommandResult::from_error(node_id, &e, elapsed)
            }
        }
    }
}
