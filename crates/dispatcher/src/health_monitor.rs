use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::registry::NodeRegistry;

/// 健康监控配置
#[derive(Debug, Clone)]
pub struct HealthMonitorConfig {
    /// 两次全量刷新的间隔
    pub refresh_interval: Duration,
}

impl Default for HealthMonitorConfig {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(10),
        }
    }
}

/// 后台健康监控
///
/// 按固定间隔刷新全部节点状态，直到被停止。
pub struct HealthMonitor {
    registry: Arc<NodeRegistry>,
    config: HealthMonitorConfig,
    running: Arc<RwLock<bool>>,
}

impl HealthMonitor {
    pub fn new(registry: Arc<NodeRegistry>, config: Option<HealthMonitorConfig>) -> Self {
        Self {
            registry,
            config: config.unwrap_or_default(),
            running: Arc::new(RwLock::new(false)),
        }
    }

    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }

    /// 在当前任务中运行监控循环，直到 [`stop`](Self::stop) 被调用
    pub async fn start(&self) {
        info!(
            "启动节点健康监控: nodes={}, interval={:?}",
            self.registry.len(),
            self.config.refresh_interval
        );
        *self.running.write().await = true;
        self.monitor_loop().await;
    }

    /// 在后台任务中运行
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move { self.start().await })
    }

    pub async fn stop(&self) {
        info!("停止节点健康监控");
        *self.running.write().await = false;
    }

    async fn monitor_loop(&self) {
        loop {
            if !*self.running.read().await {
                info!("收到停止信号，退出健康监控循环");
                break;
            }

            let statuses = self.registry.refresh_all().await;
            let unhealthy: Vec<&str> = statuses
                .iter()
                .filter(|s| !s.healthy)
                .map(|s| s.node_id.as_str())
                .collect();
            if unhealthy.is_empty() {
                debug!("全部 {} 个节点健康", statuses.len());
            } else {
                warn!("检测到 {} 个不健康节点: {:?}", unhealthy.len(), unhealthy);
            }

            tokio::time::sleep(self.config.refresh_interval).await;
        }
    }
}
