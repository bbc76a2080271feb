use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use fleet_config::{NodeConfig, OrchestratorConfig};
use fleet_dispatcher::OrchestratorService;
use serde_json::{json, Value};
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::cli::Operation;

/// 编排器应用
///
/// 持有加载好的配置和装配完成的编排服务，CLI的每个子命令都在这里落地。
pub struct Application {
    config: OrchestratorConfig,
    service: Arc<OrchestratorService>,
}

impl Application {
    pub async fn new(config: OrchestratorConfig) -> Result<Self> {
        let service = OrchestratorService::from_config(&config)
            .await
            .context("装配编排服务失败")?;
        Ok(Self {
            config,
            service: Arc::new(service),
        })
    }

    /// 从TOML文件加载配置并装配
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config = OrchestratorConfig::load(path)
            .with_context(|| format!("加载配置文件失败: {}", path.display()))?;
        Self::new(config).await
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn service(&self) -> &Arc<OrchestratorService> {
        &self.service
    }

    /// 执行一次性操作，结果以JSON返回
    pub async fn execute(&self, operation: Operation) -> Result<Value> {
        let service = &self.service;
        let value = match operation {
            Operation::Nodes => serde_json::to_value(service.list_nodes().await)?,
            Operation::Info { node_id } => {
                serde_json::to_value(service.get_node_info(&node_id).await?)?
            }
            Operation::Ls { node_id, request } => {
                serde_json::to_value(service.list_files(&node_id, request).await?)?
            }
            Operation::Exec(request) => {
                serde_json::to_value(service.execute_command(request).await?)?
            }
            Operation::Sync {
                source_node,
                source_path,
                targets,
                strategy,
            } => serde_json::to_value(
                service
                    .sync_path(&source_node, &source_path, &targets, strategy)
                    .await?,
            )?,
            Operation::Probe { message } => serde_json::to_value(
                service
                    .check_agent_backend(&message, json!({"source": "cli"}))
                    .await,
            )?,
            Operation::ServeNode { .. } | Operation::Monitor => {
                anyhow::bail!("长期运行的子命令不能作为一次性操作执行")
            }
        };
        Ok(value)
    }

    /// 运行健康监控，直到收到关闭信号
    pub async fn run_monitor(&self, mut shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        let monitor = Arc::new(self.service.health_monitor());
        let handle = monitor.clone().spawn();
        info!("健康监控已启动: orchestrator_id={}", self.config.orchestrator_id);

        let _ = shutdown_rx.recv().await;
        monitor.stop().await;

        let grace = Duration::from_secs_f64(self.config.refresh_interval_seconds) + Duration::from_secs(1);
        if tokio::time::timeout(grace, handle).await.is_err() {
            warn!("健康监控未能在 {:?} 内停止", grace);
        }
        info!("健康监控已停止");
        Ok(())
    }
}

/// 运行节点HTTP服务器，直到收到关闭信号
pub async fn serve_node(config_path: impl AsRef<Path>, mut shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
    let path = config_path.as_ref();
    let config = NodeConfig::load(path)
        .with_context(|| format!("加载节点配置失败: {}", path.display()))?;

    fleet_api::serve(config, async move {
        let _ = shutdown_rx.recv().await;
    })
    .await
    .context("节点服务器运行失败")
}
