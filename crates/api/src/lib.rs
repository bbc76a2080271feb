//! 节点HTTP服务器
//!
//! 把 [`fleet_node::NodeTools`] 暴露为JSON接口：
//!
//! - `GET /healthz` - 存活检查
//! - `GET /node` - 节点信息和实时指标
//! - `POST /tools/{list-files|read-file|write-file|execute-command|sync-files|get-node-info}`
//!
//! 错误响应为 `{error, kind, details}`，状态码按错误类别映射
//! （400/401/403/404/409/413/500/503/504）。

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;

use std::future::Future;

use axum::Router;
use fleet_config::NodeConfig;
use fleet_core::{FleetError, FleetResult};
use fleet_node::NodeTools;
use tower::ServiceBuilder;
use tracing::info;

use middleware::{request_logging, trace_layer};
use routes::{create_routes, AppState};

/// 创建完整的节点应用
pub fn create_app(tools: NodeTools) -> Router {
    create_routes(AppState::new(tools)).layer(
        ServiceBuilder::new()
            .layer(trace_layer())
            .layer(axum::middleware::from_fn(request_logging)),
    )
}

/// 在配置的地址上提供服务，直到 `shutdown` 完成
pub async fn serve<F>(config: NodeConfig, shutdown: F) -> FleetResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let bind_address = config.bind_address.clone();
    let node_id = config.node_id.clone();
    let app = create_app(NodeTools::new(config)?);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!("节点服务器已启动: node_id={}, address={}", node_id, bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| FleetError::Internal(format!("节点服务器异常退出: {e}")))?;

    info!("节点服务器已停止: node_id={}", node_id);
    Ok(())
}
