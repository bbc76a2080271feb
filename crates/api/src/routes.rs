use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use fleet_node::NodeTools;

use crate::handlers;

/// 节点服务器状态
#[derive(Clone)]
pub struct AppState {
    pub tools: NodeTools,
    pub auth_token: Option<Arc<str>>,
}

impl AppState {
    pub fn new(tools: NodeTools) -> Self {
        let auth_token = tools.config().auth_token.as_deref().map(Arc::from);
        Self { tools, auth_token }
    }
}

/// 创建节点路由
///
/// `/healthz` 不需要令牌；`/node` 和 `/tools/*` 在配置了令牌时需要认证。
pub fn create_routes(state: AppState) -> Router {
    let max_body_bytes = state.tools.config().max_body_bytes;

    let protected = Router::new()
        .route("/node", get(handlers::node_info))
        .route("/tools/list-files", post(handlers::list_files))
        .route("/tools/read-file", post(handlers::read_file))
        .route("/tools/write-file", post(handlers::write_file))
        .route("/tools/execute-command", post(handlers::execute_command))
        .route("/tools/sync-files", post(handlers::sync_files))
        .route("/tools/get-node-info", post(handlers::get_node_info))
        .route("/tools/{tool}", post(handlers::unknown_tool))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::require_token,
        ));

    Router::new()
        .route("/", get(handlers::health))
        .route("/healthz", get(handlers::health))
        .merge(protected)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state)
}
