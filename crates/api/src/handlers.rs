use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use fleet_core::{
    CommandOutput, ExecuteCommandRequest, ListFilesRequest, ListFilesResponse, NodeInfo,
    ReadFileRequest, ReadFileResponse, SyncFilesRequest, SyncFilesResponse, WriteFileRequest,
    WriteFileResponse,
};
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::routes::AppState;

type ApiResult<T> = Result<Json<T>, ApiError>;

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "fleet-node",
        "node_id": state.tools.node_id(),
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

pub async fn node_info(State(state): State<AppState>) -> ApiResult<NodeInfo> {
    Ok(Json(state.tools.get_node_info().await?))
}

pub async fn list_files(
    State(state): State<AppState>,
    payload: Result<Json<ListFilesRequest>, JsonRejection>,
) -> ApiResult<ListFilesResponse> {
    let Json(request) = payload?;
    Ok(Json(state.tools.list_files(request).await?))
}

pub async fn read_file(
    State(state): State<AppState>,
    payload: Result<Json<ReadFileRequest>, JsonRejection>,
) -> ApiResult<ReadFileResponse> {
    let Json(request) = payload?;
    Ok(Json(state.tools.read_file(request).await?))
}

pub async fn write_file(
    State(state): State<AppState>,
    payload: Result<Json<WriteFileRequest>, JsonRejection>,
) -> ApiResult<WriteFileResponse> {
    let Json(request) = payload?;
    Ok(Json(state.tools.write_file(request).await?))
}

pub async fn execute_command(
    State(state): State<AppState>,
    payload: Result<Json<ExecuteCommandRequest>, JsonRejection>,
) -> ApiResult<CommandOutput> {
    let Json(request) = payload?;
    Ok(Json(state.tools.execute_command(request).await?))
}

pub async fn sync_files(
    State(state): State<AppState>,
    payload: Result<Json<SyncFilesRequest>, JsonRejection>,
) -> ApiResult<SyncFilesResponse> {
    let Json(request) = payload?;
    Ok(Json(state.tools.sync_files(request).await?))
}

/// 请求体被忽略
pub async fn get_node_info(State(state): State<AppState>) -> ApiResult<NodeInfo> {
    Ok(Json(state.tools.get_node_info().await?))
}

pub async fn unknown_tool(Path(tool): Path<String>) -> ApiError {
    ApiError::UnknownTool(tool)
}
