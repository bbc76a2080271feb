use async_trait::async_trait;

use crate::models::{
    CommandOutput, ExecuteCommandRequest, ListFilesRequest, ListFilesResponse, NodeInfo,
    ReadFileRequest, ReadFileResponse, SyncFilesRequest, SyncFilesResponse, WriteFileRequest,
    WriteFileResponse,
};
use crate::FleetResult;

/// 节点工具调用接口
///
/// 错误保持可识别的类别：本地实现直接返回对应的 [`crate::FleetError`] 变体，
/// 网络实现把远端的错误类别还原为 `ToolFailed`，传输失败则为 `NodeUnreachable`。
#[async_trait]
pub trait NodeClient: Send + Sync {
    fn node_id(&self) -> &str;

    /// 条目按相对路径排序，包含目标路径本身
    async fn list_files(&self, request: ListFilesRequest) -> FleetResult<ListFilesResponse>;

    async fn read_file(&self, request: ReadFileRequest) -> FleetResult<ReadFileResponse>;

    async fn write_file(&self, request: WriteFileRequest) -> FleetResult<WriteFileResponse>;

    /// 非零退出码不是错误；只有拒绝执行、超时和传输失败才返回 `Err`
    async fn execute_command(&self, request: ExecuteCommandRequest) -> FleetResult<CommandOutput>;

    async fn sync_files(&self, request: SyncFilesRequest) -> FleetResult<SyncFilesResponse>;

    async fn get_node_info(&self) -> FleetResult<NodeInfo>;
}
