use async_trait::async_trait;
use fleet_config::{NodeConfig, NodeDefinition};
use fleet_core::{
    CommandOutput, ExecuteCommandRequest, FleetResult, ListFilesRequest, ListFilesResponse,
    NodeClient, NodeInfo, ReadFileRequest, ReadFileResponse, SyncFilesRequest, SyncFilesResponse,
    WriteFileRequest, WriteFileResponse,
};

use crate::tools::NodeTools;

/// 进程内传输：直接调用本机上的节点工具
#[derive(Clone)]
pub struct LocalNodeClient {
    tools: NodeTools,
}

impl LocalNodeClient {
    pub fn new(tools: NodeTools) -> Self {
        Self { tools }
    }

    /// 由 `local` 传输的节点定义构造；定义中没有允许列表时使用默认列表
    pub fn from_definition(definition: &NodeDefinition) -> FleetResult<Self> {
        let config = NodeConfig::from_definition(definition)?;
        Ok(Self::new(NodeTools::new(config)?))
    }

    pub fn tools(&self) -> &NodeTools {
        &self.tools
    }
}

#[async_trait]
impl NodeClient for LocalNodeClient {
    fn node_id(&self) -> &str {
        self.tools.node_id()
    }

    async fn list_files(&self, request: ListFilesRequest) -> FleetResult<ListFilesResponse> {
        self.tools.list_files(request).await
    }

    async fn read_file(&self, request: ReadFileRequest) -> FleetResult<ReadFileResponse> {
        self.tools.read_file(request).await
    }

    async fn write_file(&self, request: WriteFileRequest) -> FleetResult<WriteFileResponse> {
        self.tools.write_file(request).await
    }

    async fn execute_command(&self, request: ExecuteCommandRequest) -> FleetResult<CommandOutput> {
        self.tools.execute_command(request).await
    }

    async fn sync_files(&self, request: SyncFilesRequest) -> FleetResult<SyncFilesResponse> {
        self.tools.sync_files(request).await
    }

    async fn get_node_info(&self) -> FleetResult<NodeInfo> {
        self.tools.get_node_info().await
    }
}
