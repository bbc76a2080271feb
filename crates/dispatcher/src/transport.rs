use std::time::Duration;

use async_trait::async_trait;
use fleet_config::{NodeDefinition, TransportKind};
use fleet_core::{
    CommandOutput, ExecuteCommandRequest, FleetResult, ListFilesRequest, ListFilesResponse,
    NodeClient, NodeInfo, ReadFileRequest, ReadFileResponse, SyncFilesRequest, SyncFilesResponse,
    WriteFileRequest, WriteFileResponse,
};
use fleet_infrastructure::HttpNodeClient;
use fleet_node::LocalNodeClient;

/// 传输方式的封闭集合
pub enum NodeTransport {
    Network(HttpNodeClient),
    Local(LocalNodeClient),
}

impl NodeTransport {
    pub fn from_definition(definition: &NodeDefinition, request_timeout: Duration) -> FleetResult<Self> {
        match definition.transport {
            TransportKind::Network => Ok(NodeTransport::Network(HttpNodeClient::from_definition(
                definition,
                request_timeout,
            )?)),
            TransportKind::Local => Ok(NodeTransport::Local(LocalNodeClient::from_definition(
                definition,
            )?)),
        }
    }

    pub fn kind(&self) -> TransportKind {
        match self {
            NodeTransport::Network(_) => TransportKind::Network,
            NodeTransport::Local(_) => TransportKind::Local,
        }
    }

    fn client(&self) -> &dyn NodeClient {
        match self {
            NodeTransport::Network(client) => client,
            NodeTransport::Local(client) => client,
        }
    }
}

#[async_trait]
impl NodeClient for NodeTransport {
    fn node_id(&self) -> &str {
        self.client().node_id()
    }

    async fn list_files(&self, request: ListFilesRequest) -> FleetResult<ListFilesResponse> {
        self.client().list_files(request).await
    }

    async fn read_file(&self, request: ReadFileRequest) -> FleetResult<ReadFileResponse> {
        self.client().read_file(request).await
    }

    async fn write_file(&self, request: WriteFileRequest) -> FleetResult<WriteFileResponse> {
        self.client().write_file(request).await
    }

    async fn execute_command(&self, request: ExecuteCommandRequest) -> FleetResult<CommandOutput> {
        self.client().execute_command(request).await
    }

    async fn sync_files(&self, request: SyncFilesRequest) -> FleetResult<SyncFilesResponse> {
        self.client().sync_files(request).await
    }

    async fn get_node_info(&self) -> FleetResult<NodeInfo> {
        self.client().get_node_info().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_follows_definition() {
        let dir = tempfile::tempdir().unwrap();
        let local = NodeTransport::from_definition(
            &NodeDefinition::local("n1", dir.path()),
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(local.kind(), TransportKind::Local);
        assert_eq!(local.node_id(), "n1");

        let network = NodeTransport::from_definition(
            &NodeDefinition::network("n2", "http://127.0.0.1:8765"),
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(network.kind(), TransportKind::Network);
        assert_eq!(network.node_id(), "n2");
    }
}
