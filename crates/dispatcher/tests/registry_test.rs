#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use fleet_config::{NodeDefinition, OrchestratorConfig};
    use fleet_core::{
        CommandOutput, ErrorKind, ExecuteCommandRequest, FleetResult, ListFilesRequest,
        ListFilesResponse, NodeClient, NodeInfo, ReadFileRequest, ReadFileResponse,
        SyncFilesRequest, SyncFilesResponse, WriteFileRequest, WriteFileResponse,
    };
    use fleet_dispatcher::NodeRegistry;
    use fleet_testing_utils::MockNodeClient;

    /// get_node_info 永远不返回的节点
    struct HangingClient;

    #[async_trait]
    impl NodeClient for HangingClient {
        fn node_id(&self) -> &str {
            "slow"
        }
        async fn list_files(&self, _: ListFilesRequest) -> FleetResult<ListFilesResponse> {
            unimplemented!()
        }
        async fn read_file(&self, _: ReadFileRequest) -> FleetResult<ReadFileResponse> {
            unimplemented!()
        }
        async fn write_file(&self, _: WriteFileRequest) -> FleetResult<WriteFileResponse> {
            unimplemented!()
        }
        async fn execute_command(&self, _: ExecuteCommandRequest) -> FleetResult<CommandOutput> {
            unimplemented!()
        }
        async fn sync_files(&self, _: SyncFilesRequest) -> FleetResult<SyncFilesResponse> {
            unimplemented!()
        }
        async fn get_node_info(&self) -> FleetResult<NodeInfo> {
            std::future::pending().await
        }
    }

    fn single(client: MockNodeClient) -> NodeRegistry {
        let entries: Vec<(NodeDefinition, Arc<dyn NodeClient>)> =
            vec![(NodeDefinition::local("n1", "/srv/n1"), Arc::new(client))];
        NodeRegistry::with_clients(entries, Duration::from_secs(1)).unwrap()
    }

    #[tokio::test]
    async fn test_refresh_success_then_failure_keeps_metrics() {
        let client = MockNodeClient::new("n1").with_load(12.0, 34.0);
        let registry = single(client.clone());

        let status = registry.status("n1").await.unwrap();
        assert!(!status.healthy);

        let status = registry.refresh_status("n1").await.unwrap();
        assert!(status.healthy);
        assert_eq!(status.cpu_percent(), 12.0);
        let first_seen = status.last_seen;
        assert!(first_seen.is_some());

        client.set_failure(Some(ErrorKind::NodeUnreachable));
        let status = registry.refresh_status("n1").await.unwrap();
        assert!(!status.healthy);
        assert_eq!(status.cpu_percent(), 12.0);
        assert_eq!(status.memory_percent(), 34.0);
        assert_eq!(status.last_seen, first_seen);
        assert_eq!(status.error_kind, Some(ErrorKind::NodeUnreachable));

        client.set_failure(None);
        let status = registry.refresh_status("n1").await.unwrap();
        assert!(status.healthy);
        assert!(status.error.is_none());
    }

    #[tokio::test]
    async fn test_unknown_node() {
        let registry = single(MockNodeClient::new("n1"));
        assert_eq!(
            registry.refresh_status("ghost").await.unwrap_err().kind(),
            ErrorKind::UnknownNode
        );
        assert_eq!(registry.get_client("ghost").err().unwrap().kind(), ErrorKind::UnknownNode);
        assert_eq!(
            registry.get_definition("ghost").unwrap_err().kind(),
            ErrorKind::UnknownNode
        );
    }

    #[tokio::test]
    async fn test_info_timeout_marks_unhealthy() {
        let entries: Vec<(NodeDefinition, Arc<dyn NodeClient>)> = vec![
            (NodeDefinition::local("slow", "/srv/slow"), Arc::new(HangingClient)),
            (
                NodeDefinition::local("fast", "/srv/fast"),
                Arc::new(MockNodeClient::new("fast")),
            ),
        ];
        let registry = NodeRegistry::with_clients(entries, Duration::from_millis(100)).unwrap();

        let statuses = registry.refresh_all().await;
        assert_eq!(statuses.len(), 2);
        assert_eq!(statuses[0].node_id, "slow");
        assert!(!statuses[0].healthy);
        assert_eq!(statuses[0].error_kind, Some(ErrorKind::Timeout));
        assert!(statuses[1].healthy);
    }

    #[test]
    fn test_duplicate_ids_are_rejected() {
        let entries: Vec<(NodeDefinition, Arc<dyn NodeClient>)> = vec![
            (NodeDefinition::local("n1", "/a"), Arc::new(MockNodeClient::new("n1"))),
            (NodeDefinition::local("n1", "/b"), Arc::new(MockNodeClient::new("n1"))),
        ];
        let err = NodeRegistry::with_clients(entries, Duration::from_secs(1))
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
    }

    #[test]
    fn test_choose_node_by_priority_and_tags() {
        let entries: Vec<(NodeDefinition, Arc<dyn NodeClient>)> = vec![
            (
                NodeDefinition::local("b", "/b").with_priority(10),
                Arc::new(MockNodeClient::new("b")),
            ),
            (
                NodeDefinition::local("a", "/a").with_priority(10),
                Arc::new(MockNodeClient::new("a")),
            ),
            (
                NodeDefinition::local("gpu", "/g").with_priority(50).with_tags(["gpu"]),
                Arc::new(MockNodeClient::new("gpu")),
            ),
        ];
        let registry = NodeRegistry::with_clients(entries, Duration::from_secs(1)).unwrap();

        assert_eq!(registry.choose_node(&[]).unwrap(), "a");
        assert_eq!(registry.choose_node(&["gpu".to_string()]).unwrap(), "gpu");
        assert_eq!(registry.choose_node(&["missing".to_string()]).unwrap(), "a");
    }

    #[tokio::test]
    async fn test_from_config_builds_local_transports() {
        let dir = tempfile::tempdir().unwrap();
        let config = OrchestratorConfig::new(vec![
            NodeDefinition::local("local-1", dir.path().join("one")),
            NodeDefinition::network("remote-1", "http://127.0.0.1:1"),
        ]);
        let registry = NodeRegistry::from_config(&config).unwrap();
        assert_eq!(registry.node_ids(), vec!["local-1", "remote-1"]);
        assert_eq!(registry.get_client("local-1").unwrap().node_id(), "local-1");

        let status = registry.refresh_status("local-1").await.unwrap();
        assert!(status.healthy);
    }
}
