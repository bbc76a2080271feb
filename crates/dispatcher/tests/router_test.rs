#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use fleet_config::NodeDefinition;
    use fleet_core::{ErrorKind, FanOutMode, NodeClient, RouterRequest};
    use fleet_dispatcher::{NodeRegistry, Router};
    use fleet_testing_utils::{MockNodeClient, NodeInfoBuilder, RecordingNarrator};

    fn registry(nodes: Vec<(NodeDefinition, MockNodeClient)>) -> Arc<NodeRegistry> {
        let entries = nodes
            .into_iter()
            .map(|(def, client)| (def, Arc::new(client) as Arc<dyn NodeClient>))
            .collect();
        Arc::new(NodeRegistry::with_clients(entries, Duration::from_secs(1)).unwrap())
    }

    fn three_node_fleet() -> Arc<NodeRegistry> {
        registry(vec![
            (
                NodeDefinition::local("n1", "/srv/n1"),
                MockNodeClient::new("n1").with_load(10.0, 30.0),
            ),
            (
                NodeDefinition::local("n2", "/srv/n2"),
                MockNodeClient::new("n2").with_load(50.0, 30.0),
            ),
            (
                NodeDefinition::local("n3", "/srv/n3"),
                MockNodeClient::new("n3")
                    .with_load(1.0, 1.0)
                    .failing(ErrorKind::NodeUnreachable),
            ),
        ])
    }

    #[tokio::test]
    async fn test_selects_least_loaded_healthy_nodes() {
        let fleet = three_node_fleet();
        let router = Router::new(fleet.clone(), None);

        let decision = router.select_nodes(&RouterRequest::new("build")).await.unwrap();
        assert_eq!(decision.nodes, vec!["n1"]);
        assert_eq!(decision.mode, FanOutMode::Single);
        assert_eq!(decision.reason, "Selected n1 based on lowest CPU utilization");

        let decision = router
            .select_nodes(&RouterRequest::new("build").with_parallelism(2))
            .await
            .unwrap();
        assert_eq!(decision.nodes, vec!["n1", "n2"]);
        assert_eq!(decision.mode, FanOutMode::Parallel);

        let n3 = fleet.status("n3").await.unwrap();
        assert!(!n3.healthy);
        assert_eq!(n3.error_kind, Some(ErrorKind::NodeUnreachable));
    }

    #[tokio::test]
    async fn test_parallelism_larger_than_fleet() {
        let router = Router::new(three_node_fleet(), None);
        let decision = router
            .select_nodes(&RouterRequest::new("build").with_parallelism(10))
            .await
            .unwrap();
        assert_eq!(decision.nodes, vec!["n1", "n2"]);
    }

    #[tokio::test]
    async fn test_tag_filter_and_fallback() {
        let fleet = registry(vec![
            (
                NodeDefinition::local("cpu-1", "/srv/a"),
                MockNodeClient::new("cpu-1").with_load(5.0, 5.0),
            ),
            (
                NodeDefinition::local("gpu-1", "/srv/b").with_tags(["gpu"]),
                MockNodeClient::new("gpu-1").with_load(80.0, 5.0),
            ),
        ]);
        let router = Router::new(fleet, None);

        let decision = router
            .select_nodes(&RouterRequest::new("train").with_tags(vec!["gpu".to_string()]))
            .await
            .unwrap();
        assert_eq!(decision.nodes, vec!["gpu-1"]);

        let decision = router
            .select_nodes(&RouterRequest::new("train").with_tags(vec!["tpu".to_string()]))
            .await
            .unwrap();
        assert_eq!(decision.nodes, vec!["cpu-1"]);
    }

    #[tokio::test]
    async fn test_all_unhealthy_still_selects() {
        let fleet = registry(vec![
            (
                NodeDefinition::local("a", "/srv/a"),
                MockNodeClient::new("a").failing(ErrorKind::Timeout),
            ),
            (
                NodeDefinition::local("b", "/srv/b"),
                MockNodeClient::new("b").failing(ErrorKind::NodeUnreachable),
            ),
        ]);
        let decision = Router::new(fleet, None)
            .select_nodes(&RouterRequest::new("anything"))
            .await
            .unwrap();
        assert_eq!(decision.nodes.len(), 1);
    }

    #[tokio::test]
    async fn test_narrator_text_and_fallback() {
        let narrator = RecordingNarrator::new("n1 is idle");
        let router = Router::new(three_node_fleet(), Some(Arc::new(narrator.clone())));
        let decision = router.select_nodes(&RouterRequest::new("lint")).await.unwrap();
        assert_eq!(decision.reason, "n1 is idle");

        let contexts = narrator.contexts();
        assert_eq!(contexts.len(), 1);
        assert_eq!(contexts[0].topic, "router");
        assert_eq!(contexts[0].data["selected"][0]["node_id"], "n1");

        let router = Router::new(three_node_fleet(), Some(Arc::new(RecordingNarrator::failing())));
        let decision = router.select_nodes(&RouterRequest::new("lint")).await.unwrap();
        assert_eq!(decision.reason, "Selected n1 based on lowest CPU utilization");
    }

    #[tokio::test]
    async fn test_zero_load_is_a_real_reading() {
        let info = NodeInfoBuilder::new("quiet").build();
        let fleet = registry(vec![
            (
                NodeDefinition::local("quiet", "/srv/q"),
                MockNodeClient::new("quiet").with_info(info),
            ),
            (
                NodeDefinition::local("busy", "/srv/b"),
                MockNodeClient::new("busy").with_load(95.0, 95.0),
            ),
        ]);
        let decision = Router::new(fleet, None)
            .select_nodes(&RouterRequest::new("x"))
            .await
            .unwrap();
        // 上报为0的指标是真实值，不是缺省的100
        assert_eq!(decision.nodes, vec!["quiet"]);
    }
}
