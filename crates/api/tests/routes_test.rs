#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        Router,
    };
    use fleet_api::create_app;
    use fleet_config::NodeConfig;
    use fleet_node::NodeTools;
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn app_with(config_fn: impl FnOnce(NodeConfig) -> NodeConfig) -> (TempDir, Router) {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        std::fs::write(dir.path().join("hello.txt"), "hello").unwrap();
        let config = config_fn(NodeConfig::new("api-node", dir.path()));
        let tools = NodeTools::new(config).expect("Failed to create tools");
        (dir, create_app(tools))
    }

    fn app() -> (TempDir, Router) {
        app_with(|config| config)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_healthz() {
        let (_dir, app) = app();
        let response = app
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["node_id"], "api-node");
    }

    #[tokio::test]
    async fn test_read_file_tool() {
        let (_dir, app) = app();
        let response = app
            .oneshot(post_json("/tools/read-file", json!({"path": "hello.txt"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["content"], "hello");
        assert_eq!(body["size"], 5);
    }

    #[tokio::test]
    async fn test_error_body_carries_kind() {
        let (_dir, app) = app();
        let response = app
            .clone()
            .oneshot(post_json("/tools/read-file", json!({"path": "missing.txt"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["kind"], "not_found");
        assert!(body["error"].as_str().unwrap().contains("missing.txt"));

        let response = app
            .clone()
            .oneshot(post_json(
                "/tools/write-file",
                json!({"path": "hello.txt", "content": "again"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = app
            .oneshot(post_json("/tools/read-file", json!({"path": "../../etc/passwd"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_json(response).await["kind"], "path_escapes_root");
    }

    #[tokio::test]
    async fn test_malformed_payload_is_validation_failure() {
        let (_dir, app) = app();
        let response = app
            .clone()
            .oneshot(post_json("/tools/read-file", json!({"wrong": true})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["kind"], "validation_failed");

        let response = app
            .oneshot(post_json(
                "/tools/execute-command",
                json!({"command": ["echo", "hi"], "timeout": 1000}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_command_not_on_allow_list() {
        let (_dir, app) = app();
        let response = app
            .oneshot(post_json("/tools/execute-command", json!({"command": "rm -rf ."})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_json(response).await["kind"], "permission_denied");
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let (_dir, app) = app();
        let response = app
            .oneshot(post_json("/tools/format-disk", json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_bearer_token_required() {
        let (_dir, app) = app_with(|mut config| {
            config.auth_token = Some("s3cret".to_string());
            config
        });

        let response = app
            .clone()
            .oneshot(post_json("/tools/read-file", json!({"path": "hello.txt"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let mut request = post_json("/tools/read-file", json!({"path": "hello.txt"}));
        request
            .headers_mut()
            .insert("authorization", "Bearer s3cret".parse().unwrap());
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // 健康检查不需要令牌
        let response = app
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_body_limit() {
        let (_dir, app) = app_with(|mut config| {
            config.max_body_bytes = 64;
            config
        });
        let response = app
            .oneshot(post_json(
                "/tools/write-file",
                json!({"path": "big.txt", "content": "x".repeat(1024)}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
