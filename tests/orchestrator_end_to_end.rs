#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use fleet::app::Application;
    use fleet::cli::{build_cli, parse_operation, Operation};
    use tempfile::TempDir;

    struct Fleet {
        _dirs: Vec<TempDir>,
        primary: TempDir,
        replica: TempDir,
        config_path: std::path::PathBuf,
    }

    fn write_fleet() -> Fleet {
        let primary = TempDir::new().unwrap();
        let replica = TempDir::new().unwrap();
        let state = TempDir::new().unwrap();

        fs::create_dir_all(primary.path().join("docs")).unwrap();
        fs::write(primary.path().join("docs/guide.md"), "# guide\n").unwrap();
        fs::write(primary.path().join("docs/notes.txt"), "notes").unwrap();

        let config_path = state.path().join("fleet.toml");
        let toml = format!(
            r#"
orchestrator_id = "e2e"
refresh_interval_seconds = 2.0

[audit]
path = '{audit}'
max_entries = 1000

[[nodes]]
node_id = "primary"
transport = "local"
root_dir = '{primary}'
priority = 1
tags = ["docs"]
allowed_commands = ["echo", "ls"]

[[nodes]]
node_id = "replica"
transport = "local"
root_dir = '{replica}'
priority = 5
allowed_commands = ["echo", "ls"]
"#,
            audit = state.path().join("audit.jsonl").display(),
            primary = primary.path().display(),
            replica = replica.path().display(),
        );
        fs::write(&config_path, toml).unwrap();

        Fleet {
            _dirs: vec![state],
            primary,
            replica,
            config_path,
        }
    }

    fn operation(args: &[&str]) -> Operation {
        let matches = build_cli().try_get_matches_from(args).unwrap();
        parse_operation(&matches).unwrap()
    }

    fn audit_actions(path: &Path) -> Vec<String> {
        fs::read_to_string(path)
            .unwrap_or_default()
            .lines()
            .map(|line| {
                let entry: serde_json::Value = serde_json::from_str(line).unwrap();
                entry["action"].as_str().unwrap_or_default().to_string()
            })
            .collect()
    }

    #[tokio::test]
    async fn test_nodes_and_listing() {
        let fleet = write_fleet();
        let app = Application::load(&fleet.config_path).await.unwrap();
        assert_eq!(app.config().orchestrator_id, "e2e");

        let nodes = app.execute(operation(&["fleet", "nodes"])).await.unwrap();
        let nodes = nodes.as_array().unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0]["node_id"], "primary");
        assert_eq!(nodes[0]["healthy"], true);

        let listing = app
            .execute(operation(&["fleet", "ls", "primary", "docs", "--hash"]))
            .await
            .unwrap();
        assert_eq!(listing["node_id"], "primary");
        assert_eq!(listing["count"], 3);
        assert_eq!(listing["files"][0]["relative_path"], "docs");
        assert_eq!(listing["files"][0]["is_dir"], true);
        assert!(listing["files"][1]["hash"].is_string());

        let info = app.execute(operation(&["fleet", "info", "replica"])).await.unwrap();
        assert_eq!(info["node_id"], "replica");
    }

    #[tokio::test]
    async fn test_exec_routes_and_audits() {
        let fleet = write_fleet();
        let app = Application::load(&fleet.config_path).await.unwrap();

        let response = app
            .execute(operation(&["fleet", "exec", "--tag", "docs", "echo", "hello"]))
            .await
            .unwrap();
        assert_eq!(response["plan"]["nodes"], serde_json::json!(["primary"]));
        assert_eq!(response["results"][0]["exit_code"], 0);
        assert_eq!(response["results"][0]["stdout"], "hello\n");

        let err = app
            .execute(operation(&["fleet", "exec", "rm", "-rf", "docs"]))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("rm"));
        assert!(fleet.primary.path().join("docs/guide.md").exists());

        let audit_path = &app.config().audit.path;
        let actions = audit_actions(audit_path);
        assert!(actions.contains(&"execute_command".to_string()));
        assert!(actions.contains(&"execute_command_rejected".to_string()));
    }

    #[tokio::test]
    async fn test_sync_copies_between_local_nodes() {
        let fleet = write_fleet();
        let app = Application::load(&fleet.config_path).await.unwrap();

        let response = app
            .execute(operation(&["fleet", "sync", "primary", "docs", "--to", "replica"]))
            .await
            .unwrap();
        assert_eq!(response["reports"][0]["target_node"], "replica");
        assert_eq!(response["reports"][0]["files_synced"], 2);
        assert_eq!(response["reports"][0]["applied_strategy"], "append");

        assert_eq!(
            fs::read_to_string(fleet.replica.path().join("docs/guide.md")).unwrap(),
            "# guide\n"
        );
        assert_eq!(
            fs::read_to_string(fleet.replica.path().join("docs/notes.txt")).unwrap(),
            "notes"
        );
    }

    #[tokio::test]
    async fn test_probe_uses_heuristic_narrator() {
        let fleet = write_fleet();
        let app = Application::load(&fleet.config_path).await.unwrap();

        let probe = app.execute(operation(&["fleet", "probe", "hello"])).await.unwrap();
        assert_eq!(probe["available"], true);
        assert!(probe["reply"].as_str().unwrap().contains("hello"));
    }

    #[tokio::test]
    async fn test_long_running_operations_are_not_one_shot() {
        let fleet = write_fleet();
        let app = Application::load(&fleet.config_path).await.unwrap();
        assert!(app.execute(Operation::Monitor).await.is_err());
    }

    #[tokio::test]
    async fn test_missing_config_file() {
        let dir = TempDir::new().unwrap();
        let result = Application::load(dir.path().join("absent.toml")).await;
        assert!(result.is_err());
    }
}
